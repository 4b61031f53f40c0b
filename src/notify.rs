// ABOUTME: Outbound notification seam for password reset delivery
// ABOUTME: Production wires a mail sender; default logs the event only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use async_trait::async_trait;

use crate::errors::AppResult;

/// Delivery channel for one-time reset codes.
///
/// The server never blocks a reset request on delivery failures surfacing
/// as user-visible errors beyond what the implementation returns.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send_otp(&self, email: &str, code: &str) -> AppResult<()>;
}

/// Default sender: records that a code was issued without logging the code
pub struct LoggingSender;

#[async_trait]
impl NotificationSender for LoggingSender {
    async fn send_otp(&self, email: &str, _code: &str) -> AppResult<()> {
        tracing::info!(email = %email, "password reset code issued");
        Ok(())
    }
}
