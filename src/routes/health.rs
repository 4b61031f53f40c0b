// ABOUTME: Liveness endpoint for load balancers and smoke tests
// ABOUTME: Stateless; reports the crate version
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

/// Health routes handler
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health routes
    pub fn routes() -> Router {
        Router::new().route("/api/health", get(Self::handle_health))
    }

    async fn handle_health() -> Json<serde_json::Value> {
        Json(json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
        }))
    }
}
