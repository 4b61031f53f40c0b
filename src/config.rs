// ABOUTME: Environment-driven server configuration
// ABOUTME: Reads HEP_* variables with sane defaults for local development
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use std::env;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};

/// Default consultation lifetime in days when a therapist does not override it
pub const DEFAULT_ACTIVE_DAYS: i64 = 30;

/// Runtime configuration, resolved once at startup
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port the HTTP listener binds on
    pub http_port: u16,
    /// SQLite connection string
    pub database_url: String,
    /// Secret used to sign and verify JWTs
    pub jwt_secret: String,
    /// Token lifetime in hours
    pub jwt_expiry_hours: i64,
    /// bcrypt work factor for password hashing
    pub bcrypt_cost: u32,
    /// Consultation lifetime applied when a request omits `active_days`
    pub default_active_days: i64,
    /// Minutes a password reset code stays valid
    pub otp_ttl_minutes: i64,
}

impl ServerConfig {
    /// Load configuration from the environment.
    ///
    /// `HEP_JWT_SECRET` is mandatory; everything else has a default.
    pub fn from_env() -> AppResult<Self> {
        let jwt_secret = env::var("HEP_JWT_SECRET")
            .map_err(|_| AppError::config("HEP_JWT_SECRET must be set"))?;

        Ok(Self {
            http_port: parse_var("HEP_HTTP_PORT", 8080)?,
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:hep_server.db".to_string()),
            jwt_secret,
            jwt_expiry_hours: parse_var("HEP_JWT_EXPIRY_HOURS", 24)?,
            bcrypt_cost: parse_var("HEP_BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            default_active_days: parse_var("HEP_DEFAULT_ACTIVE_DAYS", DEFAULT_ACTIVE_DAYS)?,
            otp_ttl_minutes: parse_var("HEP_OTP_TTL_MINUTES", 10)?,
        })
    }

    /// Fixed configuration for tests: in-memory database, cheap hashing
    #[must_use]
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret-not-for-production".to_string(),
            jwt_expiry_hours: 1,
            bcrypt_cost: 4,
            default_active_days: DEFAULT_ACTIVE_DAYS,
            otp_ttl_minutes: 10,
        }
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> AppResult<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| AppError::config(format!("{name} is not a valid value: {raw}"))),
        Err(_) => Ok(default),
    }
}
