// ABOUTME: Main library entry point for the HEP exercise platform backend
// ABOUTME: REST API for patients, therapists, consultations, and the catalog
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![deny(unsafe_code)]

//! # HEP Server
//!
//! A REST backend for a physical-therapy home-exercise-program platform.
//! Patients, therapists, and admins share an exercise catalog; therapists
//! prescribe time-boxed consultations of exercises to patients; a social
//! layer adds follows and favorites.
//!
//! ## Architecture
//!
//! - **Models**: domain entities and their status enums
//! - **Membership**: pure evaluator deriving the single active tier
//! - **Auth**: JWT issuance plus the fail-open/fail-closed access policies
//! - **Database**: SQLite persistence with per-domain managers
//! - **Routes**: one axum router per domain, merged in `server`
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use hep_server::config::ServerConfig;
//! use hep_server::errors::AppResult;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("HEP server configured for port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// JWT issuance/validation and request access policies
pub mod auth;

/// Environment-driven server configuration
pub mod config;

/// SQLite persistence layer with per-domain managers
pub mod database;

/// Error types and the REST status taxonomy
pub mod errors;

/// Tracing subscriber setup
pub mod logging;

/// Membership evaluation: the single active tier over an append-only history
pub mod membership;

/// Domain models for users, therapists, exercises, and consultations
pub mod models;

/// Outbound notification seam (password reset delivery)
pub mod notify;

/// In-memory one-time-code store for password resets
pub mod otp;

/// HTTP route handlers, one router per domain
pub mod routes;

/// Shared resources and HTTP server assembly
pub mod server;
