// ABOUTME: Shared server resources and HTTP server assembly
// ABOUTME: Merges the per-domain routers and runs the axum listener
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::{
    ConsultationsManager, Database, ExercisesManager, RoutinesManager, SavedExercisesManager,
    SocialManager,
};
use crate::errors::{AppError, AppResult};
use crate::notify::{LoggingSender, NotificationSender};
use crate::otp::OtpStore;
use crate::routes::{
    AdminRoutes, ConsultationRoutes, ExerciseRoutes, HealthRoutes, RoutineRoutes,
    SavedExerciseRoutes, TherapistRoutes, UserRoutes,
};

/// Everything route handlers need, shared behind one `Arc`
pub struct ServerResources {
    pub database: Database,
    pub auth: AuthManager,
    pub config: ServerConfig,
    pub otp: OtpStore,
    pub notifier: Arc<dyn NotificationSender>,
}

impl ServerResources {
    /// Build resources over a fresh database connection
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        let database = Database::new(&config.database_url).await?;
        let auth = AuthManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        let otp = OtpStore::new(config.otp_ttl_minutes);
        Ok(Self {
            database,
            auth,
            config,
            otp,
            notifier: Arc::new(LoggingSender),
        })
    }

    /// Exercise catalog manager over the shared pool
    #[must_use]
    pub fn exercises(&self) -> ExercisesManager {
        ExercisesManager::new(self.database.pool().clone())
    }

    /// Consultation manager over the shared pool
    #[must_use]
    pub fn consultations(&self) -> ConsultationsManager {
        ConsultationsManager::new(self.database.pool().clone())
    }

    /// Social graph manager over the shared pool
    #[must_use]
    pub fn social(&self) -> SocialManager {
        SocialManager::new(self.database.pool().clone())
    }

    /// Routine manager over the shared pool
    #[must_use]
    pub fn routines(&self) -> RoutinesManager {
        RoutinesManager::new(self.database.pool().clone())
    }

    /// Saved-exercise manager over the shared pool
    #[must_use]
    pub fn saved_exercises(&self) -> SavedExercisesManager {
        SavedExercisesManager::new(self.database.pool().clone())
    }
}

/// Assemble the full application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    Router::new()
        .merge(HealthRoutes::routes())
        .merge(UserRoutes::routes(resources.clone()))
        .merge(TherapistRoutes::routes(resources.clone()))
        .merge(ConsultationRoutes::routes(resources.clone()))
        .merge(ExerciseRoutes::routes(resources.clone()))
        .merge(RoutineRoutes::routes(resources.clone()))
        .merge(SavedExerciseRoutes::routes(resources.clone()))
        .merge(AdminRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind the listener and serve until shutdown
pub async fn serve(resources: Arc<ServerResources>) -> AppResult<()> {
    let port = resources.config.http_port;
    let app = router(resources);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind port {port}: {e}")))?;
    info!(port, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
