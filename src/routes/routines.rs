// ABOUTME: Routine routes: per-user CRUD of named exercise programs
// ABOUTME: Mutations are owner-only, with the usual admin bypass
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Routine routes
//!
//! A routine belongs to the user who created it. Listings come back
//! populated with the exercise, shaped to the caller's access level.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth;
use crate::database::{CreateRoutineRequest, RoutineUpdate};
use crate::errors::AppError;
use crate::models::{Routine, User};
use crate::server::ServerResources;

/// Routine routes handler
pub struct RoutineRoutes;

impl RoutineRoutes {
    /// Create all routine routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/routines", post(Self::handle_create))
            .route("/api/routines", get(Self::handle_list))
            .route("/api/routines/:id", put(Self::handle_update))
            .route("/api/routines/:id", delete(Self::handle_delete))
            .with_state(resources)
    }

    /// Handle POST /api/routines
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateRoutineRequest>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let routine = resources.routines().create_routine(user.id, request).await?;
        info!(routine_id = %routine.id, user_id = %user.id, "routine created");
        Ok((StatusCode::CREATED, Json(routine)).into_response())
    }

    /// Handle GET /api/routines
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let level = auth::user_level(&user);
        let mut routines = resources.routines().list_for_user(user.id).await?;
        for routine in &mut routines {
            if let Some(exercise) = &mut routine.exercise {
                exercise.redact_for(level);
            }
        }
        Ok((StatusCode::OK, Json(routines)).into_response())
    }

    /// Handle PUT /api/routines/:id
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(routine_id): Path<Uuid>,
        Json(update): Json<RoutineUpdate>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        Self::owned_routine(&resources, &user, routine_id).await?;
        let routine = resources.routines().update_routine(routine_id, update).await?;
        Ok((StatusCode::OK, Json(routine)).into_response())
    }

    /// Handle DELETE /api/routines/:id
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(routine_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        Self::owned_routine(&resources, &user, routine_id).await?;
        resources.routines().delete_routine(routine_id).await?;
        info!(routine_id = %routine_id, "routine deleted");
        Ok((StatusCode::OK, Json(json!({ "message": "Routine deleted" }))).into_response())
    }

    /// Load a routine and verify the caller owns it (admins pass)
    async fn owned_routine(
        resources: &Arc<ServerResources>,
        user: &User,
        routine_id: Uuid,
    ) -> Result<Routine, AppError> {
        let routine = resources
            .routines()
            .get_routine(routine_id)
            .await?
            .ok_or_else(|| AppError::not_found("Routine"))?;
        if routine.user_id != user.id && !user.is_admin() {
            return Err(AppError::forbidden("Routine belongs to another user"));
        }
        Ok(routine)
    }
}
