// ABOUTME: Saved-exercise routes: dosage-parameterized saves per user
// ABOUTME: Premium exercises can only be saved by pro-tier accounts
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Saved exercise routes
//!
//! Saving records the user's own dosage for an exercise. The premium gate
//! is re-checked against the membership history at save time, the same way
//! exercise authoring is.

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
use crate::database::{SaveExerciseRequest, SavedExerciseUpdate, SavedExerciseWithExercise};
use crate::errors::AppError;
use crate::membership;
use crate::models::{SavedExercise, User};
use crate::server::ServerResources;

/// Saved exercise routes handler
pub struct SavedExerciseRoutes;

impl SavedExerciseRoutes {
    /// Create all saved-exercise routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/saved-exercises", get(Self::handle_list))
            .route("/api/saved-exercises", post(Self::handle_save))
            .route("/api/saved-exercises/:id", put(Self::handle_update))
            .route("/api/saved-exercises/:id", delete(Self::handle_delete))
            .with_state(resources)
    }

    /// Handle GET /api/saved-exercises
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let level = auth::user_level(&user);
        let mut saves = resources.saved_exercises().list_for_user(user.id).await?;
        for save in &mut saves {
            if let Some(exercise) = &mut save.exercise {
                exercise.redact_for(level);
            }
        }
        Ok((StatusCode::OK, Json(saves)).into_response())
    }

    /// Handle POST /api/saved-exercises
    async fn handle_save(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<SaveExerciseRequest>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let level = auth::user_level(&user);
        let mut exercise = resources
            .exercises()
            .get_exercise(request.exercise_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise"))?;
        if exercise.is_premium && !user.is_admin() && !membership::is_premium(&user.memberships)
        {
            return Err(AppError::forbidden(
                "This is a premium exercise, upgrade to pro to save it",
            ));
        }

        let saved = resources
            .saved_exercises()
            .save_exercise(user.id, request)
            .await?;
        info!(saved_id = %saved.id, user_id = %user.id, "exercise saved");
        exercise.redact_for(level);
        Ok((
            StatusCode::CREATED,
            Json(SavedExerciseWithExercise {
                saved,
                exercise: Some(exercise),
            }),
        )
            .into_response())
    }

    /// Handle PUT /api/saved-exercises/:id
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(saved_id): Path<Uuid>,
        Json(update): Json<SavedExerciseUpdate>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        Self::owned_save(&resources, &user, saved_id).await?;
        let saved = resources
            .saved_exercises()
            .update_saved(saved_id, update)
            .await?;
        Ok((StatusCode::OK, Json(saved)).into_response())
    }

    /// Handle DELETE /api/saved-exercises/:id
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(saved_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        Self::owned_save(&resources, &user, saved_id).await?;
        resources.saved_exercises().delete_saved(saved_id).await?;
        Ok((StatusCode::OK, Json(json!({ "message": "Saved exercise removed" })))
            .into_response())
    }

    /// Load a save and verify the caller owns it
    async fn owned_save(
        resources: &Arc<ServerResources>,
        user: &User,
        saved_id: Uuid,
    ) -> Result<SavedExercise, AppError> {
        let saved = resources
            .saved_exercises()
            .get_saved(saved_id)
            .await?
            .ok_or_else(|| AppError::not_found("Saved exercise"))?;
        if saved.user_id != user.id {
            return Err(AppError::forbidden("Saved exercise belongs to another user"));
        }
        Ok(saved)
    }
}
