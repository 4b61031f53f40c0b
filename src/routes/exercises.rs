// ABOUTME: Exercise catalog routes: browse, discovery, and gated mutation
// ABOUTME: Premium video fields are shaped by the caller's access level
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Exercise routes
//!
//! Reads are open to everyone; the classifier only decides what the
//! response looks like. Writes are gated: admins anywhere, therapists and
//! pro users on their own creations, and the pro tier is re-checked
//! against the membership history at write time.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, AccessContext};
use crate::database::{CreateExerciseRequest, ExerciseFilter, UpdateExerciseRequest};
use crate::errors::AppError;
use crate::membership;
use crate::models::{CreatorKind, Exercise, Subject, TherapistStatus};
use crate::server::ServerResources;

#[derive(Debug, Deserialize)]
struct TrendingQuery {
    limit: Option<i64>,
}

/// Exercise routes handler
pub struct ExerciseRoutes;

impl ExerciseRoutes {
    /// Create all exercise routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/exercises", get(Self::handle_list))
            .route("/api/exercises", post(Self::handle_create))
            .route("/api/exercises/featured", get(Self::handle_featured))
            .route(
                "/api/exercises/category/:category",
                get(Self::handle_by_category),
            )
            .route("/api/exercises/:id", get(Self::handle_get))
            .route("/api/exercises/:id", put(Self::handle_update))
            .route("/api/exercises/:id", delete(Self::handle_delete))
            .route("/api/public/trending", get(Self::handle_trending))
            .with_state(resources)
    }

    /// Handle GET /api/exercises
    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(filter): Query<ExerciseFilter>,
    ) -> Result<Response, AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, &headers).await?;
        let mut page = resources.exercises().list_public(&filter).await?;
        for exercise in &mut page.exercises {
            exercise.redact_for(context.level);
        }
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    /// Handle GET /api/exercises/featured
    async fn handle_featured(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, &headers).await?;
        let mut featured = resources.exercises().featured().await?;
        for exercise in &mut featured {
            exercise.redact_for(context.level);
        }
        Ok((StatusCode::OK, Json(featured)).into_response())
    }

    /// Handle GET /api/exercises/category/:category
    async fn handle_by_category(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(category): Path<String>,
        Query(mut filter): Query<ExerciseFilter>,
    ) -> Result<Response, AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, &headers).await?;
        filter.category = Some(category);
        let mut page = resources.exercises().list_public(&filter).await?;
        for exercise in &mut page.exercises {
            exercise.redact_for(context.level);
        }
        Ok((StatusCode::OK, Json(page)).into_response())
    }

    /// Handle GET /api/exercises/:id
    ///
    /// Counts the view, then answers with the video shaped to the caller's
    /// level. Private exercises stay visible to their creator and followers
    /// through the dedicated routes, not here.
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(exercise_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, &headers).await?;
        let manager = resources.exercises();
        let mut exercise = manager
            .get_exercise(exercise_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise"))?;

        if exercise.visibility == crate::models::ExerciseVisibility::Private
            && !Self::may_view_private(&context, &exercise)
        {
            return Err(AppError::not_found("Exercise"));
        }

        manager.increment_views(exercise.id).await?;
        exercise.views += 1;
        exercise.redact_for(context.level);
        Ok((StatusCode::OK, Json(exercise)).into_response())
    }

    /// Handle GET /api/public/trending
    async fn handle_trending(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<TrendingQuery>,
    ) -> Result<Response, AppError> {
        let limit = query.limit.unwrap_or(10);
        let exercises = resources.exercises().trending(limit).await?;
        let therapists = resources.database.top_therapists(limit).await?;
        Ok((
            StatusCode::OK,
            Json(json!({
                "exercises": exercises,
                "therapists": therapists,
            })),
        )
            .into_response())
    }

    /// Handle POST /api/exercises
    async fn handle_create(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateExerciseRequest>,
    ) -> Result<Response, AppError> {
        let (created_by, creator_id) = Self::require_creator(&resources, &headers).await?;
        let exercise = resources
            .exercises()
            .create_exercise(request, created_by, creator_id)
            .await?;
        info!(exercise_id = %exercise.id, creator = created_by.as_str(), "exercise created");
        Ok((StatusCode::CREATED, Json(exercise)).into_response())
    }

    /// Handle PUT /api/exercises/:id
    async fn handle_update(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(exercise_id): Path<Uuid>,
        Json(update): Json<UpdateExerciseRequest>,
    ) -> Result<Response, AppError> {
        Self::require_mutation_rights(&resources, &headers, exercise_id).await?;
        let exercise = resources
            .exercises()
            .update_exercise(exercise_id, update)
            .await?;
        Ok((StatusCode::OK, Json(exercise)).into_response())
    }

    /// Handle DELETE /api/exercises/:id
    async fn handle_delete(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(exercise_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        Self::require_mutation_rights(&resources, &headers, exercise_id).await?;
        resources.exercises().delete_exercise(exercise_id).await?;
        info!(exercise_id = %exercise_id, "exercise deleted");
        Ok((StatusCode::OK, Json(json!({ "message": "Exercise deleted" }))).into_response())
    }

    fn may_view_private(context: &AccessContext, exercise: &Exercise) -> bool {
        match &context.subject {
            Some(Subject::User(user)) => {
                user.is_admin() || exercise.creator_id == Some(user.id)
            }
            Some(Subject::Therapist(therapist)) => exercise.creator_id == Some(therapist.id),
            None => false,
        }
    }

    /// Resolve who may create exercises and the attribution to record.
    ///
    /// Pro users are re-checked against their membership history here, not
    /// against anything cached in the token.
    async fn require_creator(
        resources: &Arc<ServerResources>,
        headers: &HeaderMap,
    ) -> Result<(CreatorKind, Option<Uuid>), AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, headers).await?;
        match context.subject {
            Some(Subject::User(user)) if user.is_admin() => {
                Ok((CreatorKind::Admin, Some(user.id)))
            }
            Some(Subject::User(user)) => {
                if membership::is_premium(&user.memberships) {
                    Ok((CreatorKind::ProUser, Some(user.id)))
                } else {
                    Err(AppError::forbidden("This route requires pro user status"))
                }
            }
            Some(Subject::Therapist(therapist))
                if therapist.status == TherapistStatus::Active =>
            {
                Ok((CreatorKind::Therapist, Some(therapist.id)))
            }
            Some(Subject::Therapist(_)) => {
                Err(AppError::forbidden("Access denied, account is not active"))
            }
            None => Err(AppError::auth_required("Not authorized, no token")),
        }
    }

    async fn require_mutation_rights(
        resources: &Arc<ServerResources>,
        headers: &HeaderMap,
        exercise_id: Uuid,
    ) -> Result<(), AppError> {
        let (created_by, creator_id) = Self::require_creator(resources, headers).await?;
        if created_by == CreatorKind::Admin {
            return Ok(());
        }
        let exercise = resources
            .exercises()
            .get_exercise(exercise_id)
            .await?
            .ok_or_else(|| AppError::not_found("Exercise"))?;
        if exercise.creator_id != creator_id {
            return Err(AppError::forbidden(
                "Only the creator may modify this exercise",
            ));
        }
        Ok(())
    }
}
