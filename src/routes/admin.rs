// ABOUTME: Admin routes: platform stats, therapist approval, oversight
// ABOUTME: Every handler requires the admin role before touching anything
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::users::verify_password;
use crate::auth;
use crate::errors::AppError;
use crate::models::{ConsultationStatus, TherapistStatus};
use crate::server::ServerResources;

#[derive(Debug, Deserialize)]
struct AdminLoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct TherapistListQuery {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusUpdateRequest {
    status: String,
}

/// Platform-wide counters for the admin dashboard
#[derive(Debug, Serialize)]
pub struct PlatformStats {
    pub users: i64,
    pub pro_users: i64,
    pub therapists: i64,
    pub active_therapists: i64,
    pub pending_therapists: i64,
    pub exercises: i64,
    pub premium_exercises: i64,
    pub custom_exercises: i64,
    pub consultations: i64,
    pub active_consultations: i64,
}

/// Admin routes handler
pub struct AdminRoutes;

impl AdminRoutes {
    /// Create all admin routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/admin/login", post(Self::handle_login))
            .route("/api/admin/stats", get(Self::handle_stats))
            .route("/api/admin/users", get(Self::handle_list_users))
            .route("/api/admin/therapists", get(Self::handle_list_therapists))
            .route(
                "/api/admin/therapists/:id/status",
                put(Self::handle_therapist_status),
            )
            .route(
                "/api/admin/therapists/:id",
                delete(Self::handle_delete_therapist),
            )
            .route(
                "/api/admin/consultations",
                get(Self::handle_list_consultations),
            )
            .route(
                "/api/admin/consultations/:id/status",
                put(Self::handle_consultation_status),
            )
            .with_state(resources)
    }

    /// Handle POST /api/admin/login
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<AdminLoginRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .get_user_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;
        verify_password(&request.password, &user.password_hash)?;
        if !user.is_admin() {
            return Err(AppError::forbidden("Not authorized as an admin"));
        }

        let token = resources.auth.generate_token(user.id)?;
        info!(user_id = %user.id, "admin logged in");
        Ok((StatusCode::OK, Json(json!({ "token": token, "user": user }))).into_response())
    }

    /// Handle GET /api/admin/stats
    async fn handle_stats(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;

        let exercises = resources.exercises();
        let (consultations, active_consultations) =
            resources.consultations().consultation_counts().await?;
        let stats = PlatformStats {
            users: resources.database.user_count().await?,
            pro_users: resources.database.pro_user_count().await?,
            therapists: resources.database.therapist_count(None).await?,
            active_therapists: resources
                .database
                .therapist_count(Some(TherapistStatus::Active))
                .await?,
            pending_therapists: resources
                .database
                .therapist_count(Some(TherapistStatus::Pending))
                .await?,
            exercises: exercises.exercise_count().await?,
            premium_exercises: exercises.premium_exercise_count().await?,
            custom_exercises: exercises.custom_exercise_count().await?,
            consultations,
            active_consultations,
        };
        Ok((StatusCode::OK, Json(stats)).into_response())
    }

    /// Handle GET /api/admin/users
    async fn handle_list_users(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;
        let users = resources.database.list_users().await?;
        Ok((StatusCode::OK, Json(users)).into_response())
    }

    /// Handle GET /api/admin/therapists
    async fn handle_list_therapists(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Query(query): Query<TherapistListQuery>,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;
        let status = query.status.as_deref().map(TherapistStatus::parse);
        let therapists = resources.database.list_therapists(status).await?;
        Ok((StatusCode::OK, Json(therapists)).into_response())
    }

    /// Handle PUT /api/admin/therapists/:id/status
    async fn handle_therapist_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(therapist_id): Path<Uuid>,
        Json(request): Json<StatusUpdateRequest>,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;

        let status = match request.status.as_str() {
            "pending" => TherapistStatus::Pending,
            "active" => TherapistStatus::Active,
            "inactive" => TherapistStatus::Inactive,
            "rejected" => TherapistStatus::Rejected,
            other => {
                return Err(AppError::invalid_input(format!(
                    "Unknown therapist status: {other}"
                )))
            }
        };
        resources
            .database
            .update_therapist_status(therapist_id, status)
            .await?;
        info!(therapist_id = %therapist_id, status = status.as_str(), "therapist status updated");

        let therapist = resources
            .database
            .get_therapist(therapist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Therapist"))?;
        Ok((StatusCode::OK, Json(therapist)).into_response())
    }

    /// Handle DELETE /api/admin/therapists/:id
    async fn handle_delete_therapist(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(therapist_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;
        resources.database.delete_therapist(therapist_id).await?;
        info!(therapist_id = %therapist_id, "therapist deleted");
        Ok((StatusCode::OK, Json(json!({ "message": "Therapist deleted" }))).into_response())
    }

    /// Handle GET /api/admin/consultations
    async fn handle_list_consultations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;
        let consultations = resources.consultations().list_all().await?;
        Ok((StatusCode::OK, Json(consultations)).into_response())
    }

    /// Handle PUT /api/admin/consultations/:id/status
    async fn handle_consultation_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
        Json(request): Json<StatusUpdateRequest>,
    ) -> Result<Response, AppError> {
        auth::require_admin(&resources.database, &resources.auth, &headers).await?;

        ConsultationStatus::try_parse(&request.status).map_err(|bad| {
            AppError::invalid_input(format!("Unknown consultation status: {bad}"))
        })?;
        let update = crate::database::ConsultationUpdate {
            status: Some(request.status),
            ..crate::database::ConsultationUpdate::default()
        };
        let consultation = resources
            .consultations()
            .update_consultation(consultation_id, update)
            .await?;
        resources
            .database
            .refresh_therapist_counts(consultation.therapist_id)
            .await?;
        Ok((StatusCode::OK, Json(consultation)).into_response())
    }
}
