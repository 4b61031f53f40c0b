// ABOUTME: Shared consultation read route for patients and therapists
// ABOUTME: Every fetch runs the lazy expiration check before answering
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use uuid::Uuid;

use crate::auth;
use crate::errors::AppError;
use crate::models::Subject;
use crate::server::ServerResources;

/// Consultation routes handler
pub struct ConsultationRoutes;

impl ConsultationRoutes {
    /// Create the consultation routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/consultations/:id", get(Self::handle_get))
            .with_state(resources)
    }

    /// Handle GET /api/consultations/:id
    ///
    /// Visible to the patient it targets, the therapist who owns it, and
    /// admins. Returns the populated view with people and exercise rows,
    /// video fields shaped to the caller's access level.
    async fn handle_get(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let context =
            auth::classify_access(&resources.database, &resources.auth, &headers).await?;
        let subject = context
            .subject
            .as_ref()
            .ok_or_else(|| AppError::auth_required("Not authorized, no token"))?;

        let manager = resources.consultations();
        let mut consultation = manager
            .get_consultation(consultation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Consultation"))?;

        let allowed = match subject {
            Subject::User(user) => user.is_admin() || consultation.patient_id == user.id,
            Subject::Therapist(therapist) => consultation.therapist_id == therapist.id,
        };
        if !allowed {
            return Err(AppError::forbidden("Not allowed to view this consultation"));
        }

        if consultation.check_expiration(Utc::now()) {
            manager.persist_lifecycle(&consultation).await?;
            resources
                .database
                .refresh_therapist_counts(consultation.therapist_id)
                .await?;
        }

        let mut populated = manager
            .get_populated(&resources.database, &resources.exercises(), consultation.id)
            .await?
            .ok_or_else(|| AppError::not_found("Consultation"))?;
        for exercise in &mut populated.exercises {
            exercise.redact_for(context.level);
        }
        Ok((StatusCode::OK, Json(populated)).into_response())
    }
}
