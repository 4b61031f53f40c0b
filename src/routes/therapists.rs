// ABOUTME: Therapist routes: registration, login, and consultation CRUD
// ABOUTME: Every consultation mutation is owner-checked before touching rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Therapist routes
//!
//! Therapists register into `pending` status and can work only after an
//! admin approves them. Consultations are prescribed here; a mutation on
//! another therapist's consultation is rejected before any row changes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use super::users::{hash_password, validate_credentials, verify_password};
use crate::auth;
use crate::database::{ConsultationUpdate, CreateConsultationRequest};
use crate::errors::AppError;
use crate::membership;
use crate::models::{
    Consultation, Membership, MembershipType, SubjectKind, Therapist, TherapistStatus,
};
use crate::server::ServerResources;

/// Therapist registration payload
#[derive(Debug, Deserialize)]
pub struct TherapistRegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub gender: String,
    pub specializations: Vec<String>,
    #[serde(default)]
    pub working_at: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub experience: String,
}

#[derive(Debug, Deserialize)]
struct TherapistLoginRequest {
    email: String,
    password: String,
}

/// Token plus the authenticated therapist
#[derive(Debug, Serialize)]
pub struct TherapistAuthResponse {
    pub token: String,
    pub therapist: Therapist,
}

#[derive(Debug, Deserialize)]
struct ActivateRequest {
    active_days: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MembershipPaymentRequest {
    membership_type: MembershipType,
}

/// Therapist routes handler
pub struct TherapistRoutes;

impl TherapistRoutes {
    /// Create all therapist routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/therapists/register", post(Self::handle_register))
            .route("/api/therapists/login", post(Self::handle_login))
            .route("/api/therapists/profile", get(Self::handle_profile))
            .route(
                "/api/therapist/membership",
                get(Self::handle_get_membership),
            )
            .route(
                "/api/therapist/membership",
                put(Self::handle_record_payment),
            )
            .route(
                "/api/therapist/consultations",
                get(Self::handle_list_consultations),
            )
            .route(
                "/api/therapist/consultations",
                post(Self::handle_create_consultation),
            )
            .route(
                "/api/therapist/consultations/:id",
                get(Self::handle_get_consultation),
            )
            .route(
                "/api/therapist/consultations/:id",
                put(Self::handle_update_consultation),
            )
            .route(
                "/api/therapist/consultations/:id",
                delete(Self::handle_delete_consultation),
            )
            .route(
                "/api/therapist/consultations/:id/activate",
                put(Self::handle_activate_consultation),
            )
            .with_state(resources)
    }

    /// Handle POST /api/therapists/register
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<TherapistRegisterRequest>,
    ) -> Result<Response, AppError> {
        validate_credentials(&request.email, &request.password)?;
        if request.name.trim().is_empty() {
            return Err(AppError::invalid_input("Name is required"));
        }
        if request.specializations.is_empty() {
            return Err(AppError::invalid_input(
                "At least one specialization is required",
            ));
        }

        let now = Utc::now();
        let therapist = Therapist {
            id: Uuid::new_v4(),
            name: request.name.trim().to_owned(),
            email: request.email.trim().to_lowercase(),
            password_hash: hash_password(&request.password, resources.config.bcrypt_cost)?,
            gender: request.gender,
            specializations: request.specializations,
            working_at: request.working_at,
            address: request.address,
            experience: request.experience,
            status: TherapistStatus::Pending,
            consultation_count: 0,
            request_count: 0,
            memberships: vec![Membership::free(now)],
            created_at: now,
            updated_at: now,
        };
        resources.database.create_therapist(&therapist).await?;
        info!(therapist_id = %therapist.id, "therapist registered, pending approval");

        Ok((
            StatusCode::CREATED,
            Json(json!({
                "message": "Registration received, awaiting approval",
                "therapist": therapist,
            })),
        )
            .into_response())
    }

    /// Handle POST /api/therapists/login
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<TherapistLoginRequest>,
    ) -> Result<Response, AppError> {
        let therapist = resources
            .database
            .get_therapist_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;
        verify_password(&request.password, &therapist.password_hash)?;

        if therapist.status != TherapistStatus::Active {
            return Err(AppError::forbidden("Access denied, account is not active"));
        }

        let token = resources.auth.generate_token(therapist.id)?;
        info!(therapist_id = %therapist.id, "therapist logged in");
        Ok((
            StatusCode::OK,
            Json(TherapistAuthResponse { token, therapist }),
        )
            .into_response())
    }

    /// Handle GET /api/therapists/profile
    async fn handle_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        Ok((StatusCode::OK, Json(therapist)).into_response())
    }

    /// Handle GET /api/therapist/membership
    ///
    /// Resolution has already corrected the history, so this is a pure read.
    async fn handle_get_membership(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        let current = membership::current(&therapist.memberships).cloned();
        Ok((
            StatusCode::OK,
            Json(json!({
                "current": current,
                "is_premium": membership::is_premium(&therapist.memberships),
                "history": therapist.memberships,
            })),
        )
            .into_response())
    }

    /// Handle PUT /api/therapist/membership
    ///
    /// Records a payment: the current record is deactivated and a fresh
    /// paid one starts its term now.
    async fn handle_record_payment(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<MembershipPaymentRequest>,
    ) -> Result<Response, AppError> {
        if request.membership_type == MembershipType::Free {
            return Err(AppError::invalid_input(
                "Cannot record a payment for the free tier",
            ));
        }
        let mut therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;

        membership::upgrade(&mut therapist.memberships, request.membership_type, Utc::now());
        resources
            .database
            .store_memberships(therapist.id, SubjectKind::Therapist, &therapist.memberships)
            .await?;
        info!(
            therapist_id = %therapist.id,
            tier = request.membership_type.as_str(),
            "therapist membership payment recorded"
        );

        Ok((
            StatusCode::OK,
            Json(json!({
                "current": membership::current(&therapist.memberships),
                "history": therapist.memberships,
            })),
        )
            .into_response())
    }

    /// Handle GET /api/therapist/consultations
    async fn handle_list_consultations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        let manager = resources.consultations();
        let mut consultations = manager.list_for_therapist(therapist.id).await?;

        let now = Utc::now();
        let mut expired_any = false;
        for consultation in &mut consultations {
            if consultation.check_expiration(now) {
                manager.persist_lifecycle(consultation).await?;
                expired_any = true;
            }
        }
        if expired_any {
            resources
                .database
                .refresh_therapist_counts(therapist.id)
                .await?;
        }
        Ok((StatusCode::OK, Json(consultations)).into_response())
    }

    /// Handle POST /api/therapist/consultations
    async fn handle_create_consultation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<CreateConsultationRequest>,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        let consultation = resources
            .consultations()
            .create_consultation(therapist.id, request, resources.config.default_active_days)
            .await?;
        resources
            .database
            .refresh_therapist_counts(therapist.id)
            .await?;
        info!(
            consultation_id = %consultation.id,
            therapist_id = %therapist.id,
            "consultation created and activated"
        );
        Ok((StatusCode::CREATED, Json(consultation)).into_response())
    }

    /// Handle GET /api/therapist/consultations/:id
    async fn handle_get_consultation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        let manager = resources.consultations();
        let mut consultation = Self::owned_consultation(&resources, &therapist, consultation_id)
            .await?;
        if consultation.check_expiration(Utc::now()) {
            manager.persist_lifecycle(&consultation).await?;
            resources
                .database
                .refresh_therapist_counts(therapist.id)
                .await?;
        }
        Ok((StatusCode::OK, Json(consultation)).into_response())
    }

    /// Handle PUT /api/therapist/consultations/:id
    async fn handle_update_consultation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
        Json(update): Json<ConsultationUpdate>,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        Self::owned_consultation(&resources, &therapist, consultation_id).await?;

        let consultation = resources
            .consultations()
            .update_consultation(consultation_id, update)
            .await?;
        resources
            .database
            .refresh_therapist_counts(therapist.id)
            .await?;
        Ok((StatusCode::OK, Json(consultation)).into_response())
    }

    /// Handle PUT /api/therapist/consultations/:id/activate
    async fn handle_activate_consultation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
        Json(request): Json<ActivateRequest>,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        Self::owned_consultation(&resources, &therapist, consultation_id).await?;

        let active_days = request
            .active_days
            .unwrap_or(resources.config.default_active_days);
        let consultation = resources
            .consultations()
            .activate_consultation(consultation_id, active_days, Utc::now())
            .await?;
        resources
            .database
            .refresh_therapist_counts(therapist.id)
            .await?;
        info!(consultation_id = %consultation.id, "consultation activated");
        Ok((StatusCode::OK, Json(consultation)).into_response())
    }

    /// Handle DELETE /api/therapist/consultations/:id
    async fn handle_delete_consultation(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(consultation_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let therapist =
            auth::require_therapist(&resources.database, &resources.auth, &headers).await?;
        Self::owned_consultation(&resources, &therapist, consultation_id).await?;

        resources
            .consultations()
            .delete_consultation(consultation_id)
            .await?;
        resources
            .database
            .refresh_therapist_counts(therapist.id)
            .await?;
        info!(consultation_id = %consultation_id, "consultation deleted");
        Ok((StatusCode::OK, Json(json!({ "message": "Consultation deleted" })))
            .into_response())
    }

    /// Load a consultation and verify the caller owns it.
    ///
    /// A consultation belonging to another therapist yields a 403 and the
    /// stored document stays untouched.
    async fn owned_consultation(
        resources: &Arc<ServerResources>,
        therapist: &Therapist,
        consultation_id: Uuid,
    ) -> Result<Consultation, AppError> {
        let consultation = resources
            .consultations()
            .get_consultation(consultation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Consultation"))?;
        if consultation.therapist_id != therapist.id {
            return Err(AppError::forbidden(
                "Consultation belongs to another therapist",
            ));
        }
        Ok(consultation)
    }
}
