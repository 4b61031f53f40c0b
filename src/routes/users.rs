// ABOUTME: User account routes: registration, login, profile, membership
// ABOUTME: Also carries the social graph and password reset endpoints
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! User routes
//!
//! Everything a patient account can do: manage its own profile and
//! membership, follow therapists, keep favorites, and recover a lost
//! password with a one-time code.

use std::collections::HashSet;
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

use crate::auth;
use crate::database::users::UserProfileUpdate;
use crate::errors::{AppError, AppResult};
use crate::membership;
use crate::models::{MembershipType, TherapistStatus, User};
use crate::server::ServerResources;

/// Registration payload
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Login payload
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the authenticated account
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct UpdateProfileRequest {
    full_name: Option<String>,
    profile_image: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpgradeRequest {
    membership_type: MembershipType,
}

#[derive(Debug, Deserialize)]
struct PasswordResetRequest {
    email: String,
}

#[derive(Debug, Deserialize)]
struct PasswordResetConfirm {
    email: String,
    code: String,
    new_password: String,
}

#[derive(Debug, Deserialize)]
struct FollowRequest {
    therapist_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct FavoriteRequest {
    exercise_id: Uuid,
}

/// User routes handler
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/api/users/register", post(Self::handle_register))
            .route("/api/users/login", post(Self::handle_login))
            .route("/api/users/profile", get(Self::handle_get_profile))
            .route("/api/users/profile", put(Self::handle_update_profile))
            .route("/api/users/membership", get(Self::handle_get_membership))
            .route("/api/users/upgrade", post(Self::handle_upgrade))
            .route(
                "/api/users/password-reset/request",
                post(Self::handle_reset_request),
            )
            .route(
                "/api/users/password-reset/confirm",
                post(Self::handle_reset_confirm),
            )
            .route("/api/users/consultations", get(Self::handle_consultations))
            .route("/api/users/favorites", get(Self::handle_list_favorites))
            .route("/api/users/favorites", post(Self::handle_add_favorite))
            .route("/api/users/favorites/:id", get(Self::handle_check_favorite))
            .route(
                "/api/users/favorites/:id",
                delete(Self::handle_remove_favorite),
            )
            .route("/api/users/following", get(Self::handle_list_following))
            .route("/api/users/following", post(Self::handle_follow))
            .route("/api/users/following/:id", delete(Self::handle_unfollow))
            .route(
                "/api/users/therapists/:id/exercises",
                get(Self::handle_followed_exercises),
            )
            .with_state(resources)
    }

    /// Handle POST /api/users/register
    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<RegisterRequest>,
    ) -> Result<Response, AppError> {
        validate_credentials(&request.email, &request.password)?;
        if request.full_name.trim().is_empty() {
            return Err(AppError::invalid_input("Full name is required"));
        }

        let password_hash = hash_password(&request.password, resources.config.bcrypt_cost)?;
        let user = User::new(
            request.full_name.trim().to_owned(),
            request.email.trim().to_lowercase(),
            password_hash,
        );
        resources.database.create_user(&user).await?;
        info!(user_id = %user.id, "user registered");

        let token = resources.auth.generate_token(user.id)?;
        Ok((StatusCode::CREATED, Json(AuthResponse { token, user })).into_response())
    }

    /// Handle POST /api/users/login
    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<LoginRequest>,
    ) -> Result<Response, AppError> {
        let user = resources
            .database
            .get_user_by_email(&request.email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::auth_invalid("Invalid email or password"))?;
        verify_password(&request.password, &user.password_hash)?;

        // Login is an authenticated access: correct the tier before answering
        let mut user = user;
        if membership::evaluate(&mut user.memberships, Utc::now()) {
            resources
                .database
                .store_memberships(user.id, crate::models::SubjectKind::User, &user.memberships)
                .await?;
        }

        let token = resources.auth.generate_token(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok((StatusCode::OK, Json(AuthResponse { token, user })).into_response())
    }

    /// Handle GET /api/users/profile
    async fn handle_get_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        Ok((StatusCode::OK, Json(user)).into_response())
    }

    /// Handle PUT /api/users/profile
    async fn handle_update_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<UpdateProfileRequest>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;

        let password_hash = match &request.password {
            Some(password) => {
                if password.len() < 8 {
                    return Err(AppError::invalid_input(
                        "Password must be at least 8 characters",
                    ));
                }
                Some(hash_password(password, resources.config.bcrypt_cost)?)
            }
            None => None,
        };
        let update = UserProfileUpdate {
            full_name: request.full_name,
            profile_image: request.profile_image,
            password_hash,
        };
        resources.database.update_user_profile(user.id, &update).await?;

        let updated = resources
            .database
            .get_user(user.id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        Ok((StatusCode::OK, Json(updated)).into_response())
    }

    /// Handle GET /api/users/membership
    async fn handle_get_membership(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let current = membership::current(&user.memberships).cloned();
        Ok((
            StatusCode::OK,
            Json(json!({
                "current": current,
                "is_premium": membership::is_premium(&user.memberships),
                "history": user.memberships,
            })),
        )
            .into_response())
    }

    /// Handle POST /api/users/upgrade
    async fn handle_upgrade(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<UpgradeRequest>,
    ) -> Result<Response, AppError> {
        if request.membership_type == MembershipType::Free {
            return Err(AppError::invalid_input("Cannot upgrade to the free tier"));
        }
        let mut user = auth::require_user(&resources.database, &resources.auth, &headers).await?;

        membership::upgrade(&mut user.memberships, request.membership_type, Utc::now());
        resources
            .database
            .store_memberships(user.id, crate::models::SubjectKind::User, &user.memberships)
            .await?;
        info!(user_id = %user.id, tier = request.membership_type.as_str(), "membership upgraded");

        Ok((
            StatusCode::OK,
            Json(json!({
                "current": membership::current(&user.memberships),
                "history": user.memberships,
            })),
        )
            .into_response())
    }

    /// Handle POST /api/users/password-reset/request
    ///
    /// Always answers 200 so the endpoint cannot be used to enumerate
    /// registered addresses.
    async fn handle_reset_request(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PasswordResetRequest>,
    ) -> Result<Response, AppError> {
        let email = request.email.trim().to_lowercase();
        if resources.database.get_user_by_email(&email).await?.is_some() {
            let code = resources.otp.issue(&email, Utc::now());
            resources.notifier.send_otp(&email, &code).await?;
        }
        Ok((
            StatusCode::OK,
            Json(json!({ "message": "If the address is registered, a code has been sent" })),
        )
            .into_response())
    }

    /// Handle POST /api/users/password-reset/confirm
    async fn handle_reset_confirm(
        State(resources): State<Arc<ServerResources>>,
        Json(request): Json<PasswordResetConfirm>,
    ) -> Result<Response, AppError> {
        if request.new_password.len() < 8 {
            return Err(AppError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }
        let email = request.email.trim().to_lowercase();
        if !resources.otp.verify_and_consume(&email, &request.code, Utc::now()) {
            return Err(AppError::auth_invalid("Invalid or expired reset code"));
        }
        let user = resources
            .database
            .get_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;

        let update = UserProfileUpdate {
            password_hash: Some(hash_password(
                &request.new_password,
                resources.config.bcrypt_cost,
            )?),
            ..UserProfileUpdate::default()
        };
        resources.database.update_user_profile(user.id, &update).await?;
        info!(user_id = %user.id, "password reset completed");
        Ok((
            StatusCode::OK,
            Json(json!({ "message": "Password updated" })),
        )
            .into_response())
    }

    /// Handle GET /api/users/consultations
    async fn handle_consultations(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let manager = resources.consultations();
        let mut consultations = manager.list_for_patient(user.id).await?;
        let now = Utc::now();
        let mut flipped_owners = HashSet::new();
        for consultation in &mut consultations {
            if consultation.check_expiration(now) {
                manager.persist_lifecycle(consultation).await?;
                flipped_owners.insert(consultation.therapist_id);
            }
        }
        for therapist_id in flipped_owners {
            resources
                .database
                .refresh_therapist_counts(therapist_id)
                .await?;
        }
        Ok((StatusCode::OK, Json(consultations)).into_response())
    }

    /// Handle GET /api/users/favorites
    async fn handle_list_favorites(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let level = auth::user_level(&user);
        let mut favorites = resources.social().list_favorites(user.id).await?;
        for exercise in &mut favorites {
            exercise.redact_for(level);
        }
        Ok((StatusCode::OK, Json(favorites)).into_response())
    }

    /// Handle POST /api/users/favorites
    async fn handle_add_favorite(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<FavoriteRequest>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        resources
            .social()
            .add_favorite(user.id, request.exercise_id)
            .await?;
        Ok((StatusCode::CREATED, Json(json!({ "message": "Added to favorites" })))
            .into_response())
    }

    /// Handle GET /api/users/favorites/:id
    async fn handle_check_favorite(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(exercise_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let is_favorite = resources.social().is_favorite(user.id, exercise_id).await?;
        Ok((StatusCode::OK, Json(json!({ "is_favorite": is_favorite }))).into_response())
    }

    /// Handle DELETE /api/users/favorites/:id
    async fn handle_remove_favorite(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(exercise_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        resources.social().remove_favorite(user.id, exercise_id).await?;
        Ok((StatusCode::OK, Json(json!({ "message": "Removed from favorites" })))
            .into_response())
    }

    /// Handle GET /api/users/following
    async fn handle_list_following(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let ids = resources.social().list_following(user.id).await?;
        let mut therapists = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(therapist) = resources.database.get_therapist(id).await? {
                therapists.push(therapist);
            }
        }
        Ok((StatusCode::OK, Json(therapists)).into_response())
    }

    /// Handle POST /api/users/following
    async fn handle_follow(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Json(request): Json<FollowRequest>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        resources
            .social()
            .follow_therapist(user.id, request.therapist_id)
            .await?;
        Ok((StatusCode::CREATED, Json(json!({ "message": "Following therapist" })))
            .into_response())
    }

    /// Handle DELETE /api/users/following/:id
    async fn handle_unfollow(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(therapist_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        resources
            .social()
            .unfollow_therapist(user.id, therapist_id)
            .await?;
        Ok((StatusCode::OK, Json(json!({ "message": "Unfollowed therapist" })))
            .into_response())
    }

    /// Handle GET /api/users/therapists/:id/exercises
    ///
    /// A follower sees the therapist's private exercises alongside the
    /// public ones; everyone else gets the public subset only.
    async fn handle_followed_exercises(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        Path(therapist_id): Path<Uuid>,
    ) -> Result<Response, AppError> {
        let user = auth::require_user(&resources.database, &resources.auth, &headers).await?;
        let level = auth::user_level(&user);
        let therapist = resources
            .database
            .get_therapist(therapist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Therapist"))?;
        if therapist.status != TherapistStatus::Active {
            return Err(AppError::not_found("Therapist"));
        }

        let following = resources.social().is_following(user.id, therapist.id).await?;
        let mut exercises = resources.exercises().list_by_creator(therapist.id).await?;
        if !following {
            exercises.retain(|e| e.visibility == crate::models::ExerciseVisibility::Public);
        }
        for exercise in &mut exercises {
            exercise.redact_for(level);
        }
        Ok((StatusCode::OK, Json(exercises)).into_response())
    }
}

pub(super) fn validate_credentials(email: &str, password: &str) -> AppResult<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::invalid_input("A valid email is required"));
    }
    if password.len() < 8 {
        return Err(AppError::invalid_input(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub(super) fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(password, cost)
        .map_err(|e| AppError::internal(format!("Failed to hash password: {e}")))
}

pub(super) fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let valid = bcrypt::verify(password, hash)
        .map_err(|e| AppError::internal(format!("Failed to verify password: {e}")))?;
    if valid {
        Ok(())
    } else {
        Err(AppError::auth_invalid("Invalid email or password"))
    }
}
