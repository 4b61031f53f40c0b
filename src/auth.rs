// ABOUTME: JWT issuance/validation and the two request access policies
// ABOUTME: classify_access never fails closed; require_* guards always do
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Authentication and access classification
//!
//! Tokens carry only the subject id. On every request the subject is
//! resolved against storage, therapist accounts first so a therapist id
//! colliding with a user id can never be misclassified. Subject resolution
//! re-evaluates membership history and persists any correction, which is
//! the lazy path that keeps tiers honest without a background job.

use axum::http::HeaderMap;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::Database;
use crate::errors::{AppError, AppResult};
use crate::membership;
use crate::models::{AccessLevel, Subject, SubjectKind, Therapist, TherapistStatus, User};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Signs and validates bearer tokens
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
}

impl AuthManager {
    #[must_use]
    pub fn new(secret: &str, expiry_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        }
    }

    pub fn generate_token(&self, subject_id: Uuid) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject_id.to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.expiry_hours)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }

    pub fn validate_token(&self, token: &str) -> AppResult<Uuid> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::auth_invalid("Invalid or expired token"))?;
        Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AppError::auth_invalid("Malformed token subject"))
    }
}

/// Extract the bearer token from an Authorization header, if any
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// What a request is allowed to see, plus who is asking
pub struct AccessContext {
    pub level: AccessLevel,
    pub subject: Option<Subject>,
}

impl AccessContext {
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            level: AccessLevel::Anonymous,
            subject: None,
        }
    }
}

/// Look up who a token subject is, therapists first.
///
/// Both kinds of lookup run membership evaluation and persist the
/// corrected history before the caller sees it.
pub async fn resolve_subject(database: &Database, subject_id: Uuid) -> AppResult<Option<Subject>> {
    if let Some(mut therapist) = database.get_therapist(subject_id).await? {
        if membership::evaluate(&mut therapist.memberships, Utc::now()) {
            database
                .store_memberships(therapist.id, SubjectKind::Therapist, &therapist.memberships)
                .await?;
        }
        return Ok(Some(Subject::Therapist(therapist)));
    }
    let Some(mut user) = database.get_user(subject_id).await? else {
        return Ok(None);
    };
    if membership::evaluate(&mut user.memberships, Utc::now()) {
        database
            .store_memberships(user.id, SubjectKind::User, &user.memberships)
            .await?;
    }
    Ok(Some(Subject::User(user)))
}

/// Classify a request without ever rejecting it.
///
/// Missing, malformed, or stale credentials all degrade to anonymous;
/// only valid tokens elevate the level.
pub async fn classify_access(
    database: &Database,
    auth: &AuthManager,
    headers: &HeaderMap,
) -> AppResult<AccessContext> {
    let Some(token) = bearer_token(headers) else {
        return Ok(AccessContext::anonymous());
    };
    let Ok(subject_id) = auth.validate_token(token) else {
        return Ok(AccessContext::anonymous());
    };
    match resolve_subject(database, subject_id).await? {
        Some(Subject::Therapist(therapist)) if therapist.status == TherapistStatus::Active => {
            Ok(AccessContext {
                level: AccessLevel::Therapist,
                subject: Some(Subject::Therapist(therapist)),
            })
        }
        Some(Subject::Therapist(_)) | None => Ok(AccessContext::anonymous()),
        Some(Subject::User(user)) => Ok(AccessContext {
            level: user_level(&user),
            subject: Some(Subject::User(user)),
        }),
    }
}

/// The access level a resolved user account carries
#[must_use]
pub fn user_level(user: &User) -> AccessLevel {
    if user.is_admin() {
        AccessLevel::Admin
    } else if membership::is_premium(&user.memberships) {
        AccessLevel::Premium
    } else {
        AccessLevel::Normal
    }
}

async fn resolve_required(
    database: &Database,
    auth: &AuthManager,
    headers: &HeaderMap,
) -> AppResult<Subject> {
    let token =
        bearer_token(headers).ok_or_else(|| AppError::auth_required("Not authorized, no token"))?;
    let subject_id = auth.validate_token(token)?;
    resolve_subject(database, subject_id)
        .await?
        .ok_or_else(|| AppError::auth_invalid("Account not found"))
}

/// Require a signed-in user account (any tier, including admins)
pub async fn require_user(
    database: &Database,
    auth: &AuthManager,
    headers: &HeaderMap,
) -> AppResult<User> {
    match resolve_required(database, auth, headers).await? {
        Subject::User(user) => Ok(user),
        Subject::Therapist(_) => Err(AppError::forbidden("This route is for user accounts")),
    }
}

/// Require an administrator
pub async fn require_admin(
    database: &Database,
    auth: &AuthManager,
    headers: &HeaderMap,
) -> AppResult<User> {
    let user = require_user(database, auth, headers).await?;
    if user.is_admin() {
        Ok(user)
    } else {
        Err(AppError::forbidden("Not authorized as an admin"))
    }
}

/// Require an approved therapist account
pub async fn require_therapist(
    database: &Database,
    auth: &AuthManager,
    headers: &HeaderMap,
) -> AppResult<Therapist> {
    match resolve_required(database, auth, headers).await? {
        Subject::Therapist(therapist) if therapist.status == TherapistStatus::Active => {
            Ok(therapist)
        }
        Subject::Therapist(_) => {
            Err(AppError::forbidden("Access denied, account is not active"))
        }
        Subject::User(_) => Err(AppError::forbidden("This route is for therapist accounts")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_round_trip() {
        let manager = AuthManager::new("unit-test-secret", 1);
        let id = Uuid::new_v4();
        let token = manager.generate_token(id).unwrap();
        assert_eq!(manager.validate_token(&token).unwrap(), id);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let manager = AuthManager::new("unit-test-secret", 1);
        let token = manager.generate_token(Uuid::new_v4()).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(manager.validate_token(&tampered).is_err());

        let other = AuthManager::new("different-secret", 1);
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn bearer_extraction_handles_malformed_headers() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert!(bearer_token(&headers).is_none());

        headers.insert("authorization", HeaderValue::from_static("Bearer tok123"));
        assert_eq!(bearer_token(&headers), Some("tok123"));
    }
}
