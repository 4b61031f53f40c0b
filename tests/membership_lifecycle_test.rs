// ABOUTME: Integration tests for lazy membership evaluation on access
// ABOUTME: Verifies expiry correction persists through the auth path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_test_resources, create_test_therapist, create_test_user, token_for};
use helpers::axum_test::AxumTestRequest;
use hep_server::models::{
    Membership, MembershipStatus, MembershipType, SubjectKind, TherapistStatus,
};
use hep_server::server;
use serde_json::json;

#[tokio::test]
async fn expired_paid_tier_is_corrected_and_persisted_on_access() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "lapsed@example.com").await;

    // Overwrite the history: inactive free record plus a monthly paid
    // record whose term elapsed ten days ago.
    let now = Utc::now();
    let mut free = Membership::free(now - Duration::days(100));
    free.status = MembershipStatus::Inactive;
    let mut paid = Membership::paid(MembershipType::Monthly, now);
    paid.payment_date = Some(now - Duration::days(40));
    resources
        .database
        .store_memberships(user.id, SubjectKind::User, &[free, paid])
        .await
        .unwrap();

    let token = token_for(&resources, user.id);
    let response = AxumTestRequest::get("/api/users/membership")
        .bearer(&token)
        .send(server::router(resources.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_premium"], json!(false));
    assert_eq!(body["current"]["membership_type"], json!("free"));

    // The correction was written back, not just reported
    let stored = resources
        .database
        .load_memberships(user.id, SubjectKind::User)
        .await
        .unwrap();
    let active: Vec<_> = stored
        .iter()
        .filter(|r| r.status == MembershipStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].membership_type, MembershipType::Free);
}

#[tokio::test]
async fn upgrade_route_deactivates_current_and_appends_paid() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "upgrader@example.com").await;
    let token = token_for(&resources, user.id);

    let response = AxumTestRequest::post("/api/users/upgrade")
        .bearer(&token)
        .json(&json!({ "membership_type": "yearly" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let stored = resources
        .database
        .load_memberships(user.id, SubjectKind::User)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    let active: Vec<_> = stored
        .iter()
        .filter(|r| r.status == MembershipStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].membership_type, MembershipType::Yearly);
}

#[tokio::test]
async fn therapist_expired_tier_is_corrected_and_persisted_on_access() {
    let resources = create_test_resources().await;
    let therapist = create_test_therapist(
        &resources.database,
        "lapsed.pt@example.com",
        TherapistStatus::Active,
    )
    .await;

    // Overwrite the history with a monthly record paid 40 days ago
    let now = Utc::now();
    let mut paid = Membership::paid(MembershipType::Monthly, now);
    paid.payment_date = Some(now - Duration::days(40));
    resources
        .database
        .store_memberships(therapist.id, SubjectKind::Therapist, &[paid])
        .await
        .unwrap();

    let token = token_for(&resources, therapist.id);
    let response = AxumTestRequest::get("/api/therapist/membership")
        .bearer(&token)
        .send(server::router(resources.clone()))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["is_premium"], json!(false));
    assert_eq!(body["current"]["membership_type"], json!("free"));

    let stored = resources
        .database
        .load_memberships(therapist.id, SubjectKind::Therapist)
        .await
        .unwrap();
    let active: Vec<_> = stored
        .iter()
        .filter(|r| r.status == MembershipStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].membership_type, MembershipType::Free);
}

#[tokio::test]
async fn therapist_payment_deactivates_current_and_appends_paid() {
    let resources = create_test_resources().await;
    let therapist = create_test_therapist(
        &resources.database,
        "paying.pt@example.com",
        TherapistStatus::Active,
    )
    .await;
    let token = token_for(&resources, therapist.id);

    let response = AxumTestRequest::put("/api/therapist/membership")
        .bearer(&token)
        .json(&json!({ "membership_type": "monthly" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["current"]["membership_type"], json!("monthly"));

    let stored = resources
        .database
        .load_memberships(therapist.id, SubjectKind::Therapist)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    let active: Vec<_> = stored
        .iter()
        .filter(|r| r.status == MembershipStatus::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].membership_type, MembershipType::Monthly);

    // Free is not a payment
    let response = AxumTestRequest::put("/api/therapist/membership")
        .bearer(&token)
        .json(&json!({ "membership_type": "free" }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upgrading_to_free_is_rejected() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "cheap@example.com").await;
    let token = token_for(&resources, user.id);

    let response = AxumTestRequest::post("/api/users/upgrade")
        .bearer(&token)
        .json(&json!({ "membership_type": "free" }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
