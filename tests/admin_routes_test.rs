// ABOUTME: Integration tests for the admin surface
// ABOUTME: Approval workflow, dashboard stats and privileged status edits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{
    create_admin_user, create_pro_user, create_test_exercise, create_test_resources,
    create_test_therapist, create_test_user, token_for,
};
use helpers::axum_test::AxumTestRequest;
use hep_server::models::TherapistStatus;
use hep_server::server;
use serde_json::{json, Value};

#[tokio::test]
async fn admin_login_rejects_regular_accounts() {
    let resources = create_test_resources().await;
    create_test_user(&resources.database, "user@example.com").await;
    create_admin_user(&resources.database, "admin@example.com").await;

    let response = AxumTestRequest::post("/api/admin/login")
        .json(&json!({ "email": "user@example.com", "password": "password123" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = AxumTestRequest::post("/api/admin/login")
        .json(&json!({ "email": "admin@example.com", "password": "password123" }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["token"].is_string());
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn approval_unlocks_therapist_login() {
    let resources = create_test_resources().await;
    let admin = create_admin_user(&resources.database, "admin@example.com").await;
    let therapist = create_test_therapist(
        &resources.database,
        "t@example.com",
        TherapistStatus::Pending,
    )
    .await;
    let login = json!({ "email": "t@example.com", "password": "password123" });

    let response = AxumTestRequest::post("/api/therapists/login")
        .json(&login)
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = AxumTestRequest::put(&format!("/api/admin/therapists/{}/status", therapist.id))
        .bearer(&token_for(&resources, admin.id))
        .json(&json!({ "status": "active" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["status"], "active");

    let response = AxumTestRequest::post("/api/therapists/login")
        .json(&login)
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json();
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn unknown_therapist_status_is_rejected() {
    let resources = create_test_resources().await;
    let admin = create_admin_user(&resources.database, "admin@example.com").await;
    let therapist = create_test_therapist(
        &resources.database,
        "t@example.com",
        TherapistStatus::Pending,
    )
    .await;

    let response = AxumTestRequest::put(&format!("/api/admin/therapists/{}/status", therapist.id))
        .bearer(&token_for(&resources, admin.id))
        .json(&json!({ "status": "approved" }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stats_reflect_the_seeded_platform() {
    let resources = create_test_resources().await;
    let admin = create_admin_user(&resources.database, "admin@example.com").await;
    create_test_user(&resources.database, "u@example.com").await;
    create_pro_user(&resources.database, "pro@example.com").await;
    create_test_therapist(&resources.database, "t1@example.com", TherapistStatus::Active).await;
    create_test_therapist(
        &resources.database,
        "t2@example.com",
        TherapistStatus::Pending,
    )
    .await;
    create_test_exercise(&resources, "Free Squat", false).await;
    create_test_exercise(&resources, "Premium Lunge", true).await;

    let response = AxumTestRequest::get("/api/admin/stats")
        .bearer(&token_for(&resources, admin.id))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let stats: Value = response.json();
    assert_eq!(stats["users"], 3);
    assert_eq!(stats["pro_users"], 1);
    assert_eq!(stats["therapists"], 2);
    assert_eq!(stats["active_therapists"], 1);
    assert_eq!(stats["pending_therapists"], 1);
    assert_eq!(stats["exercises"], 2);
    assert_eq!(stats["premium_exercises"], 1);
    assert_eq!(stats["consultations"], 0);

    // A non-admin token gets nothing out of the dashboard
    let user = create_test_user(&resources.database, "nosy@example.com").await;
    let response = AxumTestRequest::get("/api/admin/stats")
        .bearer(&token_for(&resources, user.id))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_overrides_a_consultation_status() {
    let resources = create_test_resources().await;
    let admin = create_admin_user(&resources.database, "admin@example.com").await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;

    let response = AxumTestRequest::post("/api/therapist/consultations")
        .bearer(&token_for(&resources, therapist.id))
        .json(&json!({ "patient_id": patient.id }))
        .send(server::router(resources.clone()))
        .await;
    let created: Value = response.json();
    let consultation_id = created["id"].as_str().unwrap().to_owned();

    let response = AxumTestRequest::put(&format!(
        "/api/admin/consultations/{consultation_id}/status"
    ))
    .bearer(&token_for(&resources, admin.id))
    .json(&json!({ "status": "inactive" }))
    .send(server::router(resources.clone()))
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["status"], "inactive");

    // The override is visible to the owning therapist's workload counters
    let refreshed = resources
        .database
        .get_therapist(therapist.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.consultation_count, 0);
}

#[tokio::test]
async fn deleting_a_therapist_sweeps_their_records() {
    let resources = create_test_resources().await;
    let admin = create_admin_user(&resources.database, "admin@example.com").await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let user = create_test_user(&resources.database, "u@example.com").await;
    resources
        .social()
        .follow_therapist(user.id, therapist.id)
        .await
        .unwrap();

    let response = AxumTestRequest::delete(&format!("/api/admin/therapists/{}", therapist.id))
        .bearer(&token_for(&resources, admin.id))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    assert!(resources
        .database
        .get_therapist(therapist.id)
        .await
        .unwrap()
        .is_none());
    let following = resources.social().list_following(user.id).await.unwrap();
    assert!(following.is_empty());
}
