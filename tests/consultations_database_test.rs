// ABOUTME: Manager-level tests for the consultation lifecycle
// ABOUTME: Activation windows, lazy expiration, update semantics, deletion
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{create_test_resources, create_test_therapist, create_test_user};
use hep_server::database::{ConsultationUpdate, CreateConsultationRequest};
use hep_server::models::{ConsultationStatus, TherapistStatus};
use uuid::Uuid;

#[tokio::test]
async fn create_activates_immediately_with_expiry_window() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;

    let consultation = resources
        .consultations()
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: Some(14),
                notes: Some("twice daily".to_owned()),
            },
            30,
        )
        .await
        .unwrap();

    assert_eq!(consultation.status, ConsultationStatus::Active);
    let expires_on = consultation.expires_on.unwrap();
    let expected = consultation.created_at + Duration::days(14);
    assert!((expires_on - expected).num_seconds().abs() < 5);

    // Round-trips through storage
    let loaded = resources
        .consultations()
        .get_consultation(consultation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.status, ConsultationStatus::Active);
    assert_eq!(loaded.active_days, 14);
}

#[tokio::test]
async fn oversized_active_days_is_rejected_everywhere() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    // A window beyond the bound never reaches date arithmetic
    let err = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: Some(i64::MAX),
                notes: None,
            },
            30,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

    let consultation = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: Some(14),
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    let err = manager
        .update_consultation(
            consultation.id,
            ConsultationUpdate {
                active_days: Some(1_000_000),
                ..ConsultationUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

    let err = manager
        .activate_consultation(consultation.id, i64::MAX, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

    // The stored window is untouched
    let stored = manager
        .get_consultation(consultation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.active_days, 14);
}

#[tokio::test]
async fn create_for_unknown_patient_is_rejected() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;

    let err = resources
        .consultations()
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: Uuid::new_v4(),
                recommended_exercises: vec![],
                active_days: None,
                notes: None,
            },
            30,
        )
        .await
        .unwrap_err();
    assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn expired_consultation_flips_once_and_stays_inactive() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    let mut consultation = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: Some(7),
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    let later = Utc::now() + Duration::days(8);
    assert!(consultation.check_expiration(later));
    manager.persist_lifecycle(&consultation).await.unwrap();

    let stored = manager
        .get_consultation(consultation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConsultationStatus::Inactive);

    // A second pass changes nothing and never resurrects
    let mut again = stored;
    assert!(!again.check_expiration(later + Duration::days(30)));
    assert_eq!(again.status, ConsultationStatus::Inactive);
}

#[tokio::test]
async fn update_recomputes_expiry_from_creation_not_from_now() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    let consultation = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: Some(7),
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    let updated = manager
        .update_consultation(
            consultation.id,
            ConsultationUpdate {
                active_days: Some(21),
                ..ConsultationUpdate::default()
            },
        )
        .await
        .unwrap();

    // Window origin is creation, not the update instant
    let expected = consultation.created_at + Duration::days(21);
    assert!((updated.expires_on.unwrap() - expected).num_seconds().abs() < 5);
}

#[tokio::test]
async fn update_rejects_unknown_status_string() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    let consultation = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: None,
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    let err = manager
        .update_consultation(
            consultation.id,
            ConsultationUpdate {
                status: Some("expired".to_owned()),
                ..ConsultationUpdate::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code.status(), StatusCode::BAD_REQUEST);

    // Document untouched
    let stored = manager
        .get_consultation(consultation.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ConsultationStatus::Active);
}

#[tokio::test]
async fn listing_is_newest_first_and_exercise_order_survives() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    let first_exercise = common::create_test_exercise(&resources, "Heel raise", false).await;
    let second_exercise = common::create_test_exercise(&resources, "Squat", false).await;

    let older = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![second_exercise.id, first_exercise.id],
                active_days: None,
                notes: None,
            },
            30,
        )
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let newer = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: None,
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    let listed = manager.list_for_therapist(therapist.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, newer.id);
    assert_eq!(listed[1].id, older.id);
    // Prescribed order is positional, not insertion-id order
    assert_eq!(
        listed[1].recommended_exercises,
        vec![second_exercise.id, first_exercise.id]
    );
}

#[tokio::test]
async fn delete_removes_consultation() {
    let resources = create_test_resources().await;
    let therapist =
        create_test_therapist(&resources.database, "t@example.com", TherapistStatus::Active).await;
    let patient = create_test_user(&resources.database, "p@example.com").await;
    let manager = resources.consultations();

    let consultation = manager
        .create_consultation(
            therapist.id,
            CreateConsultationRequest {
                patient_id: patient.id,
                recommended_exercises: vec![],
                active_days: None,
                notes: None,
            },
            30,
        )
        .await
        .unwrap();

    manager.delete_consultation(consultation.id).await.unwrap();
    assert!(manager
        .get_consultation(consultation.id)
        .await
        .unwrap()
        .is_none());

    let err = manager.delete_consultation(consultation.id).await.unwrap_err();
    assert_eq!(err.code.status(), StatusCode::NOT_FOUND);
}
