// ABOUTME: Integration tests for routines and saved exercises
// ABOUTME: Ownership checks, the premium save gate, and delete cascades
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;
mod helpers;

use axum::http::StatusCode;
use common::{
    create_pro_user, create_test_exercise, create_test_resources, create_test_user, token_for,
};
use helpers::axum_test::AxumTestRequest;
use hep_server::server;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn routine_crud_round_trip() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "runner@example.com").await;
    let exercise = create_test_exercise(&resources, "Calf Stretch", false).await;
    let token = token_for(&resources, user.id);

    let response = AxumTestRequest::post("/api/routines")
        .bearer(&token)
        .json(&json!({
            "exercise_id": exercise.id,
            "name": "Morning warmup",
            "reps": 12,
            "hold": 5,
            "perform_count": 2,
            "perform_type": "day",
        }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json();
    assert_eq!(created["name"], "Morning warmup");
    let routine_id = created["id"].as_str().unwrap().to_owned();

    // Listing comes back populated with the exercise
    let response = AxumTestRequest::get("/api/routines")
        .bearer(&token)
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed: Value = response.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
    assert_eq!(listed[0]["exercise"]["title"], "Calf Stretch");
    assert_eq!(listed[0]["reps"], 12);

    let response = AxumTestRequest::put(&format!("/api/routines/{routine_id}"))
        .bearer(&token)
        .json(&json!({ "reps": 15, "perform_type": "week" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["reps"], 15);
    assert_eq!(updated["perform_type"], "week");
    // Untouched fields survive the partial update
    assert_eq!(updated["hold"], 5);

    let response = AxumTestRequest::delete(&format!("/api/routines/{routine_id}"))
        .bearer(&token)
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = AxumTestRequest::get("/api/routines")
        .bearer(&token)
        .send(server::router(resources))
        .await;
    let listed: Value = response.json();
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn routine_for_unknown_exercise_is_rejected() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "runner@example.com").await;

    let response = AxumTestRequest::post("/api/routines")
        .bearer(&token_for(&resources, user.id))
        .json(&json!({ "exercise_id": Uuid::new_v4(), "name": "Ghost program" }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routines_belong_to_their_creator() {
    let resources = create_test_resources().await;
    let owner = create_test_user(&resources.database, "owner@example.com").await;
    let stranger = create_test_user(&resources.database, "stranger@example.com").await;
    let exercise = create_test_exercise(&resources, "Bridge", false).await;

    let routine = resources
        .routines()
        .create_routine(
            owner.id,
            hep_server::database::CreateRoutineRequest {
                exercise_id: exercise.id,
                name: "Core day".to_owned(),
                reps: 10,
                hold: 0,
                complete: 0,
                perform_count: 1,
                perform_type: hep_server::models::PerformInterval::Day,
            },
        )
        .await
        .unwrap();

    let response = AxumTestRequest::put(&format!("/api/routines/{}", routine.id))
        .bearer(&token_for(&resources, stranger.id))
        .json(&json!({ "name": "Hijacked" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // The stranger's own listing stays empty; the routine is untouched
    let stored = resources
        .routines()
        .get_routine(routine.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Core day");
}

#[tokio::test]
async fn premium_exercises_are_saved_by_pro_users_only() {
    let resources = create_test_resources().await;
    let free_user = create_test_user(&resources.database, "free@example.com").await;
    let pro_user = create_pro_user(&resources.database, "pro@example.com").await;
    let premium = create_test_exercise(&resources, "Premium Lunge", true).await;

    let response = AxumTestRequest::post("/api/saved-exercises")
        .bearer(&token_for(&resources, free_user.id))
        .json(&json!({ "exercise_id": premium.id }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let pro_token = token_for(&resources, pro_user.id);
    let response = AxumTestRequest::post("/api/saved-exercises")
        .bearer(&pro_token)
        .json(&json!({ "exercise_id": premium.id, "reps": 8 }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let saved: Value = response.json();
    assert_eq!(saved["reps"], 8);
    // Pro viewers see the premium video in the populated exercise
    assert!(saved["exercise"]["video"].is_string());

    // One save per pair
    let response = AxumTestRequest::post("/api/saved-exercises")
        .bearer(&pro_token)
        .json(&json!({ "exercise_id": premium.id }))
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn saved_dosage_updates_are_owner_only() {
    let resources = create_test_resources().await;
    let owner = create_test_user(&resources.database, "owner@example.com").await;
    let stranger = create_test_user(&resources.database, "stranger@example.com").await;
    let exercise = create_test_exercise(&resources, "Squat", false).await;
    let owner_token = token_for(&resources, owner.id);

    let response = AxumTestRequest::post("/api/saved-exercises")
        .bearer(&owner_token)
        .json(&json!({ "exercise_id": exercise.id, "reps": 10 }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let saved: Value = response.json();
    let saved_id = saved["id"].as_str().unwrap().to_owned();

    let response = AxumTestRequest::put(&format!("/api/saved-exercises/{saved_id}"))
        .bearer(&token_for(&resources, stranger.id))
        .json(&json!({ "reps": 99 }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = AxumTestRequest::put(&format!("/api/saved-exercises/{saved_id}"))
        .bearer(&owner_token)
        .json(&json!({ "reps": 12, "perform_count": 3 }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = response.json();
    assert_eq!(updated["reps"], 12);
    assert_eq!(updated["perform_count"], 3);

    let response = AxumTestRequest::delete(&format!("/api/saved-exercises/{saved_id}"))
        .bearer(&owner_token)
        .send(server::router(resources))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn exercise_delete_cascades_to_routines_and_saves() {
    let resources = create_test_resources().await;
    let user = create_test_user(&resources.database, "owner@example.com").await;
    let exercise = create_test_exercise(&resources, "Doomed", false).await;
    let token = token_for(&resources, user.id);

    let response = AxumTestRequest::post("/api/routines")
        .bearer(&token)
        .json(&json!({ "exercise_id": exercise.id, "name": "Short lived" }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = AxumTestRequest::post("/api/saved-exercises")
        .bearer(&token)
        .json(&json!({ "exercise_id": exercise.id }))
        .send(server::router(resources.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    resources
        .exercises()
        .delete_exercise(exercise.id)
        .await
        .unwrap();

    let routines = resources.routines().list_for_user(user.id).await.unwrap();
    assert!(routines.is_empty());
    let saves = resources
        .saved_exercises()
        .list_for_user(user.id)
        .await
        .unwrap();
    assert!(saves.is_empty());
}
