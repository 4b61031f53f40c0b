// ABOUTME: Shared test setup: in-memory resources and seeded accounts
// ABOUTME: Reduces duplication across the integration test files
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code, missing_docs)]

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use hep_server::config::ServerConfig;
use hep_server::database::{CreateExerciseRequest, Database};
use hep_server::models::{
    CreatorKind, Exercise, Membership, MembershipType, Therapist, TherapistStatus, User, UserRole,
};
use hep_server::server::ServerResources;

/// Fresh in-memory server resources
pub async fn create_test_resources() -> Arc<ServerResources> {
    let config = ServerConfig::for_tests();
    Arc::new(ServerResources::new(config).await.unwrap())
}

/// Fresh in-memory database only
pub async fn create_test_db() -> Database {
    Database::new("sqlite::memory:").await.unwrap()
}

fn test_hash(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

/// Seed a regular free-tier user; password is `password123`
pub async fn create_test_user(database: &Database, email: &str) -> User {
    let user = User::new(
        "Test Patient".to_owned(),
        email.to_owned(),
        test_hash("password123"),
    );
    database.create_user(&user).await.unwrap();
    user
}

/// Seed a user with an active paid membership; password is `password123`
pub async fn create_pro_user(database: &Database, email: &str) -> User {
    let mut user = User::new(
        "Pro Patient".to_owned(),
        email.to_owned(),
        test_hash("password123"),
    );
    hep_server::membership::upgrade(&mut user.memberships, MembershipType::Monthly, Utc::now());
    database.create_user(&user).await.unwrap();
    // the freshly upgraded history is what create_user persisted
    user
}

/// Seed an admin user; password is `password123`
pub async fn create_admin_user(database: &Database, email: &str) -> User {
    let mut user = User::new(
        "Test Admin".to_owned(),
        email.to_owned(),
        test_hash("password123"),
    );
    user.role = UserRole::Admin;
    database.create_user(&user).await.unwrap();
    user
}

/// Seed a therapist in the given status; password is `password123`
pub async fn create_test_therapist(
    database: &Database,
    email: &str,
    status: TherapistStatus,
) -> Therapist {
    let now = Utc::now();
    let therapist = Therapist {
        id: Uuid::new_v4(),
        name: "Test Therapist".to_owned(),
        email: email.to_owned(),
        password_hash: test_hash("password123"),
        gender: "female".to_owned(),
        specializations: vec!["orthopedic".to_owned()],
        working_at: "Test Clinic".to_owned(),
        address: "1 Test Street".to_owned(),
        experience: "5 years".to_owned(),
        status,
        consultation_count: 0,
        request_count: 0,
        memberships: vec![Membership::free(now)],
        created_at: now,
        updated_at: now,
    };
    database.create_therapist(&therapist).await.unwrap();
    therapist
}

/// Seed a public exercise through the manager
pub async fn create_test_exercise(
    resources: &ServerResources,
    title: &str,
    is_premium: bool,
) -> Exercise {
    resources
        .exercises()
        .create_exercise(
            CreateExerciseRequest {
                title: title.to_owned(),
                description: "desc".to_owned(),
                instruction: "do the thing".to_owned(),
                images: vec![],
                video: Some("https://cdn.example/video.mp4".to_owned()),
                category: "Knee".to_owned(),
                sub_category: "Strength".to_owned(),
                position: "Standing".to_owned(),
                reps: 10,
                hold: 3,
                sets: 3,
                is_premium,
                visibility: hep_server::models::ExerciseVisibility::Public,
            },
            CreatorKind::Admin,
            None,
        )
        .await
        .unwrap()
}

/// Bearer token for any subject id
pub fn token_for(resources: &ServerResources, subject_id: Uuid) -> String {
    resources.auth.generate_token(subject_id).unwrap()
}
