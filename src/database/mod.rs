// ABOUTME: SQLite persistence layer: pool construction, schema, re-exports
// ABOUTME: Domain managers live in submodules and share this pool
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Database layer
//!
//! A single SQLite pool backs the whole server. User and therapist account
//! storage hangs directly off [`Database`]; exercises, consultations, and
//! the social graph each get a manager struct constructed over the same
//! pool.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};

/// Consultation storage and lifecycle transitions
pub mod consultations;
/// Exercise catalog storage and discovery queries
pub mod exercises;
/// Per-user named exercise programs
pub mod routines;
/// Exercises saved with user-chosen dosage parameters
pub mod saved_exercises;
/// Follows and favorites
pub mod social;
/// Therapist account storage
pub mod therapists;
/// User account and membership storage
pub mod users;

pub use consultations::{
    ConsultationUpdate, ConsultationsManager, CreateConsultationRequest, PopulatedConsultation,
};
pub use exercises::{
    CreateExerciseRequest, ExerciseFilter, ExercisePage, ExercisesManager, UpdateExerciseRequest,
};
pub use routines::{CreateRoutineRequest, RoutineUpdate, RoutineWithExercise, RoutinesManager};
pub use saved_exercises::{
    SaveExerciseRequest, SavedExerciseUpdate, SavedExerciseWithExercise, SavedExercisesManager,
};
pub use social::SocialManager;

/// Shared handle to the SQLite pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database and apply the schema
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid database URL: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        // An in-memory database exists per connection, so the pool must
        // stay at one long-lived connection or each checkout sees an empty
        // schema.
        let mut pool_options = SqlitePoolOptions::new().max_connections(8);
        if database_url.contains(":memory:") {
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let database = Self { pool };
        database.migrate().await?;
        tracing::info!("database ready");
        Ok(database)
    }

    /// The underlying pool, for managers constructed elsewhere
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn migrate(&self) -> AppResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        full_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        profile_image TEXT,
        role TEXT NOT NULL DEFAULT 'user',
        created_by TEXT,
        creator_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS therapists (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        gender TEXT NOT NULL DEFAULT '',
        specializations TEXT NOT NULL DEFAULT '[]',
        working_at TEXT NOT NULL DEFAULT '',
        address TEXT NOT NULL DEFAULT '',
        experience TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'pending',
        consultation_count INTEGER NOT NULL DEFAULT 0,
        request_count INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS memberships (
        id TEXT PRIMARY KEY,
        owner_id TEXT NOT NULL,
        owner_kind TEXT NOT NULL,
        membership_type TEXT NOT NULL,
        payment_date TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_memberships_owner
        ON memberships (owner_id, owner_kind)",
    r"CREATE TABLE IF NOT EXISTS exercises (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        instruction TEXT NOT NULL DEFAULT '',
        images TEXT NOT NULL DEFAULT '[]',
        video TEXT,
        category TEXT NOT NULL,
        sub_category TEXT NOT NULL DEFAULT '',
        position TEXT NOT NULL DEFAULT '',
        reps INTEGER NOT NULL DEFAULT 0,
        hold INTEGER NOT NULL DEFAULT 0,
        sets INTEGER NOT NULL DEFAULT 0,
        is_premium INTEGER NOT NULL DEFAULT 0,
        created_by TEXT NOT NULL,
        creator_id TEXT,
        visibility TEXT NOT NULL DEFAULT 'public',
        views INTEGER NOT NULL DEFAULT 0,
        favorites INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_exercises_category
        ON exercises (category, sub_category)",
    r"CREATE TABLE IF NOT EXISTS consultations (
        id TEXT PRIMARY KEY,
        therapist_id TEXT NOT NULL REFERENCES therapists (id),
        patient_id TEXT NOT NULL REFERENCES users (id),
        status TEXT NOT NULL DEFAULT 'pending',
        active_days INTEGER NOT NULL,
        expires_on TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_consultations_therapist
        ON consultations (therapist_id)",
    r"CREATE INDEX IF NOT EXISTS idx_consultations_patient
        ON consultations (patient_id)",
    r"CREATE TABLE IF NOT EXISTS consultation_exercises (
        consultation_id TEXT NOT NULL REFERENCES consultations (id) ON DELETE CASCADE,
        exercise_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        PRIMARY KEY (consultation_id, exercise_id)
    )",
    r"CREATE TABLE IF NOT EXISTS follows (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        therapist_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, therapist_id)
    )",
    r"CREATE TABLE IF NOT EXISTS favorites (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        exercise_id TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE (user_id, exercise_id)
    )",
    r"CREATE TABLE IF NOT EXISTS routines (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        exercise_id TEXT NOT NULL,
        name TEXT NOT NULL,
        reps INTEGER NOT NULL DEFAULT 0,
        hold INTEGER NOT NULL DEFAULT 0,
        complete INTEGER NOT NULL DEFAULT 0,
        perform_count INTEGER NOT NULL DEFAULT 0,
        perform_type TEXT NOT NULL DEFAULT 'day',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    r"CREATE INDEX IF NOT EXISTS idx_routines_user ON routines (user_id)",
    r"CREATE TABLE IF NOT EXISTS saved_exercises (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users (id),
        exercise_id TEXT NOT NULL,
        reps INTEGER NOT NULL DEFAULT 0,
        hold INTEGER NOT NULL DEFAULT 0,
        complete INTEGER NOT NULL DEFAULT 0,
        perform_count INTEGER NOT NULL DEFAULT 0,
        perform_type TEXT NOT NULL DEFAULT 'day',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (user_id, exercise_id)
    )",
];
