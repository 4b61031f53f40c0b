// ABOUTME: Saved-exercise storage: one dosage-parameterized save per pair
// ABOUTME: Premium gating happens in the route; this layer owns the edge
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Saved exercise persistence
//!
//! A save is like a favorite but carries the user's own dosage parameters.
//! At most one save exists per user/exercise pair; duplicates are conflicts.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::exercises::{row_to_exercise, EXERCISE_COLUMNS};
use super::users::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::{Exercise, PerformInterval, SavedExercise};

/// Payload for saving an exercise with dosage parameters
#[derive(Debug, Deserialize)]
pub struct SaveExerciseRequest {
    pub exercise_id: Uuid,
    #[serde(default)]
    pub reps: i64,
    #[serde(default)]
    pub hold: i64,
    #[serde(default)]
    pub complete: i64,
    #[serde(default)]
    pub perform_count: i64,
    #[serde(default)]
    pub perform_type: PerformInterval,
}

/// Partial dosage update; `None` fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct SavedExerciseUpdate {
    pub reps: Option<i64>,
    pub hold: Option<i64>,
    pub complete: Option<i64>,
    pub perform_count: Option<i64>,
    pub perform_type: Option<PerformInterval>,
}

/// A save joined with the exercise it parameterizes
#[derive(Debug, Serialize)]
pub struct SavedExerciseWithExercise {
    #[serde(flatten)]
    pub saved: SavedExercise,
    pub exercise: Option<Exercise>,
}

/// Saved-exercise operations over the shared pool
pub struct SavedExercisesManager {
    pool: SqlitePool,
}

impl SavedExercisesManager {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a save. Duplicate saves are conflicts, not no-ops.
    pub async fn save_exercise(
        &self,
        user_id: Uuid,
        request: SaveExerciseRequest,
    ) -> AppResult<SavedExercise> {
        let now = Utc::now();
        let saved = SavedExercise {
            id: Uuid::new_v4(),
            user_id,
            exercise_id: request.exercise_id,
            reps: request.reps,
            hold: request.hold,
            complete: request.complete,
            perform_count: request.perform_count,
            perform_type: request.perform_type,
            created_at: now,
            updated_at: now,
        };
        let result = sqlx::query(
            r"
            INSERT INTO saved_exercises (
                id, user_id, exercise_id, reps, hold, complete,
                perform_count, perform_type, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(saved.id.to_string())
        .bind(saved.user_id.to_string())
        .bind(saved.exercise_id.to_string())
        .bind(saved.reps)
        .bind(saved.hold)
        .bind(saved.complete)
        .bind(saved.perform_count)
        .bind(saved.perform_type.as_str())
        .bind(saved.created_at)
        .bind(saved.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(saved),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::conflict("Exercise already saved"))
            }
            Err(e) => Err(AppError::database(format!("Failed to save exercise: {e}"))),
        }
    }

    /// Get a save by id
    pub async fn get_saved(&self, saved_id: Uuid) -> AppResult<Option<SavedExercise>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, reps, hold, complete,
                   perform_count, perform_type, created_at, updated_at
            FROM saved_exercises WHERE id = $1
            ",
        )
        .bind(saved_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get saved exercise: {e}")))?;

        row.as_ref().map(row_to_saved).transpose()
    }

    /// A user's saves with their exercises, most recent first
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
    ) -> AppResult<Vec<SavedExerciseWithExercise>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, reps, hold, complete,
                   perform_count, perform_type, created_at, updated_at
            FROM saved_exercises WHERE user_id = $1 ORDER BY created_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list saved exercises: {e}")))?;

        let mut saves = Vec::with_capacity(rows.len());
        for row in &rows {
            let saved = row_to_saved(row)?;
            let exercise = self.fetch_exercise(saved.exercise_id).await?;
            saves.push(SavedExerciseWithExercise { saved, exercise });
        }
        Ok(saves)
    }

    /// Apply a dosage update; the caller has already verified ownership
    pub async fn update_saved(
        &self,
        saved_id: Uuid,
        update: SavedExerciseUpdate,
    ) -> AppResult<SavedExercise> {
        let Some(mut saved) = self.get_saved(saved_id).await? else {
            return Err(AppError::not_found("Saved exercise"));
        };

        if let Some(reps) = update.reps {
            saved.reps = reps;
        }
        if let Some(hold) = update.hold {
            saved.hold = hold;
        }
        if let Some(complete) = update.complete {
            saved.complete = complete;
        }
        if let Some(perform_count) = update.perform_count {
            saved.perform_count = perform_count;
        }
        if let Some(perform_type) = update.perform_type {
            saved.perform_type = perform_type;
        }
        saved.updated_at = Utc::now();

        sqlx::query(
            r"
            UPDATE saved_exercises SET
                reps = $2, hold = $3, complete = $4,
                perform_count = $5, perform_type = $6, updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(saved.id.to_string())
        .bind(saved.reps)
        .bind(saved.hold)
        .bind(saved.complete)
        .bind(saved.perform_count)
        .bind(saved.perform_type.as_str())
        .bind(saved.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update saved exercise: {e}")))?;

        Ok(saved)
    }

    /// Remove a save
    pub async fn delete_saved(&self, saved_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM saved_exercises WHERE id = $1")
            .bind(saved_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete saved exercise: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Saved exercise"));
        }
        Ok(())
    }

    async fn fetch_exercise(&self, exercise_id: Uuid) -> AppResult<Option<Exercise>> {
        let query = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(exercise_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load exercise: {e}")))?;
        row.as_ref().map(row_to_exercise).transpose()
    }
}

fn row_to_saved(row: &SqliteRow) -> AppResult<SavedExercise> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let exercise_id: String = row.get("exercise_id");
    let perform_type: String = row.get("perform_type");

    Ok(SavedExercise {
        id: parse_uuid(&id, "saved exercise id")?,
        user_id: parse_uuid(&user_id, "user id")?,
        exercise_id: parse_uuid(&exercise_id, "exercise id")?,
        reps: row.get("reps"),
        hold: row.get("hold"),
        complete: row.get("complete"),
        perform_count: row.get("perform_count"),
        perform_type: PerformInterval::parse(&perform_type),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
