// ABOUTME: Routine storage: per-user named programs wrapping one exercise
// ABOUTME: Listings come back populated with the referenced exercise row
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Routine persistence
//!
//! A routine is a user's own program entry: one exercise, a name, and the
//! dosage the user chose. Listings join the exercise in; a routine whose
//! exercise was deleted out from under it simply carries `None`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::exercises::{row_to_exercise, EXERCISE_COLUMNS};
use super::users::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::{Exercise, PerformInterval, Routine};

/// Payload for creating a routine
#[derive(Debug, Deserialize)]
pub struct CreateRoutineRequest {
    pub exercise_id: Uuid,
    pub name: String,
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

/// Partial routine update; `None` fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct RoutineUpdate {
    pub name: Option<String>,
    pub reps: Option<i64>,
    pub hold: Option<i64>,
    pub complete: Option<i64>,
    pub perform_count: Option<i64>,
    pub perform_type: Option<PerformInterval>,
}

/// A routine joined with the exercise it performs
#[derive(Debug, Serialize)]
pub struct RoutineWithExercise {
    #[serde(flatten)]
    pub routine: Routine,
    pub exercise: Option<Exercise>,
}

/// Routine operations over the shared pool
pub struct RoutinesManager {
    pool: SqlitePool,
}

impl RoutinesManager {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a routine for a user.
    ///
    /// # Errors
    /// Returns an error if the name is empty, the exercise does not exist,
    /// or the write fails.
    pub async fn create_routine(
        &self,
        user_id: Uuid,
        request: CreateRoutineRequest,
    ) -> AppResult<Routine> {
        if request.name.trim().is_empty() {
            return Err(AppError::invalid_input("Routine name is required"));
        }
        self.require_exercise(request.exercise_id).await?;

        let now = Utc::now();
        let routine = Routine {
            id: Uuid::new_v4(),
            user_id,
            exercise_id: request.exercise_id,
            name: request.name.trim().to_owned(),
            reps: request.reps,
            hold: request.hold,
            complete: request.complete,
            perform_count: request.perform_count,
            perform_type: request.perform_type,
            created_at: now,
            updated_at: now,
        };
        sqlx::query(
            r"
            INSERT INTO routines (
                id, user_id, exercise_id, name, reps, hold, complete,
                perform_count, perform_type, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ",
        )
        .bind(routine.id.to_string())
        .bind(routine.user_id.to_string())
        .bind(routine.exercise_id.to_string())
        .bind(&routine.name)
        .bind(routine.reps)
        .bind(routine.hold)
        .bind(routine.complete)
        .bind(routine.perform_count)
        .bind(routine.perform_type.as_str())
        .bind(routine.created_at)
        .bind(routine.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create routine: {e}")))?;

        Ok(routine)
    }

    /// Get a routine by id
    pub async fn get_routine(&self, routine_id: Uuid) -> AppResult<Option<Routine>> {
        let row = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, name, reps, hold, complete,
                   perform_count, perform_type, created_at, updated_at
            FROM routines WHERE id = $1
            ",
        )
        .bind(routine_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get routine: {e}")))?;

        row.as_ref().map(row_to_routine).transpose()
    }

    /// A user's routines with their exercises, most recently updated first
    pub async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<RoutineWithExercise>> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, exercise_id, name, reps, hold, complete,
                   perform_count, perform_type, created_at, updated_at
            FROM routines WHERE user_id = $1 ORDER BY updated_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list routines: {e}")))?;

        let mut routines = Vec::with_capacity(rows.len());
        for row in &rows {
            let routine = row_to_routine(row)?;
            let exercise = self.fetch_exercise(routine.exercise_id).await?;
            routines.push(RoutineWithExercise { routine, exercise });
        }
        Ok(routines)
    }

    /// Apply a partial update; the caller has already verified ownership
    pub async fn update_routine(
        &self,
        routine_id: Uuid,
        update: RoutineUpdate,
    ) -> AppResult<Routine> {
        let Some(mut routine) = self.get_routine(routine_id).await? else {
            return Err(AppError::not_found("Routine"));
        };

        if let Some(name) = update.name {
            if name.trim().is_empty() {
                return Err(AppError::invalid_input("Routine name is required"));
            }
            routine.name = name.trim().to_owned();
        }
        if let Some(reps) = update.reps {
            routine.reps = reps;
        }
        if let Some(hold) = update.hold {
            routine.hold = hold;
        }
        if let Some(complete) = update.complete {
            routine.complete = complete;
        }
        if let Some(perform_count) = update.perform_count {
            routine.perform_count = perform_count;
        }
        if let Some(perform_type) = update.perform_type {
            routine.perform_type = perform_type;
        }
        routine.updated_at = Utc::now();

        sqlx::query(
            r"
            UPDATE routines SET
                name = $2, reps = $3, hold = $4, complete = $5,
                perform_count = $6, perform_type = $7, updated_at = $8
            WHERE id = $1
            ",
        )
        .bind(routine.id.to_string())
        .bind(&routine.name)
        .bind(routine.reps)
        .bind(routine.hold)
        .bind(routine.complete)
        .bind(routine.perform_count)
        .bind(routine.perform_type.as_str())
        .bind(routine.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update routine: {e}")))?;

        Ok(routine)
    }

    /// Delete a routine
    pub async fn delete_routine(&self, routine_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM routines WHERE id = $1")
            .bind(routine_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete routine: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Routine"));
        }
        Ok(())
    }

    async fn require_exercise(&self, exercise_id: Uuid) -> AppResult<()> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE id = $1")
            .bind(exercise_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up exercise: {e}")))?;
        if exists == 0 {
            return Err(AppError::not_found("Exercise"));
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

fn row_to_routine(row: &SqliteRow) -> AppResult<Routine> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let exercise_id: String = row.get("exercise_id");
    let perform_type: String = row.get("perform_type");

    Ok(Routine {
        id: parse_uuid(&id, "routine id")?,
        user_id: parse_uuid(&user_id, "user id")?,
        exercise_id: parse_uuid(&exercise_id, "exercise id")?,
        name: row.get("name"),
        reps: row.get("reps"),
        hold: row.get("hold"),
        complete: row.get("complete"),
        perform_count: row.get("perform_count"),
        perform_type: PerformInterval::parse(&perform_type),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
