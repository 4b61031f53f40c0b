// ABOUTME: Social graph storage: therapist follows and exercise favorites
// ABOUTME: Favorite writes move the edge and the counter in one transaction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::exercises::row_to_exercise;
use super::users::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::Exercise;

/// Follow and favorite operations over the shared pool
pub struct SocialManager {
    pool: SqlitePool,
}

impl SocialManager {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Follow a therapist. Duplicate follows are conflicts, not no-ops.
    pub async fn follow_therapist(&self, user_id: Uuid, therapist_id: Uuid) -> AppResult<()> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM therapists WHERE id = $1")
            .bind(therapist_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up therapist: {e}")))?;
        if exists == 0 {
            return Err(AppError::not_found("Therapist"));
        }

        let result = sqlx::query(
            r"
            INSERT INTO follows (id, user_id, therapist_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(therapist_id.to_string())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(AppError::conflict("Already following this therapist"))
            }
            Err(e) => Err(AppError::database(format!("Failed to follow therapist: {e}"))),
        }
    }

    /// Remove a follow edge
    pub async fn unfollow_therapist(&self, user_id: Uuid, therapist_id: Uuid) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM follows WHERE user_id = $1 AND therapist_id = $2")
                .bind(user_id.to_string())
                .bind(therapist_id.to_string())
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to unfollow therapist: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Follow"));
        }
        Ok(())
    }

    /// Whether the user follows the therapist
    pub async fn is_following(&self, user_id: Uuid, therapist_id: Uuid) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE user_id = $1 AND therapist_id = $2",
        )
        .bind(user_id.to_string())
        .bind(therapist_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check follow: {e}")))?;
        Ok(count > 0)
    }

    /// Ids of the therapists a user follows, oldest follow first
    pub async fn list_following(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query(
            "SELECT therapist_id FROM follows WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list follows: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("therapist_id");
                parse_uuid(&id, "therapist id")
            })
            .collect()
    }

    /// Favorite an exercise: the edge and the denormalized counter move
    /// in the same transaction, so the count never drifts.
    pub async fn add_favorite(&self, user_id: Uuid, exercise_id: Uuid) -> AppResult<()> {
        let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE id = $1")
            .bind(exercise_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up exercise: {e}")))?;
        if exists == 0 {
            return Err(AppError::not_found("Exercise"));
        }

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r"
            INSERT INTO favorites (id, user_id, exercise_id, created_at)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(exercise_id.to_string())
        .bind(chrono::Utc::now())
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::conflict("Exercise already in favorites"));
            }
            Err(e) => return Err(AppError::database(format!("Failed to add favorite: {e}"))),
        }

        sqlx::query("UPDATE exercises SET favorites = favorites + 1 WHERE id = $1")
            .bind(exercise_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to bump favorite count: {e}")))?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove a favorite and decrement the counter, floored at zero
    pub async fn remove_favorite(&self, user_id: Uuid, exercise_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "DELETE FROM favorites WHERE user_id = $1 AND exercise_id = $2",
        )
        .bind(user_id.to_string())
        .bind(exercise_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to remove favorite: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Favorite"));
        }

        sqlx::query(
            "UPDATE exercises SET favorites = MAX(favorites - 1, 0) WHERE id = $1",
        )
        .bind(exercise_id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to drop favorite count: {e}")))?;
        tx.commit().await?;
        Ok(())
    }

    /// Whether the user has favorited the exercise
    pub async fn is_favorite(&self, user_id: Uuid, exercise_id: Uuid) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM favorites WHERE user_id = $1 AND exercise_id = $2",
        )
        .bind(user_id.to_string())
        .bind(exercise_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to check favorite: {e}")))?;
        Ok(count > 0)
    }

    /// A user's favorited exercises, most recently favorited first
    pub async fn list_favorites(&self, user_id: Uuid) -> AppResult<Vec<Exercise>> {
        let query = format!(
            r"
            SELECT {columns} FROM exercises
            JOIN favorites ON favorites.exercise_id = exercises.id
            WHERE favorites.user_id = $1
            ORDER BY favorites.created_at DESC
            ",
            columns = super::exercises::EXERCISE_COLUMNS_QUALIFIED
        );
        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list favorites: {e}")))?;
        rows.iter().map(row_to_exercise).collect()
    }
}
