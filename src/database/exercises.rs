// ABOUTME: Exercise catalog storage: CRUD, filtered browse, discovery queries
// ABOUTME: Visibility filtering happens here so routes never leak private rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use serde::Deserialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::users::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::{CreatorKind, Exercise, ExerciseVisibility};

pub(super) const EXERCISE_COLUMNS: &str = r"
    id, title, description, instruction, images, video,
    category, sub_category, position, reps, hold, sets,
    is_premium, created_by, creator_id, visibility,
    views, favorites, created_at, updated_at
";

/// Table-qualified column list for joins against tables sharing names
pub(super) const EXERCISE_COLUMNS_QUALIFIED: &str = r"
    exercises.id, exercises.title, exercises.description, exercises.instruction,
    exercises.images, exercises.video, exercises.category, exercises.sub_category,
    exercises.position, exercises.reps, exercises.hold, exercises.sets,
    exercises.is_premium, exercises.created_by, exercises.creator_id,
    exercises.visibility, exercises.views, exercises.favorites,
    exercises.created_at, exercises.updated_at
";

/// Payload for creating a catalog exercise
#[derive(Debug, Default, Deserialize)]
pub struct CreateExerciseRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub instruction: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub video: Option<String>,
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub reps: i64,
    #[serde(default)]
    pub hold: i64,
    #[serde(default)]
    pub sets: i64,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub visibility: ExerciseVisibility,
}

/// Partial exercise update; `None` fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct UpdateExerciseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub instruction: Option<String>,
    pub images: Option<Vec<String>>,
    pub video: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub position: Option<String>,
    pub reps: Option<i64>,
    pub hold: Option<i64>,
    pub sets: Option<i64>,
    pub is_premium: Option<bool>,
    pub visibility: Option<ExerciseVisibility>,
}

/// Catalog browse filter; all fields optional
#[derive(Debug, Default, Deserialize)]
pub struct ExerciseFilter {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub position: Option<String>,
    /// Case-insensitive substring match on the title
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of catalog results
#[derive(Debug, serde::Serialize)]
pub struct ExercisePage {
    pub exercises: Vec<Exercise>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// Exercise catalog operations over the shared pool
pub struct ExercisesManager {
    pool: SqlitePool,
}

impl ExercisesManager {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new exercise attributed to its creator
    pub async fn create_exercise(
        &self,
        request: CreateExerciseRequest,
        created_by: CreatorKind,
        creator_id: Option<Uuid>,
    ) -> AppResult<Exercise> {
        if request.title.trim().is_empty() {
            return Err(AppError::invalid_input("Exercise title is required"));
        }
        if request.category.trim().is_empty() {
            return Err(AppError::invalid_input("Exercise category is required"));
        }

        let now = chrono::Utc::now();
        let exercise = Exercise {
            id: Uuid::new_v4(),
            title: request.title,
            description: request.description,
            instruction: request.instruction,
            images: request.images,
            video: request.video,
            category: request.category,
            sub_category: request.sub_category,
            position: request.position,
            reps: request.reps,
            hold: request.hold,
            sets: request.sets,
            is_premium: request.is_premium,
            created_by,
            creator_id,
            visibility: request.visibility,
            views: 0,
            favorites: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r"
            INSERT INTO exercises (
                id, title, description, instruction, images, video,
                category, sub_category, position, reps, hold, sets,
                is_premium, created_by, creator_id, visibility,
                views, favorites, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                      $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            ",
        )
        .bind(exercise.id.to_string())
        .bind(&exercise.title)
        .bind(&exercise.description)
        .bind(&exercise.instruction)
        .bind(serde_json::to_string(&exercise.images)?)
        .bind(&exercise.video)
        .bind(&exercise.category)
        .bind(&exercise.sub_category)
        .bind(&exercise.position)
        .bind(exercise.reps)
        .bind(exercise.hold)
        .bind(exercise.sets)
        .bind(exercise.is_premium)
        .bind(exercise.created_by.as_str())
        .bind(exercise.creator_id.map(|id| id.to_string()))
        .bind(exercise.visibility.as_str())
        .bind(exercise.views)
        .bind(exercise.favorites)
        .bind(exercise.created_at)
        .bind(exercise.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to create exercise: {e}")))?;

        Ok(exercise)
    }

    /// Get an exercise by id regardless of visibility
    pub async fn get_exercise(&self, exercise_id: Uuid) -> AppResult<Option<Exercise>> {
        let query = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(exercise_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get exercise: {e}")))?;
        row.as_ref().map(row_to_exercise).transpose()
    }

    /// Apply a partial update and touch `updated_at`
    pub async fn update_exercise(
        &self,
        exercise_id: Uuid,
        update: UpdateExerciseRequest,
    ) -> AppResult<Exercise> {
        let Some(mut exercise) = self.get_exercise(exercise_id).await? else {
            return Err(AppError::not_found("Exercise"));
        };

        if let Some(title) = update.title {
            exercise.title = title;
        }
        if let Some(description) = update.description {
            exercise.description = description;
        }
        if let Some(instruction) = update.instruction {
            exercise.instruction = instruction;
        }
        if let Some(images) = update.images {
            exercise.images = images;
        }
        if let Some(video) = update.video {
            exercise.video = Some(video);
        }
        if let Some(category) = update.category {
            exercise.category = category;
        }
        if let Some(sub_category) = update.sub_category {
            exercise.sub_category = sub_category;
        }
        if let Some(position) = update.position {
            exercise.position = position;
        }
        if let Some(reps) = update.reps {
            exercise.reps = reps;
        }
        if let Some(hold) = update.hold {
            exercise.hold = hold;
        }
        if let Some(sets) = update.sets {
            exercise.sets = sets;
        }
        if let Some(is_premium) = update.is_premium {
            exercise.is_premium = is_premium;
        }
        if let Some(visibility) = update.visibility {
            exercise.visibility = visibility;
        }
        exercise.updated_at = chrono::Utc::now();

        sqlx::query(
            r"
            UPDATE exercises SET
                title = $2, description = $3, instruction = $4, images = $5,
                video = $6, category = $7, sub_category = $8, position = $9,
                reps = $10, hold = $11, sets = $12, is_premium = $13,
                visibility = $14, updated_at = $15
            WHERE id = $1
            ",
        )
        .bind(exercise.id.to_string())
        .bind(&exercise.title)
        .bind(&exercise.description)
        .bind(&exercise.instruction)
        .bind(serde_json::to_string(&exercise.images)?)
        .bind(&exercise.video)
        .bind(&exercise.category)
        .bind(&exercise.sub_category)
        .bind(&exercise.position)
        .bind(exercise.reps)
        .bind(exercise.hold)
        .bind(exercise.sets)
        .bind(exercise.is_premium)
        .bind(exercise.visibility.as_str())
        .bind(exercise.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update exercise: {e}")))?;

        Ok(exercise)
    }

    /// Delete an exercise along with the favorites, routines, and saved
    /// entries pointing at it
    pub async fn delete_exercise(&self, exercise_id: Uuid) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        for table in ["favorites", "routines", "saved_exercises"] {
            sqlx::query(&format!("DELETE FROM {table} WHERE exercise_id = $1"))
                .bind(exercise_id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to delete {table} rows: {e}"))
                })?;
        }
        let result = sqlx::query("DELETE FROM exercises WHERE id = $1")
            .bind(exercise_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete exercise: {e}")))?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Exercise"));
        }
        Ok(())
    }

    /// Browse the public catalog with optional filters, newest first
    pub async fn list_public(&self, filter: &ExerciseFilter) -> AppResult<ExercisePage> {
        let page = filter.page.unwrap_or(1).max(1);
        let per_page = filter.per_page.unwrap_or(20).clamp(1, 100);

        let mut conditions = vec!["visibility = 'public'".to_string()];
        let mut binds: Vec<String> = Vec::new();
        if let Some(category) = &filter.category {
            binds.push(category.clone());
            conditions.push(format!("category = ${}", binds.len()));
        }
        if let Some(sub_category) = &filter.sub_category {
            binds.push(sub_category.clone());
            conditions.push(format!("sub_category = ${}", binds.len()));
        }
        if let Some(position) = &filter.position {
            binds.push(position.clone());
            conditions.push(format!("position = ${}", binds.len()));
        }
        if let Some(search) = &filter.search {
            binds.push(format!("%{}%", search.to_lowercase()));
            conditions.push(format!("LOWER(title) LIKE ${}", binds.len()));
        }
        let where_clause = conditions.join(" AND ");

        let count_query = format!("SELECT COUNT(*) FROM exercises WHERE {where_clause}");
        let mut count = sqlx::query_scalar(&count_query);
        for bind in &binds {
            count = count.bind(bind);
        }
        let total: i64 = count
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count exercises: {e}")))?;

        let list_query = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE {where_clause} \
             ORDER BY created_at DESC LIMIT ${} OFFSET ${}",
            binds.len() + 1,
            binds.len() + 2
        );
        let mut query = sqlx::query(&list_query);
        for bind in &binds {
            query = query.bind(bind);
        }
        let rows = query
            .bind(per_page)
            .bind((page - 1) * per_page)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list exercises: {e}")))?;

        Ok(ExercisePage {
            exercises: rows.iter().map(row_to_exercise).collect::<AppResult<_>>()?,
            total,
            page,
            per_page,
        })
    }

    /// Everything a creator owns, private rows included
    pub async fn list_by_creator(&self, creator_id: Uuid) -> AppResult<Vec<Exercise>> {
        let query = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises WHERE creator_id = $1 \
             ORDER BY created_at DESC"
        );
        let rows = sqlx::query(&query)
            .bind(creator_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list creator exercises: {e}")))?;
        rows.iter().map(row_to_exercise).collect()
    }

    /// The most viewed public exercise per category
    pub async fn featured(&self) -> AppResult<Vec<Exercise>> {
        let query = format!(
            r"
            SELECT {EXERCISE_COLUMNS} FROM exercises AS ex
            WHERE visibility = 'public' AND id = (
                SELECT id FROM exercises AS peak
                WHERE peak.category = ex.category AND peak.visibility = 'public'
                ORDER BY peak.views DESC, peak.created_at DESC
                LIMIT 1
            )
            ORDER BY category ASC
            "
        );
        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load featured exercises: {e}")))?;
        rows.iter().map(row_to_exercise).collect()
    }

    /// The most viewed public non-premium exercises
    pub async fn trending(&self, limit: i64) -> AppResult<Vec<Exercise>> {
        let query = format!(
            "SELECT {EXERCISE_COLUMNS} FROM exercises \
             WHERE visibility = 'public' AND is_premium = 0 \
             ORDER BY views DESC, created_at DESC LIMIT $1"
        );
        let rows = sqlx::query(&query)
            .bind(limit.clamp(1, 100))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load trending exercises: {e}")))?;
        rows.iter().map(row_to_exercise).collect()
    }

    /// Record one view of an exercise detail page
    pub async fn increment_views(&self, exercise_id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE exercises SET views = views + 1 WHERE id = $1")
            .bind(exercise_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to increment views: {e}")))?;
        Ok(())
    }

    /// Total exercise count (admin stats)
    pub async fn exercise_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM exercises")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count exercises: {e}")))?;
        Ok(count)
    }

    /// Premium-gated exercise count (admin stats)
    pub async fn premium_exercise_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE is_premium = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count premium exercises: {e}")))?;
        Ok(count)
    }

    /// Exercises contributed by therapists and pro users (admin stats)
    pub async fn custom_exercise_count(&self) -> AppResult<i64> {
        let count =
            sqlx::query_scalar("SELECT COUNT(*) FROM exercises WHERE created_by != 'admin'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to count custom exercises: {e}")))?;
        Ok(count)
    }
}

pub(super) fn row_to_exercise(row: &SqliteRow) -> AppResult<Exercise> {
    let id: String = row.get("id");
    let images: String = row.get("images");
    let created_by: String = row.get("created_by");
    let creator_id: Option<String> = row.get("creator_id");
    let visibility: String = row.get("visibility");

    Ok(Exercise {
        id: parse_uuid(&id, "exercise id")?,
        title: row.get("title"),
        description: row.get("description"),
        instruction: row.get("instruction"),
        images: serde_json::from_str(&images)?,
        video: row.get("video"),
        category: row.get("category"),
        sub_category: row.get("sub_category"),
        position: row.get("position"),
        reps: row.get("reps"),
        hold: row.get("hold"),
        sets: row.get("sets"),
        is_premium: row.get("is_premium"),
        created_by: CreatorKind::parse(&created_by),
        creator_id: creator_id.as_deref().and_then(|s| Uuid::parse_str(s).ok()),
        visibility: ExerciseVisibility::parse(&visibility),
        views: row.get("views"),
        favorites: row.get("favorites"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
