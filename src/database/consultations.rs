// ABOUTME: Consultation storage and lifecycle transitions
// ABOUTME: Creation activates atomically; reads run the lazy expiration check
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Consultation persistence
//!
//! A consultation is created and activated in one transaction, so no
//! observer ever sees a half-prescribed plan. Expiration is lazy: reads
//! run [`Consultation::check_expiration`] and persist the flip when it
//! fires, which keeps the store honest without a background sweeper.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::users::parse_uuid;
use crate::errors::{AppError, AppResult};
use crate::models::{Consultation, ConsultationStatus, Exercise, Therapist, User};

/// Longest accepted consultation window, in days
pub const MAX_ACTIVE_DAYS: i64 = 3650;

fn validate_active_days(active_days: i64) -> AppResult<()> {
    if !(1..=MAX_ACTIVE_DAYS).contains(&active_days) {
        return Err(AppError::invalid_input(format!(
            "active_days must be between 1 and {MAX_ACTIVE_DAYS}"
        )));
    }
    Ok(())
}

/// Payload for prescribing a consultation to a patient
#[derive(Debug, Deserialize)]
pub struct CreateConsultationRequest {
    pub patient_id: Uuid,
    #[serde(default)]
    pub recommended_exercises: Vec<Uuid>,
    /// Window length in days; the server default applies when omitted
    pub active_days: Option<i64>,
    pub notes: Option<String>,
}

/// Partial consultation update; `None` fields are left untouched
#[derive(Debug, Default, Deserialize)]
pub struct ConsultationUpdate {
    pub recommended_exercises: Option<Vec<Uuid>>,
    pub active_days: Option<i64>,
    pub notes: Option<String>,
    /// Strict status string; unknown values are rejected with a 400
    pub status: Option<String>,
}

/// A consultation joined with the people and exercises it references
#[derive(Debug, Serialize)]
pub struct PopulatedConsultation {
    #[serde(flatten)]
    pub consultation: Consultation,
    pub therapist: Therapist,
    pub patient: User,
    pub exercises: Vec<Exercise>,
}

/// Consultation operations over the shared pool
pub struct ConsultationsManager {
    pool: SqlitePool,
}

impl ConsultationsManager {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a consultation and activate it in the same transaction.
    ///
    /// # Errors
    /// Returns an error if the patient does not exist, `active_days` is out
    /// of range, or the writes fail.
    pub async fn create_consultation(
        &self,
        therapist_id: Uuid,
        request: CreateConsultationRequest,
        default_active_days: i64,
    ) -> AppResult<Consultation> {
        let active_days = request.active_days.unwrap_or(default_active_days);
        validate_active_days(active_days)?;

        let patient_exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = $1")
            .bind(request.patient_id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to look up patient: {e}")))?;
        if patient_exists == 0 {
            return Err(AppError::not_found("Patient"));
        }

        let now = Utc::now();
        let mut consultation = Consultation {
            id: Uuid::new_v4(),
            therapist_id,
            patient_id: request.patient_id,
            recommended_exercises: request.recommended_exercises,
            status: ConsultationStatus::Pending,
            active_days,
            expires_on: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };
        consultation.activate(active_days, now);

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            INSERT INTO consultations (
                id, therapist_id, patient_id, status, active_days,
                expires_on, notes, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(consultation.id.to_string())
        .bind(consultation.therapist_id.to_string())
        .bind(consultation.patient_id.to_string())
        .bind(consultation.status.as_str())
        .bind(consultation.active_days)
        .bind(consultation.expires_on)
        .bind(&consultation.notes)
        .bind(consultation.created_at)
        .bind(consultation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create consultation: {e}")))?;

        store_exercise_links(&mut tx, consultation.id, &consultation.recommended_exercises)
            .await?;
        tx.commit().await?;

        Ok(consultation)
    }

    /// Get a consultation by id, prescribed exercise ids included
    pub async fn get_consultation(
        &self,
        consultation_id: Uuid,
    ) -> AppResult<Option<Consultation>> {
        let row = sqlx::query(
            r"
            SELECT id, therapist_id, patient_id, status, active_days,
                   expires_on, notes, created_at, updated_at
            FROM consultations WHERE id = $1
            ",
        )
        .bind(consultation_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get consultation: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut consultation = row_to_consultation(&row)?;
        consultation.recommended_exercises = self.load_exercise_links(consultation.id).await?;
        Ok(Some(consultation))
    }

    /// Get a consultation joined with its therapist, patient, and the
    /// full exercise rows it prescribes. Dangling exercise ids are skipped
    /// rather than failing the whole read.
    pub async fn get_populated(
        &self,
        database: &super::Database,
        exercises: &super::ExercisesManager,
        consultation_id: Uuid,
    ) -> AppResult<Option<PopulatedConsultation>> {
        let Some(consultation) = self.get_consultation(consultation_id).await? else {
            return Ok(None);
        };
        let therapist = database
            .get_therapist(consultation.therapist_id)
            .await?
            .ok_or_else(|| AppError::not_found("Therapist"))?;
        let patient = database
            .get_user(consultation.patient_id)
            .await?
            .ok_or_else(|| AppError::not_found("Patient"))?;

        let mut prescribed = Vec::with_capacity(consultation.recommended_exercises.len());
        for exercise_id in &consultation.recommended_exercises {
            if let Some(exercise) = exercises.get_exercise(*exercise_id).await? {
                prescribed.push(exercise);
            }
        }

        Ok(Some(PopulatedConsultation {
            consultation,
            therapist,
            patient,
            exercises: prescribed,
        }))
    }

    /// A therapist's consultations, newest first
    pub async fn list_for_therapist(&self, therapist_id: Uuid) -> AppResult<Vec<Consultation>> {
        self.list_by("therapist_id", therapist_id).await
    }

    /// Every consultation on the platform, newest first (admin listing)
    pub async fn list_all(&self) -> AppResult<Vec<Consultation>> {
        let rows = sqlx::query(
            r"
            SELECT id, therapist_id, patient_id, status, active_days,
                   expires_on, notes, created_at, updated_at
            FROM consultations ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list consultations: {e}")))?;

        let mut consultations = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut consultation = row_to_consultation(row)?;
            consultation.recommended_exercises =
                self.load_exercise_links(consultation.id).await?;
            consultations.push(consultation);
        }
        Ok(consultations)
    }

    /// A patient's consultations, newest first
    pub async fn list_for_patient(&self, patient_id: Uuid) -> AppResult<Vec<Consultation>> {
        self.list_by("patient_id", patient_id).await
    }

    async fn list_by(&self, field: &str, value: Uuid) -> AppResult<Vec<Consultation>> {
        let query = format!(
            r"
            SELECT id, therapist_id, patient_id, status, active_days,
                   expires_on, notes, created_at, updated_at
            FROM consultations WHERE {field} = $1 ORDER BY created_at DESC
            "
        );
        let rows = sqlx::query(&query)
            .bind(value.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list consultations: {e}")))?;

        let mut consultations = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut consultation = row_to_consultation(row)?;
            consultation.recommended_exercises =
                self.load_exercise_links(consultation.id).await?;
            consultations.push(consultation);
        }
        Ok(consultations)
    }

    /// Apply a partial update.
    ///
    /// Changing `active_days` recomputes the expiration from the original
    /// creation instant; an update never restarts the window.
    pub async fn update_consultation(
        &self,
        consultation_id: Uuid,
        update: ConsultationUpdate,
    ) -> AppResult<Consultation> {
        let Some(mut consultation) = self.get_consultation(consultation_id).await? else {
            return Err(AppError::not_found("Consultation"));
        };

        if let Some(status) = &update.status {
            consultation.status = ConsultationStatus::try_parse(status).map_err(|bad| {
                AppError::invalid_input(format!("Unknown consultation status: {bad}"))
            })?;
        }
        if let Some(active_days) = update.active_days {
            validate_active_days(active_days)?;
            consultation.active_days = active_days;
            consultation.recompute_expiry_from_origin();
        }
        if let Some(notes) = update.notes {
            consultation.notes = Some(notes);
        }
        let exercises_changed = update.recommended_exercises.is_some();
        if let Some(exercises) = update.recommended_exercises {
            consultation.recommended_exercises = exercises;
        }
        consultation.updated_at = Utc::now();

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            UPDATE consultations SET
                status = $2, active_days = $3, expires_on = $4,
                notes = $5, updated_at = $6
            WHERE id = $1
            ",
        )
        .bind(consultation.id.to_string())
        .bind(consultation.status.as_str())
        .bind(consultation.active_days)
        .bind(consultation.expires_on)
        .bind(&consultation.notes)
        .bind(consultation.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to update consultation: {e}")))?;

        if exercises_changed {
            sqlx::query("DELETE FROM consultation_exercises WHERE consultation_id = $1")
                .bind(consultation.id.to_string())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::database(format!("Failed to clear exercise links: {e}"))
                })?;
            store_exercise_links(&mut tx, consultation.id, &consultation.recommended_exercises)
                .await?;
        }
        tx.commit().await?;

        Ok(consultation)
    }

    /// Re-activate a consultation, restarting the window from `now`
    pub async fn activate_consultation(
        &self,
        consultation_id: Uuid,
        active_days: i64,
        now: DateTime<Utc>,
    ) -> AppResult<Consultation> {
        validate_active_days(active_days)?;
        let Some(mut consultation) = self.get_consultation(consultation_id).await? else {
            return Err(AppError::not_found("Consultation"));
        };
        consultation.activate(active_days, now);
        self.persist_lifecycle(&consultation).await?;
        Ok(consultation)
    }

    /// Write back status, expiration, and update timestamp after a
    /// lifecycle transition (activation or lazy expiration)
    pub async fn persist_lifecycle(&self, consultation: &Consultation) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE consultations SET
                status = $2, active_days = $3, expires_on = $4, updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(consultation.id.to_string())
        .bind(consultation.status.as_str())
        .bind(consultation.active_days)
        .bind(consultation.expires_on)
        .bind(consultation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to persist consultation: {e}")))?;
        Ok(())
    }

    /// Delete a consultation; exercise links go with it
    pub async fn delete_consultation(&self, consultation_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM consultations WHERE id = $1")
            .bind(consultation_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete consultation: {e}")))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Consultation"));
        }
        Ok(())
    }

    /// Total and active consultation counts (admin stats)
    pub async fn consultation_counts(&self) -> AppResult<(i64, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM consultations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count consultations: {e}")))?;
        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM consultations WHERE status = 'active'")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| AppError::database(format!("Failed to count consultations: {e}")))?;
        Ok((total, active))
    }

    async fn load_exercise_links(&self, consultation_id: Uuid) -> AppResult<Vec<Uuid>> {
        let rows = sqlx::query(
            r"
            SELECT exercise_id FROM consultation_exercises
            WHERE consultation_id = $1 ORDER BY position ASC
            ",
        )
        .bind(consultation_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load exercise links: {e}")))?;

        rows.iter()
            .map(|row| {
                let id: String = row.get("exercise_id");
                parse_uuid(&id, "exercise id")
            })
            .collect()
    }
}

async fn store_exercise_links(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    consultation_id: Uuid,
    exercise_ids: &[Uuid],
) -> AppResult<()> {
    for (position, exercise_id) in exercise_ids.iter().enumerate() {
        sqlx::query(
            r"
            INSERT INTO consultation_exercises (consultation_id, exercise_id, position)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(consultation_id.to_string())
        .bind(exercise_id.to_string())
        .bind(i64::try_from(position).unwrap_or(i64::MAX))
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to store exercise link: {e}")))?;
    }
    Ok(())
}

fn row_to_consultation(row: &SqliteRow) -> AppResult<Consultation> {
    let id: String = row.get("id");
    let therapist_id: String = row.get("therapist_id");
    let patient_id: String = row.get("patient_id");
    let status: String = row.get("status");

    Ok(Consultation {
        id: parse_uuid(&id, "consultation id")?,
        therapist_id: parse_uuid(&therapist_id, "therapist id")?,
        patient_id: parse_uuid(&patient_id, "patient id")?,
        recommended_exercises: Vec::new(),
        status: ConsultationStatus::parse(&status),
        active_days: row.get("active_days"),
        expires_on: row.get("expires_on"),
        notes: row.get("notes"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
