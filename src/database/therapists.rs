// ABOUTME: Therapist account storage and the admin approval workflow
// ABOUTME: Keeps the denormalized consultation counters in step with reality
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::users::parse_uuid;
use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{SubjectKind, Therapist, TherapistStatus};

impl Database {
    /// Insert a new therapist in pending status with its membership history.
    ///
    /// # Errors
    /// Returns an error if the email is already registered or the insert fails.
    pub async fn create_therapist(&self, therapist: &Therapist) -> AppResult<Uuid> {
        if self
            .get_therapist_by_email(&therapist.email)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("Email already in use"));
        }

        let specializations = serde_json::to_string(&therapist.specializations)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            INSERT INTO therapists (
                id, name, email, password_hash, gender, specializations,
                working_at, address, experience, status,
                consultation_count, request_count, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ",
        )
        .bind(therapist.id.to_string())
        .bind(&therapist.name)
        .bind(&therapist.email)
        .bind(&therapist.password_hash)
        .bind(&therapist.gender)
        .bind(specializations)
        .bind(&therapist.working_at)
        .bind(&therapist.address)
        .bind(&therapist.experience)
        .bind(therapist.status.as_str())
        .bind(therapist.consultation_count)
        .bind(therapist.request_count)
        .bind(therapist.created_at)
        .bind(therapist.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create therapist: {e}")))?;

        for record in &therapist.memberships {
            super::users::insert_membership(&mut tx, therapist.id, SubjectKind::Therapist, record)
                .await?;
        }
        tx.commit().await?;

        Ok(therapist.id)
    }

    /// Get a therapist by id, membership history included
    pub async fn get_therapist(&self, therapist_id: Uuid) -> AppResult<Option<Therapist>> {
        self.get_therapist_by_field("id", &therapist_id.to_string())
            .await
    }

    /// Get a therapist by email, membership history included
    pub async fn get_therapist_by_email(&self, email: &str) -> AppResult<Option<Therapist>> {
        self.get_therapist_by_field("email", email).await
    }

    async fn get_therapist_by_field(
        &self,
        field: &str,
        value: &str,
    ) -> AppResult<Option<Therapist>> {
        let query = format!(
            r"
            SELECT id, name, email, password_hash, gender, specializations,
                   working_at, address, experience, status,
                   consultation_count, request_count, created_at, updated_at
            FROM therapists WHERE {field} = $1
            "
        );
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get therapist by {field}: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut therapist = row_to_therapist(&row)?;
        therapist.memberships = self
            .load_memberships(therapist.id, SubjectKind::Therapist)
            .await?;
        Ok(Some(therapist))
    }

    /// All therapists, optionally filtered by status, newest first
    pub async fn list_therapists(
        &self,
        status: Option<TherapistStatus>,
    ) -> AppResult<Vec<Therapist>> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r"
                    SELECT id, name, email, password_hash, gender, specializations,
                           working_at, address, experience, status,
                           consultation_count, request_count, created_at, updated_at
                    FROM therapists WHERE status = $1 ORDER BY created_at DESC
                    ",
                )
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r"
                    SELECT id, name, email, password_hash, gender, specializations,
                           working_at, address, experience, status,
                           consultation_count, request_count, created_at, updated_at
                    FROM therapists ORDER BY created_at DESC
                    ",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to list therapists: {e}")))?;

        let mut therapists = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut therapist = row_to_therapist(row)?;
            therapist.memberships = self
                .load_memberships(therapist.id, SubjectKind::Therapist)
                .await?;
            therapists.push(therapist);
        }
        Ok(therapists)
    }

    /// Transition a therapist's approval status (admin only path)
    pub async fn update_therapist_status(
        &self,
        therapist_id: Uuid,
        status: TherapistStatus,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE therapists SET status = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(therapist_id.to_string())
        .bind(status.as_str())
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update therapist status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Therapist"));
        }
        Ok(())
    }

    /// Recompute the denormalized consultation counters from the source table
    pub async fn refresh_therapist_counts(&self, therapist_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r"
            UPDATE therapists SET
                consultation_count = (
                    SELECT COUNT(*) FROM consultations
                    WHERE therapist_id = $1 AND status = 'active'
                ),
                request_count = (
                    SELECT COUNT(*) FROM consultations
                    WHERE therapist_id = $1 AND status = 'pending'
                )
            WHERE id = $1
            ",
        )
        .bind(therapist_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to refresh therapist counts: {e}")))?;
        Ok(())
    }

    /// Delete a therapist account.
    ///
    /// Refused while active consultations exist; otherwise the therapist's
    /// finished and pending consultations are removed with the account.
    pub async fn delete_therapist(&self, therapist_id: Uuid) -> AppResult<()> {
        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM consultations WHERE therapist_id = $1 AND status = 'active'",
        )
        .bind(therapist_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count consultations: {e}")))?;
        if active > 0 {
            return Err(AppError::conflict(
                "Therapist has active consultations and cannot be deleted",
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM consultations WHERE therapist_id = $1")
            .bind(therapist_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete consultations: {e}")))?;
        sqlx::query("DELETE FROM follows WHERE therapist_id = $1")
            .bind(therapist_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete follows: {e}")))?;
        sqlx::query("DELETE FROM memberships WHERE owner_id = $1 AND owner_kind = 'therapist'")
            .bind(therapist_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete memberships: {e}")))?;
        let result = sqlx::query("DELETE FROM therapists WHERE id = $1")
            .bind(therapist_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to delete therapist: {e}")))?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Therapist"));
        }
        Ok(())
    }

    /// Active therapists ordered by consultation load (trending)
    pub async fn top_therapists(&self, limit: i64) -> AppResult<Vec<Therapist>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, email, password_hash, gender, specializations,
                   working_at, address, experience, status,
                   consultation_count, request_count, created_at, updated_at
            FROM therapists WHERE status = 'active'
            ORDER BY consultation_count DESC, created_at ASC
            LIMIT $1
            ",
        )
        .bind(limit.clamp(1, 50))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load top therapists: {e}")))?;

        rows.iter().map(row_to_therapist).collect()
    }

    /// Therapist count, optionally restricted to one status (admin stats)
    pub async fn therapist_count(&self, status: Option<TherapistStatus>) -> AppResult<i64> {
        let count = match status {
            Some(status) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM therapists WHERE status = $1")
                    .bind(status.as_str())
                    .fetch_one(&self.pool)
                    .await
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM therapists")
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| AppError::database(format!("Failed to count therapists: {e}")))?;
        Ok(count)
    }
}

fn row_to_therapist(row: &SqliteRow) -> AppResult<Therapist> {
    let id: String = row.get("id");
    let specializations: String = row.get("specializations");
    let status: String = row.get("status");

    Ok(Therapist {
        id: parse_uuid(&id, "therapist id")?,
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        gender: row.get("gender"),
        specializations: serde_json::from_str(&specializations)?,
        working_at: row.get("working_at"),
        address: row.get("address"),
        experience: row.get("experience"),
        status: TherapistStatus::parse(&status),
        consultation_count: row.get("consultation_count"),
        request_count: row.get("request_count"),
        memberships: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
