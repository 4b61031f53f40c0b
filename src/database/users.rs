// ABOUTME: User account storage plus the shared membership history table
// ABOUTME: Memberships load with the account and persist as a whole history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    CreatorAttribution, CreatorKind, Membership, MembershipStatus, MembershipType, SubjectKind,
    User, UserRole,
};

/// Partial profile update; `None` fields are left untouched
#[derive(Debug, Default)]
pub struct UserProfileUpdate {
    pub full_name: Option<String>,
    pub profile_image: Option<String>,
    pub password_hash: Option<String>,
}

impl Database {
    /// Insert a new user together with its seeded membership history.
    ///
    /// # Errors
    /// Returns an error if the email is already registered or the insert fails.
    pub async fn create_user(&self, user: &User) -> AppResult<Uuid> {
        if self.get_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::conflict("Email already in use"));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r"
            INSERT INTO users (
                id, full_name, email, password_hash, profile_image,
                role, created_by, creator_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(user.id.to_string())
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_image)
        .bind(user.role.as_str())
        .bind(user.creator.created_by.as_str())
        .bind(user.creator.creator_id.map(|id| id.to_string()))
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to create user: {e}")))?;

        for record in &user.memberships {
            insert_membership(&mut tx, user.id, SubjectKind::User, record).await?;
        }
        tx.commit().await?;

        Ok(user.id)
    }

    /// Get a user by id, membership history included
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.get_user_by_field("id", &user_id.to_string()).await
    }

    /// Get a user by email, membership history included
    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.get_user_by_field("email", email).await
    }

    async fn get_user_by_field(&self, field: &str, value: &str) -> AppResult<Option<User>> {
        let query = format!(
            r"
            SELECT id, full_name, email, password_hash, profile_image,
                   role, created_by, creator_id, created_at, updated_at
            FROM users WHERE {field} = $1
            "
        );
        let row = sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to get user by {field}: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut user = row_to_user(&row)?;
        user.memberships = self.load_memberships(user.id, SubjectKind::User).await?;
        Ok(Some(user))
    }

    /// Apply a partial profile update and touch `updated_at`
    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        update: &UserProfileUpdate,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r"
            UPDATE users SET
                full_name = COALESCE($2, full_name),
                profile_image = COALESCE($3, profile_image),
                password_hash = COALESCE($4, password_hash),
                updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(user_id.to_string())
        .bind(&update.full_name)
        .bind(&update.profile_image)
        .bind(&update.password_hash)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update user profile: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// All user accounts, newest first (admin listing)
    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        let rows = sqlx::query(
            r"
            SELECT id, full_name, email, password_hash, profile_image,
                   role, created_by, creator_id, created_at, updated_at
            FROM users ORDER BY created_at DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to list users: {e}")))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut user = row_to_user(row)?;
            user.memberships = self.load_memberships(user.id, SubjectKind::User).await?;
            users.push(user);
        }
        Ok(users)
    }

    /// Total user count (admin stats)
    pub async fn user_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to count users: {e}")))?;
        Ok(count)
    }

    /// Users currently holding an active paid membership (admin stats)
    pub async fn pro_user_count(&self) -> AppResult<i64> {
        let count = sqlx::query_scalar(
            r"
            SELECT COUNT(DISTINCT owner_id) FROM memberships
            WHERE owner_kind = 'user' AND status = 'active'
              AND membership_type != 'free'
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to count pro users: {e}")))?;
        Ok(count)
    }

    /// Load a subject's membership history, oldest record first
    pub async fn load_memberships(
        &self,
        owner_id: Uuid,
        owner_kind: SubjectKind,
    ) -> AppResult<Vec<Membership>> {
        let rows = sqlx::query(
            r"
            SELECT id, membership_type, payment_date, status, created_at
            FROM memberships
            WHERE owner_id = $1 AND owner_kind = $2
            ORDER BY created_at ASC
            ",
        )
        .bind(owner_id.to_string())
        .bind(owner_kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to load memberships: {e}")))?;

        rows.iter().map(row_to_membership).collect()
    }

    /// Replace a subject's stored membership history in one transaction.
    ///
    /// The in-memory history is authoritative after evaluation or upgrade;
    /// a delete-and-reinsert keeps the table an exact mirror of it.
    pub async fn store_memberships(
        &self,
        owner_id: Uuid,
        owner_kind: SubjectKind,
        records: &[Membership],
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM memberships WHERE owner_id = $1 AND owner_kind = $2")
            .bind(owner_id.to_string())
            .bind(owner_kind.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear memberships: {e}")))?;
        for record in records {
            insert_membership(&mut tx, owner_id, owner_kind, record).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

pub(super) async fn insert_membership(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    owner_id: Uuid,
    owner_kind: SubjectKind,
    record: &Membership,
) -> AppResult<()> {
    sqlx::query(
        r"
        INSERT INTO memberships (
            id, owner_id, owner_kind, membership_type, payment_date, status, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ",
    )
    .bind(record.id.to_string())
    .bind(owner_id.to_string())
    .bind(owner_kind.as_str())
    .bind(record.membership_type.as_str())
    .bind(record.payment_date)
    .bind(record.status.as_str())
    .bind(record.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::database(format!("Failed to store membership record: {e}")))?;
    Ok(())
}

fn row_to_user(row: &SqliteRow) -> AppResult<User> {
    let id: String = row.get("id");
    let role: String = row.get("role");
    let created_by: Option<String> = row.get("created_by");
    let creator_id: Option<String> = row.get("creator_id");

    Ok(User {
        id: parse_uuid(&id, "user id")?,
        full_name: row.get("full_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        profile_image: row.get("profile_image"),
        role: UserRole::parse(&role),
        creator: CreatorAttribution {
            created_by: created_by.as_deref().map(CreatorKind::parse).unwrap_or_default(),
            creator_id: creator_id
                .as_deref()
                .and_then(|s| Uuid::parse_str(s).ok()),
        },
        memberships: Vec::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn row_to_membership(row: &SqliteRow) -> AppResult<Membership> {
    let id: String = row.get("id");
    let membership_type: String = row.get("membership_type");
    let status: String = row.get("status");

    Ok(Membership {
        id: parse_uuid(&id, "membership id")?,
        membership_type: MembershipType::parse(&membership_type),
        payment_date: row.get("payment_date"),
        status: MembershipStatus::parse(&status),
        created_at: row.get("created_at"),
    })
}

pub(super) fn parse_uuid(value: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::internal(format!("Failed to parse {what} UUID: {e}")))
}
