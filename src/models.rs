// ABOUTME: Core domain models for users, therapists, exercises, and consultations
// ABOUTME: Owns the status enums and their database string representations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Domain models
//!
//! All timestamps are UTC. Enum string forms are the canonical database
//! representation; `parse` is lenient and falls back to the default variant
//! the way the original data did.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role flag on a user account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular patient account
    #[default]
    User,
    /// Platform administrator (a user with elevated rights, not a separate entity)
    Admin,
}

impl UserRole {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse from database string, defaulting to `User`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "admin" => Self::Admin,
            _ => Self::User,
        }
    }
}

/// Therapist account approval status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TherapistStatus {
    /// Registered, waiting for admin approval
    #[default]
    Pending,
    /// Approved; may authenticate into protected routes
    Active,
    /// Deactivated by an admin
    Inactive,
    /// Application rejected
    Rejected,
}

impl TherapistStatus {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Rejected => "rejected",
        }
    }

    /// Parse from database string, defaulting to `Pending`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            "rejected" => Self::Rejected,
            _ => Self::Pending,
        }
    }
}

/// Membership tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    /// Default tier, never expires
    #[default]
    Free,
    /// Paid, 30-day term
    Monthly,
    /// Paid, 365-day term
    Yearly,
}

impl MembershipType {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Parse from database string, defaulting to `Free`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "monthly" => Self::Monthly,
            "yearly" => Self::Yearly,
            _ => Self::Free,
        }
    }

    /// Length of the paid term, `None` for free
    #[must_use]
    pub fn term(self) -> Option<Duration> {
        match self {
            Self::Free => None,
            Self::Monthly => Some(Duration::days(30)),
            Self::Yearly => Some(Duration::days(365)),
        }
    }
}

/// Membership record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// The single currently effective record
    #[default]
    Active,
    /// Elapsed or superseded record, kept as history
    Inactive,
}

impl MembershipStatus {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parse from database string, defaulting to `Active`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "inactive" => Self::Inactive,
            _ => Self::Active,
        }
    }
}

/// Which kind of subject owns a membership history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    /// Patient (or admin) account
    User,
    /// Therapist account
    Therapist,
}

impl SubjectKind {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Therapist => "therapist",
        }
    }
}

/// One entry in a subject's append-only membership history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier
    pub id: Uuid,
    /// Tier of this record
    pub membership_type: MembershipType,
    /// When the member paid; `None` for free records
    pub payment_date: Option<DateTime<Utc>>,
    /// Whether this record is the effective one
    pub status: MembershipStatus,
    /// When this record was appended
    pub created_at: DateTime<Utc>,
}

impl Membership {
    /// A fresh free/active record used as the fallback tier
    #[must_use]
    pub fn free(now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            membership_type: MembershipType::Free,
            payment_date: None,
            status: MembershipStatus::Active,
            created_at: now,
        }
    }

    /// A paid record starting at `now`
    #[must_use]
    pub fn paid(membership_type: MembershipType, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            membership_type,
            payment_date: Some(now),
            status: MembershipStatus::Active,
            created_at: now,
        }
    }
}

/// Who registered a user account or created an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CreatorKind {
    /// Self-registered or admin-created
    #[default]
    Admin,
    /// Created by a therapist when onboarding a patient
    Therapist,
    /// Created by a pro-tier user (custom exercises only)
    ProUser,
}

impl CreatorKind {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Therapist => "therapist",
            Self::ProUser => "pro_user",
        }
    }

    /// Parse from database string, defaulting to `Admin`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "therapist" => Self::Therapist,
            "pro_user" => Self::ProUser,
            _ => Self::Admin,
        }
    }
}

/// Creator attribution on users and exercises
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorAttribution {
    /// Kind of creator
    pub created_by: CreatorKind,
    /// Creator's id, when known
    pub creator_id: Option<Uuid>,
}

impl Default for CreatorAttribution {
    fn default() -> Self {
        Self {
            created_by: CreatorKind::Admin,
            creator_id: None,
        }
    }
}

/// Patient (or admin) account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub full_name: String,
    /// Email, unique across users
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Profile image URL
    pub profile_image: Option<String>,
    /// Role flag; admins are users with `role = admin`
    pub role: UserRole,
    /// Who registered this account
    pub creator: CreatorAttribution,
    /// Append-only membership history, loaded with the user
    pub memberships: Vec<Membership>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user with a free active membership
    #[must_use]
    pub fn new(full_name: String, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            full_name,
            email,
            password_hash,
            profile_image: None,
            role: UserRole::User,
            creator: CreatorAttribution::default(),
            memberships: vec![Membership::free(now)],
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this account carries the admin role
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Therapist account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Email, unique across therapists
    pub email: String,
    /// bcrypt hash, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Gender as a free-form profile field
    pub gender: String,
    /// At least one specialization
    pub specializations: Vec<String>,
    /// Hospital or clinic name
    pub working_at: String,
    /// Practice address
    pub address: String,
    /// Free-form experience field
    pub experience: String,
    /// Approval status; only `active` may authenticate
    pub status: TherapistStatus,
    /// Denormalized count of active consultations
    pub consultation_count: i64,
    /// Denormalized count of pending consultation requests
    pub request_count: i64,
    /// Append-only membership history
    pub memberships: Vec<Membership>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Exercise creator visibility; independent of the premium axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseVisibility {
    /// Visible in the shared catalog
    #[default]
    Public,
    /// Visible only to the creator (and their followers, for therapists)
    Private,
}

impl ExerciseVisibility {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parse from database string, defaulting to `Public`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "private" => Self::Private,
            _ => Self::Public,
        }
    }
}

/// Catalog exercise
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    /// Unique identifier
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Short description
    pub description: String,
    /// Step-by-step instruction text
    pub instruction: String,
    /// Image URLs
    pub images: Vec<String>,
    /// Optional video URL; withheld from non-premium viewers when `is_premium`
    pub video: Option<String>,
    /// Top-level body category (controlled taxonomy)
    pub category: String,
    /// Sub-category within the body region
    pub sub_category: String,
    /// Patient position (sitting, standing, ...)
    pub position: String,
    /// Repetitions per set
    pub reps: i64,
    /// Hold duration in seconds
    pub hold: i64,
    /// Number of sets
    pub sets: i64,
    /// Whether the video is premium-gated
    pub is_premium: bool,
    /// Who created the exercise
    pub created_by: CreatorKind,
    /// Creator id; `None` for seeded admin content
    pub creator_id: Option<Uuid>,
    /// Creator-controlled visibility
    pub visibility: ExerciseVisibility,
    /// View counter
    pub views: i64,
    /// Favorite counter, kept in step with the favorites table
    pub favorites: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Exercise {
    /// Strip the premium video for viewers below the required tier
    pub fn redact_for(&mut self, level: AccessLevel) {
        if self.is_premium && !level.sees_premium() {
            self.video = None;
        }
    }
}

/// How often a dosage count applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PerformInterval {
    Hour,
    #[default]
    Day,
    Week,
    Month,
}

impl PerformInterval {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
        }
    }

    /// Parse from database string, defaulting to `Day`
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "hour" => Self::Hour,
            "week" => Self::Week,
            "month" => Self::Month,
            _ => Self::Day,
        }
    }
}

/// A user's named program entry wrapping one exercise with its own dosage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Routine {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// The exercise this routine performs
    pub exercise_id: Uuid,
    /// User-chosen program name
    pub name: String,
    /// Repetitions per set
    pub reps: i64,
    /// Hold duration in seconds
    pub hold: i64,
    /// Completed repetition count
    pub complete: i64,
    /// How many times to perform per interval
    pub perform_count: i64,
    /// Interval the count applies to
    pub perform_type: PerformInterval,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// An exercise a user saved with their own dosage parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedExercise {
    /// Unique identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// The saved exercise
    pub exercise_id: Uuid,
    /// Repetitions per set
    pub reps: i64,
    /// Hold duration in seconds
    pub hold: i64,
    /// Completed repetition count
    pub complete: i64,
    /// How many times to perform per interval
    pub perform_count: i64,
    /// Interval the count applies to
    pub perform_type: PerformInterval,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Consultation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    /// Created but not yet activated
    #[default]
    Pending,
    /// Running; implies a non-null expiration instant
    Active,
    /// Expired or deactivated
    Inactive,
}

impl ConsultationStatus {
    /// Database string representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Strict parse; unknown strings are rejected before persistence
    ///
    /// # Errors
    /// Returns the offending string so callers can build a 400
    pub fn try_parse(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(other.to_owned()),
        }
    }

    /// Lenient parse for rows already in the store
    #[must_use]
    pub fn parse(s: &str) -> Self {
        Self::try_parse(s).unwrap_or_default()
    }
}

/// A therapist's time-boxed prescription of exercises to a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    /// Unique identifier
    pub id: Uuid,
    /// Owning therapist
    pub therapist_id: Uuid,
    /// Target patient
    pub patient_id: Uuid,
    /// Ordered set of prescribed exercise ids
    pub recommended_exercises: Vec<Uuid>,
    /// Lifecycle status
    pub status: ConsultationStatus,
    /// Length of the active window in days
    pub active_days: i64,
    /// Expiration instant; non-null whenever `status = active`
    pub expires_on: Option<DateTime<Utc>>,
    /// Free-text therapist notes
    pub notes: Option<String>,
    /// Creation timestamp (origin of the expiration window)
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Consultation {
    /// Activate the consultation, restarting the window from `now`
    pub fn activate(&mut self, active_days: i64, now: DateTime<Utc>) {
        self.status = ConsultationStatus::Active;
        self.active_days = active_days;
        self.expires_on = Some(now + Duration::days(active_days));
        self.updated_at = now;
    }

    /// Lazy expiration check: flips an elapsed active consultation to
    /// inactive. Returns whether anything changed so callers persist only
    /// corrected records. Never resurrects an inactive consultation.
    pub fn check_expiration(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != ConsultationStatus::Active {
            return false;
        }
        // Active rows written before expires_on existed fall back to the
        // window computed from the creation instant.
        let expires_on = self
            .expires_on
            .unwrap_or_else(|| self.created_at + Duration::days(self.active_days));
        if now > expires_on {
            self.status = ConsultationStatus::Inactive;
            self.updated_at = now;
            return true;
        }
        false
    }

    /// Recompute the expiration from the original creation instant.
    /// Updates do not reset the origin of the window.
    pub fn recompute_expiry_from_origin(&mut self) {
        self.expires_on = Some(self.created_at + Duration::days(self.active_days));
    }
}

/// Access level resolved for an inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// No or unusable credential; treated as normal for content shaping
    Anonymous,
    /// Authenticated free-tier user
    Normal,
    /// Authenticated user with an active paid tier
    Premium,
    /// Active therapist
    Therapist,
    /// Admin user
    Admin,
}

impl AccessLevel {
    /// Whether this level may see premium video content
    #[must_use]
    pub const fn sees_premium(self) -> bool {
        matches!(self, Self::Premium | Self::Therapist | Self::Admin)
    }

    /// Response string form
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Normal => "normal",
            Self::Premium => "premium",
            Self::Therapist => "therapist",
            Self::Admin => "admin",
        }
    }
}

/// Resolved subject attached to a request after classification
#[derive(Debug, Clone)]
pub enum Subject {
    /// Patient or admin account
    User(User),
    /// Therapist account
    Therapist(Therapist),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consultation_status_rejects_unknown_strings() {
        assert!(ConsultationStatus::try_parse("expired").is_err());
        assert_eq!(
            ConsultationStatus::try_parse("active"),
            Ok(ConsultationStatus::Active)
        );
    }

    #[test]
    fn activate_sets_expiry_from_now() {
        let now = Utc::now();
        let mut consultation = Consultation {
            id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            recommended_exercises: vec![],
            status: ConsultationStatus::Pending,
            active_days: 0,
            expires_on: None,
            notes: None,
            created_at: now - Duration::days(3),
            updated_at: now - Duration::days(3),
        };
        consultation.activate(14, now);
        assert_eq!(consultation.status, ConsultationStatus::Active);
        assert_eq!(consultation.expires_on, Some(now + Duration::days(14)));
    }

    #[test]
    fn expiration_check_is_idempotent_and_never_resurrects() {
        let created = Utc::now() - Duration::days(20);
        let mut consultation = Consultation {
            id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            recommended_exercises: vec![],
            status: ConsultationStatus::Active,
            active_days: 14,
            expires_on: Some(created + Duration::days(14)),
            notes: None,
            created_at: created,
            updated_at: created,
        };
        let now = Utc::now();
        assert!(consultation.check_expiration(now));
        assert_eq!(consultation.status, ConsultationStatus::Inactive);
        // Second run with the same clock changes nothing
        assert!(!consultation.check_expiration(now));
        assert_eq!(consultation.status, ConsultationStatus::Inactive);
    }

    #[test]
    fn premium_video_is_redacted_for_normal_viewers() {
        let now = Utc::now();
        let mut exercise = Exercise {
            id: Uuid::new_v4(),
            title: "Heel raise".into(),
            description: "d".into(),
            instruction: "i".into(),
            images: vec![],
            video: Some("https://cdn.example/video.mp4".into()),
            category: "Ankle and Foot".into(),
            sub_category: "Strength".into(),
            position: "Standing".into(),
            reps: 10,
            hold: 2,
            sets: 3,
            is_premium: true,
            created_by: CreatorKind::Admin,
            creator_id: None,
            visibility: ExerciseVisibility::Public,
            views: 0,
            favorites: 0,
            created_at: now,
            updated_at: now,
        };
        let mut kept = exercise.clone();
        exercise.redact_for(AccessLevel::Anonymous);
        assert!(exercise.video.is_none());
        kept.redact_for(AccessLevel::Premium);
        assert!(kept.video.is_some());
    }
}
