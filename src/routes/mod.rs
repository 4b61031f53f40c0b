// ABOUTME: HTTP route modules, one router struct per domain
// ABOUTME: Each router takes the shared resources and exposes routes()
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

/// Admin-only platform management routes
pub mod admin;
/// Consultation read routes shared by patients and therapists
pub mod consultations;
/// Exercise catalog routes
pub mod exercises;
/// Liveness endpoint
pub mod health;
/// Per-user named program routes
pub mod routines;
/// Dosage-parameterized exercise saves
pub mod saved_exercises;
/// Therapist account and prescription routes
pub mod therapists;
/// User account, membership, and social routes
pub mod users;

pub use admin::AdminRoutes;
pub use consultations::ConsultationRoutes;
pub use exercises::ExerciseRoutes;
pub use health::HealthRoutes;
pub use routines::RoutineRoutes;
pub use saved_exercises::SavedExerciseRoutes;
pub use therapists::TherapistRoutes;
pub use users::UserRoutes;
