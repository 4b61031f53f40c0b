// ABOUTME: Membership evaluator deriving the single active tier from history
// ABOUTME: Pure functions callable from read paths and an optional sweep
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

//! Membership evaluation
//!
//! A subject owns an append-only list of membership records. Paid records
//! elapse after their term; evaluation flips stale records to inactive and
//! guarantees exactly one active record remains, falling back to free.
//! Evaluation runs lazily on every authenticated access; callers persist
//! only when `changed` is reported.

use chrono::{DateTime, Utc};

use crate::models::{Membership, MembershipStatus, MembershipType};

/// Correct stale membership state in place.
///
/// For every active paid record whose term has elapsed since `payment_date`,
/// flip the status to inactive. If no record is left active afterwards,
/// reactivate an existing free record or append a fresh one. Returns whether
/// any record changed.
///
/// Invariants on return: at least one active record; under normal operation
/// (all writes going through [`upgrade`]) exactly one.
pub fn evaluate(records: &mut Vec<Membership>, now: DateTime<Utc>) -> bool {
    let mut changed = false;

    for record in records.iter_mut() {
        if record.status != MembershipStatus::Active {
            continue;
        }
        let Some(term) = record.membership_type.term() else {
            continue; // free never elapses
        };
        let Some(payment_date) = record.payment_date else {
            // Paid record without a payment date cannot be validated; expire it.
            record.status = MembershipStatus::Inactive;
            changed = true;
            continue;
        };
        if now - payment_date > term {
            record.status = MembershipStatus::Inactive;
            changed = true;
        }
    }

    if !records.iter().any(|r| r.status == MembershipStatus::Active) {
        if let Some(free) = records
            .iter_mut()
            .find(|r| r.membership_type == MembershipType::Free)
        {
            free.status = MembershipStatus::Active;
        } else {
            records.push(Membership::free(now));
        }
        changed = true;
    }

    changed
}

/// The currently effective record, if evaluation has run
#[must_use]
pub fn current(records: &[Membership]) -> Option<&Membership> {
    records.iter().find(|r| r.status == MembershipStatus::Active)
}

/// Whether the effective tier is an active paid one
#[must_use]
pub fn is_premium(records: &[Membership]) -> bool {
    current(records).is_some_and(|r| r.membership_type != MembershipType::Free)
}

/// Record a payment: deactivate the current record, then append the new paid
/// one (single-writer-wins, never two simultaneously active records).
///
/// Free upgrades are rejected upstream; this function only handles paid tiers.
pub fn upgrade(records: &mut Vec<Membership>, membership_type: MembershipType, now: DateTime<Utc>) {
    for record in records.iter_mut() {
        if record.status == MembershipStatus::Active {
            record.status = MembershipStatus::Inactive;
        }
    }
    records.push(Membership::paid(membership_type, now));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn paid_active(membership_type: MembershipType, paid_days_ago: i64) -> Membership {
        let now = Utc::now();
        Membership {
            payment_date: Some(now - Duration::days(paid_days_ago)),
            ..Membership::paid(membership_type, now)
        }
    }

    #[test]
    fn monthly_expires_after_30_days() {
        let now = Utc::now();

        let mut expired = vec![paid_active(MembershipType::Monthly, 31)];
        assert!(evaluate(&mut expired, now));
        assert_eq!(expired[0].status, MembershipStatus::Inactive);

        let mut live = vec![paid_active(MembershipType::Monthly, 29)];
        assert!(!evaluate(&mut live, now));
        assert_eq!(live[0].status, MembershipStatus::Active);
    }

    #[test]
    fn yearly_expires_after_365_days() {
        let now = Utc::now();

        let mut expired = vec![paid_active(MembershipType::Yearly, 366)];
        assert!(evaluate(&mut expired, now));
        assert_eq!(expired[0].status, MembershipStatus::Inactive);

        let mut live = vec![paid_active(MembershipType::Yearly, 364)];
        assert!(!evaluate(&mut live, now));
        assert_eq!(live[0].status, MembershipStatus::Active);
    }

    #[test]
    fn expired_paid_falls_back_to_existing_free_record() {
        let now = Utc::now();
        let mut free = Membership::free(now - Duration::days(100));
        free.status = MembershipStatus::Inactive;
        let mut records = vec![free, paid_active(MembershipType::Monthly, 40)];

        assert!(evaluate(&mut records, now));
        let active: Vec<_> = records
            .iter()
            .filter(|r| r.status == MembershipStatus::Active)
            .collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].membership_type, MembershipType::Free);
        // No extra record appended when a free one already existed
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn empty_history_gains_a_free_record() {
        let mut records = Vec::new();
        assert!(evaluate(&mut records, Utc::now()));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].membership_type, MembershipType::Free);
        assert_eq!(records[0].status, MembershipStatus::Active);
    }

    #[test]
    fn evaluation_never_leaves_two_active_records() {
        let now = Utc::now();
        let mut records = vec![Membership::free(now)];
        upgrade(&mut records, MembershipType::Monthly, now);

        assert!(!evaluate(&mut records, now));
        let active_count = records
            .iter()
            .filter(|r| r.status == MembershipStatus::Active)
            .count();
        assert_eq!(active_count, 1);
        assert!(is_premium(&records));
    }

    #[test]
    fn upgrade_deactivates_then_appends() {
        let now = Utc::now();
        let mut records = vec![Membership::free(now)];
        upgrade(&mut records, MembershipType::Yearly, now);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, MembershipStatus::Inactive);
        assert_eq!(records[1].membership_type, MembershipType::Yearly);
        assert_eq!(
            current(&records).map(|r| r.membership_type),
            Some(MembershipType::Yearly)
        );
    }

    #[test]
    fn evaluation_is_idempotent() {
        let now = Utc::now();
        let mut records = vec![paid_active(MembershipType::Monthly, 45)];
        assert!(evaluate(&mut records, now));
        let snapshot = records.clone();
        assert!(!evaluate(&mut records, now));
        assert_eq!(records, snapshot);
    }
}
