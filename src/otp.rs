// ABOUTME: In-memory one-time-code store for password resets
// ABOUTME: TTL-bounded, hash-at-rest, consumed exactly once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 HEP Platform

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};

struct OtpEntry {
    code_hash: String,
    expires_at: DateTime<Utc>,
}

/// One-time password reset codes, keyed by lowercased email.
///
/// Codes are stored as SHA-256 hashes so a process dump never reveals a
/// usable code. Issuing a new code replaces any pending one for the same
/// address; expired entries are purged on every insert and lookup, which
/// bounds the map to the set of addresses with a live code.
pub struct OtpStore {
    entries: DashMap<String, OtpEntry>,
    ttl: Duration,
}

impl OtpStore {
    #[must_use]
    pub fn new(ttl_minutes: i64) -> Self {
        Self {
            entries: DashMap::new(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    /// Generate a fresh six-digit code for `email` and return it.
    pub fn issue(&self, email: &str, now: DateTime<Utc>) -> String {
        self.purge_expired(now);
        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000));
        self.entries.insert(
            email.to_lowercase(),
            OtpEntry {
                code_hash: hash_code(&code),
                expires_at: now + self.ttl,
            },
        );
        code
    }

    /// Check `code` against the pending entry for `email`, removing the
    /// entry on success. A code never verifies twice.
    pub fn verify_and_consume(&self, email: &str, code: &str, now: DateTime<Utc>) -> bool {
        self.purge_expired(now);
        let key = email.to_lowercase();
        let matches = self
            .entries
            .get(&key)
            .is_some_and(|entry| entry.expires_at > now && entry.code_hash == hash_code(code));
        if matches {
            self.entries.remove(&key);
        }
        matches
    }

    /// Number of live entries (test introspection)
    #[must_use]
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    fn purge_expired(&self, now: DateTime<Utc>) {
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

fn hash_code(code: &str) -> String {
    hex::encode(Sha256::digest(code.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_consumed_exactly_once() {
        let store = OtpStore::new(10);
        let now = Utc::now();
        let code = store.issue("user@example.com", now);

        assert!(store.verify_and_consume("user@example.com", &code, now));
        assert!(!store.verify_and_consume("user@example.com", &code, now));
    }

    #[test]
    fn wrong_code_does_not_consume_the_entry() {
        let store = OtpStore::new(10);
        let now = Utc::now();
        let code = store.issue("user@example.com", now);

        assert!(!store.verify_and_consume("user@example.com", "000000", now));
        assert!(store.verify_and_consume("user@example.com", &code, now));
    }

    #[test]
    fn expired_code_is_rejected_and_evicted() {
        let store = OtpStore::new(10);
        let now = Utc::now();
        let code = store.issue("user@example.com", now);

        let later = now + Duration::minutes(11);
        assert!(!store.verify_and_consume("user@example.com", &code, later));
        assert_eq!(store.pending(), 0);
    }

    #[test]
    fn email_lookup_is_case_insensitive() {
        let store = OtpStore::new(10);
        let now = Utc::now();
        let code = store.issue("User@Example.COM", now);

        assert!(store.verify_and_consume("user@example.com", &code, now));
    }
}
