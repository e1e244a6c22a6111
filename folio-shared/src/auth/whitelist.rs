/// Session whitelist
///
/// The authoritative set of session tokens the service still honours. A
/// token that verifies but is missing from the whitelist has been revoked.
///
/// The whitelist starts empty, grows on login and shrinks on logout. It is
/// not persisted, so a restart revokes every session. Construct one per
/// process and hand clones to whoever needs it; clones share the same set.
///
/// Entries are SHA-256 fingerprints of the tokens, so the raw bearer
/// credentials are never kept in memory longer than a request. Each entry
/// carries its token's `exp`; expired entries are pruned on insert, since
/// an expired token fails verification whether or not it is listed.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Concurrent set of honoured session tokens
#[derive(Debug, Clone, Default)]
pub struct TokenWhitelist {
    /// Fingerprint -> expiry (Unix seconds)
    entries: Arc<Mutex<HashMap<String, i64>>>,
}

fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

impl TokenWhitelist {
    /// Empty whitelist
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, i64>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a token expiring at `expires_at` (Unix seconds)
    ///
    /// Drops every entry that has already expired first. Returns false if
    /// the token was already present.
    pub fn insert(&self, token: &str, expires_at: i64) -> bool {
        let now = Utc::now().timestamp();
        let mut entries = self.entries();

        let before = entries.len();
        entries.retain(|_, exp| *exp > now);
        let pruned = before - entries.len();
        if pruned > 0 {
            debug!(pruned, "Pruned expired session tokens");
        }

        entries.insert(fingerprint(token), expires_at).is_none()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries().contains_key(&fingerprint(token))
    }

    /// Removes a token; returns false if it was not present
    pub fn remove(&self, token: &str) -> bool {
        self.entries().remove(&fingerprint(token)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
