//! In-memory nonce tracking.
//!
//! One counter per routing key (`"<routing_counter>$<from_addr>"`). Entries
//! are created on first use and never removed. Nothing is persisted or shared
//! across processes; two processes signing for the same account can still
//! race at the sentinel, and this tracker only converges after the sentinel
//! rejects a stale nonce.

use dashmap::DashMap;
use tracing::debug;
use weil_types::constants::INITIAL_NONCE;

/// Routing key for an account on a given pod.
pub fn nonce_key(routing_counter: i32, from_addr: &str) -> String {
    format!("{}${}", routing_counter, from_addr)
}

/// Concurrent map from routing key to the next nonce to sign with.
#[derive(Debug, Default)]
pub struct NonceTracker {
    nonces: DashMap<String, u64>,
}

impl NonceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nonce for `key`, inserting [`INITIAL_NONCE`] if unseen. The
    /// insert is atomic: concurrent first callers all observe the same value.
    pub fn get_or_init(&self, key: &str) -> u64 {
        if let Some(nonce) = self.nonces.get(key) {
            return *nonce;
        }
        *self
            .nonces
            .entry(key.to_string())
            .or_insert(INITIAL_NONCE)
    }

    /// Set `key` to `expected + 1` if it has been seen. Returns whether an
    /// entry was updated; an unseen key is left alone.
    pub fn bump_if_present(&self, key: &str, expected: u64) -> bool {
        match self.nonces.get_mut(key) {
            Some(mut nonce) => {
                let next = expected.saturating_add(1);
                debug!(key, previous = *nonce, next, "nonce reconciled");
                *nonce = next;
                true
            }
            None => false,
        }
    }

    /// Current nonce for `key` without inserting.
    pub fn get(&self, key: &str) -> Option<u64> {
        self.nonces.get(key).map(|n| *n)
    }

    pub fn len(&self) -> usize {
        self.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nonces.is_empty()
    }
}
