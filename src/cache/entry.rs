//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

// == Cache Entry ==
/// A single encoded value owned by the local cache.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Key under which the entry is indexed
    pub key: String,
    /// Encoded value bytes
    pub value: Vec<u8>,
    /// Absolute expiry instant
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new entry that expires `ttl_secs` seconds from now.
    ///
    /// A non-positive TTL yields an entry that is already expired.
    pub fn new(key: String, value: Vec<u8>, ttl_secs: i64) -> Self {
        Self {
            key,
            value,
            expires_at: expiry_from_now(ttl_secs),
        }
    }

    // == Refresh ==
    /// Replaces the bytes and restarts the TTL from now.
    pub fn refresh(&mut self, value: Vec<u8>, ttl_secs: i64) {
        self.value = value;
        self.expires_at = expiry_from_now(ttl_secs);
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`, so a
    /// zero TTL is expired on the very next access.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    /// Checks whether the entry has expired at the current instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    // == Time To Live ==
    /// Returns the time left before expiry, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

/// Upper bound on a TTL (roughly 100 years).
pub const MAX_TTL_SECS: u64 = 100 * 365 * 24 * 60 * 60;

// == TTL Conversion ==
/// Converts a TTL in seconds into a duration every backend agrees on.
///
/// Non-positive TTLs become zero; far-future TTLs saturate at
/// [`MAX_TTL_SECS`] instead of overflowing the clock.
pub fn ttl_duration(ttl_secs: i64) -> Duration {
    Duration::from_secs(ttl_secs.max(0).unsigned_abs().min(MAX_TTL_SECS))
}

fn expiry_from_now(ttl_secs: i64) -> Instant {
    Instant::now() + ttl_duration(ttl_secs)
}
