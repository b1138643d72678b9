//! Cache Entry Module
//!
//! Defines the structure for individual local cache entries with TTL support.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

// == Cache Entry ==
/// Represents a single local cache entry with value and metadata.
///
/// The value is held as JSON so any serializable payload round-trips,
/// including an explicit `null`.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: Value,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Absolute expiration time
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl_seconds` from now.
    pub fn new(value: Value, ttl_seconds: u64) -> Self {
        Self::created_at(value, ttl_seconds, Utc::now())
    }

    fn created_at(value: Value, ttl_seconds: u64, now: DateTime<Utc>) -> Self {
        let ttl = i64::try_from(ttl_seconds)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired only once the current time is strictly after
    /// its expiration time.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, `0` once expired.
    pub fn ttl_remaining_ms(&self) -> u64 {
        let remaining = self.expires_at - Utc::now();
        u64::try_from(remaining.num_milliseconds()).unwrap_or(0)
    }
}
