//! Cache entries and payloads.

use std::time::Duration;

use orgcache_core::{add_duration, elapsed_between, CacheError, Timestamp};
use serde::{Deserialize, Serialize};

/// What a cache entry remembers about a lookup.
///
/// Negative payloads carry no value; they only record that the directory
/// said "no such person" or "account disabled".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedPayload {
    Found(serde_json::Value),
    NotFound,
    Disabled,
}

impl CachedPayload {
    pub fn is_negative(&self) -> bool {
        !matches!(self, CachedPayload::Found(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            CachedPayload::Found(_) => "found",
            CachedPayload::NotFound => "not_found",
            CachedPayload::Disabled => "disabled",
        }
    }
}

/// A stored entry. `expires_at` is always after `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: CachedPayload,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

impl CacheEntry {
    /// Create an entry that lives for `ttl` from `created_at`.
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidTtl` for a zero TTL.
    pub fn new(
        key: impl Into<String>,
        payload: CachedPayload,
        created_at: Timestamp,
        ttl: Duration,
    ) -> Result<Self, CacheError> {
        let key = key.into();
        if ttl.is_zero() {
            return Err(CacheError::InvalidTtl { key });
        }
        let expires_at = add_duration(created_at, ttl);
        if expires_at <= created_at {
            return Err(CacheError::InvalidTtl { key });
        }
        Ok(Self {
            key,
            payload,
            created_at,
            expires_at,
        })
    }

    pub fn is_negative(&self) -> bool {
        self.payload.is_negative()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self, now: Timestamp) -> Duration {
        elapsed_between(now, self.expires_at)
    }

    /// The TTL the entry was written with.
    pub fn ttl(&self) -> Duration {
        elapsed_between(self.created_at, self.expires_at)
    }
}

/// Result of asking a store how long an entry has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlProbe {
    Remaining(Duration),
    Absent,
    /// The backend cannot tell.
    Unknown,
}
