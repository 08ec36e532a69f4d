//! Cache store trait and statistics.

use std::time::Duration;

use async_trait::async_trait;
use orgcache_core::OrgCacheResult;

use super::entry::{CacheEntry, CachedPayload, TtlProbe};
use super::key::CacheKey;

/// Key-value store with per-entry expiry.
///
/// Implementations must be safe for concurrent use. Expired entries are
/// never returned by `get`; stores may drop them lazily.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry.
    async fn get(&self, key: &CacheKey) -> OrgCacheResult<Option<CacheEntry>>;

    /// Store a payload for `ttl`, replacing any previous entry.
    ///
    /// # Errors
    ///
    /// `CacheError::InvalidTtl` for a zero TTL, or a backend error.
    async fn set(&self, key: &CacheKey, payload: CachedPayload, ttl: Duration)
        -> OrgCacheResult<()>;

    /// Remove an entry. Returns whether anything was removed.
    async fn delete(&self, key: &CacheKey) -> OrgCacheResult<bool>;

    /// Best-effort remaining lifetime of an entry.
    async fn remaining_ttl(&self, _key: &CacheKey) -> OrgCacheResult<TtlProbe> {
        Ok(TtlProbe::Unknown)
    }

    /// Remove every entry whose stored key starts with `prefix`.
    async fn purge_prefix(&self, prefix: &str) -> OrgCacheResult<u64>;

    /// Usage statistics.
    async fn stats(&self) -> OrgCacheResult<CacheStats>;
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses, including expired entries.
    pub misses: u64,
    /// Number of entries currently stored.
    pub entry_count: u64,
    /// Approximate memory usage in bytes.
    pub memory_bytes: u64,
    /// Entries dropped for expiry or capacity.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
