//! Bounded in-memory cache store.
//!
//! When full, a write first drops every expired entry, then the live entry
//! closest to expiry. Expired entries found by `get` are removed on the spot.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use orgcache_core::{CacheError, OrgCacheResult, SharedClock};

use super::entry::{CacheEntry, CachedPayload, TtlProbe};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

#[derive(Debug)]
struct Slot {
    entry: CacheEntry,
    size_bytes: usize,
}

#[derive(Debug, Default)]
struct Inner {
    slots: HashMap<String, Slot>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

#[derive(Debug)]
pub struct MemoryCacheStore {
    inner: RwLock<Inner>,
    max_entries: usize,
    clock: SharedClock,
}

impl MemoryCacheStore {
    /// Create a store holding at most `max_entries` entries (minimum 1).
    pub fn new(max_entries: usize, clock: SharedClock) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            max_entries: max_entries.max(1),
            clock,
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, CacheError> {
        self.inner.read().map_err(|_| CacheError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, CacheError> {
        self.inner.write().map_err(|_| CacheError::LockPoisoned)
    }
}

fn approximate_size(key: &str, payload: &CachedPayload) -> usize {
    let body = match payload {
        CachedPayload::Found(value) => serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0),
        _ => 0,
    };
    key.len() + body + std::mem::size_of::<CacheEntry>()
}

impl Inner {
    fn make_room(&mut self, now: orgcache_core::Timestamp, max_entries: usize) {
        if self.slots.len() < max_entries {
            return;
        }

        let before = self.slots.len();
        self.slots.retain(|_, slot| !slot.entry.is_expired(now));
        self.evictions += (before - self.slots.len()) as u64;

        while self.slots.len() >= max_entries {
            let victim = self
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.entry.expires_at)
                .map(|(key, _)| key.clone());
            match victim {
                Some(key) => {
                    self.slots.remove(&key);
                    self.evictions += 1;
                    tracing::debug!(key = %key, "evicted cache entry closest to expiry");
                }
                None => break,
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> OrgCacheResult<Option<CacheEntry>> {
        let now = self.clock.now();
        let mut inner = self.write()?;

        let expired = match inner.slots.get(key.as_str()) {
            Some(slot) if !slot.entry.is_expired(now) => {
                let entry = slot.entry.clone();
                inner.hits += 1;
                return Ok(Some(entry));
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.slots.remove(key.as_str());
            inner.evictions += 1;
        }
        inner.misses += 1;
        Ok(None)
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
    ) -> OrgCacheResult<()> {
        let now = self.clock.now();
        let size_bytes = approximate_size(key.as_str(), &payload);
        let entry = CacheEntry::new(key.as_str(), payload, now, ttl)?;

        let mut inner = self.write()?;
        if !inner.slots.contains_key(key.as_str()) {
            inner.make_room(now, self.max_entries);
        }
        inner
            .slots
            .insert(key.as_str().to_string(), Slot { entry, size_bytes });
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> OrgCacheResult<bool> {
        Ok(self.write()?.slots.remove(key.as_str()).is_some())
    }

    async fn remaining_ttl(&self, key: &CacheKey) -> OrgCacheResult<TtlProbe> {
        let now = self.clock.now();
        let inner = self.read()?;
        Ok(match inner.slots.get(key.as_str()) {
            Some(slot) if !slot.entry.is_expired(now) => {
                TtlProbe::Remaining(slot.entry.remaining(now))
            }
            _ => TtlProbe::Absent,
        })
    }

    async fn purge_prefix(&self, prefix: &str) -> OrgCacheResult<u64> {
        let mut inner = self.write()?;
        let before = inner.slots.len();
        inner.slots.retain(|key, _| !key.starts_with(prefix));
        Ok((before - inner.slots.len()) as u64)
    }

    async fn stats(&self) -> OrgCacheResult<CacheStats> {
        let inner = self.read()?;
        Ok(CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            entry_count: inner.slots.len() as u64,
            memory_bytes: inner.slots.values().map(|s| s.size_bytes as u64).sum(),
            evictions: inner.evictions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgcache_core::ManualClock;
    use std::sync::Arc;

    fn store(max_entries: usize) -> (MemoryCacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        (MemoryCacheStore::new(max_entries, clock.clone()), clock)
    }

    fn key(mail: &str) -> CacheKey {
        CacheKey::from_pairs("person_detail", [("mail", mail)]).expect("valid key")
    }

    fn found(n: i64) -> CachedPayload {
        CachedPayload::Found(serde_json::json!({ "n": n }))
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (store, _clock) = store(10);
        store
            .set(&key("a"), found(1), Duration::from_secs(60))
            .await
            .expect("set should succeed");

        let entry = store
            .get(&key("a"))
            .await
            .expect("get should succeed")
            .expect("entry present");
        assert_eq!(entry.payload, found(1));
        assert_eq!(entry.key, "person_detail::mail=a");
    }

    #[tokio::test]
    async fn test_expired_entries_are_absent() {
        let (store, clock) = store(10);
        store
            .set(&key("a"), CachedPayload::NotFound, Duration::from_secs(300))
            .await
            .expect("set should succeed");

        clock.advance(Duration::from_secs(299));
        assert!(store.get(&key("a")).await.expect("get").is_some());
        assert_eq!(
            store.remaining_ttl(&key("a")).await.expect("probe"),
            TtlProbe::Remaining(Duration::from_secs(1))
        );

        clock.advance(Duration::from_secs(1));
        assert!(store.get(&key("a")).await.expect("get").is_none());
        assert_eq!(
            store.remaining_ttl(&key("a")).await.expect("probe"),
            TtlProbe::Absent
        );

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.entry_count, 0);
        assert_eq!(stats.evictions, 1);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let (store, _clock) = store(10);
        let err = store
            .set(&key("a"), found(1), Duration::ZERO)
            .await
            .expect_err("zero ttl");
        assert_eq!(err.kind(), "cache");
    }

    #[tokio::test]
    async fn test_capacity_evicts_soonest_to_expire() {
        let (store, _clock) = store(2);
        store.set(&key("long"), found(1), Duration::from_secs(3600)).await.expect("set");
        store.set(&key("short"), found(2), Duration::from_secs(10)).await.expect("set");
        store.set(&key("new"), found(3), Duration::from_secs(600)).await.expect("set");

        assert!(store.get(&key("long")).await.expect("get").is_some());
        assert!(store.get(&key("short")).await.expect("get").is_none());
        assert!(store.get(&key("new")).await.expect("get").is_some());
        assert_eq!(store.stats().await.expect("stats").evictions, 1);
    }

    #[tokio::test]
    async fn test_capacity_prefers_expired_entries() {
        let (store, clock) = store(2);
        store.set(&key("stale"), found(1), Duration::from_secs(5)).await.expect("set");
        store.set(&key("fresh"), found(2), Duration::from_secs(3600)).await.expect("set");
        clock.advance(Duration::from_secs(10));
        store.set(&key("new"), found(3), Duration::from_secs(60)).await.expect("set");

        assert!(store.get(&key("fresh")).await.expect("get").is_some());
        assert!(store.get(&key("new")).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let (store, _clock) = store(1);
        store.set(&key("a"), found(1), Duration::from_secs(60)).await.expect("set");
        store.set(&key("a"), found(2), Duration::from_secs(60)).await.expect("set");
        let entry = store.get(&key("a")).await.expect("get").expect("present");
        assert_eq!(entry.payload, found(2));
        assert_eq!(store.stats().await.expect("stats").evictions, 0);
    }

    #[tokio::test]
    async fn test_delete_and_purge_prefix() {
        let (store, _clock) = store(10);
        store.set(&key("a"), found(1), Duration::from_secs(60)).await.expect("set");
        store.set(&key("b"), found(2), Duration::from_secs(60)).await.expect("set");
        let tree = CacheKey::from_pairs::<_, String, String>("org_tree", []).expect("valid");
        store.set(&tree, found(3), Duration::from_secs(60)).await.expect("set");

        assert!(store.delete(&key("a")).await.expect("delete"));
        assert!(!store.delete(&key("a")).await.expect("delete"));

        let purged = store
            .purge_prefix(&CacheKey::operation_prefix("person_detail"))
            .await
            .expect("purge");
        assert_eq!(purged, 1);
        assert!(store.get(&tree).await.expect("get").is_some());
    }

    #[tokio::test]
    async fn test_stats_track_hits_and_misses() {
        let (store, _clock) = store(10);
        let _ = store.get(&key("a")).await;
        store.set(&key("a"), found(1), Duration::from_secs(60)).await.expect("set");
        let _ = store.get(&key("a")).await;
        let _ = store.get(&key("a")).await;

        let stats = store.stats().await.expect("stats");
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entry_count, 1);
        assert!(stats.memory_bytes > 0);
    }
}
