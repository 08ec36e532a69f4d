//! Coordinated read-through lookup.
//!
//! Composes a [`CacheStore`] with a [`RequestCoalescer`] so that a burst of
//! identical requests produces a single upstream computation:
//!
//! ```text
//! CheckCache -> CheckLock -> AwaitPeer -> CheckCache ...
//!                         \-> AcquireLock -> Compute -> StoreAndRelease
//! ```
//!
//! - Hits (positive or negative) return without touching the lock table.
//! - Upstream errors are returned and never cached.
//! - The lock is released only after the cache write, so woken peers see
//!   the value.
//! - A peer that waits too long computes anyway. Availability beats
//!   strict single-flight.
//! - Cache backend failures degrade to a miss; the lookup still answers.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orgcache_core::{CacheError, OrgCacheConfig, OrgCacheResult, ValidationError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::{CacheKey, CacheStore, CachedPayload};
use crate::coalesce::{CoalescingGuard, RequestCoalescer};

/// What an upstream computation found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution<T> {
    Found(T),
    NotFound,
    Disabled,
}

impl<T> Resolution<T> {
    pub fn outcome(&self) -> Outcome {
        match self {
            Resolution::Found(_) => Outcome::Success,
            Resolution::NotFound => Outcome::NotFound,
            Resolution::Disabled => Outcome::Disabled,
        }
    }

    pub fn found(&self) -> Option<&T> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_found(self) -> Option<T> {
        match self {
            Resolution::Found(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Resolution<U> {
        match self {
            Resolution::Found(value) => Resolution::Found(f(value)),
            Resolution::NotFound => Resolution::NotFound,
            Resolution::Disabled => Resolution::Disabled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Lookup outcome. `Error` labels failed lookups and is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Success,
    NotFound,
    Disabled,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::NotFound => "NOT_FOUND",
            Outcome::Disabled => "DISABLED",
            Outcome::Error => "ERROR",
        }
    }
}

/// TTLs per outcome. Negative TTLs are short and `not_found < disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub success: Duration,
    pub not_found: Duration,
    pub disabled: Duration,
}

impl TtlPolicy {
    pub fn ttl_for<T>(&self, resolution: &Resolution<T>) -> Duration {
        match resolution {
            Resolution::Found(_) => self.success,
            Resolution::NotFound => self.not_found,
            Resolution::Disabled => self.disabled,
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        let config = OrgCacheConfig::default();
        Self {
            success: config.person_ttl,
            not_found: config.not_found_ttl,
            disabled: config.disabled_ttl,
        }
    }
}

/// Timing knobs for coordinated lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupPolicy {
    pub ttl: TtlPolicy,
    pub lock_timeout: Duration,
    pub max_wait: Duration,
    pub max_await_rounds: u32,
}

impl LookupPolicy {
    /// Policy from configuration. Success TTL defaults to `person_ttl`;
    /// requests override it per operation.
    pub fn from_config(config: &OrgCacheConfig) -> Self {
        Self {
            ttl: TtlPolicy {
                success: config.person_ttl,
                not_found: config.not_found_ttl,
                disabled: config.disabled_ttl,
            },
            lock_timeout: config.lock_timeout,
            max_wait: config.max_wait,
            max_await_rounds: config.max_await_rounds,
        }
    }
}

impl Default for LookupPolicy {
    fn default() -> Self {
        Self::from_config(&OrgCacheConfig::default())
    }
}

/// A named operation with its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    operation: String,
    params: BTreeMap<String, String>,
    success_ttl: Option<Duration>,
}

impl LookupRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            params: BTreeMap::new(),
            success_ttl: None,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Override the success TTL for this request.
    pub fn with_success_ttl(mut self, ttl: Duration) -> Self {
        self.success_ttl = Some(ttl);
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn key(&self) -> Result<CacheKey, ValidationError> {
        CacheKey::new(&self.operation, &self.params)
    }
}

/// Answer to a lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupResponse<T> {
    pub key: CacheKey,
    pub status: CacheStatus,
    pub resolution: Resolution<T>,
    /// TTL the entry was (or would have been) stored with.
    pub ttl: Duration,
}

impl<T> LookupResponse<T> {
    pub fn outcome(&self) -> Outcome {
        self.resolution.outcome()
    }

    pub fn value(&self) -> Option<&T> {
        self.resolution.found()
    }

    pub fn is_hit(&self) -> bool {
        self.status == CacheStatus::Hit
    }
}

/// Counters for coordinated lookups.
#[derive(Debug, Default)]
pub struct LookupStats {
    hits: AtomicU64,
    misses: AtomicU64,
    computations: AtomicU64,
    waits: AtomicU64,
    wait_timeouts: AtomicU64,
    uncoordinated: AtomicU64,
    cache_failures: AtomicU64,
}

/// Point-in-time copy of [`LookupStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Upstream computations started, with or without the lock.
    pub computations: u64,
    pub waits: u64,
    pub wait_timeouts: u64,
    /// Computations that ran without holding the lock.
    pub uncoordinated: u64,
    pub cache_failures: u64,
}

impl LookupStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LookupStatsSnapshot {
        LookupStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
            waits: self.waits.load(Ordering::Relaxed),
            wait_timeouts: self.wait_timeouts.load(Ordering::Relaxed),
            uncoordinated: self.uncoordinated.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    CheckCache,
    CheckLock,
    AwaitPeer,
    AcquireLock,
    Compute,
}

/// Read-through cache with request coalescing.
pub struct CoordinatedLookup<S: CacheStore + ?Sized> {
    store: Arc<S>,
    coalescer: Arc<RequestCoalescer>,
    policy: LookupPolicy,
    stats: LookupStats,
}

impl<S: CacheStore + ?Sized> CoordinatedLookup<S> {
    pub fn new(store: Arc<S>, coalescer: Arc<RequestCoalescer>, policy: LookupPolicy) -> Self {
        Self {
            store,
            coalescer,
            policy,
            stats: LookupStats::default(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn coalescer(&self) -> &Arc<RequestCoalescer> {
        &self.coalescer
    }

    pub fn policy(&self) -> &LookupPolicy {
        &self.policy
    }

    pub fn stats(&self) -> LookupStatsSnapshot {
        self.stats.snapshot()
    }

    /// Run a lookup, computing on a miss.
    ///
    /// `compute` is called at most once, and only after the cache missed.
    ///
    /// # Errors
    ///
    /// - `ValidationError` when the request cannot form a key (nothing is
    ///   read, locked or computed)
    /// - `CoalesceError::Overloaded` when the in-flight cap is reached
    /// - whatever `compute` returns; such errors are not cached
    pub async fn lookup<T, F, Fut>(
        &self,
        request: &LookupRequest,
        compute: F,
    ) -> OrgCacheResult<LookupResponse<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = OrgCacheResult<Resolution<T>>>,
    {
        let key = request.key()?;
        let ttl = TtlPolicy {
            success: request.success_ttl.unwrap_or(self.policy.ttl.success),
            ..self.policy.ttl
        };

        let mut guard: Option<CoalescingGuard<'_>> = None;
        let mut rounds = 0u32;
        let mut phase = Phase::CheckCache;

        while phase != Phase::Compute {
            phase = match phase {
                Phase::CheckCache => match self.read_cached::<T>(&key).await {
                    Some(hit) => return Ok(hit),
                    None => Phase::CheckLock,
                },
                Phase::CheckLock => {
                    if self.coalescer.is_held(key.as_str()) {
                        Phase::AwaitPeer
                    } else {
                        Phase::AcquireLock
                    }
                }
                Phase::AwaitPeer => {
                    if rounds >= self.policy.max_await_rounds {
                        tracing::warn!(key = %key, rounds, "giving up on peer, computing without lock");
                        Phase::Compute
                    } else {
                        rounds += 1;
                        LookupStats::bump(&self.stats.waits);
                        if self
                            .coalescer
                            .await_release(key.as_str(), self.policy.max_wait)
                            .await
                        {
                            Phase::CheckCache
                        } else {
                            LookupStats::bump(&self.stats.wait_timeouts);
                            tracing::warn!(
                                key = %key,
                                max_wait_ms = self.policy.max_wait.as_millis() as u64,
                                "timed out waiting for peer, computing without lock"
                            );
                            Phase::Compute
                        }
                    }
                }
                Phase::AcquireLock => {
                    match self.coalescer.acquire(key.as_str(), self.policy.lock_timeout)? {
                        Some(acquired) => {
                            guard = Some(acquired);
                            // A peer may have stored the value between our miss and now.
                            if let Some(hit) = self.read_cached::<T>(&key).await {
                                return Ok(hit);
                            }
                            Phase::Compute
                        }
                        None => Phase::AwaitPeer,
                    }
                }
                Phase::Compute => Phase::Compute,
            };
        }

        LookupStats::bump(&self.stats.misses);
        LookupStats::bump(&self.stats.computations);
        if guard.is_none() {
            LookupStats::bump(&self.stats.uncoordinated);
        }

        tracing::debug!(key = %key, locked = guard.is_some(), "computing");
        let resolution = compute().await?;
        let ttl = ttl.ttl_for(&resolution);

        self.store_result(&key, &resolution, ttl).await;
        drop(guard);

        tracing::info!(
            key = %key,
            outcome = resolution.outcome().as_str(),
            ttl_secs = ttl.as_secs(),
            "lookup computed"
        );

        Ok(LookupResponse {
            key,
            status: CacheStatus::Miss,
            resolution,
            ttl,
        })
    }

    /// Read and decode a cached entry. Any failure counts as a miss.
    async fn read_cached<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Option<LookupResponse<T>> {
        let entry = match self.store.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                LookupStats::bump(&self.stats.cache_failures);
                tracing::warn!(key = %key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let ttl = entry.ttl();
        let resolution = match entry.payload {
            CachedPayload::Found(json) => match serde_json::from_value::<T>(json) {
                Ok(value) => Resolution::Found(value),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    if let Err(e) = self.store.delete(key).await {
                        tracing::warn!(key = %key, error = %e, "failed to delete cache entry");
                    }
                    return None;
                }
            },
            CachedPayload::NotFound => Resolution::NotFound,
            CachedPayload::Disabled => Resolution::Disabled,
        };

        LookupStats::bump(&self.stats.hits);
        tracing::debug!(key = %key, outcome = resolution.outcome().as_str(), "cache hit");
        Some(LookupResponse {
            key: key.clone(),
            status: CacheStatus::Hit,
            resolution,
            ttl,
        })
    }

    async fn store_result<T: Serialize>(
        &self,
        key: &CacheKey,
        resolution: &Resolution<T>,
        ttl: Duration,
    ) {
        let payload = match resolution {
            Resolution::Found(value) => match serde_json::to_value(value) {
                Ok(json) => CachedPayload::Found(json),
                Err(e) => {
                    let err = CacheError::Serialization {
                        key: key.to_string(),
                        reason: e.to_string(),
                    };
                    LookupStats::bump(&self.stats.cache_failures);
                    tracing::warn!(error = %err, "result not cached");
                    return;
                }
            },
            Resolution::NotFound => CachedPayload::NotFound,
            Resolution::Disabled => CachedPayload::Disabled,
        };

        if let Err(e) = self.store.set(key, payload, ttl).await {
            LookupStats::bump(&self.stats.cache_failures);
            tracing::warn!(key = %key, error = %e, "cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, CacheStats, MemoryCacheStore, TtlProbe};
    use async_trait::async_trait;
    use orgcache_core::{DirectoryError, ManualClock, OrgCacheError};
    use std::sync::atomic::AtomicUsize;

    fn setup() -> (
        CoordinatedLookup<MemoryCacheStore>,
        Arc<ManualClock>,
    ) {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryCacheStore::new(100, clock.clone()));
        let coalescer = Arc::new(RequestCoalescer::new(clock.clone()));
        let policy = LookupPolicy {
            ttl: TtlPolicy {
                success: Duration::from_secs(3600),
                not_found: Duration::from_secs(300),
                disabled: Duration::from_secs(3600),
            },
            lock_timeout: Duration::from_secs(10),
            max_wait: Duration::from_millis(200),
            max_await_rounds: 3,
        };
        (CoordinatedLookup::new(store, coalescer, policy), clock)
    }

    fn request(mail: &str) -> LookupRequest {
        LookupRequest::new("person_detail").param("mail", mail)
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (lookup, _clock) = setup();
        let calls = AtomicUsize::new(0);

        for expected in [CacheStatus::Miss, CacheStatus::Hit] {
            let response = lookup
                .lookup(&request("ana@acme.test"), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Resolution::Found("Ana".to_string()))
                })
                .await
                .expect("lookup should succeed");
            assert_eq!(response.status, expected);
            assert_eq!(response.value().map(String::as_str), Some("Ana"));
            assert_eq!(response.outcome(), Outcome::Success);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!lookup.coalescer().is_held("person_detail::mail=ana@acme.test"));
    }

    #[tokio::test]
    async fn test_negative_ttls() {
        let (lookup, _clock) = setup();
        let missing = lookup
            .lookup(&request("gone@acme.test"), || async {
                Ok(Resolution::<String>::NotFound)
            })
            .await
            .expect("lookup");
        let disabled = lookup
            .lookup(&request("off@acme.test"), || async {
                Ok(Resolution::<String>::Disabled)
            })
            .await
            .expect("lookup");

        assert_eq!(missing.outcome(), Outcome::NotFound);
        assert_eq!(disabled.outcome(), Outcome::Disabled);
        assert!(missing.ttl < disabled.ttl);

        let probe = lookup
            .store()
            .remaining_ttl(&missing.key)
            .await
            .expect("probe");
        assert_eq!(probe, TtlProbe::Remaining(Duration::from_secs(300)));
    }

    #[tokio::test]
    async fn test_success_ttl_override() {
        let (lookup, _clock) = setup();
        let req = LookupRequest::new("org_tree").with_success_ttl(Duration::from_secs(86400));
        let response = lookup
            .lookup(&req, || async { Ok(Resolution::Found(vec![1u32, 2, 3])) })
            .await
            .expect("lookup");
        assert_eq!(response.ttl, Duration::from_secs(86400));
    }

    #[tokio::test]
    async fn test_errors_are_not_cached_and_release_lock() {
        let (lookup, _clock) = setup();
        let err = lookup
            .lookup(&request("ana@acme.test"), || async {
                Err::<Resolution<String>, _>(
                    DirectoryError::Unavailable {
                        reason: "down".to_string(),
                    }
                    .into(),
                )
            })
            .await
            .expect_err("upstream failure");
        assert!(matches!(err, OrgCacheError::Directory(_)));
        assert!(!lookup.coalescer().is_held("person_detail::mail=ana@acme.test"));

        let response = lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found("Ana".to_string()))
            })
            .await
            .expect("second lookup");
        assert_eq!(response.status, CacheStatus::Miss);
    }

    #[tokio::test]
    async fn test_malformed_request_touches_nothing() {
        let (lookup, _clock) = setup();
        let calls = AtomicUsize::new(0);
        let err = lookup
            .lookup(&LookupRequest::new("bad::name"), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Resolution::Found(1u8))
            })
            .await
            .expect_err("invalid key");
        assert_eq!(err.kind(), "malformed_input");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(lookup.coalescer().in_flight(), 0);
        assert_eq!(lookup.store().stats().await.expect("stats").misses, 0);
    }

    #[tokio::test]
    async fn test_expired_entry_recomputes() {
        let (lookup, clock) = setup();
        let calls = AtomicUsize::new(0);
        let req = request("gone@acme.test");
        let run = || {
            lookup.lookup(&req, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Resolution::<String>::NotFound)
            })
        };

        run().await.expect("first");
        clock.advance(Duration::from_secs(299));
        assert!(run().await.expect("cached").is_hit());
        clock.advance(Duration::from_secs(2));
        assert!(!run().await.expect("expired").is_hit());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wait_timeout_computes_anyway() {
        let (lookup, _clock) = setup();
        let key = request("ana@acme.test").key().expect("valid");
        assert!(lookup
            .coalescer()
            .try_begin(key.as_str(), Duration::from_secs(10)));

        let response = lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found("Ana".to_string()))
            })
            .await
            .expect("computes despite held lock");
        assert_eq!(response.status, CacheStatus::Miss);

        let stats = lookup.stats();
        assert_eq!(stats.wait_timeouts, 1);
        assert_eq!(stats.uncoordinated, 1);
        // The foreign holder keeps its lock.
        assert!(lookup.coalescer().is_held(key.as_str()));
    }

    #[tokio::test]
    async fn test_overload_error() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryCacheStore::new(100, clock.clone()));
        let coalescer = Arc::new(RequestCoalescer::new(clock.clone()).with_max_in_flight(1));
        let lookup = CoordinatedLookup::new(store, coalescer.clone(), LookupPolicy::default());
        assert!(coalescer.try_begin("other::", Duration::from_secs(10)));

        let err = lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found(1u8))
            })
            .await
            .expect_err("overloaded");
        assert!(err.is_retryable());
        assert_eq!(err.kind(), "overloaded");
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _: &CacheKey) -> OrgCacheResult<Option<CacheEntry>> {
            Err(CacheError::Backend { reason: "disk gone".to_string() }.into())
        }
        async fn set(&self, _: &CacheKey, _: CachedPayload, _: Duration) -> OrgCacheResult<()> {
            Err(CacheError::Backend { reason: "disk gone".to_string() }.into())
        }
        async fn delete(&self, _: &CacheKey) -> OrgCacheResult<bool> {
            Ok(false)
        }
        async fn purge_prefix(&self, _: &str) -> OrgCacheResult<u64> {
            Ok(0)
        }
        async fn stats(&self) -> OrgCacheResult<CacheStats> {
            Ok(CacheStats::default())
        }
    }

    #[tokio::test]
    async fn test_cache_failures_degrade_to_miss() {
        let clock = Arc::new(ManualClock::starting_now());
        let lookup = CoordinatedLookup::new(
            Arc::new(BrokenStore),
            Arc::new(RequestCoalescer::new(clock)),
            LookupPolicy::default(),
        );
        let response = lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found("Ana".to_string()))
            })
            .await
            .expect("still answers");
        assert_eq!(response.status, CacheStatus::Miss);
        assert!(lookup.stats().cache_failures >= 2);
        assert_eq!(lookup.coalescer().in_flight(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_replaced() {
        let (lookup, _clock) = setup();
        lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found("Ana".to_string()))
            })
            .await
            .expect("seed");

        // Same key, incompatible type.
        let response = lookup
            .lookup(&request("ana@acme.test"), || async {
                Ok(Resolution::Found(42u32))
            })
            .await
            .expect("recomputes");
        assert_eq!(response.status, CacheStatus::Miss);
        assert_eq!(response.value(), Some(&42));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lookups_compute_once() {
        let clock = Arc::new(ManualClock::starting_now());
        let store = Arc::new(MemoryCacheStore::new(100, clock.clone()));
        let coalescer = Arc::new(RequestCoalescer::new(clock));
        let policy = LookupPolicy {
            max_wait: Duration::from_secs(5),
            ..LookupPolicy::default()
        };
        let lookup = Arc::new(CoordinatedLookup::new(store, coalescer, policy));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let lookup = Arc::clone(&lookup);
            let calls = Arc::clone(&calls);
            tasks.push(tokio::spawn(async move {
                lookup
                    .lookup(&request("ana@acme.test"), || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok(Resolution::Found("Ana".to_string()))
                    })
                    .await
            }));
        }

        for task in tasks {
            let response = task.await.expect("task").expect("lookup");
            assert_eq!(response.value().map(String::as_str), Some("Ana"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
