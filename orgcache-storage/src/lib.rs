//! orgcache storage - caching and coordination
//!
//! Three layers, bottom-up:
//!
//! 1. [`cache`]: the [`CacheStore`] trait with in-memory and LMDB stores
//! 2. [`coalesce`]: the [`RequestCoalescer`] lock table
//! 3. [`read_through`]: [`CoordinatedLookup`], the state machine that ties
//!    the two together around an upstream computation

pub mod cache;
pub mod coalesce;
pub mod read_through;

pub use cache::{
    open_configured, CacheEntry, CacheKey, CacheStats, CacheStore, CachedPayload,
    LmdbCacheError, LmdbCacheStore, MemoryCacheStore, TtlProbe,
};
pub use coalesce::{CoalescingGuard, CoalescingLock, RequestCoalescer};
pub use read_through::{
    CacheStatus, CoordinatedLookup, LookupPolicy, LookupRequest, LookupResponse, LookupStats,
    LookupStatsSnapshot, Outcome, Resolution, TtlPolicy,
};

// ============================================================================
// PROPERTY TESTS
// ============================================================================
