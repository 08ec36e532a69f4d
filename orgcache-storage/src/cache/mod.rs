//! Cache layer: canonical keys, entries with per-entry expiry, and two
//! interchangeable stores.
//!
//! - [`MemoryCacheStore`] is bounded and process-local.
//! - [`LmdbCacheStore`] is persistent and can be shared by every worker on
//!   a host.
//!
//! [`open_configured`] picks one from [`OrgCacheConfig`].

pub mod entry;
pub mod key;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

use std::sync::Arc;

use orgcache_core::{OrgCacheConfig, OrgCacheResult, SharedClock};

pub use entry::{CacheEntry, CachedPayload, TtlProbe};
pub use key::{CacheKey, MAX_STORAGE_KEY_LEN, SEPARATOR};
pub use lmdb_backend::{LmdbCacheError, LmdbCacheStore};
pub use memory::MemoryCacheStore;
pub use traits::{CacheStats, CacheStore};

/// Open the store selected by configuration: LMDB when `cache_path` is set,
/// otherwise the in-memory store.
pub fn open_configured(
    config: &OrgCacheConfig,
    clock: SharedClock,
) -> OrgCacheResult<Arc<dyn CacheStore>> {
    match &config.cache_path {
        Some(path) => {
            let store = LmdbCacheStore::open(path, config.cache_max_size_mb, clock)?;
            tracing::info!(path = %path.display(), "opened LMDB cache store");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(max_entries = config.cache_max_entries, "using in-memory cache store");
            Ok(Arc::new(MemoryCacheStore::new(config.cache_max_entries, clock)))
        }
    }
}
