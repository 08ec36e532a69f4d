//! LMDB-backed cache store.
//!
//! Uses the heed crate (Rust bindings for LMDB) to provide a persistent,
//! memory-mapped key-value store shared by every worker on the host.
//!
//! # Value layout
//!
//! `[created_at ms: 8 bytes LE][expires_at ms: 8 bytes LE][payload json]`
//!
//! # Thread Safety
//!
//! LMDB provides ACID transactions. The store uses:
//! - Read transactions for `get`, `remaining_ttl` and `stats`
//! - Write transactions for `set`, `delete`, `purge_prefix` and lazy expiry
//! - Hit/miss counters are tracked with atomics
//!
//! Transactions never outlive the synchronous helper that opens them.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use orgcache_core::{CacheError, OrgCacheResult, SharedClock, Timestamp};

use super::entry::{CacheEntry, CachedPayload, TtlProbe};
use super::key::CacheKey;
use super::traits::{CacheStats, CacheStore};

const HEADER_LEN: usize = 16;

/// Error type for LMDB cache operations.
#[derive(Debug, thiserror::Error)]
pub enum LmdbCacheError {
    /// Failed to open or create the LMDB environment.
    #[error("Failed to open LMDB environment: {0}")]
    EnvOpen(String),

    /// Failed to open the database within the environment.
    #[error("Failed to open database: {0}")]
    DbOpen(String),

    /// Transaction error.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Stored bytes do not follow the value layout.
    #[error("Corrupt entry: {0}")]
    Corrupt(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LmdbCacheError> for orgcache_core::OrgCacheError {
    fn from(e: LmdbCacheError) -> Self {
        orgcache_core::OrgCacheError::Cache(CacheError::Backend {
            reason: e.to_string(),
        })
    }
}

fn txn_err(e: heed::Error) -> LmdbCacheError {
    LmdbCacheError::Transaction(e.to_string())
}

/// Persistent cache store on LMDB.
pub struct LmdbCacheStore {
    env: Env,
    db: Database<Bytes, Bytes>,
    clock: SharedClock,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl std::fmt::Debug for LmdbCacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LmdbCacheStore")
            .field("path", &self.env.path())
            .finish()
    }
}

impl LmdbCacheStore {
    /// Open (or create) a store.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory where LMDB files will be stored
    /// * `max_size_mb` - Maximum size of the database in megabytes
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_size_mb` does not fit in a byte count
    /// - The directory cannot be created
    /// - LMDB environment cannot be opened
    /// - Database cannot be created
    pub fn open<P: AsRef<Path>>(
        path: P,
        max_size_mb: usize,
        clock: SharedClock,
    ) -> Result<Self, LmdbCacheError> {
        let map_size = max_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                LmdbCacheError::EnvOpen(format!("map size of {max_size_mb} MB overflows usize"))
            })?;

        std::fs::create_dir_all(&path)?;

        // SAFETY: the environment is opened once per path by this process
        // and the files are not modified by anything outside LMDB.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path.as_ref())
        }
        .map_err(|e| LmdbCacheError::EnvOpen(e.to_string()))?;

        let mut wtxn = env.write_txn().map_err(txn_err)?;
        let db: Database<Bytes, Bytes> = env
            .create_database(&mut wtxn, None)
            .map_err(|e| LmdbCacheError::DbOpen(e.to_string()))?;
        wtxn.commit().map_err(txn_err)?;

        Ok(Self {
            env,
            db,
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        })
    }

    fn encode(entry: &CacheEntry) -> Result<Vec<u8>, CacheError> {
        let body = serde_json::to_vec(&entry.payload).map_err(|e| CacheError::Serialization {
            key: entry.key.clone(),
            reason: e.to_string(),
        })?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&entry.created_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&entry.expires_at.timestamp_millis().to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(bytes)
    }

    fn decode(key: &str, bytes: &[u8]) -> Result<CacheEntry, LmdbCacheError> {
        if bytes.len() < HEADER_LEN {
            return Err(LmdbCacheError::Corrupt(format!(
                "{}: {} bytes is shorter than the header",
                key,
                bytes.len()
            )));
        }
        let created_at = read_millis(&bytes[0..8])
            .ok_or_else(|| LmdbCacheError::Corrupt(format!("{}: bad created_at", key)))?;
        let expires_at = read_millis(&bytes[8..16])
            .ok_or_else(|| LmdbCacheError::Corrupt(format!("{}: bad expires_at", key)))?;
        let payload: CachedPayload = serde_json::from_slice(&bytes[HEADER_LEN..])
            .map_err(|e| LmdbCacheError::Corrupt(format!("{}: {}", key, e)))?;
        Ok(CacheEntry {
            key: key.to_string(),
            payload,
            created_at,
            expires_at,
        })
    }

    fn read_entry(&self, storage_key: &str) -> Result<Option<CacheEntry>, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let found = self.db.get(&rtxn, storage_key.as_bytes()).map_err(txn_err)?;
        let entry = found
            .map(|bytes| Self::decode(storage_key, bytes))
            .transpose()?;
        Ok(entry)
    }

    fn write_bytes(&self, storage_key: &str, bytes: &[u8]) -> Result<(), LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        self.db
            .put(&mut wtxn, storage_key.as_bytes(), bytes)
            .map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)
    }

    fn delete_key(&self, storage_key: &[u8]) -> Result<bool, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let deleted = self.db.delete(&mut wtxn, storage_key).map_err(txn_err)?;
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    /// Iterate over keys matching a prefix and collect them.
    fn collect_keys_with_prefix(&self, prefix: &[u8]) -> Result<Vec<Vec<u8>>, LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;

        let mut keys = Vec::new();
        for result in self.db.iter(&rtxn).map_err(txn_err)? {
            match result {
                Ok((key, _)) => {
                    if key.starts_with(prefix) {
                        keys.push(key.to_vec());
                    }
                }
                Err(_) => continue,
            }
        }

        Ok(keys)
    }

    fn delete_keys(&self, keys: &[Vec<u8>]) -> Result<u64, LmdbCacheError> {
        let mut wtxn = self.env.write_txn().map_err(txn_err)?;
        let mut deleted = 0u64;
        for key in keys {
            if self.db.delete(&mut wtxn, key).unwrap_or(false) {
                deleted += 1;
            }
        }
        wtxn.commit().map_err(txn_err)?;
        Ok(deleted)
    }

    fn usage(&self) -> Result<(u64, u64), LmdbCacheError> {
        let rtxn = self.env.read_txn().map_err(txn_err)?;
        let mut entries = 0u64;
        let mut bytes = 0u64;
        for (key, value) in self.db.iter(&rtxn).map_err(txn_err)?.flatten() {
            entries += 1;
            bytes += (key.len() + value.len()) as u64;
        }
        Ok((entries, bytes))
    }

    /// Drop an entry found expired or unreadable, counting it as an eviction.
    fn evict(&self, storage_key: &str) {
        match self.delete_key(storage_key.as_bytes()) {
            Ok(true) => {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(key = storage_key, error = %e, "failed to evict cache entry"),
        }
    }
}

fn read_millis(bytes: &[u8]) -> Option<Timestamp> {
    let raw: [u8; 8] = bytes.try_into().ok()?;
    DateTime::from_timestamp_millis(i64::from_le_bytes(raw))
}

#[async_trait]
impl CacheStore for LmdbCacheStore {
    async fn get(&self, key: &CacheKey) -> OrgCacheResult<Option<CacheEntry>> {
        let storage_key = key.storage_key();
        let now = self.clock.now();

        let entry = match self.read_entry(&storage_key) {
            Ok(entry) => entry,
            Err(LmdbCacheError::Corrupt(reason)) => {
                tracing::warn!(key = %storage_key, reason = %reason, "dropping unreadable cache entry");
                self.evict(&storage_key);
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        match entry {
            Some(mut entry) if !entry.is_expired(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entry.key = key.as_str().to_string();
                Ok(Some(entry))
            }
            Some(_) => {
                self.evict(&storage_key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn set(
        &self,
        key: &CacheKey,
        payload: CachedPayload,
        ttl: Duration,
    ) -> OrgCacheResult<()> {
        let entry = CacheEntry::new(key.as_str(), payload, self.clock.now(), ttl)?;
        let bytes = Self::encode(&entry)?;
        self.write_bytes(&key.storage_key(), &bytes)?;
        Ok(())
    }

    async fn delete(&self, key: &CacheKey) -> OrgCacheResult<bool> {
        Ok(self.delete_key(key.storage_key().as_bytes())?)
    }

    async fn remaining_ttl(&self, key: &CacheKey) -> OrgCacheResult<TtlProbe> {
        let now = self.clock.now();
        Ok(match self.read_entry(&key.storage_key()) {
            Ok(Some(entry)) if !entry.is_expired(now) => TtlProbe::Remaining(entry.remaining(now)),
            Ok(_) => TtlProbe::Absent,
            Err(LmdbCacheError::Corrupt(_)) => TtlProbe::Unknown,
            Err(e) => return Err(e.into()),
        })
    }

    async fn purge_prefix(&self, prefix: &str) -> OrgCacheResult<u64> {
        let keys = self.collect_keys_with_prefix(prefix.as_bytes())?;
        if keys.is_empty() {
            return Ok(0);
        }
        let deleted = self.delete_keys(&keys)?;
        tracing::info!(prefix, deleted, "purged cache entries");
        Ok(deleted)
    }

    async fn stats(&self) -> OrgCacheResult<CacheStats> {
        let (entry_count, memory_bytes) = self.usage()?;
        Ok(CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count,
            memory_bytes,
            evictions: self.evictions.load(Ordering::Relaxed),
        })
    }
}
