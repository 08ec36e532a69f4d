//! In-memory directory.
//!
//! Evaluates [`SearchFilter`]s against a fixed set of entries. Used by tests
//! and local development; it can be switched offline to simulate an outage.

use crate::client::DirectoryClient;
use crate::filter::SearchFilter;
use crate::raw::RawEntry;
use async_trait::async_trait;
use orgcache_core::{DirectoryError, OrgCacheResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<Vec<RawEntry>>,
    offline: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new(entries: Vec<RawEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            offline: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, entry: RawEntry) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    /// Replace every entry.
    pub fn replace_all(&self, entries: Vec<RawEntry>) {
        *self.entries.write().unwrap_or_else(|e| e.into_inner()) = entries;
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn search(
        &self,
        filter: &SearchFilter,
        attributes: &[&str],
    ) -> OrgCacheResult<Vec<RawEntry>> {
        if self.is_offline() {
            return Err(DirectoryError::Unavailable {
                reason: "directory offline".to_string(),
            }
            .into());
        }
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries
            .iter()
            .filter(|entry| filter.matches(entry))
            .map(|entry| entry.project(attributes))
            .collect())
    }

    async fn ping(&self) -> OrgCacheResult<()> {
        if self.is_offline() {
            return Err(DirectoryError::Unavailable {
                reason: "directory offline".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
