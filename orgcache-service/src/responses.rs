//! Payloads returned by [`DirectoryService`](crate::DirectoryService).

use std::time::Duration;

use orgcache_core::{PersonRecord, PersonSummary};
use orgcache_hierarchy::{ElectedHead, Forest, MemberStats};
use orgcache_storage::{CacheStatus, LookupResponse, Outcome, Resolution};
use serde::{Deserialize, Serialize};

/// A person together with the people who report to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonDetail {
    pub person: PersonRecord,
    pub supervisees: Vec<PersonSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentDetail {
    pub name: String,
    pub head: Option<ElectedHead>,
    pub members: Vec<PersonRecord>,
    pub stats: MemberStats,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub people: Vec<PersonSummary>,
    /// The directory returned more matches than were kept.
    pub truncated: bool,
}

impl SearchResults {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            people: Vec::new(),
            truncated: false,
        }
    }
}

pub type OrgTree = Forest;

/// Result of one service operation, with cache metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceResponse<T> {
    pub operation: String,
    /// Canonical cache key, absent for answers that never touched the cache.
    pub cache_key: Option<String>,
    pub cache_status: CacheStatus,
    pub resolution: Resolution<T>,
    pub ttl: Option<Duration>,
}

impl<T> ServiceResponse<T> {
    pub(crate) fn from_lookup(operation: &str, response: LookupResponse<T>) -> Self {
        Self {
            operation: operation.to_string(),
            cache_key: Some(response.key.as_str().to_string()),
            cache_status: response.status,
            resolution: response.resolution,
            ttl: Some(response.ttl),
        }
    }

    /// An answer computed without the cache.
    pub(crate) fn uncached(operation: &str, value: T) -> Self {
        Self {
            operation: operation.to_string(),
            cache_key: None,
            cache_status: CacheStatus::Miss,
            resolution: Resolution::Found(value),
            ttl: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.resolution.outcome()
    }

    pub fn is_hit(&self) -> bool {
        self.cache_status == CacheStatus::Hit
    }

    pub fn value(&self) -> Option<&T> {
        self.resolution.found()
    }

    pub fn into_value(self) -> Option<T> {
        self.resolution.into_found()
    }
}
