//! Configuration types

use crate::{ConfigError, OrgCacheError, OrgCacheResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Master configuration for the directory cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgCacheConfig {
    // TTLs
    /// TTL for successful person lookups.
    pub person_ttl: Duration,
    /// TTL for successful organisation-wide lookups (trees, lists, summaries).
    pub directory_ttl: Duration,
    /// TTL for negative "not found" entries. Kept short to ride out replication lag.
    pub not_found_ttl: Duration,
    /// TTL for negative "account disabled" entries.
    pub disabled_ttl: Duration,

    // Coalescing
    /// How long a coalescing lock lives before peers treat it as stale.
    pub lock_timeout: Duration,
    /// How long a peer waits for an in-flight computation before computing itself.
    pub max_wait: Duration,
    /// Upper bound on wait/acquire rounds for one lookup.
    pub max_await_rounds: u32,
    /// Distinct keys allowed in flight at once before lookups fail with overload.
    pub max_in_flight: usize,

    // Directory
    /// Deadline for a single upstream query.
    pub query_timeout: Duration,
    /// Restrict every query to this company attribute.
    pub company: Option<String>,
    /// Minimum search query length.
    pub search_min_chars: usize,
    /// Maximum number of search results.
    pub search_size_limit: usize,

    // Cache backend
    /// LMDB directory. `None` selects the in-memory store.
    pub cache_path: Option<PathBuf>,
    /// LMDB map size in megabytes.
    pub cache_max_size_mb: usize,
    /// Entry cap for the in-memory store.
    pub cache_max_entries: usize,
}

impl Default for OrgCacheConfig {
    fn default() -> Self {
        Self {
            person_ttl: Duration::from_secs(3600),
            directory_ttl: Duration::from_secs(86400),
            not_found_ttl: Duration::from_secs(300),
            disabled_ttl: Duration::from_secs(3600),
            lock_timeout: Duration::from_secs(10),
            max_wait: Duration::from_millis(2000),
            max_await_rounds: 3,
            max_in_flight: 1024,
            query_timeout: Duration::from_secs(30),
            company: None,
            search_min_chars: 2,
            search_size_limit: 50,
            cache_path: None,
            cache_max_size_mb: 64,
            cache_max_entries: 10_000,
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_secs(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl OrgCacheConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `ORGCACHE_PERSON_TTL_SECS` (default: 3600)
    /// - `ORGCACHE_DIRECTORY_TTL_SECS` (default: 86400)
    /// - `ORGCACHE_NOT_FOUND_TTL_SECS` (default: 300)
    /// - `ORGCACHE_DISABLED_TTL_SECS` (default: 3600)
    /// - `ORGCACHE_LOCK_TIMEOUT_SECS` (default: 10)
    /// - `ORGCACHE_MAX_WAIT_MS` (default: 2000)
    /// - `ORGCACHE_MAX_AWAIT_ROUNDS` (default: 3)
    /// - `ORGCACHE_MAX_IN_FLIGHT` (default: 1024)
    /// - `ORGCACHE_QUERY_TIMEOUT_SECS` (default: 30)
    /// - `ORGCACHE_COMPANY` (default: unset)
    /// - `ORGCACHE_SEARCH_MIN_CHARS` (default: 2)
    /// - `ORGCACHE_SEARCH_SIZE_LIMIT` (default: 50)
    /// - `ORGCACHE_CACHE_PATH` (default: unset, in-memory store)
    /// - `ORGCACHE_CACHE_MAX_SIZE_MB` (default: 64)
    /// - `ORGCACHE_CACHE_MAX_ENTRIES` (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            person_ttl: env_secs("ORGCACHE_PERSON_TTL_SECS").unwrap_or(defaults.person_ttl),
            directory_ttl: env_secs("ORGCACHE_DIRECTORY_TTL_SECS")
                .unwrap_or(defaults.directory_ttl),
            not_found_ttl: env_secs("ORGCACHE_NOT_FOUND_TTL_SECS")
                .unwrap_or(defaults.not_found_ttl),
            disabled_ttl: env_secs("ORGCACHE_DISABLED_TTL_SECS").unwrap_or(defaults.disabled_ttl),
            lock_timeout: env_secs("ORGCACHE_LOCK_TIMEOUT_SECS").unwrap_or(defaults.lock_timeout),
            max_wait: env_parse::<u64>("ORGCACHE_MAX_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.max_wait),
            max_await_rounds: env_parse("ORGCACHE_MAX_AWAIT_ROUNDS")
                .unwrap_or(defaults.max_await_rounds),
            max_in_flight: env_parse("ORGCACHE_MAX_IN_FLIGHT").unwrap_or(defaults.max_in_flight),
            query_timeout: env_secs("ORGCACHE_QUERY_TIMEOUT_SECS")
                .unwrap_or(defaults.query_timeout),
            company: env_string("ORGCACHE_COMPANY").or(defaults.company),
            search_min_chars: env_parse("ORGCACHE_SEARCH_MIN_CHARS")
                .unwrap_or(defaults.search_min_chars),
            search_size_limit: env_parse("ORGCACHE_SEARCH_SIZE_LIMIT")
                .unwrap_or(defaults.search_size_limit),
            cache_path: env_string("ORGCACHE_CACHE_PATH")
                .map(PathBuf::from)
                .or(defaults.cache_path),
            cache_max_size_mb: env_parse("ORGCACHE_CACHE_MAX_SIZE_MB")
                .unwrap_or(defaults.cache_max_size_mb),
            cache_max_entries: env_parse("ORGCACHE_CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries),
        }
    }

    /// Validate the configuration.
    /// Returns Ok(()) if valid, Err(OrgCacheError::Config) if invalid.
    ///
    /// Validates:
    /// - All durations are positive
    /// - not_found_ttl < disabled_ttl
    /// - max_in_flight, max_await_rounds and search limits are non-zero
    pub fn validate(&self) -> OrgCacheResult<()> {
        let durations = [
            ("person_ttl", self.person_ttl),
            ("directory_ttl", self.directory_ttl),
            ("not_found_ttl", self.not_found_ttl),
            ("disabled_ttl", self.disabled_ttl),
            ("lock_timeout", self.lock_timeout),
            ("max_wait", self.max_wait),
            ("query_timeout", self.query_timeout),
        ];
        for (field, value) in durations {
            if value.is_zero() {
                return Err(invalid(field, format!("{:?}", value), "must be positive"));
            }
        }

        if self.not_found_ttl >= self.disabled_ttl {
            return Err(invalid(
                "not_found_ttl",
                format!("{:?}", self.not_found_ttl),
                "not_found_ttl must be shorter than disabled_ttl",
            ));
        }

        if self.max_in_flight == 0 {
            return Err(invalid("max_in_flight", "0", "max_in_flight must be greater than 0"));
        }

        if self.max_await_rounds == 0 {
            return Err(invalid(
                "max_await_rounds",
                "0",
                "max_await_rounds must be greater than 0",
            ));
        }

        if self.search_min_chars == 0 {
            return Err(invalid(
                "search_min_chars",
                "0",
                "search_min_chars must be greater than 0",
            ));
        }

        if self.search_size_limit == 0 {
            return Err(invalid(
                "search_size_limit",
                "0",
                "search_size_limit must be greater than 0",
            ));
        }

        if self.cache_path.is_some() && self.cache_max_size_mb == 0 {
            return Err(invalid(
                "cache_max_size_mb",
                "0",
                "cache_max_size_mb must be greater than 0 when cache_path is set",
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl Into<String>, reason: &str) -> OrgCacheError {
    OrgCacheError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.into(),
        reason: reason.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
