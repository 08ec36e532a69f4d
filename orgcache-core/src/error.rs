//! Error types for orgcache operations

use thiserror::Error;

/// Directory (upstream) errors. Never cached.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Directory unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Directory query timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Invalid search filter: {reason}")]
    InvalidFilter { reason: String },
}

/// Cache store errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("Cache backend failure: {reason}")]
    Backend { reason: String },

    #[error("Serialization failed for {key}: {reason}")]
    Serialization { key: String, reason: String },

    #[error("Refusing to cache {key} with a zero TTL")]
    InvalidTtl { key: String },

    #[error("Cache lock poisoned")]
    LockPoisoned,
}

/// Request coalescing errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoalesceError {
    #[error("Too many simultaneous requests: {in_flight} keys in flight (limit {limit})")]
    Overloaded { in_flight: usize, limit: usize },
}

/// Input validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Query too short: need at least {min} characters, got {got}")]
    QueryTooShort { min: usize, got: usize },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all orgcache errors.
#[derive(Debug, Clone, Error)]
pub enum OrgCacheError {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Coalesce error: {0}")]
    Coalesce(#[from] CoalesceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl OrgCacheError {
    /// Whether a caller may retry the same request later.
    ///
    /// Upstream outages and overload are transient. Malformed input and
    /// configuration mistakes are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OrgCacheError::Directory(DirectoryError::Unavailable { .. })
                | OrgCacheError::Directory(DirectoryError::Timeout { .. })
                | OrgCacheError::Coalesce(_)
        )
    }

    /// Short label used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            OrgCacheError::Directory(_) => "upstream_unavailable",
            OrgCacheError::Cache(_) => "cache",
            OrgCacheError::Coalesce(_) => "overloaded",
            OrgCacheError::Validation(_) => "malformed_input",
            OrgCacheError::Config(_) => "config",
        }
    }
}

/// Result type alias for orgcache operations.
pub type OrgCacheResult<T> = Result<T, OrgCacheError>;

// =============================================================================
// TESTS
// =============================================================================
