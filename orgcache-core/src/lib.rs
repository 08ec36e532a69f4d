//! orgcache core - shared types
//!
//! Person records, the error taxonomy, configuration, the clock seam and
//! health types. Every other orgcache crate depends on this one; it holds no
//! caching or hierarchy logic.

mod clock;
mod config;
mod error;
mod health;
mod person;

pub use clock::{add_duration, elapsed_between, system_clock, Clock, ManualClock, SharedClock, SystemClock};
pub use config::OrgCacheConfig;
pub use error::{
    CacheError, CoalesceError, ConfigError, DirectoryError, OrgCacheError, OrgCacheResult,
    ValidationError,
};
pub use health::{HealthCheck, HealthReport, HealthStatus};
pub use person::{PersonRecord, PersonSummary};

use chrono::{DateTime, Utc};

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

// ============================================================================
// PROPERTY TESTS
// ============================================================================
