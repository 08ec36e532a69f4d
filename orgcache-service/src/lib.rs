//! orgcache service - cached directory operations
//!
//! [`DirectoryService`] composes the directory seam, the coordinated
//! read-through cache and the hierarchy resolver into the named operations
//! callers use: person and department detail, the organisation tree,
//! department list, summary and search. Every one of them goes through a
//! single coordinated lookup, so identical concurrent requests reach the
//! directory once.

mod queries;
mod responses;
mod service;
pub mod telemetry;

pub use queries::{normalize_department, normalize_mail, ops, search_terms};
pub use responses::{DepartmentDetail, OrgTree, PersonDetail, SearchResults, ServiceResponse};
pub use service::DirectoryService;
pub use telemetry::{init_tracing, OrgCacheMetrics, TelemetryConfig, TelemetryError};

use orgcache_core::OrgCacheError;
use thiserror::Error;

/// Errors raised while building a service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error(transparent)]
    OrgCache(#[from] OrgCacheError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}
