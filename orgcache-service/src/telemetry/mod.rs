//! orgcache telemetry - structured logging and Prometheus metrics
//!
//! Both work standalone: logs go to stdout as JSON, metrics live in a
//! registry owned by each service instance and are rendered on demand.

pub mod metrics;
pub mod tracer;

pub use metrics::OrgCacheMetrics;
pub use tracer::{init_tracing, TelemetryConfig};

use thiserror::Error;

/// Telemetry setup errors. Never raised on the lookup path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("Failed to register metric {metric}: {reason}")]
    Registration { metric: String, reason: String },

    #[error("Failed to encode metrics: {reason}")]
    Encoding { reason: String },

    #[error("Failed to init subscriber: {reason}")]
    Subscriber { reason: String },
}
