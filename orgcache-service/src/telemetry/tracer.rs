//! Tracing subscriber initialization.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::TelemetryError;

const DEFAULT_FILTER: &str = "orgcache_service=info,orgcache_storage=info,orgcache_hierarchy=warn,info";

/// Telemetry configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,
    /// Service version
    pub service_version: String,
    /// Environment (production, staging, development)
    pub environment: String,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    pub log_filter: String,
    /// Enable metrics collection
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "orgcache".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
            log_filter: DEFAULT_FILTER.to_string(),
            metrics_enabled: true,
        }
    }
}

impl TelemetryConfig {
    /// Read `ORGCACHE_SERVICE_NAME`, `ORGCACHE_SERVICE_VERSION`,
    /// `ORGCACHE_ENVIRONMENT`, `ORGCACHE_LOG_FILTER` and
    /// `ORGCACHE_METRICS_ENABLED`, keeping defaults for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            service_name: std::env::var("ORGCACHE_SERVICE_NAME").unwrap_or(defaults.service_name),
            service_version: std::env::var("ORGCACHE_SERVICE_VERSION")
                .unwrap_or(defaults.service_version),
            environment: std::env::var("ORGCACHE_ENVIRONMENT").unwrap_or(defaults.environment),
            log_filter: std::env::var("ORGCACHE_LOG_FILTER").unwrap_or(defaults.log_filter),
            metrics_enabled: std::env::var("ORGCACHE_METRICS_ENABLED")
                .map(|s| s == "true" || s == "1")
                .unwrap_or(defaults.metrics_enabled),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.log_filter))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Install the global JSON subscriber.
///
/// Call once at startup. A second call fails with
/// [`TelemetryError::Subscriber`] and leaves the first subscriber in place.
pub fn init_tracing(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| TelemetryError::Subscriber {
            reason: e.to_string(),
        })?;

    tracing::info!(
        service_name = %config.service_name,
        service_version = %config.service_version,
        environment = %config.environment,
        metrics_enabled = config.metrics_enabled,
        "Telemetry initialized"
    );
    Ok(())
}
