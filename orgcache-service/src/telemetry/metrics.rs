//! Prometheus metrics definitions.
//!
//! Each [`OrgCacheMetrics`] owns its own [`Registry`], so several services
//! (and tests) can live in one process without name clashes.

use prometheus::{
    core::Collector, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use super::TelemetryError;

/// Lookup latency buckets (seconds)
/// Covers: 0.5ms, 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s
const LOOKUP_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.0, 2.5, 5.0, 10.0, 30.0,
];

/// Container for all orgcache metrics.
#[derive(Clone)]
pub struct OrgCacheMetrics {
    registry: Registry,

    /// Lookup counter - labels: operation, cache_status, outcome
    pub lookups_total: CounterVec,

    /// Lookup error counter - labels: operation, kind
    pub lookup_errors_total: CounterVec,

    /// Directory query counter - labels: operation
    pub directory_queries_total: CounterVec,

    /// Lookup duration histogram - labels: operation, cache_status
    pub lookup_duration_seconds: HistogramVec,

    /// Keys currently being computed
    pub in_flight_keys: Gauge,
}

impl std::fmt::Debug for OrgCacheMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgCacheMetrics").finish_non_exhaustive()
    }
}

fn register<C: Collector + Clone + 'static>(
    registry: &Registry,
    name: &str,
    collector: Result<C, prometheus::Error>,
) -> Result<C, TelemetryError> {
    let failed = |e: prometheus::Error| TelemetryError::Registration {
        metric: name.to_string(),
        reason: e.to_string(),
    };
    let collector = collector.map_err(failed)?;
    registry.register(Box::new(collector.clone())).map_err(failed)?;
    Ok(collector)
}

impl OrgCacheMetrics {
    /// Create and register all metrics in a fresh registry.
    pub fn new() -> Result<Self, TelemetryError> {
        let registry = Registry::new();

        Ok(Self {
            lookups_total: register(
                &registry,
                "orgcache_lookups_total",
                CounterVec::new(
                    Opts::new("orgcache_lookups_total", "Total number of coordinated lookups"),
                    &["operation", "cache_status", "outcome"],
                ),
            )?,

            lookup_errors_total: register(
                &registry,
                "orgcache_lookup_errors_total",
                CounterVec::new(
                    Opts::new("orgcache_lookup_errors_total", "Lookups that returned an error"),
                    &["operation", "kind"],
                ),
            )?,

            directory_queries_total: register(
                &registry,
                "orgcache_directory_queries_total",
                CounterVec::new(
                    Opts::new(
                        "orgcache_directory_queries_total",
                        "Searches issued to the upstream directory",
                    ),
                    &["operation"],
                ),
            )?,

            lookup_duration_seconds: register(
                &registry,
                "orgcache_lookup_duration_seconds",
                HistogramVec::new(
                    HistogramOpts::new(
                        "orgcache_lookup_duration_seconds",
                        "Coordinated lookup duration in seconds",
                    )
                    .buckets(LOOKUP_LATENCY_BUCKETS.to_vec()),
                    &["operation", "cache_status"],
                ),
            )?,

            in_flight_keys: register(
                &registry,
                "orgcache_in_flight_keys",
                Gauge::new("orgcache_in_flight_keys", "Keys currently locked for computation"),
            )?,

            registry,
        })
    }

    /// Record a finished lookup.
    pub fn record_lookup(
        &self,
        operation: &str,
        cache_status: &str,
        outcome: &str,
        duration_secs: f64,
    ) {
        self.lookups_total
            .with_label_values(&[operation, cache_status, outcome])
            .inc();
        self.lookup_duration_seconds
            .with_label_values(&[operation, cache_status])
            .observe(duration_secs);
    }

    /// Record a lookup that failed.
    pub fn record_error(&self, operation: &str, kind: &str) {
        self.lookup_errors_total
            .with_label_values(&[operation, kind])
            .inc();
        self.lookups_total
            .with_label_values(&[operation, "MISS", "ERROR"])
            .inc();
    }

    /// Record one upstream directory search.
    pub fn record_directory_query(&self, operation: &str) {
        self.directory_queries_total
            .with_label_values(&[operation])
            .inc();
    }

    pub fn set_in_flight(&self, count: usize) {
        self.in_flight_keys.set(count as f64);
    }

    /// Render every metric in Prometheus text format.
    pub fn encode_text(&self) -> Result<String, TelemetryError> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(|e| TelemetryError::Encoding {
                reason: e.to_string(),
            })?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Encoding {
            reason: e.to_string(),
        })
    }
}
