//! Health reporting for the directory and cache dependencies.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Health status for a dependency or for the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

/// Result of probing one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub status: HealthStatus,
    /// Component name ("directory", "cache").
    pub component: String,
    pub message: Option<String>,
    pub response_time_ms: Option<i64>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl HealthCheck {
    fn with_status(status: HealthStatus, component: impl Into<String>) -> Self {
        Self {
            status,
            component: component.into(),
            message: None,
            response_time_ms: None,
            metadata: None,
        }
    }

    pub fn healthy(component: impl Into<String>) -> Self {
        Self::with_status(HealthStatus::Healthy, component)
    }

    pub fn degraded(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(HealthStatus::Degraded, component)
        }
    }

    pub fn unhealthy(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::with_status(HealthStatus::Unhealthy, component)
        }
    }

    pub fn with_response_time(mut self, ms: i64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

/// Aggregated health of the service.
///
/// The overall status is the worst status among the component checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub checked_at: Timestamp,
    pub version: String,
}

impl HealthReport {
    pub fn from_checks(checks: Vec<HealthCheck>, checked_at: Timestamp) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max_by_key(|s| s.severity())
            .unwrap_or(HealthStatus::Healthy);
        Self {
            status,
            checks,
            checked_at,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    pub fn check(&self, component: &str) -> Option<&HealthCheck> {
        self.checks.iter().find(|c| c.component == component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_report_takes_worst_status() {
        let report = HealthReport::from_checks(
            vec![
                HealthCheck::healthy("cache"),
                HealthCheck::unhealthy("directory", "connection refused"),
            ],
            Utc::now(),
        );
        assert_eq!(report.status, HealthStatus::Unhealthy);
        assert!(!report.is_healthy());
        assert_eq!(
            report.check("directory").and_then(|c| c.message.as_deref()),
            Some("connection refused")
        );
    }

    #[test]
    fn test_empty_report_is_healthy() {
        let report = HealthReport::from_checks(vec![], Utc::now());
        assert!(report.is_healthy());
    }

    #[test]
    fn test_metadata_builder() {
        let check = HealthCheck::degraded("cache", "slow")
            .with_response_time(120)
            .with_metadata("entries", serde_json::json!(42));
        assert_eq!(check.response_time_ms, Some(120));
        assert_eq!(
            check.metadata.as_ref().and_then(|m| m.get("entries")),
            Some(&serde_json::json!(42))
        );
    }
}
