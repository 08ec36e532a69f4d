//! Injectable wall clock.
//!
//! Cache expiry and stale-lock reclamation compare wall-clock timestamps.
//! Production code uses [`SystemClock`]; tests drive a [`ManualClock`] so
//! TTL behaviour can be exercised without sleeping.

use crate::Timestamp;
use chrono::Utc;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Source of the current time.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> Timestamp;
}

/// Shared handle to a clock.
pub type SharedClock = Arc<dyn Clock>;

/// The real UTC clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// Convenience constructor for the default shared clock.
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Start at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += delta;
    }

    /// Jump to an absolute time.
    pub fn set(&self, to: Timestamp) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Elapsed time between two timestamps, zero if `later` is not after `earlier`.
pub fn elapsed_between(earlier: Timestamp, later: Timestamp) -> Duration {
    later
        .signed_duration_since(earlier)
        .to_std()
        .unwrap_or(Duration::ZERO)
}

/// `start + by`, saturating at the maximum representable timestamp.
pub fn add_duration(start: Timestamp, by: Duration) -> Timestamp {
    chrono::Duration::from_std(by)
        .ok()
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(chrono::DateTime::<Utc>::MAX_UTC)
}
