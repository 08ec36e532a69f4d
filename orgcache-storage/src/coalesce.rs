//! Request coalescing.
//!
//! At most one caller computes a given key at a time. The others wait for
//! the holder to release and then read what it cached.
//!
//! Every lock lives in an injected [`RequestCoalescer`] table, never in
//! process-global state. Each slot carries a `watch` channel whose sender is
//! dropped when the slot is released or reclaimed, so waiters are woken by
//! notification instead of polling. A lock older than its timeout is stale:
//! it counts as released and the next `try_begin` may take it over.
//!
//! The table mutex is held only for O(1) map operations and never across an
//! `.await`. A poisoned mutex is recovered since the map cannot be left
//! half-updated by a panic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use orgcache_core::{elapsed_between, CoalesceError, SharedClock, Timestamp};
use tokio::sync::watch;

#[derive(Debug)]
struct LockSlot {
    acquired_at: Timestamp,
    timeout: Duration,
    generation: u64,
    /// Dropped on release; receivers then observe the channel closing.
    release: watch::Sender<()>,
}

impl LockSlot {
    fn is_stale(&self, now: Timestamp) -> bool {
        elapsed_between(self.acquired_at, now) >= self.timeout
    }

    fn time_until_stale(&self, now: Timestamp) -> Duration {
        self.timeout
            .saturating_sub(elapsed_between(self.acquired_at, now))
    }
}

/// Read-only view of a held lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescingLock {
    pub key: String,
    pub acquired_at: Timestamp,
    pub timeout: Duration,
}

/// Table of in-flight computations keyed by cache key.
#[derive(Debug)]
pub struct RequestCoalescer {
    slots: Mutex<HashMap<String, LockSlot>>,
    clock: SharedClock,
    max_in_flight: Option<usize>,
    next_generation: AtomicU64,
}

impl RequestCoalescer {
    /// Create an unbounded coalescer.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            clock,
            max_in_flight: None,
            next_generation: AtomicU64::new(1),
        }
    }

    /// Cap the number of keys that may be in flight at once.
    pub fn with_max_in_flight(mut self, limit: usize) -> Self {
        self.max_in_flight = Some(limit.max(1));
        self
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    fn table(&self) -> MutexGuard<'_, HashMap<String, LockSlot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Take the lock if it is free or stale. Returns the new generation.
    fn begin(&self, key: &str, lock_timeout: Duration) -> Result<Option<u64>, CoalesceError> {
        let now = self.clock.now();
        let mut slots = self.table();

        match slots.get(key) {
            Some(slot) if !slot.is_stale(now) => return Ok(None),
            Some(slot) => {
                tracing::warn!(
                    key,
                    held_for_ms = elapsed_between(slot.acquired_at, now).as_millis() as u64,
                    "reclaiming stale coalescing lock"
                );
                slots.remove(key);
            }
            None => {
                if let Some(limit) = self.max_in_flight {
                    if slots.len() >= limit {
                        slots.retain(|_, slot| !slot.is_stale(now));
                    }
                    if slots.len() >= limit {
                        return Err(CoalesceError::Overloaded {
                            in_flight: slots.len(),
                            limit,
                        });
                    }
                }
            }
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (release, _) = watch::channel(());
        slots.insert(
            key.to_string(),
            LockSlot {
                acquired_at: now,
                timeout: lock_timeout,
                generation,
                release,
            },
        );
        tracing::debug!(key, generation, "coalescing lock acquired");
        Ok(Some(generation))
    }

    /// Try to become the holder for `key`.
    ///
    /// Returns `false` when a live peer holds the lock or the in-flight cap
    /// is reached. A caller that gets `true` must call [`end`](Self::end).
    pub fn try_begin(&self, key: &str, lock_timeout: Duration) -> bool {
        matches!(self.begin(key, lock_timeout), Ok(Some(_)))
    }

    /// Acquire a scoped lock that is released when the guard drops.
    ///
    /// `Ok(None)` means a live peer holds the lock.
    ///
    /// # Errors
    ///
    /// `CoalesceError::Overloaded` when the in-flight cap is reached.
    pub fn acquire(
        &self,
        key: &str,
        lock_timeout: Duration,
    ) -> Result<Option<CoalescingGuard<'_>>, CoalesceError> {
        Ok(self
            .begin(key, lock_timeout)?
            .map(|generation| CoalescingGuard {
                coalescer: self,
                key: key.to_string(),
                generation,
            }))
    }

    /// Release `key` and wake its waiters.
    pub fn end(&self, key: &str) {
        if self.table().remove(key).is_some() {
            tracing::debug!(key, "coalescing lock released");
        }
    }

    /// Release only if the slot still belongs to `generation`.
    fn end_generation(&self, key: &str, generation: u64) {
        let mut slots = self.table();
        if slots.get(key).map(|s| s.generation) == Some(generation) {
            slots.remove(key);
            tracing::debug!(key, generation, "coalescing lock released");
        }
    }

    /// Whether a live (non-stale) lock exists. Stale locks are reclaimed.
    pub fn is_held(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut slots = self.table();
        match slots.get(key) {
            Some(slot) if slot.is_stale(now) => {
                slots.remove(key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Wait until the current holder of `key` releases, or `max_wait` passes.
    ///
    /// Returns `true` if the lock was released (or went stale, or changed
    /// hands) within `max_wait`, `false` on timeout. Dropping the returned
    /// future has no effect on the holder.
    pub async fn await_release(&self, key: &str, max_wait: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + max_wait;
        let mut watched: Option<u64> = None;

        loop {
            let (mut released, stale_in) = {
                let now = self.clock.now();
                let mut slots = self.table();
                let Some(slot) = slots.get(key) else {
                    return true;
                };
                if slot.is_stale(now) {
                    slots.remove(key);
                    return true;
                }
                match watched {
                    Some(generation) if generation != slot.generation => return true,
                    _ => watched = Some(slot.generation),
                }
                (slot.release.subscribe(), slot.time_until_stale(now))
            };

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return false;
            }
            let wait = (deadline - now).min(stale_in);

            // Err from `changed` means the sender was dropped: released.
            if let Ok(Err(_)) = tokio::time::timeout(wait, released.changed()).await {
                return true;
            }
        }
    }

    /// Number of live locks.
    pub fn in_flight(&self) -> usize {
        let now = self.clock.now();
        self.table().values().filter(|s| !s.is_stale(now)).count()
    }

    pub fn snapshot(&self, key: &str) -> Option<CoalescingLock> {
        self.table().get(key).map(|slot| CoalescingLock {
            key: key.to_string(),
            acquired_at: slot.acquired_at,
            timeout: slot.timeout,
        })
    }
}

/// Scoped ownership of a coalescing lock.
///
/// Dropping the guard releases the lock unless it was reclaimed as stale and
/// handed to someone else in the meantime.
#[must_use = "dropping the guard releases the lock immediately"]
#[derive(Debug)]
pub struct CoalescingGuard<'a> {
    coalescer: &'a RequestCoalescer,
    key: String,
    generation: u64,
}

impl CoalescingGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release now. Equivalent to dropping the guard.
    pub fn release(self) {}
}

impl Drop for CoalescingGuard<'_> {
    fn drop(&mut self) {
        self.coalescer.end_generation(&self.key, self.generation);
    }
}
