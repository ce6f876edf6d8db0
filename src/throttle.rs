//! Gate that limits exchange-rate refreshes to one per interval.

use chrono::Utc;
use std::sync::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Minimum time between two accepted refreshes, in milliseconds.
pub const MIN_UPDATE_INTERVAL_MS: i64 = 60_000;

/// Source of wall-clock time in milliseconds since the epoch.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_millis(&self) -> i64 {
        (**self).now_millis()
    }
}

/// Accepts at most one refresh per [`MIN_UPDATE_INTERVAL_MS`], measured from the
/// previous accepted call.
///
/// The timestamp is stamped by the check itself, so a caller that gets `true`
/// is expected to go on and refresh. `None` means no refresh was accepted yet.
pub struct RefreshGate<C: Clock = SystemClock> {
    clock: C,
    last_update: Mutex<Option<i64>>,
}

impl RefreshGate<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RefreshGate<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RefreshGate<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            last_update: Mutex::new(None),
        }
    }

    fn last(&self) -> MutexGuard<'_, Option<i64>> {
        self.last_update
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn should_update(&self) -> bool {
        let now = self.clock.now_millis();
        let mut last = self.last();

        if let Some(previous) = *last {
            let elapsed = now - previous;
            if elapsed < MIN_UPDATE_INTERVAL_MS {
                debug!(
                    "Skipping exchange rate refresh, next allowed in {}ms",
                    MIN_UPDATE_INTERVAL_MS - elapsed
                );
                return false;
            }
        }
        *last = Some(now);
        true
    }

    /// Milliseconds until the gate accepts again; zero when it would accept now.
    pub fn remaining(&self) -> i64 {
        match *self.last() {
            Some(previous) => {
                (MIN_UPDATE_INTERVAL_MS - (self.clock.now_millis() - previous)).max(0)
            }
            None => 0,
        }
    }

    /// Re-arms the gate so the next check is accepted.
    pub fn reset(&self) {
        *self.last() = None;
        debug!("Exchange rate refresh gate reset");
    }

    pub fn last_update(&self) -> Option<i64> {
        *self.last()
    }
}
