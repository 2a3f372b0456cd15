//! Time source abstraction.
//!
//! Every time comparison in Sluice (tick bucketing, window expiry, cooldown,
//! grace period, settlement delay) reads the current time from a [`Clock`],
//! so tests can drive time explicitly with a [`ManualClock`].

use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::Timestamp;

/// Port for the current time, in seconds since the UNIX epoch.
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock.
    fn now(&self) -> Timestamp;

    /// Clock name for logs.
    fn name(&self) -> &str {
        "clock"
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Settable clock for deterministic tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`, returning the new time.
    pub fn advance(&self, secs: u64) -> Timestamp {
        self.now.fetch_add(secs, Ordering::SeqCst) + secs
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "manual"
    }
}
