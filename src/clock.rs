//! Timestamp sources for `last_touched`.
//!
//! The cache reads time through the [`Clock`] trait so tests can drive it
//! deterministically with [`ManualClock`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Microsecond timestamp source.
pub trait Clock: Send + Sync {
    /// Current time in microseconds. Successive calls should not go backwards.
    fn now_micros(&self) -> u64;
}

/// Wall-clock anchored, monotonic clock.
///
/// The Unix time is captured once; later readings add the elapsed
/// [`Instant`], so wall-clock adjustments never move timestamps backwards.
pub struct SystemClock {
    anchor: Instant,
    anchor_micros: u64,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            anchor: Instant::now(),
            anchor_micros,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SystemClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemClock")
            .field("anchor_micros", &self.anchor_micros)
            .finish_non_exhaustive()
    }
}

impl Clock for SystemClock {
    fn now_micros(&self) -> u64 {
        self.anchor_micros + self.anchor.elapsed().as_micros() as u64
    }
}

/// Hand-driven clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_micros: u64) -> Self {
        Self {
            now: AtomicU64::new(start_micros),
        }
    }

    pub fn set(&self, micros: u64) {
        self.now.store(micros, Ordering::SeqCst);
    }

    pub fn advance(&self, micros: u64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
