//! Counters and snapshots for the cache and the eviction monitor.
//!
//! Counters are relaxed atomics updated on the hot path; snapshots are plain
//! `Copy` structs suitable for logging or exporting.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheMetricsSnapshot {
    pub get_hits: u64,
    pub get_misses: u64,
    pub inserts: u64,
    pub replacements: u64,
    pub removes: u64,
    pub remove_misses: u64,
    pub purges: u64,

    // gauges captured at snapshot time
    pub entries: usize,
    pub total_size: u64,
}

impl CacheMetricsSnapshot {
    /// Fraction of `get` calls that found their key, `0.0` before any call.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.get_hits + self.get_misses;
        if total == 0 {
            0.0
        } else {
            self.get_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    inserts: AtomicU64,
    replacements: AtomicU64,
    removes: AtomicU64,
    remove_misses: AtomicU64,
    purges: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn snapshot(&self, entries: usize, total_size: u64) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            get_hits: self.get_hits.load(Ordering::Relaxed),
            get_misses: self.get_misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            replacements: self.replacements.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
            remove_misses: self.remove_misses.load(Ordering::Relaxed),
            purges: self.purges.load(Ordering::Relaxed),
            entries,
            total_size,
        }
    }

    pub(crate) fn inc_hit(&self) {
        self.get_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_miss(&self) {
        self.get_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_replacement(&self) {
        self.replacements.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_remove_miss(&self) {
        self.remove_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_purge(&self) {
        self.purges.fetch_add(1, Ordering::Relaxed);
    }
}

/// Outcome of one monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Cache size read at the start of the tick.
    pub total_size: u64,
    /// `high_water_bytes - total_size`; negative once the mark is crossed.
    pub headroom_bytes: i128,
    /// Whether an eviction pass ran.
    pub evicted: bool,
    pub evicted_entries: usize,
    pub evicted_bytes: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub eviction_passes: u64,
    pub evicted_entries: u64,
    pub evicted_bytes: u64,
    pub failed_ticks: u64,
}

#[derive(Debug, Default)]
pub(crate) struct MonitorCounters {
    ticks: AtomicU64,
    eviction_passes: AtomicU64,
    evicted_entries: AtomicU64,
    evicted_bytes: AtomicU64,
    failed_ticks: AtomicU64,
}

impl MonitorCounters {
    pub(crate) fn snapshot(&self) -> MonitorStats {
        MonitorStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            eviction_passes: self.eviction_passes.load(Ordering::Relaxed),
            evicted_entries: self.evicted_entries.load(Ordering::Relaxed),
            evicted_bytes: self.evicted_bytes.load(Ordering::Relaxed),
            failed_ticks: self.failed_ticks.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_tick(&self, report: &TickReport) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        if report.evicted {
            self.eviction_passes.fetch_add(1, Ordering::Relaxed);
            self.evicted_entries
                .fetch_add(report.evicted_entries as u64, Ordering::Relaxed);
            self.evicted_bytes
                .fetch_add(report.evicted_bytes, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_failure(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.failed_ticks.fetch_add(1, Ordering::Relaxed);
    }
}
