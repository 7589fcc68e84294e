//! # Memory-Pressure Eviction Monitor
//!
//! Watches an [`LruCache`]'s `total_size` on a fixed interval and, once it
//! reaches the high-water mark, removes the shortest least-recently-used
//! prefix whose sizes bring usage down to the low-water mark.
//!
//! ## Tick
//!
//! ```text
//!   total = cache.total_size()                   (read lock)
//!   total <  high_water ─► log headroom, done
//!   total >= high_water ─► plan = select_candidates(head → tail)  (read lock)
//!                          cache.remove_many(plan.keys)           (write lock)
//! ```
//!
//! The size read and the removal are separate critical sections. Callers may
//! insert in between, so the cache only trends back toward the low-water mark
//! after a tick; it is not a hard bound.
//!
//! ## Candidate selection
//!
//! ```text
//!   high = 100, low = 40  ⇒  must free 60
//!
//!   head ──► [20] ◄──► [25] ◄──► [30] ◄──► [10] ◄── tail
//!             20        45        75 ≥ 60 stop
//!   candidates = first three entries
//! ```
//!
//! The entry that satisfies `high - evicted <= low` is the last one included.
//! If the list runs out first, everything is evicted.
//!
//! ## Lifecycle
//!
//! [`EvictionMonitor::start`] moves the monitor onto a named thread and returns
//! a [`MonitorHandle`]. The thread sleeps by waiting on a stop channel with a
//! timeout, so [`MonitorHandle::stop`] wakes it immediately; the tick in
//! progress finishes first. A panic inside a tick is caught, logged and
//! counted, and the loop carries on with the next tick.

use std::any::Any;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::cache::LruCache;
use crate::config::{MonitorConfig, Thresholds};
use crate::entry::CacheEntry;
use crate::error::MonitorError;
use crate::memory::{MemoryProbe, SystemMemory};
use crate::metrics::{MonitorCounters, MonitorStats, TickReport};

const THREAD_NAME: &str = "memlru-eviction-monitor";
const MIB: i128 = 1024 * 1024;

/// Keys chosen for one eviction pass, least recently used first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionPlan<K> {
    pub keys: Vec<K>,
    /// Sum of the chosen entries' sizes at selection time.
    pub bytes: u64,
}

impl<K> EvictionPlan<K> {
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Picks the minimal head-first prefix of `entries` (LRU to MRU order) whose
/// sizes satisfy `high_water_bytes - Σ size <= low_water_bytes`.
///
/// # Example
///
/// ```
/// use memlru::config::Thresholds;
/// use memlru::monitor::select_candidates;
///
/// let thresholds = Thresholds::new(100, 40).unwrap();
/// let entries = [("a", 20), ("b", 25), ("c", 30), ("d", 10)];
/// let plan = select_candidates(entries.iter().map(|(k, s)| (k, *s)), &thresholds);
/// assert_eq!(plan.keys, vec!["a", "b", "c"]);
/// assert_eq!(plan.bytes, 75);
/// ```
pub fn select_candidates<'a, K, I>(entries: I, thresholds: &Thresholds) -> EvictionPlan<K>
where
    K: Clone + 'a,
    I: IntoIterator<Item = (&'a K, u64)>,
{
    let high = thresholds.high_water_bytes();
    let low = thresholds.low_water_bytes();
    let mut keys = Vec::new();
    let mut bytes = 0u64;

    for (key, size) in entries {
        keys.push(key.clone());
        bytes = bytes.saturating_add(size);
        if high.saturating_sub(bytes) <= low {
            break;
        }
    }

    EvictionPlan { keys, bytes }
}

/// Background evictor bound to one shared [`LruCache`].
pub struct EvictionMonitor<K, V> {
    cache: LruCache<K, V>,
    thresholds: Thresholds,
    interval: Duration,
    counters: Arc<MonitorCounters>,
}

impl<K, V> EvictionMonitor<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Builds a monitor whose thresholds derive from this host's physical memory.
    ///
    /// Fails if `config` is invalid or physical memory cannot be read. The
    /// cache stays usable either way.
    pub fn new(cache: LruCache<K, V>, config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::with_probe(cache, config, &SystemMemory)
    }

    /// Like [`new`](Self::new) but reads physical memory from `probe`.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::cache::LruCache;
    /// use memlru::config::MonitorConfig;
    /// use memlru::memory::FixedMemory;
    /// use memlru::monitor::EvictionMonitor;
    ///
    /// let cache: LruCache<u32, Vec<u8>> = LruCache::new();
    /// let monitor =
    ///     EvictionMonitor::with_probe(cache, MonitorConfig::default(), &FixedMemory(4000)).unwrap();
    /// assert_eq!(monitor.thresholds().high_water_bytes(), 1000);
    /// assert_eq!(monitor.thresholds().low_water_bytes(), 400);
    /// ```
    pub fn with_probe<P>(
        cache: LruCache<K, V>,
        config: MonitorConfig,
        probe: &P,
    ) -> Result<Self, MonitorError>
    where
        P: MemoryProbe + ?Sized,
    {
        config.validate()?;
        let total = probe.total_physical_memory()?;
        let thresholds = config.thresholds(total)?;
        Ok(Self::with_thresholds(cache, thresholds, config.interval()))
    }

    /// Builds a monitor from already-derived byte thresholds.
    pub fn with_thresholds(cache: LruCache<K, V>, thresholds: Thresholds, interval: Duration) -> Self {
        Self {
            cache,
            thresholds,
            interval,
            counters: Arc::new(MonitorCounters::default()),
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cache(&self) -> &LruCache<K, V> {
        &self.cache
    }

    pub fn stats(&self) -> MonitorStats {
        self.counters.snapshot()
    }

    /// Current eviction plan computed from the cache's recency list.
    pub fn eviction_candidates(&self) -> EvictionPlan<K> {
        self.cache.scan_lru(|entries| {
            select_candidates(
                entries.map(|entry| (entry.key(), entry.size())),
                &self.thresholds,
            )
        })
    }

    /// Runs one tick: checks the high-water mark and evicts if it was reached.
    pub fn inspect(&self) -> TickReport {
        let total_size = self.cache.total_size();
        let headroom_bytes = self.thresholds.headroom(total_size);
        log::debug!(
            "remaining cache capacity {} MiB (total_size={} high_water={})",
            headroom_bytes / MIB,
            total_size,
            self.thresholds.high_water_bytes()
        );

        let mut report = TickReport {
            total_size,
            headroom_bytes,
            evicted: false,
            evicted_entries: 0,
            evicted_bytes: 0,
        };

        if self.thresholds.exceeded(total_size) {
            let plan = self.eviction_candidates();
            let removed = self.cache.remove_many(&plan.keys);
            report.evicted = true;
            report.evicted_entries = removed.len();
            report.evicted_bytes = removed.iter().map(CacheEntry::size).sum();
            log::info!(
                "cache eviction: removed {} of {} candidates, {} bytes freed",
                report.evicted_entries,
                plan.keys.len(),
                report.evicted_bytes
            );
        }

        self.counters.record_tick(&report);
        report
    }

    /// [`inspect`](Self::inspect) with panics caught and logged; `None` if the tick failed.
    pub fn tick(&self) -> Option<TickReport> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.inspect())) {
            Ok(report) => Some(report),
            Err(payload) => {
                self.counters.record_failure();
                log::error!("eviction monitor tick failed: {}", panic_message(&*payload));
                None
            },
        }
    }

    /// Moves the monitor onto a background thread.
    pub fn start(self) -> Result<MonitorHandle, MonitorError>
    where
        K: Send + Sync + 'static,
        V: Send + Sync + 'static,
    {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let counters = Arc::clone(&self.counters);
        let thresholds = self.thresholds;

        let join = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                self.run(stop_rx);
                let _ = done_tx.send(());
            })
            .map_err(MonitorError::Spawn)?;

        Ok(MonitorHandle {
            stop_tx,
            done_rx,
            join,
            counters,
            thresholds,
        })
    }

    fn run(&self, stop: Receiver<()>) {
        log::info!(
            "eviction monitor started: interval={:?} high_water={} low_water={}",
            self.interval,
            self.thresholds.high_water_bytes(),
            self.thresholds.low_water_bytes()
        );
        loop {
            match stop.recv_timeout(self.interval) {
                Ok(()) => break,
                Err(RecvTimeoutError::Disconnected) => {
                    log::debug!("eviction monitor handle dropped");
                    break;
                },
                Err(RecvTimeoutError::Timeout) => {},
            }
            self.tick();
        }
        log::info!("eviction monitor stopped");
    }
}

impl<K, V> std::fmt::Debug for EvictionMonitor<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvictionMonitor")
            .field("thresholds", &self.thresholds)
            .field("interval", &self.interval)
            .field("cache", &self.cache)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Control handle for a running monitor thread.
///
/// Dropping the handle also stops the thread (its stop channel disconnects),
/// but does not wait for it.
#[derive(Debug)]
pub struct MonitorHandle {
    stop_tx: Sender<()>,
    done_rx: Receiver<()>,
    join: JoinHandle<()>,
    counters: Arc<MonitorCounters>,
    thresholds: Thresholds,
}

impl MonitorHandle {
    pub fn stats(&self) -> MonitorStats {
        self.counters.snapshot()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Asks the loop to exit after the current tick without waiting.
    pub fn request_stop(&self) {
        let _ = self.stop_tx.try_send(());
    }

    /// Requests stop and joins the thread.
    pub fn stop(self) -> Result<MonitorStats, MonitorError> {
        self.request_stop();
        self.join.join().map_err(|_| MonitorError::ThreadPanicked)?;
        Ok(self.counters.snapshot())
    }

    /// Requests stop and waits at most `timeout` for the thread to exit.
    ///
    /// On timeout the thread is detached and keeps running until its current
    /// tick ends.
    pub fn stop_timeout(self, timeout: Duration) -> Result<MonitorStats, MonitorError> {
        self.request_stop();
        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {},
            Err(RecvTimeoutError::Timeout) => {
                log::warn!("eviction monitor did not stop within {:?}", timeout);
                return Err(MonitorError::ShutdownTimeout);
            },
        }
        self.join.join().map_err(|_| MonitorError::ThreadPanicked)?;
        Ok(self.counters.snapshot())
    }
}
