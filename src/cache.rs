//! # Size-Accounted LRU Cache
//!
//! Key-indexed object store coupled to a recency list. Every entry carries a
//! byte cost, and the cache keeps a running total so an
//! [`EvictionMonitor`](crate::monitor::EvictionMonitor) can decide when to shed
//! the least recently used entries.
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                          LruCache<K, V>                              │
//!   │                                                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │                 Arc<RwLock<LruCore<K, V>>>                   │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   │                               │                                      │
//!   │                               ▼                                      │
//!   │   ┌──────────────────────────────────────────────────────────────┐   │
//!   │   │  FxHashMap<K, SlotId>  (index)                               │   │
//!   │   │        │                                                     │   │
//!   │   │        ▼                                                     │   │
//!   │   │  RecencyList<CacheEntry<K, V>>  (arena + links)              │   │
//!   │   │                                                              │   │
//!   │   │  head ──► [e0] ◄──► [e1] ◄──► [e2] ◄── tail                  │   │
//!   │   │   (LRU)                                (MRU)                 │   │
//!   │   │                                                              │   │
//!   │   │  total_size = Σ entry.size                                   │   │
//!   │   └──────────────────────────────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The arena owns every entry; the index maps keys to arena handles and the
//! list links those handles in recency order. There are no raw pointers.
//!
//! ## Operations
//!
//! | Method             | Lock  | Description                                   |
//! |--------------------|-------|-----------------------------------------------|
//! | `get(&k)`          | Write | Touch + return `Arc<V>`                       |
//! | `get_entry(&k)`    | Write | Touch + return a snapshot of the entry        |
//! | `peek(&k)`         | Read  | Return value without touching                 |
//! | `put(entry)`       | Write | Remove any entry under the key, append at MRU |
//! | `remove(&k)`       | Write | Unlink + erase, returns the entry             |
//! | `remove_many(ks)`  | Write | `remove` for each key in one critical section |
//! | `purge()`          | Write | Remove everything, head to tail               |
//! | `len()`            | Read  | Entry count, O(1)                             |
//! | `total_size()`     | Read  | Sum of entry sizes, O(1)                      |
//!
//! ## Replacement
//!
//! ```text
//!   put(B', size 5) with B (size 2) resident:
//!
//!     head ──► [A] ◄──► [B] ◄──► [C] ◄── tail     total = 1 + 2 + 3
//!
//!     1. remove(B): unlink, erase, total -= 2
//!     2. append B' at tail, total += 5
//!
//!     head ──► [A] ◄──► [C] ◄──► [B'] ◄── tail    total = 1 + 3 + 5
//! ```
//!
//! ## Thread Safety
//!
//! - `LruCore`: single-threaded, requires `&mut self` to mutate
//! - `LruCache`: one `parking_lot::RwLock` per cache covers the index, the
//!   list and the size counter together, so they are never observed out of
//!   step. `get` takes the write lock because it reorders the list.
//! - Removed entries are returned to the caller and dropped outside the lock.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::clock::{Clock, SystemClock};
use crate::ds::recency_list::{self, RecencyList};
use crate::ds::slot_arena::SlotId;
use crate::entry::CacheEntry;
use crate::error::InvariantError;
use crate::metrics::{CacheCounters, CacheMetricsSnapshot};

/// Single-threaded LRU core: index + recency list + size counter.
pub struct LruCore<K, V> {
    index: FxHashMap<K, SlotId>,
    list: RecencyList<CacheEntry<K, V>>,
    total_size: u64,
    clock: Arc<dyn Clock>,
    counters: CacheCounters,
}

impl<K, V> LruCore<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty core reading time from [`SystemClock`].
    pub fn new() -> Self {
        Self::with_capacity_and_clock(0, Arc::new(SystemClock::new()))
    }

    /// Creates an empty core with room for `capacity` entries before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_clock(capacity, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_capacity_and_clock(0, clock)
    }

    pub fn with_capacity_and_clock(capacity: usize, clock: Arc<dyn Clock>) -> Self {
        LruCore {
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            list: RecencyList::with_capacity(capacity),
            total_size: 0,
            clock,
            counters: CacheCounters::default(),
        }
    }

    /// Timestamp for a node about to become the tail. Never below the current
    /// tail's timestamp, so `last_touched` stays ordered along the list.
    fn next_stamp(&self) -> u64 {
        let now = self.clock.now_micros();
        match self.list.tail() {
            Some(tail) => now.max(tail.last_touched()),
            None => now,
        }
    }

    fn append(&mut self, mut entry: CacheEntry<K, V>) -> SlotId {
        entry.touch(self.next_stamp());
        self.total_size += entry.size();
        let key = entry.key().clone();
        let id = self.list.push_back(entry);
        self.index.insert(key, id);
        id
    }

    fn refresh(&mut self, id: SlotId) {
        let stamp = self.next_stamp();
        self.list.move_to_back(id);
        if let Some(entry) = self.list.get_mut(id) {
            entry.touch(stamp);
        }
    }

    fn detach<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.remove(key)?;
        let entry = self.list.remove(id)?;
        self.total_size -= entry.size();
        Some(entry)
    }

    fn lookup_and_touch<Q>(&mut self, key: &Q) -> Option<SlotId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key).copied() {
            Some(id) => {
                self.counters.inc_hit();
                self.refresh(id);
                Some(id)
            },
            None => {
                self.counters.inc_miss();
                None
            },
        }
    }

    /// Returns the value under `key` and marks it most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.lookup_and_touch(key)?;
        self.list.get(id).map(CacheEntry::value)
    }

    /// Like [`get`](Self::get) but returns the whole entry.
    pub fn get_entry<Q>(&mut self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.lookup_and_touch(key)?;
        self.list.get(id)
    }

    /// Returns the value under `key` without changing recency order.
    pub fn peek<Q>(&self, key: &Q) -> Option<&Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.get(key)?;
        self.list.get(*id).map(CacheEntry::value)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Inserts `entry` as the most recently used entry.
    ///
    /// An entry already stored under the same key is removed first (size
    /// subtracted, unlinked, erased) and returned.
    pub fn put(&mut self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        let replaced = self.detach(entry.key());
        match replaced {
            Some(_) => self.counters.inc_replacement(),
            None => self.counters.inc_insert(),
        }
        self.append(entry);
        replaced
    }

    /// Removes the entry under `key`. A missing key returns `None`.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let removed = self.detach(key);
        match removed {
            Some(_) => self.counters.inc_remove(),
            None => self.counters.inc_remove_miss(),
        }
        removed
    }

    /// Removes every listed key that is still resident.
    ///
    /// Missing and duplicate keys contribute nothing.
    pub fn remove_many<I>(&mut self, keys: I) -> Vec<CacheEntry<K, V>>
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
    {
        let mut removed = Vec::new();
        for key in keys {
            let key: &K = key.borrow();
            if let Some(entry) = self.remove(key) {
                removed.push(entry);
            }
        }
        removed
    }

    /// Removes every entry walking from head to tail; returns how many were removed.
    pub fn purge(&mut self) -> usize {
        self.counters.inc_purge();
        let mut removed = 0;
        while let Some(id) = self.list.head_id() {
            let Some(entry) = self.list.remove(id) else {
                break;
            };
            self.index.remove(entry.key());
            self.total_size -= entry.size();
            removed += 1;
        }
        removed
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Sum of `size` over resident entries.
    #[inline]
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Least recently used entry (the list head).
    pub fn peek_lru(&self) -> Option<&CacheEntry<K, V>> {
        self.list.head()
    }

    /// Most recently used entry (the list tail).
    pub fn peek_mru(&self) -> Option<&CacheEntry<K, V>> {
        self.list.tail()
    }

    /// Entries from least to most recently used.
    pub fn iter(&self) -> recency_list::Iter<'_, CacheEntry<K, V>> {
        self.list.iter()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        self.list.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.counters.snapshot(self.len(), self.total_size)
    }

    /// Verifies the index/list bijection, link consistency, size accounting
    /// and timestamp ordering.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.list.check_links()?;

        if self.index.len() != self.list.len() {
            return Err(InvariantError::new(format!(
                "index holds {} keys but list holds {} entries",
                self.index.len(),
                self.list.len()
            )));
        }

        let mut size = 0u64;
        let mut last_stamp = 0u64;
        for (id, entry) in self.list.iter_entries() {
            if self.index.get(entry.key()) != Some(&id) {
                return Err(InvariantError::new(
                    "list entry is not indexed under its own key",
                ));
            }
            if entry.last_touched() < last_stamp {
                return Err(InvariantError::new(
                    "last_touched decreases from head to tail",
                ));
            }
            last_stamp = entry.last_touched();
            size += entry.size();
        }

        if size != self.total_size {
            return Err(InvariantError::new(format!(
                "total_size is {} but entries sum to {}",
                self.total_size, size
            )));
        }
        Ok(())
    }
}

impl<K, V> Default for LruCore<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> fmt::Debug for LruCore<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCore")
            .field("len", &self.len())
            .field("total_size", &self.total_size)
            .finish_non_exhaustive()
    }
}

/// Thread-safe LRU cache shared between callers and an eviction monitor.
///
/// Cloning is cheap and yields another handle to the same cache.
pub struct LruCache<K, V> {
    inner: Arc<RwLock<LruCore<K, V>>>,
}

impl<K, V> Clone for LruCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cache = self.inner.read();
        f.debug_struct("LruCache")
            .field("len", &cache.len())
            .field("total_size", &cache.total_size())
            .finish_non_exhaustive()
    }
}

impl<K, V> Default for LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> LruCache<K, V>
where
    K: Clone + Eq + Hash,
{
    /// Creates an empty cache.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::cache::LruCache;
    ///
    /// let cache: LruCache<String, Vec<u8>> = LruCache::new();
    /// assert!(cache.is_empty());
    /// assert_eq!(cache.total_size(), 0);
    /// ```
    pub fn new() -> Self {
        Self::from_core(LruCore::new())
    }

    /// Creates an empty cache with room for `capacity` entries before reallocating.
    /// This is a hint only; the cache never refuses inserts.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_core(LruCore::with_capacity(capacity))
    }

    /// Creates an empty cache that stamps entries using `clock`.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use memlru::cache::LruCache;
    /// use memlru::clock::ManualClock;
    /// use memlru::entry::CacheEntry;
    ///
    /// let clock = Arc::new(ManualClock::new(100));
    /// let cache = LruCache::with_clock(clock.clone());
    /// cache.put(CacheEntry::new("a", 1u8, 1));
    /// assert_eq!(cache.peek_mru().unwrap().last_touched(), 100);
    /// ```
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::from_core(LruCore::with_clock(clock))
    }

    pub fn from_core(core: LruCore<K, V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(core)),
        }
    }

    /// Returns the value under `key`, marking it most recently used.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::cache::LruCache;
    /// use memlru::entry::CacheEntry;
    ///
    /// let cache = LruCache::new();
    /// cache.put(CacheEntry::new("a".to_string(), 1, 8));
    /// cache.put(CacheEntry::new("b".to_string(), 2, 8));
    ///
    /// assert_eq!(cache.get("a").as_deref(), Some(&1));
    /// assert_eq!(cache.keys(), vec!["b".to_string(), "a".to_string()]);
    /// assert!(cache.get("missing").is_none());
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.write();
        cache.get(key).map(Arc::clone)
    }

    /// Touches `key` and returns a snapshot of its entry.
    pub fn get_entry<Q>(&self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.write();
        cache.get_entry(key).cloned()
    }

    /// Returns the value under `key` without affecting recency order.
    pub fn peek<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let cache = self.inner.read();
        cache.peek(key).map(Arc::clone)
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.read().contains(key)
    }

    /// Inserts `entry` at the most recently used position.
    ///
    /// Any entry already under the key is removed first and returned;
    /// `total_size` changes only by the net difference.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::cache::LruCache;
    /// use memlru::entry::CacheEntry;
    ///
    /// let cache = LruCache::new();
    /// cache.put(CacheEntry::new("k", "small", 10));
    /// let old = cache.put(CacheEntry::new("k", "large", 300));
    ///
    /// assert_eq!(old.unwrap().size(), 10);
    /// assert_eq!(cache.len(), 1);
    /// assert_eq!(cache.total_size(), 300);
    /// ```
    pub fn put(&self, entry: CacheEntry<K, V>) -> Option<CacheEntry<K, V>> {
        let mut cache = self.inner.write();
        cache.put(entry)
    }

    /// Convenience for `put(CacheEntry::new(key, value, size))`.
    pub fn insert(&self, key: K, value: V, size: u64) -> Option<CacheEntry<K, V>> {
        self.put(CacheEntry::new(key, value, size))
    }

    /// Removes and returns the entry under `key`; `None` if absent.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::cache::LruCache;
    /// use memlru::entry::CacheEntry;
    ///
    /// let cache = LruCache::new();
    /// cache.put(CacheEntry::new(1u32, "one", 4));
    ///
    /// assert_eq!(cache.remove(&1).unwrap().size(), 4);
    /// assert!(cache.remove(&1).is_none());
    /// assert_eq!(cache.total_size(), 0);
    /// ```
    pub fn remove<Q>(&self, key: &Q) -> Option<CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut cache = self.inner.write();
        cache.remove(key)
    }

    /// Removes every listed key still resident, under a single lock acquisition.
    pub fn remove_many<I>(&self, keys: I) -> Vec<CacheEntry<K, V>>
    where
        I: IntoIterator,
        I::Item: Borrow<K>,
    {
        let mut cache = self.inner.write();
        cache.remove_many(keys)
    }

    /// Removes every entry; returns how many were removed.
    pub fn purge(&self) -> usize {
        let mut cache = self.inner.write();
        cache.purge()
    }

    /// Number of resident entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sum of `size` over resident entries.
    pub fn total_size(&self) -> u64 {
        self.inner.read().total_size()
    }

    /// Snapshot of the least recently used entry.
    pub fn peek_lru(&self) -> Option<CacheEntry<K, V>> {
        self.inner.read().peek_lru().cloned()
    }

    /// Snapshot of the most recently used entry.
    pub fn peek_mru(&self) -> Option<CacheEntry<K, V>> {
        self.inner.read().peek_mru().cloned()
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        self.inner.read().keys()
    }

    /// Runs `f` over entries from least to most recently used while holding
    /// the read lock. Keep `f` short; writers wait for it.
    pub fn scan_lru<R, F>(&self, f: F) -> R
    where
        F: FnOnce(recency_list::Iter<'_, CacheEntry<K, V>>) -> R,
    {
        let cache = self.inner.read();
        f(cache.iter())
    }

    pub fn metrics(&self) -> CacheMetricsSnapshot {
        self.inner.read().metrics()
    }

    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.inner.read().check_invariants()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn core_with_clock() -> (LruCore<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (LruCore::with_clock(clock.clone()), clock)
    }

    fn fill(core: &mut LruCore<String, u32>, n: u32, size: u64) {
        for i in 0..n {
            core.put(CacheEntry::new(i.to_string(), i, size));
        }
    }

    mod basic_behavior {
        use super::*;

        #[test]
        fn new_cache_is_empty() {
            let core: LruCore<u32, u32> = LruCore::new();
            assert!(core.is_empty());
            assert_eq!(core.len(), 0);
            assert_eq!(core.total_size(), 0);
            assert!(core.peek_lru().is_none());
            assert!(core.peek_mru().is_none());
            core.check_invariants().unwrap();
        }

        #[test]
        fn put_appends_at_tail() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 20, 1024 * 1024);

            assert_eq!(core.len(), 20);
            assert_eq!(core.peek_lru().unwrap().key(), "0");
            assert_eq!(core.peek_mru().unwrap().key(), "19");
            assert_eq!(core.total_size(), 20 * 1024 * 1024);
            core.check_invariants().unwrap();
        }

        #[test]
        fn get_miss_is_none() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 20, 1);
            assert!(core.get("1000").is_none());
            assert_eq!(core.metrics().get_misses, 1);
        }

        #[test]
        fn get_moves_entry_to_tail() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 5, 1);

            assert_eq!(**core.get("0").unwrap(), 0);
            assert_eq!(core.peek_mru().unwrap().key(), "0");
            assert_eq!(core.keys(), vec!["1", "2", "3", "4", "0"]);
            core.check_invariants().unwrap();
        }

        #[test]
        fn peek_does_not_reorder() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 3, 1);

            assert_eq!(**core.peek("0").unwrap(), 0);
            assert_eq!(core.keys(), vec!["0", "1", "2"]);
            assert_eq!(core.metrics().get_hits, 0);
        }

        #[test]
        fn remove_patches_order() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 20, 1);

            let touched = core.get_entry("1").cloned().unwrap();
            let removed = core.remove(touched.key()).unwrap();
            assert_eq!(removed.key(), "1");
            assert!(Arc::ptr_eq(removed.value(), touched.value()));
            assert!(core.get("1").is_none());

            let keys = core.keys();
            assert_eq!(keys[0], "0");
            assert_eq!(keys[1], "2");
            core.check_invariants().unwrap();
        }

        #[test]
        fn remove_missing_is_none() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 3, 1);
            assert!(core.remove("abc").is_none());
            assert_eq!(core.len(), 3);
            assert_eq!(core.metrics().remove_misses, 1);
        }

        #[test]
        fn purge_empties_everything() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 10, 7);

            assert_eq!(core.purge(), 10);
            assert!(core.is_empty());
            assert_eq!(core.total_size(), 0);
            assert!(core.peek_lru().is_none());
            assert!(core.peek_mru().is_none());
            core.check_invariants().unwrap();

            assert_eq!(core.purge(), 0);
        }

        #[test]
        fn purge_single_entry() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 1, 7);
            assert_eq!(core.purge(), 1);
            assert!(core.is_empty());
        }
    }

    mod replacement {
        use super::*;

        #[test]
        fn replacing_key_counts_net_size() {
            let (mut core, _) = core_with_clock();
            core.put(CacheEntry::new("a".into(), 1, 100));
            core.put(CacheEntry::new("b".into(), 2, 50));

            let old = core.put(CacheEntry::new("a".into(), 3, 10)).unwrap();
            assert_eq!(old.size(), 100);
            assert_eq!(**old.value(), 1);
            assert_eq!(core.total_size(), 60);
            assert_eq!(core.len(), 2);
            assert_eq!(core.keys(), vec!["b", "a"]);
            assert_eq!(**core.peek("a").unwrap(), 3);

            let metrics = core.metrics();
            assert_eq!(metrics.inserts, 2);
            assert_eq!(metrics.replacements, 1);
            core.check_invariants().unwrap();
        }

        #[test]
        fn replacing_tail_keeps_single_node() {
            let (mut core, _) = core_with_clock();
            core.put(CacheEntry::new("a".into(), 1, 1));
            core.put(CacheEntry::new("a".into(), 2, 2));
            assert_eq!(core.len(), 1);
            assert_eq!(core.total_size(), 2);
            core.check_invariants().unwrap();
        }
    }

    mod removal {
        use super::*;

        #[test]
        fn remove_many_ignores_duplicates_and_stale_keys() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 6, 10);

            let keys = vec![
                "0".to_string(),
                "1".to_string(),
                "1".to_string(),
                "missing".to_string(),
            ];
            let removed = core.remove_many(&keys);
            assert_eq!(removed.len(), 2);
            assert_eq!(core.total_size(), 40);

            let removed_again = core.remove_many(keys);
            assert!(removed_again.is_empty());
            assert_eq!(core.total_size(), 40);
            core.check_invariants().unwrap();
        }

        #[test]
        fn double_remove_does_not_double_subtract() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 3, 5);
            core.remove("2");
            core.remove("2");
            assert_eq!(core.total_size(), 10);
        }
    }

    mod timestamps {
        use super::*;

        #[test]
        fn put_and_get_refresh_last_touched() {
            let (mut core, clock) = core_with_clock();
            core.put(CacheEntry::new("a".into(), 1, 1));
            assert_eq!(core.peek_mru().unwrap().last_touched(), 1_000);

            clock.advance(250);
            core.put(CacheEntry::new("b".into(), 2, 1));
            clock.advance(250);
            core.get("a");
            assert_eq!(core.peek_mru().unwrap().last_touched(), 1_500);
            assert_eq!(core.peek_lru().unwrap().last_touched(), 1_250);
        }

        #[test]
        fn backwards_clock_keeps_ordering() {
            let (mut core, clock) = core_with_clock();
            fill(&mut core, 3, 1);
            clock.set(10);
            core.get("0");

            assert_eq!(core.peek_mru().unwrap().key(), "0");
            assert_eq!(core.peek_mru().unwrap().last_touched(), 1_000);
            core.check_invariants().unwrap();
        }
    }

    mod lru_order {
        use super::*;

        #[test]
        fn touching_odd_keys_moves_them_to_tail_in_order() {
            let (mut core, _) = core_with_clock();
            fill(&mut core, 100, 1);

            for i in (1..100).step_by(2) {
                core.get(i.to_string().as_str());
            }

            let keys = core.keys();
            let evens: Vec<String> = (0..100).step_by(2).map(|i| i.to_string()).collect();
            let odds: Vec<String> = (1..100).step_by(2).map(|i| i.to_string()).collect();
            assert_eq!(&keys[..50], evens.as_slice());
            assert_eq!(&keys[50..], odds.as_slice());
            core.check_invariants().unwrap();
        }
    }

    mod concurrent_wrapper {
        use super::*;
        use std::thread;

        #[test]
        fn clones_share_state() {
            let cache: LruCache<u32, u32> = LruCache::new();
            let other = cache.clone();
            cache.insert(1, 10, 4);
            assert_eq!(other.len(), 1);
            assert_eq!(other.total_size(), 4);
        }

        #[test]
        fn parallel_writers_and_readers_keep_invariants() {
            let cache: LruCache<u32, u32> = LruCache::with_capacity(4000);
            let mut handles = Vec::new();
            for t in 0..4u32 {
                let cache = cache.clone();
                handles.push(thread::spawn(move || {
                    for i in (t * 1000)..((t + 1) * 1000) {
                        cache.insert(i, i, 8);
                        cache.get(&(i / 2));
                        if i % 7 == 0 {
                            cache.remove(&(i / 3));
                        }
                    }
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }
            cache.check_invariants().unwrap();
            assert_eq!(cache.total_size(), cache.len() as u64 * 8);
        }

        #[test]
        fn scan_lru_walks_head_to_tail() {
            let cache: LruCache<u32, ()> = LruCache::new();
            for i in 0..4 {
                cache.insert(i, (), u64::from(i));
            }
            let sizes: Vec<u64> = cache.scan_lru(|iter| iter.map(CacheEntry::size).collect());
            assert_eq!(sizes, vec![0, 1, 2, 3]);
        }

        #[test]
        fn debug_reports_len_and_size() {
            let cache: LruCache<u32, u32> = LruCache::new();
            cache.insert(1, 1, 42);
            let dbg = format!("{:?}", cache);
            assert!(dbg.contains("len: 1"));
            assert!(dbg.contains("total_size: 42"));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{HashMap, HashSet};

        #[derive(Debug, Clone)]
        enum Op {
            Put(u8, u16),
            Get(u8),
            Remove(u8),
            RemoveMany(Vec<u8>),
            Purge,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                6 => (0u8..32, any::<u16>()).prop_map(|(k, s)| Op::Put(k, s)),
                4 => (0u8..32).prop_map(Op::Get),
                2 => (0u8..32).prop_map(Op::Remove),
                1 => prop::collection::vec(0u8..32, 0..6).prop_map(Op::RemoveMany),
                1 => Just(Op::Purge),
            ]
        }

        proptest! {
            /// Property: index and list stay in bijection and sizes add up
            /// after every operation, matching a model map.
            #[cfg_attr(miri, ignore)]
            #[test]
            fn prop_bijection_and_size_accounting(
                ops in prop::collection::vec(op_strategy(), 0..200)
            ) {
                let clock = Arc::new(ManualClock::new(0));
                let mut core: LruCore<u8, u16> = LruCore::with_clock(clock.clone());
                let mut model: HashMap<u8, u64> = HashMap::new();

                for op in ops {
                    clock.advance(1);
                    match op {
                        Op::Put(k, s) => {
                            core.put(CacheEntry::new(k, s, u64::from(s)));
                            model.insert(k, u64::from(s));
                        },
                        Op::Get(k) => {
                            let hit = core.get(&k).is_some();
                            prop_assert_eq!(hit, model.contains_key(&k));
                            if hit {
                                prop_assert_eq!(core.peek_mru().map(|e| *e.key()), Some(k));
                            }
                        },
                        Op::Remove(k) => {
                            let removed = core.remove(&k).map(|e| e.size());
                            prop_assert_eq!(removed, model.remove(&k));
                        },
                        Op::RemoveMany(keys) => {
                            core.remove_many(&keys);
                            for k in keys {
                                model.remove(&k);
                            }
                        },
                        Op::Purge => {
                            core.purge();
                            model.clear();
                        },
                    }

                    prop_assert!(core.check_invariants().is_ok());
                    prop_assert_eq!(core.total_size(), model.values().sum::<u64>());
                    let listed: HashSet<u8> = core.keys().into_iter().collect();
                    let modeled: HashSet<u8> = model.keys().copied().collect();
                    prop_assert_eq!(listed, modeled);
                }
            }
        }
    }
}
