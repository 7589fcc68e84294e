//! memlru: an in-process LRU object cache with a memory-pressure eviction monitor.
//!
//! - [`cache::LruCache`]: key-indexed store plus recency list, one coarse lock
//!   per instance, byte-size accounting per entry.
//! - [`monitor::EvictionMonitor`]: background thread that, once the cache's
//!   total size reaches a high-water mark derived from physical memory, evicts
//!   least recently used entries down to a low-water mark.
//!
//! ```
//! use std::time::Duration;
//! use memlru::prelude::*;
//!
//! let cache: LruCache<String, Vec<u8>> = LruCache::new();
//! cache.put(CacheEntry::sized("a".to_string(), vec![0u8; 64]));
//!
//! let monitor = EvictionMonitor::with_probe(
//!     cache.clone(),
//!     MonitorConfig::default().with_interval(Duration::from_millis(50)),
//!     &FixedMemory(1 << 30),
//! )
//! .unwrap();
//! let handle = monitor.start().unwrap();
//! assert!(cache.get("a").is_some());
//! handle.stop().unwrap();
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod ds;
pub mod entry;
pub mod error;
pub mod memory;
pub mod metrics;
pub mod monitor;
pub mod prelude;
