pub use crate::cache::{LruCache, LruCore};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{MonitorConfig, Thresholds};
pub use crate::entry::{CacheEntry, MemSize};
pub use crate::error::{ConfigError, InvariantError, MemoryQueryError, MonitorError};
pub use crate::memory::{FixedMemory, MemoryProbe, SystemMemory};
pub use crate::metrics::{CacheMetricsSnapshot, MonitorStats, TickReport};
pub use crate::monitor::{EvictionMonitor, EvictionPlan, MonitorHandle, select_candidates};
