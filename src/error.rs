//! Error types for the memlru library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when monitor configuration is invalid
//!   (fractions outside `(0, 1]`, a low-water mark that does not sit below the
//!   high-water mark, a zero interval).
//! - [`InvariantError`]: Returned by [`LruCache::check_invariants`](crate::cache::LruCache::check_invariants)
//!   when the index, the recency list and the size counter disagree.
//! - [`MemoryQueryError`]: The host could not report its physical memory.
//! - [`MonitorError`]: Everything that can stop an [`EvictionMonitor`](crate::monitor::EvictionMonitor)
//!   from being built, started or shut down.
//!
//! Cache misses are never errors; lookups return `Option`.
//!
//! ## Example Usage
//!
//! ```
//! use memlru::config::MonitorConfig;
//! use memlru::error::ConfigError;
//!
//! let bad: Result<(), ConfigError> = MonitorConfig::default()
//!     .with_high_water_fraction(1.5)
//!     .validate();
//! assert!(bad.unwrap_err().to_string().contains("high_water_fraction"));
//! ```

use std::fmt;
use std::io;

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error returned when internal cache invariants are violated.
///
/// Carries a human-readable description of which invariant failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    /// Creates a new `InvariantError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvariantError {}

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when monitor configuration parameters are invalid.
///
/// Produced by [`MonitorConfig::validate`](crate::config::MonitorConfig::validate),
/// [`MonitorConfig::thresholds`](crate::config::MonitorConfig::thresholds) and
/// [`Thresholds::new`](crate::config::Thresholds::new).
///
/// # Example
///
/// ```
/// use memlru::config::Thresholds;
///
/// let err = Thresholds::new(100, 100).unwrap_err();
/// assert!(err.to_string().contains("low_water_bytes"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// MemoryQueryError
// ---------------------------------------------------------------------------

/// Error returned when the total physical memory of the host cannot be read.
#[derive(Debug)]
pub enum MemoryQueryError {
    /// The platform has no supported way of reporting physical memory.
    Unsupported,
    /// Reading the OS source (e.g. `/proc/meminfo`) failed.
    Io(io::Error),
    /// The OS source was readable but did not contain a usable value.
    Parse(String),
}

impl fmt::Display for MemoryQueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryQueryError::Unsupported => {
                f.write_str("physical memory query is not supported on this platform")
            },
            MemoryQueryError::Io(err) => write!(f, "failed to read physical memory: {err}"),
            MemoryQueryError::Parse(msg) => write!(f, "failed to parse physical memory: {msg}"),
        }
    }
}

impl std::error::Error for MemoryQueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MemoryQueryError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MemoryQueryError {
    fn from(err: io::Error) -> Self {
        MemoryQueryError::Io(err)
    }
}

// ---------------------------------------------------------------------------
// MonitorError
// ---------------------------------------------------------------------------

/// Error returned by eviction monitor construction and lifecycle calls.
#[derive(Debug)]
pub enum MonitorError {
    /// Threshold configuration was rejected.
    Config(ConfigError),
    /// Total physical memory could not be determined.
    MemoryQuery(MemoryQueryError),
    /// The background thread could not be spawned.
    Spawn(io::Error),
    /// The background thread did not exit within the shutdown deadline.
    ShutdownTimeout,
    /// The background thread panicked outside of a tick.
    ThreadPanicked,
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Config(err) => write!(f, "invalid monitor configuration: {err}"),
            MonitorError::MemoryQuery(err) => write!(f, "{err}"),
            MonitorError::Spawn(err) => write!(f, "failed to spawn eviction monitor: {err}"),
            MonitorError::ShutdownTimeout => {
                f.write_str("eviction monitor did not stop before the deadline")
            },
            MonitorError::ThreadPanicked => f.write_str("eviction monitor thread panicked"),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Config(err) => Some(err),
            MonitorError::MemoryQuery(err) => Some(err),
            MonitorError::Spawn(err) => Some(err),
            MonitorError::ShutdownTimeout | MonitorError::ThreadPanicked => None,
        }
    }
}

impl From<ConfigError> for MonitorError {
    fn from(err: ConfigError) -> Self {
        MonitorError::Config(err)
    }
}

impl From<MemoryQueryError> for MonitorError {
    fn from(err: MemoryQueryError) -> Self {
        MonitorError::MemoryQuery(err)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
