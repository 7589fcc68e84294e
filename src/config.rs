//! Eviction monitor configuration and derived byte thresholds.
//!
//! ```text
//!   high_water_bytes = high_water_fraction × total_physical_memory
//!   low_water_bytes  = low_water_fraction  × high_water_bytes
//! ```
//!
//! Both fractions must lie in `(0, 1]` and the derived low-water mark must sit
//! strictly below the high-water mark, otherwise construction fails with
//! [`ConfigError`].

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_HIGH_WATER_FRACTION: f64 = 0.25;
pub const DEFAULT_LOW_WATER_FRACTION: f64 = 0.40;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

const MIB: f64 = 1024.0 * 1024.0;

/// Absolute byte thresholds the monitor compares `total_size` against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    high_water_bytes: u64,
    low_water_bytes: u64,
}

impl Thresholds {
    /// Builds thresholds from explicit byte values.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::config::Thresholds;
    ///
    /// let t = Thresholds::new(1000, 400).unwrap();
    /// assert_eq!(t.eviction_target(), 600);
    /// assert!(Thresholds::new(0, 0).is_err());
    /// ```
    pub fn new(high_water_bytes: u64, low_water_bytes: u64) -> Result<Self, ConfigError> {
        if high_water_bytes == 0 {
            return Err(ConfigError::new("high_water_bytes must be > 0"));
        }
        if low_water_bytes >= high_water_bytes {
            return Err(ConfigError::new(format!(
                "low_water_bytes ({low_water_bytes}) must be below high_water_bytes ({high_water_bytes})"
            )));
        }
        Ok(Self {
            high_water_bytes,
            low_water_bytes,
        })
    }

    pub fn high_water_bytes(&self) -> u64 {
        self.high_water_bytes
    }

    pub fn low_water_bytes(&self) -> u64 {
        self.low_water_bytes
    }

    /// Bytes an eviction pass must free: `high_water_bytes - low_water_bytes`.
    pub fn eviction_target(&self) -> u64 {
        self.high_water_bytes - self.low_water_bytes
    }

    /// Whether `total_size` has reached the high-water mark.
    pub fn exceeded(&self, total_size: u64) -> bool {
        total_size >= self.high_water_bytes
    }

    /// `high_water_bytes - total_size`; negative once the mark is crossed.
    pub fn headroom(&self, total_size: u64) -> i128 {
        i128::from(self.high_water_bytes) - i128::from(total_size)
    }
}

/// Fractions and tick interval for an [`EvictionMonitor`](crate::monitor::EvictionMonitor).
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    high_water_fraction: f64,
    low_water_fraction: f64,
    interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            high_water_fraction: DEFAULT_HIGH_WATER_FRACTION,
            low_water_fraction: DEFAULT_LOW_WATER_FRACTION,
            interval: DEFAULT_INTERVAL,
        }
    }
}

impl MonitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fraction of physical memory at which eviction starts.
    pub fn with_high_water_fraction(mut self, fraction: f64) -> Self {
        self.high_water_fraction = fraction;
        self
    }

    /// Fraction of the high-water mark that an eviction pass aims for.
    pub fn with_low_water_fraction(mut self, fraction: f64) -> Self {
        self.low_water_fraction = fraction;
        self
    }

    /// Sleep between ticks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn high_water_fraction(&self) -> f64 {
        self.high_water_fraction
    }

    pub fn low_water_fraction(&self) -> f64 {
        self.low_water_fraction
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Checks the fractions and the interval without needing a memory total.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_fraction("high_water_fraction", self.high_water_fraction)?;
        check_fraction("low_water_fraction", self.low_water_fraction)?;
        if self.low_water_fraction >= 1.0 {
            return Err(ConfigError::new(
                "low_water_fraction must be < 1 so low_water_bytes stays below high_water_bytes",
            ));
        }
        if self.interval.is_zero() {
            return Err(ConfigError::new("interval must be > 0"));
        }
        Ok(())
    }

    /// Derives byte thresholds from the host's total physical memory.
    ///
    /// # Example
    ///
    /// ```
    /// use memlru::config::MonitorConfig;
    ///
    /// let t = MonitorConfig::default().thresholds(1_000_000).unwrap();
    /// assert_eq!(t.high_water_bytes(), 250_000);
    /// assert_eq!(t.low_water_bytes(), 100_000);
    /// ```
    pub fn thresholds(&self, total_physical_memory: u64) -> Result<Thresholds, ConfigError> {
        self.validate()?;
        let high = (self.high_water_fraction * total_physical_memory as f64) as u64;
        let low = (self.low_water_fraction * high as f64) as u64;
        let thresholds = Thresholds::new(high, low)?;
        log::info!(
            "high water mark memory = {} MiB, low water mark memory = {} MiB",
            (high as f64 / MIB) as u64,
            (low as f64 / MIB) as u64
        );
        Ok(thresholds)
    }
}

fn check_fraction(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::new(format!(
            "{name} must be in (0, 1], got {value}"
        )))
    }
}
