//! Host memory introspection.
//!
//! The monitor asks a [`MemoryProbe`] for total physical memory once, at
//! construction. [`SystemMemory`] reads it from the OS; [`FixedMemory`] reports
//! a constant and is what tests use.

use crate::error::MemoryQueryError;

pub trait MemoryProbe {
    /// Total physical memory of the host in bytes.
    fn total_physical_memory(&self) -> Result<u64, MemoryQueryError>;
}

/// Reads physical memory from the operating system.
///
/// Linux: `MemTotal` in `/proc/meminfo`. macOS: `sysctl -n hw.memsize`.
/// Other platforms report [`MemoryQueryError::Unsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemory;

impl MemoryProbe for SystemMemory {
    #[cfg(target_os = "linux")]
    fn total_physical_memory(&self) -> Result<u64, MemoryQueryError> {
        let contents = std::fs::read_to_string("/proc/meminfo")?;
        parse_meminfo_total(&contents)
    }

    #[cfg(target_os = "macos")]
    fn total_physical_memory(&self) -> Result<u64, MemoryQueryError> {
        let output = std::process::Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()?;
        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<u64>()
            .map_err(|err| MemoryQueryError::Parse(format!("hw.memsize {:?}: {err}", text.trim())))
    }

    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    fn total_physical_memory(&self) -> Result<u64, MemoryQueryError> {
        Err(MemoryQueryError::Unsupported)
    }
}

/// Extracts `MemTotal` (reported in kB) from `/proc/meminfo` text, in bytes.
pub fn parse_meminfo_total(contents: &str) -> Result<u64, MemoryQueryError> {
    let line = contents
        .lines()
        .find(|line| line.starts_with("MemTotal:"))
        .ok_or_else(|| MemoryQueryError::Parse("MemTotal line not found".into()))?;
    let kb = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| MemoryQueryError::Parse(format!("malformed line {line:?}")))?
        .parse::<u64>()
        .map_err(|err| MemoryQueryError::Parse(format!("{line:?}: {err}")))?;
    kb.checked_mul(1024)
        .ok_or_else(|| MemoryQueryError::Parse(format!("{line:?} overflows u64 bytes")))
}

/// Probe that always reports the same total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedMemory(pub u64);

impl MemoryProbe for FixedMemory {
    fn total_physical_memory(&self) -> Result<u64, MemoryQueryError> {
        Ok(self.0)
    }
}
