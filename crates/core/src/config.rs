//! Configuration system for the stress generator.
//!
//! This module defines the configuration structures and enums that parameterize a run.
//! It provides:
//! 1. **Defaults:** The target cache geometry (line size, last-level cache size, oversize factor).
//! 2. **Structures:** [`CacheGeometry`] for the arena layout and [`RunConfig`] for the traffic pattern.
//! 3. **Enums:** [`AccessMode`] and [`Iterations`].
//! 4. **Parsing:** [`parse_iterations`] for the command-line iteration count.
//!
//! Configuration is supplied as JSON (`--config`) or built from `Config::default()` with
//! command-line overrides applied on top.

use std::fmt;
use std::fs;
use std::num::IntErrorKind;
use std::path::Path;

use serde::Deserialize;

use crate::arena::Entry;
use crate::common::{Result, ThrashError};

/// Default configuration constants.
///
/// These describe the i.MX6 Quad the tool was written for: an L2 of 16 ways with
/// 2048 lines of 32 bytes per way.
mod defaults {
    /// Cache line size in bytes (8 32-bit words per line in L1 and L2).
    pub const LINE_BYTES: usize = 32;

    /// Last-level (L2) cache size in bytes: 16 ways x 2048 lines x 32 bytes.
    pub const LLC_BYTES: usize = 16 * 2048 * 32;

    /// Multiple of the last-level cache the arena spans.
    ///
    /// Generously larger than the cache as the L2 does not use true LRU.
    pub const OVERSIZE_FACTOR: usize = 4;
}

/// Traffic pattern generated over the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Array-order scan; bandwidth bound.
    #[default]
    Sequential,
    /// Pointer chase along a random single cycle; latency bound.
    Random,
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// How many laps a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iterations {
    /// Exactly this many laps.
    Finite(u64),
    /// Laps repeat until the process is terminated externally.
    Unbounded,
}

impl From<Option<u64>> for Iterations {
    fn from(count: Option<u64>) -> Self {
        count.map_or(Self::Unbounded, Self::Finite)
    }
}

impl fmt::Display for Iterations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(n) => write!(f, "{n}"),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Parses an iteration count supplied as text.
///
/// Accepts a decimal non-negative integer that fits in a `u64`. Anything else
/// (empty input, signs, trailing garbage, overflow) is a configuration error.
///
/// # Examples
///
/// ```
/// use thrasher_core::config::parse_iterations;
///
/// assert_eq!(parse_iterations("12").unwrap(), 12);
/// assert!(parse_iterations("twelve").is_err());
/// assert!(parse_iterations("-1").is_err());
/// ```
///
/// # Errors
///
/// Returns [`ThrashError::InvalidIterations`] naming the input and the reason.
pub fn parse_iterations(input: &str) -> Result<u64> {
    let invalid = |reason: &str| ThrashError::InvalidIterations {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if input.starts_with('-') && input.len() > 1 && input[1..].bytes().all(|b| b.is_ascii_digit())
    {
        return Err(invalid("must be non-negative"));
    }

    input.parse::<u64>().map_err(|e| match e.kind() {
        IntErrorKind::Empty => invalid("empty"),
        IntErrorKind::PosOverflow => invalid("out of range"),
        _ => invalid("not a decimal integer"),
    })
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use thrasher_core::config::{AccessMode, Config};
///
/// let config = Config::default();
/// assert_eq!(config.cache.line_bytes, 32);
/// assert_eq!(config.run.mode, AccessMode::Sequential);
///
/// let json = r#"{
///     "cache": { "line_bytes": 64, "llc_bytes": 2097152, "oversize_factor": 8 },
///     "run": { "mode": "random", "iterations": 10, "seed": 7 }
/// }"#;
/// let config = Config::from_json_str(json).unwrap();
/// assert_eq!(config.cache.entry_count(), 2097152 * 8 / 64);
/// assert_eq!(config.run.mode, AccessMode::Random);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Cache geometry the arena is sized against.
    #[serde(default)]
    pub cache: CacheGeometry,
    /// Traffic pattern and run length.
    #[serde(default)]
    pub run: RunConfig,
}

impl Config {
    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::ConfigParse`] for malformed JSON and a geometry
    /// error if the cache section fails [`CacheGeometry::validate`].
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.cache.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::ConfigRead`] if the file cannot be read, otherwise as
    /// for [`Config::from_json_str`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ThrashError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }
}

/// Cache geometry the arena is laid out against.
///
/// Every entry occupies one line-sized, line-aligned slot, and the arena spans
/// `llc_bytes * oversize_factor` bytes so that a lap never fits in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CacheGeometry {
    /// Cache line size in bytes; must be a power of two holding one [`Entry`].
    #[serde(default = "CacheGeometry::default_line_bytes")]
    pub line_bytes: usize,
    /// Last-level cache size in bytes.
    #[serde(default = "CacheGeometry::default_llc_bytes")]
    pub llc_bytes: usize,
    /// Multiple of the last-level cache the arena spans.
    #[serde(default = "CacheGeometry::default_oversize_factor")]
    pub oversize_factor: usize,
}

impl CacheGeometry {
    const fn default_line_bytes() -> usize {
        defaults::LINE_BYTES
    }

    const fn default_llc_bytes() -> usize {
        defaults::LLC_BYTES
    }

    const fn default_oversize_factor() -> usize {
        defaults::OVERSIZE_FACTOR
    }

    /// Builds a geometry whose arena holds exactly `entries` lines of `line_bytes`.
    ///
    /// Used to exercise the core against small synthetic caches.
    pub const fn with_entries(line_bytes: usize, entries: usize) -> Self {
        Self {
            line_bytes,
            llc_bytes: line_bytes * entries,
            oversize_factor: 1,
        }
    }

    /// Number of entries (lines) in the arena.
    pub const fn entry_count(&self) -> usize {
        match self.llc_bytes.checked_mul(self.oversize_factor) {
            Some(bytes) if self.line_bytes > 0 => bytes / self.line_bytes,
            _ => 0,
        }
    }

    /// Total arena size in bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::SizeOverflow`] when the size does not fit in `usize`.
    pub fn buffer_bytes(&self) -> Result<usize> {
        self.llc_bytes
            .checked_mul(self.oversize_factor)
            .ok_or(ThrashError::SizeOverflow {
                entries: self.llc_bytes / self.line_bytes.max(1),
                line_bytes: self.line_bytes,
            })
    }

    /// Checks that the geometry describes a usable arena.
    ///
    /// The checks are purely arithmetic: an oversized but well-formed geometry
    /// passes here and fails later at allocation.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::InvalidGeometry`] for malformed sizes and
    /// [`ThrashError::TooFewEntries`] when fewer than two lines fit.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ThrashError::InvalidGeometry(msg));

        if !self.line_bytes.is_power_of_two() {
            return invalid(format!(
                "line size {} is not a power of two",
                self.line_bytes
            ));
        }
        if self.line_bytes < Entry::SIZE {
            return invalid(format!(
                "line size {} cannot hold a {}-byte entry",
                self.line_bytes,
                Entry::SIZE
            ));
        }
        if self.llc_bytes == 0 || self.oversize_factor == 0 {
            return invalid("cache size and oversize factor must be non-zero".to_string());
        }
        if self.llc_bytes % self.line_bytes != 0 {
            return invalid(format!(
                "cache size {} is not a whole number of {}-byte lines",
                self.llc_bytes, self.line_bytes
            ));
        }
        if self.llc_bytes.checked_mul(self.oversize_factor).is_some() && self.entry_count() < 2 {
            return Err(ThrashError::TooFewEntries {
                entries: self.entry_count(),
            });
        }
        Ok(())
    }
}

impl Default for CacheGeometry {
    fn default() -> Self {
        Self {
            line_bytes: defaults::LINE_BYTES,
            llc_bytes: defaults::LLC_BYTES,
            oversize_factor: defaults::OVERSIZE_FACTOR,
        }
    }
}

/// Traffic pattern and run length.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunConfig {
    /// Access pattern.
    #[serde(default)]
    pub mode: AccessMode,
    /// Lap count; `None` runs until terminated.
    #[serde(default)]
    pub iterations: Option<u64>,
    /// Seed for the random arrangement; `None` seeds from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Check the single-cycle invariant before the timed region.
    #[serde(default)]
    pub verify: bool,
}

impl RunConfig {
    /// The configured lap count.
    pub fn laps(&self) -> Iterations {
        self.iterations.into()
    }
}
