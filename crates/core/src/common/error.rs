//! Error definitions for the stress generator.
//!
//! This module defines every failure the core can surface to its caller. It provides:
//! 1. **Error Representation:** A single [`ThrashError`] enum covering configuration,
//!    allocation, timing and arrangement failures.
//! 2. **Classification:** [`ErrorCategory`] groups the variants into the three fatal
//!    conditions a run can hit.
//! 3. **Exit Codes:** A stable mapping from category to process exit status.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The class of a fatal condition.
///
/// Every error terminates the run; the category only decides how the process
/// reports it and which exit status it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input or geometry, detected before anything is allocated.
    Configuration,
    /// The entry arena could not be allocated.
    Resource,
    /// The host misbehaved mid-run: the timing source failed or the arena
    /// no longer holds the arrangement that was written to it.
    Environment,
}

impl ErrorCategory {
    /// Process exit status for this category.
    ///
    /// Configuration errors exit with `1` and allocation failures with `2`,
    /// matching the historical tool; environment failures use `3`.
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::Configuration => 1,
            Self::Resource => 2,
            Self::Environment => 3,
        }
    }
}

/// Errors produced by the stress generator core.
#[derive(Debug, Error)]
pub enum ThrashError {
    /// The iteration count was not a non-negative integer in range.
    #[error("Invalid iteration count `{input}`: {reason}")]
    InvalidIterations {
        /// The raw text supplied by the caller.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The cache geometry cannot describe a usable arena.
    #[error("Invalid cache geometry: {0}")]
    InvalidGeometry(String),

    /// A cycle needs at least two entries.
    #[error("A single cycle needs at least 2 entries, got {entries}")]
    TooFewEntries {
        /// Number of entries that were supplied.
        entries: usize,
    },

    /// A scripted choice fell outside `[index, entries - 1]`.
    #[error("Swap choice {choice} out of range for position {index} of {entries} entries")]
    ChoiceOutOfRange {
        /// Position being filled.
        index: usize,
        /// The offending choice.
        choice: usize,
        /// Number of entries in the arena.
        entries: usize,
    },

    /// The arrangement does not form one cycle over every entry.
    #[error("Arrangement is not a single cycle: {0}")]
    BrokenCycle(String),

    /// The configuration file could not be read.
    #[error("Unable to read config file {path}: {source}")]
    ConfigRead {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The configuration JSON could not be parsed.
    #[error("Unable to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// The entry arena could not be allocated.
    #[error("Unable to allocate buffer of {bytes} bytes: {source}")]
    Allocation {
        /// Requested size in bytes.
        bytes: usize,
        /// Underlying OS failure.
        #[source]
        source: io::Error,
    },

    /// The requested arena size does not fit in the address space.
    #[error("Buffer of {entries} entries x {line_bytes} bytes overflows the address space")]
    SizeOverflow {
        /// Requested entry count.
        entries: usize,
        /// Requested line size.
        line_bytes: usize,
    },

    /// The monotonic clock could not be read.
    #[error("Timing source unavailable: {0}")]
    Clock(#[source] io::Error),
}

impl ThrashError {
    /// Returns the category of this error.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIterations { .. }
            | Self::InvalidGeometry(_)
            | Self::TooFewEntries { .. }
            | Self::ChoiceOutOfRange { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigParse(_) => ErrorCategory::Configuration,
            Self::Allocation { .. } | Self::SizeOverflow { .. } => ErrorCategory::Resource,
            Self::Clock(_) | Self::BrokenCycle(_) => ErrorCategory::Environment,
        }
    }

    /// Returns the process exit status for this error.
    pub const fn exit_code(&self) -> u8 {
        self.category().exit_code()
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, ThrashError>;
