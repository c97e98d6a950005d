//! Memory-bus stress generator library.
//!
//! This crate generates controlled, cache-defeating traffic over a buffer several times
//! larger than the last-level cache:
//! 1. **Arena:** A line-strided buffer of entries, one per cache line.
//! 2. **Permutation:** In-place construction of a uniformly random single cycle over all
//!    entries, for pointer chasing.
//! 3. **Engine:** Sequential or pointer-chasing laps, timed against a monotonic clock.
//! 4. **Reporting:** Exact volume arithmetic and human-readable throughput.
//! 5. **Configuration:** Cache geometry and run parameters, with JSON loading.

/// Line-strided entry arena.
pub mod arena;
/// Monotonic timing source.
pub mod clock;
/// Error types and shared constants.
pub mod common;
/// Geometry and run configuration.
pub mod config;
/// Lap-by-lap traversal and timing.
pub mod engine;
/// Single-cycle permutation builder.
pub mod permutation;
/// Run report and volume formatting.
pub mod report;

/// Entry arena; construct with `EntryArena::new`.
pub use crate::arena::{Entry, EntryArena};
/// Default timing source.
pub use crate::clock::{Clock, MonotonicClock};
/// Error type and its classification.
pub use crate::common::{ErrorCategory, ThrashError};
/// Root configuration type; use `Config::default()` or load from JSON.
pub use crate::config::{AccessMode, CacheGeometry, Config, Iterations};
/// Traversal engine.
pub use crate::engine::Traversal;
/// Timed run outcome.
pub use crate::report::RunReport;
