//! Run statistics and reporting.
//!
//! A [`RunReport`] carries the only measured metric of a run (elapsed wall-clock time)
//! together with the values needed to derive everything else arithmetically:
//! 1. **Volume:** Bytes and lines touched, `buffer bytes x laps`, exact.
//! 2. **Throughput:** Volume over elapsed time.
//! 3. **Formatting:** Human-readable MiB/GiB rendering, switching unit at 1 GiB.

use std::fmt;
use std::time::Duration;

use crate::common::{GIB, MIB};
use crate::config::AccessMode;

/// Outcome of a timed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Access pattern that was run.
    pub mode: AccessMode,
    /// Laps completed inside the timed region.
    pub laps: u64,
    /// Entries (cache lines) per lap.
    pub entries: usize,
    /// Bytes per entry slot.
    pub line_bytes: usize,
    /// Wall-clock time between the first and last timestamp.
    pub elapsed: Duration,
}

impl RunReport {
    /// Size of the arena in bytes.
    pub const fn buffer_bytes(&self) -> u128 {
        self.entries as u128 * self.line_bytes as u128
    }

    /// Total bytes of memory requests generated: buffer size times laps.
    pub const fn bytes_touched(&self) -> u128 {
        self.buffer_bytes() * self.laps as u128
    }

    /// Total cache lines touched.
    pub const fn lines_touched(&self) -> u128 {
        self.entries as u128 * self.laps as u128
    }

    /// Elapsed time in seconds.
    pub const fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Bytes per second, or zero when no time elapsed.
    pub const fn throughput(&self) -> f64 {
        let secs = self.elapsed_secs();
        if secs > 0.0 {
            self.bytes_touched() as f64 / secs
        } else {
            0.0
        }
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        print!("{self}");
    }
}

/// Renders a byte count in MiB, or in GiB once it reaches 1 GiB, with one decimal.
///
/// # Examples
///
/// ```
/// use thrasher_core::report::format_volume;
///
/// assert_eq!(format_volume(512 << 20), "512.0MiB");
/// assert_eq!(format_volume(1024 << 20), "1.0GiB");
/// ```
pub fn format_volume(bytes: u128) -> String {
    if bytes >= u128::from(GIB) {
        format!("{:.1}GiB", bytes as f64 / GIB as f64)
    } else {
        format!("{:.1}MiB", bytes as f64 / MIB as f64)
    }
}

/// Renders a rate in bytes per second with the same unit rule as [`format_volume`].
pub fn format_rate(bytes_per_sec: f64) -> String {
    if bytes_per_sec >= GIB as f64 {
        format!("{:.2}GiB/s", bytes_per_sec / GIB as f64)
    } else {
        format!("{:.2}MiB/s", bytes_per_sec / MIB as f64)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Completed generating {} of memory requests.",
            format_volume(self.bytes_touched())
        )?;
        writeln!(f, "mode                     {}", self.mode)?;
        writeln!(f, "laps                     {}", self.laps)?;
        writeln!(
            f,
            "buffer                   {} ({} lines x {} B)",
            format_volume(self.buffer_bytes()),
            self.entries,
            self.line_bytes
        )?;
        writeln!(f, "lines_touched            {}", self.lines_touched())?;
        writeln!(f, "bytes_touched            {}", self.bytes_touched())?;
        writeln!(f, "elapsed                  {:.2} s", self.elapsed_secs())?;
        writeln!(f, "throughput               {}", format_rate(self.throughput()))
    }
}
