//! Wall-clock timing source.
//!
//! The engine timestamps a run through the [`Clock`] trait so that a failing timing
//! source surfaces as [`ThrashError::Clock`] rather than a panic, and so tests can
//! substitute a scripted clock.

use std::time::Duration;

use crate::common::Result;
#[cfg(unix)]
use crate::common::ThrashError;

/// A monotonic timestamp source.
pub trait Clock {
    /// Returns the current time as an offset from an arbitrary fixed epoch.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::Clock`](crate::common::ThrashError::Clock) if the
    /// host cannot provide a timestamp.
    fn now(&self) -> Result<Duration>;
}

/// The host monotonic clock.
///
/// On Unix this reads `CLOCK_MONOTONIC` through `clock_gettime`, whose failure is
/// reported. Elsewhere it is backed by [`std::time::Instant`] and cannot fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[cfg(unix)]
    fn now(&self) -> Result<Duration> {
        let mut ts = libc::timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        // SAFETY: `ts` is a valid, writable timespec for the duration of the call.
        let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &raw mut ts) };
        if rc != 0 {
            return Err(ThrashError::Clock(std::io::Error::last_os_error()));
        }
        Ok(Duration::new(ts.tv_sec as u64, ts.tv_nsec as u32))
    }

    #[cfg(not(unix))]
    fn now(&self) -> Result<Duration> {
        use std::sync::OnceLock;
        use std::time::Instant;

        static EPOCH: OnceLock<Instant> = OnceLock::new();
        Ok(EPOCH.get_or_init(Instant::now).elapsed())
    }
}
