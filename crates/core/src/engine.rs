//! Traversal engine.
//!
//! The engine owns the entry arena for the duration of a run and walks it lap by lap:
//! 1. **Preparation:** Allocates the arena, links the ring and, in random mode, shuffles
//!    it into a single cycle (optionally verified) before any timing starts.
//! 2. **Laps:** A sequential lap touches every entry in array order; a random lap makes
//!    N dependent `next` hops from the current cursor, which carries over between laps.
//! 3. **Timing:** [`Traversal::run`] timestamps immediately before the first lap and
//!    after the last, and returns a [`RunReport`].

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use tracing::{debug, info};

use crate::arena::EntryArena;
use crate::clock::Clock;
use crate::common::Result;
use crate::config::{AccessMode, CacheGeometry, Config, Iterations};
use crate::permutation;
use crate::report::RunReport;

/// A prepared arena plus the state of the walk over it.
#[derive(Debug)]
pub struct Traversal {
    arena: EntryArena,
    mode: AccessMode,
    cursor: usize,
    laps: u64,
}

impl Traversal {
    /// Allocates and arranges an arena as described by `config`.
    ///
    /// Random mode seeds a [`StdRng`] from `config.run.seed`, or from OS entropy when
    /// no seed is given. With `config.run.verify` set the single-cycle invariant is
    /// checked before returning.
    ///
    /// # Errors
    ///
    /// Propagates geometry, allocation and arrangement errors.
    pub fn prepare(config: &Config) -> Result<Self> {
        let mut rng = match config.run.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let traversal = Self::with_rng(&config.cache, config.run.mode, &mut rng)?;
        if config.run.verify {
            traversal.verify()?;
            debug!("arrangement verified");
        }
        Ok(traversal)
    }

    /// Allocates an arena for `geometry` and arranges it for `mode` using `rng`.
    ///
    /// # Errors
    ///
    /// Propagates geometry and allocation errors from [`EntryArena::new`].
    pub fn with_rng<R: Rng>(
        geometry: &CacheGeometry,
        mode: AccessMode,
        rng: &mut R,
    ) -> Result<Self> {
        let mut arena = EntryArena::new(geometry)?;
        match mode {
            AccessMode::Sequential => permutation::link_ring(&mut arena)?,
            AccessMode::Random => permutation::build(&mut arena, rng)?,
        }
        Ok(Self::from_arena(arena, mode))
    }

    /// Wraps an already arranged arena. The cursor starts at entry 0.
    pub const fn from_arena(arena: EntryArena, mode: AccessMode) -> Self {
        Self {
            arena,
            mode,
            cursor: 0,
            laps: 0,
        }
    }

    /// Checks that the arena holds a single cycle over every entry.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::BrokenCycle`](crate::common::ThrashError::BrokenCycle)
    /// describing the first violation.
    pub fn verify(&self) -> Result<()> {
        permutation::check_single_cycle(&self.arena)
    }

    /// The access pattern.
    pub const fn mode(&self) -> AccessMode {
        self.mode
    }

    /// The arena being walked.
    pub const fn arena(&self) -> &EntryArena {
        &self.arena
    }

    /// Entry the next random lap starts from.
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Moves the random-walk cursor.
    ///
    /// # Panics
    ///
    /// Panics if `cursor` is not an entry index.
    pub fn set_cursor(&mut self, cursor: usize) {
        assert!(cursor < self.arena.len(), "cursor {cursor} out of bounds");
        self.cursor = cursor;
    }

    /// Laps completed so far.
    pub const fn laps(&self) -> u64 {
        self.laps
    }

    /// Performs one lap, visiting every entry exactly once.
    #[inline]
    pub fn lap(&mut self) {
        match self.mode {
            AccessMode::Sequential => {
                for i in 0..self.arena.len() {
                    self.arena.touch(i);
                }
            }
            AccessMode::Random => {
                let mut cursor = self.cursor;
                for _ in 0..self.arena.len() {
                    cursor = self.arena.visit(cursor);
                }
                self.cursor = cursor;
            }
        }
        self.laps += 1;
    }

    /// Runs the requested number of laps between two timestamps from `clock`.
    ///
    /// With [`Iterations::Unbounded`] this never returns; the process is expected to
    /// be terminated externally.
    ///
    /// # Errors
    ///
    /// Returns [`ThrashError::Clock`](crate::common::ThrashError::Clock) if either
    /// timestamp cannot be taken.
    pub fn run<C: Clock + ?Sized>(
        &mut self,
        iterations: Iterations,
        clock: &C,
    ) -> Result<RunReport> {
        info!(
            mode = %self.mode,
            entries = self.arena.len(),
            bytes = self.arena.bytes(),
            %iterations,
            "starting run"
        );

        let before = self.laps;
        let start = clock.now()?;
        match iterations {
            Iterations::Finite(count) => {
                for _ in 0..count {
                    self.lap();
                }
            }
            Iterations::Unbounded => loop {
                self.lap();
            },
        }
        let end = clock.now()?;

        let report = RunReport {
            mode: self.mode,
            laps: self.laps - before,
            entries: self.arena.len(),
            line_bytes: self.arena.line_bytes(),
            elapsed: end.saturating_sub(start),
        };
        info!(laps = report.laps, elapsed = ?report.elapsed, "run complete");
        Ok(report)
    }
}
