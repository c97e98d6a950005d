//! Traversal Engine Unit Tests.
//!
//! Verifies lap semantics in both modes, cursor continuity across laps, zero-lap
//! runs, timing through a mocked clock, and preparation from a configuration.

use std::io;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::rstest;
use thrasher_core::common::{ErrorCategory, ThrashError};
use thrasher_core::config::RunConfig;
use thrasher_core::permutation::check_single_cycle;
use thrasher_core::{AccessMode, CacheGeometry, Config, Iterations, MonotonicClock, Traversal};

use crate::common::{MockTimer, counters, geometry, nexts, scripted_clock, walk};

fn random(entries: usize, seed: u64) -> Traversal {
    Traversal::with_rng(
        &geometry(entries),
        AccessMode::Random,
        &mut StdRng::seed_from_u64(seed),
    )
    .unwrap()
}

fn sequential(entries: usize) -> Traversal {
    Traversal::with_rng(
        &geometry(entries),
        AccessMode::Sequential,
        &mut StdRng::seed_from_u64(0),
    )
    .unwrap()
}

// ══════════════════════════════════════════════════════════
// 1. Sequential laps
// ══════════════════════════════════════════════════════════

#[test]
fn sequential_arrangement_is_array_order() {
    let traversal = sequential(6);
    assert_eq!(nexts(traversal.arena()), vec![1, 2, 3, 4, 5, 0]);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(10)]
fn sequential_laps_count_every_entry(#[case] laps: u64) {
    let mut traversal = sequential(64);
    for _ in 0..laps {
        traversal.lap();
    }
    assert_eq!(traversal.laps(), laps);
    assert!(counters(traversal.arena()).iter().all(|&c| c == laps));
}

#[test]
fn sequential_lap_ignores_cursor() {
    let mut traversal = sequential(16);
    traversal.set_cursor(9);
    traversal.lap();
    assert_eq!(traversal.cursor(), 9);
    assert_eq!(counters(traversal.arena()), vec![1; 16]);
}

// ══════════════════════════════════════════════════════════
// 2. Random laps
// ══════════════════════════════════════════════════════════

#[test]
fn random_arrangement_is_single_cycle() {
    let traversal = random(257, 5);
    check_single_cycle(traversal.arena()).unwrap();
}

#[test]
fn random_lap_visits_each_entry_once_from_any_start() {
    let mut traversal = random(128, 11);
    for (lap, start) in [0, 1, 77, 127].into_iter().enumerate() {
        traversal.set_cursor(start);
        traversal.lap();
        let expected = lap as u64 + 1;
        assert!(
            counters(traversal.arena()).iter().all(|&c| c == expected),
            "lap from {start} did not touch every entry exactly once"
        );
    }
}

#[test]
fn random_lap_returns_to_its_start() {
    let mut traversal = random(100, 3);
    traversal.set_cursor(42);
    traversal.lap();
    assert_eq!(traversal.cursor(), 42);
}

#[test]
fn random_laps_continue_from_previous_position() {
    let mut traversal = random(50, 8);
    let order = walk(traversal.arena(), 0, 50);

    for _ in 0..5 {
        let before = traversal.cursor();
        traversal.lap();
        // Each lap ends where the next one starts.
        assert_eq!(traversal.cursor(), before);
    }

    // Moving the cursor mid-cycle makes the next lap start there.
    traversal.set_cursor(order[17]);
    traversal.lap();
    assert_eq!(traversal.cursor(), order[17]);
    assert!(counters(traversal.arena()).iter().all(|&c| c == 6));
}

#[test]
fn random_laps_keep_arrangement() {
    let mut traversal = random(64, 21);
    let before = nexts(traversal.arena());
    for _ in 0..4 {
        traversal.lap();
    }
    assert_eq!(nexts(traversal.arena()), before);
}

#[test]
fn two_entry_random_walk() {
    let mut traversal = random(2, 0);
    traversal.lap();
    traversal.lap();
    assert_eq!(counters(traversal.arena()), vec![2, 2]);
}

#[test]
#[should_panic(expected = "out of bounds")]
fn cursor_out_of_range_panics() {
    let mut traversal = random(8, 0);
    traversal.set_cursor(8);
}

// ══════════════════════════════════════════════════════════
// 3. Timed runs
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::sequential(AccessMode::Sequential)]
#[case::random(AccessMode::Random)]
fn run_reports_laps_and_elapsed(#[case] mode: AccessMode) {
    let mut traversal =
        Traversal::with_rng(&geometry(32), mode, &mut StdRng::seed_from_u64(1)).unwrap();
    let clock = scripted_clock(&[Duration::from_millis(1_000), Duration::from_millis(3_500)]);

    let report = traversal.run(Iterations::Finite(4), &clock).unwrap();

    assert_eq!(report.mode, mode);
    assert_eq!(report.laps, 4);
    assert_eq!(report.entries, 32);
    assert_eq!(report.line_bytes, 32);
    assert_eq!(report.elapsed, Duration::from_millis(2_500));
    assert_eq!(report.bytes_touched(), 4 * 32 * 32);
    assert!(counters(traversal.arena()).iter().all(|&c| c == 4));
}

#[test]
fn zero_iterations_runs_no_laps() {
    let mut traversal = random(16, 2);
    let stamp = Duration::from_secs(7);
    let clock = scripted_clock(&[stamp, stamp]);

    let report = traversal.run(Iterations::Finite(0), &clock).unwrap();

    assert_eq!(report.laps, 0);
    assert_eq!(report.elapsed, Duration::ZERO);
    assert_eq!(report.bytes_touched(), 0);
    assert_eq!(traversal.laps(), 0);
    assert!(counters(traversal.arena()).iter().all(|&c| c == 0));
}

#[test]
fn report_counts_only_timed_laps() {
    let mut traversal = sequential(8);
    traversal.lap();
    let clock = scripted_clock(&[Duration::ZERO, Duration::from_secs(1)]);
    let report = traversal.run(Iterations::Finite(2), &clock).unwrap();
    assert_eq!(report.laps, 2);
    assert_eq!(traversal.laps(), 3);
}

#[test]
fn clock_failure_before_start_is_environment_error() {
    let mut traversal = sequential(8);
    let mut clock = MockTimer::new();
    clock
        .expect_now()
        .times(1)
        .returning(|| Err(ThrashError::Clock(io::Error::other("clock_gettime failed"))));

    let err = traversal.run(Iterations::Finite(3), &clock).unwrap_err();

    assert!(matches!(err, ThrashError::Clock(_)));
    assert_eq!(err.category(), ErrorCategory::Environment);
    assert_eq!(err.exit_code(), 3);
    assert_eq!(traversal.laps(), 0);
}

#[test]
fn clock_failure_after_laps_is_reported() {
    let mut traversal = sequential(8);
    let mut clock = MockTimer::new();
    let mut calls = 0;
    clock.expect_now().times(2).returning(move || {
        calls += 1;
        if calls == 1 {
            Ok(Duration::ZERO)
        } else {
            Err(ThrashError::Clock(io::Error::other("clock went away")))
        }
    });

    let err = traversal.run(Iterations::Finite(2), &clock).unwrap_err();
    assert_eq!(err.exit_code(), 3);
    assert_eq!(traversal.laps(), 2);
}

#[test]
fn monotonic_clock_runs_forward() {
    let mut traversal = sequential(1024);
    let report = traversal.run(Iterations::Finite(3), &MonotonicClock).unwrap();
    assert_eq!(report.laps, 3);
    assert!(report.elapsed < Duration::from_secs(60));
}

// ══════════════════════════════════════════════════════════
// 4. Preparation from config
// ══════════════════════════════════════════════════════════

fn config(mode: AccessMode, entries: usize, seed: Option<u64>) -> Config {
    Config {
        cache: geometry(entries),
        run: RunConfig {
            mode,
            iterations: Some(1),
            seed,
            verify: true,
        },
    }
}

#[test]
fn prepare_random_with_seed_is_reproducible() {
    let first = Traversal::prepare(&config(AccessMode::Random, 300, Some(9))).unwrap();
    let second = Traversal::prepare(&config(AccessMode::Random, 300, Some(9))).unwrap();
    assert_eq!(nexts(first.arena()), nexts(second.arena()));
    assert_eq!(first.mode(), AccessMode::Random);
}

#[test]
fn prepare_random_without_seed_verifies() {
    let traversal = Traversal::prepare(&config(AccessMode::Random, 300, None)).unwrap();
    traversal.verify().unwrap();
}

#[test]
fn prepare_sequential_verifies() {
    let traversal = Traversal::prepare(&config(AccessMode::Sequential, 10, None)).unwrap();
    assert_eq!(traversal.mode(), AccessMode::Sequential);
    traversal.verify().unwrap();
}

#[test]
fn prepare_surfaces_allocation_failure() {
    let mut config = config(AccessMode::Random, 2, Some(1));
    config.cache = CacheGeometry {
        line_bytes: 64,
        llc_bytes: 1 << (usize::BITS - 2),
        oversize_factor: 1,
    };
    let err = Traversal::prepare(&config).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Resource);
}

#[test]
fn prepare_surfaces_invalid_geometry() {
    let mut config = config(AccessMode::Sequential, 2, None);
    config.cache.line_bytes = 24;
    let err = Traversal::prepare(&config).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Configuration);
}
