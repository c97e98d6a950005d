//! Memory-bus stress generator CLI.
//!
//! This binary drives a single run of the stress generator. It performs:
//! 1. **Argument parsing:** Mode, iteration count, seed and cache geometry overrides, with an
//!    optional JSON config file underneath.
//! 2. **Run:** Allocates and arranges the buffer, then times the requested laps. Without an
//!    iteration count the laps repeat until the process is interrupted.
//! 3. **Reporting:** Prints the volume of memory requests generated, elapsed time and
//!    throughput; failures exit with a status that identifies their category.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use thrasher_core::config::parse_iterations;
use thrasher_core::{AccessMode, Config, ErrorCategory, MonotonicClock, ThrashError, Traversal};

#[derive(Parser, Debug)]
#[command(
    name = "thrasher",
    author,
    version,
    about = "Stress the memory bus by generating last-level cache misses",
    long_about = "Walks a buffer several times larger than the last-level cache, either in array \
order (sequential) or by chasing pointers around a random single cycle (random), and reports \
how much memory traffic was generated and how long it took.\n\nExit status: 1 for invalid \
input, 2 if the buffer cannot be allocated, 3 if the clock fails.\n\nExamples:\n  thrasher 100\n  \
thrasher --mode random --seed 7 50\n  thrasher --llc-bytes 8388608 --line-bytes 64 20\n  \
thrasher --mode random   (runs until interrupted)"
)]
struct Cli {
    /// Number of laps over the buffer; omit to run until interrupted.
    #[arg(allow_negative_numbers = true)]
    iterations: Option<String>,

    /// Access pattern.
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Seed for the random cycle (defaults to OS entropy).
    #[arg(long)]
    seed: Option<u64>,

    /// Check the single-cycle invariant before timing.
    #[arg(long)]
    verify: bool,

    /// JSON configuration file; command-line flags take precedence.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Cache line size in bytes.
    #[arg(long)]
    line_bytes: Option<usize>,

    /// Last-level cache size in bytes.
    #[arg(long)]
    llc_bytes: Option<usize>,

    /// Multiple of the last-level cache the buffer spans.
    #[arg(long)]
    oversize: Option<usize>,

    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    /// Array-order scan.
    Sequential,
    /// Pointer chase around a random single cycle.
    Random,
}

impl From<Mode> for AccessMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Sequential => Self::Sequential,
            Mode::Random => Self::Random,
        }
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                i32::from(ErrorCategory::Configuration.exit_code())
            } else {
                0
            };
            process::exit(code);
        }
    };

    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        debug!(category = ?e.category(), exit_code = e.exit_code(), "run failed");
        eprintln!("Error: {e}. Terminating...");
        process::exit(i32::from(e.exit_code()));
    }
}

/// Installs a stderr `fmt` subscriber so stdout carries only the report.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Builds the configuration, prepares the buffer and runs the timed laps.
///
/// The buffer is owned by this function, so it is released before the caller
/// exits on any error.
fn run(cli: &Cli) -> Result<(), ThrashError> {
    let config = build_config(cli)?;

    let mut traversal = Traversal::prepare(&config)?;
    if config.run.iterations.is_none() {
        warn!("no iteration count given; running until interrupted");
    }
    let report = traversal.run(config.run.laps(), &MonotonicClock)?;
    report.print();
    Ok(())
}

/// Merges the config file (if any) with command-line flags.
///
/// The iteration count is parsed first so malformed input is rejected before any
/// file is read or memory allocated.
fn build_config(cli: &Cli) -> Result<Config, ThrashError> {
    let iterations = cli.iterations.as_deref().map(parse_iterations).transpose()?;

    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };

    if let Some(mode) = cli.mode {
        config.run.mode = mode.into();
    }
    if iterations.is_some() {
        config.run.iterations = iterations;
    }
    if cli.seed.is_some() {
        config.run.seed = cli.seed;
    }
    config.run.verify |= cli.verify;

    if let Some(line_bytes) = cli.line_bytes {
        config.cache.line_bytes = line_bytes;
    }
    if let Some(llc_bytes) = cli.llc_bytes {
        config.cache.llc_bytes = llc_bytes;
    }
    if let Some(oversize) = cli.oversize {
        config.cache.oversize_factor = oversize;
    }
    config.cache.validate()?;

    Ok(config)
}
