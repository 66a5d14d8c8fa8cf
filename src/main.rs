//! # Main — CLI Entry Point
//!
//! Parses arguments, initializes logging and the Rayon pool, loads the
//! optional TOML config and routes each subcommand to its runner in
//! [`cli`].
//!
//! ## Subcommands
//!
//! - `predict <INDEX>`: nth prime (exact on the 10^k grid, refined otherwise).
//! - `estimate <INDEX>`: raw closed-form or Riemann estimate, no refinement.
//! - `scan <INDEX>`: adaptive window/step tuner (or one `--manual` scan).
//! - `generate --start <N> --count <K>`: consecutive probable primes.
//! - `batch <INDEX>...`: parallel predictions.
//!
//! Indices accept `123456`, `10^1234` and `1e100`.
//!
//! ## Global Options
//!
//! - `--config` / `NTHPRIME_CONFIG`: TOML file with `[predict]` and `[scan]`
//!   tables. Flags override file values.
//! - `--json`: machine-readable output on stdout.
//! - `--threads`: Rayon pool size for `batch` (defaults to all cores).
//!
//! Logs go to stderr. `LOG_FORMAT=json` switches them to JSON lines and
//! `RUST_LOG` sets the filter (default `warn`).

mod cli;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "nthprime", version = nthprime::VERSION, about = "Predict the nth prime for very large n")]
struct Cli {
    /// TOML config file with [predict] and [scan] tables
    #[arg(long, global = true, env = "NTHPRIME_CONFIG")]
    config: Option<PathBuf>,

    /// Emit JSON on stdout instead of human-readable text
    #[arg(long, global = true)]
    json: bool,

    /// Number of rayon worker threads (defaults to all logical cores)
    #[arg(long, global = true)]
    threads: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum MethodArg {
    /// Calibrated closed-form asymptotic
    ClosedForm,
    /// Newton inversion of Riemann's R(x)
    Riemann,
}

/// Estimation and oracle settings shared by predict, estimate and batch.
#[derive(Args, Clone, Debug, Default)]
struct PredictFlags {
    /// MPFR working precision in bits (64..=131072; automatic when unset)
    #[arg(long)]
    prec: Option<u32>,

    /// Miller-Rabin rounds (bit-length schedule when unset)
    #[arg(long)]
    mr_rounds: Option<u32>,

    /// Wheel modulus for candidate skipping (30 or 210)
    #[arg(long)]
    wheel: Option<u64>,

    /// Estimation method
    #[arg(long, value_enum)]
    method: Option<MethodArg>,

    /// Refine forward only (smallest probable prime >= estimate)
    #[arg(long)]
    forward: bool,

    /// Skip the exact 10^k lookup grid
    #[arg(long)]
    no_table: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict the nth prime
    Predict {
        /// Prime index n (e.g. 1000000, 10^1234, 1e100)
        index: String,
        #[command(flatten)]
        flags: PredictFlags,
    },
    /// Print the estimate for p_n without refining it
    Estimate {
        /// Prime index n
        index: String,
        /// Estimation method
        #[arg(long, value_enum, default_value_t = MethodArg::ClosedForm)]
        method: MethodArg,
        /// MPFR working precision in bits
        #[arg(long)]
        prec: Option<u32>,
    },
    /// Tune window/step until the neighborhood of the estimate holds the target prime count
    Scan {
        /// Prime index n
        index: String,
        /// Initial half-width, in wheel turns
        #[arg(long)]
        window: Option<u64>,
        /// Offset increment, in wheel turns
        #[arg(long)]
        step: Option<u64>,
        /// Wheel modulus (30 or 210)
        #[arg(long)]
        wheel: Option<u64>,
        /// Target prime count
        #[arg(long)]
        target: Option<u32>,
        /// Maximum tuning iterations
        #[arg(long)]
        max_iters: Option<u32>,
        /// Miller-Rabin rounds per candidate
        #[arg(long)]
        mr_rounds: Option<u32>,
        /// MPFR working precision in bits
        #[arg(long)]
        prec: Option<u32>,
        /// Single scan with the given window/step, no tuning
        #[arg(long)]
        manual: bool,
    },
    /// Generate consecutive probable primes
    Generate {
        /// First value to consider (e.g. 10^1234)
        #[arg(long)]
        start: String,
        /// Number of primes to generate
        #[arg(long, default_value_t = 10)]
        count: u64,
        /// Print presieve and oracle statistics
        #[arg(long)]
        stats: bool,
    },
    /// Predict several indices in parallel
    Batch {
        /// Prime indices
        #[arg(required = true)]
        indices: Vec<String>,
        #[command(flatten)]
        flags: PredictFlags,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let cli = Cli::parse();
    cli::configure_rayon(cli.threads);
    let config = cli::load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Predict { index, flags } => cli::run_predict(&cli, &config, index, flags),
        Commands::Estimate {
            index,
            method,
            prec,
        } => cli::run_estimate(&cli, &config, index, *method, *prec),
        Commands::Scan {
            index,
            window,
            step,
            wheel,
            target,
            max_iters,
            mr_rounds,
            prec,
            manual,
        } => {
            let overrides = cli::ScanOverrides {
                window: *window,
                step: *step,
                wheel: *wheel,
                target: *target,
                max_iters: *max_iters,
                mr_rounds: *mr_rounds,
                prec: *prec,
            };
            cli::run_scan(&cli, &config, index, &overrides, *manual)
        }
        Commands::Generate {
            start,
            count,
            stats,
        } => cli::run_generate(&cli, start, *count, *stats),
        Commands::Batch { indices, flags } => cli::run_batch(&cli, &config, indices, flags),
    }
}
