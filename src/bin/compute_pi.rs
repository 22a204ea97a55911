//! Command-line front end: computes π to a requested number of digits and writes it to a file.
//!
//! Set `RUST_LOG=chudnovsky=debug` to follow workers and partitions.

#![allow(clippy::print_stdout)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use chudnovsky::{
    CheckpointStore, Computation, DirStore, OutputLayout, PartitionPolicy, PoolBackend, RunConfig,
    default_workers, render,
};

/// Characters of π echoed to the terminal.
const PREVIEW_CHARS: usize = 30;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolicyArg {
    /// Equal term counts per partition.
    Equal,
    /// Fewer terms in later, more expensive partitions.
    Weighted,
    /// Fixed-size partitions, see --chunk-size.
    Chunked,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Sequential,
    Threads,
    Rayon,
}

impl From<BackendArg> for PoolBackend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Sequential => PoolBackend::Sequential,
            BackendArg::Threads => PoolBackend::Threads,
            BackendArg::Rayon => PoolBackend::Rayon,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    /// A single line, `3.14159...`.
    Plain,
    /// Run header followed by grouped, counted digits.
    Validation,
}

impl From<LayoutArg> for OutputLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Plain => OutputLayout::Plain,
            LayoutArg::Validation => OutputLayout::Validation,
        }
    }
}

/// Computes decimal digits of π with the Chudnovsky series.
#[derive(Parser, Debug)]
#[command(name = "compute-pi", version)]
struct Args {
    /// Number of decimal digits after the point.
    #[arg(short = 'n', long, default_value_t = 1000)]
    num_digits: u64,

    /// Worker count (default: available parallelism).
    #[arg(short, long)]
    workers: Option<usize>,

    /// Number of series terms (default: derived from the digit count).
    #[arg(long)]
    terms: Option<u64>,

    #[arg(long, value_enum, default_value_t = PolicyArg::Equal)]
    policy: PolicyArg,

    /// Terms per partition for the chunked policy.
    #[arg(long, default_value_t = 64)]
    chunk_size: u64,

    #[arg(long, value_enum, default_value_t = BackendArg::Threads)]
    backend: BackendArg,

    #[arg(long, value_enum, default_value_t = LayoutArg::Plain)]
    layout: LayoutArg,

    /// Output file.
    #[arg(short, long, default_value = "pi.txt")]
    output: PathBuf,

    /// Directory for per-partition checkpoints; reused on the next run.
    #[arg(long)]
    checkpoint_dir: Option<PathBuf>,

    /// Memoize evaluated sub-ranges within each worker.
    #[arg(long)]
    memoize: bool,
}

impl Args {
    fn config(&self) -> Result<RunConfig> {
        let policy = match self.policy {
            PolicyArg::Equal => PartitionPolicy::Equal,
            PolicyArg::Weighted => PartitionPolicy::Weighted,
            PolicyArg::Chunked => {
                if self.chunk_size == 0 {
                    bail!("--chunk-size must be at least 1");
                }
                PartitionPolicy::Chunked {
                    size: self.chunk_size,
                }
            }
        };
        let mut config = RunConfig::new(self.num_digits)
            .with_workers(self.workers.unwrap_or_else(default_workers))
            .with_policy(policy)
            .with_backend(self.backend.into())
            .with_memoization(self.memoize);
        if let Some(terms) = self.terms {
            config = config.with_terms(terms);
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let store = match &args.checkpoint_dir {
        Some(dir) => Some(
            DirStore::open(dir)
                .with_context(|| format!("cannot use checkpoint dir {}", dir.display()))?,
        ),
        None => None,
    };

    let mut computation = Computation::new(config).context("invalid run configuration")?;
    if let Some(store) = &store {
        computation = computation.with_checkpoints(store as &dyn CheckpointStore);
    }
    let outcome = computation.run().context("computation failed")?;

    println!("{}...", outcome.digits.leading(PREVIEW_CHARS));
    println!(
        "{} digits in {:.3} s",
        outcome.digits.digit_count(),
        outcome.summary.elapsed.as_secs_f64()
    );

    let text = render(&outcome.digits, args.layout.into(), &outcome.summary);
    fs::write(&args.output, text)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    info!(path = %args.output.display(), "digits written");
    Ok(())
}
