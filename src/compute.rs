//! Driving a whole run: partition, dispatch, aggregate, convert.

use std::time::Instant;

use tracing::{info, warn};

use crate::aggregate::{aggregate, pi_digits};
use crate::checkpoint::CheckpointStore;
use crate::config::RunConfig;
use crate::error::PiError;
use crate::format::{PiDigits, RunSummary};
use crate::partition::{assign, partition};
use crate::pool::WorkerPool;
use crate::precision::Precision;
use crate::series::SplitResult;
use crate::worker::{Job, WorkerReport};

/// Returns the first `digits` decimals of π with default settings.
///
/// ```
/// let pi = chudnovsky::compute_pi(20)?;
/// assert_eq!(pi.to_string(), "3.14159265358979323846");
/// # Ok::<(), chudnovsky::PiError>(())
/// ```
pub fn compute_pi(digits: u64) -> Result<PiDigits, PiError> {
    Ok(Computation::new(RunConfig::new(digits))?.run()?.digits)
}

/// Same as [`compute_pi`] with an explicit term count and worker count.
pub fn compute_with_terms(digits: u64, terms: u64, workers: usize) -> Result<PiDigits, PiError> {
    let config = RunConfig::new(digits)
        .with_terms(terms)
        .with_workers(workers);
    Ok(Computation::new(config)?.run()?.digits)
}

/// Result of a completed run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiOutcome {
    pub digits: PiDigits,
    /// Final triple for `[0, N)`.
    pub result: SplitResult,
    pub summary: RunSummary,
}

/// One validated run, ready to execute.
pub struct Computation<'a> {
    config: RunConfig,
    precision: Precision,
    checkpoints: Option<&'a dyn CheckpointStore>,
}

impl<'a> Computation<'a> {
    /// Validates `config` and fixes the precision. Nothing is computed yet.
    pub fn new(config: RunConfig) -> Result<Self, PiError> {
        let precision = config.validate()?;
        Ok(Self {
            config,
            precision,
            checkpoints: None,
        })
    }

    /// Reads partition triples from `store` where present and records fresh ones in it.
    pub fn with_checkpoints(mut self, store: &'a dyn CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Runs on the pool selected by the configuration.
    pub fn run(&self) -> Result<PiOutcome, PiError> {
        let pool = self.config.backend().build(self.config.workers())?;
        self.run_with(pool.as_ref())
    }

    /// Runs on `pool`.
    pub fn run_with(&self, pool: &dyn WorkerPool) -> Result<PiOutcome, PiError> {
        let started = Instant::now();
        let terms = self.config.terms();
        let workers = self.config.workers();
        let partitions = partition(terms, workers, self.config.policy())?;
        let assignments = assign(&partitions, workers)?;
        info!(
            digits = self.precision.digits(),
            bits = self.precision.bits(),
            terms,
            partitions = partitions.len(),
            workers = assignments.len(),
            pool = pool.name(),
            "computing pi"
        );

        let mut job = Job::new(self.precision).with_memoization(self.config.memoize());
        if let Some(store) = self.checkpoints {
            job = job.with_checkpoints(store);
        }

        let reports = pool.run(&job, &assignments).inspect_err(|error| {
            warn!(%error, "evaluation failed");
        })?;
        let restored: usize = reports.iter().map(WorkerReport::restored).sum();
        let result = aggregate(&reports, terms, &self.precision)?;
        let digits = pi_digits(&result, &self.precision)?;

        let summary = RunSummary {
            digits: self.precision.digits(),
            bits: self.precision.bits(),
            terms,
            workers: assignments.len(),
            partitions: partitions.len(),
            restored,
            policy: self.config.policy(),
            backend: self.config.backend(),
            elapsed: started.elapsed(),
        };
        info!(
            elapsed_ms = summary.elapsed.as_millis(),
            restored,
            "pi computed"
        );
        Ok(PiOutcome {
            digits,
            result,
            summary,
        })
    }
}
