//! Executors that run worker assignments.
//!
//! The numeric core only needs one capability from an executor: evaluate a list of
//! assignments and hand back one report per assignment, in submission order. Every backend
//! here joins all of its workers before returning; none aggregates incrementally.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::unbounded;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::concurrency::StopFlag;
use crate::error::PiError;
use crate::partition::Assignment;
use crate::worker::{Job, WorkerReport, panic_message, run_assignment};

/// Something that can evaluate assignments, however it schedules them.
pub trait WorkerPool: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs every assignment to completion and returns the reports in the order of
    /// `assignments`. Fails if any worker fails.
    fn run(&self, job: &Job<'_>, assignments: &[Assignment]) -> Result<Vec<WorkerReport>, PiError>;
}

/// Which [`WorkerPool`] to build for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PoolBackend {
    /// Everything on the calling thread.
    Sequential,
    /// One scoped OS thread per assignment.
    #[default]
    Threads,
    /// A dedicated rayon thread pool.
    Rayon,
}

impl PoolBackend {
    pub fn build(self, workers: usize) -> Result<Box<dyn WorkerPool>, PiError> {
        Ok(match self {
            Self::Sequential => Box::new(SequentialPool),
            Self::Threads => Box::new(ScopedThreadPool),
            Self::Rayon => Box::new(RayonPool::new(workers)?),
        })
    }
}

impl fmt::Display for PoolBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => write!(f, "sequential"),
            Self::Threads => write!(f, "threads"),
            Self::Rayon => write!(f, "rayon"),
        }
    }
}

/// Runs assignments one after another on the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialPool;

impl WorkerPool for SequentialPool {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn run(&self, job: &Job<'_>, assignments: &[Assignment]) -> Result<Vec<WorkerReport>, PiError> {
        let stop = StopFlag::new();
        assignments
            .iter()
            .map(|assignment| guarded_run(job, assignment, &stop))
            .collect()
    }
}

/// Spawns one scoped thread per assignment and collects reports over a channel.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScopedThreadPool;

impl WorkerPool for ScopedThreadPool {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn run(&self, job: &Job<'_>, assignments: &[Assignment]) -> Result<Vec<WorkerReport>, PiError> {
        let stop = StopFlag::new();
        let (report_tx, report_rx) = unbounded();

        thread::scope(|scope| {
            for (slot, assignment) in assignments.iter().enumerate() {
                let report_tx = report_tx.clone();
                let stop = &stop;
                scope.spawn(move || {
                    let outcome = guarded_run(job, assignment, stop);
                    // The receiver outlives the scope, so this only fails if it was dropped.
                    let _ = report_tx.send((slot, outcome));
                });
            }
        });
        drop(report_tx);

        let mut slots: Vec<Option<Result<WorkerReport, PiError>>> =
            (0..assignments.len()).map(|_| None).collect();
        for (slot, outcome) in report_rx.iter() {
            if let Some(entry) = slots.get_mut(slot) {
                *entry = Some(outcome);
            }
        }

        let outcomes = slots
            .into_iter()
            .enumerate()
            .map(|(slot, outcome)| {
                outcome.unwrap_or_else(|| {
                    let worker = assignments.get(slot).map_or(slot, Assignment::worker);
                    Err(PiError::worker_failure(worker, None, "worker exited without reporting"))
                })
            })
            .collect();
        settle(outcomes)
    }
}

/// Runs assignments on a private rayon pool with a fixed number of threads.
pub struct RayonPool {
    pool: rayon::ThreadPool,
}

impl RayonPool {
    pub fn new(threads: usize) -> Result<Self, PiError> {
        if threads == 0 {
            return Err(PiError::EmptyRange {
                terms: 0,
                workers: 0,
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("pi-worker-{index}"))
            .build()
            .map_err(|err| PiError::worker_failure(0, None, format!("cannot start pool: {err}")))?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl fmt::Debug for RayonPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonPool")
            .field("threads", &self.threads())
            .finish()
    }
}

impl WorkerPool for RayonPool {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn run(&self, job: &Job<'_>, assignments: &[Assignment]) -> Result<Vec<WorkerReport>, PiError> {
        let stop = StopFlag::new();
        // Indexed parallel iterators collect in input order, not completion order.
        let outcomes = self.pool.install(|| {
            assignments
                .par_iter()
                .map(|assignment| guarded_run(job, assignment, &stop))
                .collect::<Vec<_>>()
        });
        settle(outcomes)
    }
}

/// Runs one assignment, turning panics outside partition evaluation into `WorkerFailure`
/// and raising `stop` on failure.
fn guarded_run(
    job: &Job<'_>,
    assignment: &Assignment,
    stop: &StopFlag,
) -> Result<WorkerReport, PiError> {
    debug!(
        worker = assignment.worker(),
        range = %assignment.range(),
        "worker started"
    );
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| run_assignment(job, assignment, stop)))
        .unwrap_or_else(|payload| {
            Err(PiError::worker_failure(
                assignment.worker(),
                None,
                format!("panicked: {}", panic_message(payload.as_ref())),
            ))
        });
    if let Err(error) = &outcome
        && !error.is_stop()
    {
        warn!(worker = assignment.worker(), %error, "worker failed");
        stop.stop();
    }
    outcome
}

/// All reports in order, or the first failure that was not just a reaction to another one.
fn settle(outcomes: Vec<Result<WorkerReport, PiError>>) -> Result<Vec<WorkerReport>, PiError> {
    let mut reports = Vec::with_capacity(outcomes.len());
    let mut stopped = None;
    let mut failure = None;
    for outcome in outcomes {
        match outcome {
            Ok(report) => reports.push(report),
            Err(error) if error.is_stop() => {
                stopped.get_or_insert(error);
            }
            Err(error) => {
                failure.get_or_insert(error);
            }
        }
    }
    match failure.or(stopped) {
        Some(error) => Err(error),
        None => Ok(reports),
    }
}
