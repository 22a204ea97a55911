//! Evaluation of one worker's assignment.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace};

use crate::checkpoint::CheckpointStore;
use crate::concurrency::StopFlag;
use crate::error::PiError;
use crate::partition::{Assignment, Partition};
use crate::precision::Precision;
use crate::series::{SplitMemo, SplitResult, TermRange, split, split_memoized};

/// Read-only inputs shared by every worker of a run.
#[derive(Clone, Copy)]
pub struct Job<'a> {
    precision: Precision,
    memoize: bool,
    checkpoints: Option<&'a dyn CheckpointStore>,
}

impl<'a> Job<'a> {
    pub fn new(precision: Precision) -> Self {
        Self {
            precision,
            memoize: false,
            checkpoints: None,
        }
    }

    /// Keep a per-assignment memo table of evaluated ranges.
    pub fn with_memoization(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn with_checkpoints(mut self, store: &'a dyn CheckpointStore) -> Self {
        self.checkpoints = Some(store);
        self
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

impl fmt::Debug for Job<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("precision", &self.precision)
            .field("memoize", &self.memoize)
            .field("checkpoints", &self.checkpoints.is_some())
            .finish()
    }
}

/// The folded triple of one assignment, handed from a worker to the aggregator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerReport {
    worker: usize,
    range: TermRange,
    result: SplitResult,
    precision: Precision,
    partitions: usize,
    restored: usize,
}

impl WorkerReport {
    pub fn new(
        worker: usize,
        range: TermRange,
        result: SplitResult,
        precision: Precision,
    ) -> Self {
        Self {
            worker,
            range,
            result,
            precision,
            partitions: 1,
            restored: 0,
        }
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn range(&self) -> TermRange {
        self.range
    }

    pub fn result(&self) -> &SplitResult {
        &self.result
    }

    /// Precision the worker was dispatched under.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Partitions whose triple came from the checkpoint store.
    pub fn restored(&self) -> usize {
        self.restored
    }
}

/// Evaluates every partition of `assignment` and folds them left to right.
///
/// Stops early, with a `WorkerFailure`, once `stop` has been raised by another worker. A
/// panic while evaluating a partition becomes a `WorkerFailure` naming that partition.
pub fn run_assignment(
    job: &Job<'_>,
    assignment: &Assignment,
    stop: &StopFlag,
) -> Result<WorkerReport, PiError> {
    let worker = assignment.worker();
    let mut memo = job.memoize.then(SplitMemo::new);
    let mut folded: Option<SplitResult> = None;
    let mut restored = 0;

    for partition in assignment.partitions() {
        stop.check(worker, partition.index())?;
        let (partial, from_store) = panic::catch_unwind(AssertUnwindSafe(|| {
            evaluate_partition(job, partition, memo.as_mut())
        }))
        .unwrap_or_else(|payload| {
            Err(PiError::worker_failure(
                worker,
                Some(partition.index()),
                format!("panicked: {}", panic_message(payload.as_ref())),
            ))
        })?;
        restored += usize::from(from_store);
        trace!(
            worker,
            partition = partition.index(),
            range = %partition.range(),
            from_store,
            "partition evaluated"
        );
        folded = Some(match folded {
            None => partial,
            Some(previous) => previous.merge(&partial),
        });
    }

    let result = folded.ok_or_else(|| {
        PiError::worker_failure(worker, None, "assignment has no partitions")
    })?;
    debug!(
        worker,
        range = %assignment.range(),
        partitions = assignment.partitions().len(),
        restored,
        "assignment complete"
    );
    Ok(WorkerReport {
        worker,
        range: assignment.range(),
        result,
        precision: job.precision,
        partitions: assignment.partitions().len(),
        restored,
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Returns the partition's triple and whether it came from the checkpoint store.
fn evaluate_partition(
    job: &Job<'_>,
    partition: &Partition,
    memo: Option<&mut SplitMemo>,
) -> Result<(SplitResult, bool), PiError> {
    if let Some(store) = job.checkpoints
        && let Some(stored) = store.load(partition)?
    {
        return Ok((stored, true));
    }

    let result = match memo {
        Some(memo) => split_memoized(partition.range(), memo),
        None => split(partition.range()),
    };
    if let Some(store) = job.checkpoints {
        store.store(partition, &result)?;
    }
    Ok((result, false))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::checkpoint::MemoryStore;
    use crate::partition::{PartitionPolicy, assign, partition};
    use crate::test_utils::{precision, range};

    fn single_assignment(terms: u64, parts: usize) -> Assignment {
        let partitions = partition(terms, parts, PartitionPolicy::Equal).expect("valid");
        assign(&partitions, 1)
            .expect("valid")
            .into_iter()
            .next()
            .expect("one assignment")
    }

    #[test]
    fn folding_partitions_matches_splitting_the_whole_range() {
        let assignment = single_assignment(29, 5);
        let job = Job::new(precision(100));
        let report = run_assignment(&job, &assignment, &StopFlag::new()).expect("runs");
        assert_eq!(report.result(), &split(range(0, 29)));
        assert_eq!(report.range(), range(0, 29));
        assert_eq!(report.partitions(), 5);
        assert_eq!(report.precision(), precision(100));
    }

    #[test]
    fn memoization_does_not_change_the_result() {
        let assignment = single_assignment(40, 3);
        let plain = Job::new(precision(100));
        let memoized = plain.with_memoization(true);
        let stop = StopFlag::new();
        assert_eq!(
            run_assignment(&plain, &assignment, &stop).expect("runs"),
            run_assignment(&memoized, &assignment, &stop).expect("runs"),
        );
    }

    #[test]
    fn raised_stop_flag_aborts_before_any_partition() {
        let assignment = single_assignment(10, 2);
        let stop = StopFlag::new();
        stop.stop();
        let error = run_assignment(&Job::new(precision(10)), &assignment, &stop)
            .expect_err("stopped");
        assert!(error.is_stop());
    }

    #[test]
    fn checkpoints_are_written_then_reused() {
        let assignment = single_assignment(20, 4);
        let store = MemoryStore::new();
        let job = Job::new(precision(100)).with_checkpoints(&store);
        let stop = StopFlag::new();

        let cold = run_assignment(&job, &assignment, &stop).expect("runs");
        assert_eq!(cold.restored(), 0);
        assert_eq!(store.len(), 4);

        let warm = run_assignment(&job, &assignment, &stop).expect("runs");
        assert_eq!(warm.restored(), 4);
        assert_eq!(warm.result(), cold.result());
    }

    #[test]
    fn corrupt_checkpoints_fail_the_worker() {
        let assignment = single_assignment(20, 4);
        let store = MemoryStore::new();
        store.insert_raw(range(10, 15), range(0, 1), split(range(0, 1)));
        let job = Job::new(precision(100)).with_checkpoints(&store);
        let error = run_assignment(&job, &assignment, &StopFlag::new()).expect_err("corrupt");
        assert!(matches!(
            error,
            PiError::Checkpoint {
                partition: Some(2),
                ..
            }
        ));
    }
}
