use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{PiError, STOPPED_REASON};

/// Run-wide cancellation signal that only ever moves from "running" to "stopped".
///
/// Raised by the first worker that fails. Workers poll it between partitions, so the
/// others stop picking up new work; the run fails either way.
#[derive(Debug, Default)]
pub struct StopFlag {
    stopped: AtomicBool,
}

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// `Ok` while the run is live, otherwise the failure `worker` reports instead of
    /// starting `partition`.
    pub fn check(&self, worker: usize, partition: usize) -> Result<(), PiError> {
        if self.is_stopped() {
            return Err(PiError::worker_failure(worker, Some(partition), STOPPED_REASON));
        }
        Ok(())
    }
}
