//! Error types for the π computation.
//!
//! Every failure aborts the whole run. There is no partial-result mode, so none of these
//! variants carries a value that could be mistaken for a truncated digit string.

use std::fmt;

/// Reason attached to workers that gave up because another worker had already failed.
pub(crate) const STOPPED_REASON: &str = "stopped after another worker failed";

/// Errors that can occur while computing π.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PiError {
    /// The requested digit count is zero or larger than [`MAX_DIGITS`](crate::MAX_DIGITS).
    InvalidDigitCount { digits: u64 },
    /// There are no terms to evaluate or no workers to evaluate them.
    EmptyRange { terms: u64, workers: usize },
    /// An explicit term count too small to make `digits` decimals correct.
    InsufficientTerms { terms: u64, digits: u64 },
    /// A term range was empty or reversed.
    InvalidTermRange { start: u64, end: u64 },
    /// A worker did not complete its assignment.
    WorkerFailure {
        worker: usize,
        partition: Option<usize>,
        reason: String,
    },
    /// A component observed a working precision other than the one fixed for the run.
    PrecisionMismatch { expected: u64, found: u64 },
    /// The merged series sum was not positive, so it cannot be the sum for `[0, N)`.
    NonPositiveSum,
    /// The checkpoint store failed or held an entry that does not match its partition.
    Checkpoint {
        partition: Option<usize>,
        reason: String,
    },
}

impl PiError {
    pub(crate) fn worker_failure(
        worker: usize,
        partition: Option<usize>,
        reason: impl Into<String>,
    ) -> Self {
        Self::WorkerFailure {
            worker,
            partition,
            reason: reason.into(),
        }
    }

    pub(crate) fn checkpoint(partition: Option<usize>, reason: impl Into<String>) -> Self {
        Self::Checkpoint {
            partition,
            reason: reason.into(),
        }
    }

    /// True for failures caused only by another worker failing first.
    pub(crate) fn is_stop(&self) -> bool {
        matches!(self, Self::WorkerFailure { reason, .. } if reason == STOPPED_REASON)
    }
}

impl fmt::Display for PiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDigitCount { digits } => {
                write!(f, "invalid digit count {digits}: must be between 1 and {}", crate::MAX_DIGITS)
            }
            Self::EmptyRange { terms, workers } => {
                write!(f, "nothing to evaluate: {terms} terms across {workers} workers")
            }
            Self::InsufficientTerms { terms, digits } => write!(
                f,
                "{terms} terms cannot give {digits} correct digits; at least {} are needed",
                crate::config::min_terms_for_digits(*digits)
            ),
            Self::InvalidTermRange { start, end } => {
                write!(f, "term range [{start}, {end}) is empty")
            }
            Self::WorkerFailure {
                worker,
                partition: Some(partition),
                reason,
            } => write!(f, "worker {worker} failed on partition {partition}: {reason}"),
            Self::WorkerFailure {
                worker,
                partition: None,
                reason,
            } => write!(f, "worker {worker} failed: {reason}"),
            Self::PrecisionMismatch { expected, found } => write!(
                f,
                "precision mismatch: run is fixed at {expected} bits but {found} bits were observed"
            ),
            Self::NonPositiveSum => write!(f, "series sum is not positive"),
            Self::Checkpoint {
                partition: Some(partition),
                reason,
            } => write!(f, "checkpoint for partition {partition}: {reason}"),
            Self::Checkpoint {
                partition: None,
                reason,
            } => write!(f, "checkpoint store: {reason}"),
        }
    }
}

impl std::error::Error for PiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_failures_are_recognised() {
        let stopped = PiError::worker_failure(3, Some(7), STOPPED_REASON);
        assert!(stopped.is_stop());

        let real = PiError::worker_failure(3, Some(7), "out of memory");
        assert!(!real.is_stop());
        assert!(!PiError::NonPositiveSum.is_stop());
    }

    #[test]
    fn display_names_the_failing_partition() {
        let error = PiError::worker_failure(2, Some(5), "boom");
        assert_eq!(error.to_string(), "worker 2 failed on partition 5: boom");

        let error = PiError::InsufficientTerms {
            terms: 1,
            digits: 100,
        };
        assert_eq!(
            error.to_string(),
            "1 terms cannot give 100 correct digits; at least 8 are needed"
        );

        let error = PiError::checkpoint(None, "read-only directory");
        assert_eq!(error.to_string(), "checkpoint store: read-only directory");
    }
}
