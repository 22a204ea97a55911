//! Run configuration and the caller-side choices the numeric core takes as inputs.

use std::num::NonZeroUsize;
use std::thread;

use crate::error::PiError;
use crate::partition::PartitionPolicy;
use crate::pool::PoolBackend;
use crate::precision::{MAX_DIGITS, Precision};

/// Rational lower bound on the decimal digits contributed by each term,
/// log10(640320^3 / 1728) = 14.1816474627...
const DIGITS_PER_TERM_NUMERATOR: u128 = 14_181_647_462;
const DIGITS_PER_TERM_DENOMINATOR: u128 = 1_000_000_000;

/// Number of series terms needed for `digits` correct decimals.
///
/// `floor(digits / 14.181647462) + 2`, which keeps the truncation error of the series below
/// `10^-digits`.
pub fn terms_for_digits(digits: u64) -> u64 {
    let whole = u128::from(digits) * DIGITS_PER_TERM_DENOMINATOR / DIGITS_PER_TERM_NUMERATOR;
    u64::try_from(whole).unwrap_or(digits).saturating_add(2)
}

/// Smallest term count accepted for `digits` decimals.
///
/// Each term contributes a little over 14.18 digits, but the first few lose up to one digit
/// to the polynomial factor of the term, so one spare digit is demanded on top of `digits`.
pub fn min_terms_for_digits(digits: u64) -> u64 {
    let needed = (u128::from(digits) + 1) * DIGITS_PER_TERM_DENOMINATOR;
    u64::try_from(needed.div_ceil(DIGITS_PER_TERM_NUMERATOR)).unwrap_or(u64::MAX)
}

/// Worker count used when none is given: the available parallelism, or 1.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Everything that determines one run.
///
/// Built with chained setters and checked as a whole by [`RunConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunConfig {
    digits: u64,
    terms: Option<u64>,
    workers: usize,
    policy: PartitionPolicy,
    backend: PoolBackend,
    memoize: bool,
}

impl RunConfig {
    pub fn new(digits: u64) -> Self {
        Self {
            digits,
            terms: None,
            workers: default_workers(),
            policy: PartitionPolicy::default(),
            backend: PoolBackend::default(),
            memoize: false,
        }
    }

    /// Overrides the number of series terms derived from the digit count.
    pub fn with_terms(mut self, terms: u64) -> Self {
        self.terms = Some(terms);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_policy(mut self, policy: PartitionPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_backend(mut self, backend: PoolBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_memoization(mut self, memoize: bool) -> Self {
        self.memoize = memoize;
        self
    }

    pub fn digits(&self) -> u64 {
        self.digits
    }

    /// Explicit term count if one was set, otherwise [`terms_for_digits`].
    pub fn terms(&self) -> u64 {
        self.terms.unwrap_or_else(|| terms_for_digits(self.digits))
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn policy(&self) -> PartitionPolicy {
        self.policy
    }

    pub fn backend(&self) -> PoolBackend {
        self.backend
    }

    pub fn memoize(&self) -> bool {
        self.memoize
    }

    /// Checks every setting before any computation starts and fixes the run's precision.
    pub fn validate(&self) -> Result<Precision, PiError> {
        if self.digits == 0 || self.digits > MAX_DIGITS {
            return Err(PiError::InvalidDigitCount {
                digits: self.digits,
            });
        }
        let terms = self.terms();
        if terms == 0 || self.workers == 0 {
            return Err(PiError::EmptyRange {
                terms,
                workers: self.workers,
            });
        }
        if terms < min_terms_for_digits(self.digits) {
            return Err(PiError::InsufficientTerms {
                terms,
                digits: self.digits,
            });
        }
        if let PartitionPolicy::Chunked { size: 0 } = self.policy {
            return Err(PiError::EmptyRange {
                terms,
                workers: self.workers,
            });
        }
        Precision::for_digits(self.digits)
    }
}
