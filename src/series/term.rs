//! Term ranges and the leaf triple of a single Chudnovsky term.

use std::fmt;

use num_bigint::BigInt;
use num_traits::One;

use super::split::SplitResult;
use crate::error::PiError;

/// Constant part of the linear factor `13591409 + 545140134 k`.
pub const CHUDNOVSKY_A: u64 = 13_591_409;

/// Slope of the linear factor `13591409 + 545140134 k`.
pub const CHUDNOVSKY_B: u64 = 545_140_134;

/// `640320^3 / 24`.
pub const C3_OVER_24: u64 = 10_939_058_860_032_000;

/// Half-open range `[start, end)` of term indices. Never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermRange {
    start: u64,
    end: u64,
}

impl TermRange {
    pub fn new(start: u64, end: u64) -> Result<Self, PiError> {
        if start >= end {
            return Err(PiError::InvalidTermRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// The range `[k, k + 1)`.
    pub fn single(k: u64) -> Result<Self, PiError> {
        let end = k
            .checked_add(1)
            .ok_or(PiError::InvalidTermRange { start: k, end: k })?;
        Self::new(k, end)
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of terms in the range, always at least one.
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_leaf(&self) -> bool {
        self.len() == 1
    }

    /// `start + (end - start) / 2`.
    pub fn midpoint(&self) -> u64 {
        self.start + self.len() / 2
    }

    /// Splits into `[start, mid)` and `[mid, end)`; `None` unless `start < mid < end`.
    pub fn split_at(&self, mid: u64) -> Option<(TermRange, TermRange)> {
        (self.start < mid && mid < self.end).then_some((
            TermRange {
                start: self.start,
                end: mid,
            },
            TermRange {
                start: mid,
                end: self.end,
            },
        ))
    }

    /// True if `next` starts exactly where this range ends.
    pub fn is_followed_by(&self, next: &TermRange) -> bool {
        self.end == next.start
    }

    /// The range covering this one and `next`, if they are adjacent.
    pub fn join(&self, next: &TermRange) -> Option<TermRange> {
        self.is_followed_by(next).then_some(TermRange {
            start: self.start,
            end: next.end,
        })
    }
}

impl fmt::Display for TermRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Closed-form triple of term `k`.
///
/// ```text
/// k = 0:  P = 1,                        Q = 1,                  T = 13591409
/// k > 0:  P = -(6k-5)(2k-1)(6k-1),      Q = k^3 * 640320^3/24,  T = P * (13591409 + 545140134 k)
/// ```
///
/// `P / Q` is the ratio of term `k` to term `k - 1`: the factorial ratio
/// `(6k)! / ((3k)! (k!)^3)` over its predecessor, divided by `-640320^3`. The sign of
/// `(-640320^3)^k` lives in `P` and its magnitude in `Q`.
pub fn leaf(k: u64) -> SplitResult {
    if k == 0 {
        return SplitResult::new(BigInt::one(), BigInt::one(), BigInt::from(CHUDNOVSKY_A));
    }

    let k = BigInt::from(k);
    let six_k = &k * 6u32;
    let p = -((&six_k - 5u32) * (&k * 2u32 - 1u32) * (six_k - 1u32));
    let q = &k * &k * &k * C3_OVER_24;
    let t = &p * (k * CHUDNOVSKY_B + CHUDNOVSKY_A);
    SplitResult::new(p, q, t)
}
