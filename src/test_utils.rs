//! Shared test utilities for the series, partitioning and driver tests.

use crate::precision::Precision;
use crate::series::{SplitResult, TermRange, leaf};

/// The first 200 digits of π after the decimal point.
pub const PI_200: &str = concat!(
    "1415926535897932384626433832795028841971693993751058209749445923078164062862089986280348253421170679",
    "8214808651328230664709384460955058223172535940812848111745028410270193852110555964462294895493038196",
);

/// Creates the term range `[start, end)`.
///
/// # Panics
/// Panics if the range is empty.
pub fn range(start: u64, end: u64) -> TermRange {
    match TermRange::new(start, end) {
        Ok(range) => range,
        Err(err) => panic!("invalid test range [{start}, {end}): {err}"),
    }
}

/// Precision for `digits` decimals.
///
/// # Panics
/// Panics if `digits` is out of range.
pub fn precision(digits: u64) -> Precision {
    match Precision::for_digits(digits) {
        Ok(precision) => precision,
        Err(err) => panic!("invalid test digit count {digits}: {err}"),
    }
}

/// Folds the leaves of `range` strictly left to right, without any splitting.
pub fn sequential_fold(range: TermRange) -> SplitResult {
    (range.start()..range.end()).fold(SplitResult::identity(), |acc, k| acc.merge(&leaf(k)))
}
