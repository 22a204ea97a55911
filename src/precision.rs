//! Working precision derived from the requested number of decimal digits.

use crate::error::PiError;

/// Extra bits kept beyond what the requested digits need.
///
/// They absorb the rounding of the final division, the square root and the decimal conversion.
pub const GUARD_BITS: u64 = 64;

/// Largest digit count accepted for a run.
pub const MAX_DIGITS: u64 = 1_000_000_000;

/// Rational upper bound on log2(10) = 3.32192809488736...
const LOG2_10_NUMERATOR: u128 = 3_321_928_095;
const LOG2_10_DENOMINATOR: u128 = 1_000_000_000;

/// Precision of one run: the requested decimal digits and the binary working precision.
///
/// Fixed once from the digit count and shared read-only by every component of the run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Precision {
    digits: u64,
    bits: u64,
}

impl Precision {
    /// Returns the precision needed to produce `digits` correct decimal digits.
    ///
    /// `bits = ceil(digits * log2(10)) + GUARD_BITS`, computed with integers only.
    ///
    /// ```
    /// use chudnovsky::{Precision, GUARD_BITS};
    ///
    /// let precision = Precision::for_digits(100)?;
    /// assert_eq!(precision.bits(), 333 + GUARD_BITS);
    /// # Ok::<(), chudnovsky::PiError>(())
    /// ```
    pub fn for_digits(digits: u64) -> Result<Self, PiError> {
        if digits == 0 || digits > MAX_DIGITS {
            return Err(PiError::InvalidDigitCount { digits });
        }
        let value_bits = (u128::from(digits) * LOG2_10_NUMERATOR).div_ceil(LOG2_10_DENOMINATOR);
        let value_bits =
            u64::try_from(value_bits).map_err(|_| PiError::InvalidDigitCount { digits })?;
        Ok(Self {
            digits,
            bits: value_bits + GUARD_BITS,
        })
    }

    pub fn digits(&self) -> u64 {
        self.digits
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Fails with `PrecisionMismatch` if `observed` is not this precision.
    pub fn ensure_matches(&self, observed: &Precision) -> Result<(), PiError> {
        if self == observed {
            Ok(())
        } else {
            Err(PiError::PrecisionMismatch {
                expected: self.bits,
                found: observed.bits,
            })
        }
    }
}
