//! Folding worker reports into the final triple and turning it into digits of π.

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Signed;
use tracing::debug;

use crate::error::PiError;
use crate::format::PiDigits;
use crate::precision::Precision;
use crate::series::SplitResult;
use crate::worker::WorkerReport;

/// `pi = SCALE * sqrt(RADICAND) * Q / T`.
const SCALE: u32 = 426_880;
const RADICAND: u32 = 10_005;

/// Folds `reports` left to right into the triple for `[0, terms)`.
///
/// The reports must be in partition order and tile `[0, terms)` without gaps, and every one
/// must have run under `precision`.
pub fn aggregate(
    reports: &[WorkerReport],
    terms: u64,
    precision: &Precision,
) -> Result<SplitResult, PiError> {
    let mut expected_start = 0u64;
    let mut folded: Option<SplitResult> = None;

    for report in reports {
        precision.ensure_matches(&report.precision())?;
        if report.range().start() != expected_start {
            return Err(PiError::worker_failure(
                report.worker(),
                None,
                format!(
                    "reported range {} but the next term to fold is {expected_start}",
                    report.range()
                ),
            ));
        }
        expected_start = report.range().end();
        folded = Some(match folded {
            None => report.result().clone(),
            Some(previous) => previous.merge(report.result()),
        });
    }

    let Some(result) = folded else {
        return Err(PiError::EmptyRange { terms, workers: 0 });
    };
    if expected_start != terms {
        let last = reports.last().map_or(0, WorkerReport::worker);
        return Err(PiError::worker_failure(
            last,
            None,
            format!("reports cover [0, {expected_start}) instead of [0, {terms})"),
        ));
    }
    debug!(reports = reports.len(), terms, "partial sums folded");
    Ok(result)
}

/// Converts the triple for `[0, N)` into the first `precision.digits()` decimals of π.
///
/// Evaluates `426880 * sqrt(10005) * Q / T` in fixed point with `precision.bits()`
/// fractional bits and truncates to the requested digit count.
pub fn pi_digits(result: &SplitResult, precision: &Precision) -> Result<PiDigits, PiError> {
    if !result.t().is_positive() || !result.q().is_positive() {
        return Err(PiError::NonPositiveSum);
    }
    let digits = precision.digits();
    let bits = usize::try_from(precision.bits())
        .map_err(|_| PiError::InvalidDigitCount { digits })?;
    let exponent = u32::try_from(digits).map_err(|_| PiError::InvalidDigitCount { digits })?;

    // floor(sqrt(10005) * 2^bits)
    let root = (BigUint::from(RADICAND) << (2 * bits)).sqrt();
    let numerator = BigInt::from(root) * SCALE * result.q();
    // floor(pi * 2^bits), give or take a couple of units in the last place.
    let pi_fixed = numerator.div_floor(result.t());
    // floor(pi * 10^digits)
    let scaled: BigInt = (pi_fixed * BigInt::from(10u32).pow(exponent)) >> bits;

    Ok(PiDigits::from_scaled(&scaled, digits))
}
