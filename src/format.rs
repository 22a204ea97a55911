//! Decimal digits of π and their text layouts.

use std::fmt;
use std::time::Duration;

use num_bigint::BigInt;

use crate::partition::PartitionPolicy;
use crate::pool::PoolBackend;

/// Digits per group in the validation layout.
const GROUP_WIDTH: usize = 10;
/// Groups per line in the validation layout.
const GROUPS_PER_LINE: usize = 5;

/// Truncated decimal expansion of π: an integer part and exactly `digit_count` fractional
/// digits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PiDigits {
    integer: String,
    fraction: String,
}

impl PiDigits {
    /// Splits `floor(x * 10^digits)` into integer and fractional digits of `x`.
    pub(crate) fn from_scaled(scaled: &BigInt, digits: u64) -> Self {
        let digits = usize::try_from(digits).unwrap_or(usize::MAX);
        let mut text = scaled.to_string();
        if text.len() <= digits {
            text = format!("{}{text}", "0".repeat(digits + 1 - text.len()));
        }
        let fraction = text.split_off(text.len() - digits);
        Self {
            integer: text,
            fraction,
        }
    }

    pub fn integer(&self) -> &str {
        &self.integer
    }

    /// The digits after the decimal point.
    pub fn fraction(&self) -> &str {
        &self.fraction
    }

    pub fn digit_count(&self) -> usize {
        self.fraction.len()
    }

    /// The first `chars` characters of the full rendering, e.g. `"3.14"` for 4.
    pub fn leading(&self, chars: usize) -> String {
        self.to_string().chars().take(chars).collect()
    }

    /// The same value truncated to `digits` fractional digits, if that is not more than
    /// this value holds.
    pub fn truncated(&self, digits: usize) -> Option<PiDigits> {
        self.fraction.get(..digits).map(|fraction| PiDigits {
            integer: self.integer.clone(),
            fraction: fraction.to_string(),
        })
    }
}

impl fmt::Display for PiDigits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.integer, self.fraction)
    }
}

/// How the digits are written out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// `3.14159...` on a single line.
    #[default]
    Plain,
    /// Header describing the run, then the digits in groups of ten with a running count.
    Validation,
}

/// What a run did, for logs and for the validation layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub digits: u64,
    pub bits: u64,
    pub terms: u64,
    pub workers: usize,
    pub partitions: usize,
    pub restored: usize,
    pub policy: PartitionPolicy,
    pub backend: PoolBackend,
    pub elapsed: Duration,
}

/// Renders `digits` in `layout`. The output always ends with a newline.
pub fn render(digits: &PiDigits, layout: OutputLayout, summary: &RunSummary) -> String {
    match layout {
        OutputLayout::Plain => format!("{digits}\n"),
        OutputLayout::Validation => render_validation(digits, summary),
    }
}

fn render_validation(digits: &PiDigits, summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str("Pi (Chudnovsky series, binary splitting)\n");
    out.push_str(&format!("Decimal digits:   {}\n", summary.digits));
    out.push_str(&format!("Working bits:     {}\n", summary.bits));
    out.push_str(&format!("Series terms:     {}\n", summary.terms));
    out.push_str(&format!(
        "Partitions:       {} ({})\n",
        summary.partitions, summary.policy
    ));
    out.push_str(&format!(
        "Workers:          {} ({})\n",
        summary.workers, summary.backend
    ));
    if summary.restored > 0 {
        out.push_str(&format!("Restored:         {}\n", summary.restored));
    }
    out.push_str(&format!(
        "Computation time: {:.3} s\n",
        summary.elapsed.as_secs_f64()
    ));
    out.push('\n');
    out.push_str(digits.integer());
    out.push_str(".\n");

    let line_digits = GROUP_WIDTH * GROUPS_PER_LINE;
    let line_width = line_digits + GROUPS_PER_LINE - 1;
    let fraction = digits.fraction().as_bytes();
    let mut written = 0;
    for line in fraction.chunks(line_digits) {
        let groups: Vec<&str> = line
            .chunks(GROUP_WIDTH)
            .map(|group| std::str::from_utf8(group).unwrap_or_default())
            .collect();
        written += line.len();
        out.push_str(&format!(
            "{:<width$}  : {written}\n",
            groups.join(" "),
            width = line_width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::test_utils::PI_200;

    fn sample(fraction: &str) -> PiDigits {
        PiDigits {
            integer: "3".to_string(),
            fraction: fraction.to_string(),
        }
    }

    fn summary(digits: u64) -> RunSummary {
        RunSummary {
            digits,
            bits: 400,
            terms: 9,
            workers: 4,
            partitions: 4,
            restored: 0,
            policy: PartitionPolicy::Equal,
            backend: PoolBackend::Threads,
            elapsed: Duration::from_millis(1500),
        }
    }

    #[test]
    fn scaled_integers_split_at_the_decimal_point() {
        let digits = PiDigits::from_scaled(&BigInt::from(314_159), 5);
        assert_eq!(digits.integer(), "3");
        assert_eq!(digits.fraction(), "14159");
        assert_eq!(digits.to_string(), "3.14159");
    }

    #[test]
    fn small_values_are_zero_padded() {
        let digits = PiDigits::from_scaled(&BigInt::from(42), 4);
        assert_eq!(digits.to_string(), "0.0042");
    }

    #[test]
    fn truncation_is_a_prefix() {
        let digits = sample(&PI_200[..50]);
        let short = digits.truncated(10).expect("shorter");
        assert_eq!(short.to_string(), "3.1415926535");
        assert!(digits.truncated(51).is_none());
        assert_eq!(digits.leading(6), "3.1415");
        assert_eq!(digits.digit_count(), 50);
    }

    #[test]
    fn plain_layout_is_one_line() {
        let digits = sample("14159");
        assert_eq!(render(&digits, OutputLayout::Plain, &summary(5)), "3.14159\n");
    }

    #[test]
    fn validation_layout_groups_and_counts_digits() {
        let digits = sample(&PI_200[..60]);
        let text = render(&digits, OutputLayout::Validation, &summary(60));
        assert!(text.contains("Decimal digits:   60\n"));
        assert!(text.contains("Partitions:       4 (equal)\n"));
        assert!(text.contains("Computation time: 1.500 s\n"));
        assert!(text.contains(
            "\n3.\n1415926535 8979323846 2643383279 5028841971 6939937510  : 50\n"
        ));
        let last = text.lines().last().expect("digit lines");
        assert!(last.starts_with("5820974944 "));
        assert!(last.ends_with("  : 60"));
        assert_eq!(last.len(), 54 + "  : 60".len());
    }
}
