//! Chudnovsky series terms and their binary-splitting evaluation.
//!
//! The series used is
//!
//! ```text
//! 426880 * sqrt(10005) / pi = sum_k (6k)! (13591409 + 545140134 k) / ((3k)! (k!)^3 (-640320^3)^k)
//! ```
//!
//! Each term is carried as the exact ratio to its predecessor so that a whole range of terms
//! collapses into one integer triple `(P, Q, T)`.
//!
//! # Modules
//!
//! - [`term`]: term ranges and the closed-form leaf triple of a single term
//! - [`split`]: the merge rule and the binary-splitting recursion

mod split;
mod term;

pub use split::{SplitMemo, SplitResult, evaluate, split, split_at, split_memoized};
pub use term::{CHUDNOVSKY_A, CHUDNOVSKY_B, C3_OVER_24, TermRange, leaf};
