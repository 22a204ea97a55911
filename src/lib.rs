#![warn(
    clippy::shadow_reuse,
    clippy::shadow_same,
    clippy::shadow_unrelated,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::panic,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::todo,
    clippy::unimplemented,
    clippy::unwrap_used
)]

//! Exact decimal digits of π from the Chudnovsky series.
//!
//! The series is summed by binary splitting: every contiguous range of terms reduces to an
//! integer triple `(P, Q, T)`, and adjacent triples merge associatively. The term range is
//! cut into partitions, evaluated by a pool of workers, folded back together in order, and
//! converted to digits with a single fixed-point division and square root.
//!
//! ```
//! use chudnovsky::{Computation, PartitionPolicy, RunConfig};
//!
//! let config = RunConfig::new(50)
//!     .with_workers(4)
//!     .with_policy(PartitionPolicy::Weighted);
//! let outcome = Computation::new(config)?.run()?;
//! assert!(outcome.digits.to_string().starts_with("3.14159265358979"));
//! # Ok::<(), chudnovsky::PiError>(())
//! ```

mod aggregate;
mod checkpoint;
mod compute;
mod concurrency;
mod config;
mod error;
mod format;
mod partition;
mod pool;
mod precision;
mod series;
mod worker;

#[cfg(test)]
mod test_utils;

pub use aggregate::{aggregate, pi_digits};
pub use checkpoint::{CheckpointStore, DirStore, MemoryStore};
pub use compute::{Computation, PiOutcome, compute_pi, compute_with_terms};
pub use concurrency::StopFlag;
pub use config::{RunConfig, default_workers, min_terms_for_digits, terms_for_digits};
pub use error::PiError;
pub use format::{OutputLayout, PiDigits, RunSummary, render};
pub use partition::{Assignment, MAX_PARTITIONS, Partition, PartitionPolicy, assign, partition};
pub use pool::{PoolBackend, RayonPool, ScopedThreadPool, SequentialPool, WorkerPool};
pub use precision::{GUARD_BITS, MAX_DIGITS, Precision};
pub use series::{
    C3_OVER_24, CHUDNOVSKY_A, CHUDNOVSKY_B, SplitMemo, SplitResult, TermRange, evaluate, leaf,
    split, split_at, split_memoized,
};
pub use worker::{Job, WorkerReport, run_assignment};
