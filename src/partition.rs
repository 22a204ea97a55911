//! Dividing `[0, N)` into partitions and grouping partitions into worker assignments.
//!
//! Partitioning only affects load balance. Whatever the policy, the partitions are disjoint,
//! contiguous, in index order, and cover every term exactly once.

use std::fmt;

use crate::error::PiError;
use crate::series::TermRange;

/// Upper bound on the number of partitions a policy generates.
pub const MAX_PARTITIONS: usize = 1 << 20;

/// How the term range is cut into partitions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PartitionPolicy {
    /// `N / W` terms each; the first `N % W` partitions take one extra term.
    #[default]
    Equal,
    /// Partition `i` (1-indexed) takes about `i * N / (1 + 2 + ... + W)` terms.
    Weighted,
    /// Fixed-size chunks of `size` terms, the last one possibly shorter.
    Chunked { size: u64 },
}

impl fmt::Display for PartitionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "equal"),
            Self::Weighted => write!(f, "weighted"),
            Self::Chunked { size } => write!(f, "chunked({size})"),
        }
    }
}

/// One contiguous sub-range of the terms, with its position in partition order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Partition {
    index: usize,
    range: TermRange,
}

impl Partition {
    pub fn new(index: usize, range: TermRange) -> Self {
        Self { index, range }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn range(&self) -> TermRange {
        self.range
    }
}

/// Splits `[0, terms)` into partitions for `workers` workers.
///
/// Deterministic in `(terms, workers, policy)`. At most `min(workers, terms, MAX_PARTITIONS)`
/// partitions are produced by the equal and weighted policies.
///
/// ```
/// use chudnovsky::{PartitionPolicy, partition};
///
/// let parts = partition(10, 4, PartitionPolicy::Weighted)?;
/// let sizes: Vec<u64> = parts.iter().map(|p| p.range().len()).collect();
/// assert_eq!(sizes, [1, 2, 3, 4]);
/// # Ok::<(), chudnovsky::PiError>(())
/// ```
pub fn partition(
    terms: u64,
    workers: usize,
    policy: PartitionPolicy,
) -> Result<Vec<Partition>, PiError> {
    if terms == 0 || workers == 0 {
        return Err(PiError::EmptyRange { terms, workers });
    }

    let boundaries = match policy {
        PartitionPolicy::Equal => equal_boundaries(terms, partition_count(terms, workers)),
        PartitionPolicy::Weighted => weighted_boundaries(terms, partition_count(terms, workers)),
        PartitionPolicy::Chunked { size } => chunked_boundaries(terms, size, workers)?,
    };
    ranges_from_boundaries(&boundaries)
}

/// Number of partitions for the equal and weighted policies.
fn partition_count(terms: u64, workers: usize) -> u64 {
    let capped = workers.min(MAX_PARTITIONS) as u64;
    capped.min(terms)
}

/// `count + 1` boundaries, starting at 0 and ending at `terms`.
fn equal_boundaries(terms: u64, count: u64) -> Vec<u64> {
    let base = terms / count;
    let extra = terms % count;
    let mut boundaries = Vec::with_capacity(count as usize + 1);
    let mut position = 0u64;
    boundaries.push(position);
    for i in 0..count {
        position += base + u64::from(i < extra);
        boundaries.push(position);
    }
    boundaries
}

fn weighted_boundaries(terms: u64, count: u64) -> Vec<u64> {
    // Cumulative weights 1, 1+2, 1+2+3, ... keep rounding from ever dropping terms.
    let count = u128::from(count);
    let total_weight = count * (count + 1) / 2;
    let terms_wide = u128::from(terms);
    let mut boundaries = Vec::with_capacity(count as usize + 1);
    boundaries.push(0);
    for i in 1..=count {
        let cumulative = i * (i + 1) / 2;
        // terms * cumulative / total_weight <= terms, so the narrowing is lossless.
        let boundary = terms_wide * cumulative / total_weight;
        boundaries.push(u64::try_from(boundary).unwrap_or(terms));
    }
    boundaries
}

fn chunked_boundaries(terms: u64, size: u64, workers: usize) -> Result<Vec<u64>, PiError> {
    if size == 0 {
        return Err(PiError::EmptyRange { terms, workers });
    }
    let chunks = terms.div_ceil(size);
    if chunks > MAX_PARTITIONS as u64 {
        return Err(PiError::EmptyRange { terms, workers });
    }
    let mut boundaries: Vec<u64> = (0..chunks).map(|chunk| chunk * size).collect();
    boundaries.push(terms);
    Ok(boundaries)
}

/// Turns ascending boundaries into partitions, skipping zero-width gaps.
fn ranges_from_boundaries(boundaries: &[u64]) -> Result<Vec<Partition>, PiError> {
    let mut partitions = Vec::with_capacity(boundaries.len().saturating_sub(1));
    for window in boundaries.windows(2) {
        let (start, end) = (window[0], window[1]);
        if start == end {
            continue;
        }
        let range = TermRange::new(start, end)?;
        partitions.push(Partition::new(partitions.len(), range));
    }
    Ok(partitions)
}

/// A contiguous run of partitions evaluated by one worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Assignment {
    worker: usize,
    partitions: Vec<Partition>,
    range: TermRange,
}

impl Assignment {
    /// Builds an assignment; the partitions must be non-empty and contiguous.
    pub fn new(worker: usize, partitions: Vec<Partition>) -> Result<Self, PiError> {
        let mut iter = partitions.iter();
        let Some(first) = iter.next() else {
            return Err(PiError::EmptyRange {
                terms: 0,
                workers: worker + 1,
            });
        };
        let mut range = first.range();
        for next in iter {
            range = range
                .join(&next.range())
                .ok_or_else(|| {
                    PiError::worker_failure(
                        worker,
                        Some(next.index()),
                        format!("partition {} is not adjacent to {range}", next.range()),
                    )
                })?;
        }
        Ok(Self {
            worker,
            partitions,
            range,
        })
    }

    pub fn worker(&self) -> usize {
        self.worker
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// The terms covered by all of this assignment's partitions.
    pub fn range(&self) -> TermRange {
        self.range
    }
}

/// Groups partitions into at most `workers` contiguous assignments, in order.
///
/// Contiguity lets every worker fold its own partitions without disturbing the order of the
/// final, non-commutative fold.
pub fn assign(partitions: &[Partition], workers: usize) -> Result<Vec<Assignment>, PiError> {
    if partitions.is_empty() || workers == 0 {
        return Err(PiError::EmptyRange {
            terms: partitions.iter().map(|p| p.range().len()).sum(),
            workers,
        });
    }

    let count = workers.min(partitions.len());
    let base = partitions.len() / count;
    let extra = partitions.len() % count;
    let mut assignments = Vec::with_capacity(count);
    let mut offset = 0;
    for worker in 0..count {
        let take = base + usize::from(worker < extra);
        let group = partitions[offset..offset + take].to_vec();
        offset += take;
        assignments.push(Assignment::new(worker, group)?);
    }
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn assert_covers(partitions: &[Partition], terms: u64) {
        let mut expected_start = 0;
        for (i, part) in partitions.iter().enumerate() {
            assert_eq!(part.index(), i, "indices follow partition order");
            assert_eq!(part.range().start(), expected_start, "no gaps or overlaps");
            expected_start = part.range().end();
        }
        assert_eq!(expected_start, terms, "coverage ends at N");
    }

    fn sizes(partitions: &[Partition]) -> Vec<u64> {
        partitions.iter().map(|p| p.range().len()).collect()
    }

    #[test]
    fn zero_terms_or_workers_are_rejected() {
        assert_eq!(
            partition(0, 4, PartitionPolicy::Equal),
            Err(PiError::EmptyRange {
                terms: 0,
                workers: 4
            })
        );
        assert_eq!(
            partition(10, 0, PartitionPolicy::Weighted),
            Err(PiError::EmptyRange {
                terms: 10,
                workers: 0
            })
        );
        assert!(partition(10, 2, PartitionPolicy::Chunked { size: 0 }).is_err());
    }

    #[test]
    fn equal_policy_front_loads_the_remainder() {
        let parts = partition(10, 3, PartitionPolicy::Equal).expect("valid");
        assert_eq!(sizes(&parts), [4, 3, 3]);
        assert_covers(&parts, 10);
    }

    #[test]
    fn more_workers_than_terms_gives_single_term_partitions() {
        let parts = partition(3, 8, PartitionPolicy::Equal).expect("valid");
        assert_eq!(sizes(&parts), [1, 1, 1]);

        let parts = partition(3, 8, PartitionPolicy::Weighted).expect("valid");
        assert_covers(&parts, 3);
    }

    #[test]
    fn weighted_policy_grows_partition_sizes() {
        let parts = partition(100, 4, PartitionPolicy::Weighted).expect("valid");
        assert_eq!(sizes(&parts), [10, 20, 30, 40]);
        assert_covers(&parts, 100);
    }

    #[test]
    fn chunked_policy_uses_fixed_sizes() {
        let parts = partition(10, 2, PartitionPolicy::Chunked { size: 4 }).expect("valid");
        assert_eq!(sizes(&parts), [4, 4, 2]);
        assert_covers(&parts, 10);
    }

    #[test]
    fn partitioning_is_deterministic() {
        for policy in [
            PartitionPolicy::Equal,
            PartitionPolicy::Weighted,
            PartitionPolicy::Chunked { size: 7 },
        ] {
            assert_eq!(partition(123, 5, policy), partition(123, 5, policy));
        }
    }

    #[test]
    fn random_inputs_are_always_covered() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let terms = rng.gen_range(1..5_000u64);
            let workers = rng.gen_range(1..70usize);
            let size = rng.gen_range(1..300u64);
            for policy in [
                PartitionPolicy::Equal,
                PartitionPolicy::Weighted,
                PartitionPolicy::Chunked { size },
            ] {
                let parts = partition(terms, workers, policy).expect("valid inputs");
                assert_covers(&parts, terms);
                if policy != (PartitionPolicy::Chunked { size }) {
                    assert!(parts.len() <= workers);
                }
            }
        }
    }

    #[test]
    fn assignments_are_contiguous_and_balanced() {
        let parts = partition(50, 7, PartitionPolicy::Chunked { size: 5 }).expect("valid");
        let assignments = assign(&parts, 3).expect("valid");
        let counts: Vec<usize> = assignments.iter().map(|a| a.partitions().len()).collect();
        assert_eq!(counts, [4, 3, 3]);

        let mut expected_start = 0;
        for (i, assignment) in assignments.iter().enumerate() {
            assert_eq!(assignment.worker(), i);
            assert_eq!(assignment.range().start(), expected_start);
            expected_start = assignment.range().end();
        }
        assert_eq!(expected_start, 50);
    }

    #[test]
    fn assign_caps_workers_at_partition_count() {
        let parts = partition(4, 2, PartitionPolicy::Equal).expect("valid");
        let assignments = assign(&parts, 16).expect("valid");
        assert_eq!(assignments.len(), 2);
        assert!(assign(&parts, 0).is_err());
        assert!(assign(&[], 3).is_err());
    }

    #[test]
    fn non_adjacent_partitions_cannot_share_a_worker() {
        let first = Partition::new(0, TermRange::new(0, 2).expect("valid"));
        let third = Partition::new(2, TermRange::new(4, 6).expect("valid"));
        assert!(matches!(
            Assignment::new(0, vec![first, third]),
            Err(PiError::WorkerFailure {
                partition: Some(2),
                ..
            })
        ));
    }
}
