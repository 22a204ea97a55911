//! Binary splitting: the merge rule and the recursion over a term range.

use std::collections::HashMap;

use num_bigint::BigInt;
use num_traits::{One, Zero};

use super::term::{TermRange, leaf};
use crate::error::PiError;

/// Exact triple `(P, Q, T)` describing a range of consecutive terms.
///
/// Triples are never mutated; merging always builds a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitResult {
    p: BigInt,
    q: BigInt,
    t: BigInt,
}

impl SplitResult {
    pub fn new(p: BigInt, q: BigInt, t: BigInt) -> Self {
        Self { p, q, t }
    }

    /// Neutral element of [`merge`](Self::merge): the triple of an empty range.
    pub fn identity() -> Self {
        Self {
            p: BigInt::one(),
            q: BigInt::one(),
            t: BigInt::zero(),
        }
    }

    pub fn p(&self) -> &BigInt {
        &self.p
    }

    pub fn q(&self) -> &BigInt {
        &self.q
    }

    pub fn t(&self) -> &BigInt {
        &self.t
    }

    pub fn into_parts(self) -> (BigInt, BigInt, BigInt) {
        (self.p, self.q, self.t)
    }

    /// Combines this triple with the triple of the range immediately to its right.
    ///
    /// ```text
    /// P = P1 * P2
    /// Q = Q1 * Q2
    /// T = T1 * Q2 + T2 * P1
    /// ```
    ///
    /// The rule is associative but not commutative in `T`, so `right` must cover the terms
    /// that follow `self`.
    pub fn merge(&self, right: &SplitResult) -> SplitResult {
        SplitResult {
            p: &self.p * &right.p,
            q: &self.q * &right.q,
            t: &self.t * &right.q + &right.t * &self.p,
        }
    }
}

/// Evaluates the triple of `range`. Pure and idempotent; this is the entry point any
/// executor calls once per partition.
///
/// ```
/// use chudnovsky::{TermRange, evaluate, leaf};
///
/// let range = TermRange::new(0, 2)?;
/// assert_eq!(evaluate(range), leaf(0).merge(&leaf(1)));
/// # Ok::<(), chudnovsky::PiError>(())
/// ```
pub fn evaluate(range: TermRange) -> SplitResult {
    split(range)
}

/// Binary-splitting recursion over `range`, splitting at [`TermRange::midpoint`].
pub fn split(range: TermRange) -> SplitResult {
    match range.split_at(range.midpoint()) {
        None => leaf(range.start()),
        Some((left, right)) => split(left).merge(&split(right)),
    }
}

/// Evaluates `range` with an explicit first split point `mid`.
///
/// Both halves are then evaluated with the usual midpoint recursion. The result equals
/// [`split`] for every interior `mid`.
pub fn split_at(range: TermRange, mid: u64) -> Result<SplitResult, PiError> {
    let (left, right) = range.split_at(mid).ok_or_else(|| {
        if mid <= range.start() {
            PiError::InvalidTermRange {
                start: range.start(),
                end: mid,
            }
        } else {
            PiError::InvalidTermRange {
                start: mid,
                end: range.end(),
            }
        }
    })?;
    Ok(split(left).merge(&split(right)))
}

/// Memo table for one evaluation context, keyed by term range.
///
/// Owned by whoever runs the evaluation and dropped with it. Never shared between workers.
#[derive(Debug, Default)]
pub struct SplitMemo {
    entries: HashMap<TermRange, SplitResult>,
    hits: usize,
}

impl SplitMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of lookups answered from the table.
    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
    }

    fn get(&mut self, range: &TermRange) -> Option<SplitResult> {
        let found = self.entries.get(range).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }
}

/// Same as [`split`], recording every internal node in `memo` and reusing earlier entries.
pub fn split_memoized(range: TermRange, memo: &mut SplitMemo) -> SplitResult {
    if let Some(cached) = memo.get(&range) {
        return cached;
    }
    let result = match range.split_at(range.midpoint()) {
        None => leaf(range.start()),
        Some((left, right)) => {
            let left = split_memoized(left, memo);
            let right = split_memoized(right, memo);
            left.merge(&right)
        }
    };
    memo.entries.insert(range, result.clone());
    result
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::test_utils::{range, sequential_fold};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn single_term_is_the_leaf() {
        assert_eq!(split(range(0, 1)), leaf(0));
        assert_eq!(split(range(5, 6)), leaf(5));
    }

    #[test]
    fn identity_is_neutral_on_both_sides() {
        let triple = split(range(2, 9));
        assert_eq!(SplitResult::identity().merge(&triple), triple);
        assert_eq!(triple.merge(&SplitResult::identity()), triple);
    }

    #[test]
    fn merge_is_associative() {
        let a = split(range(0, 3));
        let b = split(range(3, 4));
        let c = split(range(4, 11));
        assert_eq!(a.merge(&b).merge(&c), a.merge(&b.merge(&c)));
    }

    #[test]
    fn merge_is_not_commutative_in_t() {
        let a = leaf(1);
        let b = leaf(2);
        let forward = a.merge(&b);
        let backward = b.merge(&a);
        assert_eq!(forward.p(), backward.p());
        assert_eq!(forward.q(), backward.q());
        assert_ne!(forward.t(), backward.t());
    }

    #[test]
    fn splitting_matches_a_plain_left_fold() {
        for end in 1..24u64 {
            assert_eq!(split(range(0, end)), sequential_fold(range(0, end)), "end = {end}");
        }
    }

    #[test]
    fn every_split_point_gives_the_same_triple() {
        let whole = range(3, 20);
        let expected = split(whole);
        for mid in 4..20 {
            let merged = split(range(3, mid)).merge(&split(range(mid, 20)));
            assert_eq!(merged, expected, "mid = {mid}");
            assert_eq!(split_at(whole, mid).expect("interior"), expected);
        }
    }

    #[test]
    fn random_split_points_preserve_the_triple() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let a = rng.gen_range(0..40u64);
            let b = a + rng.gen_range(2..40u64);
            let m = rng.gen_range(a + 1..b);
            assert_eq!(
                split(range(a, m)).merge(&split(range(m, b))),
                split(range(a, b)),
                "[{a}, {m}) + [{m}, {b})"
            );
        }
    }

    #[test]
    fn split_at_rejects_boundary_points() {
        let whole = range(3, 8);
        assert!(split_at(whole, 3).is_err());
        assert!(split_at(whole, 8).is_err());
        assert!(split_at(whole, 12).is_err());
    }

    #[test]
    fn memoized_split_agrees_and_reuses_entries() {
        let mut memo = SplitMemo::new();
        let whole = range(0, 32);
        assert_eq!(split_memoized(whole, &mut memo), split(whole));
        // 32 leaves + 31 internal nodes
        assert_eq!(memo.len(), 63);
        assert_eq!(memo.hits(), 0);

        // The left half is already a node of the first recursion.
        assert_eq!(split_memoized(range(0, 16), &mut memo), split(range(0, 16)));
        assert_eq!(memo.hits(), 1);

        memo.clear();
        assert!(memo.is_empty());
        assert_eq!(memo.hits(), 0);
    }
}
