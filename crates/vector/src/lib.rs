//! # pilot-vector
//!
//! Brute-force similarity kernel: cosine similarity and stable top-K ranking.
//! A linear scan is adequate for a single workspace (tens of thousands of
//! chunks). This crate has no workspace dependencies.

use rayon::prelude::*;
use std::cmp::Ordering;

/// Candidate count above which scoring runs on the rayon pool.
const PARALLEL_THRESHOLD: usize = 2048;

/// Returns the vector crate version.
#[must_use]
pub const fn vector_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Cosine similarity `dot(a, b) / (|a| * |b|)`.
///
/// Returns `0.0` when either vector is empty or has zero magnitude, when the
/// lengths differ, or when the result is not finite.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let similarity = (dot / denominator).clamp(-1.0, 1.0);
    if similarity.is_finite() {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "value is clamped to [-1, 1]"
        )]
        let similarity = similarity as f32;
        similarity
    } else {
        0.0
    }
}

/// Position of a candidate in the input slice with its score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    /// Index into the candidate slice.
    pub index: usize,
    /// Cosine similarity to the query.
    pub score: f32,
}

/// Score every candidate against `query` and keep the best `top_k`.
///
/// Ordering is descending by score; equal scores keep input order.
pub fn rank_top_k<T, F>(query: &[f32], candidates: &[T], vector_of: F, top_k: usize) -> Vec<VectorMatch>
where
    T: Sync,
    F: Fn(&T) -> &[f32] + Sync,
{
    if top_k == 0 || candidates.is_empty() || query.is_empty() {
        return Vec::new();
    }

    let score = |(index, candidate): (usize, &T)| VectorMatch {
        index,
        score: cosine_similarity(query, vector_of(candidate)),
    };
    let mut matches: Vec<VectorMatch> = if candidates.len() >= PARALLEL_THRESHOLD {
        candidates.par_iter().enumerate().map(score).collect()
    } else {
        candidates.iter().enumerate().map(score).collect()
    };

    matches.sort_by(|a, b| descending(a.score, b.score));
    matches.truncate(top_k);
    matches
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn ranking_is_descending_stable_and_truncated() {
        let candidates: Vec<Vec<f32>> = vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ];
        let matches = rank_top_k(&[1.0, 0.0], &candidates, Vec::as_slice, 3);

        let order: Vec<usize> = matches.iter().map(|m| m.index).collect();
        assert_eq!(order, vec![1, 3, 4]);
    }

    #[test]
    fn empty_inputs_rank_nothing() {
        let candidates = vec![vec![1.0_f32]];
        assert!(rank_top_k(&[], &candidates, Vec::as_slice, 5).is_empty());
        assert!(rank_top_k(&[1.0], &candidates, Vec::as_slice, 0).is_empty());
        let none: Vec<Vec<f32>> = Vec::new();
        assert!(rank_top_k(&[1.0], &none, Vec::as_slice, 5).is_empty());
    }

    #[test]
    fn parallel_path_matches_sequential_order() {
        let candidates: Vec<Vec<f32>> = (0..PARALLEL_THRESHOLD + 10)
            .map(|i| vec![1.0, (i % 7) as f32])
            .collect();
        let matches = rank_top_k(&[1.0, 0.0], &candidates, Vec::as_slice, 4);
        let order: Vec<usize> = matches.iter().map(|m| m.index).collect();
        assert_eq!(order, vec![0, 7, 14, 21]);
    }

    fn non_zero_vector() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0_f32..100.0, 1..32)
            .prop_filter("non-zero magnitude", |v| v.iter().any(|x| x.abs() > 1e-3))
    }

    proptest! {
        #[test]
        fn self_similarity_is_one(v in non_zero_vector()) {
            prop_assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
        }

        #[test]
        fn zero_vector_similarity_is_zero(v in non_zero_vector()) {
            let zero = vec![0.0; v.len()];
            prop_assert_eq!(cosine_similarity(&v, &zero), 0.0);
        }

        #[test]
        fn similarity_is_symmetric_and_bounded(
            pair in (1usize..16).prop_flat_map(|n| (
                prop::collection::vec(-10.0_f32..10.0, n),
                prop::collection::vec(-10.0_f32..10.0, n),
            ))
        ) {
            let (a, b) = pair;
            let ab = cosine_similarity(&a, &b);
            prop_assert_eq!(ab, cosine_similarity(&b, &a));
            prop_assert!((-1.0..=1.0).contains(&ab));
        }

        #[test]
        fn ranking_is_sorted_and_bounded(
            vectors in prop::collection::vec(prop::collection::vec(-1.0_f32..1.0, 3), 0..40),
            top_k in 0usize..10,
        ) {
            let matches = rank_top_k(&[0.5, -0.25, 1.0], &vectors, Vec::as_slice, top_k);
            prop_assert!(matches.len() <= top_k);
            prop_assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
            let again = rank_top_k(&[0.5, -0.25, 1.0], &vectors, Vec::as_slice, top_k);
            prop_assert_eq!(matches, again);
        }
    }
}
