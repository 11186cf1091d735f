/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use crate::divergence::DivergenceCurve;

/// Two bins closer than this are treated as equal by [`frontier_integral`].
const EQUAL_TOLERANCE: f64 = 1e-8;

/// Trapezoidal area under the piecewise linear curve through `(x[i], y[i])`.
///
/// `x` must be sorted in ascending order.
///
/// # Panics
///
/// Panics if `x` and `y` have different lengths.
pub fn area_under_curve(x: &[f64], y: &[f64]) -> f64 {
    assert_eq!(x.len(), y.len(), "x and y must have the same length");
    debug_assert!(x.windows(2).all(|w| w[0] <= w[1]), "x must be ascending");
    std::iter::zip(x.windows(2), y.windows(2))
        .map(|(x, y)| 0.5 * (x[1] - x[0]) * (y[0] + y[1]))
        .sum()
}

/// The MAUVE score of a divergence curve.
///
/// The curve is not a function of either coordinate, so the area is taken twice: once with
/// the points ordered by `x` and once, with the roles of the axes swapped, ordered by `y`.
/// The score is the mean of the two areas.
pub fn mauve(curve: &DivergenceCurve) -> f64 {
    let points = curve.points();
    0.5 * (sorted_area(points, 0) + sorted_area(points, 1))
}

/// Area under the curve taking coordinate `axis` as the abscissa.
///
/// Points sharing an abscissa are ordered by decreasing ordinate, tracing the upper
/// envelope of the curve.
fn sorted_area(points: &[[f64; 2]], axis: usize) -> f64 {
    let other = 1 - axis;
    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| {
        a[axis]
            .total_cmp(&b[axis])
            .then_with(|| b[other].total_cmp(&a[other]))
    });

    let x: Vec<f64> = sorted.iter().map(|p| p[axis]).collect();
    let y: Vec<f64> = sorted.iter().map(|p| p[other]).collect();
    area_under_curve(&x, &y)
}

/// The frontier integral of two aligned histograms, multiplied by `scaling`.
///
/// Computed in closed form bin by bin:
///
/// * Both bins empty: no contribution.
/// * One bin empty: a quarter of the other.
/// * Both equal up to `1e-8`: no contribution.
/// * Otherwise: `(p + q) / 4 - p q (ln p - ln q) / (2 (p - q))`.
///
/// # Panics
///
/// Panics if `p` and `q` have different lengths.
pub fn frontier_integral(p: &[f64], q: &[f64], scaling: f64) -> f64 {
    assert_eq!(p.len(), q.len(), "histograms must have the same length");
    let total: f64 = std::iter::zip(p, q)
        .map(|(&p, &q)| {
            if p == 0.0 && q == 0.0 {
                0.0
            } else if p == 0.0 {
                q / 4.0
            } else if q == 0.0 {
                p / 4.0
            } else if (p - q).abs() > EQUAL_TOLERANCE {
                // Cancellation can leave nearly equal bins slightly below zero.
                (0.25 * (p + q) - 0.5 * (p * q * (p.ln() - q.ln()) / (p - q))).max(0.0)
            } else {
                0.0
            }
        })
        .sum();
    total * scaling
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::divergence::{divergence_curve, mixture_weights};

    #[rstest]
    #[case(&[0.0, 1.0], &[1.0, 1.0], 1.0)]
    #[case(&[0.0, 1.0], &[0.0, 1.0], 0.5)]
    #[case(&[0.0, 0.5, 2.0], &[2.0, 2.0, 0.0], 2.5)]
    #[case(&[0.0, 0.0, 1.0], &[0.0, 1.0, 1.0], 1.0)]
    #[case(&[3.0], &[7.0], 0.0)]
    #[case(&[], &[], 0.0)]
    fn test_area_under_curve(#[case] x: &[f64], #[case] y: &[f64], #[case] expected: f64) {
        assert_abs_diff_eq!(area_under_curve(x, y), expected, epsilon = 1e-12);
    }

    #[test]
    fn test_mauve_of_identical_histograms_is_one() {
        let p = [0.1, 0.2, 0.3, 0.4];
        let curve = divergence_curve(&p, &p, &mixture_weights(25), 5.0);
        assert_abs_diff_eq!(mauve(&curve), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_mauve_of_disjoint_histograms_is_small() {
        let p = [0.0, 1.0];
        let q = [1.0, 0.0];
        let curve = divergence_curve(&p, &q, &mixture_weights(25), 5.0);
        let score = mauve(&curve);
        assert!(score > 0.0 && score < 0.05, "score = {score}");
    }

    #[test]
    fn test_mauve_is_symmetric() {
        let p = [0.1, 0.6, 0.3];
        let q = [0.5, 0.2, 0.3];
        let weights = mixture_weights(25);
        let pq = mauve(&divergence_curve(&p, &q, &weights, 5.0));
        let qp = mauve(&divergence_curve(&q, &p, &weights, 5.0));
        assert_abs_diff_eq!(pq, qp, epsilon = 1e-9);
        assert!(pq > 0.0 && pq < 1.0);
    }

    #[test]
    fn test_frontier_integral() {
        assert_eq!(frontier_integral(&[0.5, 0.5], &[0.5, 0.5], 2.0), 0.0);
        assert_eq!(frontier_integral(&[0.0, 1.0], &[1.0, 0.0], 2.0), 1.0);
        assert_eq!(frontier_integral(&[0.0, 1.0], &[1.0, 0.0], 1.0), 0.5);

        // Bins within the tolerance contribute nothing.
        assert_eq!(frontier_integral(&[0.5 + 1e-9], &[0.5], 2.0), 0.0);

        // Bins just outside the tolerance never contribute negatively.
        for p in [0.5809, 0.1, 0.9, 0.33] {
            for d in [1.1e-8, 2e-8, 5e-8, 1e-7] {
                let fi = frontier_integral(&[p], &[p + d], 1.0);
                assert!(fi >= 0.0, "p = {p}, d = {d}: {fi}");
                assert!(fi < 1e-8, "p = {p}, d = {d}: {fi}");
            }
        }

        let (p, q) = (0.2f64, 0.6f64);
        let expected = 0.25 * (p + q) - 0.5 * p * q * (p.ln() - q.ln()) / (p - q);
        assert_abs_diff_eq!(
            frontier_integral(&[p, 0.0, 0.0], &[q, 0.0, 0.4], 1.0),
            expected + 0.1,
            epsilon = 1e-15
        );
    }

    fn histogram(len: usize) -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(0u32..10, len).prop_filter_map("no mass", |counts| {
            let total: u32 = counts.iter().sum();
            (total > 0).then(|| counts.iter().map(|&c| c as f64 / total as f64).collect())
        })
    }

    fn histogram_pair() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        (1usize..12).prop_flat_map(|len| (histogram(len), histogram(len)))
    }

    proptest! {
        #[test]
        fn frontier_integral_is_symmetric((p, q) in histogram_pair()) {
            let pq = frontier_integral(&p, &q, 2.0);
            let qp = frontier_integral(&q, &p, 2.0);
            prop_assert!((pq - qp).abs() < 1e-12, "{} != {}", pq, qp);
            prop_assert!(pq >= 0.0, "{} is negative", pq);
        }

        #[test]
        fn frontier_integral_of_self_is_zero(p in (1usize..12).prop_flat_map(histogram)) {
            prop_assert_eq!(frontier_integral(&p, &p, 2.0), 0.0);
        }

        #[test]
        fn mauve_is_in_unit_interval((p, q) in histogram_pair()) {
            let score = mauve(&divergence_curve(&p, &q, &mixture_weights(25), 5.0));
            prop_assert!((0.0..=1.0 + 1e-12).contains(&score), "score = {}", score);
        }
    }
}
