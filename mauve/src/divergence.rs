/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The divergence frontier between two histograms.
//!
//! For every mixture weight `w`, the histograms `p` and `q` are compared against the
//! mixture `r = w * p + (1 - w) * q`, yielding the point `(KL(q || r), KL(p || r))`. The
//! frontier is closed by the extreme points `(0, inf)` and `(inf, 0)` and mapped into the
//! unit square by `x -> exp(-c * x)`.

use serde::Serialize;

/// Smallest and largest mixture weight of the sweep.
const WEIGHT_MARGIN: f64 = 1e-6;

/// The mapped divergence frontier, as `(x, y)` pairs in `[0, 1] x [0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DivergenceCurve {
    points: Vec<[f64; 2]>,
}

impl DivergenceCurve {
    /// The points of the curve, in sweep order.
    pub fn points(&self) -> &[[f64; 2]] {
        &self.points
    }

    /// The number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Return `true` if the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The `x` coordinates, in sweep order.
    pub fn x(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().map(|p| p[0])
    }

    /// The `y` coordinates, in sweep order.
    pub fn y(&self) -> impl ExactSizeIterator<Item = f64> + '_ {
        self.points.iter().map(|p| p[1])
    }
}

/// Return `size` evenly spaced weights from `1e-6` to `1 - 1e-6`, inclusive.
///
/// A single weight is placed at `1e-6` and zero weights produce an empty sweep.
pub fn mixture_weights(size: usize) -> Vec<f64> {
    let (start, stop) = (WEIGHT_MARGIN, 1.0 - WEIGHT_MARGIN);
    match size {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (size - 1) as f64;
            (0..size)
                .map(|i| {
                    if i == size - 1 {
                        stop
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// The Kullback-Leibler divergence `KL(a || b)` between two discrete distributions.
///
/// Bins where `a` is zero contribute nothing. The divergence is infinite if some bin has
/// positive mass in `a` and none in `b`.
///
/// # Panics
///
/// Panics if `a` and `b` have different lengths.
pub fn kl_multinomial(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len(), "distributions must have the same length");
    let mut total = 0.0;
    for (&x, &y) in std::iter::zip(a, b) {
        if x == 0.0 {
            continue;
        }
        if y == 0.0 {
            return f64::INFINITY;
        }
        total += x * (x / y).ln();
    }
    // Rounding can leave nearly identical distributions slightly below zero.
    total.max(0.0)
}

/// Sweep `weights` (sorted ascending first) and build the mapped divergence curve
/// between `p` and `q` with decay constant `scaling_factor`.
///
/// The result has `weights.len() + 2` points, starting at `(1, 0)` and ending at `(0, 1)`.
///
/// # Panics
///
/// Panics if `p` and `q` have different lengths.
pub fn divergence_curve(
    p: &[f64],
    q: &[f64],
    weights: &[f64],
    scaling_factor: f64,
) -> DivergenceCurve {
    assert_eq!(p.len(), q.len(), "histograms must have the same length");

    let mut weights = weights.to_vec();
    weights.sort_by(f64::total_cmp);

    let mut mixture = vec![0.0f64; p.len()];
    let sweep = weights.iter().map(|&w| {
        std::iter::zip(mixture.iter_mut(), std::iter::zip(p, q))
            .for_each(|(r, (&pi, &qi))| *r = w * pi + (1.0 - w) * qi);
        [kl_multinomial(q, &mixture), kl_multinomial(p, &mixture)]
    });

    let map = |x: f64| (-scaling_factor * x).exp();
    let points = std::iter::once([0.0, f64::INFINITY])
        .chain(sweep)
        .chain(std::iter::once([f64::INFINITY, 0.0]))
        .map(|[x, y]| [map(x), map(y)])
        .collect();

    DivergenceCurve { points }
}

///////////
// Tests //
///////////
