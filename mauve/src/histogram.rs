/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use crate::error::{MauveError, Which};

/// The two aligned histograms over a shared codebook. Bin `i` of `p` and bin `i` of `q`
/// refer to the same cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct Histograms {
    pub p: Vec<f64>,
    pub q: Vec<f64>,
}

/// Build the histograms of both populations from the cluster assignments of the pooled
/// points, where the first `num_q` points belong to `q` and the remaining ones to `p`.
///
/// # Errors
///
/// * A population has no points and therefore no mass.
/// * A label is not smaller than `num_clusters`.
///
/// # Panics
///
/// Panics if `num_q > assignments.len()`.
pub fn build(
    assignments: &[u32],
    num_clusters: usize,
    num_q: usize,
) -> Result<Histograms, MauveError> {
    let (q, p) = assignments.split_at(num_q);
    Ok(Histograms {
        p: histogram(Which::P, p, num_clusters)?,
        q: histogram(Which::Q, q, num_clusters)?,
    })
}

/// Density-normalize the label counts of one population, then rescale to sum to exactly 1.
fn histogram(which: Which, labels: &[u32], num_clusters: usize) -> Result<Vec<f64>, MauveError> {
    let mut counts = vec![0usize; num_clusters];
    for &label in labels {
        match counts.get_mut(label as usize) {
            Some(c) => *c += 1,
            None => return Err(MauveError::label_out_of_range(label, num_clusters)),
        }
    }

    // Every bin has unit width, so the density is the count over the total.
    let total = labels.len() as f64;
    let density: Vec<f64> = counts.iter().map(|&c| c as f64 / total).collect();

    let mass: f64 = density.iter().sum();
    if !(mass > 0.0 && mass.is_finite()) {
        return Err(MauveError::degenerate_histogram(which));
    }
    Ok(density.into_iter().map(|d| d / mass).collect())
}

///////////
// Tests //
///////////
