/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Lloyd's iterations on the unit sphere, using `1 - cosine similarity` as the distance.

use mauve_linalg::{sgemm, Transpose};
use mauve_utils::views::{Matrix, MatrixView, MutMatrixView};
use tracing::debug;

use super::common::{max_square_movement, nearest};
use crate::algorithms::normalize::l2_normalize;

/// Additive stabilizer for the center update. Empty clusters keep their previous center.
const STABILIZER: f64 = 1e-6;

/////////////////////
// Assignment Step //
/////////////////////

/// Assign every row of `data` to the center with the largest cosine similarity, writing the
/// result into `nearest_center` and returning the summed distances `1 - similarity`.
///
/// Both `data` and `centers` are expected to have unit-length rows.
///
/// Rows are processed in chunks so that no more than `capacity` similarities (and at least
/// one row) are materialized at once.
///
/// # Panics
///
/// Panics if
/// * `data.ncols() != centers.ncols()`
/// * `nearest_center.len() != data.nrows()`
/// * `centers` has no rows.
pub fn assign(
    data: MatrixView<'_, f32>,
    centers: MatrixView<'_, f32>,
    capacity: usize,
    nearest_center: &mut [u32],
) -> f64 {
    assert_eq!(
        data.ncols(),
        centers.ncols(),
        "data and centers should have the same dimensions"
    );
    assert_eq!(
        data.nrows(),
        nearest_center.len(),
        "data and nearest-buffer should have the same length"
    );
    assert!(centers.nrows() != 0, "cannot assign to zero centers");

    let ncenters = centers.nrows();
    let chunk_rows = (capacity / ncenters).max(1);

    // Scratch space for the similarity tile, reused across chunks.
    let mut tile = vec![0.0f32; chunk_rows.min(data.nrows()) * ncenters];

    std::iter::zip(
        data.window_iter(chunk_rows),
        nearest_center.chunks_mut(chunk_rows),
    )
    .map(|(chunk, out)| {
        let tile = &mut tile[..chunk.nrows() * ncenters];
        sgemm(
            Transpose::None,
            Transpose::Ordinary,
            chunk.nrows(),
            ncenters,
            chunk.ncols(),
            1.0,
            chunk.as_slice(),
            centers.as_slice(),
            None,
            tile,
        );

        std::iter::zip(tile.chunks_exact(ncenters), out.iter_mut())
            .map(|(similarities, o)| {
                let (index, distance) = nearest(similarities);
                *o = index;
                distance as f64
            })
            .sum::<f64>()
    })
    .sum()
}

/////////////////
// Update Step //
/////////////////

/// Replace each center by the re-normalized mean of the rows assigned to it.
///
/// The previous center is blended in with a tiny weight, so a cluster that lost all of its
/// points keeps its previous center instead of producing `NaN`.
pub fn update_centers(mut centers: MutMatrixView<'_, f32>, data: MatrixView<'_, f32>, map: &[u32]) {
    let mut sums = Matrix::<f64>::new(0.0, centers.nrows(), centers.ncols());
    std::iter::zip(sums.row_iter_mut(), centers.row_iter()).for_each(|(s, c)| {
        std::iter::zip(s.iter_mut(), c.iter()).for_each(|(s, &c)| *s = (c as f64) * STABILIZER);
    });
    let mut counts: Vec<f64> = vec![STABILIZER; centers.nrows()];

    std::iter::zip(data.row_iter(), map.iter()).for_each(|(row, &center)| {
        counts[center as usize] += 1.0;
        let sum = sums.row_mut(center as usize);
        std::iter::zip(sum.iter_mut(), row.iter()).for_each(|(s, &r)| {
            *s += r as f64;
        });
    });

    std::iter::zip(counts.iter(), sums.row_iter())
        .zip(centers.row_iter_mut())
        .for_each(|((count, sum), center)| {
            std::iter::zip(sum.iter(), center.iter_mut()).for_each(|(s, c)| {
                *c = (*s / count) as f32;
            });
            l2_normalize(center);
        });
}

////////////
// Lloyds //
////////////

/// Stopping rules for [`spherical_lloyds`].
#[derive(Debug, Clone, Copy)]
pub struct LloydsOptions {
    /// The maximum number of assignment/update rounds.
    pub max_iterations: usize,
    /// Stop once no center moves more than this (squared euclidean distance).
    pub min_variation: f32,
    /// Upper bound on the number of similarities materialized per chunk.
    pub capacity: usize,
}

/// Run spherical Lloyd's iterations over the unit-length rows of `data`, updating `centers`
/// in place.
///
/// # Returns
///
/// Returns a tuple `x = (Vec<u32>, f64)` where
/// * `x.0` is the position-wise assignments of each data rows nearest center.
/// * `x.1` is the summed `1 - cosine similarity` of the final assignment pass.
///
/// Iteration ends early when the largest center movement falls below
/// `options.min_variation` or the loss is not finite. Zero `max_iterations` returns a
/// `NaN` loss.
pub fn spherical_lloyds(
    data: MatrixView<'_, f32>,
    mut centers: MutMatrixView<'_, f32>,
    options: &LloydsOptions,
) -> (Vec<u32>, f64) {
    let mut assignments: Vec<u32> = vec![0; data.nrows()];
    let mut loss = f64::NAN;
    let mut previous = centers.to_owned();

    for iteration in 0..options.max_iterations {
        loss = assign(
            data,
            centers.as_view(),
            options.capacity,
            &mut assignments,
        );

        previous
            .as_mut_slice()
            .copy_from_slice(centers.as_slice());
        update_centers(centers.as_mut_view(), data, &assignments);

        let movement = max_square_movement(previous.as_view(), centers.as_view());
        debug!(iteration, loss, movement, "spherical k-means step");

        if movement < options.min_variation || !loss.is_finite() {
            break;
        }
    }
    (assignments, loss)
}

///////////
// Tests //
///////////
