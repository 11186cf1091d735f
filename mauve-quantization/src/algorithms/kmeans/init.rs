/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use mauve_utils::views::{Matrix, MatrixView};
use rand::{seq::SliceRandom, Rng};

/// Two unit vectors whose cosine similarity is this close to 1 are treated as the same
/// center.
const DUPLICATE_TOLERANCE: f32 = 1e-5 + 1e-8;

/// Select up to `max_centers` initial centers from the unit-length rows of `unique`.
///
/// Rows are visited in a random order. A row is accepted if its largest cosine similarity
/// to the already accepted centers is not numerically 1. Selection stops once
/// `max_centers` centers are accepted or every row has been visited, so the returned matrix
/// may have fewer than `max_centers` rows.
///
/// Returns an empty matrix if `unique` has no rows.
pub fn select_initial_centers<R>(
    unique: MatrixView<'_, f32>,
    max_centers: usize,
    rng: &mut R,
) -> Matrix<f32>
where
    R: Rng + ?Sized,
{
    let mut order: Vec<usize> = (0..unique.nrows()).collect();
    order.shuffle(rng);

    let mut accepted: Vec<usize> = Vec::with_capacity(max_centers.min(order.len()));
    for candidate in order {
        if accepted.len() == max_centers {
            break;
        }

        let row = unique.row(candidate);
        let is_duplicate = accepted.iter().any(|&c| {
            let similarity: f32 = std::iter::zip(row, unique.row(c)).map(|(a, b)| a * b).sum();
            (similarity - 1.0).abs() <= DUPLICATE_TOLERANCE
        });

        if !is_duplicate {
            accepted.push(candidate);
        }
    }

    mauve_utils::views::select_rows(unique, &accepted)
}
