/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use mauve_utils::views::{self, Matrix, MatrixView};

use crate::algorithms::normalize::l2_normalize;

/// Return a copy of `data` with every row scaled to unit length.
pub(crate) fn normalized(data: MatrixView<'_, f32>) -> Matrix<f32> {
    let mut output = data.to_owned();
    output.row_iter_mut().for_each(l2_normalize);
    output
}

/// Return the distinct rows of `data` in lexicographic order.
///
/// Rows compare equal under `==` (so `-0.0` and `0.0` coincide).
pub(crate) fn unique_rows(data: MatrixView<'_, f32>) -> Matrix<f32> {
    let mut indices: Vec<usize> = (0..data.nrows()).collect();
    indices.sort_by(|&a, &b| {
        std::iter::zip(data.row(a), data.row(b))
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.dedup_by(|a, b| data.row(*a) == data.row(*b));
    views::select_rows(data, &indices)
}

/// Return the position of the largest cosine similarity in `similarities` (first one on
/// ties) together with the matching distance `1 - similarity`.
///
/// `similarities` must be non-empty.
#[inline]
pub(crate) fn nearest(similarities: &[f32]) -> (u32, f32) {
    let mut best = (0u32, 1.0 - similarities[0]);
    for (j, &s) in similarities.iter().enumerate().skip(1) {
        let distance = 1.0 - s;
        if distance < best.1 {
            best = (j as u32, distance);
        }
    }
    best
}

/// Return the largest squared euclidean distance between corresponding rows of `a` and `b`.
pub(crate) fn max_square_movement(a: MatrixView<'_, f32>, b: MatrixView<'_, f32>) -> f32 {
    debug_assert_eq!(a.nrows(), b.nrows());
    std::iter::zip(a.row_iter(), b.row_iter())
        .map(|(x, y)| {
            std::iter::zip(x, y)
                .map(|(i, j)| {
                    let d = i - j;
                    d * d
                })
                .sum::<f32>()
        })
        .fold(0.0f32, f32::max)
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_normalized() {
        let mut m = Matrix::new(0.0f32, 2, 2);
        m.row_mut(0).copy_from_slice(&[0.0, -5.0]);
        let n = normalized(m.as_view());
        assert_eq!(n.row(0), &[0.0, -1.0]);
        assert_eq!(n.row(1), &[0.0, 0.0]);
    }

    #[test]
    fn test_unique_rows() {
        let rows: [[f32; 2]; 6] = [
            [1.0, 0.0],
            [0.0, 1.0],
            [1.0, 0.0],
            [0.0, -0.0],
            [0.0, 0.0],
            [0.0, 1.0],
        ];
        let m = Matrix::from_fn(6, 2, |r, c| rows[r][c]);
        let unique = unique_rows(m.as_view());
        assert_eq!(unique.nrows(), 3);

        let mut got: Vec<Vec<f32>> = unique.row_iter().map(|r| r.to_vec()).collect();
        got.iter_mut().for_each(|r| r.iter_mut().for_each(|x| *x += 0.0));
        assert!(got.contains(&vec![1.0, 0.0]));
        assert!(got.contains(&vec![0.0, 1.0]));
        assert!(got.contains(&vec![0.0, 0.0]));
    }

    #[test]
    fn test_nearest() {
        assert_eq!(nearest(&[0.5]), (0, 0.5));
        let (index, distance) = nearest(&[0.1, 0.9, 0.9, -1.0]);
        // Ties keep the first occurrence.
        assert_eq!(index, 1);
        assert_abs_diff_eq!(distance, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_max_square_movement() {
        let a = Matrix::from_fn(2, 2, |r, c| (r * 2 + c) as f32);
        let mut b = a.clone();
        assert_eq!(max_square_movement(a.as_view(), b.as_view()), 0.0);
        b[(1, 0)] += 3.0;
        b[(0, 1)] += 1.0;
        assert_eq!(max_square_movement(a.as_view(), b.as_view()), 9.0);
    }
}
