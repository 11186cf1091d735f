/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use mauve_utils::views::MutMatrixView;
#[cfg(feature = "rayon")]
use rayon::iter::ParallelIterator;

use crate::Parallelism;

/// Per-row normalization applied to pooled embeddings before dimensionality reduction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Normalization {
    /// Leave rows untouched.
    None,
    /// Scale each row to unit sum of absolute values.
    L1,
    /// Scale each row to unit Euclidean length.
    #[default]
    L2,
}

impl Normalization {
    /// Normalize every row of `data` in place. All-zero rows are left as zeros.
    ///
    /// Rows are independent, so the result does not depend on `parallelism`.
    pub fn apply(self, mut data: MutMatrixView<'_, f32>, parallelism: Parallelism) {
        let normalize: fn(&mut [f32]) = match self {
            Self::None => return,
            Self::L1 => l1_normalize,
            Self::L2 => l2_normalize,
        };
        match parallelism {
            Parallelism::Sequential => data.row_iter_mut().for_each(normalize),

            #[cfg(feature = "rayon")]
            Parallelism::Rayon => data.par_row_iter_mut().for_each(normalize),
        }
    }
}

fn l1_normalize(row: &mut [f32]) {
    let norm: f32 = row.iter().map(|x| x.abs()).sum();
    scale(row, norm);
}

/// Scale `row` to unit Euclidean length. All-zero rows are left unchanged.
pub fn l2_normalize(row: &mut [f32]) {
    let norm = square_norm(row).sqrt();
    scale(row, norm);
}

/// Return the squared Euclidean norm of `x`.
#[inline]
pub fn square_norm(x: &[f32]) -> f32 {
    x.iter().map(|&i| i * i).sum()
}

fn scale(row: &mut [f32], norm: f32) {
    // Mirrors the usual `x / max(norm, eps)` convention for normalizing zero vectors.
    let norm = norm.max(1e-12);
    row.iter_mut().for_each(|x| *x /= norm);
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use mauve_utils::Matrix;

    use super::*;

    #[test]
    fn test_l2() {
        let mut m = Matrix::new(0.0f32, 3, 2);
        m.row_mut(0).copy_from_slice(&[3.0, 4.0]);
        m.row_mut(1).copy_from_slice(&[-2.0, 0.0]);

        Normalization::L2.apply(m.as_mut_view(), Parallelism::Sequential);
        assert_abs_diff_eq!(m.row(0)[0], 0.6);
        assert_abs_diff_eq!(m.row(0)[1], 0.8);
        assert_eq!(m.row(1), &[-1.0, 0.0]);
        // The zero row stays zero.
        assert_eq!(m.row(2), &[0.0, 0.0]);
    }

    #[test]
    fn test_l1() {
        let mut m = Matrix::new(0.0f32, 1, 3);
        m.row_mut(0).copy_from_slice(&[1.0, -2.0, 1.0]);
        Normalization::L1.apply(m.as_mut_view(), Parallelism::Sequential);
        assert_eq!(m.row(0), &[0.25, -0.5, 0.25]);
    }

    #[test]
    fn test_none() {
        let mut m = Matrix::new(7.0f32, 2, 2);
        Normalization::None.apply(m.as_mut_view(), Parallelism::Sequential);
        assert!(m.as_slice().iter().all(|&x| x == 7.0));
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_rayon_matches_sequential() {
        let m = Matrix::from_fn(33, 5, |r, c| ((r * 5 + c) % 9) as f32 - 4.0);
        for normalization in [Normalization::L1, Normalization::L2] {
            let mut sequential = m.clone();
            normalization.apply(sequential.as_mut_view(), Parallelism::Sequential);
            let mut parallel = m.clone();
            normalization.apply(parallel.as_mut_view(), Parallelism::Rayon);
            assert_eq!(sequential, parallel, "{normalization:?}");
        }
    }
}
