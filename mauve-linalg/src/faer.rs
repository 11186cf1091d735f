/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! `faer` kernels behind [`sgemm`](crate::sgemm) and [`svd_into`](crate::svd_into).
//!
//! Sizes are checked by the public wrappers before reaching this module.

use faer::{
    linalg::matmul::matmul,
    mat::{MatMut, MatRef},
    Accum, Par, Scale,
};

use super::{common::Transpose, LinalgError};

/// View the row-major slice `data` as the `nrows x ncols` operand `op(data)`.
///
/// With `Transpose::Ordinary` the slice itself holds an `ncols x nrows` matrix.
fn operand(data: &[f32], nrows: usize, ncols: usize, transpose: Transpose) -> MatRef<'_, f32> {
    transpose.call(
        || MatRef::from_row_major_slice(data, nrows, ncols),
        || MatRef::from_row_major_slice(data, ncols, nrows).transpose(),
    )
}

#[allow(clippy::too_many_arguments)]
pub(super) fn sgemm_impl(
    atranspose: Transpose,
    btranspose: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    b: &[f32],
    beta: Option<f32>,
    c: &mut [f32],
) {
    let lhs = operand(a, m, k, atranspose);
    let rhs = operand(b, k, n, btranspose);
    let mut dst = MatMut::from_row_major_slice_mut(c, m, n);

    // `matmul` either overwrites or adds into `dst`; any other `beta` is applied first.
    let accum = match beta {
        None => Accum::Replace,
        Some(beta) if beta == 1.0 => Accum::Add,
        Some(beta) => {
            dst *= Scale(beta);
            Accum::Add
        }
    };

    matmul(dst, accum, lhs, rhs, alpha, Par::Seq)
}

pub(super) fn svd_into_impl(
    m: usize,
    n: usize,
    a: &[f32],
    singular_values: &mut [f32],
    u: &mut [f32],
    vt: &mut [f32],
) -> Result<(), LinalgError> {
    let decomposition = MatRef::from_row_major_slice(a, m, n)
        .svd()
        .map_err(|_| LinalgError::NoConvergence { m, n })?;

    faer::col::ColMut::from_slice_mut(singular_values)
        .copy_from(decomposition.S().column_vector());
    MatMut::from_row_major_slice_mut(u, m, m).copy_from(decomposition.U());

    // A column-major `n x n` buffer holding `V` is `V'` read row by row.
    MatMut::from_row_major_slice_mut(vt, n, n)
        .transpose_mut()
        .copy_from(decomposition.V());

    Ok(())
}
