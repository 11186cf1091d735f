/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Dense linear algebra on row-major `f32` slices.
//!
//! The MAUVE pipeline needs two kernels: a general matrix product (covariance estimation,
//! projection onto principal components and the point/center similarity tiles used during
//! clustering) and a singular value decomposition (principal component analysis).

pub mod common;
pub use common::Transpose;

mod faer;
use faer::{sgemm_impl, svd_into_impl};

use thiserror::Error;

#[cfg(test)]
mod reference;

/// Errors reported by the decompositions in this crate.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum LinalgError {
    #[error("singular value decomposition of a {m}x{n} matrix did not converge")]
    NoConvergence { m: usize, n: usize },
}

/// Matrix-matrix multiplication for implicit row-major matrices `a` and `b` using the
/// implicit row-major matrix `c` as the destination.
///
/// Performs one of the following operations:
/// ```ignore
/// 1. c = [beta * c] + alpha * a * b
/// 2. c = [beta * c] + alpha * a' * b
/// 3. c = [beta * c] + alpha * a * b'
/// 4. c = [beta * c] + alpha * a' * b'
/// ```
/// Where `x'` indicates the ordinary transpose of `x`.
///
/// If `beta` is `None`, the destination `c` is completely over-written.
///
/// * `m`: The number of rows in `c` (and `op(a)`).
/// * `n`: The number of columns in `c` (and `op(b)`).
/// * `k`: The number of columns in `op(a)` and the number of rows in `op(b)`.
///
/// # Panics
///
/// Panics if
/// * `a.len() != m * k`
/// * `b.len() != k * n`
/// * `c.len() != m * n`.
#[allow(clippy::too_many_arguments)]
pub fn sgemm(
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
    assert_eq!(
        a.len(),
        m * k,
        "expected {}x{} matrix `a` to have length {}, instead got {}",
        m,
        k,
        m * k,
        a.len()
    );
    assert_eq!(
        b.len(),
        k * n,
        "expected {}x{} matrix `b` to have length {}, instead got {}",
        k,
        n,
        k * n,
        b.len()
    );
    assert_eq!(
        c.len(),
        m * n,
        "expected {}x{} matrix `c` to have length {}, instead got {}",
        m,
        n,
        m * n,
        c.len()
    );

    sgemm_impl(atranspose, btranspose, m, n, k, alpha, a, b, beta, c)
}

/// Compute the SVD of the implicit row-major `m x n` matrix `a`.
///
/// * `singular_values`: Receives the singular values of `a` sorted so that
///   `singular_values[i] ≥ singular_values[i+1]`.
/// * `u`: Receives the `m x m` left singular vectors in Row-Major order (column `i` is the
///   `i`th left singular vector).
/// * `vt`: Receives the transposed `n x n` right singular vectors in Row-Major order (row `i`
///   is the `i`th right singular vector).
///
/// For a symmetric positive semi-definite input (such as a covariance matrix) the singular
/// values are the eigenvalues and the rows of `vt` the matching eigenvectors.
///
/// # Panics
///
/// Panics if
///
/// * `a.len() != m * n`
/// * `singular_values.len() != min(m, n)`
/// * `u.len() != m * m`.
/// * `vt.len() != n * n`.
pub fn svd_into(
    m: usize,
    n: usize,
    a: &[f32],
    singular_values: &mut [f32],
    u: &mut [f32],
    vt: &mut [f32],
) -> Result<(), LinalgError> {
    assert_eq!(a.len(), m * n, "expected a {m}x{n} input matrix");
    assert_eq!(
        singular_values.len(),
        m.min(n),
        "expected {} singular values",
        m.min(n)
    );
    assert_eq!(u.len(), m * m, "expected a {m}x{m} `u` matrix");
    assert_eq!(vt.len(), n * n, "expected a {n}x{n} `vt` matrix");

    svd_into_impl(m, n, a, singular_values, u, vt)
}
