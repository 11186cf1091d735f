/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Variance-ranked linear dimensionality reduction (principal component analysis).
//!
//! The projection is fitted on the pooled embeddings (or a uniformly sampled subset of
//! them) and truncated to the fewest leading components whose cumulative explained
//! variance ratio reaches the requested fraction.

use mauve_linalg::{sgemm, svd_into, LinalgError, Transpose};
use mauve_utils::views::{self, Matrix, MatrixView};
use rand::Rng;
use thiserror::Error;
use tracing::debug;

/// Parameters controlling the reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcaParameters {
    explained_variance: f32,
    whiten: bool,
    max_fit_rows: Option<usize>,
}

impl PcaParameters {
    /// Construct parameters retaining `explained_variance` of the total variance.
    ///
    /// Returns an error if `explained_variance` is not strictly between 0 and 1.
    pub fn new(explained_variance: f32) -> Result<Self, PcaError> {
        if explained_variance > 0.0 && explained_variance < 1.0 {
            Ok(Self {
                explained_variance,
                whiten: false,
                max_fit_rows: None,
            })
        } else {
            Err(PcaError::ExplainedVariance(explained_variance))
        }
    }

    /// Rescale each retained component to unit variance.
    pub fn with_whiten(mut self, whiten: bool) -> Self {
        self.whiten = whiten;
        self
    }

    /// Fit on at most `rows` uniformly sampled rows. `None` or `Some(0)` fits on all rows.
    pub fn with_max_fit_rows(mut self, rows: Option<usize>) -> Self {
        self.max_fit_rows = rows.filter(|&r| r != 0);
        self
    }

    pub fn explained_variance(&self) -> f32 {
        self.explained_variance
    }

    pub fn whiten(&self) -> bool {
        self.whiten
    }

    pub fn max_fit_rows(&self) -> Option<usize> {
        self.max_fit_rows
    }
}

#[derive(Debug, Error, PartialEq)]
#[non_exhaustive]
pub enum PcaError {
    #[error("explained variance must lie strictly between 0 and 1, got {0}")]
    ExplainedVariance(f32),
    #[error("cannot fit on {requested} sampled rows when only {available} rows are available")]
    TooManyFitRows { requested: usize, available: usize },
    #[error("cannot reduce an empty {nrows}x{ncols} matrix")]
    Empty { nrows: usize, ncols: usize },
    #[error("eigen-decomposition of the covariance matrix failed")]
    Decomposition(#[from] LinalgError),
}

/// A fitted, truncated projection.
#[derive(Debug, Clone)]
pub struct Pca {
    mean: Vec<f32>,
    /// `k x d`, each row a unit-length principal direction.
    components: Matrix<f32>,
    /// Variance along each retained component.
    explained_variance: Vec<f32>,
    /// Ratio of the total variance for every component (not only the retained ones).
    explained_variance_ratio: Vec<f32>,
    whiten: bool,
}

impl Pca {
    /// Fit a projection on `data` according to `params`, using `rng` when rows are
    /// sub-sampled.
    pub fn fit<R>(
        params: &PcaParameters,
        data: MatrixView<'_, f32>,
        rng: &mut R,
    ) -> Result<Self, PcaError>
    where
        R: Rng + ?Sized,
    {
        let (nrows, ncols) = (data.nrows(), data.ncols());
        if nrows == 0 || ncols == 0 {
            return Err(PcaError::Empty { nrows, ncols });
        }

        match params.max_fit_rows {
            Some(requested) if requested > nrows => Err(PcaError::TooManyFitRows {
                requested,
                available: nrows,
            }),
            Some(requested) if requested < nrows => {
                let indices = rand::seq::index::sample(rng, nrows, requested).into_vec();
                let sample = views::select_rows(data, &indices);
                Self::fit_all(params, sample.as_view())
            }
            _ => Self::fit_all(params, data),
        }
    }

    fn fit_all(params: &PcaParameters, data: MatrixView<'_, f32>) -> Result<Self, PcaError> {
        let (n, d) = (data.nrows(), data.ncols());
        let mean = column_mean(data);
        let centered = center(data, &mean);

        // Sample covariance, `d x d`.
        let mut covariance = vec![0.0f32; d * d];
        let denominator = n.saturating_sub(1).max(1) as f32;
        sgemm(
            Transpose::Ordinary,
            Transpose::None,
            d,
            d,
            n,
            1.0 / denominator,
            centered.as_slice(),
            centered.as_slice(),
            None,
            &mut covariance,
        );

        let mut eigenvalues = vec![0.0f32; d];
        let mut u = vec![0.0f32; d * d];
        let mut vt = vec![0.0f32; d * d];
        svd_into(d, d, &covariance, &mut eigenvalues, &mut u, &mut vt)?;

        // Only `min(n, d)` components carry variance.
        let rank = n.min(d);
        eigenvalues.truncate(rank);

        let total: f64 = eigenvalues.iter().map(|&v| v as f64).sum();
        let explained_variance_ratio: Vec<f32> = if total > 0.0 && total.is_finite() {
            eigenvalues.iter().map(|&v| (v as f64 / total) as f32).collect()
        } else {
            vec![0.0; rank]
        };

        let k = if total > 0.0 && total.is_finite() {
            num_components(&explained_variance_ratio, params.explained_variance).unwrap_or(rank)
        } else {
            1
        };

        debug!(
            fit_rows = n,
            input_dim = d,
            reduced_dim = k,
            "fitted principal components"
        );

        let components = Matrix::from_fn(k, d, |r, c| vt[r * d + c]);
        Ok(Self {
            mean,
            components,
            explained_variance: eigenvalues[..k].to_vec(),
            explained_variance_ratio,
            whiten: params.whiten,
        })
    }

    /// The number of retained components.
    pub fn dim(&self) -> usize {
        self.components.nrows()
    }

    /// The retained components, one per row.
    pub fn components(&self) -> MatrixView<'_, f32> {
        self.components.as_view()
    }

    /// The explained variance ratio of every component, in decreasing order.
    pub fn explained_variance_ratio(&self) -> &[f32] {
        &self.explained_variance_ratio
    }

    /// Project `data` onto the retained components.
    ///
    /// # Panics
    ///
    /// Panics if `data` does not have the dimension the projection was fitted on.
    pub fn transform(&self, data: MatrixView<'_, f32>) -> Matrix<f32> {
        assert_eq!(
            data.ncols(),
            self.mean.len(),
            "projection was fitted on a different dimension"
        );

        let (n, d, k) = (data.nrows(), data.ncols(), self.dim());
        let centered = center(data, &self.mean);
        let mut output = Matrix::new(0.0f32, n, k);
        sgemm(
            Transpose::None,
            Transpose::Ordinary,
            n,
            k,
            d,
            1.0,
            centered.as_slice(),
            self.components.as_slice(),
            None,
            output.as_mut_slice(),
        );

        if self.whiten {
            let scales: Vec<f32> = self
                .explained_variance
                .iter()
                .map(|&v| if v > 0.0 { 1.0 / v.sqrt() } else { 1.0 })
                .collect();
            output.row_iter_mut().for_each(|row| {
                std::iter::zip(row.iter_mut(), scales.iter()).for_each(|(x, s)| *x *= s);
            });
        }
        output
    }
}

/// The output of [`reduce`]: the projected matrix alongside the fitted projection.
#[derive(Debug, Clone)]
pub struct Reduction {
    pub matrix: Matrix<f32>,
    pub pca: Pca,
}

/// Fit a projection on `data` and apply it to every row of `data`.
pub fn reduce<R>(
    params: &PcaParameters,
    data: MatrixView<'_, f32>,
    rng: &mut R,
) -> Result<Reduction, PcaError>
where
    R: Rng + ?Sized,
{
    let pca = Pca::fit(params, data, rng)?;
    let matrix = pca.transform(data);
    Ok(Reduction { matrix, pca })
}

/// Return the smallest `k` such that the first `k` ratios sum to at least `target`.
fn num_components(ratios: &[f32], target: f32) -> Option<usize> {
    let mut cumulative = 0.0f64;
    ratios
        .iter()
        .position(|&r| {
            cumulative += r as f64;
            cumulative >= target as f64
        })
        .map(|i| i + 1)
}

fn column_mean(data: MatrixView<'_, f32>) -> Vec<f32> {
    let mut sums = vec![0.0f64; data.ncols()];
    data.row_iter().for_each(|row| {
        std::iter::zip(sums.iter_mut(), row.iter()).for_each(|(s, &r)| *s += r as f64);
    });
    let n = data.nrows().max(1) as f64;
    sums.into_iter().map(|s| (s / n) as f32).collect()
}

fn center(data: MatrixView<'_, f32>, mean: &[f32]) -> Matrix<f32> {
    let mut centered = data.to_owned();
    centered.row_iter_mut().for_each(|row| {
        std::iter::zip(row.iter_mut(), mean.iter()).for_each(|(x, m)| *x -= m);
    });
    centered
}

///////////
// Tests //
///////////
