/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::time::Instant;

use mauve_quantization::{
    algorithms::{kmeans, pca, KMeansParameters, PcaParameters},
    random::{RngBuilder, StdRngBuilder},
};
use mauve_utils::views::{self, MatrixView};
use serde::Serialize;
use tracing::info;

use crate::{
    divergence::{self, DivergenceCurve},
    error::{MauveError, Which},
    featurize::{self, FeaturizeOptions, Featurizer, Population},
    histogram, score, MauveParameters,
};

/// The outcome of a MAUVE computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MauveResult {
    /// The distribution of `p` over the shared codebook.
    pub p_hist: Vec<f64>,
    /// The distribution of `q` over the shared codebook.
    pub q_hist: Vec<f64>,
    /// The mapped divergence frontier, `divergence_curve_discretization_size + 2` points.
    pub divergence_curve: DivergenceCurve,
    /// The MAUVE score in `[0, 1]`. Higher means `p` is closer to `q`.
    pub mauve: f64,
    /// The scaled frontier integral. Lower means `p` is closer to `q`.
    pub frontier_integral: f64,
    /// The number of clusters actually produced. May be lower than requested when there
    /// are few distinct points.
    pub num_buckets: usize,
}

/// Compare two populations of embeddings, one row per example.
///
/// # Errors
///
/// Returns an error if `params` is invalid, if either population is empty or contains
/// `NaN` or infinity, if the populations have different dimensions, or if a population
/// ends up with no mass in the codebook.
pub fn compute_mauve(
    p: MatrixView<'_, f32>,
    q: MatrixView<'_, f32>,
    params: &MauveParameters,
) -> Result<MauveResult, MauveError> {
    compute_mauve_with(p.into(), q.into(), params, None, &FeaturizeOptions::default())
}

/// Compare two populations given as embeddings, token ids or text.
///
/// Populations that are not embeddings are passed through `featurizer`. Missing a
/// featurizer for such a population is reported before any work is done.
pub fn compute_mauve_with(
    p: Population<'_>,
    q: Population<'_>,
    params: &MauveParameters,
    mut featurizer: Option<&mut dyn Featurizer>,
    options: &FeaturizeOptions,
) -> Result<MauveResult, MauveError> {
    params.validate()?;
    featurize::check_featurizer(Which::P, &p, featurizer.as_deref())?;
    featurize::check_featurizer(Which::Q, &q, featurizer.as_deref())?;
    check_sizes(&p, &q, params)?;

    let p = featurize::resolve_features(
        Which::P,
        p,
        featurizer.as_deref_mut(),
        options,
        params.verbose,
    )?;
    let q = featurize::resolve_features(
        Which::Q,
        q,
        featurizer.as_deref_mut(),
        options,
        params.verbose,
    )?;
    compute_from_features(p.as_view(), q.as_view(), params)
}

fn compute_from_features(
    p: MatrixView<'_, f32>,
    q: MatrixView<'_, f32>,
    params: &MauveParameters,
) -> Result<MauveResult, MauveError> {
    check_finite(Which::P, p)?;
    check_finite(Which::Q, q)?;
    if p.ncols() != q.ncols() {
        return Err(MauveError::dimension_mismatch(p.ncols(), q.ncols()));
    }

    let num_clusters = params.num_buckets.resolve(p.nrows(), q.nrows());
    let num_q = q.nrows();

    let pca_params = PcaParameters::new(params.kmeans_explained_var)?
        .with_whiten(params.whiten)
        .with_max_fit_rows(params.pca_fit_rows());
    let kmeans_params =
        KMeansParameters::new(num_clusters, params.kmeans_num_redo, params.kmeans_max_iter);

    let start = Instant::now();

    // `q` first, then `p`.
    let mut pooled = views::vstack(&[q, p])
        .map_err(|err| MauveError::dimension_mismatch(err.got, err.expected))?;
    params
        .normalization
        .apply(pooled.as_mut_view(), params.parallelism);

    let builder = StdRngBuilder::new(params.seed);
    let reduction = pca::reduce(&pca_params, pooled.as_view(), &mut builder.build_rng("pca"))?;
    if params.verbose {
        info!(
            dim = reduction.pca.dim(),
            "performing clustering in lower dimension"
        );
    }

    let clustering_start = Instant::now();
    let clustering = kmeans::cluster(
        reduction.matrix.as_view(),
        &kmeans_params,
        params.parallelism,
        &builder,
    )?;
    if params.verbose {
        info!(
            "k-means time: {:.2} s",
            clustering_start.elapsed().as_secs_f64()
        );
        info!(
            "total discretization time: {:.2} s",
            start.elapsed().as_secs_f64()
        );
    }

    let histograms = histogram::build(&clustering.assignments, clustering.num_clusters, num_q)?;

    let weights = divergence::mixture_weights(params.divergence_curve_discretization_size);
    let curve = divergence::divergence_curve(
        &histograms.p,
        &histograms.q,
        &weights,
        params.mauve_scaling_factor,
    );
    let mauve = score::mauve(&curve);
    let frontier_integral = score::frontier_integral(
        &histograms.p,
        &histograms.q,
        params.frontier_integral_scaling,
    );

    Ok(MauveResult {
        p_hist: histograms.p,
        q_hist: histograms.q,
        divergence_curve: curve,
        mauve,
        frontier_integral,
        num_buckets: clustering.num_clusters,
    })
}

/// Checks that only need the number of examples, so they run before any featurization.
fn check_sizes(
    p: &Population<'_>,
    q: &Population<'_>,
    params: &MauveParameters,
) -> Result<(), MauveError> {
    if p.is_empty() {
        return Err(MauveError::empty(Which::P));
    }
    if q.is_empty() {
        return Err(MauveError::empty(Which::Q));
    }
    let num_pooled = p.len() + q.len();
    match params.pca_fit_rows() {
        Some(requested) if requested > num_pooled => {
            Err(MauveError::too_many_pca_rows(requested, num_pooled))
        }
        _ => Ok(()),
    }
}

fn check_finite(which: Which, features: MatrixView<'_, f32>) -> Result<(), MauveError> {
    match features
        .row_iter()
        .position(|row| row.iter().any(|x| !x.is_finite()))
    {
        Some(row) => Err(MauveError::non_finite(which, row)),
        None => Ok(()),
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use mauve_utils::views::Matrix;

    use super::*;
    use crate::{error::ErrorKind, NumBuckets};

    fn grid(nrows: usize, ncols: usize, offset: f32) -> Matrix<f32> {
        Matrix::from_fn(nrows, ncols, |r, c| {
            offset + ((r * 7 + c * 3) % 11) as f32 - 5.0
        })
    }

    #[test]
    fn test_identical_populations() {
        let p = grid(40, 3, 0.0);
        let params = MauveParameters {
            num_buckets: NumBuckets::Fixed(4),
            kmeans_num_redo: 2,
            ..MauveParameters::default()
        };
        let result = compute_mauve(p.as_view(), p.as_view(), &params).unwrap();

        assert_eq!(result.p_hist, result.q_hist);
        assert_abs_diff_eq!(result.mauve, 1.0, epsilon = 1e-9);
        assert_eq!(result.frontier_integral, 0.0);
        assert_eq!(result.p_hist.len(), result.num_buckets);
        assert_eq!(result.divergence_curve.len(), 27);
    }

    #[test]
    fn test_validation_happens_first() {
        // Both the parameters and the inputs are invalid; the parameters are reported.
        let p = Matrix::new(0.0f32, 0, 3);
        let q = Matrix::new(0.0f32, 2, 4);
        let params = MauveParameters {
            kmeans_explained_var: 1.5,
            ..MauveParameters::default()
        };
        let err = compute_mauve(p.as_view(), q.as_view(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_input_errors() {
        let params = MauveParameters::default();
        let p = grid(5, 3, 0.0);

        let empty = Matrix::new(0.0f32, 0, 3);
        let err = compute_mauve(p.as_view(), empty.as_view(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let wide = grid(5, 4, 0.0);
        let err = compute_mauve(p.as_view(), wide.as_view(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let mut bad = grid(5, 3, 0.0);
        bad[(3, 2)] = f32::NAN;
        let err = compute_mauve(bad.as_view(), p.as_view(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(crate::error::format(&err).contains("row 3"));
    }

    #[test]
    fn test_too_many_pca_rows() {
        let p = grid(5, 3, 0.0);
        let q = grid(6, 3, 1.0);
        let params = MauveParameters {
            pca_max_data: Some(12),
            ..MauveParameters::default()
        };
        let err = compute_mauve(p.as_view(), q.as_view(), &params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        // Exactly the pooled row count is allowed.
        let params = MauveParameters {
            pca_max_data: Some(11),
            ..MauveParameters::default()
        };
        assert!(compute_mauve(p.as_view(), q.as_view(), &params).is_ok());
    }

    /// Embeds text by its byte length, counting every call.
    #[derive(Default)]
    struct Lengths {
        tokenize_calls: usize,
        featurize_calls: usize,
    }

    impl Featurizer for Lengths {
        fn model_name(&self) -> &str {
            "lengths"
        }

        fn tokenize(
            &mut self,
            text: &str,
            max_len: usize,
        ) -> Result<Vec<u32>, Box<dyn std::error::Error + Send + Sync>> {
            self.tokenize_calls += 1;
            Ok(text.bytes().take(max_len).map(u32::from).collect())
        }

        fn featurize(
            &mut self,
            tokens: &[Vec<u32>],
            _batch_size: usize,
        ) -> Result<Matrix<f32>, Box<dyn std::error::Error + Send + Sync>> {
            self.featurize_calls += 1;
            Ok(Matrix::from_fn(tokens.len(), 2, |r, c| {
                (tokens[r].len() + c) as f32
            }))
        }
    }

    fn sentences(n: usize) -> Vec<String> {
        (0..n).map(|i| "word ".repeat(1 + i % 4)).collect()
    }

    #[test]
    fn test_size_errors_precede_featurization() {
        let p = sentences(5);
        let q = sentences(5);
        let options = FeaturizeOptions::default();

        let mut featurizer = Lengths::default();
        let params = MauveParameters {
            pca_max_data: Some(1000),
            ..MauveParameters::default()
        };
        let err = compute_mauve_with(
            Population::Text(&p),
            Population::Text(&q),
            &params,
            Some(&mut featurizer),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(featurizer.tokenize_calls, 0);
        assert_eq!(featurizer.featurize_calls, 0);

        let empty: Vec<String> = Vec::new();
        let err = compute_mauve_with(
            Population::Text(&p),
            Population::Text(&empty),
            &MauveParameters::default(),
            Some(&mut featurizer),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(crate::error::format(&err).contains("population q has no rows"));
        assert_eq!(featurizer.tokenize_calls, 0);
        assert_eq!(featurizer.featurize_calls, 0);

        let tokens = vec![vec![1u32, 2]; 3];
        let err = compute_mauve_with(
            Population::Tokens(&[]),
            Population::Tokens(&tokens),
            &MauveParameters::default(),
            Some(&mut featurizer),
            &options,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(featurizer.featurize_calls, 0);
    }
}
