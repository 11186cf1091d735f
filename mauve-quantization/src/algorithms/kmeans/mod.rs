/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Spherical k-means: clustering under cosine similarity with randomized restarts.

pub(crate) mod common;
pub mod init;
pub mod lloyds;

use mauve_utils::views::MatrixView;
#[cfg(feature = "rayon")]
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{random::RngBuilder, Parallelism};

/// Parameters for [`cluster`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParameters {
    /// The requested number of clusters. Fewer may be produced if there are fewer unique
    /// points.
    pub num_clusters: usize,
    /// The number of independent restarts. The restart with the lowest loss wins.
    pub num_restarts: usize,
    /// The maximum number of Lloyd's iterations per restart.
    pub max_iterations: usize,
    /// Stop iterating once no center moves by more than this squared distance.
    pub min_variation: f32,
    /// Upper bound on the number of point/center similarities materialized at once.
    pub capacity: usize,
    /// The number of times a restart with a non-finite loss is re-seeded before giving up.
    pub max_retries: usize,
}

impl KMeansParameters {
    /// The default center-movement threshold.
    pub const DEFAULT_MIN_VARIATION: f32 = 1e-3;

    /// The default similarity tile budget, in elements.
    pub const DEFAULT_CAPACITY: usize = 1 << 24;

    /// The default retry budget for restarts ending with a non-finite loss.
    pub const DEFAULT_MAX_RETRIES: usize = 16;

    /// Construct parameters with default values for the stopping rule, tile capacity, and
    /// retry budget.
    pub fn new(num_clusters: usize, num_restarts: usize, max_iterations: usize) -> Self {
        Self {
            num_clusters,
            num_restarts,
            max_iterations,
            min_variation: Self::DEFAULT_MIN_VARIATION,
            capacity: Self::DEFAULT_CAPACITY,
            max_retries: Self::DEFAULT_MAX_RETRIES,
        }
    }
}

/// A hard assignment of points to clusters.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// The cluster of each input row, in `[0, num_clusters)`.
    pub assignments: Vec<u32>,
    /// The number of clusters actually produced.
    pub num_clusters: usize,
    /// The summed `1 - cosine similarity` of the selected restart. `None` when no
    /// iterations were needed.
    pub loss: Option<f64>,
}

/// Cluster the rows of `data` by cosine similarity.
///
/// Each restart `i` seeds its centers from distinct points using the generator
/// `rng_builder.build_rng((i, attempt))` and runs spherical Lloyd's iterations. A restart
/// that ends with a non-finite loss is re-seeded with the next `attempt`. The restart with
/// the lowest loss is returned, with the earliest restart winning ties, so the result does
/// not depend on `parallelism`.
///
/// Requesting a single cluster assigns every row to cluster 0 without iterating.
///
/// # Errors
///
/// * `params.num_clusters`, `params.num_restarts` or `params.max_iterations` is zero.
/// * `data` has no rows.
/// * `data` contains `NaN` or infinity.
/// * A restart still has a non-finite loss after `params.max_retries` retries.
pub fn cluster<R>(
    data: MatrixView<'_, f32>,
    params: &KMeansParameters,
    parallelism: Parallelism,
    rng_builder: &R,
) -> Result<Clustering, KMeansError>
where
    R: RngBuilder<(usize, usize)> + Sync,
{
    let npoints = data.nrows();
    let nclusters = params.num_clusters;
    let error = |kind| KMeansError {
        npoints,
        nclusters,
        kind,
    };

    if nclusters == 0 {
        return Err(error(KMeansErrorKind::ZeroClusters));
    }
    if params.num_restarts == 0 {
        return Err(error(KMeansErrorKind::ZeroRestarts));
    }
    if params.max_iterations == 0 {
        return Err(error(KMeansErrorKind::ZeroIterations));
    }
    if npoints == 0 {
        return Err(error(KMeansErrorKind::Empty));
    }
    if let Some(row) = first_non_finite(data, parallelism) {
        return Err(error(KMeansErrorKind::NonFiniteInput { row }));
    }

    if nclusters == 1 {
        return Ok(Clustering {
            assignments: vec![0; npoints],
            num_clusters: 1,
            loss: None,
        });
    }

    let normalized = common::normalized(data);
    let unique = common::unique_rows(normalized.as_view());
    if unique.nrows() < nclusters {
        warn!(
            requested = nclusters,
            unique = unique.nrows(),
            "fewer unique points than clusters, reducing the cluster count"
        );
    }

    let options = lloyds::LloydsOptions {
        max_iterations: params.max_iterations,
        min_variation: params.min_variation,
        capacity: params.capacity,
    };

    let thunk = |restart: usize| -> Result<Restart, KMeansError> {
        run_restart(restart, params.max_retries, |attempt| {
            let mut rng = rng_builder.build_rng((restart, attempt));
            let mut centers = init::select_initial_centers(unique.as_view(), nclusters, &mut rng);
            let (assignments, loss) =
                lloyds::spherical_lloyds(normalized.as_view(), centers.as_mut_view(), &options);
            Restart {
                assignments,
                loss,
                num_clusters: centers.nrows(),
            }
        })
        .map_err(error)
    };

    let restarts: Result<Vec<_>, _> = match parallelism {
        Parallelism::Sequential => (0..params.num_restarts).map(thunk).collect(),

        #[cfg(feature = "rayon")]
        Parallelism::Rayon => (0..params.num_restarts)
            .into_par_iter()
            .map(thunk)
            .collect(),
    };

    // Restarts are ordered by index, so the strict comparison keeps the first on ties.
    let best = restarts?
        .into_iter()
        .reduce(|best, next| if next.loss < best.loss { next } else { best })
        .ok_or_else(|| error(KMeansErrorKind::ZeroRestarts))?;

    Ok(Clustering {
        assignments: best.assignments,
        num_clusters: best.num_clusters,
        loss: Some(best.loss),
    })
}

/// The index of the first row containing `NaN` or infinity.
fn first_non_finite(data: MatrixView<'_, f32>, parallelism: Parallelism) -> Option<usize> {
    let non_finite = |row: &[f32]| row.iter().any(|x| !x.is_finite());
    match parallelism {
        Parallelism::Sequential => data.row_iter().position(non_finite),

        #[cfg(feature = "rayon")]
        Parallelism::Rayon => data.par_row_iter().position_first(non_finite),
    }
}

struct Restart {
    assignments: Vec<u32>,
    loss: f64,
    num_clusters: usize,
}

/// Run `attempt` with increasing attempt numbers until it produces a finite loss, giving up
/// after `max_retries` retries.
fn run_restart<F>(
    restart: usize,
    max_retries: usize,
    mut attempt: F,
) -> Result<Restart, KMeansErrorKind>
where
    F: FnMut(usize) -> Restart,
{
    for i in 0..=max_retries {
        let result = attempt(i);
        if result.loss.is_finite() {
            debug!(restart, attempt = i, loss = result.loss, "k-means restart finished");
            return Ok(result);
        }
        warn!(
            restart,
            attempt = i,
            loss = result.loss,
            "k-means restart produced a non-finite loss, retrying"
        );
    }
    Err(KMeansErrorKind::NonFiniteLoss {
        restart,
        attempts: max_retries + 1,
    })
}

#[derive(Debug, Error)]
#[error("k-means clustering of {npoints} points into {nclusters} clusters failed")]
pub struct KMeansError {
    npoints: usize,
    nclusters: usize,
    #[source]
    kind: KMeansErrorKind,
}

impl KMeansError {
    /// Return whether the error is caused by `NaN` or infinity, either in the input or in
    /// the loss of a restart.
    pub fn is_non_finite(&self) -> bool {
        matches!(
            self.kind,
            KMeansErrorKind::NonFiniteInput { .. } | KMeansErrorKind::NonFiniteLoss { .. }
        )
    }

    /// Return whether the error is caused by an invalid parameter.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self.kind,
            KMeansErrorKind::ZeroClusters
                | KMeansErrorKind::ZeroRestarts
                | KMeansErrorKind::ZeroIterations
        )
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
enum KMeansErrorKind {
    #[error("the number of clusters must be at least 1")]
    ZeroClusters,
    #[error("the number of restarts must be at least 1")]
    ZeroRestarts,
    #[error("the number of iterations must be at least 1")]
    ZeroIterations,
    #[error("there are no points to cluster")]
    Empty,
    #[error("row {row} contains NaN or infinity")]
    NonFiniteInput { row: usize },
    #[error("restart {restart} produced a non-finite loss in each of {attempts} attempts")]
    NonFiniteLoss { restart: usize, attempts: usize },
}

///////////
// Tests //
///////////
