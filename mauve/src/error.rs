/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use mauve_quantization::algorithms::{KMeansError, PcaError};
use thiserror::Error;

pub use mauve_quantization::error::format;

/// The population an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Which {
    P,
    Q,
}

impl std::fmt::Display for Which {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::P => write!(f, "p"),
            Self::Q => write!(f, "q"),
        }
    }
}

/// Broad classification of a [`MauveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A caller-supplied parameter is invalid.
    Configuration,
    /// The supplied populations cannot be compared.
    InvalidInput,
    /// Tokens or text were supplied without a featurizer to embed them.
    MissingFeaturizer,
    /// The featurizer failed.
    Featurization,
    /// A population has no mass in any cluster.
    DegenerateHistogram,
    /// A numerical routine failed to produce a finite result.
    Numerical,
}

/// An error raised while computing a MAUVE score.
///
/// Use [`format`] to render the full chain of causes.
#[derive(Debug, Error)]
#[error("mauve computation failed")]
pub struct MauveError {
    #[source]
    kind: MauveErrorKind,
}

impl MauveError {
    /// Return the broad classification of this error.
    pub fn kind(&self) -> ErrorKind {
        use MauveErrorKind as K;
        match &self.kind {
            K::ExplainedVariance(_)
            | K::ZeroBuckets
            | K::ZeroRestarts
            | K::ZeroIterations
            | K::ScalingFactor { .. }
            | K::TooManyPcaRows { .. } => ErrorKind::Configuration,
            K::Empty(_)
            | K::DimensionMismatch { .. }
            | K::NonFinite { .. }
            | K::ShapeMismatch { .. }
            | K::LabelOutOfRange { .. } => ErrorKind::InvalidInput,
            K::MissingFeaturizer { .. } => ErrorKind::MissingFeaturizer,
            K::Featurization { .. } => ErrorKind::Featurization,
            K::DegenerateHistogram(_) => ErrorKind::DegenerateHistogram,
            K::Reduction(err) => match err {
                PcaError::ExplainedVariance(_) | PcaError::TooManyFitRows { .. } => {
                    ErrorKind::Configuration
                }
                PcaError::Empty { .. } => ErrorKind::InvalidInput,
                _ => ErrorKind::Numerical,
            },
            K::Clustering(err) => {
                if err.is_invalid_parameter() {
                    ErrorKind::Configuration
                } else if err.is_non_finite() {
                    ErrorKind::Numerical
                } else {
                    ErrorKind::InvalidInput
                }
            }
        }
    }

    pub(crate) fn explained_variance(value: f32) -> Self {
        MauveErrorKind::ExplainedVariance(value).into()
    }

    pub(crate) fn zero_buckets() -> Self {
        MauveErrorKind::ZeroBuckets.into()
    }

    pub(crate) fn zero_restarts() -> Self {
        MauveErrorKind::ZeroRestarts.into()
    }

    pub(crate) fn zero_iterations() -> Self {
        MauveErrorKind::ZeroIterations.into()
    }

    pub(crate) fn scaling_factor(name: &'static str, value: f64) -> Self {
        MauveErrorKind::ScalingFactor { name, value }.into()
    }

    pub(crate) fn too_many_pca_rows(requested: usize, available: usize) -> Self {
        MauveErrorKind::TooManyPcaRows {
            requested,
            available,
        }
        .into()
    }

    pub(crate) fn empty(which: Which) -> Self {
        MauveErrorKind::Empty(which).into()
    }

    pub(crate) fn dimension_mismatch(p: usize, q: usize) -> Self {
        MauveErrorKind::DimensionMismatch { p, q }.into()
    }

    pub(crate) fn non_finite(which: Which, row: usize) -> Self {
        MauveErrorKind::NonFinite { which, row }.into()
    }

    pub(crate) fn shape_mismatch(which: Which, rows: usize, expected: usize) -> Self {
        MauveErrorKind::ShapeMismatch {
            which,
            rows,
            expected,
        }
        .into()
    }

    pub(crate) fn label_out_of_range(label: u32, num_clusters: usize) -> Self {
        MauveErrorKind::LabelOutOfRange {
            label,
            num_clusters,
        }
        .into()
    }

    pub(crate) fn missing_featurizer(which: Which, input: &'static str) -> Self {
        MauveErrorKind::MissingFeaturizer { which, input }.into()
    }

    pub(crate) fn featurization(
        which: Which,
        model: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        MauveErrorKind::Featurization {
            which,
            model,
            source,
        }
        .into()
    }

    pub(crate) fn degenerate_histogram(which: Which) -> Self {
        MauveErrorKind::DegenerateHistogram(which).into()
    }
}

impl From<MauveErrorKind> for MauveError {
    fn from(kind: MauveErrorKind) -> Self {
        Self { kind }
    }
}

impl From<PcaError> for MauveError {
    fn from(err: PcaError) -> Self {
        MauveErrorKind::Reduction(err).into()
    }
}

impl From<KMeansError> for MauveError {
    fn from(err: KMeansError) -> Self {
        MauveErrorKind::Clustering(err).into()
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
enum MauveErrorKind {
    #[error("explained variance must lie strictly between 0 and 1, got {0}")]
    ExplainedVariance(f32),
    #[error("the number of buckets must be \"auto\" or at least 1")]
    ZeroBuckets,
    #[error("the number of k-means restarts must be at least 1")]
    ZeroRestarts,
    #[error("the number of k-means iterations must be at least 1")]
    ZeroIterations,
    #[error("{name} must be positive and finite, got {value}")]
    ScalingFactor { name: &'static str, value: f64 },
    #[error("cannot fit the reduction on {requested} rows when only {available} rows are pooled")]
    TooManyPcaRows { requested: usize, available: usize },
    #[error("population {0} has no rows")]
    Empty(Which),
    #[error("populations have different dimensions: p has {p}, q has {q}")]
    DimensionMismatch { p: usize, q: usize },
    #[error("population {which} contains NaN or infinity in row {row}")]
    NonFinite { which: Which, row: usize },
    #[error("featurizer returned {rows} rows for population {which}, expected {expected}")]
    ShapeMismatch {
        which: Which,
        rows: usize,
        expected: usize,
    },
    #[error("cluster label {label} is out of range for {num_clusters} clusters")]
    LabelOutOfRange { label: u32, num_clusters: usize },
    #[error("population {which} was supplied as {input} but no featurizer was provided")]
    MissingFeaturizer { which: Which, input: &'static str },
    #[error("featurizing population {which} with model \"{model}\" failed")]
    Featurization {
        which: Which,
        model: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("population {0} has no mass in any cluster")]
    DegenerateHistogram(Which),
    #[error("dimensionality reduction failed")]
    Reduction(#[source] PcaError),
    #[error("clustering failed")]
    Clustering(#[source] KMeansError),
}

///////////
// Tests //
///////////
