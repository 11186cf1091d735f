/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Distributional comparison of two populations of embeddings.
//!
//! Given embeddings of a reference population `q` (for instance human-written text) and a
//! candidate population `p` (for instance model generations), the MAUVE score quantifies
//! how close the two distributions are without pairing individual examples:
//!
//! 1. Both populations are pooled, row-normalized, and reduced by
//!    [PCA](mauve_quantization::algorithms::pca) to the fewest components explaining the
//!    requested fraction of variance.
//! 2. The reduced points are partitioned by
//!    [spherical k-means](mauve_quantization::algorithms::kmeans) into a shared codebook.
//! 3. Each population becomes a [histogram](crate::histogram) over the codebook.
//! 4. The histograms are compared along the [divergence frontier](crate::divergence),
//!    which is summarized by its [area](crate::score::mauve) and by the closed-form
//!    [frontier integral](crate::score::frontier_integral).
//!
//! ```
//! use mauve::{compute_mauve, MauveParameters, NumBuckets};
//! use mauve_utils::Matrix;
//!
//! let p = Matrix::from_fn(50, 4, |r, c| ((r * 3 + c) % 7) as f32 + 1.0);
//! let q = Matrix::from_fn(60, 4, |r, c| ((r * 5 + c) % 7) as f32 + 1.0);
//!
//! let params = MauveParameters {
//!     num_buckets: NumBuckets::Fixed(4),
//!     ..MauveParameters::default()
//! };
//! let result = compute_mauve(p.as_view(), q.as_view(), &params).unwrap();
//! assert!((0.0..=1.0).contains(&result.mauve));
//! assert_eq!(result.divergence_curve.len(), 27);
//! ```
//!
//! Populations given as text or token ids are embedded through a caller-owned
//! [`Featurizer`] passed to [`compute_mauve_with`].

pub mod divergence;
pub mod error;
pub mod featurize;
pub mod histogram;
pub mod score;

mod compute;
mod params;

pub use compute::{compute_mauve, compute_mauve_with, MauveResult};
pub use divergence::DivergenceCurve;
pub use error::{ErrorKind, MauveError};
pub use featurize::{FeaturizeOptions, Featurizer, Population};
pub use mauve_quantization::{algorithms::Normalization, Parallelism};
pub use params::{MauveParameters, NumBuckets};
