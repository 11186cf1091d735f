/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

#![cfg_attr(docsrs, feature(doc_cfg))]

//! Training algorithms for turning two populations of embeddings into a shared codebook.
//!
//! * [PCA](crate::algorithms::pca): Fits a variance-ranked projection on the pooled
//!   embeddings and keeps the fewest leading components reaching an explained variance
//!   target.
//! * [Spherical k-means](crate::algorithms::kmeans): Partitions the reduced points by
//!   cosine similarity. Restarts are independent and may run in the Rayon thread pool
//!   (see [`Parallelism`]); the lowest-loss restart wins.
//!
//! Randomness is drawn through [`random::RngBuilder`], which hands every consumer its own
//! reproducible stream.

// common algorithms
pub mod algorithms;

pub mod error;
pub mod random;

/// Selector for the parallelization strategy used by some algorithms.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum Parallelism {
    /// Use single-threaded execution.
    #[default]
    Sequential,

    /// Use Rayon based parallelism in the dynamically scoped Rayon thread pool.
    #[cfg(feature = "rayon")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rayon")))]
    Rayon,
}
