/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

pub mod kmeans;
pub mod normalize;
pub mod pca;

pub use kmeans::{cluster, Clustering, KMeansError, KMeansParameters};
pub use normalize::Normalization;
pub use pca::{reduce, Pca, PcaError, PcaParameters, Reduction};
