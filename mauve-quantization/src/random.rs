/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Reproducible random streams for randomized algorithms that may run in parallel.
//!
//! Every consumer of randomness (each clustering restart, each retry of a restart, the
//! sub-sampling of rows for principal component analysis) asks the builder for its own
//! generator, identified by a hashable "mixin". Streams never depend on scheduling order,
//! so sequential and parallel runs with the same seed see identical random numbers.

use std::hash::{Hash, Hasher};

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Creation of random number generator in potentially parallelized applications.
pub trait RngBuilder<T> {
    type Rng: Rng + 'static;

    /// Construct an Rng with the provided value for mixing randomness.
    fn build_rng(&self, mixin: T) -> Self::Rng;
}

/// A `RngBuilder` that returns a `rand::rngs::StdRng` and uses the default hasher to seed
/// the `mixin` value.
#[derive(Debug, Clone)]
pub struct StdRngBuilder {
    hasher: std::hash::DefaultHasher,
}

impl StdRngBuilder {
    /// Construct a new `StdRngBuilder` using the given seed.
    pub fn new(seed: u64) -> Self {
        let mut hasher = std::hash::DefaultHasher::new();
        seed.hash(&mut hasher);
        Self { hasher }
    }
}

impl<T> RngBuilder<T> for StdRngBuilder
where
    T: Hash,
{
    type Rng = StdRng;

    fn build_rng(&self, mixin: T) -> Self::Rng {
        let mut hasher = self.hasher.clone();
        mixin.hash(&mut hasher);
        StdRng::seed_from_u64(hasher.finish())
    }
}

///////////
// Tests //
///////////
