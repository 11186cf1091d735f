/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The boundary to an external embedding model.
//!
//! The MAUVE computation only consumes numeric feature matrices. Populations supplied as
//! raw text or token ids are embedded by a caller-owned [`Featurizer`], typically a loaded
//! pretrained sequence model. The same handle can be reused across computations.

use mauve_utils::views::{Matrix, MatrixView};
use tracing::info;

use crate::error::{MauveError, Which};

/// One population, in any of the forms a computation accepts.
#[derive(Debug, Clone, Copy)]
pub enum Population<'a> {
    /// Embeddings, one row per example.
    Features(MatrixView<'a, f32>),
    /// Token ids, one sequence per example.
    Tokens(&'a [Vec<u32>]),
    /// Raw text, one string per example.
    Text(&'a [String]),
}

impl Population<'_> {
    fn describe(&self) -> &'static str {
        match self {
            Self::Features(_) => "features",
            Self::Tokens(_) => "tokens",
            Self::Text(_) => "text",
        }
    }

    /// The number of examples in the population.
    pub fn len(&self) -> usize {
        match self {
            Self::Features(m) => m.nrows(),
            Self::Tokens(t) => t.len(),
            Self::Text(t) => t.len(),
        }
    }

    /// Return `true` if the population has no examples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<'a> From<MatrixView<'a, f32>> for Population<'a> {
    fn from(view: MatrixView<'a, f32>) -> Self {
        Self::Features(view)
    }
}

/// An embedding model turning text into one feature vector per example.
pub trait Featurizer {
    /// The name of the underlying pretrained model.
    fn model_name(&self) -> &str;

    /// Tokenize `text`, truncating to at most `max_len` tokens.
    fn tokenize(
        &mut self,
        text: &str,
        max_len: usize,
    ) -> Result<Vec<u32>, Box<dyn std::error::Error + Send + Sync>>;

    /// Embed each token sequence, processing `batch_size` sequences per forward pass.
    ///
    /// The returned matrix must have one row per sequence.
    fn featurize(
        &mut self,
        tokens: &[Vec<u32>],
        batch_size: usize,
    ) -> Result<Matrix<f32>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Options forwarded to a [`Featurizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeaturizeOptions {
    /// The maximum number of tokens kept per example.
    pub max_text_length: usize,
    /// The number of sequences per forward pass.
    pub batch_size: usize,
}

impl Default for FeaturizeOptions {
    fn default() -> Self {
        Self {
            max_text_length: 1024,
            batch_size: 1,
        }
    }
}

/// Features either borrowed from the caller or produced by a featurizer.
#[derive(Debug)]
pub(crate) enum Features<'a> {
    Borrowed(MatrixView<'a, f32>),
    Owned(Matrix<f32>),
}

impl Features<'_> {
    pub(crate) fn as_view(&self) -> MatrixView<'_, f32> {
        match self {
            Self::Borrowed(view) => *view,
            Self::Owned(matrix) => matrix.as_view(),
        }
    }
}

/// Make sure `featurizer` is present whenever `population` needs one.
pub(crate) fn check_featurizer(
    which: Which,
    population: &Population<'_>,
    featurizer: Option<&dyn Featurizer>,
) -> Result<(), MauveError> {
    match (population, featurizer) {
        (Population::Features(_), _) | (_, Some(_)) => Ok(()),
        (_, None) => Err(MauveError::missing_featurizer(which, population.describe())),
    }
}

/// Obtain the feature matrix of `population`, running `featurizer` if needed.
pub(crate) fn resolve_features<'a>(
    which: Which,
    population: Population<'a>,
    featurizer: Option<&mut (dyn Featurizer + '_)>,
    options: &FeaturizeOptions,
    verbose: bool,
) -> Result<Features<'a>, MauveError> {
    let tokenized: Vec<Vec<u32>>;
    let (tokens, featurizer) = match (population, featurizer) {
        (Population::Features(view), _) => return Ok(Features::Borrowed(view)),
        (_, None) => return Err(MauveError::missing_featurizer(which, population.describe())),
        (Population::Tokens(tokens), Some(featurizer)) => (tokens, featurizer),
        (Population::Text(text), Some(featurizer)) => {
            if verbose {
                info!(population = %which, "tokenizing text");
            }
            tokenized = text
                .iter()
                .map(|t| featurizer.tokenize(t, options.max_text_length))
                .collect::<Result<_, _>>()
                .map_err(|err| {
                    MauveError::featurization(which, featurizer.model_name().into(), err)
                })?;
            (&tokenized[..], featurizer)
        }
    };

    if verbose {
        info!(population = %which, model = featurizer.model_name(), "featurizing tokens");
    }
    let features = featurizer
        .featurize(tokens, options.batch_size.max(1))
        .map_err(|err| MauveError::featurization(which, featurizer.model_name().into(), err))?;

    if features.nrows() != tokens.len() {
        return Err(MauveError::shape_mismatch(
            which,
            features.nrows(),
            tokens.len(),
        ));
    }
    Ok(Features::Owned(features))
}

///////////
// Tests //
///////////
