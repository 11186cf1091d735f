/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::fmt;

use mauve_quantization::{algorithms::Normalization, Parallelism};
use serde::{
    de::{self, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

use crate::error::MauveError;

/// The size of the shared codebook.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NumBuckets {
    /// One bucket per ten points of the smaller population (ties round to even), and at
    /// least two.
    #[default]
    Auto,
    /// An explicit number of buckets.
    Fixed(usize),
}

impl NumBuckets {
    /// Resolve the requested number of clusters for populations of `n_p` and `n_q` points.
    ///
    /// ```
    /// use mauve::NumBuckets;
    ///
    /// assert_eq!(NumBuckets::Auto.resolve(1000, 1000), 100);
    /// assert_eq!(NumBuckets::Auto.resolve(3, 500), 2);
    /// assert_eq!(NumBuckets::Fixed(7).resolve(3, 500), 7);
    /// ```
    pub fn resolve(self, n_p: usize, n_q: usize) -> usize {
        match self {
            Self::Auto => {
                let n = n_p.min(n_q) as f64;
                ((n / 10.0).round_ties_even() as usize).max(2)
            }
            Self::Fixed(n) => n,
        }
    }
}

impl fmt::Display for NumBuckets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Fixed(n) => write!(f, "{}", n),
        }
    }
}

impl Serialize for NumBuckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Auto => serializer.serialize_str("auto"),
            Self::Fixed(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for NumBuckets {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumBucketsVisitor;

        impl Visitor<'_> for NumBucketsVisitor {
            type Value = NumBuckets;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "\"auto\" or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == "auto" {
                    Ok(NumBuckets::Auto)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                usize::try_from(v)
                    .map(NumBuckets::Fixed)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                usize::try_from(v)
                    .map(NumBuckets::Fixed)
                    .map_err(|_| E::invalid_value(de::Unexpected::Signed(v), &self))
            }
        }

        deserializer.deserialize_any(NumBucketsVisitor)
    }
}

/// Configuration of a MAUVE computation.
///
/// Every field has a default, so a partial JSON object deserializes to a complete
/// configuration:
///
/// ```
/// use mauve::{MauveParameters, NumBuckets};
///
/// let params: MauveParameters =
///     serde_json::from_str(r#"{ "num_buckets": 10, "kmeans_num_redo": 1 }"#).unwrap();
/// assert_eq!(params.num_buckets, NumBuckets::Fixed(10));
/// assert_eq!(params.kmeans_num_redo, 1);
/// assert_eq!(params.kmeans_max_iter, 500);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MauveParameters {
    /// The requested size of the shared codebook.
    pub num_buckets: NumBuckets,
    /// Fit the reduction on this many sampled rows. `None` or `0` uses every pooled row.
    ///
    /// Configuration files may also spell "every row" as any non-positive integer, such
    /// as `-1`.
    #[serde(deserialize_with = "deserialize_pca_max_data")]
    pub pca_max_data: Option<usize>,
    /// The fraction of variance retained by the reduction, strictly between 0 and 1.
    pub kmeans_explained_var: f32,
    /// The number of clustering restarts. The lowest-loss restart is kept.
    pub kmeans_num_redo: usize,
    /// The maximum number of clustering iterations per restart.
    pub kmeans_max_iter: usize,
    /// The number of mixture weights swept by the divergence curve.
    pub divergence_curve_discretization_size: usize,
    /// The decay constant `c` mapping divergences to `exp(-c * x)`.
    pub mauve_scaling_factor: f64,
    /// The multiplier applied to the frontier integral.
    pub frontier_integral_scaling: f64,
    /// Seed for row sub-sampling and cluster seeding.
    pub seed: u64,
    /// Emit stage timings at `info` level.
    pub verbose: bool,
    /// Row normalization applied to the pooled embeddings before the reduction.
    pub normalization: Normalization,
    /// Rescale each retained component to unit variance.
    pub whiten: bool,
    /// How clustering restarts are scheduled. Does not affect results.
    #[serde(skip)]
    pub parallelism: Parallelism,
}

impl Default for MauveParameters {
    fn default() -> Self {
        Self {
            num_buckets: NumBuckets::Auto,
            pca_max_data: None,
            kmeans_explained_var: 0.9,
            kmeans_num_redo: 5,
            kmeans_max_iter: 500,
            divergence_curve_discretization_size: 25,
            mauve_scaling_factor: 5.0,
            frontier_integral_scaling: 2.0,
            seed: 25,
            verbose: false,
            normalization: Normalization::L2,
            whiten: false,
            parallelism: Parallelism::Sequential,
        }
    }
}

impl MauveParameters {
    /// Check every parameter that can be checked without looking at the data.
    pub fn validate(&self) -> Result<(), MauveError> {
        let v = self.kmeans_explained_var;
        if !(v > 0.0 && v < 1.0) {
            return Err(MauveError::explained_variance(v));
        }
        if self.num_buckets == NumBuckets::Fixed(0) {
            return Err(MauveError::zero_buckets());
        }
        if self.kmeans_num_redo == 0 {
            return Err(MauveError::zero_restarts());
        }
        if self.kmeans_max_iter == 0 {
            return Err(MauveError::zero_iterations());
        }
        check_scaling("mauve_scaling_factor", self.mauve_scaling_factor)?;
        check_scaling("frontier_integral_scaling", self.frontier_integral_scaling)?;
        Ok(())
    }

    /// The number of rows the reduction is fitted on, if sub-sampling is requested.
    pub(crate) fn pca_fit_rows(&self) -> Option<usize> {
        self.pca_max_data.filter(|&n| n != 0)
    }
}

fn deserialize_pca_max_data<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<i64>::deserialize(deserializer)? {
        Some(n) if n > 0 => usize::try_from(n)
            .map(Some)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Signed(n), &"a row count")),
        _ => Ok(None),
    }
}

fn check_scaling(name: &'static str, value: f64) -> Result<(), MauveError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(MauveError::scaling_factor(name, value))
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::error::ErrorKind;

    #[rstest]
    #[case(1000, 1000, 100)]
    #[case(1000, 50, 5)]
    #[case(14, 10_000, 2)]
    #[case(15, 15, 2)]
    #[case(25, 30, 2)]
    #[case(35, 30, 3)]
    #[case(45, 45, 4)]
    #[case(55, 60, 6)]
    #[case(1, 1, 2)]
    fn test_auto_buckets(#[case] n_p: usize, #[case] n_q: usize, #[case] expected: usize) {
        assert_eq!(NumBuckets::Auto.resolve(n_p, n_q), expected);
    }

    #[test]
    fn test_defaults() {
        let params = MauveParameters::default();
        assert_eq!(params.num_buckets, NumBuckets::Auto);
        assert_eq!(params.pca_max_data, None);
        assert_eq!(params.kmeans_explained_var, 0.9);
        assert_eq!(params.kmeans_num_redo, 5);
        assert_eq!(params.kmeans_max_iter, 500);
        assert_eq!(params.divergence_curve_discretization_size, 25);
        assert_eq!(params.mauve_scaling_factor, 5.0);
        assert_eq!(params.frontier_integral_scaling, 2.0);
        assert_eq!(params.seed, 25);
        assert!(!params.verbose);
        assert_eq!(params.normalization, Normalization::L2);
        assert!(!params.whiten);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_deserialize() {
        let params: MauveParameters = serde_json::from_str(
            r#"{
                "num_buckets": "auto",
                "pca_max_data": 200,
                "kmeans_explained_var": 0.5,
                "normalization": "l1",
                "seed": 3
            }"#,
        )
        .unwrap();
        assert_eq!(params.num_buckets, NumBuckets::Auto);
        assert_eq!(params.pca_max_data, Some(200));
        assert_eq!(params.kmeans_explained_var, 0.5);
        assert_eq!(params.normalization, Normalization::L1);
        assert_eq!(params.seed, 3);
        assert_eq!(params.kmeans_num_redo, 5);

        let params: MauveParameters = serde_json::from_str(r#"{ "num_buckets": 12 }"#).unwrap();
        assert_eq!(params.num_buckets, NumBuckets::Fixed(12));
    }

    #[rstest]
    #[case(r#"{ "pca_max_data": -1 }"#, None)]
    #[case(r#"{ "pca_max_data": -50 }"#, None)]
    #[case(r#"{ "pca_max_data": 0 }"#, None)]
    #[case(r#"{ "pca_max_data": null }"#, None)]
    #[case(r#"{}"#, None)]
    #[case(r#"{ "pca_max_data": 1 }"#, Some(1))]
    #[case(r#"{ "pca_max_data": 5000 }"#, Some(5000))]
    fn test_deserialize_pca_max_data(#[case] json: &str, #[case] expected: Option<usize>) {
        let params: MauveParameters = serde_json::from_str(json).unwrap();
        assert_eq!(params.pca_max_data, expected);
        assert_eq!(params.pca_fit_rows(), expected);
    }

    #[rstest]
    #[case(r#"{ "num_buckets": "many" }"#)]
    #[case(r#"{ "num_buckets": -3 }"#)]
    #[case(r#"{ "num_buckets": 2.5 }"#)]
    #[case(r#"{ "unknown_field": 1 }"#)]
    #[case(r#"{ "pca_max_data": "all" }"#)]
    #[case(r#"{ "pca_max_data": 1.5 }"#)]
    fn test_deserialize_rejects(#[case] json: &str) {
        assert!(serde_json::from_str::<MauveParameters>(json).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let params = MauveParameters {
            num_buckets: NumBuckets::Fixed(9),
            pca_max_data: Some(100),
            ..MauveParameters::default()
        };
        let json = serde_json::to_string(&params).unwrap();
        assert!(json.contains(r#""num_buckets":9"#), "{json}");
        assert!(json.contains(r#""normalization":"l2""#), "{json}");

        let back: MauveParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);

        let json = serde_json::to_string(&MauveParameters::default()).unwrap();
        assert!(json.contains(r#""num_buckets":"auto""#), "{json}");
    }

    #[rstest]
    #[case(MauveParameters { kmeans_explained_var: 0.0, ..Default::default() })]
    #[case(MauveParameters { kmeans_explained_var: 1.0, ..Default::default() })]
    #[case(MauveParameters { kmeans_explained_var: f32::NAN, ..Default::default() })]
    #[case(MauveParameters { num_buckets: NumBuckets::Fixed(0), ..Default::default() })]
    #[case(MauveParameters { kmeans_num_redo: 0, ..Default::default() })]
    #[case(MauveParameters { kmeans_max_iter: 0, ..Default::default() })]
    #[case(MauveParameters { mauve_scaling_factor: 0.0, ..Default::default() })]
    #[case(MauveParameters { mauve_scaling_factor: f64::INFINITY, ..Default::default() })]
    #[case(MauveParameters { frontier_integral_scaling: -2.0, ..Default::default() })]
    fn test_validate_rejects(#[case] params: MauveParameters) {
        let err = params.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_pca_fit_rows() {
        let mut params = MauveParameters::default();
        assert_eq!(params.pca_fit_rows(), None);
        params.pca_max_data = Some(0);
        assert_eq!(params.pca_fit_rows(), None);
        params.pca_max_data = Some(10);
        assert_eq!(params.pca_fit_rows(), Some(10));
    }
}
