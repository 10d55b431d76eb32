//! Feature vectors and the column order contract
//!
//! The model consumes features in exactly the order of [`FEATURE_COLUMNS`].
//! Training matrices, the persisted scaler and forest, and every
//! inference request are keyed to this order; a vector built in any other
//! order would silently apply the wrong statistics to the wrong columns.
//! All vectors are produced by [`encode_features`], which the batch
//! builder and the inference adapter share.

pub mod builder;
pub mod encode;

pub use builder::{BuildStats, FeatureMatrix, LabAggregate, aggregate_lab_events, build_feature_matrix};
pub use encode::{
    DEFAULT_ADMISSION_TYPE, DEFAULT_AGE, EncodeError, EncodingMode, FeatureInput, MAX_AGE,
    clamp_age, encode_features,
};

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Number of model features
pub const N_FEATURES: usize = 7;

/// Fixed feature column order
pub const FEATURE_COLUMNS: [&str; N_FEATURES] = [
    "age",
    "gender",
    "lab_count",
    "abnormal_count",
    "type_ELECTIVE",
    "type_EMERGENCY",
    "type_URGENT",
];

/// Name of the label column
pub const LABEL_COLUMN: &str = "hospital_expire_flag";

/// Canonical numeric representation of one encounter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Age in whole years, within `[0, 90]`
    pub age: u8,
    /// 0 = M (or unknown), 1 = F
    pub gender: u8,
    /// Lab results recorded for the encounter
    pub lab_count: u64,
    /// Lab results flagged abnormal, never above `lab_count`
    pub abnormal_count: u64,
    #[serde(rename = "type_ELECTIVE")]
    pub type_elective: u8,
    #[serde(rename = "type_EMERGENCY")]
    pub type_emergency: u8,
    #[serde(rename = "type_URGENT")]
    pub type_urgent: u8,
}

impl FeatureVector {
    /// Values in [`FEATURE_COLUMNS`] order
    #[must_use]
    pub fn to_array(&self) -> [f64; N_FEATURES] {
        [
            f64::from(self.age),
            f64::from(self.gender),
            self.lab_count as f64,
            self.abnormal_count as f64,
            f64::from(self.type_elective),
            f64::from(self.type_emergency),
            f64::from(self.type_urgent),
        ]
    }

    /// The three admission-type indicators
    #[must_use]
    pub const fn type_indicators(&self) -> [u8; 3] {
        [self.type_elective, self.type_emergency, self.type_urgent]
    }

    /// Reject vectors that no encoder could have produced
    pub fn validate(&self) -> Result<()> {
        let indicators = self.type_indicators();
        let problem = if self.age > MAX_AGE {
            Some(format!("age {} exceeds {MAX_AGE}", self.age))
        } else if self.gender > 1 {
            Some(format!("gender must be 0 or 1, found {}", self.gender))
        } else if indicators.iter().any(|&i| i > 1) || indicators.iter().sum::<u8>() > 1 {
            Some(format!("admission type indicators {indicators:?} are not one-hot"))
        } else if self.abnormal_count > self.lab_count {
            Some(format!(
                "abnormal_count {} exceeds lab_count {}",
                self.abnormal_count, self.lab_count
            ))
        } else {
            None
        };

        problem.map_or(Ok(()), |p| Err(PipelineError::SchemaDrift(p)))
    }
}

/// A feature vector with its mortality label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabeledRow {
    pub features: FeatureVector,
    pub label: bool,
}

/// Verify that a persisted column list matches [`FEATURE_COLUMNS`] exactly
pub fn check_feature_columns<S: AsRef<str>>(columns: &[S], source: &str) -> Result<()> {
    let matches = columns.len() == N_FEATURES
        && columns
            .iter()
            .zip(FEATURE_COLUMNS)
            .all(|(actual, expected)| actual.as_ref() == expected);

    if matches {
        Ok(())
    } else {
        Err(PipelineError::SchemaDrift(format!(
            "{source} columns [{}] do not match the expected order [{}]",
            itertools::join(columns.iter().map(|c| -> &str { c.as_ref() }), ", "),
            FEATURE_COLUMNS.join(", ")
        )))
    }
}

/// Expected feature column names as owned strings
#[must_use]
pub fn feature_column_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect()
}
