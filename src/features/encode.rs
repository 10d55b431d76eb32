//! The single encoding function shared by training and serving.
//!
//! Missing-value policy:
//!
//! | field            | `Batch` (training)     | `Single` (serving) |
//! |------------------|------------------------|--------------------|
//! | `age`            | unresolved, row dropped | 60                |
//! | `gender`         | M (0)                  | M (0)              |
//! | `admission_type` | all-zero indicators    | EMERGENCY          |
//! | `lab_count`      | 0                      | 0                  |
//! | `abnormal_count` | 0                      | 0                  |
//!
//! Unknown gender strings encode as 0 and unknown admission types as an
//! all-zero indicator triple in both modes.

use crate::models::{AdmissionType, Gender};

use super::FeatureVector;

/// Upper bound of the age feature; out-of-range ages are clamped to it
pub const MAX_AGE: u8 = 90;

/// Age used when a single inference record omits it
pub const DEFAULT_AGE: i64 = 60;

/// Admission type used when a single inference record omits it
pub const DEFAULT_ADMISSION_TYPE: AdmissionType = AdmissionType::Emergency;

/// Whether the encoder runs over a training batch or one serving record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMode {
    Batch,
    Single,
}

/// Raw per-encounter values before defaulting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureInput {
    /// Age in whole years, unclamped
    pub age: Option<i64>,
    pub gender: Option<Gender>,
    pub admission_type: Option<AdmissionType>,
    pub lab_count: Option<u64>,
    pub abnormal_count: Option<u64>,
}

/// Why a record could not be encoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// A required value is absent and the mode has no default for it
    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    /// More abnormal results than results
    #[error("abnormal_count ({abnormal}) exceeds lab_count ({total})")]
    InconsistentLabCounts { total: u64, abnormal: u64 },
}

/// Clamp a raw age into `[0, 90]`: negative and above-90 ages both map to 90
#[must_use]
pub fn clamp_age(age: i64) -> u8 {
    if (0..=i64::from(MAX_AGE)).contains(&age) {
        age as u8
    } else {
        MAX_AGE
    }
}

/// Build a feature vector from raw values under the given missing-value policy
pub fn encode_features(
    input: &FeatureInput,
    mode: EncodingMode,
) -> Result<FeatureVector, EncodeError> {
    let age = match (input.age, mode) {
        (Some(age), _) => age,
        (None, EncodingMode::Single) => DEFAULT_AGE,
        (None, EncodingMode::Batch) => return Err(EncodeError::MissingField("age")),
    };

    let gender = input.gender.unwrap_or(Gender::Male);

    let indicators = match (&input.admission_type, mode) {
        (Some(adm_type), _) => adm_type.indicators(),
        (None, EncodingMode::Single) => DEFAULT_ADMISSION_TYPE.indicators(),
        (None, EncodingMode::Batch) => [0, 0, 0],
    };

    let lab_count = input.lab_count.unwrap_or(0);
    let abnormal_count = input.abnormal_count.unwrap_or(0);
    if abnormal_count > lab_count {
        return Err(EncodeError::InconsistentLabCounts {
            total: lab_count,
            abnormal: abnormal_count,
        });
    }

    let [type_elective, type_emergency, type_urgent] = indicators;
    Ok(FeatureVector {
        age: clamp_age(age),
        gender: gender.encoded(),
        lab_count,
        abnormal_count,
        type_elective,
        type_emergency,
        type_urgent,
    })
}
