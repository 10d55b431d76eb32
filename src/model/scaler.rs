//! Per-feature standardization
//!
//! Fitted once on the training matrix; test rows and inference requests
//! are transformed with the stored parameters and never refit.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::features::{N_FEATURES, check_feature_columns, feature_column_names};

/// Standard deviations below this are treated as zero variance
const ZERO_SCALE_TOLERANCE: f64 = 10.0 * f64::EPSILON;

/// Zero-mean, unit-variance transform with parameters learned from training rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Column order the parameters belong to
    pub feature_columns: Vec<String>,
    /// Per-column mean
    pub mean: Vec<f64>,
    /// Per-column standard deviation (1.0 for constant columns)
    pub scale: Vec<f64>,
    /// Rows seen during fitting
    pub n_samples: usize,
}

impl StandardScaler {
    /// Learn mean and population standard deviation per column
    pub fn fit(rows: &[[f64; N_FEATURES]]) -> Result<Self> {
        if rows.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit scaler on an empty training matrix".into(),
            ));
        }

        let n = rows.len() as f64;
        let mut mean = [0.0; N_FEATURES];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut variance = [0.0; N_FEATURES];
        for row in rows {
            for ((var, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *var += (v - m).powi(2);
            }
        }

        let scale = variance
            .iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std < ZERO_SCALE_TOLERANCE { 1.0 } else { std }
            })
            .collect();

        Ok(Self {
            feature_columns: feature_column_names(),
            mean: mean.to_vec(),
            scale,
            n_samples: rows.len(),
        })
    }

    /// Standardize one row
    #[must_use]
    pub fn transform(&self, row: &[f64; N_FEATURES]) -> [f64; N_FEATURES] {
        let mut out = [0.0; N_FEATURES];
        for (i, value) in out.iter_mut().enumerate() {
            *value = (row[i] - self.mean[i]) / self.scale[i];
        }
        out
    }

    /// Standardize many rows
    #[must_use]
    pub fn transform_all(&self, rows: &[[f64; N_FEATURES]]) -> Vec<[f64; N_FEATURES]> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    /// Check that a loaded scaler is keyed to the fixed column order and usable
    pub fn validate(&self) -> Result<()> {
        check_feature_columns(&self.feature_columns, "scaler")?;
        if self.mean.len() != N_FEATURES || self.scale.len() != N_FEATURES {
            return Err(PipelineError::SchemaDrift(format!(
                "scaler holds {} means and {} scales for {N_FEATURES} features",
                self.mean.len(),
                self.scale.len()
            )));
        }
        if self.mean.iter().any(|m| !m.is_finite())
            || self.scale.iter().any(|s| !s.is_finite() || *s <= 0.0)
        {
            return Err(PipelineError::SchemaDrift(
                "scaler parameters must be finite with positive scale".into(),
            ));
        }
        Ok(())
    }
}
