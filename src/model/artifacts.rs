//! Persisted scaler and classifier
//!
//! Both artifacts are JSON documents that carry the feature column order
//! they were fitted on. Loading validates that order before anything is
//! handed to the serving path.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::util::{safe_create_file, safe_read_to_string};
use crate::error::{PipelineError, Result};

use super::forest::RandomForest;
use super::metrics::EvaluationReport;
use super::scaler::StandardScaler;

/// File name of the persisted scaler
pub const SCALER_FILE: &str = "scaler.json";
/// File name of the persisted classifier
pub const MODEL_FILE: &str = "model.json";
/// File name of the evaluation report
pub const METRICS_FILE: &str = "metrics.json";

/// Fitted scaler and classifier, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifacts {
    pub scaler: StandardScaler,
    pub forest: RandomForest,
}

fn write_json<T: Serialize>(value: &T, path: &Path, purpose: &str) -> Result<()> {
    let mut writer = BufWriter::new(safe_create_file(path, purpose)?);
    serde_json::to_writer(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, purpose: &str) -> Result<T> {
    let content = safe_read_to_string(path, purpose)?;
    Ok(serde_json::from_str(&content)?)
}

impl ModelArtifacts {
    /// Write `scaler.json` and `model.json` into `dir`
    pub fn save(&self, dir: &Path) -> Result<()> {
        write_json(&self.scaler, &dir.join(SCALER_FILE), "scaler artifact")?;
        log::info!("Scaler saved to {}", dir.join(SCALER_FILE).display());
        write_json(&self.forest, &dir.join(MODEL_FILE), "model artifact")?;
        log::info!("Model saved to {}", dir.join(MODEL_FILE).display());
        Ok(())
    }

    /// Load and validate both artifacts
    ///
    /// Any failure (missing file, bad JSON, drifted columns) is reported as
    /// [`PipelineError::ArtifactUnavailable`].
    pub fn load(dir: &Path) -> Result<Self> {
        let unavailable =
            |what: &str, e: PipelineError| PipelineError::ArtifactUnavailable(format!("{what}: {e}"));

        let scaler: StandardScaler = read_json(&dir.join(SCALER_FILE), "scaler artifact")
            .map_err(|e| unavailable("scaler", e))?;
        scaler.validate().map_err(|e| unavailable("scaler", e))?;

        let forest: RandomForest = read_json(&dir.join(MODEL_FILE), "model artifact")
            .map_err(|e| unavailable("model", e))?;
        forest.validate().map_err(|e| unavailable("model", e))?;

        log::info!(
            "Loaded scaler ({} training rows) and forest ({} trees) from {}",
            scaler.n_samples,
            forest.trees.len(),
            dir.display()
        );
        Ok(Self { scaler, forest })
    }
}

/// Write the evaluation report as `metrics.json`
pub fn save_report(report: &EvaluationReport, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(METRICS_FILE);
    write_json(report, &path, "evaluation report")?;
    Ok(path)
}
