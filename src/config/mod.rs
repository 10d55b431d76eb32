//! Configuration for the training pipeline and the inference service.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::util::safe_read_to_string;
use crate::error::{PipelineError, Result};

/// Default seed shared by the split and the forest
pub const DEFAULT_SEED: u64 = 42;

/// On-disk format of the persisted train/test matrices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatrixFormat {
    /// Comma-separated values with a header row
    #[default]
    Csv,
    /// Apache Parquet
    Parquet,
}

impl MatrixFormat {
    /// File extension used for this format
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl fmt::Display for MatrixFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Hyperparameters of the random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub n_trees: usize,
    /// Maximum tree depth (`None` grows until leaves are pure)
    pub max_depth: Option<usize>,
    /// Minimum number of samples required to split a node
    pub min_samples_split: usize,
    /// Minimum number of samples in each leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (`None` uses sqrt of the feature count)
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample for each tree
    pub bootstrap: bool,
    /// Seed for bootstrap sampling and feature selection
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: DEFAULT_SEED,
        }
    }
}

impl ForestConfig {
    /// Check that the hyperparameters describe a trainable forest
    pub fn validate(&self) -> Result<()> {
        if self.n_trees == 0 {
            return Err(PipelineError::Config("n_trees must be at least 1".into()));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::Config(
                "min_samples_split must be at least 2".into(),
            ));
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::Config(
                "min_samples_leaf must be at least 1".into(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(PipelineError::Config("max_features must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration for the ETL, training and serving stages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory searched (recursively) for the raw CSV extracts
    pub raw_dir: PathBuf,
    /// Directory receiving the train/test matrices
    pub processed_dir: PathBuf,
    /// Directory receiving the scaler, model and metrics artifacts
    pub model_dir: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the train/test split
    pub split_seed: u64,
    /// Format of the persisted matrices
    pub matrix_format: MatrixFormat,
    /// Worker threads for parallel stages
    pub worker_threads: usize,
    /// Random forest hyperparameters
    pub forest: ForestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            model_dir: PathBuf::from("models"),
            test_fraction: 0.2,
            split_seed: DEFAULT_SEED,
            matrix_format: MatrixFormat::Csv,
            worker_threads: num_cpus::get(),
            forest: ForestConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; absent keys keep their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = safe_read_to_string(path, "pipeline configuration")?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(PipelineError::Config(format!(
                "test_fraction must be in (0, 1), got {}",
                self.test_fraction
            )));
        }
        if self.worker_threads == 0 {
            return Err(PipelineError::Config(
                "worker_threads must be at least 1".into(),
            ));
        }
        self.forest.validate()
    }

    /// Path of a persisted matrix (`train` or `test`)
    #[must_use]
    pub fn matrix_path(&self, split: &str) -> PathBuf {
        self.processed_dir
            .join(format!("{split}.{}", self.matrix_format.extension()))
    }
}

impl fmt::Display for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Pipeline Configuration:")?;
        writeln!(f, "  Raw Directory: {}", self.raw_dir.display())?;
        writeln!(f, "  Processed Directory: {}", self.processed_dir.display())?;
        writeln!(f, "  Model Directory: {}", self.model_dir.display())?;
        writeln!(f, "  Test Fraction: {}", self.test_fraction)?;
        writeln!(f, "  Split Seed: {}", self.split_seed)?;
        writeln!(f, "  Matrix Format: {}", self.matrix_format)?;
        writeln!(f, "  Worker Threads: {}", self.worker_threads)?;
        writeln!(f, "  Trees: {}", self.forest.n_trees)?;
        if let Some(depth) = self.forest.max_depth {
            writeln!(f, "  Max Depth: {depth}")?;
        }
        writeln!(f, "  Forest Seed: {}", self.forest.seed)?;
        Ok(())
    }
}
