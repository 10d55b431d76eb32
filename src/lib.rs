//! In-hospital mortality risk pipeline: load raw admission extracts, build a
//! fixed seven-column feature matrix, train a random forest and serve
//! single-record risk predictions from the persisted artifacts.

pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod inference;
pub mod loader;
pub mod model;
pub mod models;
pub mod pipeline;
pub mod utils;

// Core types
pub use config::{ForestConfig, MatrixFormat, PipelineConfig};
pub use error::{ErrorCategory, PipelineError, Result};

// Features
pub use features::{
    EncodingMode, FEATURE_COLUMNS, FeatureInput, FeatureMatrix, FeatureVector, LABEL_COLUMN,
    build_feature_matrix, encode_features,
};

// Model and serving
pub use inference::{InferenceRequest, InferenceResponse, InferenceService, RiskLevel};
pub use model::{EvaluationReport, ModelArtifacts, RandomForest, StandardScaler};

// Pipeline stages
pub use pipeline::{run_all, run_etl, run_etl_async, run_training};
