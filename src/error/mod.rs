//! Error handling for the mortality risk pipeline.
//!
//! Every failure maps onto one of four categories: missing artifacts,
//! invalid client input, schema drift and missing data sources. The
//! remaining variants wrap lower-level I/O and format errors.

pub mod util;

use std::io;
use std::path::{Path, PathBuf};

use arrow::error::ArrowError;
use parquet::errors::ParquetError;

/// Specialized error type for the pipeline and the inference service
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A raw input file required by an ETL stage is absent
    #[error("Data source missing: {name} not found under {}", dir.display())]
    DataSourceMissing { name: String, dir: PathBuf },

    /// Error opening, reading or writing a file
    #[error("IO error: {message}{}", path_suffix(path.as_deref()))]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<io::Error>,
    },

    /// Error processing Arrow data
    #[error("Arrow error: {0}")]
    Arrow(#[from] ArrowError),

    /// Error processing Parquet data
    #[error("Parquet error: {0}")]
    Parquet(#[from] ParquetError),

    /// A table is missing a required column or carries an unusable type
    #[error("Schema error: {0}")]
    Schema(String),

    /// Column order or column set differs from the fixed feature order
    #[error("Schema drift: {0}")]
    SchemaDrift(String),

    /// Nothing to split, fit or evaluate
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    /// A request field could not be coerced to the required type
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Scaler or classifier artifact could not be loaded
    #[error("Model artifacts unavailable: {0}")]
    ArtifactUnavailable(String),

    /// JSON (de)serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Arrow <-> serde bridging failure
    #[error("Record conversion error: {0}")]
    RecordConversion(#[from] serde_arrow::Error),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),
}

fn path_suffix(path: Option<&Path>) -> String {
    path.map(|p| format!(" ({})", p.display())).unwrap_or_default()
}

/// Error taxonomy used to decide how a failure is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Scaler/classifier absent or undeserializable; fatal to serving
    ArtifactMissing,
    /// Malformed request; reported back to the caller
    InputValidation,
    /// Record or file shape does not match the expected schema
    SchemaDrift,
    /// Raw file absent at ETL time; fatal to that stage
    DataSourceMissing,
    /// Anything else (I/O, encoding, configuration)
    Internal,
}

impl PipelineError {
    /// Create an I/O error carrying only a message
    pub fn io_error(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            source: None,
        }
    }

    /// Create an I/O error wrapping the underlying `io::Error`
    pub fn io_error_with_source(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: None,
            source: Some(source),
        }
    }

    /// Attach a path to an I/O error; other variants are returned unchanged
    #[must_use]
    pub fn with_path(self, new_path: &Path) -> Self {
        match self {
            Self::Io { message, source, .. } => Self::Io {
                message,
                path: Some(new_path.to_path_buf()),
                source,
            },
            other => other,
        }
    }

    /// Classify the error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::ArtifactUnavailable(_) => ErrorCategory::ArtifactMissing,
            Self::InvalidInput(_) => ErrorCategory::InputValidation,
            Self::Schema(_) | Self::SchemaDrift(_) => ErrorCategory::SchemaDrift,
            Self::DataSourceMissing { .. } => ErrorCategory::DataSourceMissing,
            _ => ErrorCategory::Internal,
        }
    }

    /// HTTP-equivalent status code for the error
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::InputValidation => 400,
            ErrorCategory::ArtifactMissing => 503,
            _ => 500,
        }
    }
}

impl From<io::Error> for PipelineError {
    fn from(error: io::Error) -> Self {
        Self::io_error_with_source(error.to_string(), error)
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
