//! Split & persist
//!
//! Partitions the feature matrix into train and test sets and writes them
//! as flat tables for the training stage.

pub mod io;
pub mod split;

pub use io::{matrix_columns, read_matrix, write_matrix};
pub use split::{DatasetSplit, test_size, train_test_split};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;

/// Split a matrix and write `train`/`test` files into the processed directory
pub fn split_and_persist(matrix: &FeatureMatrix, config: &PipelineConfig) -> Result<DatasetSplit> {
    let split = train_test_split(matrix, config.test_fraction, config.split_seed)?;

    write_matrix(&split.train, &config.matrix_path("train"), config.matrix_format)?;
    write_matrix(&split.test, &config.matrix_path("test"), config.matrix_format)?;
    log::info!("Saved processed data to {}", config.processed_dir.display());

    Ok(split)
}

/// Load the persisted `train`/`test` matrices
///
/// Missing files mean the ETL stage has not run yet.
pub fn load_split(config: &PipelineConfig) -> Result<DatasetSplit> {
    let load = |split: &str| {
        let path = config.matrix_path(split);
        if !path.is_file() {
            return Err(PipelineError::DataSourceMissing {
                name: format!("{split}.{}", config.matrix_format.extension()),
                dir: config.processed_dir.clone(),
            });
        }
        read_matrix(&path, config.matrix_format)
    };

    Ok(DatasetSplit {
        train: load("train")?,
        test: load("test")?,
    })
}
