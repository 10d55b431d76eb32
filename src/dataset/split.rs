//! Deterministic train/test partitioning

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;

/// Train and test partitions of a feature matrix
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSplit {
    pub train: FeatureMatrix,
    pub test: FeatureMatrix,
}

/// Number of rows held out for testing: `ceil(n * test_fraction)`
#[must_use]
pub fn test_size(n_rows: usize, test_fraction: f64) -> usize {
    (n_rows as f64 * test_fraction).ceil() as usize
}

/// Shuffle row indices with a seeded RNG and cut off the test partition
///
/// The same input, fraction and seed always produce the same partitions.
pub fn train_test_split(
    matrix: &FeatureMatrix,
    test_fraction: f64,
    seed: u64,
) -> Result<DatasetSplit> {
    if matrix.is_empty() {
        return Err(PipelineError::EmptyDataset(
            "feature matrix has no rows; refusing to write empty train/test files".into(),
        ));
    }
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(PipelineError::Config(format!(
            "test fraction must be in (0, 1), got {test_fraction}"
        )));
    }

    let n_rows = matrix.len();
    let n_test = test_size(n_rows, test_fraction);
    if n_test >= n_rows {
        return Err(PipelineError::EmptyDataset(format!(
            "{n_rows} rows leave no training rows at test fraction {test_fraction}"
        )));
    }

    let mut indices: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let pick = |idx: &[usize]| {
        FeatureMatrix::from_rows(idx.iter().map(|&i| matrix.rows[i]).collect())
    };

    let split = DatasetSplit {
        train: pick(train_idx),
        test: pick(test_idx),
    };
    log::info!(
        "Split {} rows into {} train / {} test (seed {seed})",
        n_rows,
        split.train.len(),
        split.test.len()
    );
    Ok(split)
}
