//! Random forest classifier
//!
//! Bagged CART trees with per-split feature subsampling. Each tree gets a
//! seed drawn up front from the forest seed, so the fitted forest is the
//! same regardless of how rayon schedules the trees.

use indicatif::ParallelProgressIterator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ForestConfig;
use crate::error::{PipelineError, Result};
use crate::features::{N_FEATURES, check_feature_columns, feature_column_names};
use crate::utils::logging::{create_main_progress_bar, finish_progress_bar};

use super::tree::{DecisionTree, TreeParams};

/// Probability above which `predict` returns the positive class
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Ensemble of classification trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    /// Column order the trees were fitted on
    pub feature_columns: Vec<String>,
    /// Hyperparameters used for fitting
    pub config: ForestConfig,
    pub trees: Vec<DecisionTree>,
}

/// Features examined per split: the configured value or `max(1, floor(sqrt(n)))`
#[must_use]
pub fn resolve_max_features(config: &ForestConfig) -> usize {
    config
        .max_features
        .unwrap_or_else(|| ((N_FEATURES as f64).sqrt() as usize).max(1))
        .min(N_FEATURES)
}

impl RandomForest {
    /// Fit the forest on scaled training rows
    pub fn fit(x: &[[f64; N_FEATURES]], y: &[bool], config: &ForestConfig) -> Result<Self> {
        config.validate()?;
        if x.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "cannot fit a forest on an empty training matrix".into(),
            ));
        }
        if x.len() != y.len() {
            return Err(PipelineError::SchemaDrift(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }

        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            min_samples_leaf: config.min_samples_leaf,
            max_features: resolve_max_features(config),
        };

        let mut seeder = StdRng::seed_from_u64(config.seed);
        let tree_seeds: Vec<u64> = (0..config.n_trees).map(|_| seeder.random()).collect();

        log::info!(
            "Training RandomForest with {} trees on {} rows ({} features per split)",
            config.n_trees,
            x.len(),
            params.max_features
        );
        let pb = create_main_progress_bar(config.n_trees as u64, Some("Growing trees"));

        let n_rows = x.len();
        let trees = tree_seeds
            .into_par_iter()
            .progress_with(pb.clone())
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let sample: Vec<usize> = if config.bootstrap {
                    (0..n_rows).map(|_| rng.random_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                DecisionTree::fit(x, y, &sample, &params, &mut rng)
            })
            .collect::<Vec<_>>();

        finish_progress_bar(&pb, "Forest trained");

        Ok(Self {
            feature_columns: feature_column_names(),
            config: config.clone(),
            trees,
        })
    }

    /// Mean positive-class probability across trees
    #[must_use]
    pub fn predict_proba(&self, row: &[f64; N_FEATURES]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_proba(row)).sum();
        total / self.trees.len() as f64
    }

    /// Positive class when the probability exceeds [`DECISION_THRESHOLD`]
    #[must_use]
    pub fn predict(&self, row: &[f64; N_FEATURES]) -> bool {
        self.predict_proba(row) > DECISION_THRESHOLD
    }

    /// Check that a loaded forest is keyed to the fixed column order and well formed
    pub fn validate(&self) -> Result<()> {
        check_feature_columns(&self.feature_columns, "model")?;
        if self.trees.is_empty() {
            return Err(PipelineError::SchemaDrift("model contains no trees".into()));
        }
        self.trees.iter().try_for_each(DecisionTree::validate)
    }
}
