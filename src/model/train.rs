//! Offline training: fit the scaler and forest, evaluate on the test split

use crate::config::ForestConfig;
use crate::dataset::DatasetSplit;
use crate::error::Result;
use crate::features::FEATURE_COLUMNS;

use super::artifacts::ModelArtifacts;
use super::forest::{DECISION_THRESHOLD, RandomForest};
use super::metrics::EvaluationReport;
use super::scaler::StandardScaler;

/// Fitted artifacts plus their held-out evaluation
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifacts: ModelArtifacts,
    pub report: EvaluationReport,
}

/// Fit the scaler on the training rows only, train the forest on scaled
/// rows and evaluate once against the test rows
pub fn train_and_evaluate(split: &DatasetSplit, forest_config: &ForestConfig) -> Result<TrainingOutcome> {
    log::info!("Training features: [{}]", FEATURE_COLUMNS.join(", "));

    let x_train = split.train.features();
    let y_train = split.train.labels();

    let scaler = StandardScaler::fit(&x_train)?;
    let x_train_scaled = scaler.transform_all(&x_train);
    let x_test_scaled = scaler.transform_all(&split.test.features());

    let forest = RandomForest::fit(&x_train_scaled, &y_train, forest_config)?;

    log::info!("Evaluating on test set...");
    let probabilities: Vec<f64> = x_test_scaled
        .iter()
        .map(|row| forest.predict_proba(row))
        .collect();
    let report = EvaluationReport::from_predictions(
        &split.test.labels(),
        &probabilities,
        DECISION_THRESHOLD,
        split.train.len(),
    );
    log::info!("{report}");

    Ok(TrainingOutcome {
        artifacts: ModelArtifacts { scaler, forest },
        report,
    })
}
