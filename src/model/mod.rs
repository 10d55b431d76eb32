//! Scaler and classifier
//!
//! Standardization parameters and a random forest are fitted once by the
//! offline training run, persisted, and loaded read-only by the serving
//! path.

pub mod artifacts;
pub mod forest;
pub mod metrics;
pub mod scaler;
pub mod train;
pub mod tree;

pub use artifacts::{METRICS_FILE, MODEL_FILE, ModelArtifacts, SCALER_FILE, save_report};
pub use forest::{DECISION_THRESHOLD, RandomForest};
pub use metrics::{EvaluationReport, accuracy, roc_auc};
pub use scaler::StandardScaler;
pub use train::{TrainingOutcome, train_and_evaluate};
pub use tree::{DecisionTree, Node, TreeParams};
