//! Inference adapter
//!
//! Turns one raw request into a feature vector with the shared encoder,
//! applies the persisted scaler and scores it with the persisted forest.

pub mod request;
pub mod risk;
pub mod service;

pub use request::{InferenceRequest, InferenceResponse, ResponseStatus};
pub use risk::{HIGH_RISK_THRESHOLD, MODERATE_RISK_THRESHOLD, RiskLevel};
pub use service::{InferenceService, Prediction, global, install_global};
