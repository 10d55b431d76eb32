//! Inference service
//!
//! Artifacts are loaded once at process start. A failed load does not stop
//! the process: the service keeps the failure reason and answers every
//! request with an unavailable error until the process is restarted with
//! valid artifacts. Nothing here is mutated after construction, so the
//! service is shared across concurrent requests without locking.

use std::path::Path;
use std::sync::OnceLock;

use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::features::{EncodingMode, FeatureVector, encode_features};
use crate::model::ModelArtifacts;

use super::request::{InferenceRequest, InferenceResponse};
use super::risk::RiskLevel;

/// Result of one successful inference
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Unscaled feature vector the prediction was made from
    pub features: FeatureVector,
    /// Positive-class (mortality) probability
    pub mortality_risk: f64,
    pub risk_level: RiskLevel,
}

#[derive(Debug)]
enum ArtifactState {
    Ready(ModelArtifacts),
    Unavailable(String),
}

/// Read-only prediction service over the persisted scaler and forest
#[derive(Debug)]
pub struct InferenceService {
    state: ArtifactState,
}

impl InferenceService {
    /// Serve already-loaded artifacts
    #[must_use]
    pub const fn from_artifacts(artifacts: ModelArtifacts) -> Self {
        Self {
            state: ArtifactState::Ready(artifacts),
        }
    }

    /// Load artifacts from `model_dir`, recording rather than propagating a failure
    #[must_use]
    pub fn load(model_dir: &Path) -> Self {
        match ModelArtifacts::load(model_dir) {
            Ok(artifacts) => Self::from_artifacts(artifacts),
            Err(e) => {
                log::error!("Inference service starting without a model: {e}");
                let reason = match e {
                    PipelineError::ArtifactUnavailable(reason) => reason,
                    other => other.to_string(),
                };
                Self {
                    state: ArtifactState::Unavailable(reason),
                }
            }
        }
    }

    /// Whether requests can be served
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self.state, ArtifactState::Ready(_))
    }

    fn artifacts(&self) -> Result<&ModelArtifacts> {
        match &self.state {
            ArtifactState::Ready(artifacts) => Ok(artifacts),
            ArtifactState::Unavailable(reason) => {
                Err(PipelineError::ArtifactUnavailable(reason.clone()))
            }
        }
    }

    /// Encode, scale and score one request
    pub fn predict(&self, request: &InferenceRequest) -> Result<Prediction> {
        let artifacts = self.artifacts()?;

        let input = request.to_feature_input()?;
        let features = encode_features(&input, EncodingMode::Single)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let scaled = artifacts.scaler.transform(&features.to_array());
        let mortality_risk = artifacts.forest.predict_proba(&scaled);

        Ok(Prediction {
            features,
            mortality_risk,
            risk_level: RiskLevel::from_probability(mortality_risk),
        })
    }

    /// Handle a JSON body, returning an HTTP-equivalent status code and the response
    #[must_use]
    pub fn respond(&self, body: &Value) -> (u16, InferenceResponse) {
        let outcome = self
            .artifacts()
            .and_then(|_| InferenceRequest::from_json(body))
            .and_then(|request| self.predict(&request));

        match outcome {
            Ok(prediction) => (
                200,
                InferenceResponse::success(prediction.mortality_risk, prediction.risk_level),
            ),
            Err(e) => {
                log::warn!("Inference request failed: {e}");
                (e.status_code(), InferenceResponse::error(e.to_string()))
            }
        }
    }

    /// Handle a raw request line; text that is not UTF-8 is a client error
    #[must_use]
    pub fn respond_bytes(&self, body: &[u8]) -> (u16, InferenceResponse) {
        let decoded = self.artifacts().and_then(|_| {
            std::str::from_utf8(body)
                .map_err(|e| PipelineError::InvalidInput(format!("request is not valid UTF-8: {e}")))
        });

        match decoded {
            Ok(text) => self.respond_str(text),
            Err(e) => {
                log::warn!("Inference request failed: {e}");
                (e.status_code(), InferenceResponse::error(e.to_string()))
            }
        }
    }

    /// Handle a raw JSON string; unparseable text is a client error
    #[must_use]
    pub fn respond_str(&self, body: &str) -> (u16, InferenceResponse) {
        let parsed = self.artifacts().and_then(|_| {
            serde_json::from_str::<Value>(body)
                .map_err(|e| PipelineError::InvalidInput(format!("request is not valid JSON: {e}")))
        });

        match parsed {
            Ok(value) => self.respond(&value),
            Err(e) => {
                log::warn!("Inference request failed: {e}");
                (e.status_code(), InferenceResponse::error(e.to_string()))
            }
        }
    }
}

static GLOBAL_SERVICE: OnceLock<InferenceService> = OnceLock::new();

/// Install the process-wide service; only the first call succeeds
pub fn install_global(service: InferenceService) -> Result<&'static InferenceService> {
    GLOBAL_SERVICE
        .set(service)
        .map_err(|_| PipelineError::Config("inference service is already installed".into()))?;
    global()
}

/// Read-only accessor for the process-wide service
pub fn global() -> Result<&'static InferenceService> {
    GLOBAL_SERVICE.get().ok_or_else(|| {
        PipelineError::ArtifactUnavailable("inference service has not been initialised".into())
    })
}
