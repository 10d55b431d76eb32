//! Request coercion and response shapes
//!
//! Fields arrive as loosely-typed JSON. Numbers may also be sent as numeric
//! strings; `null` and absent fields are treated alike and resolved by the
//! single-record defaults of the feature encoder.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PipelineError, Result};
use crate::features::FeatureInput;
use crate::models::{AdmissionType, Gender};

use super::risk::RiskLevel;

/// Raw inference request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub gender: Option<Value>,
    #[serde(default)]
    pub admission_type: Option<Value>,
    #[serde(default)]
    pub lab_count: Option<Value>,
    #[serde(default)]
    pub abnormal_count: Option<Value>,
}

fn invalid(field: &str, value: &Value, expected: &str) -> PipelineError {
    PipelineError::InvalidInput(format!("'{field}' must be {expected}, got {value}"))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_number(field: &str, value: &Value) -> Result<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| invalid(field, value, "a finite number"))
}

/// Age in whole years, rounded down so that any negative age stays negative
fn coerce_age(value: Option<&Value>) -> Result<Option<i64>> {
    present(value)
        .map(|v| as_number("age", v).map(|n| n.floor() as i64))
        .transpose()
}

fn coerce_count(field: &str, value: Option<&Value>) -> Result<Option<u64>> {
    present(value)
        .map(|v| {
            let n = as_number(field, v)?;
            if n < 0.0 || n.fract() != 0.0 || n > u64::MAX as f64 {
                return Err(invalid(field, v, "a non-negative integer"));
            }
            Ok(n as u64)
        })
        .transpose()
}

fn coerce_text<'a>(field: &str, value: Option<&'a Value>) -> Result<Option<&'a str>> {
    match present(value) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(invalid(field, other, "a string")),
    }
}

impl InferenceRequest {
    /// Parse a JSON body; anything but an object is a client error
    pub fn from_json(body: &Value) -> Result<Self> {
        if !body.is_object() {
            return Err(PipelineError::InvalidInput(
                "request body must be a JSON object".into(),
            ));
        }
        serde_json::from_value(body.clone())
            .map_err(|e| PipelineError::InvalidInput(format!("malformed request: {e}")))
    }

    /// Coerce the raw fields into encoder input
    pub fn to_feature_input(&self) -> Result<FeatureInput> {
        Ok(FeatureInput {
            age: coerce_age(self.age.as_ref())?,
            gender: coerce_text("gender", self.gender.as_ref())?.map(Gender::from),
            admission_type: coerce_text("admission_type", self.admission_type.as_ref())?
                .map(AdmissionType::from),
            lab_count: coerce_count("lab_count", self.lab_count.as_ref())?,
            abnormal_count: coerce_count("abnormal_count", self.abnormal_count.as_ref())?,
        })
    }
}

/// Outcome marker of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Response body returned for every request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub status: ResponseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mortality_risk: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl InferenceResponse {
    #[must_use]
    pub const fn success(mortality_risk: f64, risk_level: RiskLevel) -> Self {
        Self {
            status: ResponseStatus::Success,
            mortality_risk: Some(mortality_risk),
            risk_level: Some(risk_level),
            message: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            mortality_risk: None,
            risk_level: None,
            message: Some(message.into()),
        }
    }
}
