//! Risk tiers

use std::fmt;

use serde::{Deserialize, Serialize};

/// Probabilities strictly above this are `High`
pub const HIGH_RISK_THRESHOLD: f64 = 0.55;
/// Probabilities at or above this (and not `High`) are `Moderate`
pub const MODERATE_RISK_THRESHOLD: f64 = 0.35;

/// Three-tier label attached to every successful prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    /// `> 0.55` is High, `[0.35, 0.55]` is Moderate, anything lower is Low
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            Self::High
        } else if probability >= MODERATE_RISK_THRESHOLD {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(RiskLevel::from_probability(0.55), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.550_000_1), RiskLevel::High);
        assert_eq!(RiskLevel::from_probability(0.35), RiskLevel::Moderate);
        assert_eq!(RiskLevel::from_probability(0.349_999_9), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::High);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(serde_json::to_string(&RiskLevel::Moderate).unwrap(), "\"Moderate\"");
        assert_eq!(RiskLevel::High.to_string(), "High");
    }
}
