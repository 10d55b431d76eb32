//! Categorical value types shared by the raw records and the feature encoder

use std::fmt;

use serde::{Deserialize, Serialize};

/// Gender of a patient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    /// Male gender
    Male,
    /// Female gender
    Female,
    /// Unknown or not specified
    Unknown,
}

impl Gender {
    /// Binary model encoding: F is 1, everything else (M, unknown) is 0
    #[must_use]
    pub const fn encoded(self) -> u8 {
        match self {
            Self::Female => 1,
            Self::Male | Self::Unknown => 0,
        }
    }
}

impl From<&str> for Gender {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Self::Male,
            "f" | "female" => Self::Female,
            _ => Self::Unknown,
        }
    }
}

/// Admission type of an encounter
///
/// Only the three named categories have indicator columns; every other
/// value (NEWBORN, free text, ...) is kept as `Other` and encodes to an
/// all-zero indicator triple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdmissionType {
    /// Planned admission
    Elective,
    /// Emergency admission
    Emergency,
    /// Urgent admission
    Urgent,
    /// Any other recorded type
    Other(String),
}

impl AdmissionType {
    /// One-hot indicators in column order `[ELECTIVE, EMERGENCY, URGENT]`
    #[must_use]
    pub const fn indicators(&self) -> [u8; 3] {
        match self {
            Self::Elective => [1, 0, 0],
            Self::Emergency => [0, 1, 0],
            Self::Urgent => [0, 0, 1],
            Self::Other(_) => [0, 0, 0],
        }
    }
}

impl From<&str> for AdmissionType {
    fn from(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_uppercase().as_str() {
            "ELECTIVE" => Self::Elective,
            "EMERGENCY" => Self::Emergency,
            "URGENT" => Self::Urgent,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for AdmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Elective => f.write_str("ELECTIVE"),
            Self::Emergency => f.write_str("EMERGENCY"),
            Self::Urgent => f.write_str("URGENT"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_from_string() {
        assert_eq!(Gender::from("M"), Gender::Male);
        assert_eq!(Gender::from("female"), Gender::Female);
        assert_eq!(Gender::from(" f "), Gender::Female);
        assert_eq!(Gender::from("X"), Gender::Unknown);
        assert_eq!(Gender::Unknown.encoded(), 0);
        assert_eq!(Gender::Female.encoded(), 1);
    }

    #[test]
    fn test_admission_type_indicators() {
        assert_eq!(AdmissionType::from("ELECTIVE").indicators(), [1, 0, 0]);
        assert_eq!(AdmissionType::from("emergency").indicators(), [0, 1, 0]);
        assert_eq!(AdmissionType::from("URGENT").indicators(), [0, 0, 1]);

        let newborn = AdmissionType::from("NEWBORN");
        assert_eq!(newborn, AdmissionType::Other("NEWBORN".to_string()));
        assert_eq!(newborn.indicators(), [0, 0, 0]);
        assert_eq!(newborn.to_string(), "NEWBORN");
    }
}
