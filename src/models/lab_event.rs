//! Laboratory result records

/// Literal flag value marking an abnormal result (compared case-insensitively)
pub const ABNORMAL_FLAG: &str = "abnormal";

/// One laboratory result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabEvent {
    /// Admission the result belongs to; outpatient results have none
    pub hadm_id: Option<i64>,
    /// Raw flag value
    pub flag: Option<String>,
}

impl LabEvent {
    /// Whether the flag marks this result as abnormal
    #[must_use]
    pub fn is_abnormal(&self) -> bool {
        self.flag
            .as_deref()
            .is_some_and(|f| f.trim().eq_ignore_ascii_case(ABNORMAL_FLAG))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abnormal_flag_is_case_insensitive() {
        let event = |flag: Option<&str>| LabEvent {
            hadm_id: Some(1),
            flag: flag.map(str::to_string),
        };
        assert!(event(Some("abnormal")).is_abnormal());
        assert!(event(Some("ABNORMAL")).is_abnormal());
        assert!(!event(Some("delta")).is_abnormal());
        assert!(!event(None).is_abnormal());
    }
}
