//! Patient demographic records

use chrono::{Datelike, NaiveDateTime};

use super::types::Gender;

/// Demographic record from the patients extract
#[derive(Debug, Clone, PartialEq)]
pub struct Patient {
    /// Patient identifier
    pub subject_id: i64,
    /// Date of birth
    pub dob: Option<NaiveDateTime>,
    /// Recorded gender, `None` when the cell is empty
    pub gender: Option<Gender>,
}

impl Patient {
    /// Calendar year of birth
    #[must_use]
    pub fn birth_year(&self) -> Option<i32> {
        self.dob.map(|d| d.year())
    }
}
