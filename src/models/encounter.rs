//! Encounter (hospital admission) records

use chrono::{Datelike, NaiveDateTime};

use super::types::AdmissionType;

/// One hospital admission as read from the admissions extract
#[derive(Debug, Clone, PartialEq)]
pub struct Encounter {
    /// Patient identifier (join key to `Patient`)
    pub subject_id: i64,
    /// Admission identifier (join key to `LabEvent`)
    pub hadm_id: i64,
    /// Admission timestamp
    pub admit_time: Option<NaiveDateTime>,
    /// Admission type, `None` when the cell is empty
    pub admission_type: Option<AdmissionType>,
    /// Discharge timestamp
    pub discharge_time: Option<NaiveDateTime>,
    /// In-hospital death timestamp
    pub death_time: Option<NaiveDateTime>,
    /// Explicit mortality flag.
    ///
    /// Outer `None`: the extract has no flag column. Inner `None`: the
    /// column exists but this row's cell is empty.
    pub expire_flag: Option<Option<bool>>,
}

impl Encounter {
    /// Calendar year of admission
    #[must_use]
    pub fn admit_year(&self) -> Option<i32> {
        self.admit_time.map(|t| t.year())
    }

    /// Mortality label for this encounter.
    ///
    /// Uses the explicit flag column when the extract carries one and
    /// falls back to "a death timestamp is present" otherwise.
    #[must_use]
    pub fn mortality_label(&self) -> Option<bool> {
        match self.expire_flag {
            Some(flag) => flag,
            None => Some(self.death_time.is_some()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn encounter() -> Encounter {
        Encounter {
            subject_id: 1,
            hadm_id: 100,
            admit_time: Some(ts(2150, 3, 1)),
            admission_type: Some(AdmissionType::Emergency),
            discharge_time: Some(ts(2150, 3, 9)),
            death_time: None,
            expire_flag: None,
        }
    }

    #[test]
    fn test_label_derived_from_death_time() {
        let mut enc = encounter();
        assert_eq!(enc.mortality_label(), Some(false));
        enc.death_time = Some(ts(2150, 3, 9));
        assert_eq!(enc.mortality_label(), Some(true));
    }

    #[test]
    fn test_explicit_flag_wins() {
        let mut enc = encounter();
        enc.death_time = Some(ts(2150, 3, 9));
        enc.expire_flag = Some(Some(false));
        assert_eq!(enc.mortality_label(), Some(false));

        enc.expire_flag = Some(None);
        assert_eq!(enc.mortality_label(), None);
        assert_eq!(enc.admit_year(), Some(2150));
    }
}
