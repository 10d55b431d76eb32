//! Batch feature matrix construction
//!
//! Joins encounters with patients, attaches lab aggregates and encodes each
//! surviving encounter with [`encode_features`] in batch mode.

use std::fmt;

use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::loader::RawTables;
use crate::models::{Encounter, LabEvent, Patient};

use super::encode::{EncodingMode, FeatureInput, encode_features};
use super::{LabeledRow, N_FEATURES};

/// Lab counts of one admission
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LabAggregate {
    pub lab_count: u64,
    pub abnormal_count: u64,
}

impl LabAggregate {
    fn merge(mut self, other: Self) -> Self {
        self.lab_count += other.lab_count;
        self.abnormal_count += other.abnormal_count;
        self
    }
}

/// Count all and abnormal lab results per admission
///
/// Results without an admission identifier are ignored.
#[must_use]
pub fn aggregate_lab_events(events: &[LabEvent]) -> FxHashMap<i64, LabAggregate> {
    events
        .par_iter()
        .filter_map(|event| event.hadm_id.map(|id| (id, event.is_abnormal())))
        .fold(FxHashMap::default, |mut acc: FxHashMap<i64, LabAggregate>, (id, abnormal)| {
            let entry = acc.entry(id).or_default();
            entry.lab_count += 1;
            if abnormal {
                entry.abnormal_count += 1;
            }
            acc
        })
        .reduce(FxHashMap::default, |mut left, right| {
            for (id, agg) in right {
                let merged = left.get(&id).copied().unwrap_or_default().merge(agg);
                left.insert(id, merged);
            }
            left
        })
}

/// Row accounting for one build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Encounters read
    pub encounters: usize,
    /// Encounters dropped because no patient record matched
    pub dropped_without_patient: usize,
    /// Encounters dropped because a required value was still missing
    pub dropped_incomplete: usize,
    /// Rows in the final matrix
    pub rows: usize,
    /// Rows with a positive label
    pub positives: usize,
}

impl BuildStats {
    /// Share of positive labels, 0 for an empty matrix
    #[must_use]
    pub fn positive_rate(&self) -> f64 {
        if self.rows == 0 {
            0.0
        } else {
            self.positives as f64 / self.rows as f64
        }
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Feature Matrix Summary:")?;
        writeln!(f, "  Encounters Read: {}", self.encounters)?;
        writeln!(f, "  Dropped (No Patient): {}", self.dropped_without_patient)?;
        writeln!(f, "  Dropped (Incomplete): {}", self.dropped_incomplete)?;
        writeln!(f, "  Shape: ({}, {})", self.rows, N_FEATURES + 1)?;
        write!(f, "  Class Balance (Target=1): {:.2}%", self.positive_rate() * 100.0)
    }
}

/// Labeled feature rows in encounter order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub rows: Vec<LabeledRow>,
    pub stats: BuildStats,
}

impl FeatureMatrix {
    /// Wrap already-built rows, recomputing the row and positive counts
    #[must_use]
    pub fn from_rows(rows: Vec<LabeledRow>) -> Self {
        let stats = BuildStats {
            encounters: rows.len(),
            rows: rows.len(),
            positives: rows.iter().filter(|r| r.label).count(),
            ..Default::default()
        };
        Self { rows, stats }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Feature values in column order, one array per row
    #[must_use]
    pub fn features(&self) -> Vec<[f64; N_FEATURES]> {
        self.rows.iter().map(|r| r.features.to_array()).collect()
    }

    #[must_use]
    pub fn labels(&self) -> Vec<bool> {
        self.rows.iter().map(|r| r.label).collect()
    }
}

/// Raw values for one joined encounter
fn feature_input(
    encounter: &Encounter,
    patient: &Patient,
    labs: Option<&LabAggregate>,
) -> FeatureInput {
    // Year difference only; full date subtraction overflows on shifted dates
    let age = encounter
        .admit_year()
        .zip(patient.birth_year())
        .map(|(admit, birth)| i64::from(admit) - i64::from(birth));
    let labs = labs.copied().unwrap_or_default();

    FeatureInput {
        age,
        gender: patient.gender,
        admission_type: encounter.admission_type.clone(),
        lab_count: Some(labs.lab_count),
        abnormal_count: Some(labs.abnormal_count),
    }
}

/// Build the labeled feature matrix from the raw tables
#[must_use]
pub fn build_feature_matrix(tables: &RawTables) -> FeatureMatrix {
    let mut patients: FxHashMap<i64, &Patient> = FxHashMap::default();
    let mut duplicate_patients = 0usize;
    for patient in &tables.patients {
        if patients.insert(patient.subject_id, patient).is_some() {
            duplicate_patients += 1;
        }
    }
    if duplicate_patients > 0 {
        log::warn!("{duplicate_patients} duplicate patient records; the last one per subject is used");
    }

    log::info!("Aggregating {} lab events", tables.lab_events.len());
    let labs = aggregate_lab_events(&tables.lab_events);

    let mut stats = BuildStats {
        encounters: tables.encounters.len(),
        ..Default::default()
    };
    let mut rows = Vec::with_capacity(tables.encounters.len());

    for encounter in &tables.encounters {
        let Some(patient) = patients.get(&encounter.subject_id) else {
            stats.dropped_without_patient += 1;
            continue;
        };

        let input = feature_input(encounter, patient, labs.get(&encounter.hadm_id));
        let encoded = encode_features(&input, EncodingMode::Batch);
        let (Ok(features), Some(label)) = (encoded, encounter.mortality_label()) else {
            log::debug!("Dropping incomplete encounter {}", encounter.hadm_id);
            stats.dropped_incomplete += 1;
            continue;
        };

        if label {
            stats.positives += 1;
        }
        rows.push(LabeledRow { features, label });
    }

    stats.rows = rows.len();
    log::info!("{stats}");

    FeatureMatrix { rows, stats }
}
