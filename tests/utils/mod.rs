use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use mortality_risk::{ForestConfig, PipelineConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

/// One synthetic admission with its patient and lab results
#[derive(Debug, Clone)]
pub struct SyntheticEncounter {
    pub subject_id: i64,
    pub hadm_id: i64,
    pub admit_year: i32,
    pub birth_year: i32,
    pub gender: &'static str,
    pub admission_type: &'static str,
    pub lab_count: usize,
    pub abnormal_count: usize,
    pub died: bool,
}

impl SyntheticEncounter {
    #[must_use]
    pub fn new(hadm_id: i64, age: i32, admission_type: &'static str, labs: (usize, usize), died: bool) -> Self {
        Self {
            subject_id: hadm_id + 10_000,
            hadm_id,
            admit_year: 2150,
            birth_year: 2150 - age,
            gender: "M",
            admission_type,
            lab_count: labs.0,
            abnormal_count: labs.1,
            died,
        }
    }
}

/// Deterministic cohort where risk rises with age, abnormal labs and
/// emergency admissions
#[must_use]
pub fn synthetic_cohort(n: usize, seed: u64) -> Vec<SyntheticEncounter> {
    let mut rng = StdRng::seed_from_u64(seed);
    let types = ["EMERGENCY", "ELECTIVE", "URGENT", "NEWBORN"];

    (0..n)
        .map(|i| {
            let age = rng.random_range(18..95);
            let admission_type = types[rng.random_range(0..types.len())];
            let lab_count = rng.random_range(0..60);
            let abnormal_count = if lab_count == 0 { 0 } else { rng.random_range(0..=lab_count) };

            let mut score = f64::from(age) / 95.0 + abnormal_count as f64 / 60.0;
            if admission_type == "EMERGENCY" {
                score += 0.3;
            }
            let died = score + rng.random_range(-0.3..0.3) > 1.2;

            let mut encounter =
                SyntheticEncounter::new(100_000 + i as i64, age, admission_type, (lab_count, abnormal_count), died);
            encounter.gender = if rng.random::<bool>() { "F" } else { "M" };
            encounter
        })
        .collect()
}

/// Write `ADMISSIONS.csv`, `PATIENTS.csv` and `LABEVENTS.csv` in the MIMIC layout
pub fn write_raw_extracts(dir: &Path, cohort: &[SyntheticEncounter]) {
    let mut admissions =
        String::from("ROW_ID,SUBJECT_ID,HADM_ID,ADMITTIME,DISCHTIME,DEATHTIME,ADMISSION_TYPE,HOSPITAL_EXPIRE_FLAG\n");
    let mut patients = String::from("ROW_ID,SUBJECT_ID,GENDER,DOB\n");
    let mut labs = String::from("ROW_ID,SUBJECT_ID,HADM_ID,ITEMID,FLAG\n");
    let mut lab_row = 0;

    for (i, e) in cohort.iter().enumerate() {
        let death = if e.died {
            format!("{}-06-05 10:00:00", e.admit_year)
        } else {
            String::new()
        };
        writeln!(
            admissions,
            "{i},{},{},{}-06-01 08:00:00,{}-06-08 12:00:00,{death},{},{}",
            e.subject_id,
            e.hadm_id,
            e.admit_year,
            e.admit_year,
            e.admission_type,
            u8::from(e.died)
        )
        .unwrap();
        writeln!(patients, "{i},{},{},{}-03-15 00:00:00", e.subject_id, e.gender, e.birth_year).unwrap();

        for k in 0..e.lab_count {
            let flag = if k < e.abnormal_count { "abnormal" } else { "" };
            writeln!(labs, "{lab_row},{},{},50912,{flag}", e.subject_id, e.hadm_id).unwrap();
            lab_row += 1;
        }
    }

    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join("ADMISSIONS.csv"), admissions).unwrap();
    fs::write(dir.join("PATIENTS.csv"), patients).unwrap();
    fs::write(dir.join("LABEVENTS.csv"), labs).unwrap();
}

/// Configuration rooted in a scratch directory, with a small forest
#[must_use]
pub fn scratch_config(root: &TempDir) -> PipelineConfig {
    PipelineConfig {
        raw_dir: root.path().join("raw"),
        processed_dir: root.path().join("processed"),
        model_dir: root.path().join("models"),
        worker_threads: 2,
        forest: ForestConfig {
            n_trees: 15,
            ..ForestConfig::default()
        },
        ..PipelineConfig::default()
    }
}
