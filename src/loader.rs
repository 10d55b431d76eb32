//! Raw extract loading
//!
//! Reads the admissions, patients and lab events CSV extracts into typed
//! records. Every column is read as text through `arrow::csv` and parsed
//! here, so a stray value deep in a large file never breaks schema
//! inference.

use std::fs;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use arrow::array::{Array, AsArray, StringArray};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::error::util::safe_open_file;
use crate::error::{PipelineError, Result};
use crate::models::{AdmissionType, Encounter, Gender, LabEvent, Patient};
use crate::utils::logging::{log_operation_complete, log_operation_start};
use crate::utils::{TimestampFormatConfig, parse_timestamp};

/// File name of the admissions extract
pub const ADMISSIONS_FILE: &str = "ADMISSIONS.csv";
/// File name of the patients extract
pub const PATIENTS_FILE: &str = "PATIENTS.csv";
/// File name of the lab events extract
pub const LABEVENTS_FILE: &str = "LABEVENTS.csv";

/// Rows per Arrow batch when reading CSV
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Rows skipped while loading because a join key was empty or unparseable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub skipped_encounters: usize,
    pub skipped_patients: usize,
}

/// The three raw tables of one pipeline run
#[derive(Debug, Clone, Default)]
pub struct RawTables {
    pub encounters: Vec<Encounter>,
    pub patients: Vec<Patient>,
    pub lab_events: Vec<LabEvent>,
    pub stats: LoadStats,
}

/// Locate an extract under `dir`, searching subdirectories and ignoring case
///
/// Archives are sometimes unpacked with their own folder structure, so the
/// file may sit several levels deep.
pub fn find_source_file(dir: &Path, file_name: &str) -> Result<PathBuf> {
    let missing = || PipelineError::DataSourceMissing {
        name: file_name.to_string(),
        dir: dir.to_path_buf(),
    };

    if !dir.is_dir() {
        return Err(missing());
    }

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let mut entries = fs::read_dir(&current)
            .map_err(|e| {
                PipelineError::io_error_with_source("Failed to read directory", e).with_path(&current)
            })?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .collect::<Vec<_>>();
        entries.sort();

        for path in entries {
            if path.is_dir() {
                pending.push(path);
            } else if path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.eq_ignore_ascii_case(file_name))
            {
                return Ok(path);
            }
        }
    }

    Err(missing())
}

/// Read a CSV file into record batches with every column typed as nullable text
pub fn read_csv_as_text(path: &Path) -> Result<Vec<RecordBatch>> {
    let mut file = safe_open_file(path, "reading CSV extract")?;

    let format = Format::default().with_header(true);
    let (inferred, _) = format.infer_schema(&mut file, Some(1))?;
    let schema = Arc::new(Schema::new(
        inferred
            .fields()
            .iter()
            .map(|f| Field::new(f.name(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ));

    file.seek(SeekFrom::Start(0))?;

    let reader = ReaderBuilder::new(schema)
        .with_format(format)
        .with_batch_size(DEFAULT_BATCH_SIZE)
        .build(file)?;

    reader
        .map(|batch| batch.map_err(PipelineError::from))
        .collect()
}

/// Text column accessor with case-insensitive lookup
struct TextColumns<'a> {
    batch: &'a RecordBatch,
}

impl<'a> TextColumns<'a> {
    const fn new(batch: &'a RecordBatch) -> Self {
        Self { batch }
    }

    fn find(&self, name: &str) -> Option<&'a StringArray> {
        let schema = self.batch.schema_ref();
        let idx = schema
            .fields()
            .iter()
            .position(|f| f.name().eq_ignore_ascii_case(name))?;
        self.batch.column(idx).as_string_opt::<i32>()
    }

    fn require(&self, name: &str, table: &str) -> Result<&'a StringArray> {
        self.find(name).ok_or_else(|| {
            PipelineError::Schema(format!("{table} extract is missing required column '{name}'"))
        })
    }
}

fn cell(array: &StringArray, row: usize) -> Option<&str> {
    if array.is_null(row) {
        return None;
    }
    let value = array.value(row).trim();
    (!value.is_empty()).then_some(value)
}

/// Parse an integer cell, accepting float renderings such as `"123.0"`
fn parse_int(value: &str) -> Option<i64> {
    value.parse::<i64>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && v.fract() == 0.0)
            .map(|v| v as i64)
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match parse_int(value) {
        Some(0) => Some(false),
        Some(1) => Some(true),
        _ => match value.to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
    }
}

/// Convert admissions batches into encounters
pub fn encounters_from_batches(
    batches: &[RecordBatch],
    formats: &TimestampFormatConfig,
) -> Result<(Vec<Encounter>, usize)> {
    let mut encounters = Vec::new();
    let mut skipped = 0;

    for batch in batches {
        let cols = TextColumns::new(batch);
        let subject = cols.require("subject_id", "Admissions")?;
        let hadm = cols.require("hadm_id", "Admissions")?;
        let admit = cols.require("admittime", "Admissions")?;
        let adm_type = cols.find("admission_type");
        let discharge = cols.find("dischtime");
        let death = cols.find("deathtime");
        let expire = cols.find("hospital_expire_flag");

        for row in 0..batch.num_rows() {
            let keys = (
                cell(subject, row).and_then(parse_int),
                cell(hadm, row).and_then(parse_int),
            );
            let (Some(subject_id), Some(hadm_id)) = keys else {
                skipped += 1;
                continue;
            };

            let timestamp = |col: Option<&StringArray>| {
                col.and_then(|c| cell(c, row))
                    .and_then(|v| parse_timestamp(v, formats))
            };

            encounters.push(Encounter {
                subject_id,
                hadm_id,
                admit_time: timestamp(Some(admit)),
                admission_type: adm_type.and_then(|c| cell(c, row)).map(AdmissionType::from),
                discharge_time: timestamp(discharge),
                death_time: timestamp(death),
                expire_flag: expire.map(|c| cell(c, row).and_then(parse_flag)),
            });
        }
    }

    Ok((encounters, skipped))
}

/// Convert patients batches into patient records
pub fn patients_from_batches(
    batches: &[RecordBatch],
    formats: &TimestampFormatConfig,
) -> Result<(Vec<Patient>, usize)> {
    let mut patients = Vec::new();
    let mut skipped = 0;

    for batch in batches {
        let cols = TextColumns::new(batch);
        let subject = cols.require("subject_id", "Patients")?;
        let dob = cols.require("dob", "Patients")?;
        let gender = cols.require("gender", "Patients")?;

        for row in 0..batch.num_rows() {
            let Some(subject_id) = cell(subject, row).and_then(parse_int) else {
                skipped += 1;
                continue;
            };

            patients.push(Patient {
                subject_id,
                dob: cell(dob, row).and_then(|v| parse_timestamp(v, formats)),
                gender: cell(gender, row).map(Gender::from),
            });
        }
    }

    Ok((patients, skipped))
}

/// Convert lab event batches into lab records
///
/// A missing `flag` column means no result is ever counted as abnormal.
pub fn lab_events_from_batches(batches: &[RecordBatch]) -> Result<Vec<LabEvent>> {
    let mut events = Vec::new();

    for batch in batches {
        let cols = TextColumns::new(batch);
        let hadm = cols.require("hadm_id", "Lab events")?;
        let flag = cols.find("flag");

        events.reserve(batch.num_rows());
        for row in 0..batch.num_rows() {
            events.push(LabEvent {
                hadm_id: cell(hadm, row).and_then(parse_int),
                flag: flag.and_then(|c| cell(c, row)).map(str::to_string),
            });
        }
    }

    Ok(events)
}

fn load_table<T>(
    raw_dir: &Path,
    file_name: &str,
    convert: impl FnOnce(&[RecordBatch]) -> Result<T>,
) -> Result<T> {
    let path = find_source_file(raw_dir, file_name)?;
    log_operation_start("Loading", &path);
    let start = Instant::now();

    let batches = read_csv_as_text(&path)?;
    let rows = batches.iter().map(RecordBatch::num_rows).sum();
    let converted = convert(&batches)?;

    log_operation_complete("loaded", &path, rows, Some(start.elapsed()));
    Ok(converted)
}

/// Load the admissions extract
pub fn load_encounters(raw_dir: &Path) -> Result<(Vec<Encounter>, usize)> {
    let formats = TimestampFormatConfig::default();
    load_table(raw_dir, ADMISSIONS_FILE, |b| encounters_from_batches(b, &formats))
}

/// Load the patients extract
pub fn load_patients(raw_dir: &Path) -> Result<(Vec<Patient>, usize)> {
    let formats = TimestampFormatConfig::default();
    load_table(raw_dir, PATIENTS_FILE, |b| patients_from_batches(b, &formats))
}

/// Load the lab events extract
pub fn load_lab_events(raw_dir: &Path) -> Result<Vec<LabEvent>> {
    load_table(raw_dir, LABEVENTS_FILE, lab_events_from_batches)
}

fn assemble(
    (encounters, skipped_encounters): (Vec<Encounter>, usize),
    (patients, skipped_patients): (Vec<Patient>, usize),
    lab_events: Vec<LabEvent>,
) -> RawTables {
    if skipped_encounters > 0 || skipped_patients > 0 {
        log::warn!(
            "Skipped {skipped_encounters} admissions and {skipped_patients} patients without a usable join key"
        );
    }

    RawTables {
        encounters,
        patients,
        lab_events,
        stats: LoadStats {
            skipped_encounters,
            skipped_patients,
        },
    }
}

/// Load all three extracts from `raw_dir`
pub fn load_raw_tables(raw_dir: &Path) -> Result<RawTables> {
    Ok(assemble(
        load_encounters(raw_dir)?,
        load_patients(raw_dir)?,
        load_lab_events(raw_dir)?,
    ))
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PipelineError::io_error(format!("Loader task failed: {e}")))?
}

/// Load all three extracts concurrently on the blocking thread pool
pub async fn load_raw_tables_async(raw_dir: &Path) -> Result<RawTables> {
    let (adm_dir, pat_dir, lab_dir) = (
        raw_dir.to_path_buf(),
        raw_dir.to_path_buf(),
        raw_dir.to_path_buf(),
    );

    let (encounters, patients, lab_events) = futures::try_join!(
        run_blocking(move || load_encounters(&adm_dir)),
        run_blocking(move || load_patients(&pat_dir)),
        run_blocking(move || load_lab_events(&lab_dir)),
    )?;

    Ok(assemble(encounters, patients, lab_events))
}
