//! Reading and writing persisted feature matrices
//!
//! Matrices are flat tables with the header
//! `age,gender,lab_count,abnormal_count,type_ELECTIVE,type_EMERGENCY,type_URGENT,hospital_expire_flag`.
//! Rows go through `serde_arrow` into a `RecordBatch` and out through the
//! Arrow CSV or Parquet writers.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use arrow::csv::reader::Format;
use arrow::csv::{ReaderBuilder, WriterBuilder};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use arrow_schema::FieldRef;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_arrow::schema::{SchemaLike, TracingOptions};

use crate::config::MatrixFormat;
use crate::error::util::{safe_create_file, safe_open_file};
use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COLUMNS, FeatureMatrix, FeatureVector, LABEL_COLUMN, LabeledRow};
use crate::utils::logging::{log_operation_complete, log_operation_start};

/// Flat on-disk row: the feature columns followed by the label
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct MatrixRecord {
    age: u8,
    gender: u8,
    lab_count: u64,
    abnormal_count: u64,
    #[serde(rename = "type_ELECTIVE")]
    type_elective: u8,
    #[serde(rename = "type_EMERGENCY")]
    type_emergency: u8,
    #[serde(rename = "type_URGENT")]
    type_urgent: u8,
    hospital_expire_flag: u8,
}

impl From<&LabeledRow> for MatrixRecord {
    fn from(row: &LabeledRow) -> Self {
        let f = &row.features;
        Self {
            age: f.age,
            gender: f.gender,
            lab_count: f.lab_count,
            abnormal_count: f.abnormal_count,
            type_elective: f.type_elective,
            type_emergency: f.type_emergency,
            type_urgent: f.type_urgent,
            hospital_expire_flag: u8::from(row.label),
        }
    }
}

impl TryFrom<MatrixRecord> for LabeledRow {
    type Error = PipelineError;

    fn try_from(r: MatrixRecord) -> Result<Self> {
        let label = match r.hospital_expire_flag {
            0 => false,
            1 => true,
            other => {
                return Err(PipelineError::SchemaDrift(format!(
                    "{LABEL_COLUMN} must be 0 or 1, found {other}"
                )));
            }
        };
        let features = FeatureVector {
            age: r.age,
            gender: r.gender,
            lab_count: r.lab_count,
            abnormal_count: r.abnormal_count,
            type_elective: r.type_elective,
            type_emergency: r.type_emergency,
            type_urgent: r.type_urgent,
        };
        features.validate()?;
        Ok(Self { features, label })
    }
}

/// Expected header: feature columns in order, then the label
#[must_use]
pub fn matrix_columns() -> Vec<&'static str> {
    FEATURE_COLUMNS
        .iter()
        .copied()
        .chain(std::iter::once(LABEL_COLUMN))
        .collect()
}

fn matrix_fields() -> Result<Vec<FieldRef>> {
    Ok(Vec::<FieldRef>::from_type::<MatrixRecord>(
        TracingOptions::default(),
    )?)
}

fn check_header(names: &[String], path: &Path) -> Result<()> {
    let expected = matrix_columns();
    if names.iter().map(String::as_str).eq(expected.iter().copied()) {
        Ok(())
    } else {
        Err(PipelineError::SchemaDrift(format!(
            "{} has columns [{}], expected [{}]",
            path.display(),
            names.join(", "),
            expected.join(", ")
        )))
    }
}

/// Convert labeled rows into a record batch with the fixed column order
pub fn matrix_to_record_batch(rows: &[LabeledRow]) -> Result<RecordBatch> {
    let records: Vec<MatrixRecord> = rows.iter().map(MatrixRecord::from).collect();
    Ok(serde_arrow::to_record_batch(&matrix_fields()?, &records)?)
}

/// Convert a record batch back into labeled rows
pub fn record_batch_to_rows(batch: &RecordBatch) -> Result<Vec<LabeledRow>> {
    let records: Vec<MatrixRecord> = serde_arrow::from_record_batch(batch)?;
    records.into_iter().map(LabeledRow::try_from).collect()
}

/// Persist a feature matrix
pub fn write_matrix(matrix: &FeatureMatrix, path: &Path, format: MatrixFormat) -> Result<()> {
    log_operation_start("Writing feature matrix to", path);
    let start = Instant::now();

    let batch = matrix_to_record_batch(&matrix.rows)?;
    let file = safe_create_file(path, "persisting feature matrix")?;

    match format {
        MatrixFormat::Csv => {
            let mut writer = WriterBuilder::new().with_header(true).build(file);
            writer.write(&batch)?;
        }
        MatrixFormat::Parquet => {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
        }
    }

    log_operation_complete("wrote", path, matrix.len(), Some(start.elapsed()));
    Ok(())
}

/// Load a persisted feature matrix, rejecting files whose columns drifted
pub fn read_matrix(path: &Path, format: MatrixFormat) -> Result<FeatureMatrix> {
    log_operation_start("Reading feature matrix from", path);
    let start = Instant::now();

    let batches = match format {
        MatrixFormat::Csv => read_csv_batches(path)?,
        MatrixFormat::Parquet => read_parquet_batches(path)?,
    };

    let mut rows = Vec::new();
    for batch in &batches {
        rows.extend(record_batch_to_rows(batch)?);
    }

    log_operation_complete("read", path, rows.len(), Some(start.elapsed()));
    Ok(FeatureMatrix::from_rows(rows))
}

fn read_csv_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let mut file = safe_open_file(path, "reading feature matrix")?;
    let format = Format::default().with_header(true);

    let (header, _) = format.infer_schema(&mut file, Some(1))?;
    let names: Vec<String> = header.fields().iter().map(|f| f.name().clone()).collect();
    check_header(&names, path)?;

    let file = safe_open_file(path, "reading feature matrix")?;
    let schema = Arc::new(Schema::new(matrix_fields()?));
    let reader = ReaderBuilder::new(schema).with_format(format).build(file)?;
    reader
        .map(|batch| batch.map_err(PipelineError::from))
        .collect()
}

fn read_parquet_batches(path: &Path) -> Result<Vec<RecordBatch>> {
    let file = safe_open_file(path, "reading feature matrix")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;

    let names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    check_header(&names, path)?;

    builder
        .build()?
        .map(|batch| batch.map_err(PipelineError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureMatrix {
        FeatureMatrix::from_rows(vec![
            LabeledRow {
                features: FeatureVector {
                    age: 65,
                    gender: 0,
                    lab_count: 40,
                    abnormal_count: 5,
                    type_elective: 0,
                    type_emergency: 1,
                    type_urgent: 0,
                },
                label: false,
            },
            LabeledRow {
                features: FeatureVector {
                    age: 90,
                    gender: 1,
                    lab_count: 0,
                    abnormal_count: 0,
                    type_elective: 1,
                    type_emergency: 0,
                    type_urgent: 0,
                },
                label: true,
            },
        ])
    }

    #[test]
    fn test_record_batch_column_order() {
        let batch = matrix_to_record_batch(&sample().rows).unwrap();
        let names: Vec<&str> = batch
            .schema_ref()
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, matrix_columns());
    }

    #[test]
    fn test_csv_header_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        write_matrix(&sample(), &path, MatrixFormat::Csv).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "age,gender,lab_count,abnormal_count,type_ELECTIVE,type_EMERGENCY,type_URGENT,hospital_expire_flag"
        );
        assert_eq!(text.lines().nth(1).unwrap(), "65,0,40,5,0,1,0,0");

        let reloaded = read_matrix(&path, MatrixFormat::Csv).unwrap();
        assert_eq!(reloaded.rows, sample().rows);
    }

    #[test]
    fn test_parquet_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.parquet");
        write_matrix(&sample(), &path, MatrixFormat::Parquet).unwrap();
        let reloaded = read_matrix(&path, MatrixFormat::Parquet).unwrap();
        assert_eq!(reloaded.rows, sample().rows);
        assert_eq!(reloaded.stats.positives, 1);
    }

    #[test]
    fn test_rows_breaking_feature_invariants_are_rejected() {
        let header = matrix_columns().join(",");
        let dir = tempfile::tempdir().unwrap();

        for (name, row) in [
            ("age", "95,0,40,5,0,1,0,0"),
            ("one_hot", "65,0,40,5,1,1,0,0"),
            ("indicator", "65,0,40,5,0,2,0,0"),
            ("counts", "65,0,4,5,0,1,0,0"),
            ("gender", "65,3,40,5,0,1,0,0"),
        ] {
            let path = dir.path().join(format!("{name}.csv"));
            std::fs::write(&path, format!("{header}\n{row}\n")).unwrap();
            let err = read_matrix(&path, MatrixFormat::Csv).unwrap_err();
            assert!(matches!(err, PipelineError::SchemaDrift(_)), "{name}: {err}");
        }
    }

    #[test]
    fn test_reordered_csv_is_schema_drift() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        std::fs::write(
            &path,
            "gender,age,lab_count,abnormal_count,type_ELECTIVE,type_EMERGENCY,type_URGENT,hospital_expire_flag\n0,65,40,5,0,1,0,0\n",
        )
        .unwrap();
        let err = read_matrix(&path, MatrixFormat::Csv).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaDrift(_)));
    }
}
