use std::fs;

use mortality_risk::dataset::load_split;
use mortality_risk::inference::{InferenceService, ResponseStatus};
use mortality_risk::model::{METRICS_FILE, MODEL_FILE, SCALER_FILE};
use mortality_risk::{ErrorCategory, MatrixFormat, PipelineError, Result, pipeline};
use serde_json::json;

use crate::utils::{scratch_config, synthetic_cohort, write_raw_extracts};

#[test]
fn test_etl_train_serve() -> Result<()> {
    let root = tempfile::tempdir()?;
    let config = scratch_config(&root);
    write_raw_extracts(&config.raw_dir, &synthetic_cohort(200, 7));

    let etl = pipeline::run_etl(&config)?;
    assert_eq!(etl.build.rows, 200);
    assert_eq!(etl.test_rows, 40);
    assert_eq!(etl.train_rows, 160);

    let train_csv = fs::read_to_string(config.matrix_path("train"))?;
    assert!(train_csv.starts_with(
        "age,gender,lab_count,abnormal_count,type_ELECTIVE,type_EMERGENCY,type_URGENT,hospital_expire_flag\n"
    ));

    let training = pipeline::run_training(&config)?;
    for file in [SCALER_FILE, MODEL_FILE, METRICS_FILE] {
        assert!(config.model_dir.join(file).is_file(), "{file} missing");
    }
    assert!((0.0..=1.0).contains(&training.report.accuracy));
    assert_eq!(training.report.test_rows, 40);

    let service = InferenceService::load(&config.model_dir);
    assert!(service.is_ready());

    let (code, response) = service.respond(&json!({
        "age": 65, "gender": "M", "admission_type": "EMERGENCY",
        "lab_count": 40, "abnormal_count": 5
    }));
    assert_eq!(code, 200);
    assert_eq!(response.status, ResponseStatus::Success);
    let risk = response.mortality_risk.unwrap();
    assert!((0.0..=1.0).contains(&risk));

    // every field missing still scores with the serving defaults
    let (code, _) = service.respond(&json!({}));
    assert_eq!(code, 200);

    let (code, response) = service.respond(&json!({"age": "sixty"}));
    assert_eq!(code, 400);
    assert_eq!(response.status, ResponseStatus::Error);

    let (code, _) = service.respond(&json!({"lab_count": 3, "abnormal_count": 4}));
    assert_eq!(code, 400);

    let (code, _) = service.respond_str("not json");
    assert_eq!(code, 400);

    // a line that is not UTF-8 is rejected and the next one is still served
    let (code, _) = service.respond_bytes(b"\xff\xfe");
    assert_eq!(code, 400);
    let (code, _) = service.respond_bytes(br#"{"age": 2}"#);
    assert_eq!(code, 200);

    Ok(())
}

#[test]
fn test_training_is_deterministic() -> Result<()> {
    let root = tempfile::tempdir()?;
    let config = scratch_config(&root);
    write_raw_extracts(&config.raw_dir, &synthetic_cohort(120, 3));

    pipeline::run_etl(&config)?;
    pipeline::run_training(&config)?;
    let first = fs::read_to_string(config.model_dir.join(MODEL_FILE))?;

    pipeline::run_etl(&config)?;
    pipeline::run_training(&config)?;
    let second = fs::read_to_string(config.model_dir.join(MODEL_FILE))?;

    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_parquet_matrices() -> Result<()> {
    let root = tempfile::tempdir()?;
    let mut config = scratch_config(&root);
    config.matrix_format = MatrixFormat::Parquet;
    write_raw_extracts(&config.raw_dir, &synthetic_cohort(50, 11));

    pipeline::run_etl(&config)?;
    assert!(config.processed_dir.join("train.parquet").is_file());

    let split = load_split(&config)?;
    assert_eq!(split.train.len() + split.test.len(), 50);
    assert_eq!(split.test.len(), 10);
    Ok(())
}

#[tokio::test]
async fn test_async_etl_matches_sync() -> Result<()> {
    let root = tempfile::tempdir()?;
    let config = scratch_config(&root);
    write_raw_extracts(&config.raw_dir, &synthetic_cohort(80, 5));

    let sync = pipeline::run_etl(&config)?;
    let sync_train = fs::read_to_string(config.matrix_path("train"))?;

    let concurrent = pipeline::run_etl_async(&config).await?;
    let async_train = fs::read_to_string(config.matrix_path("train"))?;

    assert_eq!(sync.build, concurrent.build);
    assert_eq!(sync_train, async_train);
    Ok(())
}

#[test]
fn test_missing_raw_file_is_fatal() -> Result<()> {
    let root = tempfile::tempdir()?;
    let config = scratch_config(&root);
    write_raw_extracts(&config.raw_dir, &synthetic_cohort(10, 1));
    fs::remove_file(config.raw_dir.join("LABEVENTS.csv"))?;

    let err = pipeline::run_etl(&config).unwrap_err();
    assert!(matches!(err, PipelineError::DataSourceMissing { .. }), "{err}");
    assert_eq!(err.category(), ErrorCategory::DataSourceMissing);
    assert!(!config.matrix_path("train").exists());
    Ok(())
}

#[test]
fn test_training_requires_etl_output() -> Result<()> {
    let root = tempfile::tempdir()?;
    let config = scratch_config(&root);

    let err = pipeline::run_training(&config).unwrap_err();
    assert_eq!(err.category(), ErrorCategory::DataSourceMissing);
    assert!(!config.model_dir.join(MODEL_FILE).exists());
    Ok(())
}

#[test]
fn test_serving_without_artifacts() -> Result<()> {
    let root = tempfile::tempdir()?;
    let service = InferenceService::load(root.path());

    for body in [json!({"age": 70}), json!({"age": "bad"}), json!(null)] {
        let (code, response) = service.respond(&body);
        assert_eq!(code, 503);
        assert_eq!(response.status, ResponseStatus::Error);
        assert!(response.mortality_risk.is_none());
    }
    Ok(())
}
