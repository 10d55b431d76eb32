//! Offline pipeline stages
//!
//! `run_etl` turns the raw extracts into persisted train/test matrices and
//! `run_training` turns those matrices into persisted artifacts. Each stage
//! only reads what the previous one wrote, so they can run as separate
//! processes.

use std::path::PathBuf;
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::dataset::{DatasetSplit, load_split, split_and_persist};
use crate::error::{PipelineError, Result};
use crate::features::{BuildStats, build_feature_matrix};
use crate::loader::{LoadStats, RawTables, load_raw_tables, load_raw_tables_async};
use crate::model::{EvaluationReport, save_report, train_and_evaluate};
use crate::utils::logging::log_step;

const ETL_STEPS: usize = 3;
const TRAINING_STEPS: usize = 3;

/// What an ETL run produced
#[derive(Debug, Clone, Copy)]
pub struct EtlSummary {
    pub load: LoadStats,
    pub build: BuildStats,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// What a training run produced
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub report: EvaluationReport,
    pub model_dir: PathBuf,
    pub metrics_path: PathBuf,
}

/// Size the global rayon pool; only the first call in a process has effect
pub fn configure_thread_pool(worker_threads: usize) {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(worker_threads)
        .build_global()
    {
        Ok(()) => log::debug!("Using {worker_threads} worker threads"),
        Err(e) => log::debug!("Keeping existing thread pool: {e}"),
    }
}

fn finish_etl(config: &PipelineConfig, tables: &RawTables) -> Result<EtlSummary> {
    log_step(2, ETL_STEPS, "Building feature matrix");
    let matrix = build_feature_matrix(tables);
    log::info!("{}", matrix.stats);

    log_step(3, ETL_STEPS, "Splitting and saving");
    let DatasetSplit { train, test } = split_and_persist(&matrix, config)?;

    Ok(EtlSummary {
        load: tables.stats,
        build: matrix.stats,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}

/// Load, build and persist the train/test matrices
pub fn run_etl(config: &PipelineConfig) -> Result<EtlSummary> {
    let start = Instant::now();
    log_step(1, ETL_STEPS, "Loading raw data");
    let tables = load_raw_tables(&config.raw_dir)?;
    let summary = finish_etl(config, &tables)?;
    log::info!("ETL completed in {:?}", start.elapsed());
    Ok(summary)
}

/// Like [`run_etl`], reading the three extracts concurrently
pub async fn run_etl_async(config: &PipelineConfig) -> Result<EtlSummary> {
    let start = Instant::now();
    log_step(1, ETL_STEPS, "Loading raw data");
    let tables = load_raw_tables_async(&config.raw_dir).await?;
    let summary = finish_etl(config, &tables)?;
    log::info!("ETL completed in {:?}", start.elapsed());
    Ok(summary)
}

/// Fit, evaluate and persist the scaler, forest and metrics
pub fn run_training(config: &PipelineConfig) -> Result<TrainingSummary> {
    let start = Instant::now();

    log_step(1, TRAINING_STEPS, "Loading processed data");
    let split = load_split(config)?;
    if split.train.is_empty() {
        return Err(PipelineError::EmptyDataset(
            "training matrix has no rows".into(),
        ));
    }
    log::info!(
        "Loaded {} training and {} test rows",
        split.train.len(),
        split.test.len()
    );

    log_step(2, TRAINING_STEPS, "Training classifier");
    let outcome = train_and_evaluate(&split, &config.forest)?;

    log_step(3, TRAINING_STEPS, "Saving artifacts");
    outcome.artifacts.save(&config.model_dir)?;
    let metrics_path = save_report(&outcome.report, &config.model_dir)?;
    log::info!("Artifacts saved to {}", config.model_dir.display());

    log::info!("Training completed in {:?}", start.elapsed());
    Ok(TrainingSummary {
        report: outcome.report,
        model_dir: config.model_dir.clone(),
        metrics_path,
    })
}

/// ETL followed by training
pub async fn run_all(config: &PipelineConfig) -> Result<(EtlSummary, TrainingSummary)> {
    let etl = run_etl_async(config).await?;
    let training = run_training(config)?;
    Ok((etl, training))
}
