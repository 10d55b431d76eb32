//! `mortality-risk` command line
//!
//! - `etl` builds and persists the train/test matrices from the raw extracts.
//! - `train` fits, evaluates and persists the scaler and forest.
//! - `run` does both.
//! - `predict` scores one JSON request.
//! - `serve` scores JSON requests line by line from stdin.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::StreamExt;
use futures::stream::FuturesOrdered;
use log::info;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use mortality_risk::inference::{self, InferenceResponse, InferenceService};
use mortality_risk::{MatrixFormat, PipelineConfig, pipeline};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "mortality-risk", about = "In-hospital mortality risk pipeline", version)]
struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file; absent keys keep their defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the raw CSV extracts
    #[arg(long, global = true)]
    raw_dir: Option<PathBuf>,

    /// Directory for the train/test matrices
    #[arg(long, global = true)]
    processed_dir: Option<PathBuf>,

    /// Directory for the scaler, model and metrics artifacts
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Write matrices as parquet instead of CSV
    #[arg(long, global = true)]
    parquet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load raw data, build features, split and save
    Etl,

    /// Train and evaluate the classifier on the saved split
    Train {
        /// Number of trees (overrides the configuration)
        #[arg(long)]
        trees: Option<usize>,

        /// Forest seed (overrides the configuration)
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run ETL followed by training
    Run,

    /// Score a single request
    Predict {
        /// Request body, e.g. '{"age": 65, "gender": "M"}'
        #[arg(long)]
        json: String,
    },

    /// Score one JSON request per stdin line, writing one response per line
    Serve {
        /// Maximum number of requests scored concurrently
        #[arg(long)]
        max_in_flight: Option<usize>,
    },
}

/// One `serve` output line
#[derive(Serialize)]
struct ServeLine {
    code: u16,
    #[serde(flatten)]
    response: InferenceResponse,
}

fn resolve_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(dir) = &cli.raw_dir {
        config.raw_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.processed_dir {
        config.processed_dir.clone_from(dir);
    }
    if let Some(dir) = &cli.model_dir {
        config.model_dir.clone_from(dir);
    }
    if cli.parquet {
        config.matrix_format = MatrixFormat::Parquet;
    }
    if let Commands::Train { trees, seed } = &cli.command {
        if let Some(n) = trees {
            config.forest.n_trees = *n;
        }
        if let Some(s) = seed {
            config.forest.seed = *s;
        }
    }

    config.validate()?;
    Ok(config)
}

async fn emit(stdout: &mut tokio::io::Stdout, (code, response): (u16, InferenceResponse)) -> anyhow::Result<()> {
    let mut line = serde_json::to_vec(&ServeLine { code, response })?;
    line.push(b'\n');
    stdout.write_all(&line).await?;
    stdout.flush().await?;
    Ok(())
}

async fn serve(service: &'static InferenceService, max_in_flight: usize) -> anyhow::Result<()> {
    // Raw byte lines: a line that is not UTF-8 is answered, not fatal
    let mut lines = BufReader::new(tokio::io::stdin()).split(b'\n');
    let mut stdout = tokio::io::stdout();
    let mut pending = FuturesOrdered::new();

    while let Some(line) = lines.next_segment().await? {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        pending.push_back(tokio::task::spawn_blocking(move || service.respond_bytes(&line)));

        if pending.len() >= max_in_flight {
            if let Some(done) = pending.next().await {
                emit(&mut stdout, done?).await?;
            }
        }
    }

    while let Some(done) = pending.next().await {
        emit(&mut stdout, done?).await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let config = resolve_config(&cli)?;
    log::debug!("{config}");
    pipeline::configure_thread_pool(config.worker_threads);

    match cli.command {
        Commands::Etl => {
            let summary = pipeline::run_etl_async(&config).await?;
            info!(
                "ETL finished: {} train rows, {} test rows",
                summary.train_rows, summary.test_rows
            );
        }
        Commands::Train { .. } => {
            let summary = pipeline::run_training(&config)?;
            info!("Metrics written to {}", summary.metrics_path.display());
        }
        Commands::Run => {
            let (_, training) = pipeline::run_all(&config).await?;
            info!("Pipeline finished; artifacts in {}", training.model_dir.display());
        }
        Commands::Predict { json } => {
            let service = InferenceService::load(&config.model_dir);
            let (code, response) = service.respond_str(&json);
            println!("{}", serde_json::to_string_pretty(&response)?);
            if code != 200 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Serve { max_in_flight } => {
            let service = inference::install_global(InferenceService::load(&config.model_dir))?;
            if !service.is_ready() {
                log::warn!("Serving without a model; every request will be rejected");
            }
            serve(service, max_in_flight.unwrap_or(config.worker_threads).max(1)).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
