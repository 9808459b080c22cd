//! phishnet CLI Module
//!
//! Command-line interface for training, validation and prediction.

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::*;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::artifact::DataIngestionArtifact;
use crate::config::{PipelineConfig, TrainingPipelineConfig};
use crate::pipeline::TrainingPipeline;
use crate::training::NetworkModel;
use crate::utils::{DataLoader, DataSaver};
use crate::validation::DataValidation;

/// Name of the column holding predicted labels
pub const PREDICTION_COLUMN: &str = "predicted_column";

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }
fn bad(s: &str) -> ColoredString    { s.truecolor(230, 110, 100) }

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn kv(key: &str, val: &str) {
    println!("  {:<18} {}", muted(key), val.white());
}

fn status(passed: bool) -> ColoredString {
    if passed { ok("passed") } else { bad("failed") }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "phishnet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Train and serve phishing-website classifiers")]
#[command(long_about = None)]
pub struct Cli {
    /// Directory for log files
    #[arg(long, global = true, default_value = "logs")]
    pub log_dir: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full training pipeline on a raw CSV
    Train {
        /// Raw input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Pipeline settings (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run schema and drift checks on a train/test pair
    Validate {
        /// Reference (training) CSV
        #[arg(long)]
        train: PathBuf,

        /// Current (test) CSV
        #[arg(long)]
        test: PathBuf,

        /// Pipeline settings (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Predict labels with a trained model
    Predict {
        /// Trained model file
        #[arg(short, long)]
        model: PathBuf,

        /// Input CSV
        #[arg(short, long)]
        data: PathBuf,

        /// Output CSV with a predicted_column
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_settings(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::from_yaml_file(p)
            .with_context(|| format!("failed to load config {}", p.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Drifted columns and their p-values, read back from a persisted report
fn drifted_columns(report_path: &Path) -> anyhow::Result<Vec<(String, f64)>> {
    let doc: serde_yaml::Mapping = crate::utils::read_yaml(report_path)?;
    let mut drifted = Vec::new();
    for (key, value) in doc {
        if value.get("drift_status").and_then(|v| v.as_bool()) == Some(true) {
            let column = key.as_str().unwrap_or_default().to_string();
            let p_value = value.get("p_value").and_then(|v| v.as_f64()).unwrap_or(f64::NAN);
            drifted.push((column, p_value));
        }
    }
    Ok(drifted)
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(data_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Train");
    let settings = load_settings(config_path)?;
    let pipeline = TrainingPipeline::new(settings);
    kv("Artifacts", &pipeline.artifact_dir().display().to_string());

    step_run("Running pipeline");
    let start = Instant::now();
    let artifact = pipeline.run_pipeline(data_path)?;
    step_done(&format!("{:.1}s", start.elapsed().as_secs_f64()));

    println!();
    kv("Model", &artifact.trained_model_file_path.display().to_string());
    kv("Final model", &pipeline.config().final_model_path().display().to_string());
    let train = artifact.train_metric_artifact;
    let test = artifact.test_metric_artifact;
    kv("Train F1", &format!("{:.4}", train.f1_score));
    kv("Test F1", &format!("{:.4}", test.f1_score));
    kv("Test precision", &format!("{:.4}", test.precision_score));
    kv("Test recall", &format!("{:.4}", test.recall_score));
    println!();
    Ok(())
}

pub fn cmd_validate(train_path: &Path, test_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Validate");
    let settings = load_settings(config_path)?;
    let config = TrainingPipelineConfig::new(settings, Local::now()).data_validation_config();

    let ingestion = DataIngestionArtifact {
        train_file_path: train_path.to_path_buf(),
        test_file_path: test_path.to_path_buf(),
    };

    step_run("Checking schema and drift");
    let artifact = DataValidation::new(ingestion, config).initiate_data_validation()?;
    step_done("");

    println!();
    println!("  {:<18} {}", muted("Status"), status(artifact.validation_status));
    kv("Drift report", &artifact.drift_report_file_path.display().to_string());
    for (column, p_value) in drifted_columns(&artifact.drift_report_file_path)? {
        println!("  {:<18} {} {}", muted("Drifted"), column.yellow(), dim(&format!("p={:.4}", p_value)));
    }
    if let Some(path) = &artifact.invalid_train_file_path {
        kv("Invalid train", &path.display().to_string());
    }
    println!();
    Ok(())
}

pub fn cmd_predict(model_path: &Path, data_path: &Path, output: Option<&Path>) -> anyhow::Result<()> {
    section("Predict");

    step_run("Loading model");
    let model = NetworkModel::load(model_path)
        .with_context(|| format!("failed to load model {}", model_path.display()))?;
    step_done(model.model().family());

    step_run("Loading data");
    let mut df = DataLoader::new().load_csv(data_path)?;
    step_done(&format!("{} rows × {} cols", df.height(), df.width()));

    let start = Instant::now();
    let predictions = model.predict(&df)?;
    let positives = predictions.iter().filter(|&&p| p == 1.0).count();
    df.with_column(Series::new(PREDICTION_COLUMN.into(), predictions.to_vec()))?;

    println!();
    kv("Rows", &predictions.len().to_string());
    kv("Phishing", &positives.to_string());
    kv("Time", &format!("{:?}", start.elapsed()));

    if let Some(path) = output {
        DataSaver::save_csv(&df, path)?;
        kv("Output", &path.display().to_string());
    }
    println!();
    Ok(())
}
