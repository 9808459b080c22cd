//! Integration test: validation stage (schema, drift, failure policy)

use phishnet::artifact::DataIngestionArtifact;
use phishnet::config::{DataValidationConfig, OnValidationFailure};
use phishnet::error::{PhishnetError, Stage};
use phishnet::utils::DataSaver;
use phishnet::validation::DataValidation;
use polars::prelude::*;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::path::Path;

const SCHEMA: &str = "\
columns:
  - x: float64
  - Result: int64
";

fn uniform_frame(n: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let x: Vec<f64> = (0..n).map(|_| rng.gen::<f64>()).collect();
    let labels: Vec<i64> = (0..n).map(|i| if i % 2 == 0 { -1 } else { 1 }).collect();
    df!("x" => x, "Result" => labels).unwrap()
}

fn constant_frame(n: usize, value: f64) -> DataFrame {
    let labels: Vec<i64> = (0..n).map(|i| if i % 2 == 0 { -1 } else { 1 }).collect();
    df!("x" => vec![value; n], "Result" => labels).unwrap()
}

fn setup(dir: &Path, train: &DataFrame, test: &DataFrame, schema: &str) -> (DataIngestionArtifact, DataValidationConfig) {
    let train_path = dir.join("ingested/train.csv");
    let test_path = dir.join("ingested/test.csv");
    DataSaver::save_csv(train, &train_path).unwrap();
    DataSaver::save_csv(test, &test_path).unwrap();

    let schema_path = dir.join("schema.yaml");
    std::fs::write(&schema_path, schema).unwrap();

    let artifact = DataIngestionArtifact {
        train_file_path: train_path,
        test_file_path: test_path,
    };
    let config = DataValidationConfig::new(dir.join("artifacts"), schema_path);
    (artifact, config)
}

fn read_report(path: &Path) -> serde_yaml::Value {
    serde_yaml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_identical_data_passes() {
    let dir = tempfile::tempdir().unwrap();
    let df = uniform_frame(100, 1);
    let (ingestion, config) = setup(dir.path(), &df, &df, SCHEMA);

    let artifact = DataValidation::new(ingestion, config).initiate_data_validation().unwrap();

    assert!(artifact.validation_status);
    assert!(artifact.valid_train_file_path.exists());
    assert!(artifact.valid_test_file_path.exists());
    assert!(artifact.invalid_train_file_path.is_none());

    let report = read_report(&artifact.drift_report_file_path);
    for column in ["x", "Result"] {
        assert_eq!(report[column]["p_value"].as_f64(), Some(1.0));
        assert_eq!(report[column]["drift_status"].as_bool(), Some(false));
    }
}

#[test]
fn test_shifted_column_is_drift() {
    let dir = tempfile::tempdir().unwrap();
    let (ingestion, config) = setup(dir.path(), &uniform_frame(100, 2), &constant_frame(20, 1000.0), SCHEMA);

    let artifact = DataValidation::new(ingestion, config).initiate_data_validation().unwrap();

    assert!(!artifact.validation_status);
    let report = read_report(&artifact.drift_report_file_path);
    assert!(report["x"]["p_value"].as_f64().unwrap() < 0.05);
    assert_eq!(report["x"]["drift_status"].as_bool(), Some(true));
    assert_eq!(report["Result"]["drift_status"].as_bool(), Some(false));

    // Proceed keeps the copies on the valid paths
    assert!(artifact.valid_train_file_path.exists());
    assert!(artifact.invalid_test_file_path.is_none());
}

#[test]
fn test_reject_policy_moves_data_to_invalid_paths() {
    let dir = tempfile::tempdir().unwrap();
    let (ingestion, config) = setup(dir.path(), &uniform_frame(100, 3), &constant_frame(20, 1000.0), SCHEMA);
    let config = config.with_on_failure(OnValidationFailure::Reject);

    let artifact = DataValidation::new(ingestion, config).initiate_data_validation().unwrap();

    assert!(!artifact.validation_status);
    let invalid_train = artifact.invalid_train_file_path.clone().unwrap();
    let invalid_test = artifact.invalid_test_file_path.clone().unwrap();
    assert!(invalid_train.exists());
    assert!(invalid_test.exists());
    assert!(!artifact.valid_train_file_path.exists());
}

#[test]
fn test_schema_mismatch_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let df = uniform_frame(50, 4);
    let schema = "columns:\n  - x: float64\n  - y: float64\n  - Result: int64\n";
    let (ingestion, config) = setup(dir.path(), &df, &df, schema);

    let artifact = DataValidation::new(ingestion, config).initiate_data_validation().unwrap();
    assert!(!artifact.validation_status);
    assert!(artifact.drift_report_file_path.exists());
}

#[test]
fn test_rerun_overwrites_report() {
    let dir = tempfile::tempdir().unwrap();
    let df = uniform_frame(40, 5);
    let (ingestion, config) = setup(dir.path(), &df, &df, SCHEMA);

    let first = DataValidation::new(ingestion.clone(), config.clone()).initiate_data_validation().unwrap();
    let second = DataValidation::new(ingestion, config).initiate_data_validation().unwrap();
    assert_eq!(first, second);
    assert!(second.drift_report_file_path.exists());
}

#[test]
fn test_missing_schema_fails_in_validation_stage() {
    let dir = tempfile::tempdir().unwrap();
    let df = uniform_frame(20, 6);
    let (ingestion, _) = setup(dir.path(), &df, &df, SCHEMA);
    let config = DataValidationConfig::new(dir.path().join("artifacts"), dir.path().join("missing.yaml"));

    let err = DataValidation::new(ingestion, config).initiate_data_validation().unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Validation));
    assert!(matches!(err.root(), PhishnetError::SchemaError(_) | PhishnetError::IoError(_)));
}
