//! Pipeline configuration
//!
//! [`PipelineConfig`] is the user-facing settings document (YAML). A
//! [`TrainingPipelineConfig`] pins it to one timestamped artifact directory and
//! hands each stage its own config with concrete file paths.

use crate::error::{PhishnetError, Result};
use crate::imputation::WeightScheme;
use crate::training::{default_menu, ModelCandidate, SelectionMetric};
use crate::utils::read_yaml;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TARGET_COLUMN: &str = "Result";
pub const TRAIN_FILE_NAME: &str = "train.csv";
pub const TEST_FILE_NAME: &str = "test.csv";
pub const FEATURE_STORE_FILE_NAME: &str = "phishing_data.csv";
pub const DRIFT_REPORT_FILE_NAME: &str = "report.yaml";
pub const TRANSFORMED_TRAIN_FILE_NAME: &str = "train.bin";
pub const TRANSFORMED_TEST_FILE_NAME: &str = "test.bin";
pub const PREPROCESSING_OBJECT_FILE_NAME: &str = "preprocessing.bin";
pub const MODEL_FILE_NAME: &str = "model.bin";

/// What validation does with data that failed schema or drift checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnValidationFailure {
    /// Record the failure and continue with the data
    #[default]
    Proceed,
    /// Move the data to the invalid paths and stop the pipeline
    Reject,
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionSettings {
    /// Fraction of rows held out for testing
    pub train_test_split_ratio: f64,
}

impl Default for IngestionSettings {
    fn default() -> Self {
        Self {
            train_test_split_ratio: 0.2,
        }
    }
}

/// Validation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub schema_file_path: PathBuf,
    /// Columns with a KS p-value at or below this are drifted
    pub drift_threshold: f64,
    pub on_failure: OnValidationFailure,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema_file_path: PathBuf::from("data_schema/schema.yaml"),
            drift_threshold: 0.05,
            on_failure: OnValidationFailure::Proceed,
        }
    }
}

/// Transformation settings (KNN imputer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformationSettings {
    pub n_neighbors: usize,
    pub weights: WeightScheme,
}

impl Default for TransformationSettings {
    fn default() -> Self {
        Self {
            n_neighbors: 3,
            weights: WeightScheme::Uniform,
        }
    }
}

/// Model selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerSettings {
    pub cv_folds: usize,
    pub selection_metric: SelectionMetric,
    pub candidates: Vec<ModelCandidate>,
    /// Directory for the local run tracker; tracking is off when unset
    pub tracking_dir: Option<PathBuf>,
}

impl Default for TrainerSettings {
    fn default() -> Self {
        Self {
            cv_folds: 3,
            selection_metric: SelectionMetric::F1,
            candidates: default_menu(),
            tracking_dir: Some(PathBuf::from("mlruns")),
        }
    }
}

/// Top-level settings for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Parent of the per-run timestamped directories
    pub artifact_root: PathBuf,
    /// Where the final model is copied after a successful run
    pub final_model_dir: PathBuf,
    pub target_column: String,
    pub random_state: u64,
    pub ingestion: IngestionSettings,
    pub validation: ValidationSettings,
    pub transformation: TransformationSettings,
    pub trainer: TrainerSettings,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            artifact_root: PathBuf::from("artifacts"),
            final_model_dir: PathBuf::from("final_model"),
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            random_state: 42,
            ingestion: IngestionSettings::default(),
            validation: ValidationSettings::default(),
            transformation: TransformationSettings::default(),
            trainer: TrainerSettings::default(),
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from YAML; missing keys take their defaults
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let config: Self = read_yaml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_artifact_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.artifact_root = root.into();
        self
    }

    pub fn with_final_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.final_model_dir = dir.into();
        self
    }

    pub fn with_schema_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.validation.schema_file_path = path.into();
        self
    }

    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    pub fn with_on_validation_failure(mut self, policy: OnValidationFailure) -> Self {
        self.validation.on_failure = policy;
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.trainer.candidates = candidates;
        self
    }

    pub fn with_selection_metric(mut self, metric: SelectionMetric) -> Self {
        self.trainer.selection_metric = metric;
        self
    }

    pub fn with_tracking_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.trainer.tracking_dir = dir;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Reject settings no stage could run with
    pub fn validate(&self) -> Result<()> {
        let ratio = self.ingestion.train_test_split_ratio;
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(PhishnetError::ConfigError(format!(
                "train_test_split_ratio must lie in (0, 1), got {}",
                ratio
            )));
        }
        let threshold = self.validation.drift_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PhishnetError::ConfigError(format!(
                "drift_threshold must lie in [0, 1], got {}",
                threshold
            )));
        }
        if self.transformation.n_neighbors == 0 {
            return Err(PhishnetError::ConfigError("transformation.n_neighbors must be at least 1".to_string()));
        }
        if self.trainer.cv_folds < 2 {
            return Err(PhishnetError::ConfigError(format!(
                "cv_folds must be at least 2, got {}",
                self.trainer.cv_folds
            )));
        }
        if self.trainer.candidates.is_empty() {
            return Err(PhishnetError::ConfigError("the candidate menu is empty".to_string()));
        }
        if self.target_column.is_empty() {
            return Err(PhishnetError::ConfigError("target_column must be set".to_string()));
        }
        Ok(())
    }
}

/// Directory name for a run started at `timestamp`, e.g. `10_17_2026_14_03_59`
pub fn run_timestamp(timestamp: DateTime<Local>) -> String {
    timestamp.format("%m_%d_%Y_%H_%M_%S").to_string()
}

/// Settings pinned to one run's artifact directory
#[derive(Debug, Clone)]
pub struct TrainingPipelineConfig {
    pub settings: PipelineConfig,
    pub artifact_dir: PathBuf,
}

impl TrainingPipelineConfig {
    pub fn new(settings: PipelineConfig, timestamp: DateTime<Local>) -> Self {
        let artifact_dir = settings.artifact_root.join(run_timestamp(timestamp));
        Self { settings, artifact_dir }
    }

    pub fn data_ingestion_config(&self) -> DataIngestionConfig {
        DataIngestionConfig::new(&self.artifact_dir)
            .with_split_ratio(self.settings.ingestion.train_test_split_ratio)
            .with_random_state(self.settings.random_state)
    }

    pub fn data_validation_config(&self) -> DataValidationConfig {
        DataValidationConfig::new(&self.artifact_dir, &self.settings.validation.schema_file_path)
            .with_drift_threshold(self.settings.validation.drift_threshold)
            .with_on_failure(self.settings.validation.on_failure)
    }

    pub fn data_transformation_config(&self) -> DataTransformationConfig {
        DataTransformationConfig::new(&self.artifact_dir)
            .with_target_column(self.settings.target_column.clone())
            .with_imputer(self.settings.transformation.clone())
    }

    pub fn model_trainer_config(&self) -> ModelTrainerConfig {
        ModelTrainerConfig::new(&self.artifact_dir)
            .with_cv_folds(self.settings.trainer.cv_folds)
            .with_selection_metric(self.settings.trainer.selection_metric)
            .with_candidates(self.settings.trainer.candidates.clone())
            .with_random_state(self.settings.random_state)
    }

    /// Final model location, outside the timestamped directory
    pub fn final_model_path(&self) -> PathBuf {
        self.settings.final_model_dir.join(MODEL_FILE_NAME)
    }
}

/// Paths and parameters for ingestion
#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub feature_store_file_path: PathBuf,
    pub training_file_path: PathBuf,
    pub testing_file_path: PathBuf,
    pub train_test_split_ratio: f64,
    pub random_state: u64,
}

impl DataIngestionConfig {
    pub fn new(artifact_dir: impl AsRef<Path>) -> Self {
        let dir = artifact_dir.as_ref().join("data_ingestion");
        Self {
            feature_store_file_path: dir.join("feature_store").join(FEATURE_STORE_FILE_NAME),
            training_file_path: dir.join("ingested").join(TRAIN_FILE_NAME),
            testing_file_path: dir.join("ingested").join(TEST_FILE_NAME),
            train_test_split_ratio: 0.2,
            random_state: 42,
        }
    }

    pub fn with_split_ratio(mut self, ratio: f64) -> Self {
        self.train_test_split_ratio = ratio;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

/// Paths and parameters for validation
#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub schema_file_path: PathBuf,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: PathBuf,
    pub invalid_test_file_path: PathBuf,
    pub drift_report_file_path: PathBuf,
    pub drift_threshold: f64,
    pub on_failure: OnValidationFailure,
}

impl DataValidationConfig {
    pub fn new(artifact_dir: impl AsRef<Path>, schema_file_path: impl Into<PathBuf>) -> Self {
        let dir = artifact_dir.as_ref().join("data_validation");
        Self {
            schema_file_path: schema_file_path.into(),
            valid_train_file_path: dir.join("validated").join(TRAIN_FILE_NAME),
            valid_test_file_path: dir.join("validated").join(TEST_FILE_NAME),
            invalid_train_file_path: dir.join("invalid").join(TRAIN_FILE_NAME),
            invalid_test_file_path: dir.join("invalid").join(TEST_FILE_NAME),
            drift_report_file_path: dir.join("drift_report").join(DRIFT_REPORT_FILE_NAME),
            drift_threshold: 0.05,
            on_failure: OnValidationFailure::Proceed,
        }
    }

    pub fn with_drift_threshold(mut self, threshold: f64) -> Self {
        self.drift_threshold = threshold;
        self
    }

    pub fn with_on_failure(mut self, policy: OnValidationFailure) -> Self {
        self.on_failure = policy;
        self
    }
}

/// Paths and parameters for transformation
#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub target_column: String,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
    pub transformed_object_file_path: PathBuf,
    pub imputer: TransformationSettings,
}

impl DataTransformationConfig {
    pub fn new(artifact_dir: impl AsRef<Path>) -> Self {
        let dir = artifact_dir.as_ref().join("data_transformation");
        Self {
            target_column: DEFAULT_TARGET_COLUMN.to_string(),
            transformed_train_file_path: dir.join("transformed").join(TRANSFORMED_TRAIN_FILE_NAME),
            transformed_test_file_path: dir.join("transformed").join(TRANSFORMED_TEST_FILE_NAME),
            transformed_object_file_path: dir.join("transformed_object").join(PREPROCESSING_OBJECT_FILE_NAME),
            imputer: TransformationSettings::default(),
        }
    }

    pub fn with_target_column(mut self, name: impl Into<String>) -> Self {
        self.target_column = name.into();
        self
    }

    pub fn with_imputer(mut self, imputer: TransformationSettings) -> Self {
        self.imputer = imputer;
        self
    }
}

/// Paths and parameters for model selection
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub trained_model_file_path: PathBuf,
    pub cv_folds: usize,
    pub selection_metric: SelectionMetric,
    pub candidates: Vec<ModelCandidate>,
    pub random_state: u64,
}

impl ModelTrainerConfig {
    pub fn new(artifact_dir: impl AsRef<Path>) -> Self {
        let dir = artifact_dir.as_ref().join("model_trainer");
        Self {
            trained_model_file_path: dir.join("trained_model").join(MODEL_FILE_NAME),
            cv_folds: 3,
            selection_metric: SelectionMetric::F1,
            candidates: default_menu(),
            random_state: 42,
        }
    }

    pub fn with_cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    pub fn with_selection_metric(mut self, metric: SelectionMetric) -> Self {
        self.selection_metric = metric;
        self
    }

    pub fn with_candidates(mut self, candidates: Vec<ModelCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_column, "Result");
        assert_eq!(config.ingestion.train_test_split_ratio, 0.2);
        assert_eq!(config.trainer.cv_folds, 3);
        assert_eq!(config.trainer.candidates.len(), 5);
        assert_eq!(config.validation.on_failure, OnValidationFailure::Proceed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = PipelineConfig::new()
            .with_artifact_root("/tmp/a")
            .with_target_column("label")
            .with_on_validation_failure(OnValidationFailure::Reject)
            .with_tracking_dir(None);
        assert_eq!(config.artifact_root, PathBuf::from("/tmp/a"));
        assert_eq!(config.target_column, "label");
        assert_eq!(config.validation.on_failure, OnValidationFailure::Reject);
        assert!(config.trainer.tracking_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "\
target_column: label
validation:
  on_failure: reject
trainer:
  selection_metric: accuracy
  candidates:
    - model: logistic_regression
";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.target_column, "label");
        assert_eq!(config.validation.on_failure, OnValidationFailure::Reject);
        assert_eq!(config.validation.drift_threshold, 0.05);
        assert_eq!(config.trainer.selection_metric, SelectionMetric::Accuracy);
        assert_eq!(config.trainer.candidates, vec![ModelCandidate::LogisticRegression]);
        assert_eq!(config.trainer.cv_folds, 3);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = PipelineConfig::default();
        config.ingestion.train_test_split_ratio = 1.0;
        assert!(matches!(config.validate(), Err(PhishnetError::ConfigError(_))));

        let config = PipelineConfig::default().with_candidates(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_timestamped_layout() {
        let ts = Local.with_ymd_and_hms(2026, 10, 17, 14, 3, 59).unwrap();
        let pipeline = TrainingPipelineConfig::new(PipelineConfig::default(), ts);
        assert_eq!(pipeline.artifact_dir, PathBuf::from("artifacts/10_17_2026_14_03_59"));

        let ingestion = pipeline.data_ingestion_config();
        assert!(ingestion.training_file_path.ends_with("data_ingestion/ingested/train.csv"));

        let validation = pipeline.data_validation_config();
        assert!(validation.drift_report_file_path.ends_with("data_validation/drift_report/report.yaml"));

        let trainer = pipeline.model_trainer_config();
        assert!(trainer.trained_model_file_path.ends_with("model_trainer/trained_model/model.bin"));
        assert_eq!(pipeline.final_model_path(), PathBuf::from("final_model/model.bin"));
    }
}
