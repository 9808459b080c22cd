//! Artifacts passed between pipeline stages
//!
//! Each record is produced by exactly one stage and only read afterwards. They
//! reference persisted files rather than embedding data.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of the ingestion stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
}

/// Output of the validation stage
///
/// The `valid_*` paths are always filled in, but under the reject policy a
/// failed run writes its copies to the `invalid_*` paths instead and leaves the
/// valid ones unwritten. Check `validation_status` before reading them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    /// True when both schema checks passed and no column drifted
    pub validation_status: bool,
    pub valid_train_file_path: PathBuf,
    pub valid_test_file_path: PathBuf,
    pub invalid_train_file_path: Option<PathBuf>,
    pub invalid_test_file_path: Option<PathBuf>,
    pub drift_report_file_path: PathBuf,
}

/// Output of the transformation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTransformationArtifact {
    pub transformed_object_file_path: PathBuf,
    pub transformed_train_file_path: PathBuf,
    pub transformed_test_file_path: PathBuf,
}

/// Precision, recall and F1 for the positive class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetricArtifact {
    pub f1_score: f64,
    pub precision_score: f64,
    pub recall_score: f64,
}

/// Output of the model trainer stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelTrainerArtifact {
    pub trained_model_file_path: PathBuf,
    pub train_metric_artifact: ClassificationMetricArtifact,
    pub test_metric_artifact: ClassificationMetricArtifact,
}
