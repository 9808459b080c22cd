//! Validation stage: schema checks, drift detection and persisted copies

use crate::artifact::{DataIngestionArtifact, DataValidationArtifact};
use crate::config::{DataValidationConfig, OnValidationFailure};
use crate::error::{Result, Stage, StageContext};
use crate::utils::{DataLoader, DataSaver};
use tracing::{info, info_span, warn};

use super::drift::detect_drift;
use super::schema::{validate_columns, Schema, SchemaCheck};

/// Validation stage
pub struct DataValidation {
    ingestion_artifact: DataIngestionArtifact,
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(ingestion_artifact: DataIngestionArtifact, config: DataValidationConfig) -> Self {
        Self {
            ingestion_artifact,
            config,
        }
    }

    pub fn config(&self) -> &DataValidationConfig {
        &self.config
    }

    /// Check both splits against the schema, compare their distributions and
    /// persist the copies where the failure policy says.
    pub fn initiate_data_validation(&self) -> Result<DataValidationArtifact> {
        let _span = info_span!("data_validation").entered();
        self.run().in_stage(Stage::Validation)
    }

    fn run(&self) -> Result<DataValidationArtifact> {
        let schema = Schema::load(&self.config.schema_file_path)?;
        let loader = DataLoader::new();
        let train_df = loader.load_csv(&self.ingestion_artifact.train_file_path)?;
        let test_df = loader.load_csv(&self.ingestion_artifact.test_file_path)?;

        let train_ok = log_schema_check("train", validate_columns(&train_df, &schema));
        let test_ok = log_schema_check("test", validate_columns(&test_df, &schema));

        let report = detect_drift(&train_df, &test_df, self.config.drift_threshold)?;
        report.write_yaml(&self.config.drift_report_file_path)?;

        let drifted = report.drifted_columns();
        if !drifted.is_empty() {
            warn!(columns = ?drifted, "dataset drift detected");
        }

        let validation_status = train_ok && test_ok && report.status();

        let rejected = !validation_status && self.config.on_failure == OnValidationFailure::Reject;
        let artifact = if rejected {
            DataSaver::save_csv(&train_df, &self.config.invalid_train_file_path)?;
            DataSaver::save_csv(&test_df, &self.config.invalid_test_file_path)?;
            DataValidationArtifact {
                validation_status,
                valid_train_file_path: self.config.valid_train_file_path.clone(),
                valid_test_file_path: self.config.valid_test_file_path.clone(),
                invalid_train_file_path: Some(self.config.invalid_train_file_path.clone()),
                invalid_test_file_path: Some(self.config.invalid_test_file_path.clone()),
                drift_report_file_path: self.config.drift_report_file_path.clone(),
            }
        } else {
            DataSaver::save_csv(&train_df, &self.config.valid_train_file_path)?;
            DataSaver::save_csv(&test_df, &self.config.valid_test_file_path)?;
            DataValidationArtifact {
                validation_status,
                valid_train_file_path: self.config.valid_train_file_path.clone(),
                valid_test_file_path: self.config.valid_test_file_path.clone(),
                invalid_train_file_path: None,
                invalid_test_file_path: None,
                drift_report_file_path: self.config.drift_report_file_path.clone(),
            }
        };

        info!(
            validation_status,
            drifted = drifted.len(),
            policy = ?self.config.on_failure,
            "data validation finished"
        );
        Ok(artifact)
    }
}

fn log_schema_check(split: &str, check: SchemaCheck) -> bool {
    if let SchemaCheck::Mismatch { expected, actual } = check {
        warn!(split, expected, actual, "column count does not match the schema");
    }
    check.is_valid()
}
