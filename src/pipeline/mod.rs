//! End-to-end training pipeline
//!
//! Runs ingestion, validation, transformation and model selection in order.
//! Each stage only reads the artifact of the one before it.

use crate::artifact::{DataValidationArtifact, ModelTrainerArtifact};
use crate::config::{OnValidationFailure, PipelineConfig, TrainingPipelineConfig};
use crate::error::{PhishnetError, Result, Stage, StageContext};
use crate::ingestion::DataIngestion;
use crate::tracking::{ExperimentTracker, LocalTracker, NoopTracker};
use crate::training::ModelTrainer;
use crate::transformation::DataTransformation;
use crate::utils::Timer;
use crate::validation::DataValidation;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, info_span};

/// Drives one training run
pub struct TrainingPipeline {
    config: TrainingPipelineConfig,
}

impl TrainingPipeline {
    /// Pipeline writing under a directory stamped with the current time
    pub fn new(settings: PipelineConfig) -> Self {
        Self {
            config: TrainingPipelineConfig::new(settings, Local::now()),
        }
    }

    pub fn from_config(config: TrainingPipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingPipelineConfig {
        &self.config
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.config.artifact_dir
    }

    fn tracker(&self) -> Box<dyn ExperimentTracker> {
        match &self.config.settings.trainer.tracking_dir {
            Some(dir) => Box::new(LocalTracker::new(dir)),
            None => Box::new(NoopTracker),
        }
    }

    fn check_validation(&self, artifact: &DataValidationArtifact) -> Result<()> {
        if !artifact.validation_status && self.config.settings.validation.on_failure == OnValidationFailure::Reject {
            return Err(PhishnetError::ValidationRejected(format!(
                "schema or drift checks failed, see {}",
                artifact.drift_report_file_path.display()
            ))
            .in_stage(Stage::Validation));
        }
        Ok(())
    }

    /// Run every stage on `source_csv` and copy the selected model to the
    /// final model directory.
    pub fn run_pipeline(&self, source_csv: impl AsRef<Path>) -> Result<ModelTrainerArtifact> {
        let _span = info_span!("training_pipeline", artifact_dir = %self.config.artifact_dir.display()).entered();
        let timer = Timer::start();

        let ingestion_artifact =
            DataIngestion::new(self.config.data_ingestion_config()).initiate_data_ingestion(source_csv)?;
        info!(?ingestion_artifact, "data ingestion completed");

        let validation_artifact =
            DataValidation::new(ingestion_artifact, self.config.data_validation_config()).initiate_data_validation()?;
        info!(status = validation_artifact.validation_status, "data validation completed");
        self.check_validation(&validation_artifact)?;

        let transformation_artifact =
            DataTransformation::new(validation_artifact, self.config.data_transformation_config())
                .initiate_data_transformation()?;
        info!(?transformation_artifact, "data transformation completed");

        let trainer_artifact = ModelTrainer::new(self.config.model_trainer_config(), transformation_artifact)
            .with_tracker(self.tracker())
            .initiate_model_trainer()?;

        let final_path = self
            .publish_model(&trainer_artifact.trained_model_file_path)
            .in_stage(Stage::ModelTrainer)?;
        info!(
            final_model = %final_path.display(),
            elapsed_secs = timer.elapsed_secs(),
            "training pipeline completed"
        );
        Ok(trainer_artifact)
    }

    fn publish_model(&self, trained_model: &Path) -> Result<PathBuf> {
        let final_path = self.config.final_model_path();
        if let Some(parent) = final_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(trained_model, &final_path)?;
        Ok(final_path)
    }
}
