//! phishnet - Phishing-website classifier training pipeline
//!
//! This crate trains a binary classifier over URL and page indicator features:
//! - Ingestion of a raw CSV into a seeded train/test split
//! - Schema and Kolmogorov-Smirnov drift validation
//! - KNN imputation of missing feature values
//! - Cross-validated model selection over several classifier families
//! - A persisted model bundle for prediction
//!
//! # Modules
//!
//! ## Pipeline stages
//! - [`ingestion`] - Feature store copy and train/test split
//! - [`validation`] - Schema checks and drift detection
//! - [`transformation`] - Target normalization and KNN imputation
//! - [`training`] - Classifiers, grid search and the model trainer
//! - [`pipeline`] - End-to-end runner
//!
//! ## Support
//! - [`artifact`] - Records passed between stages
//! - [`config`] - Settings and per-run artifact layout
//! - [`imputation`] - Missing value imputation
//! - [`tracking`] - Experiment tracking
//! - [`utils`] - Data loading, persistence and logging
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Pipeline stages
pub mod ingestion;
pub mod validation;
pub mod transformation;
pub mod training;
pub mod pipeline;

// Support
pub mod artifact;
pub mod config;
pub mod imputation;
pub mod tracking;
pub mod utils;

// Services
pub mod cli;

pub use error::{PhishnetError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{PhishnetError, Result, Stage};

    // Artifacts
    pub use crate::artifact::{
        ClassificationMetricArtifact, DataIngestionArtifact, DataTransformationArtifact, DataValidationArtifact,
        ModelTrainerArtifact,
    };

    // Configuration
    pub use crate::config::{OnValidationFailure, PipelineConfig, TrainingPipelineConfig};

    // Stages
    pub use crate::ingestion::DataIngestion;
    pub use crate::pipeline::TrainingPipeline;
    pub use crate::training::ModelTrainer;
    pub use crate::transformation::{normalize_target, DataTransformation, Preprocessor};
    pub use crate::validation::{detect_drift, validate_columns, DataValidation, DriftReport, Schema, SchemaCheck};

    // Models
    pub use crate::training::{default_menu, EstimatorSpec, ModelCandidate, NetworkModel, SelectionMetric, TrainedModel};

    // Imputation
    pub use crate::imputation::{Imputer, KNNImputer, WeightScheme};

    // Experiment tracking
    pub use crate::tracking::{ExperimentTracker, LocalTracker, NoopTracker, TrackedRun};
}
