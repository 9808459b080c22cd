//! Error types for the phishnet training pipeline

use std::fmt;
use thiserror::Error;

/// Result type alias for phishnet operations
pub type Result<T> = std::result::Result<T, PhishnetError>;

/// Pipeline stage a failure originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingestion,
    Validation,
    Transformation,
    ModelTrainer,
    Prediction,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "data ingestion",
            Stage::Validation => "data validation",
            Stage::Transformation => "data transformation",
            Stage::ModelTrainer => "model trainer",
            Stage::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

/// Main error type for the pipeline
#[derive(Error, Debug)]
pub enum PhishnetError {
    /// A stage failed; wraps the originating error exactly once.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<PhishnetError>,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Schema error: {0}")]
    SchemaError(String),

    #[error("Statistical test error: {0}")]
    StatisticalError(String),

    #[error("Transformation error: {0}")]
    TransformationError(String),

    #[error("Invalid target value {value} at row {row}: expected one of -1, 0, 1")]
    InvalidTarget { row: usize, value: f64 },

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Model selection error: {0}")]
    SelectionError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Validation rejected: {0}")]
    ValidationRejected(String),
}

impl PhishnetError {
    /// Wrap an error as a failure of `stage`. Already-wrapped errors pass through.
    pub fn in_stage(self, stage: Stage) -> Self {
        match self {
            err @ PhishnetError::Stage { .. } => err,
            other => PhishnetError::Stage {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Stage the error was raised in, if it has been wrapped.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PhishnetError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, unwrapping the stage context.
    pub fn root(&self) -> &PhishnetError {
        match self {
            PhishnetError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension for attaching stage context to results.
pub trait StageContext<T> {
    fn in_stage(self, stage: Stage) -> Result<T>;
}

impl<T> StageContext<T> for Result<T> {
    fn in_stage(self, stage: Stage) -> Result<T> {
        self.map_err(|e| e.in_stage(stage))
    }
}

impl From<polars::error::PolarsError> for PhishnetError {
    fn from(err: polars::error::PolarsError) -> Self {
        PhishnetError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for PhishnetError {
    fn from(err: serde_json::Error) -> Self {
        PhishnetError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for PhishnetError {
    fn from(err: serde_yaml::Error) -> Self {
        PhishnetError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for PhishnetError {
    fn from(err: bincode::Error) -> Self {
        PhishnetError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PhishnetError {
    fn from(err: ndarray::ShapeError) -> Self {
        PhishnetError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
