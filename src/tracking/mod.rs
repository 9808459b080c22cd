//! Experiment tracking
//!
//! The trainer reports each evaluated model as a run: a name, the winning
//! hyperparameters, classification metrics and where the model was written.

mod storage;

pub use storage::LocalTracker;

use crate::artifact::ClassificationMetricArtifact;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One tracked run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRun {
    pub run_id: String,
    pub run_name: String,
    pub created_at: DateTime<Utc>,
    pub params: serde_json::Value,
    pub metrics: ClassificationMetricArtifact,
    pub model_path: PathBuf,
}

impl TrackedRun {
    pub fn new(
        run_name: impl Into<String>,
        params: serde_json::Value,
        metrics: ClassificationMetricArtifact,
        model_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            run_name: run_name.into(),
            created_at: Utc::now(),
            params,
            metrics,
            model_path: model_path.into(),
        }
    }
}

/// Sink for tracked runs
pub trait ExperimentTracker: Send + Sync {
    fn log_run(&self, run: &TrackedRun) -> Result<()>;
}

/// Tracker that drops everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracker;

impl ExperimentTracker for NoopTracker {
    fn log_run(&self, _run: &TrackedRun) -> Result<()> {
        Ok(())
    }
}
