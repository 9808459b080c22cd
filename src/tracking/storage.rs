//! Local file system storage for tracked runs

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::{ExperimentTracker, TrackedRun};
use crate::error::Result;

/// Appends runs as JSON lines to `<base_dir>/runs.jsonl`
#[derive(Debug, Clone)]
pub struct LocalTracker {
    base_dir: PathBuf,
}

impl LocalTracker {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn runs_file(&self) -> PathBuf {
        self.base_dir.join("runs.jsonl")
    }

    /// All runs logged so far, oldest first
    pub fn load_runs(&self) -> Result<Vec<TrackedRun>> {
        let path = self.runs_file();
        if !path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&path)?);
        let mut runs = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            runs.push(serde_json::from_str(&line)?);
        }
        Ok(runs)
    }
}

impl ExperimentTracker for LocalTracker {
    fn log_run(&self, run: &TrackedRun) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.runs_file())?;
        let line = serde_json::to_string(run)?;
        writeln!(file, "{}", line)?;

        tracing::debug!(run_id = %run.run_id, run_name = %run.run_name, "tracked run");
        Ok(())
    }
}
