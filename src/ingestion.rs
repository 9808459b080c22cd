//! Data ingestion stage
//!
//! Copies the raw CSV into the feature store and writes a seeded shuffled
//! train/test split.

use crate::artifact::DataIngestionArtifact;
use crate::config::DataIngestionConfig;
use crate::error::{PhishnetError, Result, Stage, StageContext};
use crate::utils::{DataLoader, DataSaver};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use tracing::{info, info_span};

/// Ingestion stage
pub struct DataIngestion {
    config: DataIngestionConfig,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }

    pub fn initiate_data_ingestion(&self, source_csv: impl AsRef<Path>) -> Result<DataIngestionArtifact> {
        let _span = info_span!("data_ingestion").entered();
        self.run(source_csv.as_ref()).in_stage(Stage::Ingestion)
    }

    fn run(&self, source_csv: &Path) -> Result<DataIngestionArtifact> {
        let df = DataLoader::new().load_csv(source_csv)?;
        DataSaver::save_csv(&df, &self.config.feature_store_file_path)?;

        let (train_df, test_df) = train_test_split(&df, self.config.train_test_split_ratio, self.config.random_state)?;
        DataSaver::save_csv(&train_df, &self.config.training_file_path)?;
        DataSaver::save_csv(&test_df, &self.config.testing_file_path)?;

        info!(
            source = %source_csv.display(),
            train_rows = train_df.height(),
            test_rows = test_df.height(),
            "performed train test split"
        );

        Ok(DataIngestionArtifact {
            train_file_path: self.config.training_file_path.clone(),
            test_file_path: self.config.testing_file_path.clone(),
        })
    }
}

/// Shuffle rows with `seed` and hold out `ceil(n * test_ratio)` of them.
pub fn train_test_split(df: &DataFrame, test_ratio: f64, seed: u64) -> Result<(DataFrame, DataFrame)> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(PhishnetError::InvalidParameter {
            name: "train_test_split_ratio".to_string(),
            value: test_ratio.to_string(),
            reason: "must lie in (0, 1)".to_string(),
        });
    }

    let n = df.height();
    let n_test = (n as f64 * test_ratio).ceil() as usize;
    if n < 2 || n_test >= n {
        return Err(PhishnetError::DataError(format!(
            "cannot split {} rows with test ratio {}",
            n, test_ratio
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;
    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::column_values;

    fn frame(n: usize) -> DataFrame {
        let ids: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let labels: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { -1.0 } else { 1.0 }).collect();
        df!("id" => ids, "Result" => labels).unwrap()
    }

    #[test]
    fn test_split_sizes_and_disjoint() {
        let df = frame(50);
        let (train, test) = train_test_split(&df, 0.2, 42).unwrap();
        assert_eq!(train.height(), 40);
        assert_eq!(test.height(), 10);

        let mut all: Vec<f64> = column_values(&train, "id").unwrap();
        all.extend(column_values(&test, "id").unwrap());
        all.sort_by(|a, b| a.total_cmp(b));
        let expected: Vec<f64> = (0..50).map(|i| i as f64).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_split_is_seeded() {
        let df = frame(30);
        let (_, a) = train_test_split(&df, 0.3, 7).unwrap();
        let (_, b) = train_test_split(&df, 0.3, 7).unwrap();
        assert!(a.equals(&b));
    }

    #[test]
    fn test_split_rejects_bad_ratio() {
        let df = frame(10);
        assert!(train_test_split(&df, 0.0, 42).is_err());
        assert!(train_test_split(&frame(1), 0.5, 42).is_err());
    }

    #[test]
    fn test_ingestion_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("raw.csv");
        DataSaver::save_csv(&frame(20), &source).unwrap();

        let config = DataIngestionConfig::new(dir.path().join("artifacts"));
        let artifact = DataIngestion::new(config.clone()).initiate_data_ingestion(&source).unwrap();

        assert!(config.feature_store_file_path.exists());
        let train = DataLoader::new().load_csv(&artifact.train_file_path).unwrap();
        let test = DataLoader::new().load_csv(&artifact.test_file_path).unwrap();
        assert_eq!(train.height() + test.height(), 20);
        assert_eq!(test.height(), 4);
    }

    #[test]
    fn test_missing_source_is_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = DataIngestionConfig::new(dir.path());
        let err = DataIngestion::new(config)
            .initiate_data_ingestion(dir.path().join("nope.csv"))
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Ingestion));
    }
}
