//! Data transformation stage
//!
//! Fits a KNN imputer on the validated training features, applies it to both
//! splits and persists numeric matrices with the normalized target as the last
//! column.

mod preprocessor;

pub use preprocessor::Preprocessor;

use crate::artifact::{DataTransformationArtifact, DataValidationArtifact};
use crate::config::DataTransformationConfig;
use crate::error::{PhishnetError, Result, Stage, StageContext};
use crate::imputation::KNNImputer;
use crate::utils::{save_array, save_object, split_features_target, DataLoader};
use ndarray::{concatenate, Array1, Array2, Axis};
use tracing::{info, info_span};

/// Map raw labels onto `{0, 1}`: `-1 -> 0`, `0 -> 0`, `1 -> 1`.
///
/// Anything else, missing values included, is an [`PhishnetError::InvalidTarget`].
pub fn normalize_target(target: &Array1<f64>) -> Result<Array1<f64>> {
    target
        .iter()
        .enumerate()
        .map(|(row, &value)| {
            if value == -1.0 || value == 0.0 {
                Ok(0.0)
            } else if value == 1.0 {
                Ok(1.0)
            } else {
                Err(PhishnetError::InvalidTarget { row, value })
            }
        })
        .collect()
}

/// Transformation stage
pub struct DataTransformation {
    validation_artifact: DataValidationArtifact,
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(validation_artifact: DataValidationArtifact, config: DataTransformationConfig) -> Self {
        Self {
            validation_artifact,
            config,
        }
    }

    pub fn initiate_data_transformation(&self) -> Result<DataTransformationArtifact> {
        let _span = info_span!("data_transformation").entered();
        self.run().in_stage(Stage::Transformation)
    }

    fn run(&self) -> Result<DataTransformationArtifact> {
        info!("entered initiate_data_transformation");
        // Rejected splits live on the invalid paths only
        if !self.validation_artifact.validation_status && self.validation_artifact.invalid_train_file_path.is_some() {
            return Err(PhishnetError::ValidationRejected(format!(
                "validated splits were rejected, see {}",
                self.validation_artifact.drift_report_file_path.display()
            )));
        }
        let loader = DataLoader::new();
        let train_df = loader.load_csv(&self.validation_artifact.valid_train_file_path)?;
        let test_df = loader.load_csv(&self.validation_artifact.valid_test_file_path)?;

        let target = self.config.target_column.as_str();
        let (feature_names, x_train, y_train_raw) = split_features_target(&train_df, target)?;
        let (test_names, x_test, y_test_raw) = split_features_target(&test_df, target)?;
        if test_names != feature_names {
            return Err(PhishnetError::SchemaError(format!(
                "test features {:?} differ from training features {:?}",
                test_names, feature_names
            )));
        }

        let y_train = normalize_target(&y_train_raw)?;
        let y_test = normalize_target(&y_test_raw)?;

        let imputer = KNNImputer::new(self.config.imputer.n_neighbors).with_weights(self.config.imputer.weights);
        let mut preprocessor = Preprocessor::new(feature_names, imputer);
        let train_features = preprocessor.fit_transform(&x_train)?;
        let test_features = preprocessor.transform(&x_test)?;

        let train_arr = append_target(&train_features, &y_train)?;
        let test_arr = append_target(&test_features, &y_test)?;

        save_array(&self.config.transformed_train_file_path, &train_arr)?;
        save_array(&self.config.transformed_test_file_path, &test_arr)?;
        save_object(&self.config.transformed_object_file_path, &preprocessor)?;

        info!(
            train_rows = train_arr.nrows(),
            test_rows = test_arr.nrows(),
            n_features = preprocessor.n_features(),
            "data transformation finished"
        );

        Ok(DataTransformationArtifact {
            transformed_object_file_path: self.config.transformed_object_file_path.clone(),
            transformed_train_file_path: self.config.transformed_train_file_path.clone(),
            transformed_test_file_path: self.config.transformed_test_file_path.clone(),
        })
    }
}

fn append_target(features: &Array2<f64>, target: &Array1<f64>) -> Result<Array2<f64>> {
    let column = target.view().insert_axis(Axis(1));
    Ok(concatenate(Axis(1), &[features.view(), column])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalize_target_maps_labels() {
        let y = array![-1.0, 1.0, -1.0, 1.0];
        assert_eq!(normalize_target(&y).unwrap(), array![0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_normalize_target_is_idempotent() {
        let y = array![0.0, 1.0, 1.0, 0.0];
        let once = normalize_target(&y).unwrap();
        assert_eq!(once, y);
        assert_eq!(normalize_target(&once).unwrap(), once);
    }

    #[test]
    fn test_normalize_target_rejects_other_values() {
        let y = array![1.0, 2.0];
        assert!(matches!(
            normalize_target(&y),
            Err(PhishnetError::InvalidTarget { row: 1, .. })
        ));
        assert!(normalize_target(&array![f64::NAN]).is_err());
    }

    #[test]
    fn test_append_target_is_last_column() {
        let x = array![[1.0, 2.0], [3.0, 4.0]];
        let y = array![0.0, 1.0];
        let out = append_target(&x, &y).unwrap();
        assert_eq!(out, array![[1.0, 2.0, 0.0], [3.0, 4.0, 1.0]]);
    }
}
