//! Deployable model: fitted preprocessor plus the selected classifier

use crate::error::Result;
use crate::transformation::Preprocessor;
use crate::utils::{load_object, save_object};
use ndarray::{Array1, Array2};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::estimator::TrainedModel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkModel {
    preprocessor: Preprocessor,
    model: TrainedModel,
}

impl NetworkModel {
    pub fn new(preprocessor: Preprocessor, model: TrainedModel) -> Self {
        Self { preprocessor, model }
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        save_object(path, self)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_object(path)
    }

    /// Impute raw feature rows and predict one label per row
    pub fn predict_array(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let features = self.preprocessor.transform(x)?;
        self.model.predict(&features)
    }

    /// Predict from a frame, picking the fitted feature columns by name
    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let features = self.preprocessor.transform_frame(df)?;
        self.model.predict(&features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imputation::KNNImputer;
    use crate::training::candidates::EstimatorSpec;
    use crate::training::decision_tree::Criterion;
    use ndarray::array;
    use polars::df;

    fn model() -> NetworkModel {
        let x = array![[0.0, 5.0], [1.0, 5.0], [2.0, 6.0], [3.0, 6.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let mut pre = Preprocessor::new(vec!["a".to_string(), "b".to_string()], KNNImputer::new(1));
        let xt = pre.fit_transform(&x).unwrap();
        let clf = EstimatorSpec::DecisionTree { criterion: Criterion::Gini }
            .fit(&xt, &y, 42)
            .unwrap();
        NetworkModel::new(pre, clf)
    }

    #[test]
    fn test_predict_frame_ignores_extra_columns() {
        let m = model();
        let df = df!(
            "Result" => [1.0, -1.0],
            "a" => [3.0, 0.0],
            "b" => [6.0, 5.0]
        )
        .unwrap();
        assert_eq!(m.predict(&df).unwrap(), array![1.0, 0.0]);
    }

    #[test]
    fn test_save_load_reproduces_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let m = model();
        m.save(&path).unwrap();

        let loaded = NetworkModel::load(&path).unwrap();
        let x = array![[f64::NAN, 6.0], [0.5, f64::NAN], [2.5, 5.5]];
        assert_eq!(loaded.predict_array(&x).unwrap(), m.predict_array(&x).unwrap());
        assert_eq!(loaded.model().family(), "Decision Tree");
    }
}
