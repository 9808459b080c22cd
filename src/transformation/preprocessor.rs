//! Fitted feature transformer

use crate::error::{PhishnetError, Result};
use crate::imputation::{Imputer, KNNImputer};
use crate::utils::columns_to_array2;
use ndarray::Array2;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// KNN imputation bound to an ordered list of feature names.
///
/// Persisted alongside the model so prediction reapplies exactly the fit
/// done on training data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    feature_names: Vec<String>,
    imputer: KNNImputer,
}

impl Preprocessor {
    pub fn new(feature_names: Vec<String>, imputer: KNNImputer) -> Self {
        Self { feature_names, imputer }
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.imputer.is_fitted()
    }

    fn check_width(&self, x: &Array2<f64>) -> Result<()> {
        if x.ncols() != self.feature_names.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("{} features", self.feature_names.len()),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(())
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        self.check_width(x)?;
        self.imputer.fit(x)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.check_width(x)?;
        self.imputer.transform(x)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    /// Select the known feature columns by name and impute them.
    /// Columns the transformer was not fitted on are ignored.
    pub fn transform_frame(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let x = columns_to_array2(df, &self.feature_names)?;
        self.transform(&x)
    }
}
