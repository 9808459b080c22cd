//! Fitted estimator wrapper

use crate::error::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::DecisionTree;
use super::gradient_boosting::GradientBoostingClassifier;
use super::logistic_regression::LogisticRegression;
use super::random_forest::RandomForest;

/// A fitted classifier from any supported family
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TrainedModel {
    RandomForest(RandomForest),
    DecisionTree(DecisionTree),
    AdaBoost(AdaBoostClassifier),
    LogisticRegression(LogisticRegression),
    GradientBoosting(GradientBoostingClassifier),
}

impl TrainedModel {
    /// Predict class labels (0 or 1)
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            TrainedModel::RandomForest(m) => m.predict(x),
            TrainedModel::DecisionTree(m) => m.predict(x),
            TrainedModel::AdaBoost(m) => m.predict(x),
            TrainedModel::LogisticRegression(m) => m.predict(x),
            TrainedModel::GradientBoosting(m) => m.predict(x),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            TrainedModel::RandomForest(_) => "Random Forest",
            TrainedModel::DecisionTree(_) => "Decision Tree",
            TrainedModel::AdaBoost(_) => "AdaBoost",
            TrainedModel::LogisticRegression(_) => "Logistic Regression",
            TrainedModel::GradientBoosting(_) => "Gradient Boosting",
        }
    }
}
