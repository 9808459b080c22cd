//! Candidate menu: estimator families with typed hyperparameter grids

use crate::error::{PhishnetError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::adaboost::AdaBoostClassifier;
use super::decision_tree::{Criterion, DecisionTree};
use super::estimator::TrainedModel;
use super::gradient_boosting::{GradientBoostingClassifier, GradientBoostingConfig};
use super::logistic_regression::LogisticRegression;
use super::random_forest::RandomForest;

const N_ESTIMATORS: [usize; 6] = [8, 16, 32, 64, 128, 256];
const LEARNING_RATES: [f64; 4] = [0.1, 0.01, 0.05, 0.001];
const SUBSAMPLES: [f64; 6] = [0.6, 0.7, 0.75, 0.8, 0.85, 0.9];

/// One concrete hyperparameter assignment for one family
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum EstimatorSpec {
    RandomForest { n_estimators: usize },
    DecisionTree { criterion: Criterion },
    AdaBoost { learning_rate: f64, n_estimators: usize },
    LogisticRegression,
    GradientBoosting { learning_rate: f64, subsample: f64, n_estimators: usize },
}

impl EstimatorSpec {
    /// Fit a fresh estimator with these parameters
    pub fn fit(&self, x: &Array2<f64>, y: &Array1<f64>, random_state: u64) -> Result<TrainedModel> {
        let model = match *self {
            EstimatorSpec::RandomForest { n_estimators } => {
                let mut rf = RandomForest::new(n_estimators).with_random_state(random_state);
                rf.fit(x, y)?;
                TrainedModel::RandomForest(rf)
            }
            EstimatorSpec::DecisionTree { criterion } => {
                let mut tree = DecisionTree::new_classifier()
                    .with_criterion(criterion)
                    .with_random_state(random_state);
                tree.fit(x, y)?;
                TrainedModel::DecisionTree(tree)
            }
            EstimatorSpec::AdaBoost { learning_rate, n_estimators } => {
                let mut ada = AdaBoostClassifier::new(n_estimators, learning_rate);
                ada.fit(x, y)?;
                TrainedModel::AdaBoost(ada)
            }
            EstimatorSpec::LogisticRegression => {
                let mut lr = LogisticRegression::new();
                lr.fit(x, y)?;
                TrainedModel::LogisticRegression(lr)
            }
            EstimatorSpec::GradientBoosting { learning_rate, subsample, n_estimators } => {
                let mut gb = GradientBoostingClassifier::new(GradientBoostingConfig {
                    n_estimators,
                    learning_rate,
                    subsample,
                    random_state: Some(random_state),
                    ..Default::default()
                });
                gb.fit(x, y)?;
                TrainedModel::GradientBoosting(gb)
            }
        };
        Ok(model)
    }

    /// Parameters as a JSON object, for tracking
    pub fn params(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        if let Some(obj) = value.as_object_mut() {
            obj.remove("model");
        }
        value
    }
}

impl fmt::Display for EstimatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimatorSpec::RandomForest { n_estimators } => {
                write!(f, "RandomForest(n_estimators={})", n_estimators)
            }
            EstimatorSpec::DecisionTree { criterion } => write!(f, "DecisionTree(criterion={})", criterion),
            EstimatorSpec::AdaBoost { learning_rate, n_estimators } => write!(
                f,
                "AdaBoost(learning_rate={}, n_estimators={})",
                learning_rate, n_estimators
            ),
            EstimatorSpec::LogisticRegression => f.write_str("LogisticRegression()"),
            EstimatorSpec::GradientBoosting { learning_rate, subsample, n_estimators } => write!(
                f,
                "GradientBoosting(learning_rate={}, n_estimators={}, subsample={})",
                learning_rate, n_estimators, subsample
            ),
        }
    }
}

/// An estimator family and the grid searched for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelCandidate {
    RandomForest {
        n_estimators: Vec<usize>,
    },
    DecisionTree {
        criterion: Vec<Criterion>,
    },
    AdaBoost {
        learning_rate: Vec<f64>,
        n_estimators: Vec<usize>,
    },
    LogisticRegression,
    GradientBoosting {
        learning_rate: Vec<f64>,
        subsample: Vec<f64>,
        n_estimators: Vec<usize>,
    },
}

fn require_values<T>(family: &str, param: &str, values: &[T]) -> Result<()> {
    if values.is_empty() {
        return Err(PhishnetError::SelectionError(format!(
            "{} grid has no values for {}",
            family, param
        )));
    }
    Ok(())
}

impl ModelCandidate {
    pub fn name(&self) -> &'static str {
        match self {
            ModelCandidate::RandomForest { .. } => "Random Forest",
            ModelCandidate::DecisionTree { .. } => "Decision Tree",
            ModelCandidate::AdaBoost { .. } => "AdaBoost",
            ModelCandidate::LogisticRegression => "Logistic Regression",
            ModelCandidate::GradientBoosting { .. } => "Gradient Boosting",
        }
    }

    /// Every grid point. Parameters vary in name order, the last name fastest.
    pub fn grid(&self) -> Result<Vec<EstimatorSpec>> {
        let name = self.name();
        let points = match self {
            ModelCandidate::RandomForest { n_estimators } => {
                require_values(name, "n_estimators", n_estimators)?;
                n_estimators
                    .iter()
                    .map(|&n| EstimatorSpec::RandomForest { n_estimators: n })
                    .collect()
            }
            ModelCandidate::DecisionTree { criterion } => {
                require_values(name, "criterion", criterion)?;
                if let Some(c) = criterion.iter().find(|c| **c == Criterion::MSE) {
                    return Err(PhishnetError::SelectionError(format!(
                        "{} does not support criterion {}",
                        name, c
                    )));
                }
                criterion
                    .iter()
                    .map(|&c| EstimatorSpec::DecisionTree { criterion: c })
                    .collect()
            }
            ModelCandidate::AdaBoost { learning_rate, n_estimators } => {
                require_values(name, "learning_rate", learning_rate)?;
                require_values(name, "n_estimators", n_estimators)?;
                learning_rate
                    .iter()
                    .flat_map(|&lr| {
                        n_estimators.iter().map(move |&n| EstimatorSpec::AdaBoost {
                            learning_rate: lr,
                            n_estimators: n,
                        })
                    })
                    .collect()
            }
            ModelCandidate::LogisticRegression => vec![EstimatorSpec::LogisticRegression],
            ModelCandidate::GradientBoosting { learning_rate, subsample, n_estimators } => {
                require_values(name, "learning_rate", learning_rate)?;
                require_values(name, "subsample", subsample)?;
                require_values(name, "n_estimators", n_estimators)?;
                let mut points = Vec::with_capacity(learning_rate.len() * subsample.len() * n_estimators.len());
                for &lr in learning_rate {
                    for &n in n_estimators {
                        for &s in subsample {
                            points.push(EstimatorSpec::GradientBoosting {
                                learning_rate: lr,
                                subsample: s,
                                n_estimators: n,
                            });
                        }
                    }
                }
                points
            }
        };
        Ok(points)
    }
}

/// Five families with the grids used for phishing detection
pub fn default_menu() -> Vec<ModelCandidate> {
    vec![
        ModelCandidate::RandomForest {
            n_estimators: N_ESTIMATORS.to_vec(),
        },
        ModelCandidate::DecisionTree {
            criterion: vec![Criterion::Gini, Criterion::Entropy],
        },
        ModelCandidate::AdaBoost {
            learning_rate: LEARNING_RATES.to_vec(),
            n_estimators: N_ESTIMATORS.to_vec(),
        },
        ModelCandidate::LogisticRegression,
        ModelCandidate::GradientBoosting {
            learning_rate: LEARNING_RATES.to_vec(),
            subsample: SUBSAMPLES.to_vec(),
            n_estimators: N_ESTIMATORS.to_vec(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_default_menu_order_and_sizes() {
        let menu = default_menu();
        let names: Vec<&str> = menu.iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec!["Random Forest", "Decision Tree", "AdaBoost", "Logistic Regression", "Gradient Boosting"]
        );

        let sizes: Vec<usize> = menu.iter().map(|c| c.grid().unwrap().len()).collect();
        assert_eq!(sizes, vec![6, 2, 24, 1, 144]);
    }

    #[test]
    fn test_grid_order() {
        let candidate = ModelCandidate::GradientBoosting {
            learning_rate: vec![0.1, 0.01],
            subsample: vec![0.6, 0.9],
            n_estimators: vec![8],
        };
        let grid = candidate.grid().unwrap();
        assert_eq!(
            grid[1],
            EstimatorSpec::GradientBoosting { learning_rate: 0.1, subsample: 0.9, n_estimators: 8 }
        );
        assert_eq!(
            grid[2],
            EstimatorSpec::GradientBoosting { learning_rate: 0.01, subsample: 0.6, n_estimators: 8 }
        );
    }

    #[test]
    fn test_empty_grid_rejected() {
        let candidate = ModelCandidate::RandomForest { n_estimators: vec![] };
        assert!(matches!(candidate.grid(), Err(PhishnetError::SelectionError(_))));

        let candidate = ModelCandidate::DecisionTree { criterion: vec![Criterion::MSE] };
        assert!(candidate.grid().is_err());
    }

    #[test]
    fn test_menu_yaml() {
        let yaml = "\
- model: random_forest
  n_estimators: [8, 16]
- model: decision_tree
  criterion: [gini, entropy]
- model: logistic_regression
";
        let menu: Vec<ModelCandidate> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(menu.len(), 3);
        assert_eq!(menu[2], ModelCandidate::LogisticRegression);
        assert_eq!(menu[1].grid().unwrap()[1], EstimatorSpec::DecisionTree { criterion: Criterion::Entropy });
    }

    #[test]
    fn test_spec_fit_and_params() {
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        let spec = EstimatorSpec::AdaBoost { learning_rate: 0.1, n_estimators: 8 };
        let model = spec.fit(&x, &y, 42).unwrap();
        assert_eq!(model.family(), "AdaBoost");
        assert_eq!(model.predict(&x).unwrap(), y);

        let params = spec.params();
        assert_eq!(params["n_estimators"], 8);
        assert!(params.get("model").is_none());
        assert_eq!(spec.to_string(), "AdaBoost(learning_rate=0.1, n_estimators=8)");
    }
}
