//! Gradient boosting for binary classification
//!
//! Shallow regression trees are fit to the log-loss gradient (label minus
//! predicted probability) on a row subsample each round, and their shrunken
//! outputs are summed into the log-odds.

use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};

use super::decision_tree::DecisionTree;
use crate::error::{PhishnetError, Result};

/// Gradient Boosting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingConfig {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Learning rate (shrinkage)
    pub learning_rate: f64,
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum samples per leaf
    pub min_samples_leaf: usize,
    /// Fraction of rows drawn for each tree
    pub subsample: f64,
    /// Random seed
    pub random_state: Option<u64>,
}

impl Default for GradientBoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_leaf: 1,
            subsample: 1.0,
            random_state: Some(42),
        }
    }
}

impl GradientBoostingConfig {
    fn validate(&self) -> Result<()> {
        let invalid = |name: &str, value: String, reason: &str| PhishnetError::InvalidParameter {
            name: name.to_string(),
            value,
            reason: reason.to_string(),
        };
        if self.n_estimators == 0 {
            return Err(invalid("n_estimators", "0".into(), "must be at least 1"));
        }
        if !(self.learning_rate > 0.0) {
            return Err(invalid("learning_rate", self.learning_rate.to_string(), "must be positive"));
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(invalid("subsample", self.subsample.to_string(), "must lie in (0, 1]"));
        }
        Ok(())
    }
}

#[inline]
fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Gradient Boosting Classifier for labels in {0, 1}
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    config: GradientBoostingConfig,
    trees: Vec<DecisionTree>,
    initial_log_odds: f64,
}

impl GradientBoostingClassifier {
    pub fn new(config: GradientBoostingConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            initial_log_odds: 0.0,
        }
    }

    pub fn config(&self) -> &GradientBoostingConfig {
        &self.config
    }

    /// Fit binary classification
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.config.validate()?;

        let n_samples = x.nrows();
        if n_samples != y.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 {
            return Err(PhishnetError::TrainingError("cannot boost on zero samples".to_string()));
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0.0 && v != 1.0) {
            return Err(PhishnetError::TrainingError(format!(
                "gradient boosting expects labels 0/1, found {}",
                bad
            )));
        }

        let p = y.mean().unwrap_or(0.5).clamp(1e-10, 1.0 - 1e-10);
        self.initial_log_odds = (p / (1.0 - p)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = match self.config.random_state {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };

        self.trees.clear();
        for _ in 0..self.config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(&yi, &lo)| yi - sigmoid(lo))
                .collect();

            let sample_indices = self.subsample_indices(n_samples, &mut rng);
            let x_sub = x.select(Axis(0), &sample_indices);
            let r_sub: Array1<f64> = sample_indices.iter().map(|&i| residuals[i]).collect();

            let mut tree = DecisionTree::new_regressor()
                .with_max_depth(self.config.max_depth)
                .with_min_samples_leaf(self.config.min_samples_leaf);
            tree.fit(&x_sub, &r_sub)?;

            // Every row moves, not just the sampled ones
            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);

            self.trees.push(tree);
        }

        Ok(())
    }

    /// Predict class labels
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 }))
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PhishnetError::ModelNotFitted);
        }

        let mut log_odds = Array1::from_elem(x.nrows(), self.initial_log_odds);
        for tree in &self.trees {
            let tree_pred = tree.predict(x)?;
            log_odds.scaled_add(self.config.learning_rate, &tree_pred);
        }

        Ok(log_odds.mapv(sigmoid))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn subsample_indices(&self, n: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
        if self.config.subsample >= 1.0 {
            return (0..n).collect();
        }
        let sample_size = ((n as f64) * self.config.subsample).ceil().max(1.0) as usize;
        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);
        indices.truncate(sample_size);
        indices.sort_unstable();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((40, 2), |(i, j)| i as f64 + j as f64 * 0.5);
        let y: Array1<f64> = (0..40).map(|i| if i >= 20 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_classifier_learns_threshold() {
        let (x, y) = separable();
        let mut gb = GradientBoostingClassifier::new(GradientBoostingConfig {
            n_estimators: 30,
            subsample: 0.8,
            ..Default::default()
        });
        gb.fit(&x, &y).unwrap();

        let preds = gb.predict(&x).unwrap();
        let correct = preds.iter().zip(y.iter()).filter(|(p, a)| p == a).count();
        assert!(correct >= 38, "correct = {}", correct);
        assert_eq!(gb.n_trees(), 30);

        let proba = gb.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|&p| (0.0..=1.0).contains(&p)));
    }

    #[test]
    fn test_seeded_fit_is_reproducible() {
        let (x, y) = separable();
        let config = GradientBoostingConfig {
            n_estimators: 10,
            subsample: 0.6,
            ..Default::default()
        };
        let mut a = GradientBoostingClassifier::new(config.clone());
        let mut b = GradientBoostingClassifier::new(config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_rejects_bad_config_and_labels() {
        let x = array![[0.0], [1.0]];
        let mut gb = GradientBoostingClassifier::new(GradientBoostingConfig {
            subsample: 0.0,
            ..Default::default()
        });
        assert!(matches!(gb.fit(&x, &array![0.0, 1.0]), Err(PhishnetError::InvalidParameter { .. })));

        let mut gb = GradientBoostingClassifier::new(GradientBoostingConfig::default());
        assert!(gb.fit(&x, &array![-1.0, 1.0]).is_err());
        assert!(matches!(
            GradientBoostingClassifier::new(GradientBoostingConfig::default()).predict(&x),
            Err(PhishnetError::ModelNotFitted)
        ));
    }
}
