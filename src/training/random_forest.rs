//! Random Forest classifier

use crate::error::{PhishnetError, Result};
use super::decision_tree::{Criterion, DecisionTree};
use ndarray::{Array1, Array2, Axis};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Strategy for max features
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of n_features
    Sqrt,
    /// Log2 of n_features
    Log2,
    /// All features
    All,
}

/// Random Forest model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    /// Individual trees
    trees: Vec<DecisionTree>,
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Features considered per split (sqrt by default)
    pub max_features: MaxFeatures,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Random state
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Sorted class labels
    classes: Vec<f64>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(100)
    }
}

impl RandomForest {
    /// Create a new classifier forest
    pub fn new(n_estimators: usize) -> Self {
        Self {
            trees: Vec::new(),
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            classes: Vec::new(),
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set max features strategy
    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Set random state
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn compute_max_features(&self, n_features: usize) -> usize {
        match self.max_features {
            MaxFeatures::Sqrt => (n_features as f64).sqrt().floor() as usize,
            MaxFeatures::Log2 => (n_features as f64).log2().floor() as usize,
            MaxFeatures::All => n_features,
        }
        .clamp(1, n_features.max(1))
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if self.n_estimators == 0 {
            return Err(PhishnetError::InvalidParameter {
                name: "n_estimators".to_string(),
                value: "0".to_string(),
                reason: "a forest needs at least one tree".to_string(),
            });
        }
        if n_samples == 0 {
            return Err(PhishnetError::TrainingError("cannot fit a forest on zero samples".to_string()));
        }

        self.n_features = n_features;
        let max_features = self.compute_max_features(n_features);

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        self.classes = classes;

        let base_seed = self.random_state.unwrap_or(42);

        // Each tree owns its RNG so the result does not depend on thread scheduling
        let trees: Vec<DecisionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<DecisionTree> {
                let seed = base_seed.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if self.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let x_boot = x.select(Axis(0), &sample_indices);
                let y_boot: Array1<f64> = sample_indices.iter().map(|&i| y[i]).collect();

                let mut tree = DecisionTree::new_classifier()
                    .with_criterion(self.criterion)
                    .with_min_samples_split(self.min_samples_split)
                    .with_max_features(max_features)
                    .with_random_state(rng.gen());
                if let Some(d) = self.max_depth {
                    tree = tree.with_max_depth(d);
                }

                tree.fit(&x_boot, &y_boot)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;

        Ok(self)
    }

    /// Make predictions by majority vote; ties go to the lowest class label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(PhishnetError::ModelNotFitted);
        }

        let votes = self.vote_counts(x)?;
        Ok(votes
            .rows()
            .into_iter()
            .map(|row| {
                let mut best = 0;
                for (idx, &count) in row.iter().enumerate() {
                    if count > row[best] {
                        best = idx;
                    }
                }
                self.classes[best]
            })
            .collect())
    }

    /// Fraction of trees voting for each class, columns in class order
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if self.trees.is_empty() {
            return Err(PhishnetError::ModelNotFitted);
        }
        Ok(self.vote_counts(x)? / self.trees.len() as f64)
    }

    fn vote_counts(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let all_predictions: Vec<Array1<f64>> = self
            .trees
            .par_iter()
            .map(|tree| tree.predict(x))
            .collect::<Result<Vec<_>>>()?;

        let mut votes = Array2::zeros((x.nrows(), self.classes.len()));
        for preds in &all_predictions {
            for (i, &label) in preds.iter().enumerate() {
                let class_idx = self.classes.partition_point(|&c| c < label);
                if class_idx < self.classes.len() {
                    votes[[i, class_idx]] += 1.0;
                }
            }
        }
        Ok(votes)
    }

    /// Sorted class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Get number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_classifier() {
        let x = array![
            [0.0, 0.0],
            [0.1, 0.1],
            [0.2, 0.2],
            [1.0, 1.0],
            [1.1, 1.1],
            [1.2, 1.2],
        ];
        let y = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let predictions = rf.predict(&x).unwrap();

        let accuracy = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, a)| (*p - *a).abs() < 0.5)
            .count() as f64
            / y.len() as f64;

        assert!(accuracy >= 0.8, "Accuracy too low: {}", accuracy);
        assert_eq!(rf.n_trees(), 10);
    }

    #[test]
    fn test_same_seed_same_forest() {
        let x = Array2::from_shape_fn((30, 4), |(i, j)| ((i * 5 + j * 7) % 13) as f64);
        let y: Array1<f64> = (0..30).map(|i| (i % 2) as f64).collect();

        let predict = || {
            let mut rf = RandomForest::new(8).with_random_state(3);
            rf.fit(&x, &y).unwrap();
            rf.predict(&x).unwrap()
        };
        assert_eq!(predict(), predict());
    }

    #[test]
    fn test_predict_proba() {
        let x = array![[0.0, 0.0], [1.0, 1.0]];
        let y = array![0.0, 1.0];

        let mut rf = RandomForest::new(10).with_random_state(42);
        rf.fit(&x, &y).unwrap();

        let proba = rf.predict_proba(&x).unwrap();
        assert_eq!(proba.dim(), (2, 2));

        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_not_fitted_and_zero_trees() {
        let rf = RandomForest::new(5);
        assert!(matches!(rf.predict(&array![[1.0]]), Err(PhishnetError::ModelNotFitted)));

        let mut rf = RandomForest::new(0);
        assert!(rf.fit(&array![[1.0]], &array![1.0]).is_err());
    }
}
