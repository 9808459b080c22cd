//! AdaBoost (Adaptive Boosting) implementation
//!
//! AdaBoost builds an ensemble of weak learners (decision stumps), weighting
//! misclassified samples more heavily in subsequent rounds.

use crate::error::{PhishnetError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// A single decision stump: splits on one feature at one threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stump {
    feature_index: usize,
    threshold: f64,
    /// Class index when feature <= threshold
    left_class: usize,
    /// Class index when feature > threshold
    right_class: usize,
}

impl Stump {
    fn predict_sample(&self, sample: ArrayView1<f64>) -> usize {
        if sample[self.feature_index] <= self.threshold {
            self.left_class
        } else {
            self.right_class
        }
    }
}

/// Index of the largest value, ties to the lowest index
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (idx, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = idx;
        }
    }
    best
}

/// AdaBoost Classifier (SAMME variant, supports multi-class)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaBoostClassifier {
    pub n_estimators: usize,
    pub learning_rate: f64,
    stumps: Vec<Stump>,
    alphas: Vec<f64>,
    classes: Vec<f64>,
    pub is_fitted: bool,
}

impl Default for AdaBoostClassifier {
    fn default() -> Self {
        Self::new(50, 1.0)
    }
}

impl AdaBoostClassifier {
    pub fn new(n_estimators: usize, learning_rate: f64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            stumps: Vec::new(),
            alphas: Vec::new(),
            classes: Vec::new(),
            is_fitted: false,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Number of stumps kept after fitting (early stopping may keep fewer)
    pub fn n_stumps(&self) -> usize {
        self.stumps.len()
    }

    /// Lowest weighted-error stump. Each feature is sorted once and the split
    /// point swept across it while accumulating per-class weight on the left.
    fn fit_stump(x: &Array2<f64>, labels: &[usize], weights: &Array1<f64>, n_classes: usize) -> Stump {
        let mut total = vec![0.0f64; n_classes];
        for (&label, &w) in labels.iter().zip(weights.iter()) {
            total[label] += w;
        }
        let total_weight: f64 = total.iter().sum();

        // Constant stump: everything to the heaviest class
        let majority = argmax(&total);
        let mut best_stump = Stump {
            feature_index: 0,
            threshold: f64::INFINITY,
            left_class: majority,
            right_class: majority,
        };
        let mut best_error = total_weight - total[majority];

        for f in 0..x.ncols() {
            let col = x.column(f);
            let mut order: Vec<usize> = (0..x.nrows()).collect();
            order.sort_by(|&a, &b| col[a].total_cmp(&col[b]));

            let mut left = vec![0.0f64; n_classes];
            for k in 0..order.len().saturating_sub(1) {
                let i = order[k];
                left[labels[i]] += weights[i];

                let value = col[i];
                let next = col[order[k + 1]];
                if value == next {
                    continue;
                }

                let right: Vec<f64> = total.iter().zip(left.iter()).map(|(t, l)| t - l).collect();
                let left_class = argmax(&left);
                let right_class = argmax(&right);
                let error = total_weight - left[left_class] - right[right_class];

                if error < best_error - 1e-15 {
                    best_error = error;
                    let mut threshold = value + (next - value) / 2.0;
                    if threshold >= next {
                        threshold = value;
                    }
                    best_stump = Stump {
                        feature_index: f,
                        threshold,
                        left_class,
                        right_class,
                    };
                }
            }
        }
        best_stump
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
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
        if self.n_estimators == 0 || !(self.learning_rate > 0.0) {
            return Err(PhishnetError::InvalidParameter {
                name: "n_estimators/learning_rate".to_string(),
                value: format!("{}/{}", self.n_estimators, self.learning_rate),
                reason: "need at least one round and a positive learning rate".to_string(),
            });
        }

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let labels: Vec<usize> = y.iter().map(|v| classes.partition_point(|c| c < v)).collect();
        let n_classes = classes.len();
        self.classes = classes;

        let mut weights = Array1::from_elem(n_samples, 1.0 / n_samples as f64);
        self.stumps.clear();
        self.alphas.clear();

        for _round in 0..self.n_estimators {
            let stump = Self::fit_stump(x, &labels, &weights, n_classes);

            let incorrect: Vec<bool> = x
                .rows()
                .into_iter()
                .zip(labels.iter())
                .map(|(row, &label)| stump.predict_sample(row) != label)
                .collect();
            let error: f64 = incorrect
                .iter()
                .zip(weights.iter())
                .filter(|(wrong, _)| **wrong)
                .map(|(_, &w)| w)
                .sum::<f64>()
                / weights.sum();

            // A perfect stump decides alone
            if error <= 0.0 {
                self.stumps.push(stump);
                self.alphas.push(1.0);
                break;
            }

            // No better than chance: stop, keeping what we have
            if error >= 1.0 - 1.0 / n_classes.max(2) as f64 {
                if self.stumps.is_empty() {
                    self.stumps.push(stump);
                    self.alphas.push(1.0);
                }
                break;
            }

            let alpha = self.learning_rate
                * (((1.0 - error) / error).ln() + (n_classes as f64 - 1.0).max(1.0).ln());

            for (w, &wrong) in weights.iter_mut().zip(incorrect.iter()) {
                if wrong {
                    *w *= alpha.exp();
                }
            }
            let w_sum = weights.sum();
            if w_sum > 0.0 {
                weights /= w_sum;
            }

            self.stumps.push(stump);
            self.alphas.push(alpha);
        }

        self.is_fitted = true;
        Ok(self)
    }

    fn class_scores(&self, sample: ArrayView1<f64>) -> Vec<f64> {
        let mut scores = vec![0.0f64; self.classes.len()];
        for (stump, &alpha) in self.stumps.iter().zip(self.alphas.iter()) {
            scores[stump.predict_sample(sample)] += alpha;
        }
        scores
    }

    /// Weighted vote across stumps; ties go to the lowest class label
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted {
            return Err(PhishnetError::ModelNotFitted);
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| self.classes[argmax(&self.class_scores(row))])
            .collect())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(PhishnetError::ModelNotFitted);
        }

        let n_classes = self.classes.len();
        let mut proba = Array2::zeros((x.nrows(), n_classes));

        for (i, row) in x.rows().into_iter().enumerate() {
            let scores = self.class_scores(row);

            // Softmax normalization
            let max_score = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let exp_sum: f64 = scores.iter().map(|&s| (s - max_score).exp()).sum();
            for (j, &s) in scores.iter().enumerate() {
                proba[[i, j]] = (s - max_score).exp() / exp_sum;
            }
        }

        Ok(proba)
    }
}
