//! Decision tree implementation

use crate::error::{PhishnetError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
        impurity: f64,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    #[serde(rename = "squared_error")]
    MSE,
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Criterion::Gini => "gini",
            Criterion::Entropy => "entropy",
            Criterion::MSE => "squared_error",
        };
        f.write_str(name)
    }
}

/// Running target statistics on one side of a candidate split
#[derive(Debug, Clone)]
enum SideStats {
    Classes(Vec<usize>),
    Moments { sum: f64, sq_sum: f64 },
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// CART decision tree for classification or regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Tree root
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per node; all features when `None`
    pub max_features: Option<usize>,
    /// Impurity criterion
    pub criterion: Criterion,
    /// Seed for per-node feature sampling
    pub random_state: Option<u64>,
    /// Number of features
    n_features: usize,
    /// Feature importances
    feature_importances: Option<Array1<f64>>,
    /// Is classification task
    is_classification: bool,
    /// Sorted class labels (for classification)
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_classifier()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            criterion: Criterion::Gini,
            random_state: None,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set number of features considered per node
    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features.max(1));
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

    /// Sorted class labels seen during fit
    pub fn classes(&self) -> &[f64] {
        &self.classes
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples != y.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if n_samples == 0 || n_features == 0 {
            return Err(PhishnetError::TrainingError(format!(
                "cannot fit a tree on {} samples with {} features",
                n_samples, n_features
            )));
        }

        let is_classifier_criterion = matches!(self.criterion, Criterion::Gini | Criterion::Entropy);
        if is_classifier_criterion != self.is_classification {
            return Err(PhishnetError::InvalidParameter {
                name: "criterion".to_string(),
                value: self.criterion.to_string(),
                reason: "does not match the tree's task".to_string(),
            });
        }

        self.n_features = n_features;

        // Labels are stored as indices into the sorted class list
        let targets: Vec<f64> = if self.is_classification {
            let mut classes: Vec<f64> = y.to_vec();
            classes.sort_by(f64::total_cmp);
            classes.dedup();
            let encoded = y
                .iter()
                .map(|v| classes.partition_point(|c| c < v) as f64)
                .collect();
            self.classes = classes;
            encoded
        } else {
            y.to_vec()
        };

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.unwrap_or(0));
        let mut importances = vec![0.0; n_features];
        let indices: Vec<usize> = (0..n_samples).collect();
        let root = self.build_tree(x, &targets, &indices, 0, &mut importances, &mut rng);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.root = Some(root);
        self.feature_importances = Some(Array1::from_vec(importances));

        Ok(self)
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.side_stats(targets, indices);
        let leaf_value = self.leaf_value(&stats, n_samples);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || self.is_pure(targets, indices);

        if should_stop {
            return TreeNode::Leaf { value: leaf_value, n_samples };
        }

        let features = self.draw_features(rng);
        let Some(best) = self.find_best_split(x, targets, indices, &features, &stats) else {
            return TreeNode::Leaf { value: leaf_value, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, best.feature_idx]] <= best.threshold);

        importances[best.feature_idx] += n_samples as f64 * best.gain;

        let left = Box::new(self.build_tree(x, targets, &left_indices, depth + 1, importances, rng));
        let right = Box::new(self.build_tree(x, targets, &right_indices, depth + 1, importances, rng));

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            left,
            right,
            n_samples,
            impurity: self.impurity(&stats, n_samples),
        }
    }

    /// Features examined at one node, in ascending order
    fn draw_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(k) if k < self.n_features => {
                let mut drawn = sample(rng, self.n_features, k).into_vec();
                drawn.sort_unstable();
                drawn
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn empty_stats(&self) -> SideStats {
        if self.is_classification {
            SideStats::Classes(vec![0; self.classes.len()])
        } else {
            SideStats::Moments { sum: 0.0, sq_sum: 0.0 }
        }
    }

    fn side_stats(&self, targets: &[f64], indices: &[usize]) -> SideStats {
        let mut stats = self.empty_stats();
        for &i in indices {
            add_target(&mut stats, targets[i], 1.0);
        }
        stats
    }

    fn impurity(&self, stats: &SideStats, count: usize) -> f64 {
        if count == 0 {
            return 0.0;
        }
        let n = count as f64;
        match (stats, self.criterion) {
            (SideStats::Classes(counts), Criterion::Gini) => {
                1.0 - counts.iter().map(|&c| (c as f64 / n).powi(2)).sum::<f64>()
            }
            (SideStats::Classes(counts), _) => -counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.log2()
                })
                .sum::<f64>(),
            (SideStats::Moments { sum, sq_sum }, _) => (sq_sum / n - (sum / n).powi(2)).max(0.0),
        }
    }

    /// Best split over `features` by sorting each feature once and sweeping
    /// the split point left to right.
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        targets: &[f64],
        indices: &[usize],
        features: &[usize],
        parent: &SideStats,
    ) -> Option<SplitCandidate> {
        let n = indices.len();
        let parent_impurity = self.impurity(parent, n);

        let per_feature: Vec<Option<SplitCandidate>> = features
            .par_iter()
            .map(|&feature_idx| {
                let mut pairs: Vec<(f64, f64)> = indices
                    .iter()
                    .map(|&i| (x[[i, feature_idx]], targets[i]))
                    .collect();
                pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

                let mut left = self.empty_stats();
                let mut right = parent.clone();
                let mut best: Option<SplitCandidate> = None;

                for k in 0..n - 1 {
                    let (value, target) = pairs[k];
                    add_target(&mut left, target, 1.0);
                    add_target(&mut right, target, -1.0);

                    let next = pairs[k + 1].0;
                    if value == next {
                        continue;
                    }
                    let n_left = k + 1;
                    let n_right = n - n_left;
                    if n_left < self.min_samples_leaf || n_right < self.min_samples_leaf {
                        continue;
                    }

                    let weighted = (n_left as f64 * self.impurity(&left, n_left)
                        + n_right as f64 * self.impurity(&right, n_right))
                        / n as f64;
                    let gain = parent_impurity - weighted;

                    if gain > best.map_or(1e-12, |b| b.gain) {
                        let mut threshold = value + (next - value) / 2.0;
                        if threshold >= next {
                            threshold = value;
                        }
                        best = Some(SplitCandidate { feature_idx, threshold, gain });
                    }
                }
                best
            })
            .collect();

        // Equal gains keep the lowest feature index
        per_feature.into_iter().flatten().fold(None, |acc, cand| match acc {
            Some(b) if b.gain >= cand.gain => Some(b),
            _ => Some(cand),
        })
    }

    fn is_pure(&self, targets: &[f64], indices: &[usize]) -> bool {
        match indices.split_first() {
            None => true,
            Some((&first, rest)) => rest.iter().all(|&i| (targets[i] - targets[first]).abs() < 1e-10),
        }
    }

    fn leaf_value(&self, stats: &SideStats, count: usize) -> f64 {
        match stats {
            SideStats::Classes(counts) => {
                // Majority class, ties to the lowest label
                let mut best = 0;
                for (idx, &c) in counts.iter().enumerate() {
                    if c > counts[best] {
                        best = idx;
                    }
                }
                self.classes.get(best).copied().unwrap_or(0.0)
            }
            SideStats::Moments { sum, .. } => {
                if count == 0 {
                    0.0
                } else {
                    sum / count as f64
                }
            }
        }
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(PhishnetError::ModelNotFitted)?;

        if x.ncols() != self.n_features {
            return Err(PhishnetError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        Ok(x.rows().into_iter().map(|row| Self::predict_sample(root, row)).collect())
    }

    fn predict_sample(node: &TreeNode, sample: ArrayView1<f64>) -> f64 {
        match node {
            TreeNode::Leaf { value, .. } => *value,
            TreeNode::Split { feature_idx, threshold, left, right, .. } => {
                if sample[*feature_idx] <= *threshold {
                    Self::predict_sample(left, sample)
                } else {
                    Self::predict_sample(right, sample)
                }
            }
        }
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    /// Get tree depth
    pub fn get_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        self.root.as_ref().map_or(0, depth)
    }

    /// Get number of leaves
    pub fn get_n_leaves(&self) -> usize {
        fn leaves(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => leaves(left) + leaves(right),
            }
        }
        self.root.as_ref().map_or(0, leaves)
    }
}

fn add_target(stats: &mut SideStats, target: f64, sign: f64) {
    match stats {
        SideStats::Classes(counts) => {
            let idx = target as usize;
            if sign > 0.0 {
                counts[idx] += 1;
            } else {
                counts[idx] -= 1;
            }
        }
        SideStats::Moments { sum, sq_sum } => {
            *sum += sign * target;
            *sq_sum += sign * target * target;
        }
    }
}
