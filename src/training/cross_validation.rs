//! Cross-validation splitters

use crate::error::{PhishnetError, Result};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&Array1<f64>>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => self.k_fold_split(n_samples, *n_splits, *shuffle),
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    PhishnetError::SelectionError("StratifiedKFold requires target array".to_string())
                })?;
                if y.len() != n_samples {
                    return Err(PhishnetError::ShapeError {
                        expected: format!("{} targets", n_samples),
                        actual: format!("{} targets", y.len()),
                    });
                }
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn check_n_splits(n_samples: usize, n_splits: usize) -> Result<()> {
        if n_splits < 2 {
            return Err(PhishnetError::InvalidParameter {
                name: "n_splits".to_string(),
                value: n_splits.to_string(),
                reason: "must be at least 2".to_string(),
            });
        }
        if n_samples < n_splits {
            return Err(PhishnetError::SelectionError(format!(
                "n_samples ({}) must be >= n_splits ({})",
                n_samples, n_splits
            )));
        }
        Ok(())
    }

    /// Build splits from a fold assignment per sample
    fn splits_from_assignment(test_folds: &[usize], n_splits: usize) -> Vec<CVSplit> {
        (0..n_splits)
            .map(|fold_idx| {
                let (test_indices, train_indices): (Vec<usize>, Vec<usize>) =
                    (0..test_folds.len()).partition(|&i| test_folds[i] == fold_idx);
                CVSplit {
                    train_indices,
                    test_indices,
                    fold_idx,
                }
            })
            .collect()
    }

    fn k_fold_split(&self, n_samples: usize, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        Self::check_n_splits(n_samples, n_splits)?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        // The first n_samples % n_splits folds get one extra sample
        let base = n_samples / n_splits;
        let remainder = n_samples % n_splits;
        let mut test_folds = vec![0usize; n_samples];
        let mut current = 0;
        for fold_idx in 0..n_splits {
            let fold_size = if fold_idx < remainder { base + 1 } else { base };
            for &idx in &indices[current..current + fold_size] {
                test_folds[idx] = fold_idx;
            }
            current += fold_size;
        }

        Ok(Self::splits_from_assignment(&test_folds, n_splits))
    }

    /// Stratified folds: the samples sorted by class are dealt round-robin to
    /// decide how many of each class every fold receives, then each class's
    /// samples fill its folds in order of appearance.
    fn stratified_k_fold_split(&self, y: &Array1<f64>, n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        let n_samples = y.len();
        Self::check_n_splits(n_samples, n_splits)?;

        let mut classes: Vec<f64> = y.to_vec();
        classes.sort_by(f64::total_cmp);
        classes.dedup();
        let n_classes = classes.len();
        let encoded: Vec<usize> = y.iter().map(|v| classes.partition_point(|c| c < v)).collect();

        let mut class_counts = vec![0usize; n_classes];
        for &c in &encoded {
            class_counts[c] += 1;
        }
        let largest = class_counts.iter().copied().max().unwrap_or(0);
        if n_splits > largest {
            return Err(PhishnetError::SelectionError(format!(
                "n_splits ({}) cannot exceed the number of members in each class (largest class has {})",
                n_splits, largest
            )));
        }
        let smallest = class_counts.iter().copied().min().unwrap_or(0);
        if smallest < n_splits {
            warn!(smallest, n_splits, "least populated class has fewer members than n_splits");
        }

        let mut sorted_labels = encoded.clone();
        sorted_labels.sort_unstable();
        let mut allocation = vec![vec![0usize; n_classes]; n_splits];
        for (pos, &label) in sorted_labels.iter().enumerate() {
            allocation[pos % n_splits][label] += 1;
        }

        let mut rng = self.rng();
        let mut test_folds = vec![0usize; n_samples];
        for class_idx in 0..n_classes {
            let mut folds_for_class: Vec<usize> = (0..n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][class_idx]))
                .collect();
            if shuffle {
                folds_for_class.shuffle(&mut rng);
            }
            let members = encoded.iter().enumerate().filter(|(_, &c)| c == class_idx).map(|(i, _)| i);
            for (sample_idx, fold) in members.zip(folds_for_class) {
                test_folds[sample_idx] = fold;
            }
        }

        Ok(Self::splits_from_assignment(&test_folds, n_splits))
    }
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        let mean_score = scores.iter().sum::<f64>() / n_folds.max(1) as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds.max(1) as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_k_fold() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 5, shuffle: false });
        let splits = cv.split(100, None).unwrap();

        assert_eq!(splits.len(), 5);

        for split in &splits {
            assert_eq!(split.test_indices.len(), 20);
            assert_eq!(split.train_indices.len(), 80);
        }

        // All indices should be covered exactly once in test sets
        let mut all_test: Vec<usize> = splits.iter().flat_map(|s| s.test_indices.clone()).collect();
        all_test.sort();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_k_fold_uneven_and_shuffled() {
        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 3, shuffle: true }).with_random_state(1);
        let splits = cv.split(10, None).unwrap();
        let sizes: Vec<usize> = splits.iter().map(|s| s.test_indices.len()).collect();
        assert_eq!(sizes, vec![4, 3, 3]);

        let again = cv.split(10, None).unwrap();
        assert_eq!(splits[0].test_indices, again[0].test_indices);
    }

    #[test]
    fn test_stratified_k_fold() {
        let y = Array1::from_vec(vec![
            0.0, 0.0, 0.0, 0.0, 0.0, // 5 samples of class 0
            1.0, 1.0, 1.0, 1.0, 1.0, // 5 samples of class 1
        ]);

        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 5, shuffle: false });
        let splits = cv.split(10, Some(&y)).unwrap();

        assert_eq!(splits.len(), 5);

        // One sample of each class per fold, in order of appearance
        for (fold, split) in splits.iter().enumerate() {
            assert_eq!(split.test_indices, vec![fold, fold + 5]);
        }
    }

    #[test]
    fn test_stratified_keeps_class_ratio() {
        let y: Array1<f64> = (0..30).map(|i| if i % 3 == 0 { 1.0 } else { 0.0 }).collect();
        let cv = CrossValidator::new(CVStrategy::default());
        let splits = cv.split(30, Some(&y)).unwrap();

        let mut total_positives = 0;
        for split in &splits {
            let positives = split.test_indices.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(split.test_indices.len(), 10);
            assert!(positives == 3 || positives == 4);
            total_positives += positives;
        }
        assert_eq!(total_positives, 10);
    }

    #[test]
    fn test_stratified_errors() {
        let cv = CrossValidator::new(CVStrategy::StratifiedKFold { n_splits: 3, shuffle: false });
        let y = Array1::from_vec(vec![0.0, 1.0, 0.0, 1.0]);
        assert!(cv.split(4, Some(&y)).is_err());
        assert!(cv.split(4, None).is_err());

        let cv = CrossValidator::new(CVStrategy::KFold { n_splits: 1, shuffle: false });
        assert!(matches!(cv.split(4, None), Err(PhishnetError::InvalidParameter { .. })));
    }
}
