//! Cross-validated grid search over one candidate family

use crate::error::{PhishnetError, Result};
use ndarray::{Array1, Array2, Axis};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::candidates::{EstimatorSpec, ModelCandidate};
use super::cross_validation::{CVResults, CVSplit, CVStrategy, CrossValidator};
use super::metrics::SelectionMetric;

/// Mean fold score for one grid point
#[derive(Debug, Clone, Serialize)]
pub struct GridPointResult {
    pub spec: EstimatorSpec,
    pub cv: CVResults,
}

/// Outcome of searching one candidate's grid
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub best_spec: EstimatorSpec,
    pub best_score: f64,
    /// All grid points in grid order
    pub points: Vec<GridPointResult>,
}

/// Exhaustive stratified k-fold search
#[derive(Debug, Clone)]
pub struct GridSearch {
    cv_folds: usize,
    metric: SelectionMetric,
    random_state: u64,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new(3)
    }
}

impl GridSearch {
    pub fn new(cv_folds: usize) -> Self {
        Self {
            cv_folds,
            metric: SelectionMetric::default(),
            random_state: 42,
        }
    }

    pub fn with_metric(mut self, metric: SelectionMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn score_fold(&self, spec: &EstimatorSpec, x: &Array2<f64>, y: &Array1<f64>, split: &CVSplit) -> Result<f64> {
        let x_train = x.select(Axis(0), &split.train_indices);
        let y_train = y.select(Axis(0), &split.train_indices);
        let x_val = x.select(Axis(0), &split.test_indices);
        let y_val = y.select(Axis(0), &split.test_indices);

        let model = spec.fit(&x_train, &y_train, self.random_state)?;
        let y_pred = model.predict(&x_val)?;
        self.metric.score(&y_val, &y_pred)
    }

    /// Score every grid point on every fold in parallel and return the point
    /// with the best mean score. Equal means keep the earlier point.
    pub fn search(&self, candidate: &ModelCandidate, x: &Array2<f64>, y: &Array1<f64>) -> Result<SearchResult> {
        if x.nrows() != y.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("{} targets", x.nrows()),
                actual: format!("{} targets", y.len()),
            });
        }

        let grid = candidate.grid()?;
        let splits = CrossValidator::new(CVStrategy::StratifiedKFold {
            n_splits: self.cv_folds,
            shuffle: false,
        })
        .split(x.nrows(), Some(y))?;
        let n_folds = splits.len();

        let jobs: Vec<(usize, usize)> = (0..grid.len())
            .flat_map(|p| (0..n_folds).map(move |f| (p, f)))
            .collect();

        let scores: Vec<f64> = jobs
            .par_iter()
            .map(|&(p, f)| self.score_fold(&grid[p], x, y, &splits[f]))
            .collect::<Result<Vec<_>>>()?;

        let points: Vec<GridPointResult> = grid
            .iter()
            .enumerate()
            .map(|(p, spec)| GridPointResult {
                spec: *spec,
                cv: CVResults::from_scores(scores[p * n_folds..(p + 1) * n_folds].to_vec()),
            })
            .collect();

        let mut best = 0;
        for (idx, point) in points.iter().enumerate() {
            if point.cv.mean_score > points[best].cv.mean_score {
                best = idx;
            }
        }

        debug!(
            candidate = candidate.name(),
            best = %points[best].spec,
            score = points[best].cv.mean_score,
            "grid search finished"
        );

        Ok(SearchResult {
            best_spec: points[best].spec,
            best_score: points[best].cv.mean_score,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::decision_tree::Criterion;

    fn dataset() -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((30, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 4) as f64 });
        let y: Array1<f64> = (0..30).map(|i| if i >= 15 { 1.0 } else { 0.0 }).collect();
        (x, y)
    }

    #[test]
    fn test_search_reports_every_point() {
        let (x, y) = dataset();
        let candidate = ModelCandidate::DecisionTree {
            criterion: vec![Criterion::Gini, Criterion::Entropy],
        };
        let result = GridSearch::new(3).search(&candidate, &x, &y).unwrap();

        assert_eq!(result.points.len(), 2);
        assert!(result.points.iter().all(|p| p.cv.n_folds == 3));
        assert!((0.0..=1.0).contains(&result.best_score));
        // Both criteria give the same scores here, so the first point wins
        assert_eq!(result.best_spec, EstimatorSpec::DecisionTree { criterion: Criterion::Gini });
    }

    #[test]
    fn test_search_is_deterministic() {
        let (x, y) = dataset();
        let candidate = ModelCandidate::RandomForest { n_estimators: vec![4, 8] };
        let search = GridSearch::new(3).with_metric(SelectionMetric::Accuracy);
        let a = search.search(&candidate, &x, &y).unwrap();
        let b = search.search(&candidate, &x, &y).unwrap();
        assert_eq!(a.best_spec, b.best_spec);
        assert_eq!(a.best_score, b.best_score);
    }

    #[test]
    fn test_search_propagates_fold_errors() {
        let (x, y) = dataset();
        let bad = ModelCandidate::AdaBoost {
            learning_rate: vec![-1.0],
            n_estimators: vec![8],
        };
        assert!(GridSearch::new(3).search(&bad, &x, &y).is_err());
    }
}
