//! KNN-based imputation

use crate::error::{PhishnetError, Result};
use crate::imputation::{is_missing, Imputer};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Candidate donor ordered by (distance, row index)
#[derive(Debug, Clone, Copy)]
struct DistanceIdx(f64, usize);

impl PartialEq for DistanceIdx {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DistanceIdx {}

impl PartialOrd for DistanceIdx {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DistanceIdx {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max heap by distance; equal distances keep the lower row index
        self.0.total_cmp(&other.0).then(self.1.cmp(&other.1))
    }
}

/// How neighbor values are averaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeightScheme {
    /// Plain mean of the neighbors
    #[default]
    Uniform,
    /// Inverse-distance weighted mean
    Distance,
}

/// KNN-based imputer
///
/// Fitting stores the training matrix. Every missing entry is filled from the
/// `n_neighbors` nearest training rows that observed that feature, using a
/// NaN-aware Euclidean distance. Nothing from the data being transformed is
/// ever used as a donor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNImputer {
    /// Number of neighbors
    n_neighbors: usize,
    /// Weights for averaging
    weights: WeightScheme,
    /// Training data, missing entries included
    fit_data: Option<Array2<f64>>,
    /// Per-feature means of observed training values, for rows without donors
    feature_means: Option<Array1<f64>>,
}

impl KNNImputer {
    /// Create new KNN imputer
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
            weights: WeightScheme::Uniform,
            fit_data: None,
            feature_means: None,
        }
    }

    /// Set weighting scheme
    pub fn with_weights(mut self, weights: WeightScheme) -> Self {
        self.weights = weights;
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    pub fn weights(&self) -> WeightScheme {
        self.weights
    }

    pub fn is_fitted(&self) -> bool {
        self.fit_data.is_some()
    }

    /// Number of features seen during fit
    pub fn n_features(&self) -> Option<usize> {
        self.fit_data.as_ref().map(|d| d.ncols())
    }

    /// NaN-aware Euclidean distance: squared differences over coordinates
    /// present in both rows, scaled up by `n_features / n_present`.
    /// `None` when the rows share no observed coordinate.
    fn nan_euclidean(a: ArrayView1<f64>, b: ArrayView1<f64>) -> Option<f64> {
        let mut present = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            present += 1;
            let d = ai - bi;
            accum += d * d;
        }

        if present == 0 {
            return None;
        }
        Some((accum * a.len() as f64 / present as f64).sqrt())
    }

    /// k nearest donors for `feature_idx`, sorted by distance then row index
    fn nearest_donors(
        &self,
        data: &Array2<f64>,
        distances: &[Option<f64>],
        feature_idx: usize,
    ) -> Vec<DistanceIdx> {
        let k = self.n_neighbors;
        let mut heap: BinaryHeap<DistanceIdx> = BinaryHeap::with_capacity(k + 1);

        for (i, dist) in distances.iter().enumerate() {
            let Some(dist) = *dist else { continue };
            if is_missing(data[[i, feature_idx]]) {
                continue;
            }
            let candidate = DistanceIdx(dist, i);
            if heap.len() < k {
                heap.push(candidate);
            } else if let Some(worst) = heap.peek() {
                if candidate < *worst {
                    heap.pop();
                    heap.push(candidate);
                }
            }
        }

        heap.into_sorted_vec()
    }

    /// Impute a value from donors, falling back to the training mean
    fn impute_value(&self, data: &Array2<f64>, means: &Array1<f64>, donors: &[DistanceIdx], feature_idx: usize) -> f64 {
        if donors.is_empty() {
            return means[feature_idx];
        }

        match self.weights {
            WeightScheme::Uniform => {
                let sum: f64 = donors.iter().map(|d| data[[d.1, feature_idx]]).sum();
                sum / donors.len() as f64
            }
            WeightScheme::Distance => {
                // Exact matches take all the weight
                let exact: Vec<&DistanceIdx> = donors.iter().filter(|d| d.0 == 0.0).collect();
                if !exact.is_empty() {
                    let sum: f64 = exact.iter().map(|d| data[[d.1, feature_idx]]).sum();
                    return sum / exact.len() as f64;
                }

                let mut weighted_sum = 0.0;
                let mut weight_sum = 0.0;
                for d in donors {
                    let weight = 1.0 / d.0;
                    weighted_sum += data[[d.1, feature_idx]] * weight;
                    weight_sum += weight;
                }
                weighted_sum / weight_sum
            }
        }
    }
}

impl Default for KNNImputer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Imputer for KNNImputer {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(PhishnetError::TransformationError(format!(
                "cannot fit imputer on an empty matrix ({} x {})",
                x.nrows(),
                x.ncols()
            )));
        }

        let mut means = Array1::zeros(x.ncols());
        for (j, col) in x.axis_iter(Axis(1)).enumerate() {
            let observed: Vec<f64> = col.iter().copied().filter(|v| !is_missing(*v)).collect();
            if observed.is_empty() {
                return Err(PhishnetError::TransformationError(format!(
                    "feature {} has no observed values in the training data",
                    j
                )));
            }
            means[j] = observed.iter().sum::<f64>() / observed.len() as f64;
        }

        self.fit_data = Some(x.to_owned());
        self.feature_means = Some(means);

        Ok(())
    }

    fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (Some(data), Some(means)) = (self.fit_data.as_ref(), self.feature_means.as_ref()) else {
            return Err(PhishnetError::ModelNotFitted);
        };

        if x.ncols() != data.ncols() {
            return Err(PhishnetError::ShapeError {
                expected: format!("{} features", data.ncols()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let mut result = x.clone();

        for (row_idx, row) in x.rows().into_iter().enumerate() {
            if !row.iter().any(|&v| is_missing(v)) {
                continue;
            }

            let distances: Vec<Option<f64>> = data
                .rows()
                .into_iter()
                .map(|train_row| Self::nan_euclidean(row, train_row))
                .collect();

            for j in 0..x.ncols() {
                if is_missing(row[j]) {
                    let donors = self.nearest_donors(data, &distances, j);
                    result[[row_idx, j]] = self.impute_value(data, means, &donors, j);
                }
            }
        }

        Ok(result)
    }
}
