//! Classification metrics

use crate::artifact::ClassificationMetricArtifact;
use crate::error::{PhishnetError, Result};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Confusion counts for the positive class (label 1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub tp: usize,
    pub fp: usize,
    pub tn: usize,
    pub fn_: usize,
}

impl ConfusionCounts {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<Self> {
        if y_true.len() != y_pred.len() {
            return Err(PhishnetError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }

        let mut counts = Self::default();
        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => counts.tp += 1,
                (false, true) => counts.fp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
            }
        }
        Ok(counts)
    }

    pub fn total(&self) -> usize {
        self.tp + self.fp + self.tn + self.fn_
    }

    /// Zero when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Zero when there are no actual positives
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1(&self) -> f64 {
        ratio(2 * self.tp, 2 * self.tp + self.fp + self.fn_)
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Precision, recall and F1 of `y_pred` against `y_true`
pub fn get_classification_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<ClassificationMetricArtifact> {
    let counts = ConfusionCounts::compute(y_true, y_pred)?;
    Ok(ClassificationMetricArtifact {
        f1_score: counts.f1(),
        precision_score: counts.precision(),
        recall_score: counts.recall(),
    })
}

/// Scalar used to rank grid points and candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMetric {
    #[default]
    F1,
    Accuracy,
}

impl SelectionMetric {
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        let counts = ConfusionCounts::compute(y_true, y_pred)?;
        Ok(match self {
            SelectionMetric::F1 => counts.f1(),
            SelectionMetric::Accuracy => counts.accuracy(),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            SelectionMetric::F1 => "f1",
            SelectionMetric::Accuracy => "accuracy",
        }
    }
}
