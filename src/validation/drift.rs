//! Two-sample Kolmogorov-Smirnov drift detection

use crate::error::{PhishnetError, Result};
use crate::utils::{column_names, column_values, write_yaml};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::f64::consts::PI;
use std::path::Path;

/// Default significance threshold
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.05;

/// Two-sample KS test result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KsResult {
    /// Maximum absolute distance between the two empirical CDFs
    pub statistic: f64,
    pub p_value: f64,
}

/// Kolmogorov-Smirnov test for distribution comparison
#[derive(Debug, Clone, Copy, Default)]
pub struct KolmogorovSmirnovTest;

impl KolmogorovSmirnovTest {
    /// Run the test on two samples. `NaN` values are dropped first.
    pub fn test(&self, reference: &[f64], current: &[f64]) -> Result<KsResult> {
        let mut ref_sorted: Vec<f64> = reference.iter().copied().filter(|v| !v.is_nan()).collect();
        let mut cur_sorted: Vec<f64> = current.iter().copied().filter(|v| !v.is_nan()).collect();

        if ref_sorted.is_empty() || cur_sorted.is_empty() {
            return Err(PhishnetError::StatisticalError(format!(
                "KS test needs observed values in both samples (reference: {}, current: {})",
                ref_sorted.len(),
                cur_sorted.len()
            )));
        }

        ref_sorted.sort_by(f64::total_cmp);
        cur_sorted.sort_by(f64::total_cmp);

        let statistic = Self::statistic(&ref_sorted, &cur_sorted);
        let p_value = Self::p_value(statistic, ref_sorted.len(), cur_sorted.len());

        Ok(KsResult { statistic, p_value })
    }

    /// KS statistic by a merge walk over two sorted samples. Equal values are
    /// consumed together so ties never open a spurious gap.
    fn statistic(a: &[f64], b: &[f64]) -> f64 {
        let (n, m) = (a.len() as f64, b.len() as f64);
        let (mut i, mut j) = (0usize, 0usize);
        let mut d: f64 = 0.0;

        while i < a.len() && j < b.len() {
            let x = a[i].min(b[j]);
            while i < a.len() && a[i] <= x {
                i += 1;
            }
            while j < b.len() && b[j] <= x {
                j += 1;
            }
            d = d.max((i as f64 / n - j as f64 / m).abs());
        }

        d
    }

    /// Two-sided p-value, `P(D >= d)` under the null hypothesis. Exact for
    /// samples up to [`EXACT_MAX_SAMPLES`], asymptotic beyond that.
    fn p_value(d: f64, n: usize, m: usize) -> f64 {
        if d <= 0.0 {
            return 1.0;
        }
        if n.max(m) <= EXACT_MAX_SAMPLES {
            return exact_p_value(d, n, m);
        }
        let ne = (n * m) as f64 / (n + m) as f64;
        let sqrt_ne = ne.sqrt();
        let lambda = (sqrt_ne + 0.12 + 0.11 / sqrt_ne) * d;
        kolmogorov_survival(lambda).clamp(0.0, 1.0)
    }
}

/// Largest sample size that gets the exact null distribution
pub const EXACT_MAX_SAMPLES: usize = 10_000;

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Exact two-sided p-value by lattice-path counting.
///
/// A merge of the two sorted samples is a monotone path from `(0, 0)` to
/// `(n, m)`, all paths equally likely. `D >= d` iff the path touches a point
/// with `|i·m - j·n| >= d·n·m`. The walk carries the probability of staying
/// strictly inside that band, stepping right with probability
/// `(n - i) / (n - i + m - j)`, so no binomial coefficient is ever formed.
fn exact_p_value(d: f64, n: usize, m: usize) -> f64 {
    let g = gcd(n, m);
    let lcm = (n / g) * m;
    // d is a multiple of 1/lcm up to rounding
    let h = (d * lcm as f64).round() as i64;
    if h <= 0 {
        return 1.0;
    }
    let bound = h * g as i64;
    let inside = |i: usize, j: usize| ((i * m) as i64 - (j * n) as i64).abs() < bound;

    // row[j] holds the probability of reaching (i, j) without leaving the band
    let mut row = vec![0.0f64; m + 1];
    row[0] = 1.0;
    for j in 1..=m {
        row[j] = if inside(0, j) {
            row[j - 1] * (m - j + 1) as f64 / (n + m - j + 1) as f64
        } else {
            0.0
        };
    }
    for i in 1..=n {
        for j in 0..=m {
            if !inside(i, j) {
                row[j] = 0.0;
                continue;
            }
            let remaining = (n - i + 1 + m - j) as f64;
            let mut p = row[j] * (n - i + 1) as f64 / remaining;
            if j > 0 {
                let remaining = (n - i + m - j + 1) as f64;
                p += row[j - 1] * (m - j + 1) as f64 / remaining;
            }
            row[j] = p;
        }
    }

    (1.0 - row[m]).clamp(0.0, 1.0)
}

/// Survival function of the Kolmogorov distribution, `P(K > lambda)`.
fn kolmogorov_survival(lambda: f64) -> f64 {
    if lambda <= 0.0 {
        return 1.0;
    }
    if lambda < 1.18 {
        let y = (-PI * PI / (8.0 * lambda * lambda)).exp();
        let cdf = (2.0 * PI).sqrt() / lambda * (y + y.powi(9) + y.powi(25) + y.powi(49));
        1.0 - cdf
    } else {
        let x = (-2.0 * lambda * lambda).exp();
        2.0 * (x - x.powi(4) + x.powi(9) - x.powi(16))
    }
}

/// Drift result for one column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDrift {
    pub column: String,
    pub statistic: f64,
    pub p_value: f64,
    pub drift_detected: bool,
    pub n_reference: usize,
    pub n_current: usize,
}

impl Serialize for ColumnDrift {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut entry = serializer.serialize_struct("ColumnDrift", 2)?;
        entry.serialize_field("p_value", &self.p_value)?;
        entry.serialize_field("drift_status", &self.drift_detected)?;
        entry.end()
    }
}

/// Per-column drift results in reference column order
#[derive(Debug, Clone, PartialEq)]
pub struct DriftReport {
    pub threshold: f64,
    pub columns: Vec<ColumnDrift>,
}

/// Persisted as a mapping keyed by column name
impl Serialize for DriftReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for col in &self.columns {
            map.serialize_entry(&col.column, col)?;
        }
        map.end()
    }
}

impl DriftReport {
    /// True iff no column drifted
    pub fn status(&self) -> bool {
        !self.columns.iter().any(|c| c.drift_detected)
    }

    pub fn get(&self, column: &str) -> Option<&ColumnDrift> {
        self.columns.iter().find(|c| c.column == column)
    }

    pub fn drifted_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.drift_detected)
            .map(|c| c.column.as_str())
            .collect()
    }

    /// Write the report as YAML, creating parent directories
    pub fn write_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        write_yaml(path, self)
    }
}

/// Compare every column of `reference` against the same column of `current`.
///
/// A column is drifted iff its p-value is at or below `threshold`. Missing
/// columns, non-numeric columns and columns without observed values fail the
/// whole computation.
pub fn detect_drift(reference: &DataFrame, current: &DataFrame, threshold: f64) -> Result<DriftReport> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(PhishnetError::InvalidParameter {
            name: "drift_threshold".to_string(),
            value: threshold.to_string(),
            reason: "must lie in [0, 1]".to_string(),
        });
    }

    let ks = KolmogorovSmirnovTest;
    let columns = column_names(reference)
        .into_par_iter()
        .map(|name| {
            let ref_values = column_values(reference, &name)?;
            let cur_values = column_values(current, &name).map_err(|e| match e {
                PhishnetError::FeatureNotFound(_) => PhishnetError::StatisticalError(format!(
                    "column '{}' is missing from the current dataset",
                    name
                )),
                other => other,
            })?;

            let result = ks.test(&ref_values, &cur_values).map_err(|e| {
                PhishnetError::StatisticalError(format!("column '{}': {}", name, e))
            })?;

            Ok(ColumnDrift {
                statistic: result.statistic,
                p_value: result.p_value,
                drift_detected: result.p_value <= threshold,
                n_reference: ref_values.iter().filter(|v| !v.is_nan()).count(),
                n_current: cur_values.iter().filter(|v| !v.is_nan()).count(),
                column: name,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(DriftReport { threshold, columns })
}
