//! Data loading utilities

use crate::error::{PhishnetError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// CSV loader for pipeline datasets
pub struct DataLoader {
    /// Rows used for schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = n.max(1);
        self
    }

    /// Load a CSV file with a header row. Empty cells load as nulls.
    pub fn load_csv(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            PhishnetError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| PhishnetError::DataError(format!("cannot parse {}: {}", path.display(), e)))
    }
}

/// Save DataFrames to disk
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row, creating parent directories and
    /// overwriting any previous file.
    pub fn save_csv(df: &DataFrame, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        // CsvWriter needs a mutable frame
        let mut out = df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut out)
            .map_err(|e| PhishnetError::DataError(e.to_string()))
    }
}

/// Extract one column as `f64` values. Nulls become `NaN`.
pub fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PhishnetError::FeatureNotFound(name.to_string()))?;

    if matches!(column.dtype(), DataType::String | DataType::Null) {
        return Err(PhishnetError::DataError(format!(
            "column '{}' is not numeric ({:?})",
            name,
            column.dtype()
        )));
    }

    let casted = column
        .cast(&DataType::Float64)
        .map_err(|e| PhishnetError::DataError(e.to_string()))?;
    let values = casted
        .f64()
        .map_err(|e| PhishnetError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect();

    Ok(values)
}

/// Column names of a frame, in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|name| name.to_string())
        .collect()
}

/// Extract named columns into a row-major `Array2<f64>` (nulls become `NaN`).
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

/// Split a frame into feature names, feature matrix and raw target values.
pub fn split_features_target(
    df: &DataFrame,
    target_column: &str,
) -> Result<(Vec<String>, Array2<f64>, Array1<f64>)> {
    let feature_names: Vec<String> = column_names(df)
        .into_iter()
        .filter(|name| name != target_column)
        .collect();

    let target = Array1::from_vec(column_values(df, target_column)?);
    let x = columns_to_array2(df, &feature_names)?;

    Ok((feature_names, x, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,Result").unwrap();
        writeln!(file, "1,2,-1").unwrap();
        writeln!(file, "4,,1").unwrap();
        writeln!(file, "7,8,1").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn test_missing_cells_become_nan() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        let b = column_values(&df, "b").unwrap();
        assert_eq!(b[0], 2.0);
        assert!(b[1].is_nan());
    }

    #[test]
    fn test_split_features_target() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        let (names, x, y) = split_features_target(&df, "Result").unwrap();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(x.dim(), (3, 2));
        assert_eq!(y.to_vec(), vec![-1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_missing_target_column() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        let err = split_features_target(&df, "label").unwrap_err();
        assert!(matches!(err, PhishnetError::FeatureNotFound(_)));
    }

    #[test]
    fn test_save_csv_roundtrip() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), &[1.0, 2.0, 3.0]),
            Column::new("b".into(), &[4.0, 5.0, 6.0]),
        ])
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");
        DataSaver::save_csv(&df, &path).unwrap();

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.height(), 3);
        assert_eq!(loaded.width(), 2);
    }
}
