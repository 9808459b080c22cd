//! Declared dataset schema and the column-count check

use crate::error::{PhishnetError, Result};
use crate::utils::read_yaml;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// On-disk layout: `columns` is a list of single-entry `name: dtype` maps.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawSchema {
    columns: Vec<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    numerical_columns: Vec<String>,
}

/// Ordered column name to expected type mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema", into = "RawSchema")]
pub struct Schema {
    columns: Vec<(String, String)>,
    numerical_columns: Vec<String>,
}

impl TryFrom<RawSchema> for Schema {
    type Error = PhishnetError;

    fn try_from(raw: RawSchema) -> Result<Self> {
        let mut columns = Vec::with_capacity(raw.columns.len());
        for entry in raw.columns {
            if entry.len() != 1 {
                return Err(PhishnetError::SchemaError(format!(
                    "each column entry must map one name to a type, got {} entries",
                    entry.len()
                )));
            }
            columns.extend(entry);
        }
        Ok(Self {
            columns,
            numerical_columns: raw.numerical_columns,
        })
    }
}

impl From<Schema> for RawSchema {
    fn from(schema: Schema) -> Self {
        RawSchema {
            columns: schema
                .columns
                .into_iter()
                .map(|(name, dtype)| BTreeMap::from([(name, dtype)]))
                .collect(),
            numerical_columns: schema.numerical_columns,
        }
    }
}

impl Schema {
    /// Build a schema from `(name, dtype)` pairs in column order
    pub fn new<N, T>(columns: impl IntoIterator<Item = (N, T)>) -> Self
    where
        N: Into<String>,
        T: Into<String>,
    {
        Self {
            columns: columns
                .into_iter()
                .map(|(n, t)| (n.into(), t.into()))
                .collect(),
            numerical_columns: Vec::new(),
        }
    }

    pub fn with_numerical_columns(mut self, names: Vec<String>) -> Self {
        self.numerical_columns = names;
        self
    }

    /// Load a schema from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        read_yaml(path).map_err(|e| {
            PhishnetError::SchemaError(format!("failed to read schema {}: {}", path.display(), e))
        })
    }

    /// Parse a schema from YAML text
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Expected type of `name`, if declared
    pub fn dtype(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t.as_str())
    }

    pub fn numerical_columns(&self) -> &[String] {
        &self.numerical_columns
    }
}

/// Outcome of a schema check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaCheck {
    Valid,
    Mismatch { expected: usize, actual: usize },
}

impl SchemaCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SchemaCheck::Valid)
    }
}

/// Compare the dataset's column count against the schema. Never fails.
pub fn validate_columns(df: &DataFrame, schema: &Schema) -> SchemaCheck {
    let expected = schema.column_count();
    let actual = df.width();
    if expected == actual {
        SchemaCheck::Valid
    } else {
        SchemaCheck::Mismatch { expected, actual }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use super::Schema;

    const SCHEMA: &str = "\
columns:
  - having_IP_Address: int64
  - URL_Length: int64
  - Result: int64
numerical_columns:
  - having_IP_Address
  - URL_Length
";

    #[test]
    fn test_parse_schema_keeps_order() {
        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(schema.column_count(), 3);
        let names: Vec<&str> = schema.column_names().collect();
        assert_eq!(names, vec!["having_IP_Address", "URL_Length", "Result"]);
        assert_eq!(schema.dtype("URL_Length"), Some("int64"));
        assert_eq!(schema.numerical_columns().len(), 2);
    }

    #[test]
    fn test_numerical_columns_optional() {
        let schema = Schema::from_yaml_str("columns:\n  - a: float64\n").unwrap();
        assert_eq!(schema.column_count(), 1);
        assert!(schema.numerical_columns().is_empty());
    }

    #[test]
    fn test_rejects_multi_entry_column() {
        let err = Schema::from_yaml_str("columns:\n  - {a: int64, b: int64}\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_columns() {
        let df = df! {
            "having_IP_Address" => &[1i64, -1],
            "URL_Length" => &[1i64, 0],
            "Result" => &[1i64, -1],
        }
        .unwrap();

        let schema = Schema::from_yaml_str(SCHEMA).unwrap();
        assert_eq!(validate_columns(&df, &schema), SchemaCheck::Valid);

        let narrow = df.drop("URL_Length").unwrap();
        let check = validate_columns(&narrow, &schema);
        assert_eq!(check, SchemaCheck::Mismatch { expected: 3, actual: 2 });
        assert!(!check.is_valid());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let schema = Schema::new([("a", "int64"), ("b", "float64")]);
        let text = serde_yaml::to_string(&schema).unwrap();
        assert_eq!(Schema::from_yaml_str(&text).unwrap(), schema);
    }
}
