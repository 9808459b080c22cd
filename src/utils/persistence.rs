//! Reading and writing pipeline artifacts
//!
//! Binary artifacts (fitted transformers, models, numeric matrices) are
//! bincode-encoded; human-readable documents (schema, drift report, config)
//! are YAML.

use crate::error::{PhishnetError, Result};
use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn open_existing(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(PhishnetError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("the file {} does not exist", path.display()),
        )));
    }
    Ok(File::open(path)?)
}

/// Serialize an object to `path` with bincode, replacing any previous file.
pub fn save_object<T: Serialize>(path: impl AsRef<Path>, obj: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut writer, obj)?;
    writer.flush()?;
    Ok(())
}

/// Load a bincode-encoded object from `path`.
pub fn load_object<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(open_existing(path.as_ref())?);
    Ok(bincode::deserialize_from(reader)?)
}

/// Persist a numeric matrix.
pub fn save_array(path: impl AsRef<Path>, array: &Array2<f64>) -> Result<()> {
    save_object(path, array)
}

/// Load a numeric matrix written by [`save_array`].
pub fn load_array(path: impl AsRef<Path>) -> Result<Array2<f64>> {
    load_object(path)
}

/// Read a YAML document.
pub fn read_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let reader = BufReader::new(open_existing(path.as_ref())?);
    Ok(serde_yaml::from_reader(reader)?)
}

/// Write a YAML document, replacing any previous file.
pub fn write_yaml<T: Serialize>(path: impl AsRef<Path>, content: &T) -> Result<()> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_yaml::to_writer(&mut writer, content)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use std::collections::BTreeMap;

    #[test]
    fn test_array_roundtrip_is_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arrays").join("train.bin");
        let arr = array![[0.1, 1.0 / 3.0], [f64::MAX, -0.0]];

        save_array(&path, &arr).unwrap();
        let loaded = load_array(&path).unwrap();

        for (a, b) in arr.iter().zip(loaded.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_load_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_object::<Vec<f64>>(dir.path().join("nope.bin")).unwrap_err();
        assert!(matches!(err, PhishnetError::IoError(_)));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.yaml");
        let mut doc = BTreeMap::new();
        doc.insert("threshold".to_string(), 0.05);

        write_yaml(&path, &doc).unwrap();
        let loaded: BTreeMap<String, f64> = read_yaml(&path).unwrap();
        assert_eq!(loaded, doc);
    }
}
