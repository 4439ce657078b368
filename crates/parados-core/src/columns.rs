//! Persisted column order and row alignment
//!
//! The model expects its inputs in the exact order recorded at training
//! time. That order lives in an external artifact which is read fresh for
//! every prediction, so replacing the file changes the next request.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::record::FeatureRecord;
use crate::validation::FieldValue;

/// Errors reading or parsing the column artifact
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Failed to read column artifact {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed column artifact {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },
}

impl ArtifactError {
    fn malformed(path: &Path, message: impl Into<String>) -> Self {
        ArtifactError::Malformed {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Ordered list of column labels the model expects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ColumnOrder {
    columns: Vec<String>,
}

impl ColumnOrder {
    /// Build from an in-memory list, rejecting empty or duplicated lists
    pub fn new(columns: Vec<String>) -> Result<Self, String> {
        if columns.is_empty() {
            return Err("column list is empty".to_string());
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(format!("duplicate column '{}'", column));
            }
        }

        Ok(Self { columns })
    }

    /// Read the artifact at `path`
    ///
    /// `.txt` files hold one column per line; anything else is parsed as a
    /// JSON array of strings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let columns = if path.extension().is_some_and(|ext| ext == "txt") {
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect()
        } else {
            serde_json::from_str::<Vec<String>>(&content)
                .map_err(|e| ArtifactError::malformed(path, e.to_string()))?
        };

        Self::new(columns).map_err(|message| ArtifactError::malformed(path, message))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Select and reorder the record's values to match this order
    ///
    /// Fails with the full list of expected columns the record cannot supply.
    pub fn align(&self, record: &FeatureRecord) -> Result<FeatureRow, Vec<String>> {
        let available: HashMap<&str, FieldValue> = record.iter().collect();
        let mut values = Vec::with_capacity(self.columns.len());
        let mut missing = Vec::new();

        for column in &self.columns {
            match available.get(column.as_str()) {
                Some(value) => values.push(*value),
                None => missing.push(column.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(missing);
        }

        Ok(FeatureRow {
            columns: self.columns.clone(),
            values,
        })
    }
}

/// A single-row table handed to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub columns: Vec<String>,
    pub values: Vec<FieldValue>,
}

impl FeatureRow {
    /// Numeric view of the row
    pub fn numeric(&self) -> Vec<f64> {
        self.values.iter().map(FieldValue::as_f64).collect()
    }

    /// `(column, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns.iter().map(String::as_str).zip(self.values.iter())
    }
}
