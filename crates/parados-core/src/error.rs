//! Errors raised while turning a validated record into a prediction

use thiserror::Error;

use crate::columns::ArtifactError;
use crate::model::ModelError;

/// Failure during column alignment or model invocation
///
/// The variants are kept apart so callers can tell a schema mismatch from an
/// unreadable artifact or a failing model.
#[derive(Error, Debug)]
pub enum PredictionError {
    /// The column artifact names columns the record does not provide
    #[error("columns missing from record: {}", .missing.join(", "))]
    ColumnMismatch { missing: Vec<String> },

    /// The column artifact could not be read or parsed
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// The model failed or produced an unusable result
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl PredictionError {
    /// Stable identifier for the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            PredictionError::ColumnMismatch { .. } => "column_mismatch",
            PredictionError::Artifact(_) => "artifact",
            PredictionError::Model(_) => "model",
        }
    }
}

/// Result type alias for prediction operations
pub type Result<T> = std::result::Result<T, PredictionError>;
