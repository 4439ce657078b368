//! Model abstraction and the process-wide model slot

mod linear;

pub use linear::{LinearArtifact, LinearModel};

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::columns::FeatureRow;

/// Errors raised by a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Model invocation failed: {0}")]
    Invocation(String),

    #[error("Model returned no predictions")]
    EmptyOutput,

    #[error("Model returned a non-finite prediction: {0}")]
    NonFinite(f64),

    #[error("Model does not know feature '{0}'")]
    UnknownFeature(String),

    #[error("Model input is missing feature '{0}'")]
    MissingFeature(String),

    #[error("Invalid model artifact: {0}")]
    InvalidArtifact(String),
}

/// Boxed future returned by [`Model::predict`]
pub type ModelFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<f64>, ModelError>> + Send + 'a>>;

/// A loaded regression model
pub trait Model: Send + Sync {
    /// Identifier used in logs
    fn name(&self) -> &str;

    /// Predict one value per row; a single-row input yields one value
    fn predict<'a>(&'a self, row: &'a FeatureRow) -> ModelFuture<'a>;
}

/// Run the model on one row and return its scalar prediction
pub async fn predict_scalar(model: &dyn Model, row: &FeatureRow) -> Result<f64, ModelError> {
    let outputs = model.predict(row).await?;
    let value = *outputs.first().ok_or(ModelError::EmptyOutput)?;
    if !value.is_finite() {
        return Err(ModelError::NonFinite(value));
    }
    Ok(value)
}

/// Process-wide slot holding the loaded model
///
/// Published once at startup, read on every request and cleared on
/// shutdown. Readers take a cheap `Arc` clone and never hold the lock across
/// a model call.
#[derive(Default)]
pub struct ModelHandle {
    slot: RwLock<Option<Arc<dyn Model>>>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle that already holds a model
    pub fn ready(model: Arc<dyn Model>) -> Self {
        Self {
            slot: RwLock::new(Some(model)),
        }
    }

    pub fn publish(&self, model: Arc<dyn Model>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(model);
    }

    pub fn get(&self) -> Option<Arc<dyn Model>> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    pub fn clear(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    pub fn is_ready(&self) -> bool {
        self.slot
            .read()
            .map(|slot| slot.is_some())
            .unwrap_or_else(|e| e.into_inner().is_some())
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle")
            .field("ready", &self.is_ready())
            .finish()
    }
}
