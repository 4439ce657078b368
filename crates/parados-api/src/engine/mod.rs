//! Prediction engine
//!
//! Owns the model slot and runs the predict pipeline: fresh column order,
//! alignment, model call. Loading happens once at startup and never fails
//! the process; a failed load leaves the engine unavailable for good.

use parados_core::{
    predict_scalar, ColumnOrder, FeatureRecord, LinearModel, Model, ModelHandle, PredictionError,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::client::{RegistryClient, RegistryError, ServingModel};
use crate::config::{ModelSource, ServiceConfig};

/// Whether a model is available to serve predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Unavailable,
    Ready,
}

/// Errors returned by [`PredictionService::predict`]
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Model not loaded")]
    Unavailable,

    #[error(transparent)]
    Prediction(#[from] PredictionError),
}

/// Prediction service
pub struct PredictionService {
    handle: ModelHandle,
    columns_path: PathBuf,
}

impl PredictionService {
    /// Service with no model loaded
    pub fn new(columns_path: impl Into<PathBuf>) -> Self {
        Self {
            handle: ModelHandle::new(),
            columns_path: columns_path.into(),
        }
    }

    /// Service with an already loaded model
    pub fn with_model(columns_path: impl Into<PathBuf>, model: Arc<dyn Model>) -> Self {
        Self {
            handle: ModelHandle::ready(model),
            columns_path: columns_path.into(),
        }
    }

    /// Build the service and try to load the configured model
    ///
    /// Load failures are logged and leave the service unavailable.
    pub async fn start(config: &ServiceConfig) -> Self {
        let service = Self::new(&config.columns_path);

        match load_model(&config.model, config.registry_timeout).await {
            Ok(model) => {
                tracing::info!(
                    model = %model.name(),
                    source = %config.model.describe(),
                    "Model loaded"
                );
                service.handle.publish(model);
            }
            Err(e) => {
                tracing::error!(
                    source = %config.model.describe(),
                    error = %e,
                    "Failed to load model, predictions are disabled"
                );
            }
        }

        service
    }

    pub fn state(&self) -> ServiceState {
        if self.handle.is_ready() {
            ServiceState::Ready
        } else {
            ServiceState::Unavailable
        }
    }

    /// Predict the unemployment count for a validated record
    pub async fn predict(&self, record: &FeatureRecord) -> Result<f64, ServiceError> {
        let model = self.handle.get().ok_or(ServiceError::Unavailable)?;

        // Re-read on every call so a replaced artifact applies to the next request.
        let order = ColumnOrder::load(&self.columns_path).map_err(PredictionError::from)?;

        let row = order
            .align(record)
            .map_err(|missing| PredictionError::ColumnMismatch { missing })?;

        let value = predict_scalar(model.as_ref(), &row)
            .await
            .map_err(PredictionError::from)?;

        tracing::debug!(model = %model.name(), prediction = value, "Prediction served");
        Ok(value)
    }

    /// Drop the loaded model
    pub fn shutdown(&self) {
        self.handle.clear();
        tracing::info!("Model released");
    }
}

/// Load a model from the configured source
pub async fn load_model(
    source: &ModelSource,
    timeout: Duration,
) -> Result<Arc<dyn Model>, RegistryError> {
    match source {
        ModelSource::Registry {
            uri,
            tracking_uri,
            token,
            artifact_path,
        } => {
            let base_url = tracking_uri.as_deref().ok_or(RegistryError::NotConfigured)?;
            let client = RegistryClient::new(base_url)
                .with_token(token.clone())
                .with_timeout(timeout);
            let model = client.load_model(uri, artifact_path).await?;
            Ok(Arc::new(model))
        }
        ModelSource::File(path) => {
            let model = LinearModel::from_file(path)?;
            Ok(Arc::new(model))
        }
        ModelSource::Serving { url } => {
            let model = ServingModel::connect(url.clone(), timeout).await?;
            Ok(Arc::new(model))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parados_core::{LinearArtifact, ModelError};
    use serde_json::json;
    use std::io::Write;

    fn record() -> FeatureRecord {
        FeatureRecord::from_json(&json!({
            "AÑO": 2020,
            "MES": 5,
            "I_Lanzarote": true,
            "PIB_TOTAL": 100.0,
            "CRISIS": false,
            "COVID": true
        }))
        .unwrap()
    }

    fn model() -> Arc<dyn Model> {
        Arc::new(
            LinearModel::from_artifact(
                "test",
                LinearArtifact {
                    feature_names: vec!["MES".into(), "I_Lanzarote".into(), "COVID".into()],
                    coefficients: vec![10.0, 500.0, 250.0],
                    intercept: 1000.0,
                },
            )
            .unwrap(),
        )
    }

    fn columns_file(columns: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(serde_json::to_string(columns).unwrap().as_bytes())
            .unwrap();
        file
    }

    #[tokio::test]
    async fn test_unavailable_service() {
        let service = PredictionService::new("columnas.json");
        assert_eq!(service.state(), ServiceState::Unavailable);
        assert!(matches!(
            service.predict(&record()).await,
            Err(ServiceError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_predict_with_loaded_model() {
        let columns = columns_file(&["COVID", "MES", "I_Lanzarote"]);
        let service = PredictionService::with_model(columns.path(), model());
        assert_eq!(service.state(), ServiceState::Ready);

        let value = service.predict(&record()).await.unwrap();
        assert_eq!(value, 1000.0 + 50.0 + 500.0 + 250.0);
    }

    #[tokio::test]
    async fn test_errors_are_distinguished() {
        let missing_file = PredictionService::with_model("/nonexistent/columnas.json", model());
        match missing_file.predict(&record()).await {
            Err(ServiceError::Prediction(e)) => assert_eq!(e.kind(), "artifact"),
            other => panic!("unexpected {:?}", other),
        }

        let unknown = columns_file(&["MES", "TASA_ACTIVIDAD"]);
        let mismatch = PredictionService::with_model(unknown.path(), model());
        match mismatch.predict(&record()).await {
            Err(ServiceError::Prediction(e)) => {
                assert_eq!(e.kind(), "column_mismatch");
                assert!(e.to_string().contains("TASA_ACTIVIDAD"));
            }
            other => panic!("unexpected {:?}", other),
        }

        let partial = columns_file(&["MES"]);
        let model_fail = PredictionService::with_model(partial.path(), model());
        match model_fail.predict(&record()).await {
            Err(ServiceError::Prediction(PredictionError::Model(e))) => {
                assert!(matches!(e, ModelError::MissingFeature(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_without_tracking_server_stays_unavailable() {
        let config = ServiceConfig::default();
        let service = PredictionService::start(&config).await;
        assert_eq!(service.state(), ServiceState::Unavailable);
    }

    #[tokio::test]
    async fn test_shutdown_clears_model() {
        let service = PredictionService::with_model("columnas.json", model());
        service.shutdown();
        assert_eq!(service.state(), ServiceState::Unavailable);
    }
}
