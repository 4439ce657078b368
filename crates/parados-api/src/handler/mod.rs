//! HTTP handler for the prediction service
//!
//! - `GET /health` - model availability, always 200
//! - `POST /predict` - validate a feature record and predict
//! - `GET /schema` - accepted fields, aliases and groups
//! - `GET /metrics` - Prometheus exposition

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use parados_core::{
    ExclusiveGroup, FeatureRecord, FieldIssue, FieldKind, PredictionError, FIELDS,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::engine::{PredictionService, ServiceError, ServiceState};
use crate::telemetry::metrics::outcome;
use crate::telemetry::{PredictionMetrics, TelemetryError};

/// Application state
pub struct AppState {
    pub service: PredictionService,
    pub metrics: PredictionMetrics,
}

impl AppState {
    pub fn new(service: PredictionService) -> Result<Self, TelemetryError> {
        let metrics = PredictionMetrics::new()?;
        metrics.set_model_loaded(service.state() == ServiceState::Ready);
        Ok(Self { service, metrics })
    }

    /// Release the model and reflect it in the metrics
    pub fn shutdown(&self) {
        self.service.shutdown();
        self.metrics.set_model_loaded(false);
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/predict", post(predict))
        .route("/schema", get(schema))
        .route("/metrics", get(metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = match state.service.state() {
        ServiceState::Ready => "ok",
        ServiceState::Unavailable => "ko",
    };
    Json(HealthResponse { status })
}

/// Validate the payload and predict
async fn predict(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<PredictionResponse>, ApiError> {
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    let result = run_prediction(&state, payload).await;

    let label = match &result {
        Ok(_) => outcome::SUCCESS,
        Err(ApiError::Validation(_)) => outcome::INVALID,
        Err(ApiError::Unavailable) => outcome::UNAVAILABLE,
        Err(ApiError::Prediction(_)) => outcome::ERROR,
    };
    state
        .metrics
        .record_request(label, start.elapsed().as_secs_f64());

    match &result {
        Ok(response) => tracing::debug!(
            request_id = %request_id,
            prediction = response.prediction,
            "Prediction succeeded"
        ),
        Err(ApiError::Prediction(e)) => tracing::warn!(
            request_id = %request_id,
            kind = e.kind(),
            error = %e,
            "Prediction failed"
        ),
        Err(e) => tracing::debug!(request_id = %request_id, error = %e, "Prediction rejected"),
    }

    result.map(Json)
}

async fn run_prediction(
    state: &AppState,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<PredictionResponse, ApiError> {
    // Without a model every request is a 503, valid or not.
    if state.service.state() == ServiceState::Unavailable {
        return Err(ApiError::Unavailable);
    }

    let Json(body) = payload.map_err(|rejection| {
        ApiError::Validation(vec![FieldIssue::at_body(rejection.body_text(), "json_invalid")])
    })?;

    let record = FeatureRecord::from_json(&body).map_err(|e| ApiError::Validation(e.issues))?;

    let prediction = state.service.predict(&record).await?;
    Ok(PredictionResponse { prediction })
}

/// Field table endpoint
async fn schema() -> Json<SchemaResponse> {
    let fields = FIELDS
        .iter()
        .map(|spec| SchemaField {
            name: spec.name,
            alias: spec.alias,
            kind: spec.kind,
            required: spec.is_required(),
            default: spec.default,
            group: spec.group,
        })
        .collect();

    Json(SchemaResponse {
        fields,
        groups: ExclusiveGroup::ALL
            .iter()
            .map(|g| GroupInfo {
                group: *g,
                members: g.members().map(|(_, spec)| spec.alias).collect(),
                message: g.violation_message(),
            })
            .collect(),
    })
}

/// Prometheus metrics endpoint
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.encode() {
        Ok(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Successful prediction
#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: f64,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse {
    pub fields: Vec<SchemaField>,
    pub groups: Vec<GroupInfo>,
}

#[derive(Debug, Serialize)]
pub struct SchemaField {
    pub name: &'static str,
    pub alias: &'static str,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<ExclusiveGroup>,
}

#[derive(Debug, Serialize)]
pub struct GroupInfo {
    pub group: ExclusiveGroup,
    pub members: Vec<&'static str>,
    pub message: &'static str,
}

/// Message returned while no model is loaded
pub const UNAVAILABLE_DETAIL: &str = "Modelo no cargado";

/// API error types
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed ({} issues)", .0.len())]
    Validation(Vec<FieldIssue>),

    #[error("{}", UNAVAILABLE_DETAIL)]
    Unavailable,

    #[error("Error en predicción: {0}")]
    Prediction(PredictionError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Prediction(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unavailable => ApiError::Unavailable,
            ServiceError::Prediction(e) => ApiError::Prediction(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Validation(issues) => json!({ "detail": issues }),
            ApiError::Unavailable => json!({ "detail": UNAVAILABLE_DETAIL }),
            ApiError::Prediction(e) => json!({
                "detail": self.to_string(),
                "kind": e.kind(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parados_core::{ArtifactError, ValidationFailure};

    #[test]
    fn test_api_error_status_codes() {
        let err = ApiError::Validation(
            ValidationFailure::exclusivity(ExclusiveGroup::Island).issues,
        );
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::Unavailable.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let err = ApiError::Prediction(PredictionError::ColumnMismatch {
            missing: vec!["X".into()],
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Error en predicción: columns missing from record: X");
    }

    #[test]
    fn test_service_error_mapping() {
        let err: ApiError = ServiceError::Unavailable.into();
        assert!(matches!(err, ApiError::Unavailable));

        let artifact = ArtifactError::Malformed {
            path: "columnas.json".into(),
            message: "expected a list".into(),
        };
        let err: ApiError = ServiceError::Prediction(artifact.into()).into();
        match err {
            ApiError::Prediction(e) => assert_eq!(e.kind(), "artifact"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
