//! Parados API
//!
//! HTTP prediction service for the Canary Islands unemployment model.
//!
//! # Lifecycle
//! - Startup: the model is loaded once from the registry, a local export or a
//!   scoring server. A failed load is logged and leaves the service
//!   unavailable; the process keeps serving `/health`.
//! - Requests: payloads are validated against the field table, aligned to
//!   the persisted column order (read fresh per request) and scored.
//! - Shutdown: the model slot is cleared.
//!
//! # Modules
//! - `config`: service configuration and model source selection
//! - `client`: model registry and scoring server clients
//! - `engine`: the prediction service and its model slot
//! - `handler`: axum routes and error responses
//! - `telemetry`: log subscriber and Prometheus metrics

pub mod client;
pub mod config;
pub mod engine;
pub mod handler;
pub mod telemetry;

pub use config::{ModelSource, ServiceConfig};
pub use engine::{PredictionService, ServiceError, ServiceState};
pub use handler::{create_router, ApiError, AppState};

/// Service version (from Cargo.toml)
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Service identifier
pub const SERVICE_ID: &str = "parados-api";
