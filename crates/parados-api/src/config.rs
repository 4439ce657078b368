//! Service configuration
//!
//! Built from CLI arguments (each backed by an environment variable) or
//! through the builder.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ModelUri;

/// Default registry reference of the production model
pub const DEFAULT_MODEL_URI: &str = "models:/workspace.default.modelofinal/1";

/// Default file name of the model inside the registry artifact tree
pub const DEFAULT_MODEL_ARTIFACT: &str = "model.json";

/// Default location of the column order artifact
pub const DEFAULT_COLUMNS_PATH: &str = "columnas.json";

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_REGISTRY_TIMEOUT_MS: u64 = 30_000;

/// Where the model comes from
#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Resolve through the model registry of a tracking server
    Registry {
        uri: ModelUri,
        tracking_uri: Option<String>,
        token: Option<String>,
        artifact_path: String,
    },
    /// Linear model export on local disk
    File(PathBuf),
    /// External scoring server exposing `/invocations`
    Serving { url: String },
}

impl ModelSource {
    /// Short label for logs
    pub fn describe(&self) -> String {
        match self {
            ModelSource::Registry { uri, .. } => uri.to_string(),
            ModelSource::File(path) => format!("file://{}", path.display()),
            ModelSource::Serving { url } => url.clone(),
        }
    }
}

/// Prediction service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model: ModelSource,
    pub columns_path: PathBuf,
    pub registry_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            model: ModelSource::Registry {
                uri: default_model_uri(),
                tracking_uri: None,
                token: None,
                artifact_path: DEFAULT_MODEL_ARTIFACT.to_string(),
            },
            columns_path: PathBuf::from(DEFAULT_COLUMNS_PATH),
            registry_timeout: Duration::from_millis(DEFAULT_REGISTRY_TIMEOUT_MS),
        }
    }
}

fn default_model_uri() -> ModelUri {
    ModelUri {
        name: "workspace.default.modelofinal".to_string(),
        reference: crate::client::ModelReference::Version("1".to_string()),
    }
}

impl ServiceConfig {
    /// Create a new config builder
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Bearer token for the tracking server, if any
pub fn tracking_token_from_env() -> Option<String> {
    std::env::var("MLFLOW_TRACKING_TOKEN")
        .or_else(|_| std::env::var("DATABRICKS_TOKEN"))
        .ok()
        .filter(|t| !t.is_empty())
}

/// Expand the `databricks` shorthand to the workspace host
pub fn resolve_tracking_uri(uri: Option<String>) -> Option<String> {
    let resolved = match uri.as_deref() {
        Some("databricks") => std::env::var("DATABRICKS_HOST").ok(),
        _ => uri,
    };
    resolved.map(|u| u.trim_end_matches('/').to_string())
}

/// Pick the model source from the individual settings
pub fn select_source(
    serving_url: Option<String>,
    model_file: Option<PathBuf>,
    model_uri: String,
    tracking_uri: Option<String>,
    token: Option<String>,
    artifact_path: String,
) -> Result<ModelSource, String> {
    if let Some(url) = serving_url.filter(|u| !u.is_empty()) {
        return Ok(ModelSource::Serving {
            url: url.trim_end_matches('/').to_string(),
        });
    }
    if let Some(path) = model_file {
        return Ok(ModelSource::File(path));
    }

    let uri: ModelUri = model_uri.parse().map_err(|e| format!("{}", e))?;
    Ok(ModelSource::Registry {
        uri,
        tracking_uri: resolve_tracking_uri(tracking_uri),
        token,
        artifact_path,
    })
}

/// Builder for ServiceConfig
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn model(mut self, source: ModelSource) -> Self {
        self.config.model = source;
        self
    }

    pub fn columns_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.columns_path = path.into();
        self
    }

    pub fn registry_timeout(mut self, timeout: Duration) -> Self {
        self.config.registry_timeout = timeout;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ServiceConfig {
        self.config
    }
}

impl Default for ServiceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.columns_path, PathBuf::from("columnas.json"));
        assert_eq!(config.model.describe(), DEFAULT_MODEL_URI);
        assert_eq!(config.bind_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_config_builder() {
        let config = ServiceConfig::builder()
            .host("127.0.0.1")
            .port(9000)
            .columns_path("/srv/columnas.json")
            .model(ModelSource::File(PathBuf::from("/srv/model.json")))
            .registry_timeout(Duration::from_secs(5))
            .build();

        assert_eq!(config.bind_address(), "127.0.0.1:9000");
        assert_eq!(config.columns_path, PathBuf::from("/srv/columnas.json"));
        assert_eq!(config.model.describe(), "file:///srv/model.json");
        assert_eq!(config.registry_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_source_precedence() {
        let serving = select_source(
            Some("http://scoring:5001/".into()),
            Some(PathBuf::from("model.json")),
            DEFAULT_MODEL_URI.into(),
            None,
            None,
            DEFAULT_MODEL_ARTIFACT.into(),
        )
        .unwrap();
        assert_eq!(
            serving,
            ModelSource::Serving {
                url: "http://scoring:5001".into()
            }
        );

        let file = select_source(
            None,
            Some(PathBuf::from("model.json")),
            DEFAULT_MODEL_URI.into(),
            None,
            None,
            DEFAULT_MODEL_ARTIFACT.into(),
        )
        .unwrap();
        assert_eq!(file, ModelSource::File(PathBuf::from("model.json")));

        let registry = select_source(
            None,
            None,
            "models:/paro@champion".into(),
            Some("http://mlflow:5000/".into()),
            Some("t0k".into()),
            "model.json".into(),
        )
        .unwrap();
        match registry {
            ModelSource::Registry {
                uri, tracking_uri, ..
            } => {
                assert_eq!(uri.to_string(), "models:/paro@champion");
                assert_eq!(tracking_uri.as_deref(), Some("http://mlflow:5000"));
            }
            other => panic!("unexpected source {:?}", other),
        }
    }

    #[test]
    fn test_invalid_model_uri() {
        let err = select_source(
            None,
            None,
            "runs:/abc/model".into(),
            None,
            None,
            "model.json".into(),
        )
        .unwrap_err();
        assert!(err.contains("runs:/abc/model"));
    }

    #[test]
    fn test_databricks_tracking_uri() {
        std::env::set_var("DATABRICKS_HOST", "https://adb-1234.azuredatabricks.net/");
        assert_eq!(
            resolve_tracking_uri(Some("databricks".into())).as_deref(),
            Some("https://adb-1234.azuredatabricks.net")
        );

        std::env::remove_var("DATABRICKS_HOST");
        assert_eq!(resolve_tracking_uri(Some("databricks".into())), None);

        assert_eq!(
            resolve_tracking_uri(Some("http://mlflow:5000/".into())).as_deref(),
            Some("http://mlflow:5000")
        );
        assert_eq!(resolve_tracking_uri(None), None);
    }

    #[test]
    fn test_tracking_token_precedence() {
        std::env::set_var("MLFLOW_TRACKING_TOKEN", "mlflow-token");
        std::env::set_var("DATABRICKS_TOKEN", "dapi-token");
        assert_eq!(tracking_token_from_env().as_deref(), Some("mlflow-token"));

        std::env::remove_var("MLFLOW_TRACKING_TOKEN");
        assert_eq!(tracking_token_from_env().as_deref(), Some("dapi-token"));

        std::env::set_var("DATABRICKS_TOKEN", "");
        assert_eq!(tracking_token_from_env(), None);

        std::env::remove_var("DATABRICKS_TOKEN");
        assert_eq!(tracking_token_from_env(), None);
    }
}
