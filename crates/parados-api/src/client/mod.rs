//! Clients for the model registry and remote scoring servers
//!
//! The registry client speaks the tracking-server REST API: it resolves a
//! `models:/` reference to a concrete version, logs where the artifacts
//! live and downloads the model export.

mod serving;

pub use serving::ServingModel;

use parados_core::{LinearModel, ModelError};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which version of a registered model to load
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelReference {
    Version(String),
    Alias(String),
}

/// Parsed `models:/<name>/<version>` or `models:/<name>@<alias>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelUri {
    pub name: String,
    pub reference: ModelReference,
}

impl FromStr for ModelUri {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RegistryError::InvalidUri(s.to_string());
        let rest = s.strip_prefix("models:/").ok_or_else(invalid)?;

        let (name, reference) = if let Some((name, alias)) = rest.split_once('@') {
            (name, ModelReference::Alias(alias.to_string()))
        } else {
            let (name, version) = rest.rsplit_once('/').ok_or_else(invalid)?;
            if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            (name, ModelReference::Version(version.to_string()))
        };

        let empty_ref = match &reference {
            ModelReference::Version(v) | ModelReference::Alias(v) => v.is_empty(),
        };
        if name.is_empty() || name.contains('/') || empty_ref {
            return Err(invalid());
        }

        Ok(Self {
            name: name.to_string(),
            reference,
        })
    }
}

impl fmt::Display for ModelUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reference {
            ModelReference::Version(v) => write!(f, "models:/{}/{}", self.name, v),
            ModelReference::Alias(a) => write!(f, "models:/{}@{}", self.name, a),
        }
    }
}

/// Registry client errors
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid model URI: {0}")]
    InvalidUri(String),

    #[error("Tracking server is not configured")]
    NotConfigured,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Model registry client
pub struct RegistryClient {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl RegistryClient {
    /// Create new client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set bearer token
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve an alias to a version; versions pass through
    pub async fn resolve_version(&self, uri: &ModelUri) -> Result<String, RegistryError> {
        match &uri.reference {
            ModelReference::Version(v) => Ok(v.clone()),
            ModelReference::Alias(alias) => {
                let response: AliasResponse = self
                    .get_json(
                        "/api/2.0/mlflow/registered-models/alias",
                        &[("name", uri.name.as_str()), ("alias", alias.as_str())],
                    )
                    .await?;
                Ok(response.model_version.version)
            }
        }
    }

    /// Location of the version's artifacts
    pub async fn download_uri(&self, name: &str, version: &str) -> Result<String, RegistryError> {
        let response: DownloadUriResponse = self
            .get_json(
                "/api/2.0/mlflow/model-versions/get-download-uri",
                &[("name", name), ("version", version)],
            )
            .await?;
        Ok(response.artifact_uri)
    }

    /// Raw bytes of one file inside the version's artifacts
    pub async fn fetch_artifact(
        &self,
        name: &str,
        version: &str,
        path: &str,
    ) -> Result<Vec<u8>, RegistryError> {
        let response = self
            .get(
                "/model-versions/get-artifact",
                &[("name", name), ("version", version), ("path", path)],
            )
            .await?;

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| RegistryError::Network(e.to_string()))
    }

    /// Resolve, locate and download a model export
    pub async fn load_model(
        &self,
        uri: &ModelUri,
        artifact_path: &str,
    ) -> Result<LinearModel, RegistryError> {
        let version = self.resolve_version(uri).await?;
        let location = self.download_uri(&uri.name, &version).await?;
        tracing::info!(
            model = %uri.name,
            version = %version,
            artifact_uri = %location,
            "Resolved registered model"
        );

        let bytes = self.fetch_artifact(&uri.name, &version, artifact_path).await?;
        let model = LinearModel::from_slice(format!("{}/{}", uri.name, version), &bytes)?;
        Ok(model)
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response, RegistryError> {
        let url = format!("{}{}", self.base_url, path);

        let mut request = self.client.get(&url).query(query).timeout(self.timeout);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            Err(RegistryError::Server {
                status: status.as_u16(),
                message: error_text,
            })
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RegistryError> {
        self.get(path, query)
            .await?
            .json()
            .await
            .map_err(|e| RegistryError::Parse(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct DownloadUriResponse {
    artifact_uri: String,
}

#[derive(Debug, Deserialize)]
struct AliasResponse {
    model_version: AliasVersion,
}

#[derive(Debug, Deserialize)]
struct AliasVersion {
    version: String,
}
