//! Model hosted behind a scoring server

use parados_core::{FeatureRow, FieldValue, Model, ModelError, ModelFuture};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::RegistryError;

/// Model reached through `POST <url>/invocations`
///
/// Rows are sent in the `dataframe_split` layout, with column labels and a
/// single row of typed values.
pub struct ServingModel {
    url: String,
    client: reqwest::Client,
}

impl ServingModel {
    /// Probe `<url>/ping` and return a handle if the server answers
    pub async fn connect(url: impl Into<String>, timeout: Duration) -> Result<Self, RegistryError> {
        let url = url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::new();

        let response = client
            .get(format!("{}/ping", url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| RegistryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(RegistryError::Server {
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(Self { url, client })
    }

    async fn invoke(&self, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
        let request = InvocationRequest {
            dataframe_split: DataframeSplit {
                columns: &row.columns,
                data: [row.values.as_slice()],
            },
        };

        let response = self
            .client
            .post(format!("{}/invocations", self.url))
            .json(&request)
            .send()
            .await
            .map_err(|e| ModelError::Invocation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ModelError::Invocation(format!(
                "scoring server returned {}: {}",
                status, error_text
            )));
        }

        let body: InvocationResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Invocation(e.to_string()))?;

        Ok(body.into_predictions())
    }
}

impl Model for ServingModel {
    fn name(&self) -> &str {
        &self.url
    }

    fn predict<'a>(&'a self, row: &'a FeatureRow) -> ModelFuture<'a> {
        Box::pin(self.invoke(row))
    }
}

#[derive(Serialize)]
struct InvocationRequest<'a> {
    dataframe_split: DataframeSplit<'a>,
}

#[derive(Serialize)]
struct DataframeSplit<'a> {
    columns: &'a [String],
    data: [&'a [FieldValue]; 1],
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InvocationResponse {
    Wrapped { predictions: Vec<f64> },
    Bare(Vec<f64>),
}

impl InvocationResponse {
    fn into_predictions(self) -> Vec<f64> {
        match self {
            InvocationResponse::Wrapped { predictions } => predictions,
            InvocationResponse::Bare(values) => values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let row = FeatureRow {
            columns: vec!["AÑO".into(), "I_Tenerife".into()],
            values: vec![FieldValue::Int(2020), FieldValue::Bool(true)],
        };
        let request = InvocationRequest {
            dataframe_split: DataframeSplit {
                columns: &row.columns,
                data: [row.values.as_slice()],
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "dataframe_split": {
                    "columns": ["AÑO", "I_Tenerife"],
                    "data": [[2020, true]]
                }
            })
        );
    }

    #[test]
    fn test_response_shapes() {
        let wrapped: InvocationResponse =
            serde_json::from_str(r#"{"predictions": [812.5]}"#).unwrap();
        assert_eq!(wrapped.into_predictions(), vec![812.5]);

        let bare: InvocationResponse = serde_json::from_str("[3.0, 4.0]").unwrap();
        assert_eq!(bare.into_predictions(), vec![3.0, 4.0]);
    }
}
