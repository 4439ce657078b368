//! Linear regression model loaded from a portable JSON export

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::{Model, ModelError, ModelFuture};
use crate::columns::FeatureRow;

/// On-disk form of a linear model
///
/// Mirrors the fitted attributes of a linear regressor: one coefficient per
/// named feature plus an intercept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub intercept: f64,
}

/// Linear model scoring rows by feature name
#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    intercept: f64,
    weights: HashMap<String, f64>,
}

impl LinearModel {
    pub fn from_artifact(
        name: impl Into<String>,
        artifact: LinearArtifact,
    ) -> Result<Self, ModelError> {
        if artifact.feature_names.len() != artifact.coefficients.len() {
            return Err(ModelError::InvalidArtifact(format!(
                "{} feature names but {} coefficients",
                artifact.feature_names.len(),
                artifact.coefficients.len()
            )));
        }
        if artifact.feature_names.is_empty() {
            return Err(ModelError::InvalidArtifact("no features".to_string()));
        }
        if !artifact.intercept.is_finite()
            || artifact.coefficients.iter().any(|c| !c.is_finite())
        {
            return Err(ModelError::InvalidArtifact(
                "non-finite coefficient".to_string(),
            ));
        }

        let mut weights = HashMap::with_capacity(artifact.feature_names.len());
        for (feature, coef) in artifact.feature_names.into_iter().zip(artifact.coefficients) {
            if weights.insert(feature.clone(), coef).is_some() {
                return Err(ModelError::InvalidArtifact(format!(
                    "duplicate feature '{}'",
                    feature
                )));
            }
        }

        Ok(Self {
            name: name.into(),
            intercept: artifact.intercept,
            weights,
        })
    }

    pub fn from_slice(name: impl Into<String>, bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: LinearArtifact = serde_json::from_slice(bytes)
            .map_err(|e| ModelError::InvalidArtifact(e.to_string()))?;
        Self::from_artifact(name, artifact)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            ModelError::InvalidArtifact(format!("{}: {}", path.display(), e))
        })?;
        Self::from_slice(path.display().to_string(), &bytes)
    }

    pub fn feature_count(&self) -> usize {
        self.weights.len()
    }

    fn score(&self, row: &FeatureRow) -> Result<Vec<f64>, ModelError> {
        let mut total = self.intercept;
        let mut used = 0;

        for (column, value) in row.iter() {
            let weight = self
                .weights
                .get(column)
                .ok_or_else(|| ModelError::UnknownFeature(column.to_string()))?;
            total += weight * value.as_f64();
            used += 1;
        }

        if used != self.weights.len() {
            let missing = self
                .weights
                .keys()
                .find(|feature| !row.columns.contains(feature))
                .cloned()
                .unwrap_or_default();
            return Err(ModelError::MissingFeature(missing));
        }

        Ok(vec![total])
    }
}

impl Model for LinearModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict<'a>(&'a self, row: &'a FeatureRow) -> ModelFuture<'a> {
        Box::pin(std::future::ready(self.score(row)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldValue;

    fn artifact() -> LinearArtifact {
        LinearArtifact {
            feature_names: vec!["AÑO".into(), "I_Tenerife".into(), "PIB_TOTAL".into()],
            coefficients: vec![2.0, 100.0, 0.5],
            intercept: -4000.0,
        }
    }

    fn row(columns: &[&str], values: Vec<FieldValue>) -> FeatureRow {
        FeatureRow {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            values,
        }
    }

    #[tokio::test]
    async fn test_linear_prediction() {
        let model = LinearModel::from_artifact("test", artifact()).unwrap();
        let input = row(
            &["I_Tenerife", "AÑO", "PIB_TOTAL"],
            vec![
                FieldValue::Bool(true),
                FieldValue::Int(2020),
                FieldValue::Float(10.0),
            ],
        );
        let out = model.predict(&input).await.unwrap();
        assert_eq!(out, vec![-4000.0 + 4040.0 + 100.0 + 5.0]);
    }

    #[tokio::test]
    async fn test_linear_rejects_unknown_and_missing_features() {
        let model = LinearModel::from_artifact("test", artifact()).unwrap();

        let unknown = row(&["MES"], vec![FieldValue::Int(1)]);
        assert_eq!(
            model.predict(&unknown).await.unwrap_err(),
            ModelError::UnknownFeature("MES".into())
        );

        let partial = row(&["AÑO"], vec![FieldValue::Int(2020)]);
        assert!(matches!(
            model.predict(&partial).await.unwrap_err(),
            ModelError::MissingFeature(_)
        ));
    }

    #[test]
    fn test_invalid_artifacts() {
        let mut bad = artifact();
        bad.coefficients.pop();
        assert!(LinearModel::from_artifact("x", bad).is_err());

        let mut dup = artifact();
        dup.feature_names[1] = "AÑO".into();
        assert!(LinearModel::from_artifact("x", dup).is_err());

        assert!(LinearModel::from_slice("x", b"not json").is_err());
    }

    #[test]
    fn test_parse_json_export() {
        let json = br#"{"feature_names": ["MES"], "coefficients": [3.0]}"#;
        let model = LinearModel::from_slice("x", json).unwrap();
        assert_eq!(model.feature_count(), 1);
        assert_eq!(model.name(), "x");
    }
}
