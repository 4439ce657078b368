//! Validated feature record

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::schema::{self, FieldSpec, FIELDS};
use crate::validation::{check_exclusivity, coerce, FieldIssue, FieldValue, ValidationFailure};

/// A validated, immutable feature record
///
/// Values are stored in field-table order. Serializing the record produces a
/// JSON object keyed by alias, which is the shape the model was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    values: Vec<FieldValue>,
}

impl FeatureRecord {
    /// Validate a JSON payload into a record
    ///
    /// Each field is looked up by alias first and by internal name second.
    /// Unknown keys are ignored. All field issues are reported together;
    /// exclusivity rules are only checked once every field is valid.
    pub fn from_json(payload: &Value) -> Result<Self, ValidationFailure> {
        let object = payload.as_object().ok_or_else(|| {
            ValidationFailure::new(vec![FieldIssue::at_body(
                "Input should be a valid dictionary or object to extract fields from",
                "model_attributes_type",
            )])
        })?;

        let mut values = Vec::with_capacity(FIELDS.len());
        let mut issues = Vec::new();

        for spec in FIELDS.iter() {
            match resolve(object, spec) {
                Some(raw) => match coerce(spec, raw) {
                    Ok(v) => values.push(v),
                    Err(issue) => issues.push(issue),
                },
                None => match spec.default {
                    Some(default) => values.push(FieldValue::Bool(default)),
                    None => issues.push(FieldIssue::at_field(
                        spec.alias,
                        "Field required",
                        "missing",
                    )),
                },
            }
        }

        if !issues.is_empty() {
            return Err(ValidationFailure::new(issues));
        }

        check_exclusivity(&values)?;

        Ok(Self { values })
    }

    /// Value of a field by alias or internal name
    pub fn get(&self, key: &str) -> Option<FieldValue> {
        schema::position(key).and_then(|idx| self.values.get(idx).copied())
    }

    pub fn year(&self) -> i64 {
        self.int_of(schema::YEAR)
    }

    pub fn month(&self) -> i64 {
        self.int_of(schema::MONTH)
    }

    pub fn gdp_total(&self) -> f64 {
        self.get(schema::GDP_TOTAL)
            .map(|v| v.as_f64())
            .unwrap_or_default()
    }

    pub fn crisis(&self) -> bool {
        self.flag(schema::CRISIS)
    }

    pub fn covid(&self) -> bool {
        self.flag(schema::COVID)
    }

    /// Whether a boolean field is set; false for unknown or non-boolean fields
    pub fn flag(&self, key: &str) -> bool {
        self.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// `(alias, value)` pairs in field-table order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        FIELDS
            .iter()
            .zip(self.values.iter())
            .map(|(spec, value)| (spec.alias, *value))
    }

    /// JSON object keyed by alias
    pub fn to_alias_map(&self) -> Map<String, Value> {
        self.iter()
            .map(|(alias, value)| (alias.to_string(), Value::from(value)))
            .collect()
    }

    fn int_of(&self, key: &str) -> i64 {
        self.get(key).and_then(|v| v.as_i64()).unwrap_or_default()
    }
}

impl Serialize for FeatureRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (alias, value) in self.iter() {
            map.serialize_entry(alias, &value)?;
        }
        map.end()
    }
}

/// Alias wins over the internal name when both are present
fn resolve<'a>(object: &'a Map<String, Value>, spec: &FieldSpec) -> Option<&'a Value> {
    object.get(spec.alias).or_else(|| object.get(spec.name))
}
