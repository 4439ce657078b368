//! Input validation for feature records
//!
//! Field-level checks coerce each JSON value to the type declared in the
//! field table and collect every failure. Cross-field exclusivity rules run
//! only once all fields are well-formed, and stop at the first violation.

use serde::Serialize;
use serde_json::Value;
use std::num::IntErrorKind;
use thiserror::Error;

use crate::schema::{ExclusiveGroup, FieldKind, FieldSpec};

/// Location root for request-body issues
pub const BODY: &str = "body";

/// A single validation problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    /// Path to the offending value, starting at `body`
    pub loc: Vec<String>,
    /// Human-readable message
    pub msg: String,
    /// Machine-readable issue type
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldIssue {
    pub fn new(loc: Vec<String>, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            loc,
            msg: msg.into(),
            kind: kind.into(),
        }
    }

    /// Issue attached to a named field
    pub fn at_field(alias: &str, msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(vec![BODY.to_string(), alias.to_string()], msg, kind)
    }

    /// Issue attached to the whole body
    pub fn at_body(msg: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(vec![BODY.to_string()], msg, kind)
    }
}

/// Validation failed; carries every issue found
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Validation failed: {}", summarize(.issues))]
pub struct ValidationFailure {
    pub issues: Vec<FieldIssue>,
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.loc.join("."), i.msg))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationFailure {
    pub fn new(issues: Vec<FieldIssue>) -> Self {
        Self { issues }
    }

    /// Failure for a violated exclusivity group
    pub fn exclusivity(group: ExclusiveGroup) -> Self {
        Self::new(vec![FieldIssue::at_body(
            format!("Value error, {}", group.violation_message()),
            "value_error",
        )])
    }

    /// True if any issue mentions the given text
    pub fn mentions(&self, text: &str) -> bool {
        self.issues.iter().any(|i| i.msg.contains(text))
    }
}

/// Coerced scalar value of a field
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    /// Numeric view used by models (`true` is 1.0)
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::Int(v) => v as f64,
            FieldValue::Float(v) => v,
            FieldValue::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            FieldValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Int(v) => Some(v),
            _ => None,
        }
    }
}

impl From<FieldValue> for Value {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Int(v) => Value::from(v),
            FieldValue::Float(v) => Value::from(v),
            FieldValue::Bool(v) => Value::from(v),
        }
    }
}

/// Coerce one JSON value to the kind declared by `spec`
pub fn coerce(spec: &FieldSpec, value: &Value) -> Result<FieldValue, FieldIssue> {
    match spec.kind {
        FieldKind::Int { min, max } => {
            let v = coerce_int(spec, value)?;
            if let Some(min) = min {
                if v < min {
                    return Err(FieldIssue::at_field(
                        spec.alias,
                        format!("Input should be greater than or equal to {}", min),
                        "greater_than_equal",
                    ));
                }
            }
            if let Some(max) = max {
                if v > max {
                    return Err(FieldIssue::at_field(
                        spec.alias,
                        format!("Input should be less than or equal to {}", max),
                        "less_than_equal",
                    ));
                }
            }
            Ok(FieldValue::Int(v))
        }
        FieldKind::Float => coerce_float(spec, value).map(FieldValue::Float),
        FieldKind::Bool => coerce_bool(spec, value).map(FieldValue::Bool),
    }
}

fn coerce_int(spec: &FieldSpec, value: &Value) -> Result<i64, FieldIssue> {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                return Ok(v);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() != 0.0 => Err(FieldIssue::at_field(
                    spec.alias,
                    "Input should be a valid integer, got a number with a fractional part",
                    "int_from_float",
                )),
                Some(f) if f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
                _ => Err(int_size_issue(spec)),
            }
        }
        Value::String(s) => {
            let s = s.trim();
            // "2020.0" is accepted as 2020
            let digits = match s.split_once('.') {
                Some((whole, frac)) if !frac.is_empty() && frac.bytes().all(|b| b == b'0') => {
                    whole
                }
                _ => s,
            };
            digits.parse::<i64>().map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => int_size_issue(spec),
                _ => FieldIssue::at_field(
                    spec.alias,
                    "Input should be a valid integer, unable to parse string as an integer",
                    "int_parsing",
                ),
            })
        }
        _ => Err(FieldIssue::at_field(
            spec.alias,
            "Input should be a valid integer",
            "int_type",
        )),
    }
}

fn int_size_issue(spec: &FieldSpec) -> FieldIssue {
    FieldIssue::at_field(
        spec.alias,
        "Input should be a valid integer, unable to parse number as an integer",
        "int_parsing_size",
    )
}

fn coerce_float(spec: &FieldSpec, value: &Value) -> Result<f64, FieldIssue> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => {
            return Err(FieldIssue::at_field(
                spec.alias,
                "Input should be a valid number",
                "float_type",
            ))
        }
    };

    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FieldIssue::at_field(
            spec.alias,
            "Input should be a valid number, unable to parse string as a number",
            "float_parsing",
        )),
    }
}

fn coerce_bool(spec: &FieldSpec, value: &Value) -> Result<bool, FieldIssue> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 0.0 => Ok(false),
            Some(f) if f == 1.0 => Ok(true),
            _ => Err(FieldIssue::at_field(
                spec.alias,
                "Input should be a valid boolean",
                "bool_parsing",
            )),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" | "t" | "y" => Ok(true),
            "false" | "0" | "no" | "off" | "f" | "n" => Ok(false),
            _ => Err(FieldIssue::at_field(
                spec.alias,
                "Input should be a valid boolean, unable to interpret input",
                "bool_parsing",
            )),
        },
        _ => Err(FieldIssue::at_field(
            spec.alias,
            "Input should be a valid boolean",
            "bool_type",
        )),
    }
}

/// First exclusivity group with more than one member set, if any
pub fn check_exclusivity(values: &[FieldValue]) -> Result<(), ValidationFailure> {
    for group in ExclusiveGroup::ALL {
        let selected = group
            .members()
            .filter(|(idx, _)| {
                values
                    .get(*idx)
                    .and_then(FieldValue::as_bool)
                    .unwrap_or(false)
            })
            .count();

        if selected > 1 {
            return Err(ValidationFailure::exclusivity(group));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::lookup;
    use serde_json::json;

    #[test]
    fn test_month_bounds() {
        let spec = lookup("MES").unwrap();
        assert_eq!(coerce(spec, &json!(1)).unwrap(), FieldValue::Int(1));
        assert_eq!(coerce(spec, &json!(12)).unwrap(), FieldValue::Int(12));

        let low = coerce(spec, &json!(0)).unwrap_err();
        assert_eq!(low.kind, "greater_than_equal");
        assert_eq!(low.loc, vec!["body", "MES"]);

        let high = coerce(spec, &json!(13)).unwrap_err();
        assert_eq!(high.kind, "less_than_equal");
    }

    #[test]
    fn test_int_coercion() {
        let spec = lookup("AÑO").unwrap();
        assert_eq!(coerce(spec, &json!("2020")).unwrap(), FieldValue::Int(2020));
        assert_eq!(coerce(spec, &json!(2020.0)).unwrap(), FieldValue::Int(2020));
        assert_eq!(
            coerce(spec, &json!(2020.5)).unwrap_err().kind,
            "int_from_float"
        );
        assert_eq!(coerce(spec, &json!("abc")).unwrap_err().kind, "int_parsing");
        assert_eq!(coerce(spec, &json!(null)).unwrap_err().kind, "int_type");
        assert_eq!(coerce(spec, &json!("2020.0")).unwrap(), FieldValue::Int(2020));
        assert_eq!(coerce(spec, &json!("2020.5")).unwrap_err().kind, "int_parsing");
    }

    #[test]
    fn test_int_out_of_range_is_rejected() {
        let spec = lookup("AÑO").unwrap();
        let huge: Value = serde_json::from_str("18446744073709551615").unwrap();
        assert_eq!(coerce(spec, &huge).unwrap_err().kind, "int_parsing_size");

        let float: Value = serde_json::from_str("1e20").unwrap();
        assert_eq!(coerce(spec, &float).unwrap_err().kind, "int_parsing_size");

        assert_eq!(
            coerce(spec, &json!("99999999999999999999")).unwrap_err().kind,
            "int_parsing_size"
        );
        assert_eq!(
            coerce(spec, &json!(i64::MAX)).unwrap(),
            FieldValue::Int(i64::MAX)
        );
    }

    #[test]
    fn test_float_coercion() {
        let spec = lookup("PIB_TOTAL").unwrap();
        assert_eq!(coerce(spec, &json!(42)).unwrap(), FieldValue::Float(42.0));
        assert_eq!(coerce(spec, &json!("1.5")).unwrap(), FieldValue::Float(1.5));
        assert_eq!(coerce(spec, &json!(true)).unwrap_err().kind, "float_type");
        assert_eq!(coerce(spec, &json!("x")).unwrap_err().kind, "float_parsing");
    }

    #[test]
    fn test_bool_coercion() {
        let spec = lookup("CRISIS").unwrap();
        assert_eq!(coerce(spec, &json!(true)).unwrap(), FieldValue::Bool(true));
        assert_eq!(coerce(spec, &json!(0)).unwrap(), FieldValue::Bool(false));
        assert_eq!(coerce(spec, &json!(1.0)).unwrap(), FieldValue::Bool(true));
        assert_eq!(coerce(spec, &json!(0.0)).unwrap(), FieldValue::Bool(false));
        assert_eq!(coerce(spec, &json!(0.5)).unwrap_err().kind, "bool_parsing");
        assert_eq!(coerce(spec, &json!("Yes")).unwrap(), FieldValue::Bool(true));
        assert_eq!(coerce(spec, &json!("off")).unwrap(), FieldValue::Bool(false));
        assert_eq!(coerce(spec, &json!(2)).unwrap_err().kind, "bool_parsing");
        assert_eq!(coerce(spec, &json!([])).unwrap_err().kind, "bool_type");
    }

    #[test]
    fn test_exclusivity_failure_message() {
        let err = ValidationFailure::exclusivity(ExclusiveGroup::Island);
        assert!(err.mentions("más de una isla"));
        assert_eq!(err.issues[0].loc, vec!["body"]);
        assert_eq!(err.issues[0].kind, "value_error");
    }

    #[test]
    fn test_failure_display() {
        let err = ValidationFailure::new(vec![FieldIssue::at_field(
            "MES",
            "Field required",
            "missing",
        )]);
        assert_eq!(err.to_string(), "Validation failed: body.MES: Field required");
    }

    #[test]
    fn test_field_value_numeric_view() {
        assert_eq!(FieldValue::Bool(true).as_f64(), 1.0);
        assert_eq!(FieldValue::Bool(false).as_f64(), 0.0);
        assert_eq!(FieldValue::Int(3).as_f64(), 3.0);
        assert_eq!(FieldValue::Float(2.5).as_f64(), 2.5);
    }
}
