//! Per-field (de)serialization.
//!
//! Each declared field knows how to fetch its value from a record, render it
//! and validate incoming data. Codecs only decide *which* record a field is
//! read from and written to; value handling lives here.

use crate::error::{ErrorDetail, MSG_NULL, MSG_REQUIRED};
use crate::model::ModelField;
use crate::record::Fields;
use indexmap::IndexMap;
use serde_json::{Number, Value};

/// Value type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueKind {
    Text { max_length: Option<usize> },
    Integer,
    Float,
    Boolean,
    /// Any JSON value, passed through untouched
    Json,
}

/// Outcome of fetching a field's value from a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Found(Value),
    /// The record does not host this field
    NotFound,
    /// The field is intentionally left out of the representation
    Skip,
}

/// A record whose attributes can be read by name.
pub trait AttributeSource {
    /// `None` when the record has no such attribute; `Some(Value::Null)` when
    /// it has one and it is empty.
    fn attribute(&self, name: &str) -> Option<Value>;
}

/// A declared serializer field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    /// Attribute name on the record when it differs from `name`
    pub source: Option<String>,
    pub kind: ValueKind,
    pub required: bool,
    pub read_only: bool,
    pub write_only: bool,
    pub allow_null: bool,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            source: None,
            kind,
            required: true,
            read_only: false,
            write_only: false,
            allow_null: false,
        }
    }

    /// Field derived from model metadata. Primary keys become read-only.
    pub fn from_model_field(field: &ModelField) -> Self {
        Self {
            name: field.name.clone(),
            source: None,
            kind: field.value.clone(),
            required: field.required && !field.primary_key,
            read_only: field.primary_key,
            write_only: false,
            allow_null: field.nullable,
        }
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self.required = false;
        self
    }

    pub fn write_only(mut self) -> Self {
        self.write_only = true;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Attribute name this field reads and writes.
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Fetch the field's value from a record.
    pub fn get_attribute(&self, record: &dyn AttributeSource) -> Lookup {
        if self.write_only {
            return Lookup::Skip;
        }
        match record.attribute(self.source_name()) {
            Some(value) => Lookup::Found(value),
            None => Lookup::NotFound,
        }
    }

    /// Render a stored value for output.
    pub fn to_representation(&self, value: &Value) -> Value {
        match (&self.kind, value) {
            (_, Value::Null) => Value::Null,
            (ValueKind::Text { .. }, Value::String(_)) => value.clone(),
            (ValueKind::Text { .. }, other) => Value::String(other.to_string()),
            (ValueKind::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| value.clone()),
            _ => value.clone(),
        }
    }

    /// Validate and coerce one incoming value.
    pub fn run_validation(&self, raw: &Value) -> Result<Value, Vec<String>> {
        if raw.is_null() {
            return if self.allow_null {
                Ok(Value::Null)
            } else {
                Err(vec![MSG_NULL.to_string()])
            };
        }

        match &self.kind {
            ValueKind::Text { max_length } => {
                let text = match raw {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    _ => return Err(vec!["Not a valid string.".to_string()]),
                };
                match max_length {
                    Some(max) if text.chars().count() > *max => Err(vec![format!(
                        "Ensure this field has no more than {} characters.",
                        max
                    )]),
                    _ => Ok(Value::String(text)),
                }
            }
            ValueKind::Integer => parse_integer(raw)
                .map(Value::from)
                .ok_or_else(|| vec!["A valid integer is required.".to_string()]),
            ValueKind::Float => parse_float(raw)
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| vec!["A valid number is required.".to_string()]),
            ValueKind::Boolean => parse_boolean(raw)
                .map(Value::Bool)
                .ok_or_else(|| vec!["Must be a valid boolean.".to_string()]),
            ValueKind::Json => Ok(raw.clone()),
        }
    }
}

fn parse_integer(raw: &Value) -> Option<i64> {
    match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole_float_to_i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A whole float inside the `i64` range. `i64::MAX as f64` rounds up to 2^63,
/// so the upper bound is exclusive.
fn whole_float_to_i64(f: f64) -> Option<i64> {
    let in_range = (i64::MIN as f64..i64::MAX as f64).contains(&f);
    (in_range && f.fract() == 0.0).then(|| f as i64)
}

fn parse_float(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_boolean(raw: &Value) -> Option<bool> {
    match raw {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" | "1" => Some(true),
            "false" | "f" | "no" | "n" | "off" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Validate a payload against a field list.
///
/// Read-only fields and unknown keys are ignored. Missing required fields
/// are reported only when `require_missing` is set (i.e. not on partial
/// updates). Validated values are keyed by source name; errors by field name.
pub fn validate_fields(
    specs: &[FieldSpec],
    data: &Fields,
    require_missing: bool,
) -> Result<Fields, IndexMap<String, ErrorDetail>> {
    let mut validated = Fields::new();
    let mut errors = IndexMap::new();

    for spec in specs.iter().filter(|spec| !spec.read_only) {
        match data.get(&spec.name) {
            Some(raw) => match spec.run_validation(raw) {
                Ok(value) => {
                    validated.insert(spec.source_name().to_string(), value);
                }
                Err(messages) => {
                    errors.insert(spec.name.clone(), ErrorDetail::Messages(messages));
                }
            },
            None if spec.required && require_missing => {
                errors.insert(
                    spec.name.clone(),
                    ErrorDetail::Messages(vec![MSG_REQUIRED.to_string()]),
                );
            }
            None => {}
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(errors)
    }
}
