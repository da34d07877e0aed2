//! Error types shared by the codecs.
//!
//! - `ConfigurationError`: the serializer or schema is set up wrong (fatal)
//! - `ValidationError`: the payload is wrong; carries a field/language keyed detail tree
//! - `StoreError` (see `store`): passed through untouched
//! - `SerializerError`: union of the above returned by write operations

use crate::store::StoreError;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Key used for errors that are not tied to a single field.
pub const NON_FIELD_ERRORS_KEY: &str = "non_field_errors";

pub(crate) const MSG_ENFORCE_VIOLATION: &str =
    "Sending a language_code is invalid on serializers that enforce a language";
pub(crate) const MSG_NO_TRANSLATION: &str = "At least one translation must be provided.";
pub(crate) const MSG_REQUIRED: &str = "This field is required.";
pub(crate) const MSG_NULL: &str = "This field may not be null.";

/// Build the `not_a_dict` message for a multi-language payload.
pub(crate) fn not_a_dict_message(value: &Value) -> String {
    format!(
        "Expected a dictionary of items, but got a {}.",
        json_type_name(value)
    )
}

/// Build the message used when an object payload was expected.
pub(crate) fn invalid_data_message(value: &Value) -> String {
    format!(
        "Invalid data. Expected a dictionary, but got {}.",
        json_type_name(value)
    )
}

/// Name of a JSON value's type as shown in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Structured validation detail.
///
/// Serializes to the usual REST shape: a list of messages, or an object
/// keyed by field name or language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetail {
    Messages(Vec<String>),
    Nested(IndexMap<String, ErrorDetail>),
}

impl ErrorDetail {
    /// A single non-field message: `{"non_field_errors": [message]}`.
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut map = IndexMap::new();
        map.insert(
            NON_FIELD_ERRORS_KEY.to_string(),
            ErrorDetail::Messages(vec![message.into()]),
        );
        ErrorDetail::Nested(map)
    }

    /// Look up a nested entry by key.
    pub fn get(&self, key: &str) -> Option<&ErrorDetail> {
        match self {
            ErrorDetail::Nested(map) => map.get(key),
            ErrorDetail::Messages(_) => None,
        }
    }

    /// Messages stored directly at this level (empty for nested details).
    pub fn messages(&self) -> &[String] {
        match self {
            ErrorDetail::Messages(messages) => messages,
            ErrorDetail::Nested(_) => &[],
        }
    }

    /// Render as a JSON value.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

/// Machine-readable reason attached to a `ValidationError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Field-level failures, possibly aggregated across languages
    Invalid,
    /// A payload named a language while the operation enforces one
    EnforceViolation,
    /// A multi-language payload was not a JSON object
    NotADict,
    /// A multi-language payload contained no language
    NoTranslation,
}

/// A payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Validation failed ({code:?}): {detail}")]
pub struct ValidationError {
    pub code: ErrorCode,
    pub detail: ErrorDetail,
}

impl ValidationError {
    pub fn new(code: ErrorCode, detail: ErrorDetail) -> Self {
        Self { code, detail }
    }

    /// Field-keyed failures.
    pub fn fields(errors: IndexMap<String, ErrorDetail>) -> Self {
        Self::new(ErrorCode::Invalid, ErrorDetail::Nested(errors))
    }

    pub fn enforce_violation() -> Self {
        Self::new(
            ErrorCode::EnforceViolation,
            ErrorDetail::non_field(MSG_ENFORCE_VIOLATION),
        )
    }

    pub fn not_a_dict(value: &Value) -> Self {
        Self::new(
            ErrorCode::NotADict,
            ErrorDetail::non_field(not_a_dict_message(value)),
        )
    }

    pub fn no_translation() -> Self {
        Self::new(
            ErrorCode::NoTranslation,
            ErrorDetail::non_field(MSG_NO_TRANSLATION),
        )
    }
}

/// The serializer or schema is misconfigured.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Field '{field}' exists neither on '{shared}' nor on its translation model '{translations}'")]
    FieldNotFound {
        field: String,
        shared: String,
        translations: String,
    },

    #[error("These fields are not allowed in data: {}", .0.join(", "))]
    VetoedFields(Vec<String>),

    #[error("Translation model '{model}' is missing required field '{field}'")]
    MissingTranslationField { model: String, field: String },

    #[error("Field '{field}' is defined on both '{shared}' and its translation model")]
    AmbiguousField { field: String, shared: String },

    #[error("Entity has no active translation to write to")]
    NoActiveTranslation,

    #[error("Invalid serializer options: {0}")]
    InvalidOptions(String),
}

/// Any failure of a serializer operation.
#[derive(Debug, Error)]
pub enum SerializerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SerializerError {
    /// The validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            SerializerError::Validation(err) => Some(err),
            _ => None,
        }
    }
}
