//! Entity and translation records.

use crate::field::AttributeSource;
use crate::i18n::LanguageCode;
use crate::model::{ID_FIELD, LANGUAGE_CODE_FIELD, MASTER_FIELD};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field values of one record, in declaration or payload order.
pub type Fields = serde_json::Map<String, Value>;

/// One language's translated fields for an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    /// Store identity, `None` until persisted
    pub id: Option<i64>,

    /// Owning entity, `None` while the entity itself is unsaved
    pub master_id: Option<i64>,

    pub language_code: LanguageCode,

    pub fields: Fields,
}

impl Translation {
    /// An unsaved translation bound to an entity and a language.
    pub fn stub(master_id: Option<i64>, language_code: LanguageCode) -> Self {
        Self {
            id: None,
            master_id,
            language_code,
            fields: Fields::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl AttributeSource for Translation {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            ID_FIELD => Some(self.id.map(Value::from).unwrap_or(Value::Null)),
            MASTER_FIELD | "master_id" => Some(self.master_id.map(Value::from).unwrap_or(Value::Null)),
            LANGUAGE_CODE_FIELD => Some(Value::from(self.language_code.as_str())),
            _ => self.fields.get(name).cloned(),
        }
    }
}

/// The shared (language-independent) record.
///
/// Besides its own fields an entity carries the translation currently
/// considered active for field access (see `cache`). That slot is operation
/// state, not data: it is never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: Option<i64>,
    pub fields: Fields,
    pub(crate) cached: Option<Translation>,
}

impl Entity {
    /// An unsaved entity.
    pub fn new(fields: Fields) -> Self {
        Self {
            id: None,
            fields,
            cached: None,
        }
    }

    /// An entity loaded from the store.
    pub fn with_id(id: i64, fields: Fields) -> Self {
        Self {
            id: Some(id),
            fields,
            cached: None,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl AttributeSource for Entity {
    fn attribute(&self, name: &str) -> Option<Value> {
        match name {
            ID_FIELD => Some(self.id.map(Value::from).unwrap_or(Value::Null)),
            _ => self.fields.get(name).cloned(),
        }
    }
}
