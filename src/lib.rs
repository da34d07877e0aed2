//! Translation-aware serializers.
//!
//! Entities keep their language-independent fields on a shared record and
//! their per-language fields on translation records, one per language. The
//! serializers here expose such entities either flat (one language at a
//! time) or as a `{language_code: translation}` map, and write payloads of
//! either shape back through a [`store::TranslationStore`].

pub mod cache;
pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod i18n;
pub mod model;
pub mod reconcile;
pub mod record;
pub mod resolver;
pub mod router;
pub mod serializer;
pub mod store;

pub use error::{ConfigurationError, ErrorCode, ErrorDetail, SerializerError, ValidationError};
pub use i18n::{LanguageCode, LanguageRegistry, OperationContext};
pub use model::{ModelField, ModelSchema, Relation, TranslatableModel};
pub use record::{Entity, Fields, Translation};
pub use serializer::{SerializerOptions, TranslatableSerializer, ValidatedPayload};
pub use store::{MemoryStore, SqliteStore, StoreError, TranslationStore};
