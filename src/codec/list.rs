use super::nested::NestedTranslationCodec;
use crate::error::{ErrorDetail, SerializerError, ValidationError};
use crate::i18n::{LanguageCode, LanguageRegistry, OperationContext, TranslationMetrics};
use crate::record::{Entity, Fields, Translation};
use crate::store::{StoreError, TranslationStore};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

/// One language's entry in a validated multi-language payload.
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationPayload {
    /// Validated field values for the language
    Fields(Fields),
    /// The language was sent as `false`: delete its translation
    Delete,
}

impl TranslationPayload {
    pub fn is_delete(&self) -> bool {
        matches!(self, TranslationPayload::Delete)
    }
}

/// Validated multi-language payload, in input order.
pub type TranslationSet = IndexMap<LanguageCode, TranslationPayload>;

/// Codec for the multi-language map `{language_code: translation}`.
#[derive(Debug, Clone)]
pub struct TranslationListCodec {
    child: NestedTranslationCodec,
    registry: Option<LanguageRegistry>,
}

impl TranslationListCodec {
    /// Without a registry, any well-formed language code is accepted.
    pub fn new(child: NestedTranslationCodec, registry: Option<LanguageRegistry>) -> Self {
        Self { child, registry }
    }

    pub fn child(&self) -> &NestedTranslationCodec {
        &self.child
    }

    /// Render every stored translation of `entity`, keyed by language.
    ///
    /// Each translation is rendered with the ambient language switched to it
    /// and with it cached on the entity. Both are put back afterwards.
    pub fn to_representation<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &mut OperationContext,
        entity: &mut Entity,
    ) -> Result<Fields, StoreError> {
        let mut out = Fields::new();
        let Some(id) = entity.id else {
            return Ok(out);
        };

        for translation in store.list_translations(id)? {
            let language = translation.language_code.clone();
            let rendered = ctx.scoped(language.clone(), |_| {
                entity.with_cached_translation(Some(translation), |entity| {
                    self.child.to_representation(entity)
                })
            });
            out.insert(language.into(), Value::Object(rendered));
        }
        Ok(out)
    }

    /// Validate a multi-language payload.
    ///
    /// `instance` is the entity being updated, if any; each language is
    /// validated against that entity's stored translation in the language.
    /// A language sent as `false` is a deletion marker and is not validated.
    /// Errors of all languages are collected and the payload is refused as a
    /// whole if any language failed.
    pub fn to_internal_value<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &mut OperationContext,
        instance: Option<&Entity>,
        raw: &Value,
    ) -> Result<TranslationSet, SerializerError> {
        let Value::Object(map) = raw else {
            return Err(ValidationError::not_a_dict(raw).into());
        };
        if map.is_empty() {
            return Err(ValidationError::no_translation().into());
        }

        let existing: HashMap<LanguageCode, Translation> = match instance.and_then(|e| e.id) {
            Some(id) => store
                .list_translations(id)?
                .into_iter()
                .map(|t| (t.language_code.clone(), t))
                .collect(),
            None => HashMap::new(),
        };

        let mut validated = TranslationSet::new();
        let mut errors: IndexMap<String, ErrorDetail> = IndexMap::new();

        for (key, payload) in map {
            let language = match self.parse_language(key) {
                Ok(language) => language,
                Err(message) => {
                    errors.insert(key.clone(), ErrorDetail::Messages(vec![message]));
                    continue;
                }
            };
            if validated.contains_key(&language) {
                errors.insert(
                    key.clone(),
                    ErrorDetail::Messages(vec![format!("Duplicate language \"{}\".", language)]),
                );
                continue;
            }

            if payload == &Value::Bool(false) {
                validated.insert(language, TranslationPayload::Delete);
                continue;
            }

            let result = ctx.scoped(language.clone(), |ctx| {
                let partial = ctx.is_partial();
                self.child
                    .run_validation(payload, existing.get(&language), partial)
            });
            match result {
                Ok(fields) => {
                    validated.insert(language, TranslationPayload::Fields(fields));
                }
                Err(detail) => {
                    errors.insert(key.clone(), detail);
                }
            }
        }

        if !errors.is_empty() {
            TranslationMetrics::global().record_payload_rejected();
            warn!(
                "Rejected multi-language payload, {} language(s) failed validation",
                errors.len()
            );
            return Err(ValidationError::fields(errors).into());
        }
        Ok(validated)
    }

    fn parse_language(&self, key: &str) -> Result<LanguageCode, String> {
        let language =
            LanguageCode::parse(key).map_err(|_| format!("\"{}\" is not a valid language code.", key))?;
        match &self.registry {
            Some(registry) if !registry.is_supported(&language) => {
                Err(format!("\"{}\" is not a supported language.", key))
            }
            _ => Ok(language),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::field::ValueKind;
    use crate::model::{ModelField, ModelSchema, TranslatableModel};
    use crate::store::MemoryStore;
    use serde_json::json;

    fn code(raw: &str) -> LanguageCode {
        LanguageCode::parse(raw).unwrap()
    }

    fn codec() -> TranslationListCodec {
        let model = TranslatableModel::new(
            ModelSchema::new("book"),
            ModelSchema::translations_for("book_translation")
                .field(ModelField::new("title", ValueKind::Text { max_length: Some(10) })),
        )
        .unwrap();
        let registry = LanguageRegistry::from_codes("en", ["en", "ja", "fr"]).unwrap();
        TranslationListCodec::new(NestedTranslationCodec::new(&model, &[]), Some(registry))
    }

    /// Store holding one entity translated into English and Japanese
    fn seeded() -> (MemoryStore, Entity) {
        let store = MemoryStore::new();
        let id = store.insert_entity(&Fields::new()).unwrap();
        for (language, title) in [("en", "One"), ("ja", "一")] {
            let mut t = Translation::stub(Some(id), code(language));
            t.fields.insert("title".to_string(), json!(title));
            store.insert_translation(&t).unwrap();
        }
        let entity = store.load_entity(id).unwrap();
        (store, entity)
    }

    // ==================== Serialization Tests ====================

    #[test]
    fn test_renders_every_translation() {
        let (store, mut entity) = seeded();
        let mut ctx = OperationContext::new(code("fr"));

        let out = codec().to_representation(&store, &mut ctx, &mut entity).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"en": {"title": "One"}, "ja": {"title": "一"}})
        );
    }

    #[test]
    fn test_render_restores_language_and_cache() {
        let (store, mut entity) = seeded();
        let cached = Translation::stub(entity.id, code("fr"));
        entity.set_cached_translation(Some(cached.clone()));
        let mut ctx = OperationContext::new(code("fr"));

        codec().to_representation(&store, &mut ctx, &mut entity).unwrap();

        assert_eq!(ctx.current_language(), &code("fr"));
        assert_eq!(entity.cached_translation(), Some(&cached));
    }

    #[test]
    fn test_unsaved_entity_renders_empty_map() {
        let store = MemoryStore::new();
        let mut entity = Entity::new(Fields::new());
        let mut ctx = OperationContext::new(code("en"));
        let out = codec().to_representation(&store, &mut ctx, &mut entity).unwrap();
        assert!(out.is_empty());
    }

    // ==================== Deserialization Tests ====================

    #[test]
    fn test_rejects_non_object() {
        let store = MemoryStore::new();
        let mut ctx = OperationContext::new(code("en"));
        let err = codec()
            .to_internal_value(&store, &mut ctx, None, &json!(["en"]))
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().code, ErrorCode::NotADict);
    }

    #[test]
    fn test_rejects_empty_object() {
        let store = MemoryStore::new();
        let mut ctx = OperationContext::new(code("en"));
        let err = codec()
            .to_internal_value(&store, &mut ctx, None, &json!({}))
            .unwrap_err();
        assert_eq!(err.as_validation().unwrap().code, ErrorCode::NoTranslation);
    }

    #[test]
    fn test_keeps_input_order_and_deletion_markers() {
        let (store, entity) = seeded();
        let mut ctx = OperationContext::new(code("en"));
        let set = codec()
            .to_internal_value(
                &store,
                &mut ctx,
                Some(&entity),
                &json!({"ja": {"title": "二"}, "fr": false, "en": {"title": "Two"}}),
            )
            .unwrap();

        let keys: Vec<&str> = set.keys().map(|l| l.as_str()).collect();
        assert_eq!(keys, vec!["ja", "fr", "en"]);
        assert!(set[&code("fr")].is_delete());
    }

    #[test]
    fn test_aggregates_errors_by_language() {
        let store = MemoryStore::new();
        let mut ctx = OperationContext::new(code("en"));
        let err = codec()
            .to_internal_value(
                &store,
                &mut ctx,
                None,
                &json!({"en": {"title": "fine"}, "ja": {}, "xx-invalid-code-!": {}, "de": {"title": "x"}}),
            )
            .unwrap_err();

        let detail = &err.as_validation().unwrap().detail;
        assert!(detail.get("en").is_none());
        assert_eq!(
            detail.get("ja").and_then(|d| d.get("title")).unwrap().messages(),
            &["This field is required.".to_string()]
        );
        assert!(detail.get("xx-invalid-code-!").is_some());
        assert_eq!(
            detail.get("de").unwrap().messages(),
            &["\"de\" is not a supported language.".to_string()]
        );
    }

    #[test]
    fn test_duplicate_after_normalization() {
        let store = MemoryStore::new();
        let mut ctx = OperationContext::new(code("en"));
        let err = codec()
            .to_internal_value(
                &store,
                &mut ctx,
                None,
                &json!({"ja": {"title": "一"}, "JA": {"title": "二"}}),
            )
            .unwrap_err();
        assert!(err.as_validation().unwrap().detail.get("JA").is_some());
    }

    #[test]
    fn test_partial_update_of_existing_language_needs_no_required_fields() {
        let (store, entity) = seeded();
        let mut ctx = OperationContext::new(code("en")).with_partial(true);
        let set = codec()
            .to_internal_value(&store, &mut ctx, Some(&entity), &json!({"ja": {}}))
            .unwrap();
        assert_eq!(set[&code("ja")], TranslationPayload::Fields(Fields::new()));

        // a language the entity does not have yet still needs them
        let err = codec()
            .to_internal_value(&store, &mut ctx, Some(&entity), &json!({"fr": {}}))
            .unwrap_err();
        assert!(err.as_validation().unwrap().detail.get("fr").is_some());
    }

    #[test]
    fn test_validation_restores_ambient_language() {
        let store = MemoryStore::new();
        let mut ctx = OperationContext::new(code("en"));
        codec()
            .to_internal_value(&store, &mut ctx, None, &json!({"ja": {"title": "一"}}))
            .unwrap();
        assert_eq!(ctx.current_language(), &code("en"));
    }
}
