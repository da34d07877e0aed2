//! Field origin routing: shared record or translation record?
//!
//! A flat serializer exposes shared and translated fields side by side. The
//! routing table, built once per serializer from model metadata, says which
//! record each field lives on. Reads use a two-step lookup: the record the
//! table points at first, then the other one.

use crate::error::ConfigurationError;
use crate::field::{AttributeSource, FieldSpec, Lookup};
use crate::model::{TranslatableModel, ID_FIELD, MASTER_FIELD};
use crate::record::{Entity, Fields};
use indexmap::IndexMap;
use serde_json::Value;

/// Field names never routed to (or written through) the translation record.
pub const VETO_FIELDS: [&str; 2] = [ID_FIELD, MASTER_FIELD];

/// Which record hosts a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    Shared,
    Translated,
}

/// Locate a field on the model pair.
///
/// Translated if the translation model has it and it is not vetoed, shared
/// if the shared model has it, `None` otherwise.
pub fn locate_field(name: &str, model: &TranslatableModel) -> Option<FieldOrigin> {
    if !VETO_FIELDS.contains(&name) && model.translations().has_field(name) {
        Some(FieldOrigin::Translated)
    } else if model.shared().has_field(name) {
        Some(FieldOrigin::Shared)
    } else {
        None
    }
}

/// Read a field from `first`, falling back to `second` when `first` does not
/// host it.
pub fn lookup_two_step(
    field: &FieldSpec,
    first: &dyn AttributeSource,
    second: Option<&dyn AttributeSource>,
) -> Lookup {
    match field.get_attribute(first) {
        Lookup::NotFound => second
            .map(|record| field.get_attribute(record))
            .unwrap_or(Lookup::NotFound),
        found => found,
    }
}

/// Read a field from the entity, then from its cached translation.
pub fn lookup_on_entity(field: &FieldSpec, entity: &Entity) -> Lookup {
    let translation = entity
        .cached_translation()
        .map(|t| t as &dyn AttributeSource);
    lookup_two_step(field, entity, translation)
}

/// Routing table for one serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRouter {
    routes: IndexMap<String, FieldOrigin>,
    shared_model: String,
    translations_model: String,
}

impl FieldRouter {
    /// Route every given source name.
    ///
    /// # Errors
    /// `ConfigurationError::FieldNotFound` for a name found on neither model.
    pub fn build<'a>(
        model: &TranslatableModel,
        sources: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, ConfigurationError> {
        let mut routes = IndexMap::new();
        for source in sources {
            let origin = locate_field(source, model).ok_or_else(|| {
                ConfigurationError::FieldNotFound {
                    field: source.to_string(),
                    shared: model.shared().name().to_string(),
                    translations: model.translations().name().to_string(),
                }
            })?;
            routes.insert(source.to_string(), origin);
        }

        Ok(Self {
            routes,
            shared_model: model.shared().name().to_string(),
            translations_model: model.translations().name().to_string(),
        })
    }

    pub fn origin(&self, source: &str) -> Option<FieldOrigin> {
        self.routes.get(source).copied()
    }

    pub fn is_translated(&self, source: &str) -> bool {
        self.origin(source) == Some(FieldOrigin::Translated)
    }

    /// Split validated data into (shared, translated) parts.
    pub fn split(&self, data: Fields) -> (Fields, Fields) {
        let mut shared = Fields::new();
        let mut translated = Fields::new();
        for (key, value) in data {
            if self.is_translated(&key) {
                translated.insert(key, value);
            } else {
                shared.insert(key, value);
            }
        }
        (shared, translated)
    }

    /// Read a field's value for output.
    ///
    /// A routed field that neither record holds reads as `null`. A field the
    /// table does not know and no record holds is a configuration error.
    pub fn retrieve(&self, field: &FieldSpec, entity: &Entity) -> Result<Lookup, ConfigurationError> {
        let translation = entity
            .cached_translation()
            .map(|t| t as &dyn AttributeSource);

        let lookup = if self.is_translated(field.source_name()) {
            match translation {
                Some(translation) => {
                    lookup_two_step(field, translation, Some(entity as &dyn AttributeSource))
                }
                None => field.get_attribute(entity),
            }
        } else {
            lookup_two_step(field, entity, translation)
        };

        match lookup {
            Lookup::NotFound if self.origin(field.source_name()).is_some() => {
                Ok(Lookup::Found(Value::Null))
            }
            Lookup::NotFound => Err(ConfigurationError::FieldNotFound {
                field: field.name.clone(),
                shared: self.shared_model.clone(),
                translations: self.translations_model.clone(),
            }),
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ValueKind;
    use crate::i18n::LanguageCode;
    use crate::model::{ModelField, ModelSchema};
    use crate::record::Translation;
    use serde_json::json;

    fn text() -> ValueKind {
        ValueKind::Text { max_length: None }
    }

    fn model() -> TranslatableModel {
        TranslatableModel::new(
            ModelSchema::new("book").field(ModelField::new("isbn", text())),
            ModelSchema::translations_for("book_translation")
                .field(ModelField::new("title", text())),
        )
        .unwrap()
    }

    fn entity_with_cache() -> Entity {
        let mut entity = Entity::with_id(1, json!({"isbn": "978"}).as_object().cloned().unwrap());
        let mut t = Translation::stub(Some(1), LanguageCode::parse("ja").unwrap());
        t.id = Some(5);
        t.fields.insert("title".to_string(), json!("題名"));
        entity.set_cached_translation(Some(t));
        entity
    }

    // ==================== locate_field Tests ====================

    #[test]
    fn test_locate_translated_field() {
        assert_eq!(locate_field("title", &model()), Some(FieldOrigin::Translated));
        assert_eq!(
            locate_field("language_code", &model()),
            Some(FieldOrigin::Translated)
        );
    }

    #[test]
    fn test_locate_shared_field() {
        assert_eq!(locate_field("isbn", &model()), Some(FieldOrigin::Shared));
    }

    #[test]
    fn test_veto_fields_route_to_shared() {
        assert_eq!(locate_field("id", &model()), Some(FieldOrigin::Shared));
        // master only exists on the translation model and is vetoed there
        assert_eq!(locate_field("master", &model()), None);
    }

    #[test]
    fn test_locate_unknown_field() {
        assert_eq!(locate_field("nope", &model()), None);
    }

    // ==================== FieldRouter Tests ====================

    #[test]
    fn test_build_rejects_unknown_field() {
        let result = FieldRouter::build(&model(), ["isbn", "nope"]);
        assert!(matches!(
            result,
            Err(ConfigurationError::FieldNotFound { ref field, .. }) if field == "nope"
        ));
    }

    #[test]
    fn test_split() {
        let router = FieldRouter::build(&model(), ["isbn", "title"]).unwrap();
        let data = json!({"isbn": "1", "title": "T"}).as_object().cloned().unwrap();
        let (shared, translated) = router.split(data);
        assert_eq!(Value::Object(shared), json!({"isbn": "1"}));
        assert_eq!(Value::Object(translated), json!({"title": "T"}));
    }

    #[test]
    fn test_retrieve_from_both_records() {
        let router = FieldRouter::build(&model(), ["id", "isbn", "title", "language_code"]).unwrap();
        let entity = entity_with_cache();

        let get = |name: &str| {
            router
                .retrieve(&FieldSpec::new(name, text()), &entity)
                .unwrap()
        };
        assert_eq!(get("id"), Lookup::Found(json!(1)));
        assert_eq!(get("isbn"), Lookup::Found(json!("978")));
        assert_eq!(get("title"), Lookup::Found(json!("題名")));
        assert_eq!(get("language_code"), Lookup::Found(json!("ja")));
    }

    #[test]
    fn test_retrieve_translated_without_cache_is_null() {
        let router = FieldRouter::build(&model(), ["title"]).unwrap();
        let entity = Entity::with_id(1, Fields::new());
        let lookup = router
            .retrieve(&FieldSpec::new("title", text()), &entity)
            .unwrap();
        assert_eq!(lookup, Lookup::Found(Value::Null));
    }

    #[test]
    fn test_retrieve_unrouted_missing_is_error() {
        let router = FieldRouter::build(&model(), ["isbn"]).unwrap();
        let result = router.retrieve(&FieldSpec::new("ghost", text()), &entity_with_cache());
        assert!(result.is_err());
    }

    #[test]
    fn test_lookup_on_entity_falls_back_to_translation() {
        let entity = entity_with_cache();
        assert_eq!(
            lookup_on_entity(&FieldSpec::new("title", text()), &entity),
            Lookup::Found(json!("題名"))
        );
        assert_eq!(
            lookup_on_entity(&FieldSpec::new("ghost", text()), &entity),
            Lookup::NotFound
        );
    }
}
