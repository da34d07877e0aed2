use crate::error::{ErrorDetail, SerializerError, ValidationError};
use crate::field::{validate_fields, FieldSpec, Lookup};
use crate::i18n::{LanguageCode, LanguageRegistry, OperationContext};
use crate::model::LANGUAGE_CODE_FIELD;
use crate::record::{Entity, Fields, Translation};
use crate::resolver::load_translation;
use crate::router::FieldRouter;
use crate::store::{save_translation, TranslationStore};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

/// Which language a validated single-language payload targets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguageSelection {
    /// The payload named no language
    #[default]
    Unspecified,
    /// The operation enforces the ambient language
    Ambient,
    /// A specific language, from the payload or an enforced override
    Explicit(LanguageCode),
}

/// Output of single-language validation: field values keyed by source name
/// plus the selected language.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidatedData {
    pub fields: Fields,
    pub language: LanguageSelection,
}

impl ValidatedData {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            language: LanguageSelection::Unspecified,
        }
    }
}

/// Codec exposing shared and translated fields side by side, in one
/// language at a time.
#[derive(Debug, Clone)]
pub struct SingleLanguageCodec {
    fields: Vec<FieldSpec>,
    router: FieldRouter,
    registry: Option<LanguageRegistry>,
    /// Whether translated fields are exposed (and a language resolved)
    language_aware: bool,
}

impl SingleLanguageCodec {
    pub fn new(
        fields: Vec<FieldSpec>,
        router: FieldRouter,
        registry: Option<LanguageRegistry>,
        language_aware: bool,
    ) -> Self {
        Self {
            fields,
            router,
            registry,
            language_aware,
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn router(&self) -> &FieldRouter {
        &self.router
    }

    pub fn is_language_aware(&self) -> bool {
        self.language_aware
    }

    /// Render `entity` in the operation's effective language.
    ///
    /// The translation is resolved and cached for the duration of the call;
    /// the entity's previous cache is restored afterwards.
    pub fn to_representation<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OperationContext,
        entity: &mut Entity,
    ) -> Result<Fields, SerializerError> {
        if !self.language_aware {
            return self.render(entity);
        }

        let translation =
            load_translation(store, entity, ctx.effective_language(), ctx.is_enforced())?;
        let rendered = entity.with_cached_translation(Some(translation), |entity| self.render(entity))?;
        Ok(rendered)
    }

    fn render(&self, entity: &Entity) -> Result<Fields, SerializerError> {
        let mut out = Fields::new();
        for field in &self.fields {
            match self.router.retrieve(field, entity)? {
                Lookup::Skip => continue,
                Lookup::Found(value) => {
                    out.insert(field.name.clone(), field.to_representation(&value));
                }
                Lookup::NotFound => {
                    out.insert(field.name.clone(), Value::Null);
                }
            }
        }
        Ok(out)
    }

    /// Refuse a payload naming a language when the operation enforces one.
    ///
    /// Runs before field validation, so an unsupported or malformed
    /// `language_code` is reported as an enforce violation too.
    pub fn check_enforced(&self, ctx: &OperationContext, data: &Fields) -> Result<(), ValidationError> {
        if self.language_aware && ctx.is_enforced() && data.contains_key(LANGUAGE_CODE_FIELD) {
            return Err(ValidationError::enforce_violation());
        }
        Ok(())
    }

    /// Field-level validation of a flat payload.
    ///
    /// With `skip_translated`, translated fields (`language_code` included)
    /// are treated as read-only. A `language_code` value is checked against
    /// the registry and moved out of the fields into the language selection.
    pub fn to_internal_value(
        &self,
        data: &Fields,
        partial: bool,
        skip_translated: bool,
    ) -> Result<ValidatedData, IndexMap<String, ErrorDetail>> {
        let specs: Vec<FieldSpec> = self
            .fields
            .iter()
            .filter(|spec| !(skip_translated && self.router.is_translated(spec.source_name())))
            .cloned()
            .collect();

        let mut fields = validate_fields(&specs, data, !partial)?;

        let language = match fields.remove(LANGUAGE_CODE_FIELD) {
            None => LanguageSelection::Unspecified,
            Some(raw) => {
                let language = self.parse_language(&raw).map_err(|message| {
                    let mut errors = IndexMap::new();
                    errors.insert(
                        LANGUAGE_CODE_FIELD.to_string(),
                        ErrorDetail::Messages(vec![message]),
                    );
                    errors
                })?;
                LanguageSelection::Explicit(language)
            }
        };

        Ok(ValidatedData { fields, language })
    }

    fn parse_language(&self, raw: &Value) -> Result<LanguageCode, String> {
        let invalid = || format!("\"{}\" is not a valid choice.", raw.as_str().unwrap_or_default());
        let code = raw.as_str().ok_or_else(invalid)?;
        match &self.registry {
            Some(registry) => registry.get_by_code(code).cloned().ok_or_else(invalid),
            None => LanguageCode::parse(code).map_err(|_| invalid()),
        }
    }

    /// Object-level validation.
    ///
    /// An enforcing operation refuses payloads that name a language, and
    /// pins the payload to its own language instead.
    pub fn validate(
        &self,
        ctx: &OperationContext,
        mut data: ValidatedData,
    ) -> Result<ValidatedData, ValidationError> {
        if !self.language_aware || !ctx.is_enforced() {
            return Ok(data);
        }
        if data.language != LanguageSelection::Unspecified {
            return Err(ValidationError::enforce_violation());
        }
        data.language = match ctx.language_override() {
            Some(language) => LanguageSelection::Explicit(language.clone()),
            None => LanguageSelection::Ambient,
        };
        Ok(data)
    }

    /// Create an entity and its first translation.
    ///
    /// The translation is in the selected language, or the ambient language
    /// when none was selected. It stays cached on the returned entity.
    pub fn create<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OperationContext,
        data: ValidatedData,
    ) -> Result<Entity, SerializerError> {
        let language = match data.language {
            LanguageSelection::Explicit(language) => language,
            LanguageSelection::Ambient | LanguageSelection::Unspecified => {
                ctx.current_language().clone()
            }
        };

        let (shared, translated) = self.router.split(data.fields);
        let id = store.insert_entity(&shared)?;
        let mut entity = Entity::with_id(id, shared);

        let mut translation = Translation::stub(Some(id), language);
        translation.fields = translated;
        save_translation(store, &mut translation)?;
        debug!(
            "Created entity {} with '{}' translation",
            id, translation.language_code
        );

        entity.set_cached_translation(Some(translation));
        Ok(entity)
    }

    /// Update an entity and one of its translations.
    ///
    /// A selected language is enforced; otherwise the cached translation (or
    /// the ambient one) is written. The written translation stays cached.
    pub fn update<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OperationContext,
        entity: &mut Entity,
        data: ValidatedData,
    ) -> Result<(), SerializerError> {
        let (shared, translated) = self.router.split(data.fields);

        let id = match entity.id {
            Some(id) => id,
            None => {
                let id = store.insert_entity(&entity.fields)?;
                entity.id = Some(id);
                id
            }
        };
        entity.fields.extend(shared);
        store.update_entity(id, &entity.fields)?;

        let (language, enforce) = match data.language {
            LanguageSelection::Explicit(language) => (language, true),
            LanguageSelection::Ambient => (ctx.current_language().clone(), true),
            LanguageSelection::Unspecified if !self.language_aware && translated.is_empty() => {
                return Ok(());
            }
            LanguageSelection::Unspecified => (ctx.current_language().clone(), false),
        };

        let mut translation = load_translation(store, entity, &language, enforce)?;
        translation.master_id = Some(id);
        translation.fields.extend(translated);
        save_translation(store, &mut translation)?;
        debug!(
            "Updated entity {} in '{}'",
            id, translation.language_code
        );

        entity.set_cached_translation(Some(translation));
        Ok(())
    }
}
