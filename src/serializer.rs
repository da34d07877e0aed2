//! The composed translatable serializer.
//!
//! A serializer is put together from up to three parts, chosen by
//! [`SerializerOptions`]:
//!
//! - a [`SingleLanguageCodec`] for the flat fields (always present; it only
//!   resolves a language when translated fields are exposed flat)
//! - a [`TranslationListCodec`] for the nested `{language: translation}` map
//! - a [`TranslationSetReconciler`] applying nested payloads on writes
//!
//! Writes run inside one store transaction.

use crate::codec::{
    NestedTranslationCodec, SingleLanguageCodec, TranslationListCodec, TranslationSet,
    ValidatedData,
};
use crate::error::{
    invalid_data_message, ConfigurationError, ErrorCode, ErrorDetail, SerializerError,
    ValidationError, MSG_REQUIRED,
};
use crate::field::FieldSpec;
use crate::i18n::{LanguageRegistry, OperationContext};
use crate::model::{TranslatableModel, LANGUAGE_CODE_FIELD};
use crate::reconcile::TranslationSetReconciler;
use crate::record::Entity;
use crate::router::{locate_field, FieldOrigin, FieldRouter, VETO_FIELDS};
use crate::store::{atomic, TranslationStore};
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Field selection and composition switches.
#[derive(Debug, Clone)]
pub struct SerializerOptions {
    /// Explicit field list. `None` derives one from the model.
    pub fields: Option<Vec<String>>,
    pub exclude: Vec<String>,
    pub read_only: Vec<String>,
    /// Field declarations overriding (or adding to) the model-derived ones
    pub declared: Vec<FieldSpec>,
    /// Expose translated fields flat, in one language
    pub translated_fields: bool,
    /// Expose the nested multi-language map under the model's accessor
    pub nested_translations: bool,
    /// Translated fields left out of each nested translation
    pub nested_exclude: Vec<String>,
    /// Languages accepted on writes. `None` accepts any well-formed code.
    pub languages: Option<LanguageRegistry>,
}

impl Default for SerializerOptions {
    fn default() -> Self {
        Self {
            fields: None,
            exclude: Vec::new(),
            read_only: Vec::new(),
            declared: Vec::new(),
            translated_fields: true,
            nested_translations: false,
            nested_exclude: Vec::new(),
            languages: None,
        }
    }
}

/// A fully validated write payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPayload {
    pub data: ValidatedData,
    /// The nested map, when one was sent
    pub translations: Option<TranslationSet>,
}

#[derive(Debug, Clone)]
pub struct TranslatableSerializer {
    model: Arc<TranslatableModel>,
    single: SingleLanguageCodec,
    translations: Option<TranslationListCodec>,
    reconciler: TranslationSetReconciler,
}

impl TranslatableSerializer {
    /// Build a serializer for `model`.
    ///
    /// # Errors
    /// * `ConfigurationError::FieldNotFound` for a listed field found on
    ///   neither model
    /// * `ConfigurationError::InvalidOptions` when neither flat nor nested
    ///   output is requested
    pub fn new(model: TranslatableModel, options: SerializerOptions) -> Result<Self, ConfigurationError> {
        let model = Arc::new(model);
        let accessor = model.accessor().to_string();

        let mut names = match &options.fields {
            Some(fields) => fields.clone(),
            None => default_field_names(&model, &options),
        };
        names.retain(|name| !options.exclude.contains(name));

        let nested = names.iter().any(|name| *name == accessor);
        names.retain(|name| *name != accessor);

        if !options.translated_fields && !nested {
            return Err(ConfigurationError::InvalidOptions(
                "neither flat translated fields nor nested translations are enabled".to_string(),
            ));
        }

        let mut specs = Vec::with_capacity(names.len());
        for name in &names {
            let mut spec = build_field(&model, &options, name)?;
            if options.read_only.contains(name) {
                spec = spec.read_only();
            }
            specs.push(spec);
        }

        // nested payloads go through the flat write path as well
        let child = NestedTranslationCodec::new(&model, &options.nested_exclude);
        let sources = specs
            .iter()
            .chain(child.fields())
            .map(|spec| spec.source_name());
        let router = FieldRouter::build(&model, sources)?;

        let single = SingleLanguageCodec::new(
            specs,
            router,
            options.languages.clone(),
            options.translated_fields,
        );
        let translations =
            nested.then(|| TranslationListCodec::new(child, options.languages.clone()));

        debug!(
            "Built serializer for '{}' (flat: {}, nested: {})",
            model.shared().name(),
            options.translated_fields,
            nested
        );

        Ok(Self {
            reconciler: TranslationSetReconciler::new(model.clone()),
            model,
            single,
            translations,
        })
    }

    pub fn model(&self) -> &TranslatableModel {
        &self.model
    }

    /// Names of the exposed fields, the accessor last when nested output is on.
    pub fn field_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.single.fields().iter().map(|f| f.name.as_str()).collect();
        if self.translations.is_some() {
            names.push(self.model.accessor());
        }
        names
    }

    pub fn has_nested_translations(&self) -> bool {
        self.translations.is_some()
    }

    /// Render an entity.
    ///
    /// The entity's cached translation and the context's ambient language are
    /// the same after the call as before.
    pub fn to_representation<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &mut OperationContext,
        entity: &mut Entity,
    ) -> Result<Value, SerializerError> {
        let mut out = self.single.to_representation(store, ctx, entity)?;
        if let Some(list) = &self.translations {
            let nested = list.to_representation(store, ctx, entity)?;
            out.insert(self.model.accessor().to_string(), Value::Object(nested));
        }
        Ok(Value::Object(out))
    }

    /// Validate a write payload.
    ///
    /// `instance` is the entity being updated, `None` on create. When the
    /// payload carries the nested map, flat translated fields are ignored.
    pub fn validate<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &mut OperationContext,
        instance: Option<&Entity>,
        raw: &Value,
    ) -> Result<ValidatedPayload, SerializerError> {
        let Value::Object(data) = raw else {
            let detail = ErrorDetail::non_field(invalid_data_message(raw));
            return Err(ValidationError::new(ErrorCode::Invalid, detail).into());
        };

        let accessor = self.model.accessor();
        let partial = ctx.is_partial();
        let nested_sent = self.translations.is_some() && data.contains_key(accessor);
        let skip_translated = self.single.is_language_aware() && nested_sent;

        if !skip_translated {
            self.single.check_enforced(ctx, data)?;
        }

        let mut errors: IndexMap<String, ErrorDetail> = IndexMap::new();

        let flat = match self.single.to_internal_value(data, partial, skip_translated) {
            Ok(flat) => Some(flat),
            Err(field_errors) => {
                errors.extend(field_errors);
                None
            }
        };

        let mut translations = None;
        if let Some(list) = &self.translations {
            match data.get(accessor) {
                Some(raw_map) => match list.to_internal_value(store, ctx, instance, raw_map) {
                    Ok(set) => translations = Some(set),
                    Err(SerializerError::Validation(err)) => {
                        errors.insert(accessor.to_string(), err.detail);
                    }
                    Err(other) => return Err(other),
                },
                None if !self.single.is_language_aware() && !partial => {
                    errors.insert(
                        accessor.to_string(),
                        ErrorDetail::Messages(vec![MSG_REQUIRED.to_string()]),
                    );
                }
                None => {}
            }
        }

        let flat = match flat {
            Some(flat) if errors.is_empty() => flat,
            _ => return Err(ValidationError::fields(errors).into()),
        };

        let data = self.single.validate(ctx, flat)?;
        Ok(ValidatedPayload { data, translations })
    }

    /// Create an entity from a validated payload.
    pub fn create<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OperationContext,
        payload: ValidatedPayload,
    ) -> Result<Entity, SerializerError> {
        let entity = atomic(store, || {
            self.reconciler
                .create(&self.single, store, ctx, payload.data, payload.translations)
        })?;
        info!("Created {} {:?}", self.model.shared().name(), entity.id);
        Ok(entity)
    }

    /// Update `entity` from a validated payload.
    ///
    /// On failure the store is rolled back and `entity` is left untouched.
    pub fn update<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &OperationContext,
        entity: &mut Entity,
        payload: ValidatedPayload,
    ) -> Result<(), SerializerError> {
        let mut working = entity.clone();
        atomic(store, || {
            self.reconciler.update(
                &self.single,
                store,
                ctx,
                &mut working,
                payload.data,
                payload.translations,
            )
        })?;
        *entity = working;
        info!("Updated {} {:?}", self.model.shared().name(), entity.id);
        Ok(())
    }

    /// Validate `raw` and create (no `instance`) or update an entity.
    pub fn save<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        ctx: &mut OperationContext,
        instance: Option<Entity>,
        raw: &Value,
    ) -> Result<Entity, SerializerError> {
        let payload = self.validate(store, ctx, instance.as_ref(), raw)?;
        match instance {
            Some(mut entity) => {
                self.update(store, ctx, &mut entity, payload)?;
                Ok(entity)
            }
            None => self.create(store, ctx, payload),
        }
    }
}

/// Default field list: serialized shared fields, then (flat mode) serialized
/// translated fields, then (nested mode) the accessor.
fn default_field_names(model: &TranslatableModel, options: &SerializerOptions) -> Vec<String> {
    let mut names: Vec<String> = model
        .shared()
        .fields()
        .iter()
        .filter(|f| f.serialize)
        .map(|f| f.name.clone())
        .collect();

    if options.translated_fields {
        names.extend(
            model
                .translations()
                .fields()
                .iter()
                .filter(|f| f.serialize && !VETO_FIELDS.contains(&f.name.as_str()))
                .map(|f| f.name.clone()),
        );
    }
    if options.nested_translations {
        names.push(model.accessor().to_string());
    }
    names
}

fn build_field(
    model: &TranslatableModel,
    options: &SerializerOptions,
    name: &str,
) -> Result<FieldSpec, ConfigurationError> {
    if let Some(declared) = options.declared.iter().find(|spec| spec.name == name) {
        return Ok(declared.clone());
    }

    let field = match locate_field(name, model) {
        Some(FieldOrigin::Translated) => model.translations().get_field(name),
        Some(FieldOrigin::Shared) => model.shared().get_field(name),
        None => None,
    };
    let field = field.ok_or_else(|| ConfigurationError::FieldNotFound {
        field: name.to_string(),
        shared: model.shared().name().to_string(),
        translations: model.translations().name().to_string(),
    })?;

    let spec = FieldSpec::from_model_field(field);
    Ok(if name == LANGUAGE_CODE_FIELD {
        spec.optional()
    } else {
        spec
    })
}
