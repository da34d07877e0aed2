//! Translation set reconciliation: apply a validated multi-language payload
//! to an entity's stored translations.
//!
//! The first language of a payload goes through the single-language write
//! path together with the flat fields. Every other language is written on
//! its own with [`TranslationSetReconciler::update_translation`]. Languages
//! sent as deletion markers, or (on full updates) missing from the payload,
//! are removed.

use crate::codec::{
    LanguageSelection, SingleLanguageCodec, TranslationPayload, TranslationSet, ValidatedData,
};
use crate::error::{ConfigurationError, SerializerError};
use crate::i18n::{LanguageCode, OperationContext, TranslationMetrics};
use crate::model::{TranslatableModel, ID_FIELD, LANGUAGE_CODE_FIELD, MASTER_FIELD};
use crate::record::{Entity, Fields, Translation};
use crate::resolver::load_translation;
use crate::store::{LanguageFilter, TranslationStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Keys a translation-only write refuses outright.
pub const TRANSLATION_VETO: [&str; 4] = [ID_FIELD, MASTER_FIELD, "master_id", LANGUAGE_CODE_FIELD];

#[derive(Debug, Clone)]
pub struct TranslationSetReconciler {
    model: Arc<TranslatableModel>,
}

impl TranslationSetReconciler {
    pub fn new(model: Arc<TranslatableModel>) -> Self {
        Self { model }
    }

    /// Create an entity from flat data and an optional translation set.
    ///
    /// The first language of the set is the creation language; the others
    /// are added afterwards. Deletion markers have nothing to delete yet and
    /// are skipped. The creation-language translation is left cached.
    pub fn create<S: TranslationStore + ?Sized>(
        &self,
        single: &SingleLanguageCodec,
        store: &S,
        ctx: &OperationContext,
        mut data: ValidatedData,
        translations: Option<TranslationSet>,
    ) -> Result<Entity, SerializerError> {
        let mut entries = translations
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(language, payload)| match payload {
                TranslationPayload::Fields(fields) => Some((language, fields)),
                TranslationPayload::Delete => None,
            });

        let Some((first_language, first_fields)) = entries.next() else {
            return single.create(store, ctx, data);
        };

        data.fields.extend(first_fields);
        data.language = LanguageSelection::Explicit(first_language);
        let mut entity = single.create(store, ctx, data)?;
        let creation = entity.cached_translation().cloned();

        for (language, fields) in entries {
            entity.set_cached_translation(Some(Translation::stub(entity.id, language)));
            self.update_translation(store, &mut entity, fields)?;
        }

        entity.set_cached_translation(creation);
        Ok(entity)
    }

    /// Update an entity from flat data and an optional translation set.
    ///
    /// The language cached before the call is cached again afterwards,
    /// reloaded from the store, unless that translation was deleted.
    ///
    /// Pruning: a partial update deletes exactly the languages sent as
    /// `false`. A full update with a non-empty set deletes every language
    /// that is not a key of the set.
    pub fn update<S: TranslationStore + ?Sized>(
        &self,
        single: &SingleLanguageCodec,
        store: &S,
        ctx: &OperationContext,
        entity: &mut Entity,
        mut data: ValidatedData,
        translations: Option<TranslationSet>,
    ) -> Result<(), SerializerError> {
        let translations = translations.unwrap_or_default();
        let keys: Vec<LanguageCode> = translations.keys().cloned().collect();
        let mut marked: Vec<LanguageCode> = Vec::new();
        let mut stashed: Option<Option<Translation>> = None;

        for (language, payload) in translations {
            let fields = match payload {
                TranslationPayload::Delete => {
                    marked.push(language);
                    continue;
                }
                TranslationPayload::Fields(fields) => fields,
            };

            let translation = load_translation(store, entity, &language, true)?;
            let previous = entity.set_cached_translation(Some(translation));

            if stashed.is_none() {
                stashed = Some(previous);
                let mut merged = std::mem::take(&mut data);
                merged.fields.extend(fields);
                merged.language = LanguageSelection::Explicit(language);
                single.update(store, ctx, entity, merged)?;
            } else {
                self.update_translation(store, entity, fields)?;
            }
        }

        match stashed {
            Some(previous) => {
                entity.set_cached_translation(previous);
            }
            None => single.update(store, ctx, entity, data)?,
        }

        let Some(id) = entity.id else {
            return Ok(());
        };

        let pruned = if ctx.is_partial() {
            if marked.is_empty() {
                0
            } else {
                store.delete_translations(id, LanguageFilter::Only(&marked))?
            }
        } else if !keys.is_empty() {
            store.delete_translations(id, LanguageFilter::Except(&keys))?
        } else {
            0
        };

        if pruned > 0 {
            TranslationMetrics::global().record_pruned(pruned);
            info!("Pruned {} translation(s) of entity {}", pruned, id);
        }

        // The restored translation predates this call's writes and may be pruned
        let refreshed = match entity.cached_translation() {
            Some(cached) if cached.is_persisted() => {
                Some(store.get_translation(id, &cached.language_code)?)
            }
            _ => None,
        };
        if let Some(current) = refreshed {
            if current.is_none() {
                debug!("Cached translation of entity {} was pruned", id);
            }
            entity.set_cached_translation(current);
        }
        Ok(())
    }

    /// Write `data` to the entity's cached translation only.
    ///
    /// Only plain, one-to-one and concrete foreign key fields of the
    /// translation model are written; other keys are ignored. A persisted
    /// translation gets a partial save of the written keys, a new one is
    /// inserted.
    ///
    /// # Errors
    /// `ConfigurationError::VetoedFields` if `data` carries `id`, `master`,
    /// `master_id` or `language_code`. Nothing is written in that case.
    pub fn update_translation<S: TranslationStore + ?Sized>(
        &self,
        store: &S,
        entity: &mut Entity,
        data: Fields,
    ) -> Result<(), SerializerError> {
        let vetoed: Vec<String> = data
            .keys()
            .filter(|key| TRANSLATION_VETO.contains(&key.as_str()))
            .cloned()
            .collect();
        if !vetoed.is_empty() {
            return Err(ConfigurationError::VetoedFields(vetoed).into());
        }

        let writable: Vec<String> = self
            .model
            .writable_translation_fields()
            .map(|field| field.name.clone())
            .filter(|name| data.contains_key(name))
            .collect();
        if writable.len() < data.len() {
            debug!(
                "Ignoring {} non-writable translation key(s)",
                data.len() - writable.len()
            );
        }

        let master_id = entity.id;
        let translation = entity
            .cached_translation_mut()
            .ok_or(ConfigurationError::NoActiveTranslation)?;
        for name in &writable {
            if let Some(value) = data.get(name) {
                translation.fields.insert(name.clone(), value.clone());
            }
        }
        if translation.master_id.is_none() {
            translation.master_id = master_id;
        }

        if translation.is_persisted() {
            store.update_translation(translation, Some(writable.as_slice()))?;
        } else {
            let id = store.insert_translation(translation)?;
            translation.id = Some(id);
        }
        Ok(())
    }
}
