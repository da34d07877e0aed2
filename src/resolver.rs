//! Language resolution: pick the translation a single-language operation uses.
//!
//! The effective language is the operation's override when it has one, the
//! ambient language otherwise. The translation for that language is loaded
//! from the store, or stubbed (unsaved) when the entity has none yet, and
//! cached on the entity.

use crate::i18n::{LanguageCode, OperationContext, TranslationMetrics};
use crate::record::{Entity, Translation};
use crate::store::{StoreError, TranslationStore};
use tracing::debug;

/// Get the translation of `entity` in `language`.
///
/// Without `enforce`, an already cached translation is reused whatever its
/// language. With `enforce`, it is reused only if it is in `language`.
/// Otherwise the store is asked, and a stub is built if it has nothing.
pub fn load_translation<S: TranslationStore + ?Sized>(
    store: &S,
    entity: &Entity,
    language: &LanguageCode,
    enforce: bool,
) -> Result<Translation, StoreError> {
    let metrics = TranslationMetrics::global();

    if let Some(cached) = entity.cached_translation() {
        if !enforce || &cached.language_code == language {
            metrics.record_cache_reuse();
            return Ok(cached.clone());
        }
    }

    if let Some(id) = entity.id {
        if let Some(translation) = store.get_translation(id, language)? {
            metrics.record_store_load();
            return Ok(translation);
        }
    }

    debug!(
        "No '{}' translation for entity {:?}, creating a stub",
        language, entity.id
    );
    metrics.record_stub_created();
    Ok(Translation::stub(entity.id, language.clone()))
}

/// Resolve the effective language, load its translation and cache it on the
/// entity.
///
/// `language_override` wins over `ambient`. Returns the now cached translation.
pub fn resolve_and_load<'e, S: TranslationStore + ?Sized>(
    store: &S,
    entity: &'e mut Entity,
    language_override: Option<&LanguageCode>,
    enforce: bool,
    ambient: &LanguageCode,
) -> Result<&'e Translation, StoreError> {
    let language = language_override.unwrap_or(ambient);
    let translation = load_translation(store, entity, language, enforce)?;
    Ok(entity.cached.insert(translation))
}

/// [`resolve_and_load`] with the language state of an operation.
pub fn resolve_for_context<'e, S: TranslationStore + ?Sized>(
    store: &S,
    ctx: &OperationContext,
    entity: &'e mut Entity,
) -> Result<&'e Translation, StoreError> {
    resolve_and_load(
        store,
        entity,
        ctx.language_override(),
        ctx.is_enforced(),
        ctx.current_language(),
    )
}
