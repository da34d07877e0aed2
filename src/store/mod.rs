//! Persistence contract for entities and their translations.
//!
//! The codecs never talk to a database directly; they go through
//! [`TranslationStore`]. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: maps behind a mutex, for tests and embedding
//! - [`SqliteStore`]: a SQLite file via `rusqlite`
//!
//! Stores enforce one translation per (entity, language) and report
//! violations as [`StoreError::Duplicate`].

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::i18n::LanguageCode;
use crate::record::{Entity, Fields, Translation};
use thiserror::Error;
use tracing::warn;

/// Errors raised by a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Entity {0} not found")]
    EntityNotFound(i64),

    #[error("Translation {0} not found")]
    TranslationNotFound(i64),

    #[error("Entity {master_id} already has a '{language}' translation")]
    Duplicate {
        master_id: i64,
        language: LanguageCode,
    },

    #[error("Translation '{0}' is not bound to a saved entity")]
    Unbound(LanguageCode),

    #[error("Translation '{0}' has not been saved yet")]
    NotPersisted(LanguageCode),

    #[error("No transaction in progress")]
    NoTransaction,

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Corrupt stored data: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Field encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Which translations of an entity a delete applies to.
#[derive(Debug, Clone, Copy)]
pub enum LanguageFilter<'a> {
    /// Exactly these languages
    Only(&'a [LanguageCode]),
    /// Every language except these
    Except(&'a [LanguageCode]),
}

impl LanguageFilter<'_> {
    pub fn matches(&self, language: &LanguageCode) -> bool {
        match self {
            LanguageFilter::Only(languages) => languages.contains(language),
            LanguageFilter::Except(languages) => !languages.contains(language),
        }
    }
}

/// Per-entity and per-translation CRUD.
///
/// Calls are synchronous. Missing rows are reported as errors where the
/// caller must be able to tell them apart (`load_entity`), and as `None`
/// where absence is an expected answer (`get_translation`).
pub trait TranslationStore {
    fn insert_entity(&self, fields: &Fields) -> Result<i64, StoreError>;

    fn update_entity(&self, id: i64, fields: &Fields) -> Result<(), StoreError>;

    fn load_entity(&self, id: i64) -> Result<Entity, StoreError>;

    /// Delete an entity together with all of its translations.
    fn delete_entity(&self, id: i64) -> Result<(), StoreError>;

    fn get_translation(
        &self,
        master_id: i64,
        language: &LanguageCode,
    ) -> Result<Option<Translation>, StoreError>;

    /// All translations of an entity. Order is store-defined.
    fn list_translations(&self, master_id: i64) -> Result<Vec<Translation>, StoreError>;

    fn insert_translation(&self, translation: &Translation) -> Result<i64, StoreError>;

    /// Write a persisted translation back. With `only`, just those field
    /// keys are written and every other stored value is left as it is.
    fn update_translation(
        &self,
        translation: &Translation,
        only: Option<&[String]>,
    ) -> Result<(), StoreError>;

    /// Delete the matching translations of an entity, returning how many went.
    fn delete_translations(
        &self,
        master_id: i64,
        filter: LanguageFilter<'_>,
    ) -> Result<usize, StoreError>;

    fn begin(&self) -> Result<(), StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;
}

/// Insert or fully update a translation, filling in its new id on insert.
pub fn save_translation<S: TranslationStore + ?Sized>(
    store: &S,
    translation: &mut Translation,
) -> Result<(), StoreError> {
    if translation.is_persisted() {
        store.update_translation(translation, None)
    } else {
        let id = store.insert_translation(translation)?;
        translation.id = Some(id);
        Ok(())
    }
}

/// Run `operation` inside one store transaction.
///
/// Commits when it succeeds; rolls back and returns its error otherwise.
pub fn atomic<S, T, E>(store: &S, operation: impl FnOnce() -> Result<T, E>) -> Result<T, E>
where
    S: TranslationStore + ?Sized,
    E: From<StoreError>,
{
    store.begin()?;

    match operation() {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = store.rollback() {
                warn!("Rollback failed after aborted operation: {}", rollback_error);
            }
            Err(e)
        }
    }
}
