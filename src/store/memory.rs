use super::{LanguageFilter, StoreError, TranslationStore};
use crate::i18n::LanguageCode;
use crate::record::{Entity, Fields, Translation};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_entity_id: i64,
    last_translation_id: i64,
    entities: BTreeMap<i64, Fields>,
    translations: BTreeMap<i64, Translation>,
}

#[derive(Debug, Default)]
struct State {
    tables: Tables,
    /// One snapshot per open transaction, innermost last
    snapshots: Vec<Tables>,
}

/// In-memory store. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl Tables {
    fn find_translation(&self, master_id: i64, language: &LanguageCode) -> Option<&Translation> {
        self.translations
            .values()
            .find(|t| t.master_id == Some(master_id) && &t.language_code == language)
    }
}

impl TranslationStore for MemoryStore {
    fn insert_entity(&self, fields: &Fields) -> Result<i64, StoreError> {
        let mut state = self.lock()?;
        state.tables.last_entity_id += 1;
        let id = state.tables.last_entity_id;
        state.tables.entities.insert(id, fields.clone());
        Ok(id)
    }

    fn update_entity(&self, id: i64, fields: &Fields) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        match state.tables.entities.get_mut(&id) {
            Some(stored) => {
                *stored = fields.clone();
                Ok(())
            }
            None => Err(StoreError::EntityNotFound(id)),
        }
    }

    fn load_entity(&self, id: i64) -> Result<Entity, StoreError> {
        let state = self.lock()?;
        state
            .tables
            .entities
            .get(&id)
            .map(|fields| Entity::with_id(id, fields.clone()))
            .ok_or(StoreError::EntityNotFound(id))
    }

    fn delete_entity(&self, id: i64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.tables.entities.remove(&id).is_none() {
            return Err(StoreError::EntityNotFound(id));
        }
        state
            .tables
            .translations
            .retain(|_, t| t.master_id != Some(id));
        Ok(())
    }

    fn get_translation(
        &self,
        master_id: i64,
        language: &LanguageCode,
    ) -> Result<Option<Translation>, StoreError> {
        let state = self.lock()?;
        Ok(state.tables.find_translation(master_id, language).cloned())
    }

    fn list_translations(&self, master_id: i64) -> Result<Vec<Translation>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .tables
            .translations
            .values()
            .filter(|t| t.master_id == Some(master_id))
            .cloned()
            .collect())
    }

    fn insert_translation(&self, translation: &Translation) -> Result<i64, StoreError> {
        let master_id = translation
            .master_id
            .ok_or_else(|| StoreError::Unbound(translation.language_code.clone()))?;

        let mut state = self.lock()?;
        if !state.tables.entities.contains_key(&master_id) {
            return Err(StoreError::EntityNotFound(master_id));
        }
        if state
            .tables
            .find_translation(master_id, &translation.language_code)
            .is_some()
        {
            return Err(StoreError::Duplicate {
                master_id,
                language: translation.language_code.clone(),
            });
        }

        state.tables.last_translation_id += 1;
        let id = state.tables.last_translation_id;
        let mut stored = translation.clone();
        stored.id = Some(id);
        state.tables.translations.insert(id, stored);
        Ok(id)
    }

    fn update_translation(
        &self,
        translation: &Translation,
        only: Option<&[String]>,
    ) -> Result<(), StoreError> {
        let id = translation
            .id
            .ok_or_else(|| StoreError::NotPersisted(translation.language_code.clone()))?;

        let mut state = self.lock()?;
        let stored = state
            .tables
            .translations
            .get_mut(&id)
            .ok_or(StoreError::TranslationNotFound(id))?;

        match only {
            Some(keys) => {
                for key in keys {
                    match translation.fields.get(key) {
                        Some(value) => {
                            stored.fields.insert(key.clone(), value.clone());
                        }
                        None => {
                            stored.fields.remove(key);
                        }
                    }
                }
            }
            None => stored.fields = translation.fields.clone(),
        }
        Ok(())
    }

    fn delete_translations(
        &self,
        master_id: i64,
        filter: LanguageFilter<'_>,
    ) -> Result<usize, StoreError> {
        let mut state = self.lock()?;
        let before = state.tables.translations.len();
        state.tables.translations.retain(|_, t| {
            !(t.master_id == Some(master_id) && filter.matches(&t.language_code))
        });
        Ok(before - state.tables.translations.len())
    }

    fn begin(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let snapshot = state.tables.clone();
        state.snapshots.push(snapshot);
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let snapshot = state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
        state.tables = snapshot;
        Ok(())
    }
}
