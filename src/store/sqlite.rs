use super::{LanguageFilter, StoreError, TranslationStore};
use crate::i18n::LanguageCode;
use crate::record::{Entity, Fields, Translation};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

const SAVEPOINT: &str = "translatable_store";

/// SQLite-backed store. Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the tables exist.
    pub fn new(database_path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(database_path)?;
        Self::from_connection(conn)
    }

    /// Private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             CREATE TABLE IF NOT EXISTS entities (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 fields TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS translations (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 master_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
                 language_code TEXT NOT NULL,
                 fields TEXT NOT NULL,
                 UNIQUE (master_id, language_code)
             );",
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}

fn encode(fields: &Fields) -> Result<String, StoreError> {
    Ok(serde_json::to_string(fields)?)
}

fn decode(raw: &str) -> Result<Fields, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

type TranslationRow = (i64, i64, String, String);

fn translation_from_row((id, master_id, language, fields): TranslationRow) -> Result<Translation, StoreError> {
    let language_code = LanguageCode::parse(&language)
        .map_err(|e| StoreError::Corrupt(format!("translation {}: {}", id, e)))?;
    Ok(Translation {
        id: Some(id),
        master_id: Some(master_id),
        language_code,
        fields: decode(&fields)?,
    })
}

fn load_translation_rows(conn: &Connection, master_id: i64) -> Result<Vec<Translation>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, master_id, language_code, fields FROM translations
         WHERE master_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![master_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<Result<Vec<TranslationRow>, _>>()?;

    rows.into_iter().map(translation_from_row).collect()
}

fn entity_exists(conn: &Connection, id: i64) -> Result<bool, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM entities WHERE id = ?1",
        params![id],
        |row| row.get::<_, i64>(0).map(|count| count > 0),
    )?)
}

impl TranslationStore for SqliteStore {
    fn insert_entity(&self, fields: &Fields) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO entities (fields) VALUES (?1)",
            params![encode(fields)?],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn update_entity(&self, id: i64, fields: &Fields) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows_affected = conn.execute(
            "UPDATE entities SET fields = ?1 WHERE id = ?2",
            params![encode(fields)?, id],
        )?;
        if rows_affected == 0 {
            return Err(StoreError::EntityNotFound(id));
        }
        Ok(())
    }

    fn load_entity(&self, id: i64) -> Result<Entity, StoreError> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT fields FROM entities WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(Entity::with_id(id, decode(&raw)?)),
            None => Err(StoreError::EntityNotFound(id)),
        }
    }

    fn delete_entity(&self, id: i64) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let rows_affected = conn.execute("DELETE FROM entities WHERE id = ?1", params![id])?;
        if rows_affected == 0 {
            return Err(StoreError::EntityNotFound(id));
        }
        Ok(())
    }

    fn get_translation(
        &self,
        master_id: i64,
        language: &LanguageCode,
    ) -> Result<Option<Translation>, StoreError> {
        let conn = self.lock()?;
        let row: Option<TranslationRow> = conn
            .query_row(
                "SELECT id, master_id, language_code, fields FROM translations
                 WHERE master_id = ?1 AND language_code = ?2",
                params![master_id, language.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        row.map(translation_from_row).transpose()
    }

    fn list_translations(&self, master_id: i64) -> Result<Vec<Translation>, StoreError> {
        let conn = self.lock()?;
        load_translation_rows(&conn, master_id)
    }

    fn insert_translation(&self, translation: &Translation) -> Result<i64, StoreError> {
        let master_id = translation
            .master_id
            .ok_or_else(|| StoreError::Unbound(translation.language_code.clone()))?;

        let conn = self.lock()?;
        if !entity_exists(&conn, master_id)? {
            return Err(StoreError::EntityNotFound(master_id));
        }

        let result = conn.execute(
            "INSERT INTO translations (master_id, language_code, fields) VALUES (?1, ?2, ?3)",
            params![
                master_id,
                translation.language_code.as_str(),
                encode(&translation.fields)?
            ],
        );

        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                Err(StoreError::Duplicate {
                    master_id,
                    language: translation.language_code.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn update_translation(
        &self,
        translation: &Translation,
        only: Option<&[String]>,
    ) -> Result<(), StoreError> {
        let id = translation
            .id
            .ok_or_else(|| StoreError::NotPersisted(translation.language_code.clone()))?;

        let conn = self.lock()?;
        let stored: Option<String> = conn
            .query_row(
                "SELECT fields FROM translations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let stored = stored.ok_or(StoreError::TranslationNotFound(id))?;

        let fields = match only {
            Some(keys) => {
                let mut merged = decode(&stored)?;
                for key in keys {
                    match translation.fields.get(key) {
                        Some(value) => {
                            merged.insert(key.clone(), value.clone());
                        }
                        None => {
                            merged.remove(key);
                        }
                    }
                }
                merged
            }
            None => translation.fields.clone(),
        };

        conn.execute(
            "UPDATE translations SET fields = ?1 WHERE id = ?2",
            params![encode(&fields)?, id],
        )?;
        Ok(())
    }

    fn delete_translations(
        &self,
        master_id: i64,
        filter: LanguageFilter<'_>,
    ) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        let mut deleted = 0;
        for translation in load_translation_rows(&conn, master_id)? {
            if !filter.matches(&translation.language_code) {
                continue;
            }
            if let Some(id) = translation.id {
                deleted += conn.execute("DELETE FROM translations WHERE id = ?1", params![id])?;
            }
        }
        debug!("Deleted {} translations of entity {}", deleted, master_id);
        Ok(deleted)
    }

    fn begin(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(&format!("SAVEPOINT {}", SAVEPOINT))?;
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Err(StoreError::NoTransaction);
        }
        conn.execute_batch(&format!("RELEASE {}", SAVEPOINT))?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if conn.is_autocommit() {
            return Err(StoreError::NoTransaction);
        }
        conn.execute_batch(&format!(
            "ROLLBACK TO {sp}; RELEASE {sp}",
            sp = SAVEPOINT
        ))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    /// Create a temporary database for testing
    fn create_test_store() -> (SqliteStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test_translations.db");
        let store = SqliteStore::new(db_path.to_str().unwrap()).expect("Failed to create store");
        (store, temp_dir)
    }

    fn code(raw: &str) -> LanguageCode {
        LanguageCode::parse(raw).unwrap()
    }

    fn fields(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn insert(store: &SqliteStore, master: i64, language: &str, title: &str) -> i64 {
        let mut t = Translation::stub(Some(master), code(language));
        t.fields.insert("title".to_string(), json!(title));
        store.insert_translation(&t).unwrap()
    }

    // ==================== Initialization Tests ====================

    #[test]
    fn test_store_creation() {
        let (store, _temp_dir) = create_test_store();
        assert!(store.list_translations(1).unwrap().is_empty());
    }

    #[test]
    fn test_store_reopening() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();

        let id = {
            let store = SqliteStore::new(path).unwrap();
            let id = store.insert_entity(&fields(json!({"isbn": "1"}))).unwrap();
            insert(&store, id, "en", "One");
            id
        };

        let store = SqliteStore::new(path).unwrap();
        assert_eq!(store.load_entity(id).unwrap().get("isbn"), Some(&json!("1")));
        assert_eq!(store.list_translations(id).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_database_path() {
        let result = SqliteStore::new("/nonexistent/directory/translations.db");
        assert!(result.is_err());
    }

    // ==================== Entity Tests ====================

    #[test]
    fn test_entity_round_trip_preserves_unicode() {
        let (store, _temp_dir) = create_test_store();
        let id = store
            .insert_entity(&fields(json!({"name": "日本語 'quoted' \"x\""})))
            .unwrap();
        let entity = store.load_entity(id).unwrap();
        assert_eq!(entity.get("name"), Some(&json!("日本語 'quoted' \"x\"")));
    }

    #[test]
    fn test_update_missing_entity() {
        let (store, _temp_dir) = create_test_store();
        assert!(matches!(
            store.update_entity(3, &Fields::new()),
            Err(StoreError::EntityNotFound(3))
        ));
    }

    #[test]
    fn test_delete_entity_cascades() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();
        insert(&store, id, "en", "One");

        store.delete_entity(id).unwrap();
        assert!(store.list_translations(id).unwrap().is_empty());
    }

    // ==================== Translation Tests ====================

    #[test]
    fn test_get_translation() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();
        insert(&store, id, "ja", "一");

        let found = store.get_translation(id, &code("ja")).unwrap().unwrap();
        assert_eq!(found.master_id, Some(id));
        assert_eq!(found.get("title"), Some(&json!("一")));
        assert!(store.get_translation(id, &code("en")).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_translation() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();
        insert(&store, id, "en", "One");

        let result = store.insert_translation(&Translation::stub(Some(id), code("en")));
        assert!(matches!(result, Err(StoreError::Duplicate { .. })));
    }

    #[test]
    fn test_insert_translation_for_missing_entity() {
        let (store, _temp_dir) = create_test_store();
        let result = store.insert_translation(&Translation::stub(Some(42), code("en")));
        assert!(matches!(result, Err(StoreError::EntityNotFound(42))));
    }

    #[test]
    fn test_partial_update() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();
        let mut t = Translation::stub(Some(id), code("en"));
        t.fields = fields(json!({"title": "One", "body": "Text"}));
        t.id = Some(store.insert_translation(&t).unwrap());

        t.fields = fields(json!({"title": "Changed", "body": "Ignored"}));
        store
            .update_translation(&t, Some(&["title".to_string()]))
            .unwrap();

        let stored = store.get_translation(id, &code("en")).unwrap().unwrap();
        assert_eq!(stored.fields, fields(json!({"title": "Changed", "body": "Text"})));
    }

    #[test]
    fn test_delete_translations_only() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();
        insert(&store, id, "en", "One");
        insert(&store, id, "ja", "一");

        let gone = [code("ja")];
        let deleted = store
            .delete_translations(id, LanguageFilter::Only(&gone))
            .unwrap();

        assert_eq!(deleted, 1);
        let remaining = store.list_translations(id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].language_code, "en");
    }

    // ==================== Transaction Tests ====================

    #[test]
    fn test_rollback_discards_writes() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();

        store.begin().unwrap();
        insert(&store, id, "en", "One");
        store.rollback().unwrap();

        assert!(store.list_translations(id).unwrap().is_empty());
    }

    #[test]
    fn test_commit_keeps_writes() {
        let (store, _temp_dir) = create_test_store();
        let id = store.insert_entity(&Fields::new()).unwrap();

        store.begin().unwrap();
        insert(&store, id, "en", "One");
        store.commit().unwrap();

        assert_eq!(store.list_translations(id).unwrap().len(), 1);
    }

    #[test]
    fn test_commit_without_begin() {
        let (store, _temp_dir) = create_test_store();
        assert!(matches!(store.commit(), Err(StoreError::NoTransaction)));
    }

    #[test]
    fn test_in_memory_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = store.insert_entity(&Fields::new()).unwrap();
        assert!(store.load_entity(id).is_ok());
    }
}
