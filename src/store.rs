//! Durable keeper of the library collection.
//!
//! The whole collection is one JSON array stored under [`STORAGE_KEY`]. Every
//! mutation is a read-modify-write of that array followed by a single-statement
//! replace, so a failed write leaves the previous array intact.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::Connection;
use serde_json::Value;

use crate::db;
use crate::error::{StoreError, StoreResult};
use crate::models::UserBook;

pub const STORAGE_KEY: &str = "booktrail-library";

/// The four-operation interface the front end relies on, plus lookup by id.
///
/// Reads never fail: unreadable storage is reported as an empty collection.
pub trait LibraryStore: Send + Sync {
    fn get_all(&self) -> Vec<UserBook>;

    fn get_by_id(&self, id: &str) -> Option<UserBook> {
        self.get_all().into_iter().find(|entry| entry.id == id)
    }

    /// Replaces the entry with the same id or appends it. Returns the record as stored.
    fn upsert(&self, entry: UserBook) -> StoreResult<UserBook>;

    /// Removes the entry; an unknown id is not an error.
    fn delete(&self, id: &str) -> StoreResult<()>;

    fn clear(&self) -> StoreResult<()>;
}

/// Outcome of decoding a persisted array.
#[derive(Debug, Default)]
pub struct DecodedLibrary {
    pub entries: Vec<UserBook>,
    /// Elements rejected by the shape check or strict deserialization.
    pub dropped: usize,
    /// The blob was not a JSON array at all.
    pub corrupt: bool,
}

/// Decodes a persisted collection record by record.
///
/// Elements with the wrong shape, an unknown status, an empty author list or an id
/// already seen earlier in the array are dropped; the rest are kept in order, with
/// progress clamped to the page count.
pub fn decode_library(raw: &str) -> DecodedLibrary {
    let items = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        _ => {
            return DecodedLibrary {
                corrupt: true,
                ..DecodedLibrary::default()
            }
        }
    };

    let mut decoded = DecodedLibrary::default();
    let mut seen = HashSet::new();
    for item in items {
        let entry = if has_entry_shape(&item) {
            serde_json::from_value::<UserBook>(item)
                .ok()
                .filter(|entry| !entry.book.authors.is_empty())
        } else {
            None
        };
        match entry {
            Some(mut entry) if seen.insert(entry.id.clone()) => {
                entry.clamp_progress();
                decoded.entries.push(entry);
            }
            _ => decoded.dropped += 1,
        }
    }
    decoded
}

fn has_entry_shape(item: &Value) -> bool {
    let Some(map) = item.as_object() else {
        return false;
    };
    map.get("id").is_some_and(Value::is_string)
        && map.get("book").is_some_and(Value::is_object)
        && map.get("status").is_some_and(Value::is_string)
        && map.get("currentPage").is_some_and(Value::is_number)
        && map.get("addedAt").is_some_and(Value::is_string)
        && map.get("updatedAt").is_some_and(Value::is_string)
}

pub fn encode_library(entries: &[UserBook]) -> serde_json::Result<String> {
    serde_json::to_string(entries)
}

/// Library store persisted in a SQLite key-value table.
pub struct SqliteLibraryStore {
    conn: Mutex<Connection>,
    key: String,
}

impl SqliteLibraryStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        Ok(Self::with_connection(db::open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::with_connection(db::open_in_memory()?))
    }

    /// Wraps a connection whose schema is already initialized.
    pub fn with_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            key: STORAGE_KEY.to_string(),
        }
    }

    /// Uses a different storage key, e.g. to keep several libraries in one file.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Writes a raw blob under the storage key, bypassing validation.
    pub fn write_raw(&self, raw: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        db::write_value(&conn, &self.key, raw)
    }

    pub fn read_raw(&self) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        db::read_value(&conn, &self.key)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn load(&self, conn: &Connection) -> Vec<UserBook> {
        let raw = match db::read_value(conn, &self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return vec![],
            Err(err) => {
                log::warn!("library read failed key={} error={}", self.key, err);
                return vec![];
            }
        };
        let decoded = decode_library(&raw);
        if decoded.corrupt {
            log::warn!("library blob is not a JSON array key={}; treating as empty", self.key);
        } else if decoded.dropped > 0 {
            log::warn!(
                "dropped {} malformed library record(s) key={} kept={}",
                decoded.dropped,
                self.key,
                decoded.entries.len()
            );
        }
        decoded.entries
    }

    fn persist(&self, conn: &Connection, entries: &[UserBook]) -> StoreResult<()> {
        let raw = encode_library(entries)?;
        db::write_value(conn, &self.key, &raw)?;
        log::debug!("persisted library key={} entries={}", self.key, entries.len());
        Ok(())
    }
}

impl LibraryStore for SqliteLibraryStore {
    fn get_all(&self) -> Vec<UserBook> {
        match self.lock() {
            Ok(conn) => self.load(&conn),
            Err(err) => {
                log::warn!("library read failed: {}", err);
                vec![]
            }
        }
    }

    fn upsert(&self, mut entry: UserBook) -> StoreResult<UserBook> {
        let conn = self.lock()?;
        let mut entries = self.load(&conn);
        let now = Utc::now();
        entry.clamp_progress();

        match entries.iter().position(|existing| existing.id == entry.id) {
            Some(index) => {
                let previous = &entries[index];
                entry.added_at = previous.added_at;
                entry.updated_at = now.max(previous.updated_at).max(entry.added_at);
                entries[index] = entry.clone();
            }
            None => {
                entry.added_at = entry.added_at.min(now);
                entry.updated_at = now;
                entries.push(entry.clone());
            }
        }

        self.persist(&conn, &entries)?;
        Ok(entry)
    }

    fn delete(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        let mut entries = self.load(&conn);
        entries.retain(|entry| entry.id != id);
        self.persist(&conn, &entries)
    }

    fn clear(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        self.persist(&conn, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, BookSource, BookStatus};
    use pretty_assertions::assert_eq;

    fn entry(title: &str) -> UserBook {
        UserBook::new(Book::new(title, vec!["Author".to_string()], BookSource::Manual))
    }

    #[test]
    fn shape_check_matches_persisted_layout() {
        let good = serde_json::to_value(entry("Dune")).expect("serialize");
        assert!(has_entry_shape(&good));

        let mut missing_book = good.clone();
        missing_book.as_object_mut().expect("object").remove("book");
        assert!(!has_entry_shape(&missing_book));

        let mut string_page = good.clone();
        string_page["currentPage"] = Value::String("12".to_string());
        assert!(!has_entry_shape(&string_page));

        let mut null_book = good;
        null_book["book"] = Value::Null;
        assert!(!has_entry_shape(&null_book));
    }

    #[test]
    fn decode_rejects_non_array_blobs() {
        for raw in ["", "{}", "not json", "42", "null"] {
            let decoded = decode_library(raw);
            assert!(decoded.corrupt, "{raw} should be corrupt");
            assert!(decoded.entries.is_empty());
        }
    }

    #[test]
    fn decode_drops_unknown_status_and_duplicate_ids() {
        let first = entry("Dune");
        let mut unknown_status = serde_json::to_value(entry("Emma")).expect("serialize");
        unknown_status["status"] = Value::String("paused".to_string());
        let duplicate = serde_json::to_value(&first).expect("serialize");
        let raw = serde_json::to_string(&vec![
            serde_json::to_value(&first).expect("serialize"),
            unknown_status,
            duplicate,
        ])
        .expect("encode");

        let decoded = decode_library(&raw);
        assert_eq!(decoded.entries, vec![first]);
        assert_eq!(decoded.dropped, 2);
        assert!(!decoded.corrupt);
    }

    #[test]
    fn decode_drops_books_without_authors() {
        let mut value = serde_json::to_value(entry("Dune")).expect("serialize");
        value["book"]["authors"] = Value::Array(vec![]);
        let raw = Value::Array(vec![value]).to_string();
        assert_eq!(decode_library(&raw).dropped, 1);
    }

    #[test]
    fn upsert_preserves_added_at_and_advances_updated_at() {
        let store = SqliteLibraryStore::open_in_memory().expect("open store");
        let stored = store.upsert(entry("Dune")).expect("insert");

        let mut changed = stored.clone();
        changed.status = BookStatus::Reading;
        changed.added_at = Utc::now() + chrono::Duration::days(3);
        let updated = store.upsert(changed).expect("update");

        assert_eq!(updated.added_at, stored.added_at);
        assert!(updated.updated_at >= stored.updated_at);
        assert!(updated.updated_at >= updated.added_at);
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn upsert_clamps_progress_to_page_count() {
        let store = SqliteLibraryStore::open_in_memory().expect("open store");
        let mut item = entry("Dune");
        item.book.number_of_pages = Some(300);
        item.current_page = 999;
        let stored = store.upsert(item).expect("insert");
        assert_eq!(stored.current_page, 300);
    }

    #[test]
    fn corrupt_blob_reads_as_empty_and_is_overwritten_by_next_write() {
        let store = SqliteLibraryStore::open_in_memory().expect("open store");
        store.write_raw("{oops").expect("write raw");
        assert!(store.get_all().is_empty());

        store.upsert(entry("Dune")).expect("insert");
        assert_eq!(store.get_all().len(), 1);
    }

    #[test]
    fn custom_key_isolates_collections() {
        let conn = db::open_in_memory().expect("open db");
        let store = SqliteLibraryStore::with_connection(conn).with_key("other-library");
        store.upsert(entry("Dune")).expect("insert");
        assert_eq!(store.key(), "other-library");
        assert!(store.read_raw().expect("read").is_some());
    }
}
