use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::Path;

use crate::error::StoreResult;

const MIGRATION_KV_STORE_SQL: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);";

/// Opens (or creates) the database file, creating its parent directory if needed.
pub fn open_db(path: &Path) -> StoreResult<Connection> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    let conn = Connection::open(path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory()?;
    init_db(&conn)?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> StoreResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id TEXT PRIMARY KEY NOT NULL,
            applied_at INTEGER NOT NULL
        );",
    )?;
    apply_migration(conn, "0000_kv_store", MIGRATION_KV_STORE_SQL)?;
    Ok(())
}

fn apply_migration(conn: &Connection, id: &str, sql: &str) -> StoreResult<()> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM schema_migrations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if existing.is_some() {
        return Ok(());
    }
    conn.execute_batch(sql)?;
    conn.execute(
        "INSERT INTO schema_migrations (id, applied_at) VALUES (?1, ?2)",
        params![id, chrono::Utc::now().timestamp_millis()],
    )?;
    log::debug!("applied migration {}", id);
    Ok(())
}

pub fn read_value(conn: &Connection, key: &str) -> StoreResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

/// Replaces the value under `key` in one statement, so a failed write keeps the old value.
pub fn write_value(conn: &Connection, key: &str, value: &str) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        params![key, value, chrono::Utc::now().timestamp_millis()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_replaces_value() {
        let conn = open_in_memory().expect("open db");
        assert_eq!(read_value(&conn, "k").expect("read"), None);

        write_value(&conn, "k", "[1]").expect("write");
        write_value(&conn, "k", "[2]").expect("overwrite");
        assert_eq!(read_value(&conn, "k").expect("read"), Some("[2]".to_string()));
    }

    #[test]
    fn migrations_are_applied_once() {
        let conn = open_in_memory().expect("open db");
        init_db(&conn).expect("re-init");
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count migrations");
        assert_eq!(count, 1);
    }

    #[test]
    fn open_db_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("booktrail.db");
        let conn = open_db(&path).expect("open file db");
        write_value(&conn, "k", "v").expect("write");
        assert!(path.exists());
    }
}
