//! BookTrail: a personal reading tracker.
//!
//! Books are looked up by ISBN on Open Library (or entered by hand), accepted
//! into a local library, and tracked through planning, reading and finished.
//! The library is a single JSON collection kept in a SQLite key-value table;
//! [`LibrarySync`] sits in front of it so readers never refetch by hand.

pub mod config;
pub mod db;
pub mod error;
pub mod isbn;
pub mod listing;
pub mod manual;
pub mod models;
pub mod openlibrary;
pub mod progress;
pub mod stats;
pub mod store;
pub mod sync;

pub use config::{AppConfig, LookupConfig};
pub use error::{FormErrors, FormField, LookupError, PageInputError, StoreError, StoreResult, ValidationError};
pub use manual::ManualBookForm;
pub use models::{Book, BookSource, BookStatus, UserBook};
pub use openlibrary::{LookupTracker, OpenLibraryClient};
pub use stats::LibraryStats;
pub use store::{LibraryStore, SqliteLibraryStore};
pub use sync::LibrarySync;

/// Opens the on-disk library described by `config`.
pub fn open_library(config: &AppConfig) -> StoreResult<LibrarySync<SqliteLibraryStore>> {
    let path = config.database_path();
    log::info!("opening library at {}", path.display());
    let store = SqliteLibraryStore::open(&path)?;
    Ok(LibrarySync::new(store))
}
