//! Cached view of the library that refreshes itself after every write.

use std::sync::{Mutex, MutexGuard};

use crate::error::StoreResult;
use crate::models::{Book, BookStatus, UserBook};
use crate::store::LibraryStore;

#[derive(Default)]
struct CacheState {
    entries: Vec<UserBook>,
    loaded: bool,
    stale: bool,
    refreshes: u64,
}

/// Serves reads from a cache and invalidates it after each mutation.
///
/// Invalidation only marks the cache stale; the next read performs the refresh,
/// so several writes in a row cost a single re-read.
pub struct LibrarySync<S> {
    store: S,
    cache: Mutex<CacheState>,
}

impl<S: LibraryStore> LibrarySync<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: Mutex::new(CacheState::default()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn cache(&self) -> MutexGuard<'_, CacheState> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current collection, re-read from the store if nothing is cached or the cache is stale.
    pub fn entries(&self) -> Vec<UserBook> {
        let mut cache = self.cache();
        if !cache.loaded || cache.stale {
            cache.entries = self.store.get_all();
            cache.loaded = true;
            cache.stale = false;
            cache.refreshes += 1;
            log::debug!(
                "library cache refreshed entries={} refreshes={}",
                cache.entries.len(),
                cache.refreshes
            );
        }
        cache.entries.clone()
    }

    pub fn get(&self, id: &str) -> Option<UserBook> {
        self.entries().into_iter().find(|entry| entry.id == id)
    }

    /// True until the first read has completed.
    pub fn is_loading(&self) -> bool {
        !self.cache().loaded
    }

    pub fn is_stale(&self) -> bool {
        self.cache().stale
    }

    /// Number of store reads performed so far.
    pub fn refresh_count(&self) -> u64 {
        self.cache().refreshes
    }

    pub fn invalidate(&self) {
        self.cache().stale = true;
    }

    pub fn add_or_update(&self, entry: UserBook) -> StoreResult<UserBook> {
        let stored = self.store.upsert(entry)?;
        self.invalidate();
        Ok(stored)
    }

    /// Accepts a looked-up or manually entered book as a new planning entry.
    pub fn add_book(&self, book: Book) -> StoreResult<UserBook> {
        let stored = self.add_or_update(UserBook::new(book))?;
        log::info!("added \"{}\" to library id={}", stored.book.title, stored.id);
        Ok(stored)
    }

    /// Returns `None` when the id is not in the library.
    pub fn set_status(&self, id: &str, status: BookStatus) -> StoreResult<Option<UserBook>> {
        self.modify(id, |entry| entry.set_status(status))
    }

    pub fn set_current_page(&self, id: &str, page: u32) -> StoreResult<Option<UserBook>> {
        self.modify(id, |entry| entry.set_current_page(page))
    }

    pub fn adjust_current_page(&self, id: &str, delta: i64) -> StoreResult<Option<UserBook>> {
        self.modify(id, |entry| entry.adjust_current_page(delta))
    }

    fn modify(&self, id: &str, change: impl FnOnce(&mut UserBook)) -> StoreResult<Option<UserBook>> {
        let Some(mut entry) = self.get(id) else {
            return Ok(None);
        };
        change(&mut entry);
        self.add_or_update(entry).map(Some)
    }

    pub fn remove(&self, id: &str) -> StoreResult<()> {
        self.store.delete(id)?;
        self.invalidate();
        Ok(())
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.store.clear()?;
        self.invalidate();
        log::info!("library cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::BookSource;
    use crate::store::SqliteLibraryStore;

    fn book(title: &str, pages: Option<u32>) -> Book {
        let mut book = Book::new(title, vec!["Author".to_string()], BookSource::Manual);
        book.number_of_pages = pages;
        book
    }

    fn sync() -> LibrarySync<SqliteLibraryStore> {
        LibrarySync::new(SqliteLibraryStore::open_in_memory().expect("open store"))
    }

    #[test]
    fn loading_until_first_read() {
        let sync = sync();
        assert!(sync.is_loading());
        assert!(sync.entries().is_empty());
        assert!(!sync.is_loading());
    }

    #[test]
    fn reads_after_mutation_reflect_the_write() {
        let sync = sync();
        assert!(sync.entries().is_empty());

        let added = sync.add_book(book("Dune", Some(412))).expect("add");
        assert!(sync.is_stale());
        assert_eq!(sync.entries(), vec![added.clone()]);

        sync.remove(&added.id).expect("remove");
        assert!(sync.entries().is_empty());
    }

    #[test]
    fn invalidations_coalesce_into_one_refresh() {
        let sync = sync();
        sync.entries();
        let before = sync.refresh_count();

        sync.add_book(book("Dune", None)).expect("add");
        sync.add_book(book("Emma", None)).expect("add");
        sync.invalidate();

        assert_eq!(sync.entries().len(), 2);
        assert_eq!(sync.entries().len(), 2);
        assert_eq!(sync.refresh_count(), before + 1);
    }

    #[test]
    fn status_and_page_changes_replace_the_record() {
        let sync = sync();
        let added = sync.add_book(book("Dune", Some(300))).expect("add");

        let reading = sync
            .set_status(&added.id, BookStatus::Reading)
            .expect("set status")
            .expect("entry exists");
        assert_eq!(reading.status, BookStatus::Reading);

        sync.set_current_page(&added.id, 250).expect("set page");
        for _ in 0..10 {
            sync.adjust_current_page(&added.id, 10).expect("bump page");
        }
        let current = sync.get(&added.id).expect("entry exists");
        assert_eq!(current.current_page, 300);
        assert_eq!(current.added_at, added.added_at);
        assert!(current.updated_at >= reading.updated_at);
    }

    #[test]
    fn mutating_unknown_id_is_none() {
        let sync = sync();
        assert!(sync
            .set_status("missing", BookStatus::Finished)
            .expect("set status")
            .is_none());
    }

    struct ReadOnlyStore;

    impl LibraryStore for ReadOnlyStore {
        fn get_all(&self) -> Vec<UserBook> {
            vec![]
        }

        fn upsert(&self, _entry: UserBook) -> StoreResult<UserBook> {
            Err(StoreError::Lock)
        }

        fn delete(&self, _id: &str) -> StoreResult<()> {
            Err(StoreError::Lock)
        }

        fn clear(&self) -> StoreResult<()> {
            Err(StoreError::Lock)
        }
    }

    #[test]
    fn failed_write_keeps_cache_fresh() {
        let sync = LibrarySync::new(ReadOnlyStore);
        sync.entries();
        assert!(sync.add_book(book("Dune", None)).is_err());
        assert!(sync.clear().is_err());
        assert!(!sync.is_stale());
    }
}
