use crate::models::{BookStatus, UserBook};

/// Entries on one status tab, narrowed by a case-insensitive title/author search.
pub fn filter_entries<'a>(entries: &'a [UserBook], status: BookStatus, query: &str) -> Vec<&'a UserBook> {
    let query = query.trim().to_lowercase();
    entries
        .iter()
        .filter(|entry| entry.status == status)
        .filter(|entry| query.is_empty() || matches_query(entry, &query))
        .collect()
}

/// `query` must already be lower-cased.
fn matches_query(entry: &UserBook, query: &str) -> bool {
    entry.book.title.to_lowercase().contains(query)
        || entry
            .book
            .authors
            .iter()
            .any(|author| author.to_lowercase().contains(query))
}

/// Message for a tab with nothing to show.
pub fn empty_message(status: BookStatus, has_search: bool) -> &'static str {
    if has_search {
        return "No books match your search.";
    }
    match status {
        BookStatus::Reading => "No books in progress. Add a book and set status to Reading.",
        BookStatus::Planning => "No books in your planning list.",
        BookStatus::Finished => "No finished books yet.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, BookSource};

    fn entry(title: &str, author: &str, status: BookStatus) -> UserBook {
        UserBook::new(Book::new(title, vec![author.to_string()], BookSource::Manual)).with_status(status)
    }

    #[test]
    fn filters_by_status_then_search() {
        let entries = vec![
            entry("Dune", "Frank Herbert", BookStatus::Reading),
            entry("Emma", "Jane Austen", BookStatus::Reading),
            entry("Persuasion", "Jane Austen", BookStatus::Finished),
        ];

        let reading = filter_entries(&entries, BookStatus::Reading, "");
        assert_eq!(reading.len(), 2);

        let austen = filter_entries(&entries, BookStatus::Reading, "  AUSTEN ");
        assert_eq!(austen.len(), 1);
        assert_eq!(austen[0].book.title, "Emma");

        let by_title = filter_entries(&entries, BookStatus::Reading, "dun");
        assert_eq!(by_title[0].book.title, "Dune");

        assert!(filter_entries(&entries, BookStatus::Planning, "").is_empty());
    }

    #[test]
    fn search_message_wins_over_tab_message() {
        assert_eq!(empty_message(BookStatus::Finished, true), "No books match your search.");
        assert_eq!(empty_message(BookStatus::Planning, false), "No books in your planning list.");
    }
}
