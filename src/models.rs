use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::progress;

pub const UNKNOWN_AUTHOR: &str = "Unknown Author";
pub const UNKNOWN_TITLE: &str = "Unknown Title";

/// Plausible publication years, shared by lookups and manual entry.
pub const PUBLISH_YEARS: RangeInclusive<i32> = 1000..=2100;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BookSource {
    OpenLibrary,
    #[default]
    Manual,
}

/// Normalized book metadata, from Open Library or manual entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(default)]
    pub source: BookSource,
    /// ISBN-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn13: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_pages: Option<u32>,
}

impl Book {
    /// A bare book with the given title and authors; empty authors fall back to the placeholder.
    pub fn new(title: impl Into<String>, authors: Vec<String>, source: BookSource) -> Self {
        Self {
            title: title.into(),
            authors: authors_or_placeholder(authors),
            source,
            isbn: None,
            isbn13: None,
            cover_url: None,
            publisher: None,
            publish_year: None,
            number_of_pages: None,
        }
    }

    /// Page count when it is known and positive.
    pub fn page_count(&self) -> Option<u32> {
        self.number_of_pages.filter(|pages| *pages > 0)
    }

    pub fn preferred_isbn(&self) -> Option<&str> {
        self.isbn13.as_deref().or(self.isbn.as_deref())
    }
}

pub(crate) fn authors_or_placeholder(authors: Vec<String>) -> Vec<String> {
    let authors = authors
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    if authors.is_empty() {
        vec![UNKNOWN_AUTHOR.to_string()]
    } else {
        authors
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Planning,
    Reading,
    Finished,
}

impl BookStatus {
    pub const ALL: [BookStatus; 3] = [BookStatus::Planning, BookStatus::Reading, BookStatus::Finished];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::Planning => "planning",
            BookStatus::Reading => "reading",
            BookStatus::Finished => "finished",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BookStatus::Planning => "Planning",
            BookStatus::Reading => "Reading",
            BookStatus::Finished => "Finished",
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planning" => Ok(BookStatus::Planning),
            "reading" => Ok(BookStatus::Reading),
            "finished" => Ok(BookStatus::Finished),
            other => Err(format!(
                "unknown status \"{}\" (expected planning, reading or finished)",
                other
            )),
        }
    }
}

/// A library entry: a book plus the reader's status and progress.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserBook {
    pub id: String,
    pub book: Book,
    pub status: BookStatus,
    pub current_page: u32,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserBook {
    /// Accepts a book into the library: fresh id, planning, page 0.
    pub fn new(book: Book) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            book,
            status: BookStatus::Planning,
            current_page: 0,
            added_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: BookStatus) -> Self {
        self.status = status;
        self
    }

    pub fn set_status(&mut self, status: BookStatus) {
        self.status = status;
    }

    /// Sets the current page, clamped to the book's page count when known.
    pub fn set_current_page(&mut self, page: u32) {
        self.current_page = progress::clamp_page(page, self.book.page_count());
    }

    /// Moves the current page by `delta`, staying within `[0, page_count]`.
    pub fn adjust_current_page(&mut self, delta: i64) {
        self.current_page = progress::adjust_page(self.current_page, delta, self.book.page_count());
    }

    pub fn clamp_progress(&mut self) {
        self.set_current_page(self.current_page);
    }

    pub fn progress_percent(&self) -> Option<u32> {
        progress::progress_percent(self.current_page, self.book.page_count())
    }
}
