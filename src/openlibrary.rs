//! ISBN lookup against the Open Library books API.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use regex::Regex;
use reqwest::blocking::Client;
use serde_json::Value;

use crate::config::LookupConfig;
use crate::error::LookupError;
use crate::isbn;
use crate::models::{authors_or_placeholder, Book, BookSource, PUBLISH_YEARS, UNKNOWN_TITLE};

pub const DEFAULT_API_BASE: &str = "https://openlibrary.org/api/books";
const HTTP_USER_AGENT: &str = concat!("BookTrail/", env!("CARGO_PKG_VERSION"));

/// Bibliographic key used both in the request and as the response map key.
pub fn bibkey(isbn: &str) -> String {
    format!("ISBN:{}", isbn)
}

/// Blocking Open Library client.
pub struct OpenLibraryClient {
    client: Client,
    base_url: String,
    debug: bool,
}

impl OpenLibraryClient {
    pub fn new(config: &LookupConfig) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(HTTP_USER_AGENT)
            .build()
            .map_err(LookupError::Network)?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            debug: config.debug,
        })
    }

    pub fn lookup_url(&self, isbn: &str) -> String {
        format!(
            "{}?bibkeys={}&format=json&jscmd=data",
            self.base_url,
            urlencoding::encode(&bibkey(isbn))
        )
    }

    /// Validates `raw_isbn`, fetches its record and normalizes it.
    pub fn fetch_book_by_isbn(&self, raw_isbn: &str) -> Result<Book, LookupError> {
        let isbn = isbn::normalize_isbn(raw_isbn)?;
        if !isbn::has_valid_checksum(&isbn) {
            log::warn!("ISBN {} has an invalid check digit; looking it up anyway", isbn);
        }

        let url = self.lookup_url(&isbn);
        self.trace(format_args!("lookup start url={}", url));

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|err| {
                log::warn!("lookup transport error isbn={} error={}", isbn, err);
                LookupError::Network(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            log::warn!("lookup failed isbn={} status={}", isbn, status);
            return Err(LookupError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let data: Value = response
            .json()
            .map_err(|err| LookupError::Decode(err.to_string()))?;
        let book = parse_lookup_response(&data, &isbn)?;
        self.trace(format_args!(
            "lookup hit isbn={} title=\"{}\" pages={}",
            isbn,
            book.title,
            book.number_of_pages.map(|pages| pages.to_string()).unwrap_or_else(|| "-".to_string())
        ));
        Ok(book)
    }

    /// Runs a lookup under `tracker`. Returns `None` if a newer lookup started meanwhile.
    pub fn fetch_latest(
        &self,
        tracker: &LookupTracker,
        raw_isbn: &str,
    ) -> Option<Result<Book, LookupError>> {
        let ticket = tracker.begin();
        let result = self.fetch_book_by_isbn(raw_isbn);
        tracker.finish(ticket, result)
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.debug {
            log::info!("[metadata-debug] {}", message);
        } else {
            log::debug!("{}", message);
        }
    }
}

/// Picks the entry for `isbn` out of a `jscmd=data` response.
pub fn parse_lookup_response(data: &Value, isbn: &str) -> Result<Book, LookupError> {
    if !data.is_object() {
        return Err(LookupError::Decode("expected a JSON object".to_string()));
    }
    match data.get(bibkey(isbn)) {
        Some(entry) if entry.is_object() => Ok(normalize_openlibrary_entry(entry, isbn)),
        _ => Err(LookupError::NotFound),
    }
}

/// Converts a raw Open Library entry into a [`Book`]. Wrong-typed fields count as absent.
pub fn normalize_openlibrary_entry(raw: &Value, isbn: &str) -> Book {
    let title = raw
        .get("title")
        .and_then(Value::as_str)
        .map(str::trim)
        .unwrap_or(UNKNOWN_TITLE)
        .to_string();

    let authors = raw
        .get("authors")
        .and_then(Value::as_array)
        .map(|authors| {
            authors
                .iter()
                .filter_map(|author| author.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let publisher = raw
        .get("publishers")
        .and_then(Value::as_array)
        .and_then(|publishers| publishers.first())
        .and_then(|publisher| publisher.get("name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let cover_url = raw.get("cover").and_then(|cover| {
        ["medium", "large", "small"].iter().find_map(|size| {
            cover
                .get(*size)
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
        })
    });

    let publish_year = raw
        .get("publish_date")
        .and_then(Value::as_str)
        .and_then(extract_year)
        .filter(|year| PUBLISH_YEARS.contains(year));

    // Whole positive numbers only; the API sometimes sends `431.0`.
    let number_of_pages = raw
        .get("number_of_pages")
        .and_then(Value::as_f64)
        .filter(|pages| *pages >= 1.0 && pages.fract() == 0.0 && *pages <= f64::from(u32::MAX))
        .map(|pages| pages as u32);

    let identifiers = response_isbns(raw);
    let isbn13 = identifiers.iter().find(|id| id.len() == 13).cloned();
    let isbn10 = identifiers
        .iter()
        .find(|id| id.len() == 10)
        .cloned()
        .or_else(|| (isbn.len() == 10).then(|| isbn.to_string()));

    Book {
        title,
        authors: authors_or_placeholder(authors),
        source: BookSource::OpenLibrary,
        isbn: isbn10,
        isbn13,
        cover_url,
        publisher,
        publish_year,
        number_of_pages,
    }
}

/// The entry's own ISBN list, then the `identifiers` block the data API also returns.
fn response_isbns(raw: &Value) -> Vec<String> {
    let mut values = vec![];
    let lists = [
        raw.get("isbn"),
        raw.get("identifiers").and_then(|ids| ids.get("isbn_13")),
        raw.get("identifiers").and_then(|ids| ids.get("isbn_10")),
    ];
    for list in lists.into_iter().flatten() {
        if let Some(items) = list.as_array() {
            values.extend(items.iter().filter_map(Value::as_str).map(str::to_string));
        }
    }
    values
}

/// First run of four digits in a free-text date.
pub fn extract_year(text: &str) -> Option<i32> {
    static YEAR: OnceLock<Regex> = OnceLock::new();
    let regex = YEAR.get_or_init(|| Regex::new(r"[0-9]{4}").expect("year pattern compiles"));
    regex.find(text)?.as_str().parse().ok()
}

/// Orders overlapping lookups so only the most recent one is applied.
#[derive(Debug, Default)]
pub struct LookupTracker {
    latest: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket(u64);

impl LookupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a lookup, superseding any still in flight.
    pub fn begin(&self) -> LookupTicket {
        LookupTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LookupTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Hands back `result` only if no newer lookup has begun.
    pub fn finish<T>(&self, ticket: LookupTicket, result: T) -> Option<T> {
        if self.is_current(ticket) {
            Some(result)
        } else {
            log::debug!("discarding stale lookup result ticket={}", ticket.0);
            None
        }
    }
}
