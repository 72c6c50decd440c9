use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Result type for library store writes.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while persisting the library.
///
/// Reads never produce these: a store that cannot be read is treated as empty.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("library store lock poisoned")]
    Lock,
}

/// A raw ISBN that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("ISBN must be 10 or 13 digits")]
    IsbnLength,

    #[error("Invalid ISBN format")]
    IsbnFormat,
}

/// Errors from an Open Library lookup.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidIsbn(#[from] ValidationError),

    /// The request succeeded but Open Library has no record for the key.
    #[error("Book not found for this ISBN")]
    NotFound,

    #[error("Failed to fetch book: {status} {reason}")]
    Status { status: u16, reason: String },

    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("unexpected lookup response: {0}")]
    Decode(String),
}

impl LookupError {
    /// Not-found is recoverable by switching to manual entry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LookupError::NotFound)
    }
}

/// Rejected page input on the progress editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageInputError {
    #[error("Enter a valid page number (0 or more).")]
    Invalid,

    #[error("Page cannot exceed {0}.")]
    ExceedsTotal(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    Isbn,
    Title,
    Authors,
    NumberOfPages,
    Publisher,
    PublishYear,
}

impl FormField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormField::Isbn => "isbn",
            FormField::Title => "title",
            FormField::Authors => "authors",
            FormField::NumberOfPages => "numberOfPages",
            FormField::Publisher => "publisher",
            FormField::PublishYear => "publishYear",
        }
    }
}

/// Per-field messages for a rejected manual entry, shown inline next to each field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<FormField, String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the first message reported for a field.
    pub fn insert(&mut self, field: FormField, message: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FormField, &str)> {
        self.errors
            .iter()
            .map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = self
            .iter()
            .map(|(field, message)| format!("{}: {}", field.as_str(), message))
            .collect::<Vec<_>>();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for FormErrors {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_status_message_carries_code_and_reason() {
        let err = LookupError::Status {
            status: 503,
            reason: "Service Unavailable".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch book: 503 Service Unavailable"
        );
        assert!(!err.is_not_found());
        assert!(LookupError::NotFound.is_not_found());
    }

    #[test]
    fn form_errors_keep_first_message_per_field() {
        let mut errors = FormErrors::new();
        errors.insert(FormField::Title, "Enter the book title");
        errors.insert(FormField::Title, "second message");
        errors.insert(FormField::Isbn, "ISBN is required");

        assert_eq!(errors.len(), 2);
        assert_eq!(errors.get(FormField::Title), Some("Enter the book title"));
        assert_eq!(
            errors.to_string(),
            "isbn: ISBN is required; title: Enter the book title"
        );
    }
}
