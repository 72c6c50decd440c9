//! Manual book entry, used when a lookup finds nothing.

use serde::{Deserialize, Serialize};

use crate::error::{FormErrors, FormField};
use crate::isbn;
use crate::models::{Book, BookSource, PUBLISH_YEARS};

/// Raw form input, exactly as typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualBookForm {
    pub isbn: String,
    pub title: String,
    /// Comma separated.
    pub authors: String,
    pub number_of_pages: String,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub publish_year: Option<String>,
}

impl ManualBookForm {
    /// Validates every field and builds a manual [`Book`], or reports all failing fields.
    pub fn validate(&self) -> Result<Book, FormErrors> {
        let mut errors = FormErrors::new();

        let isbn = if self.isbn.trim().is_empty() {
            errors.insert(FormField::Isbn, "ISBN is required");
            None
        } else {
            match isbn::normalize_isbn(&self.isbn) {
                Ok(value) => Some(value),
                Err(err) => {
                    errors.insert(FormField::Isbn, err.to_string());
                    None
                }
            }
        };

        let title = self.title.trim();
        if title.is_empty() {
            errors.insert(FormField::Title, "Enter the book title");
        }

        let authors = split_authors(&self.authors);
        if self.authors.trim().is_empty() {
            errors.insert(FormField::Authors, "Enter an author or authors (comma separated)");
        } else if authors.is_empty() {
            errors.insert(FormField::Authors, "Specify at least one author");
        }

        let pages = self.number_of_pages.trim();
        let number_of_pages = if pages.is_empty() {
            errors.insert(FormField::NumberOfPages, "Enter the number of pages");
            None
        } else if !pages.chars().all(|ch| ch.is_ascii_digit()) {
            errors.insert(FormField::NumberOfPages, "Enter a whole number");
            None
        } else {
            match pages.parse::<u32>() {
                Ok(0) => {
                    errors.insert(FormField::NumberOfPages, "Number of pages must be greater than 0");
                    None
                }
                Ok(value) => Some(value),
                Err(_) => {
                    errors.insert(FormField::NumberOfPages, "Number of pages is too large");
                    None
                }
            }
        };

        let publisher = self
            .publisher
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        let publish_year = match self.publish_year.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if value.len() == 4 && value.chars().all(|ch| ch.is_ascii_digit()) => {
                match value.parse::<i32>() {
                    Ok(year) if PUBLISH_YEARS.contains(&year) => Some(year),
                    _ => {
                        errors.insert(FormField::PublishYear, "Enter a valid year");
                        None
                    }
                }
            }
            Some(_) => {
                errors.insert(FormField::PublishYear, "Year: 4 digits");
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        let mut book = Book::new(title, authors, BookSource::Manual);
        if let Some(isbn) = isbn {
            if isbn::is_isbn13(&isbn) {
                book.isbn13 = Some(isbn);
            } else {
                book.isbn = Some(isbn);
            }
        }
        book.publisher = publisher;
        book.publish_year = publish_year;
        book.number_of_pages = number_of_pages;
        Ok(book)
    }
}

fn split_authors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
