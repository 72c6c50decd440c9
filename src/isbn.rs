use std::sync::OnceLock;

use regex::Regex;

use crate::error::ValidationError;

fn isbn10_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]{9}[0-9Xx]$").expect("ISBN-10 pattern compiles"))
}

fn isbn13_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^97[89][0-9]{10}$").expect("ISBN-13 pattern compiles"))
}

/// Removes whitespace and hyphens.
pub fn strip_isbn(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_whitespace() && *ch != '-')
        .collect()
}

/// Validates a raw ISBN and returns its compact form.
///
/// Accepts 10 characters (the last may be `X`) or a 978/979-prefixed 13 digit
/// value. Check digits are not verified here, see [`has_valid_checksum`].
pub fn normalize_isbn(value: &str) -> Result<String, ValidationError> {
    let stripped = strip_isbn(value);
    let valid = match stripped.chars().count() {
        10 => isbn10_pattern().is_match(&stripped),
        13 => isbn13_pattern().is_match(&stripped),
        _ => return Err(ValidationError::IsbnLength),
    };
    if valid {
        Ok(stripped)
    } else {
        Err(ValidationError::IsbnFormat)
    }
}

pub fn is_isbn10(value: &str) -> bool {
    value.len() == 10 && isbn10_pattern().is_match(value)
}

pub fn is_isbn13(value: &str) -> bool {
    value.len() == 13 && isbn13_pattern().is_match(value)
}

/// Verifies the check digit of an already normalized ISBN-10 or ISBN-13.
pub fn has_valid_checksum(value: &str) -> bool {
    match value.len() {
        10 => isbn10_checksum_ok(value),
        13 => isbn13_checksum_ok(value),
        _ => false,
    }
}

fn isbn10_checksum_ok(value: &str) -> bool {
    let mut sum = 0u32;
    for (index, ch) in value.chars().enumerate() {
        let digit = match (index, ch) {
            (9, 'X' | 'x') => 10,
            _ => match ch.to_digit(10) {
                Some(digit) => digit,
                None => return false,
            },
        };
        sum += digit * (10 - index as u32);
    }
    sum % 11 == 0
}

fn isbn13_checksum_ok(value: &str) -> bool {
    let mut sum = 0u32;
    for (index, ch) in value.chars().enumerate() {
        let Some(digit) = ch.to_digit(10) else {
            return false;
        };
        sum += if index % 2 == 0 { digit } else { digit * 3 };
    }
    sum % 10 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_isbn13() {
        assert_eq!(normalize_isbn("9780132350889"), Ok("9780132350889".to_string()));
    }

    #[test]
    fn hyphens_and_spaces_are_stripped() {
        assert_eq!(normalize_isbn("978-0-13-235088-9"), Ok("9780132350889".to_string()));
        assert_eq!(normalize_isbn(" 0 13 235088 2 "), Ok("0132350882".to_string()));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(normalize_isbn("12345"), Err(ValidationError::IsbnLength));
        assert_eq!(normalize_isbn(""), Err(ValidationError::IsbnLength));
    }

    #[test]
    fn rejects_check_symbol_in_isbn13() {
        assert_eq!(normalize_isbn("979812345678X"), Err(ValidationError::IsbnFormat));
    }

    #[test]
    fn rejects_isbn13_without_bookland_prefix() {
        assert_eq!(normalize_isbn("1234567890123"), Err(ValidationError::IsbnFormat));
    }

    #[test]
    fn isbn10_accepts_lowercase_check_symbol() {
        assert_eq!(normalize_isbn("080442957x"), Ok("080442957x".to_string()));
        assert_eq!(normalize_isbn("08044295X7"), Err(ValidationError::IsbnFormat));
    }

    #[test]
    fn rejects_non_ascii_digits() {
        assert_eq!(normalize_isbn("٩٧٨٠١٣٢٣٥٠٨٨٩"), Err(ValidationError::IsbnFormat));
    }

    #[test]
    fn checksum_verification() {
        assert!(has_valid_checksum("9780132350884"));
        assert!(!has_valid_checksum("9780132350889"));
        assert!(has_valid_checksum("0132350882"));
        assert!(has_valid_checksum("080442957X"));
        assert!(!has_valid_checksum("12345"));
    }
}
