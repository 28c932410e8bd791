//! Field-specific text cleanup
//!
//! Applied to the winning OCR candidate. Exact text-layer results only get
//! whitespace normalization, since they are not subject to misreads.

use lazy_static::lazy_static;
use regex::Regex;

use crate::fields::FieldProfile;

lazy_static! {
    /// Numeric dates such as 12/03/2024, 1.2.24 or 03-11-2023
    static ref DATE_PATTERN: Regex =
        Regex::new(r"\d{1,2}[/.\-]\d{1,2}[/.\-]\d{2}(?:\d{2})?").unwrap();

    /// Alphanumeric runs joined by single separators, e.g. A-101 or M2.04
    static ref IDENTIFIER_TOKEN: Regex =
        Regex::new(r"[A-Za-z0-9]+(?:[-_./][A-Za-z0-9]+)*").unwrap();
}

/// Collapse whitespace runs to single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First date-shaped match, or the normalized text if there is none
pub fn clean_date(text: &str) -> String {
    let normalized = normalize_whitespace(text);
    match DATE_PATTERN.find(&normalized) {
        Some(m) => m.as_str().to_string(),
        None => normalized,
    }
}

/// First identifier token once date-like substrings are removed.
///
/// Title blocks often print the revision date right beside the sheet or
/// issue number, so a crop that catches both would otherwise return the date.
pub fn clean_identifier(text: &str) -> String {
    let without_dates = DATE_PATTERN.replace_all(text, " ");
    IDENTIFIER_TOKEN
        .find(&without_dates)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Clean recognized text for a field profile
pub fn clean(profile: FieldProfile, text: &str) -> String {
    match profile {
        FieldProfile::Date => clean_date(text),
        FieldProfile::Identifier => clean_identifier(text),
        FieldProfile::FreeText => normalize_whitespace(text),
    }
}
