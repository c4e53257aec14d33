//! Pattern Classifier
//!
//! Maps a raw query to the coarse [`Pattern`] used as the routing key.
//! Pure and total: every query gets a pattern, `Generic` by default.
//!
//! Checks run in a fixed order and the first hit wins, so a query that looks
//! like both a street address and a business resolves to `StreetAddress`.

use crate::types::Pattern;
use once_cell::sync::Lazy;
use regex::Regex;

/// Five-digit postal code, optionally ZIP+4, spanning the whole query
static POSTAL_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{5}(-\d{4})?$").expect("valid postal code regex"));

/// House number, street word, street suffix
static STREET_ADDRESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\d+\s+\w+\s+(st|street|ave|avenue|rd|road|blvd|boulevard)\b")
        .expect("valid street address regex")
});

static BUSINESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(restaurant|store|hotel|business|shop|cafe)\b").expect("valid business regex")
});

static POINT_OF_INTEREST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(park|school|hospital|church|library)\b").expect("valid poi regex")
});

/// Classify a query into its routing pattern
pub fn classify(query: &str) -> Pattern {
    let query = query.trim();

    if POSTAL_CODE.is_match(query) {
        Pattern::PostalCode
    } else if STREET_ADDRESS.is_match(query) {
        Pattern::StreetAddress
    } else if BUSINESS.is_match(query) {
        Pattern::BusinessPoi
    } else if POINT_OF_INTEREST.is_match(query) {
        Pattern::PointOfInterest
    } else {
        Pattern::Generic
    }
}
