//! Known-location overrides
//!
//! Curated business-to-location pins that beat any provider answer. Each
//! entry matches on uppercase name fragments (all must appear) and, when
//! present, a phone digit fragment.

use crate::types::{Candidate, Coordinates};
use navres_common::config::KnownLocationEntry;
use tracing::debug;

/// Provider name stamped on override candidates
pub const KNOWN_LOCATION_PROVIDER: &str = "known_location";

/// One curated override
#[derive(Debug, Clone, PartialEq)]
pub struct KnownLocationOverride {
    /// Uppercase fragments that must all appear in the business name
    pub name_fragments: Vec<String>,
    /// Digits that must appear in the caller's phone number
    pub phone_fragment: Option<String>,
    pub address: String,
    pub location: Coordinates,
}

impl KnownLocationOverride {
    pub fn matches(&self, business_name: &str, phone_number: Option<&str>) -> bool {
        let name = business_name.to_uppercase();
        if !self.name_fragments.iter().all(|fragment| name.contains(fragment.as_str())) {
            return false;
        }

        match &self.phone_fragment {
            None => true,
            Some(fragment) => phone_number
                .map(|phone| digits_only(phone).contains(fragment.as_str()))
                .unwrap_or(false),
        }
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(
            self.location.latitude,
            self.location.longitude,
            self.address.clone(),
            1.0,
            KNOWN_LOCATION_PROVIDER,
        )
    }
}

impl From<&KnownLocationEntry> for KnownLocationOverride {
    fn from(entry: &KnownLocationEntry) -> Self {
        Self {
            name_fragments: entry.name_fragments.iter().map(|f| f.to_uppercase()).collect(),
            phone_fragment: entry
                .phone_fragment
                .as_deref()
                .map(digits_only)
                .filter(|digits| !digits.is_empty()),
            address: entry.address.clone(),
            location: Coordinates::new(entry.latitude, entry.longitude),
        }
    }
}

/// Ordered override table; the first matching entry wins
#[derive(Debug, Clone)]
pub struct KnownLocations {
    entries: Vec<KnownLocationOverride>,
}

impl Default for KnownLocations {
    fn default() -> Self {
        Self::builtin()
    }
}

impl KnownLocations {
    /// Table containing only the built-in overrides
    pub fn builtin() -> Self {
        Self {
            entries: vec![KnownLocationOverride {
                name_fragments: vec!["RESULTS".to_string(), "BOUNDS GREEN".to_string()],
                phone_fragment: Some("07793600213".to_string()),
                address: "Alexandra Park Road, London N10, UK".to_string(),
                location: Coordinates::new(51.5885, -0.1347),
            }],
        }
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Append configured overrides after the existing ones
    pub fn with_entries(mut self, entries: &[KnownLocationEntry]) -> Self {
        self.entries.extend(
            entries
                .iter()
                .filter(|e| !e.name_fragments.is_empty())
                .map(KnownLocationOverride::from),
        );
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lookup(&self, business_name: &str, phone_number: Option<&str>) -> Option<Candidate> {
        let hit = self
            .entries
            .iter()
            .find(|entry| entry.matches(business_name, phone_number))?;

        debug!(business = %business_name, address = %hit.address, "Known location override matched");
        Some(hit.to_candidate())
    }
}

fn digits_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}
