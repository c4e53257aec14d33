//! Core Types and Trait Definitions for navres
//!
//! Defines the provider seam and the value types that flow through the
//! resolution engine:
//! - **Providers:** `GeocodeProvider` adapters produce `Candidate`s
//! - **Routing:** `Pattern` keys the learned `RoutingStat`s
//! - **Verification:** `VerificationResult` with `Alternative`s
//! - **Scoring:** `SideSignals` in, `ScoredLocation` out

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Locations
// ============================================================================

/// Latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One provider's geocoded guess for a query
///
/// Never mutated after creation; builder-style methods return new values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    /// Provider-native confidence (0.0-1.0)
    pub provider_confidence: f64,
    pub provider_name: String,
    /// When the provider produced this result
    pub observed_at: DateTime<Utc>,
}

impl Candidate {
    /// Create new candidate observed now, with clamped confidence (0.0-1.0)
    pub fn new(
        latitude: f64,
        longitude: f64,
        formatted_address: impl Into<String>,
        provider_confidence: f64,
        provider_name: impl Into<String>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            formatted_address: formatted_address.into(),
            provider_confidence: provider_confidence.clamp(0.0, 1.0),
            provider_name: provider_name.into(),
            observed_at: Utc::now(),
        }
    }

    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Copy of this candidate carrying a different (clamped) confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.provider_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

// ============================================================================
// Routing
// ============================================================================

/// Coarse query-shape category used as the routing key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    PostalCode,
    StreetAddress,
    BusinessPoi,
    PointOfInterest,
    Generic,
}

impl Pattern {
    pub const ALL: [Pattern; 5] = [
        Pattern::PostalCode,
        Pattern::StreetAddress,
        Pattern::BusinessPoi,
        Pattern::PointOfInterest,
        Pattern::Generic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Pattern::PostalCode => "postal_code",
            Pattern::StreetAddress => "street_address",
            Pattern::BusinessPoi => "business_poi",
            Pattern::PointOfInterest => "point_of_interest",
            Pattern::Generic => "generic",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pattern::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown pattern '{}'", s))
    }
}

/// Per-pattern routing aggregate
///
/// Grows monotonically: counters are only ever incremented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingStat {
    /// Successful outcomes per provider name
    pub provider_counts: BTreeMap<String, u64>,
    /// All recorded outcomes for the pattern
    pub total_observations: u64,
}

impl RoutingStat {
    pub fn success_count(&self, provider: &str) -> u64 {
        self.provider_counts.get(provider).copied().unwrap_or(0)
    }

    /// Count one outcome; only successes are credited to the provider
    pub fn record(&mut self, provider: &str, success: bool) {
        self.total_observations += 1;
        if success {
            *self.provider_counts.entry(provider.to_string()).or_insert(0) += 1;
        }
    }

    /// Provider with the most successes, restricted to `candidates`
    ///
    /// Ties resolve to the provider listed first in `candidates`. Returns
    /// `None` when no candidate has a recorded success.
    pub fn best_provider<'a>(&self, candidates: &'a [String]) -> Option<&'a str> {
        let mut best: Option<(&'a str, u64)> = None;
        for name in candidates {
            let count = self.success_count(name);
            if count == 0 {
                continue;
            }
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((name.as_str(), count)),
            }
        }
        best.map(|(name, _)| name)
    }
}

// ============================================================================
// Verification
// ============================================================================

/// Outcome of one consensus verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// True only when at least two sources agree within the consensus radius
    pub verified: bool,
    pub confidence: f64,
    /// Absent only when no source returned anything
    pub consensus_location: Option<Coordinates>,
    pub consensus_address: Option<String>,
    pub sources: Vec<Candidate>,
    pub warnings: Vec<String>,
    pub alternatives: Vec<Alternative>,
}

/// A location suggested by a non-winning cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub address: String,
    pub confidence: f64,
    pub reason: String,
}

// ============================================================================
// Scoring
// ============================================================================

/// Caller-supplied context the providers never see
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SideSignals {
    pub phone_number: Option<String>,
    pub address_hint: Option<String>,
    pub area_hint: Option<String>,
}

impl SideSignals {
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone_number = Some(phone.into());
        self
    }

    pub fn with_address_hint(mut self, hint: impl Into<String>) -> Self {
        self.address_hint = Some(hint.into());
        self
    }

    pub fn with_area_hint(mut self, hint: impl Into<String>) -> Self {
        self.area_hint = Some(hint.into());
        self
    }
}

/// Candidate annotated with its contextual score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLocation {
    pub candidate: Candidate,
    /// Blended score (0.0-1.0)
    pub score: f64,
    /// True when a known-location override produced this result
    pub from_override: bool,
}

// ============================================================================
// Provider Seam
// ============================================================================

/// Uniform interface to one external geocoding/places source
///
/// Adapters are thin: authentication, URL construction and response mapping
/// stay inside the adapter. Failures are per-call and never abort a
/// resolution; callers treat every error as "this provider had nothing".
#[async_trait::async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Provider name used for routing statistics and provenance
    fn name(&self) -> &str;

    /// Geocode a free-form query to a single best candidate
    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError>;
}

/// Provider call failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Network, authentication or quota failure
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Upstream answered but had no result for the query
    #[error("No results")]
    NoResults,

    /// Upstream response could not be interpreted
    #[error("Parse error: {0}")]
    Parse(String),

    /// Call exceeded the per-call timeout
    #[error("Timed out after {0} ms")]
    Timeout(u128),

    /// Adapter lacks required configuration (e.g. API key)
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}
