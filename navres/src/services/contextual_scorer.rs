//! Contextual Scorer
//!
//! Re-ranks candidates for a business using caller-supplied side signals the
//! providers never see (phone number, address hint, area hint).
//!
//! # Scoring
//! `score = clamp(0.5 + Σ weight × sub_score)` over a fixed ordered list of
//! [`ScoringRule`]s. A rule whose signal is absent returns `None` and
//! contributes nothing.
//!
//! | Rule | Weight |
//! |------|--------|
//! | `phone_country` | 0.4 |
//! | `address_tokens` | 0.3 |
//! | `area_keywords` | 0.2 |
//! | `chain_ambiguity` | 0.1 |

use crate::services::known_locations::KnownLocations;
use crate::types::{Candidate, ScoredLocation, SideSignals};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

/// Neutral starting score before any rule applies
pub const BASE_SCORE: f64 = 0.5;

/// A candidate must score strictly above this to be selected
pub const DEFAULT_SELECTION_THRESHOLD: f64 = 0.6;

const FLORIDA_AREA_CODES: [&str; 16] = [
    "305", "321", "352", "386", "407", "561", "727", "754", "772", "786", "813", "850", "863", "904",
    "941", "954",
];

/// Businesses known to have several branches
const CHAINS: [&str; 4] = ["loon fung", "venchi", "seacoast bank", "crema coffee"];

static UK_PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+44|0)?(20|7|1)").expect("valid uk phone regex"));

static STREET_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\w+\s+(street|st|road|rd|avenue|ave|boulevard|blvd|drive|dr|lane|ln)\b")
        .expect("valid street phrase regex")
});

static AREA_KEYWORD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(london|manchester|birmingham|glasgow|edinburgh|cardiff|belfast|dublin|florida|california|texas|new york|chicago|miami|orlando|tampa|jacksonville)\b",
    )
    .expect("valid area keyword regex")
});

static FL_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bFL\b").expect("valid FL regex"));
static USA_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bUSA\b").expect("valid USA regex"));
static UK_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bUK\b").expect("valid UK regex"));

// ============================================================================
// Rules
// ============================================================================

/// One named, weighted heuristic
pub trait ScoringRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn weight(&self) -> f64;

    /// Sub-score in [0, 1], or `None` when the rule's signal is absent
    fn evaluate(&self, business_name: &str, candidate: &Candidate, signals: &SideSignals) -> Option<f64>;
}

/// Phone number country consistency
///
/// Long country names ("FLORIDA", "UNITED STATES") match as substrings of
/// the upper-cased address. The short tokens `FL`, `USA` and `UK` match only
/// as whole words, unlike a plain substring test: "Fleet Street, London, UK"
/// is not a Florida address, and "Tampa FL33602 USA" earns the USA score
/// rather than the Florida one.
pub struct PhoneCountryRule;

impl PhoneCountryRule {
    fn sub_score(phone: &str, address: &str) -> f64 {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        let address = address.to_uppercase();
        let names_usa = address.contains("UNITED STATES") || USA_WORD.is_match(&address);

        let us_area_code = match digits.len() {
            10 => Some(&digits[0..3]),
            11 if digits.starts_with('1') => Some(&digits[1..4]),
            _ => None,
        };

        if let Some(area_code) = us_area_code {
            if FLORIDA_AREA_CODES.contains(&area_code) {
                if address.contains("FLORIDA") || FL_WORD.is_match(&address) {
                    return 1.0;
                }
                return if names_usa { 0.8 } else { 0.0 };
            }

            if matches!(area_code.parse::<u16>(), Ok(200..=999)) {
                if names_usa {
                    return 0.9;
                }
                return if address.contains("CANADA") { 0.7 } else { 0.0 };
            }
        }

        let compact: String = phone
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '+')
            .collect();
        if UK_PHONE.is_match(&compact) {
            let names_uk = address.contains("UNITED KINGDOM")
                || UK_WORD.is_match(&address)
                || address.contains("ENGLAND")
                || address.contains("LONDON");
            return if names_uk { 1.0 } else { 0.0 };
        }

        0.5
    }
}

impl ScoringRule for PhoneCountryRule {
    fn name(&self) -> &'static str {
        "phone_country"
    }

    fn weight(&self) -> f64 {
        0.4
    }

    fn evaluate(&self, _business_name: &str, candidate: &Candidate, signals: &SideSignals) -> Option<f64> {
        let phone = signals.phone_number.as_deref()?;
        Some(Self::sub_score(phone, &candidate.formatted_address))
    }
}

/// Street phrases from the address hint found in the candidate address
pub struct AddressTokensRule;

impl ScoringRule for AddressTokensRule {
    fn name(&self) -> &'static str {
        "address_tokens"
    }

    fn weight(&self) -> f64 {
        0.3
    }

    fn evaluate(&self, _business_name: &str, candidate: &Candidate, signals: &SideSignals) -> Option<f64> {
        let hint = signals.address_hint.as_deref()?;
        Some(fraction_found(&STREET_PHRASE, hint, &candidate.formatted_address))
    }
}

/// Gazetteer keywords from the area hint found in the candidate address
pub struct AreaKeywordsRule;

impl ScoringRule for AreaKeywordsRule {
    fn name(&self) -> &'static str {
        "area_keywords"
    }

    fn weight(&self) -> f64 {
        0.2
    }

    fn evaluate(&self, _business_name: &str, candidate: &Candidate, signals: &SideSignals) -> Option<f64> {
        let hint = signals.area_hint.as_deref()?;
        Some(fraction_found(&AREA_KEYWORD, hint, &candidate.formatted_address))
    }
}

/// Chains are ambiguous unless the candidate is street-level
pub struct ChainAmbiguityRule;

impl ScoringRule for ChainAmbiguityRule {
    fn name(&self) -> &'static str {
        "chain_ambiguity"
    }

    fn weight(&self) -> f64 {
        0.1
    }

    fn evaluate(&self, business_name: &str, candidate: &Candidate, _signals: &SideSignals) -> Option<f64> {
        let name = business_name.to_lowercase();
        if !CHAINS.iter().any(|chain| name.contains(chain)) {
            return Some(0.5);
        }

        let address = candidate.formatted_address.to_lowercase();
        let street_level = address.contains("street") || address.contains("road");
        Some(if street_level { 0.8 } else { 0.3 })
    }
}

/// Share of `pattern` matches in `hint` that also appear in `address`
///
/// 0.5 when the hint yields no matches.
fn fraction_found(pattern: &Regex, hint: &str, address: &str) -> f64 {
    let hint = hint.to_lowercase();
    let address = address.to_lowercase();

    let tokens: Vec<&str> = pattern.find_iter(&hint).map(|m| m.as_str()).collect();
    if tokens.is_empty() {
        return 0.5;
    }

    let found = tokens.iter().filter(|token| address.contains(*token)).count();
    found as f64 / tokens.len() as f64
}

/// Rules in evaluation order
pub fn default_rules() -> Vec<Box<dyn ScoringRule>> {
    vec![
        Box::new(PhoneCountryRule),
        Box::new(AddressTokensRule),
        Box::new(AreaKeywordsRule),
        Box::new(ChainAmbiguityRule),
    ]
}

// ============================================================================
// Scorer
// ============================================================================

pub struct ContextualScorer {
    rules: Vec<Box<dyn ScoringRule>>,
    known_locations: KnownLocations,
    threshold: f64,
}

impl Default for ContextualScorer {
    fn default() -> Self {
        Self::new(KnownLocations::builtin())
    }
}

impl ContextualScorer {
    pub fn new(known_locations: KnownLocations) -> Self {
        Self {
            rules: default_rules(),
            known_locations,
            threshold: DEFAULT_SELECTION_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Contextual score of one candidate (0.0-1.0)
    pub fn score(&self, business_name: &str, candidate: &Candidate, signals: &SideSignals) -> f64 {
        let total = self.rules.iter().fold(BASE_SCORE, |acc, rule| {
            match rule.evaluate(business_name, candidate, signals) {
                Some(sub_score) => acc + rule.weight() * sub_score.clamp(0.0, 1.0),
                None => acc,
            }
        });

        total.clamp(0.0, 1.0)
    }

    /// Score every candidate, highest first (stable on ties)
    pub fn rank(&self, business_name: &str, candidates: &[Candidate], signals: &SideSignals) -> Vec<ScoredLocation> {
        let mut scored: Vec<ScoredLocation> = candidates
            .iter()
            .map(|candidate| ScoredLocation {
                score: self.score(business_name, candidate, signals),
                candidate: candidate.clone(),
                from_override: false,
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored
    }

    /// Best candidate for `business_name`, or `None` when nothing is confident
    ///
    /// A known-location override wins unconditionally. Otherwise the highest
    /// score (first on ties) is returned only if it clears the threshold.
    pub fn select_best(
        &self,
        business_name: &str,
        candidates: &[Candidate],
        signals: &SideSignals,
    ) -> Option<ScoredLocation> {
        if let Some(candidate) = self
            .known_locations
            .lookup(business_name, signals.phone_number.as_deref())
        {
            info!(business = %business_name, "Using known location");
            return Some(ScoredLocation {
                candidate,
                score: 1.0,
                from_override: true,
            });
        }

        let mut best: Option<ScoredLocation> = None;
        for candidate in candidates {
            let score = self.score(business_name, candidate, signals);
            debug!(
                business = %business_name,
                address = %candidate.formatted_address,
                provider = %candidate.provider_name,
                score,
                "Scored candidate"
            );

            if best.as_ref().map_or(true, |b| score > b.score) {
                best = Some(ScoredLocation {
                    candidate: candidate.clone(),
                    score,
                    from_override: false,
                });
            }
        }

        match best {
            Some(best) if best.score > self.threshold => {
                info!(
                    business = %business_name,
                    address = %best.candidate.formatted_address,
                    score = best.score,
                    "Selected best location"
                );
                Some(best)
            }
            best => {
                info!(
                    business = %business_name,
                    best_score = best.as_ref().map(|b| b.score),
                    threshold = self.threshold,
                    "No location met the selection threshold"
                );
                None
            }
        }
    }

    /// Highest score among `candidates`, ignoring the threshold
    pub fn best_score(&self, business_name: &str, candidates: &[Candidate], signals: &SideSignals) -> Option<f64> {
        candidates
            .iter()
            .map(|c| self.score(business_name, c, signals))
            .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s))))
    }
}
