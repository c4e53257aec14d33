//! Consensus Verifier
//!
//! Cross-checks a query against several independent sources and decides
//! whether enough of them agree on one location.
//!
//! # Algorithm
//! 1. Fan out to every verification source concurrently
//! 2. Cluster candidates by proximity to each cluster's first member
//! 3. Largest cluster with at least [`MIN_AGREEING_SOURCES`] members wins
//! 4. Remaining clusters become alternatives
//!
//! Steps 2-4 are [`find_consensus`], a pure function of the candidate list
//! and the current time.

use crate::providers::ParallelGeocoder;
use crate::types::{Alternative, Candidate, Coordinates, VerificationResult};
use crate::utils::geo::{centroid, haversine_distance_m};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Maximum distance from a cluster's first member to join it (meters)
pub const CONSENSUS_RADIUS_M: f64 = 100.0;

/// Sources that must agree before a location counts as verified
pub const MIN_AGREEING_SOURCES: usize = 2;

/// Maximum alternatives reported
pub const MAX_ALTERNATIVES: usize = 3;

/// Age beyond which consensus data is flagged as possibly outdated
pub const STALE_AFTER_DAYS: i64 = 30;

/// Confidence ceiling for a verified consensus
pub const MAX_CONSENSUS_CONFIDENCE: f64 = 0.95;

const INSUFFICIENT_CONFIDENCE: f64 = 0.3;
const DISAGREEMENT_CONFIDENCE: f64 = 0.5;

pub const WARN_INSUFFICIENT: &str = "Insufficient sources for verification";
pub const WARN_DISAGREE: &str = "Sources disagree on location";
pub const WARN_ONLY_TWO: &str = "Only 2 sources agree - location may need additional verification";
pub const WARN_MULTIPLE: &str = "Multiple possible locations found - please verify";
pub const WARN_OUTDATED: &str = "Some location data may be outdated";

/// Multi-source location verifier
pub struct ConsensusVerifier {
    sources: ParallelGeocoder,
}

impl ConsensusVerifier {
    pub fn new(sources: ParallelGeocoder) -> Self {
        Self { sources }
    }

    /// Number of configured verification sources
    pub fn source_count(&self) -> usize {
        self.sources.count()
    }

    /// Verify `query` against every source, plus `primary` when supplied
    ///
    /// The source that produced `primary` is not asked again, so one
    /// provider never agrees with itself.
    pub async fn verify(&self, query: &str, primary: Option<Candidate>) -> VerificationResult {
        let skip = primary.as_ref().map(|p| p.provider_name.as_str());
        let mut candidates = self.sources.geocode_all_except(query, skip).await;
        candidates.extend(primary);

        debug!(
            query = %query,
            sources = self.sources.count(),
            candidates = candidates.len(),
            "Verification fan-out complete"
        );

        let result = find_consensus(candidates, Utc::now());

        info!(
            query = %query,
            verified = result.verified,
            confidence = result.confidence,
            alternatives = result.alternatives.len(),
            "Verification finished"
        );

        result
    }
}

/// Group candidates by proximity to each cluster's first member
///
/// A candidate joins the first cluster whose seed is within
/// [`CONSENSUS_RADIUS_M`]; otherwise it seeds a new cluster. Membership is
/// order-dependent and seeds never move.
pub fn cluster_by_proximity(candidates: Vec<Candidate>) -> Vec<Vec<Candidate>> {
    let mut clusters: Vec<Vec<Candidate>> = Vec::new();

    for candidate in candidates {
        let position = candidate.coordinates();
        let home = clusters
            .iter_mut()
            .find(|cluster| haversine_distance_m(cluster[0].coordinates(), position) <= CONSENSUS_RADIUS_M);

        match home {
            Some(cluster) => cluster.push(candidate),
            None => clusters.push(vec![candidate]),
        }
    }

    clusters
}

/// Decide consensus over an already-collected candidate list
pub fn find_consensus(candidates: Vec<Candidate>, now: DateTime<Utc>) -> VerificationResult {
    if candidates.len() < MIN_AGREEING_SOURCES {
        let first = candidates.first();
        return VerificationResult {
            verified: false,
            confidence: INSUFFICIENT_CONFIDENCE,
            consensus_location: first.map(Candidate::coordinates),
            consensus_address: first.map(|c| c.formatted_address.clone()),
            sources: candidates,
            warnings: vec![WARN_INSUFFICIENT.to_string()],
            alternatives: Vec::new(),
        };
    }

    let mut clusters = cluster_by_proximity(candidates.clone());

    // Largest cluster, first on ties
    let winner_index = clusters
        .iter()
        .enumerate()
        .fold(0, |best, (i, cluster)| if cluster.len() > clusters[best].len() { i } else { best });

    if clusters[winner_index].len() < MIN_AGREEING_SOURCES {
        let first = &candidates[0];
        return VerificationResult {
            verified: false,
            confidence: DISAGREEMENT_CONFIDENCE,
            consensus_location: Some(first.coordinates()),
            consensus_address: Some(first.formatted_address.clone()),
            alternatives: alternatives_from(&clusters),
            sources: candidates,
            warnings: vec![WARN_DISAGREE.to_string()],
        };
    }

    let winner = clusters.remove(winner_index);
    let points: Vec<Coordinates> = winner.iter().map(Candidate::coordinates).collect();
    let best = best_member(&winner);

    let confidence =
        (winner.len() as f64 * 0.2 + best.provider_confidence).min(MAX_CONSENSUS_CONFIDENCE);

    let mut warnings = Vec::new();
    if winner.len() == MIN_AGREEING_SOURCES {
        warnings.push(WARN_ONLY_TWO.to_string());
    }
    if !clusters.is_empty() {
        warnings.push(WARN_MULTIPLE.to_string());
    }
    let stale_cutoff = now - Duration::days(STALE_AFTER_DAYS);
    if winner.iter().any(|c| c.observed_at < stale_cutoff) {
        warnings.push(WARN_OUTDATED.to_string());
    }

    VerificationResult {
        verified: true,
        confidence,
        consensus_location: centroid(&points),
        consensus_address: Some(best.formatted_address.clone()),
        alternatives: alternatives_from(&clusters),
        sources: winner,
        warnings,
    }
}

/// Highest-confidence member, first on ties
fn best_member(cluster: &[Candidate]) -> &Candidate {
    cluster
        .iter()
        .skip(1)
        .fold(&cluster[0], |best, c| {
            if c.provider_confidence > best.provider_confidence {
                c
            } else {
                best
            }
        })
}

fn alternatives_from(clusters: &[Vec<Candidate>]) -> Vec<Alternative> {
    clusters
        .iter()
        .take(MAX_ALTERNATIVES)
        .map(|cluster| {
            let best = best_member(cluster);
            let plural = if cluster.len() == 1 { "" } else { "s" };
            Alternative {
                address: best.formatted_address.clone(),
                confidence: best.provider_confidence,
                reason: format!("Alternative location ({} source{})", cluster.len(), plural),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;
    use crate::types::GeocodeProvider;
    use std::sync::Arc;

    // 0.00045 degrees of latitude is roughly 50 m
    const FIFTY_M_LAT: f64 = 0.00045;

    fn candidate(name: &str, lat: f64, lon: f64, confidence: f64) -> Candidate {
        Candidate::new(lat, lon, format!("{} address", name), confidence, name)
    }

    // ========================================================================
    // Clustering
    // ========================================================================

    #[test]
    fn test_cluster_joins_within_radius() {
        let clusters = cluster_by_proximity(vec![
            candidate("a", 40.0, -74.0, 0.8),
            candidate("b", 40.0 + FIFTY_M_LAT, -74.0, 0.8),
            candidate("c", 40.01, -74.0, 0.8),
        ]);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[1][0].provider_name, "c");
    }

    #[test]
    fn test_cluster_membership_measured_from_seed() {
        // b is 50 m from a, c is 50 m from b but 100+ m from a
        let clusters = cluster_by_proximity(vec![
            candidate("a", 40.0, -74.0, 0.8),
            candidate("b", 40.0 + FIFTY_M_LAT, -74.0, 0.8),
            candidate("c", 40.0 + 2.5 * FIFTY_M_LAT, -74.0, 0.8),
        ]);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[1][0].provider_name, "c");
    }

    // ========================================================================
    // Consensus
    // ========================================================================

    #[test]
    fn test_no_sources() {
        let result = find_consensus(Vec::new(), Utc::now());
        assert!(!result.verified);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.consensus_location, None);
        assert_eq!(result.warnings, vec![WARN_INSUFFICIENT]);
    }

    #[test]
    fn test_single_source() {
        let result = find_consensus(vec![candidate("a", 1.0, 2.0, 0.9)], Utc::now());
        assert!(!result.verified);
        assert_eq!(result.confidence, 0.3);
        assert_eq!(result.consensus_location, Some(Coordinates::new(1.0, 2.0)));
        assert_eq!(result.sources.len(), 1);
    }

    #[test]
    fn test_all_sources_disagree() {
        let result = find_consensus(
            vec![
                candidate("a", 40.0, -74.0, 0.8),
                candidate("b", 41.0, -74.0, 0.9),
                candidate("c", 42.0, -74.0, 0.7),
                candidate("d", 43.0, -74.0, 0.6),
            ],
            Utc::now(),
        );

        assert!(!result.verified);
        assert_eq!(result.confidence, 0.5);
        assert_eq!(result.consensus_address.as_deref(), Some("a address"));
        assert_eq!(result.warnings, vec![WARN_DISAGREE]);
        assert_eq!(result.sources.len(), 4);
        assert_eq!(result.alternatives.len(), MAX_ALTERNATIVES);
        assert_eq!(result.alternatives[0].reason, "Alternative location (1 source)");
    }

    #[test]
    fn test_two_agree_one_outlier() {
        let result = find_consensus(
            vec![
                candidate("maps", 40.0, -74.0, 0.8),
                candidate("places", 40.0 + FIFTY_M_LAT, -74.0, 0.9),
                candidate("geocodio", 40.0045, -74.0, 0.7),
            ],
            Utc::now(),
        );

        assert!(result.verified);
        assert!((result.confidence - 0.95).abs() < 1e-9);
        assert_eq!(result.consensus_address.as_deref(), Some("places address"));
        let location = result.consensus_location.unwrap();
        assert!((location.latitude - (40.0 + FIFTY_M_LAT / 2.0)).abs() < 1e-9);
        assert_eq!(result.sources.len(), 2);
        assert_eq!(result.warnings, vec![WARN_ONLY_TWO, WARN_MULTIPLE]);
        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].address, "geocodio address");
    }

    #[test]
    fn test_confidence_formula_below_cap() {
        let result = find_consensus(
            vec![
                candidate("a", 10.0, 10.0, 0.3),
                candidate("b", 10.0, 10.0, 0.2),
                candidate("c", 10.0, 10.0, 0.1),
            ],
            Utc::now(),
        );

        assert!(result.verified);
        assert!((result.confidence - 0.9).abs() < 1e-9);
        assert!(result.warnings.is_empty());
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn test_stale_consensus_member_warns() {
        let now = Utc::now();
        let result = find_consensus(
            vec![
                candidate("a", 10.0, 10.0, 0.8).with_observed_at(now - Duration::days(45)),
                candidate("b", 10.0, 10.0, 0.8),
                candidate("c", 10.0, 10.0, 0.8),
            ],
            now,
        );

        assert_eq!(result.warnings, vec![WARN_OUTDATED]);
    }

    #[test]
    fn test_alternative_reason_pluralized() {
        let result = find_consensus(
            vec![
                candidate("a", 10.0, 10.0, 0.8),
                candidate("b", 10.0, 10.0, 0.8),
                candidate("c", 10.0, 10.0, 0.8),
                candidate("d", 20.0, 20.0, 0.6),
                candidate("e", 20.0, 20.0, 0.7),
            ],
            Utc::now(),
        );

        assert_eq!(result.alternatives.len(), 1);
        assert_eq!(result.alternatives[0].reason, "Alternative location (2 sources)");
        assert_eq!(result.alternatives[0].confidence, 0.7);
    }

    #[test]
    fn test_find_consensus_deterministic() {
        let now = Utc::now();
        let inputs = vec![
            candidate("a", 40.0, -74.0, 0.8),
            candidate("b", 40.0 + FIFTY_M_LAT, -74.0, 0.9),
            candidate("c", 41.0, -74.0, 0.7),
        ];

        assert_eq!(find_consensus(inputs.clone(), now), find_consensus(inputs, now));
    }

    // ========================================================================
    // Fan-out
    // ========================================================================

    #[tokio::test]
    async fn test_verify_appends_primary_after_sources() {
        let sources: Vec<Arc<dyn GeocodeProvider>> = vec![
            Arc::new(MockProvider::returning("place_finder", 40.0, -74.0, "PF", 0.8)),
            Arc::new(MockProvider::failing(
                "places",
                crate::types::ProviderError::Unavailable("quota".into()),
            )),
        ];
        let verifier = ConsensusVerifier::new(ParallelGeocoder::new(sources));
        assert_eq!(verifier.source_count(), 2);

        let primary = candidate("maps", 40.0 + FIFTY_M_LAT, -74.0, 1.0);
        let result = verifier.verify("123 Main Street", Some(primary)).await;

        assert!(result.verified);
        let names: Vec<_> = result.sources.iter().map(|c| c.provider_name.as_str()).collect();
        assert_eq!(names, vec!["place_finder", "maps"]);
    }

    #[tokio::test]
    async fn test_verify_skips_source_that_produced_primary() {
        let maps = Arc::new(MockProvider::returning("maps", 40.0, -74.0, "123 Main St", 1.0));
        let verifier = ConsensusVerifier::new(ParallelGeocoder::new(vec![maps.clone() as Arc<dyn GeocodeProvider>]));

        let primary = maps.geocode("123 Main Street").await.unwrap();
        let result = verifier.verify("123 Main Street", Some(primary)).await;

        assert!(!result.verified);
        assert_eq!(result.confidence, INSUFFICIENT_CONFIDENCE);
        assert_eq!(result.warnings, vec![WARN_INSUFFICIENT.to_string()]);
        let names: Vec<_> = result.sources.iter().map(|c| c.provider_name.as_str()).collect();
        assert_eq!(names, vec!["maps"]);
        assert_eq!(maps.call_count(), 1);
    }

    #[tokio::test]
    async fn test_verify_primary_still_needs_an_independent_match() {
        let sources: Vec<Arc<dyn GeocodeProvider>> = vec![
            Arc::new(MockProvider::returning("maps", 40.0, -74.0, "123 Main St", 1.0)),
            Arc::new(MockProvider::returning("geocodio", 40.0 + FIFTY_M_LAT, -74.0, "123 Main Street", 0.9)),
        ];
        let verifier = ConsensusVerifier::new(ParallelGeocoder::new(sources));

        let primary = candidate("maps", 40.0, -74.0, 1.0);
        let result = verifier.verify("123 Main Street", Some(primary)).await;

        assert!(result.verified);
        let names: Vec<_> = result.sources.iter().map(|c| c.provider_name.as_str()).collect();
        assert_eq!(names, vec!["geocodio", "maps"]);
        assert_eq!(result.warnings, vec![WARN_ONLY_TWO.to_string()]);
    }
}
