//! Resolution Facade
//!
//! Single entry point tying the engine together:
//! - `resolve` runs the adaptive cascade and learns from accepted results
//! - `verify` cross-checks a query against the verification sources
//! - `select_best` re-ranks candidates with caller side signals
//! - `record_feedback` logs user verdicts on served results

use crate::error::{ResolveError, ResolveResult};
use crate::providers::{geocode_with_timeout, ParallelGeocoder, DEFAULT_PROVIDER_TIMEOUT};
use crate::services::adaptive_router::{AdaptiveRouter, DEFAULT_MIN_OBSERVATIONS};
use crate::services::consensus_verifier::ConsensusVerifier;
use crate::services::contextual_scorer::{ContextualScorer, DEFAULT_SELECTION_THRESHOLD};
use crate::services::known_locations::KnownLocations;
use crate::services::outcome_store::{FeedbackSummary, OutcomeStore};
use crate::types::{Candidate, GeocodeProvider, Pattern, RoutingStat, ScoredLocation, SideSignals, VerificationResult};
use navres_common::config::{KnownLocationEntry, ResolverSettings};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Blended confidence a cascade result must exceed by default
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.6;

/// Resolver tunables
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub provider_timeout: Duration,
    pub acceptance_threshold: f64,
    pub selection_threshold: f64,
    pub min_observations: u64,
    pub known_locations: KnownLocations,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            selection_threshold: DEFAULT_SELECTION_THRESHOLD,
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            known_locations: KnownLocations::builtin(),
        }
    }
}

impl ResolverOptions {
    /// Options from the `[resolver]` section plus configured overrides
    pub fn from_settings(settings: &ResolverSettings, known_locations: &[KnownLocationEntry]) -> Self {
        Self {
            provider_timeout: Duration::from_secs(settings.provider_timeout_secs),
            acceptance_threshold: settings.acceptance_threshold,
            min_observations: settings.min_observations,
            known_locations: KnownLocations::builtin().with_entries(known_locations),
            ..Self::default()
        }
    }
}

/// Place query resolution engine
pub struct Resolver {
    providers: HashMap<String, Arc<dyn GeocodeProvider>>,
    router: AdaptiveRouter,
    verifier: ConsensusVerifier,
    scorer: ContextualScorer,
    provider_timeout: Duration,
    acceptance_threshold: f64,
}

impl Resolver {
    /// Build a resolver, replaying routing statistics from `store`
    ///
    /// `providers` form the resolution cascade in registration order;
    /// `verification_sources` are fanned out by `verify`.
    pub async fn new(
        providers: Vec<Arc<dyn GeocodeProvider>>,
        verification_sources: Vec<Arc<dyn GeocodeProvider>>,
        store: Arc<dyn OutcomeStore>,
        options: ResolverOptions,
    ) -> navres_common::Result<Self> {
        let names: Vec<String> = providers.iter().map(|p| p.name().to_string()).collect();

        let router = AdaptiveRouter::load(names.clone(), store)
            .await?
            .with_min_observations(options.min_observations);

        let verifier = ConsensusVerifier::new(
            ParallelGeocoder::new(verification_sources).with_timeout(options.provider_timeout),
        );

        let scorer = ContextualScorer::new(options.known_locations)
            .with_threshold(options.selection_threshold);

        info!(
            providers = ?names,
            verification_sources = verifier.source_count(),
            "Resolver initialized"
        );

        Ok(Self {
            providers: providers
                .into_iter()
                .map(|p| (p.name().to_string(), p))
                .collect(),
            router,
            verifier,
            scorer,
            provider_timeout: options.provider_timeout,
            acceptance_threshold: options.acceptance_threshold,
        })
    }

    pub fn router(&self) -> &AdaptiveRouter {
        &self.router
    }

    /// Resolve `query` through the learned provider cascade
    ///
    /// Each provider's confidence is blended 50/50 with its learned success
    /// ratio for the query's pattern; the first result whose blend exceeds
    /// the acceptance threshold wins and is returned carrying the blended
    /// confidence.
    pub async fn resolve(&self, query: &str) -> ResolveResult<Candidate> {
        let cascade = self.router.select_cascade(query).await;

        for name in &cascade {
            let Some(provider) = self.providers.get(name) else {
                continue;
            };

            let candidate = match geocode_with_timeout(provider.as_ref(), query, self.provider_timeout).await {
                Ok(candidate) => candidate,
                Err(e) => {
                    warn!(provider = %name, query = %query, error = %e, "Provider failed, trying next");
                    continue;
                }
            };

            let learned = self.router.confidence_for(query, name).await;
            let blended = (candidate.provider_confidence + learned) / 2.0;

            if blended <= self.acceptance_threshold {
                debug!(
                    provider = %name,
                    provider_confidence = candidate.provider_confidence,
                    learned,
                    blended,
                    "Result below acceptance threshold"
                );
                continue;
            }

            if let Err(e) = self
                .router
                .record_outcome(query, name, Some(candidate.clone()), true)
                .await
            {
                warn!(provider = %name, error = %e, "Failed to record routing outcome");
            }

            info!(
                provider = %name,
                address = %candidate.formatted_address,
                confidence = blended,
                "Query resolved"
            );

            return Ok(candidate.with_confidence(blended));
        }

        info!(query = %query, tried = cascade.len(), "No provider produced an accepted result");
        Err(ResolveError::NotFound(query.to_string()))
    }

    /// Cross-check `query` against every verification source
    pub async fn verify(&self, query: &str, primary: Option<Candidate>) -> VerificationResult {
        self.verifier.verify(query, primary).await
    }

    /// Pick the candidate best matching the caller's side signals
    pub fn select_best(
        &self,
        business_name: &str,
        candidates: &[Candidate],
        signals: &SideSignals,
    ) -> ResolveResult<ScoredLocation> {
        self.scorer
            .select_best(business_name, candidates, signals)
            .ok_or_else(|| ResolveError::NoConfidentMatch {
                business_name: business_name.to_string(),
                best_score: self.scorer.best_score(business_name, candidates, signals),
            })
    }

    /// Record a user verdict on a served result; failures are logged only
    pub async fn record_feedback(&self, query: &str, result: Candidate, is_correct: bool) {
        if let Err(e) = self.router.record_feedback(query, result, is_correct).await {
            warn!(query = %query, error = %e, "Failed to record feedback");
        }
    }

    /// Feedback tally for one pattern
    pub async fn feedback_summary(&self, pattern: Pattern) -> ResolveResult<FeedbackSummary> {
        Ok(self.router.feedback_summary(pattern).await?)
    }

    /// Current routing statistics, ordered by pattern
    pub async fn routing_stats(&self) -> BTreeMap<Pattern, RoutingStat> {
        self.router.stats_snapshot().await
    }
}
