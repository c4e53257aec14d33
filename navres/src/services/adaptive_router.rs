//! Adaptive Router
//!
//! Orders providers into a cascade for a query and learns from recorded
//! outcomes which provider tends to win for each [`Pattern`].
//!
//! # Learning Loop
//! - Statistics are rebuilt from the [`OutcomeStore`] log at startup
//! - `record_outcome` is the only mutator; writes are serialized by an async
//!   mutex and hit the store before the in-memory aggregate
//! - Reads take a shared lock and may observe slightly stale counts
//!
//! # Cold Start
//! Until a pattern has `min_observations` outcomes, the fixed rule table is
//! used instead of the learned statistic.

use crate::services::outcome_store::{FeedbackRecord, FeedbackSummary, OutcomeStore, RoutingOutcome};
use crate::services::pattern_classifier::classify;
use crate::types::{Candidate, Pattern, RoutingStat};
use navres_common::Result;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

/// Default observation count before learned routing kicks in
pub const DEFAULT_MIN_OBSERVATIONS: u64 = 5;

/// Confidence reported for a pattern with no history
pub const UNSEEN_PATTERN_CONFIDENCE: f64 = 0.5;

/// Ceiling on learned confidence
pub const MAX_LEARNED_CONFIDENCE: f64 = 0.95;

/// Fixed cold-start routing table
pub fn rule_based_provider(pattern: Pattern) -> &'static str {
    match pattern {
        Pattern::PostalCode => "geocodio",
        Pattern::BusinessPoi | Pattern::PointOfInterest => "places",
        Pattern::StreetAddress | Pattern::Generic => "maps",
    }
}

/// Learned provider router
pub struct AdaptiveRouter {
    /// Registered provider names, in stable cascade order
    providers: Vec<String>,
    store: Arc<dyn OutcomeStore>,
    stats: RwLock<HashMap<Pattern, RoutingStat>>,
    /// Serializes record_outcome so store and aggregate advance together
    write_lock: Mutex<()>,
    min_observations: u64,
}

impl AdaptiveRouter {
    /// Create router with empty statistics
    pub fn new(providers: Vec<String>, store: Arc<dyn OutcomeStore>) -> Self {
        Self {
            providers,
            store,
            stats: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
            min_observations: DEFAULT_MIN_OBSERVATIONS,
        }
    }

    /// Create router with statistics replayed from the store's outcome log
    pub async fn load(providers: Vec<String>, store: Arc<dyn OutcomeStore>) -> Result<Self> {
        let stats = store.load_routing_stats().await?;
        let observations: u64 = stats.values().map(|s| s.total_observations).sum();

        info!(
            patterns = stats.len(),
            observations,
            "Routing statistics loaded"
        );

        let router = Self::new(providers, store);
        *router.stats.write().await = stats;
        Ok(router)
    }

    /// Set the cold-start observation threshold
    pub fn with_min_observations(mut self, min_observations: u64) -> Self {
        self.min_observations = min_observations;
        self
    }

    pub fn providers(&self) -> &[String] {
        &self.providers
    }

    /// Order every known provider for `query`, best first
    pub async fn select_cascade(&self, query: &str) -> Vec<String> {
        let pattern = classify(query);
        let stats = self.stats.read().await;
        let stat = stats.get(&pattern);

        let learned = stat
            .filter(|s| s.total_observations >= self.min_observations)
            .and_then(|s| s.best_provider(&self.providers));

        let preferred = learned.unwrap_or_else(|| rule_based_provider(pattern));

        let mut cascade = Vec::with_capacity(self.providers.len());
        if self.providers.iter().any(|p| p == preferred) {
            cascade.push(preferred.to_string());
        }
        cascade.extend(self.providers.iter().filter(|p| *p != preferred).cloned());

        debug!(
            query = %query,
            pattern = %pattern,
            learned = learned.is_some(),
            cascade = ?cascade,
            "Cascade selected"
        );

        cascade
    }

    /// Historical success ratio of `provider` for the query's pattern (0.0-1.0)
    ///
    /// `UNSEEN_PATTERN_CONFIDENCE` when the pattern has no history; otherwise
    /// capped at `MAX_LEARNED_CONFIDENCE`.
    pub async fn confidence_for(&self, query: &str, provider: &str) -> f64 {
        let pattern = classify(query);
        let stats = self.stats.read().await;

        match stats.get(&pattern) {
            Some(stat) if stat.total_observations > 0 => {
                let ratio = stat.success_count(provider) as f64 / stat.total_observations as f64;
                ratio.min(MAX_LEARNED_CONFIDENCE)
            }
            _ => UNSEEN_PATTERN_CONFIDENCE,
        }
    }

    /// Record a cascade outcome
    ///
    /// Appends to the store, then counts the outcome in the pattern's
    /// aggregate. If the store write fails the aggregate is left untouched.
    pub async fn record_outcome(
        &self,
        query: &str,
        provider: &str,
        result: Option<Candidate>,
        success: bool,
    ) -> Result<()> {
        let outcome = RoutingOutcome::new(query, provider, result, success);

        let _guard = self.write_lock.lock().await;
        self.store.append_outcome(&outcome).await?;

        let mut stats = self.stats.write().await;
        let stat = stats.entry(outcome.pattern).or_default();
        stat.record(provider, success);

        debug!(
            pattern = %outcome.pattern,
            provider = %provider,
            success,
            total = stat.total_observations,
            "Outcome recorded"
        );

        Ok(())
    }

    /// Record user feedback on a served result
    pub async fn record_feedback(&self, query: &str, result: Candidate, is_correct: bool) -> Result<()> {
        let record = FeedbackRecord::new(query, result, is_correct);
        self.store.append_feedback(&record).await?;

        info!(
            pattern = %record.pattern,
            provider = %record.result.provider_name,
            is_correct,
            "Feedback recorded"
        );

        Ok(())
    }

    pub async fn feedback_summary(&self, pattern: Pattern) -> Result<FeedbackSummary> {
        self.store.feedback_summary(pattern).await
    }

    /// Copy of every pattern's aggregate, ordered by pattern
    pub async fn stats_snapshot(&self) -> BTreeMap<Pattern, RoutingStat> {
        self.stats
            .read()
            .await
            .iter()
            .map(|(pattern, stat)| (*pattern, stat.clone()))
            .collect()
    }
}
