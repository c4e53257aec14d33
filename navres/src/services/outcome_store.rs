//! Outcome Store
//!
//! Durable log of routing outcomes and user feedback. Routing statistics are
//! never stored directly; they are recomputed from the outcome log, so the log
//! is the single source of truth for what the router has learned.
//!
//! Two implementations:
//! - [`MemoryOutcomeStore`] (this module) for tests and ephemeral runs
//! - [`crate::db::outcomes::SqliteOutcomeStore`] for persistence across restarts

use crate::services::pattern_classifier::classify;
use crate::types::{Candidate, Pattern, RoutingStat};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use navres_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// One recorded cascade outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingOutcome {
    pub id: Uuid,
    pub query: String,
    pub pattern: Pattern,
    pub provider: String,
    pub success: bool,
    pub result: Option<Candidate>,
    pub recorded_at: DateTime<Utc>,
}

impl RoutingOutcome {
    pub fn new(
        query: impl Into<String>,
        provider: impl Into<String>,
        result: Option<Candidate>,
        success: bool,
    ) -> Self {
        let query = query.into();
        Self {
            id: Uuid::new_v4(),
            pattern: classify(&query),
            query,
            provider: provider.into(),
            success,
            result,
            recorded_at: Utc::now(),
        }
    }
}

/// User verdict on a served result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: Uuid,
    pub query: String,
    pub pattern: Pattern,
    pub result: Candidate,
    pub is_correct: bool,
    pub recorded_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(query: impl Into<String>, result: Candidate, is_correct: bool) -> Self {
        let query = query.into();
        Self {
            id: Uuid::new_v4(),
            pattern: classify(&query),
            query,
            result,
            is_correct,
            recorded_at: Utc::now(),
        }
    }
}

/// Feedback tally for one pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackSummary {
    pub correct: u64,
    pub incorrect: u64,
}

impl FeedbackSummary {
    /// Fraction of feedback marked correct, `None` without feedback
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.correct + self.incorrect;
        (total > 0).then(|| self.correct as f64 / total as f64)
    }
}

/// Append-only outcome persistence
///
/// Implementations must tolerate concurrent callers; the router additionally
/// serializes its own writes.
#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Append one routing outcome
    async fn append_outcome(&self, outcome: &RoutingOutcome) -> Result<()>;

    /// Append one feedback record
    async fn append_feedback(&self, feedback: &FeedbackRecord) -> Result<()>;

    /// Recompute every pattern's routing aggregate from the outcome log
    async fn load_routing_stats(&self) -> Result<HashMap<Pattern, RoutingStat>>;

    /// Tally feedback for one pattern
    async fn feedback_summary(&self, pattern: Pattern) -> Result<FeedbackSummary>;
}

/// In-memory outcome store
#[derive(Debug, Default)]
pub struct MemoryOutcomeStore {
    outcomes: RwLock<Vec<RoutingOutcome>>,
    feedback: RwLock<Vec<FeedbackRecord>>,
}

impl MemoryOutcomeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded outcome, oldest first
    pub async fn outcomes(&self) -> Vec<RoutingOutcome> {
        self.outcomes.read().await.clone()
    }

    /// Snapshot of every feedback record, oldest first
    pub async fn feedback(&self) -> Vec<FeedbackRecord> {
        self.feedback.read().await.clone()
    }
}

#[async_trait]
impl OutcomeStore for MemoryOutcomeStore {
    async fn append_outcome(&self, outcome: &RoutingOutcome) -> Result<()> {
        self.outcomes.write().await.push(outcome.clone());
        Ok(())
    }

    async fn append_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        self.feedback.write().await.push(feedback.clone());
        Ok(())
    }

    async fn load_routing_stats(&self) -> Result<HashMap<Pattern, RoutingStat>> {
        let mut stats: HashMap<Pattern, RoutingStat> = HashMap::new();
        for outcome in self.outcomes.read().await.iter() {
            stats
                .entry(outcome.pattern)
                .or_default()
                .record(&outcome.provider, outcome.success);
        }
        Ok(stats)
    }

    async fn feedback_summary(&self, pattern: Pattern) -> Result<FeedbackSummary> {
        let mut summary = FeedbackSummary::default();
        for record in self.feedback.read().await.iter().filter(|r| r.pattern == pattern) {
            if record.is_correct {
                summary.correct += 1;
            } else {
                summary.incorrect += 1;
            }
        }
        Ok(summary)
    }
}

// ============================================================================
// Failing Store for Testing
// ============================================================================

#[cfg(test)]
pub mod failing {
    use super::*;
    use navres_common::Error;

    /// Store whose writes and feedback reads always fail; replay starts empty
    #[derive(Debug, Default)]
    pub struct FailingOutcomeStore;

    #[async_trait]
    impl OutcomeStore for FailingOutcomeStore {
        async fn append_outcome(&self, _outcome: &RoutingOutcome) -> Result<()> {
            Err(Error::Internal("outcome log unavailable".to_string()))
        }

        async fn append_feedback(&self, _feedback: &FeedbackRecord) -> Result<()> {
            Err(Error::Internal("feedback log unavailable".to_string()))
        }

        async fn load_routing_stats(&self) -> Result<HashMap<Pattern, RoutingStat>> {
            Ok(HashMap::new())
        }

        async fn feedback_summary(&self, _pattern: Pattern) -> Result<FeedbackSummary> {
            Err(Error::Internal("feedback log unavailable".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> Candidate {
        Candidate::new(25.7617, -80.1918, "Miami, FL, USA", 0.9, "maps")
    }

    #[test]
    fn test_outcome_classifies_query() {
        let outcome = RoutingOutcome::new("33101", "geocodio", None, true);
        assert_eq!(outcome.pattern, Pattern::PostalCode);
    }

    #[tokio::test]
    async fn test_stats_recomputed_from_log() {
        let store = MemoryOutcomeStore::new();
        store
            .append_outcome(&RoutingOutcome::new("33101", "geocodio", Some(candidate()), true))
            .await
            .unwrap();
        store
            .append_outcome(&RoutingOutcome::new("90210", "maps", None, false))
            .await
            .unwrap();
        store
            .append_outcome(&RoutingOutcome::new("Hyde Park", "places", Some(candidate()), true))
            .await
            .unwrap();

        let stats = store.load_routing_stats().await.unwrap();
        let postal = &stats[&Pattern::PostalCode];
        assert_eq!(postal.total_observations, 2);
        assert_eq!(postal.success_count("geocodio"), 1);
        assert_eq!(postal.success_count("maps"), 0);
        assert_eq!(stats[&Pattern::PointOfInterest].success_count("places"), 1);
        assert!(!stats.contains_key(&Pattern::Generic));
    }

    #[tokio::test]
    async fn test_feedback_summary_per_pattern() {
        let store = MemoryOutcomeStore::new();
        store
            .append_feedback(&FeedbackRecord::new("33101", candidate(), true))
            .await
            .unwrap();
        store
            .append_feedback(&FeedbackRecord::new("33102", candidate(), false))
            .await
            .unwrap();
        store
            .append_feedback(&FeedbackRecord::new("Hyde Park", candidate(), true))
            .await
            .unwrap();

        let summary = store.feedback_summary(Pattern::PostalCode).await.unwrap();
        assert_eq!(summary, FeedbackSummary { correct: 1, incorrect: 1 });
        assert_eq!(summary.accuracy(), Some(0.5));

        let empty = store.feedback_summary(Pattern::Generic).await.unwrap();
        assert_eq!(empty.accuracy(), None);
    }
}
