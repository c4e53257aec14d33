//! SQLite-backed outcome store

use crate::services::outcome_store::{FeedbackRecord, FeedbackSummary, OutcomeStore, RoutingOutcome};
use crate::types::{Pattern, RoutingStat};
use async_trait::async_trait;
use navres_common::Result;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::warn;

/// Outcome store persisting to `routing_outcomes` / `routing_feedback`
#[derive(Clone)]
pub struct SqliteOutcomeStore {
    pool: SqlitePool,
}

impl SqliteOutcomeStore {
    /// Wrap a pool whose tables were created by [`super::init_tables`]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OutcomeStore for SqliteOutcomeStore {
    async fn append_outcome(&self, outcome: &RoutingOutcome) -> Result<()> {
        let result = outcome.result.as_ref();

        sqlx::query(
            r#"
            INSERT INTO routing_outcomes (
                id, query, pattern, provider, success,
                latitude, longitude, formatted_address, provider_confidence, observed_at,
                recorded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(outcome.id.to_string())
        .bind(&outcome.query)
        .bind(outcome.pattern.as_str())
        .bind(&outcome.provider)
        .bind(outcome.success)
        .bind(result.map(|c| c.latitude))
        .bind(result.map(|c| c.longitude))
        .bind(result.map(|c| c.formatted_address.clone()))
        .bind(result.map(|c| c.provider_confidence))
        .bind(result.map(|c| c.observed_at.to_rfc3339()))
        .bind(outcome.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn append_feedback(&self, feedback: &FeedbackRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO routing_feedback (
                id, query, pattern, provider,
                latitude, longitude, formatted_address, provider_confidence,
                is_correct, recorded_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(feedback.id.to_string())
        .bind(&feedback.query)
        .bind(feedback.pattern.as_str())
        .bind(&feedback.result.provider_name)
        .bind(feedback.result.latitude)
        .bind(feedback.result.longitude)
        .bind(&feedback.result.formatted_address)
        .bind(feedback.result.provider_confidence)
        .bind(feedback.is_correct)
        .bind(feedback.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_routing_stats(&self) -> Result<HashMap<Pattern, RoutingStat>> {
        let rows = sqlx::query(
            r#"
            SELECT pattern, provider, COUNT(*) AS total, SUM(success) AS successes
            FROM routing_outcomes
            GROUP BY pattern, provider
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats: HashMap<Pattern, RoutingStat> = HashMap::new();
        for row in rows {
            let pattern_str: String = row.get("pattern");
            let pattern = match pattern_str.parse::<Pattern>() {
                Ok(pattern) => pattern,
                Err(e) => {
                    warn!(error = %e, "Skipping outcomes with unknown pattern");
                    continue;
                }
            };

            let provider: String = row.get("provider");
            let total: i64 = row.get("total");
            let successes: i64 = row.get("successes");

            let stat = stats.entry(pattern).or_default();
            stat.total_observations += total as u64;
            if successes > 0 {
                *stat.provider_counts.entry(provider).or_insert(0) += successes as u64;
            }
        }

        Ok(stats)
    }

    async fn feedback_summary(&self, pattern: Pattern) -> Result<FeedbackSummary> {
        let rows = sqlx::query(
            r#"
            SELECT is_correct, COUNT(*) AS n
            FROM routing_feedback
            WHERE pattern = ?
            GROUP BY is_correct
            "#,
        )
        .bind(pattern.as_str())
        .fetch_all(&self.pool)
        .await?;

        let mut summary = FeedbackSummary::default();
        for row in rows {
            let is_correct: bool = row.get("is_correct");
            let n: i64 = row.get("n");
            if is_correct {
                summary.correct = n as u64;
            } else {
                summary.incorrect = n as u64;
            }
        }

        Ok(summary)
    }
}
