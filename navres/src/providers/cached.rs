//! TTL cache wrapper for any provider
//!
//! Only successful results are cached. Cached candidates keep the
//! `observed_at` of the original upstream call so staleness checks see the
//! real age of the data.

use crate::types::{Candidate, GeocodeProvider, ProviderError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Default cache lifetime
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct CachedProvider<P> {
    inner: P,
    ttl: Duration,
    entries: RwLock<HashMap<String, (Instant, Candidate)>>,
}

impl<P: GeocodeProvider> CachedProvider<P> {
    pub fn new(inner: P) -> Self {
        Self::with_ttl(inner, DEFAULT_CACHE_TTL)
    }

    /// A zero TTL disables caching
    pub fn with_ttl(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live and expired entries currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    fn cache_key(query: &str) -> String {
        query.trim().to_lowercase()
    }
}

#[async_trait]
impl<P: GeocodeProvider> GeocodeProvider for CachedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        if self.ttl.is_zero() {
            return self.inner.geocode(query).await;
        }

        let key = Self::cache_key(query);

        if let Some((stored_at, candidate)) = self.entries.read().await.get(&key) {
            if stored_at.elapsed() < self.ttl {
                debug!(provider = self.inner.name(), query = %query, "Cache hit");
                return Ok(candidate.clone());
            }
        }

        let candidate = self.inner.geocode(query).await?;

        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| stored_at.elapsed() < self.ttl);
        entries.insert(key, (Instant::now(), candidate.clone()));

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::mock::MockProvider;

    #[tokio::test]
    async fn test_repeat_query_served_from_cache() {
        let cached = CachedProvider::new(MockProvider::returning("maps", 1.0, 2.0, "A", 0.9));

        let first = cached.geocode("123 Main Street").await.unwrap();
        let second = cached.geocode("  123 MAIN STREET ").await.unwrap();

        assert_eq!(cached.inner.call_count(), 1);
        assert_eq!(first.observed_at, second.observed_at);
        assert_eq!(cached.name(), "maps");
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let cached = CachedProvider::new(MockProvider::failing("maps", ProviderError::NoResults));

        assert!(cached.geocode("q").await.is_err());
        assert!(cached.geocode("q").await.is_err());
        assert_eq!(cached.inner.call_count(), 2);
        assert!(cached.is_empty().await);
    }

    #[tokio::test]
    async fn test_zero_ttl_disables_cache() {
        let cached = CachedProvider::with_ttl(
            MockProvider::returning("maps", 1.0, 2.0, "A", 0.9),
            Duration::ZERO,
        );

        cached.geocode("q").await.unwrap();
        cached.geocode("q").await.unwrap();
        assert_eq!(cached.inner.call_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetched() {
        let cached = CachedProvider::with_ttl(
            MockProvider::returning("maps", 1.0, 2.0, "A", 0.9),
            Duration::from_millis(20),
        );

        cached.geocode("q").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        cached.geocode("q").await.unwrap();
        assert_eq!(cached.inner.call_count(), 2);
        assert_eq!(cached.len().await, 1);
    }
}
