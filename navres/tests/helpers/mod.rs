//! Shared test helpers for navres integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use navres::{Candidate, GeocodeProvider, ProviderError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Scripted provider: fixed answer per query, `NoResults` otherwise
pub struct ScriptedProvider {
    name: String,
    answers: HashMap<String, Candidate>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn answer(mut self, query: &str, lat: f64, lon: f64, address: &str, confidence: f64) -> Self {
        self.answers.insert(
            query.to_string(),
            Candidate::new(lat, lon, address, confidence, self.name.clone()),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GeocodeProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers.get(query).cloned().ok_or(ProviderError::NoResults)
    }
}

/// Provider that always fails
pub struct DownProvider(pub &'static str);

#[async_trait]
impl GeocodeProvider for DownProvider {
    fn name(&self) -> &str {
        self.0
    }

    async fn geocode(&self, _query: &str) -> Result<Candidate, ProviderError> {
        Err(ProviderError::Unavailable("HTTP 503: Service Unavailable".to_string()))
    }
}

pub fn dyn_providers(providers: Vec<Arc<ScriptedProvider>>) -> Vec<Arc<dyn GeocodeProvider>> {
    providers
        .into_iter()
        .map(|p| p as Arc<dyn GeocodeProvider>)
        .collect()
}
