//! Geocodio adapter
//!
//! Geocodio is strongest on US postal codes and street addresses and reports
//! its own per-result `accuracy`, which is passed through as the candidate
//! confidence.
//!
//! # API Reference
//! https://www.geocod.io/docs/#geocoding

use super::{get_json, http_client, DEFAULT_PROVIDER_TIMEOUT};
use crate::types::{Candidate, GeocodeProvider, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const GEOCODIO_URL: &str = "https://api.geocod.io/v1.7/geocode";

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodioLocation {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodioResult {
    pub formatted_address: String,
    pub location: GeocodioLocation,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodioResponse {
    #[serde(default)]
    pub results: Vec<GeocodioResult>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Geocodio API client
pub struct GeocodioClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeocodioClient {
    pub const NAME: &'static str = "geocodio";

    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::NotConfigured("geocodio API key is empty".to_string()));
        }

        Ok(Self {
            http_client: http_client(DEFAULT_PROVIDER_TIMEOUT)?,
            api_key,
            base_url: GEOCODIO_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn candidate_from_response(response: GeocodioResponse) -> Result<Candidate, ProviderError> {
        if let Some(error) = response.error {
            return Err(ProviderError::Unavailable(error));
        }

        let result = response.results.into_iter().next().ok_or(ProviderError::NoResults)?;

        // Missing accuracy means the result carries no quality signal at all
        let accuracy = result.accuracy.unwrap_or(0.0);

        Ok(Candidate::new(
            result.location.lat,
            result.location.lng,
            result.formatted_address,
            accuracy,
            Self::NAME,
        ))
    }
}

#[async_trait]
impl GeocodeProvider for GeocodioClient {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        debug!(query = %query, "Querying Geocodio");

        let response: GeocodioResponse = get_json(
            &self.http_client,
            &self.base_url,
            &[("q", query), ("api_key", &self.api_key)],
        )
        .await?;

        Self::candidate_from_response(response)
    }
}
