//! Google Maps Platform adapters
//!
//! Three endpoints, three providers:
//! - `maps` - Geocoding API, best for street addresses
//! - `places` - Places text search, best for businesses and landmarks
//! - `place_finder` - Places find-place-from-text, a verification source
//!
//! All three share the `status` envelope: `OK` and `ZERO_RESULTS` are normal
//! answers, anything else (`REQUEST_DENIED`, `OVER_QUERY_LIMIT`, ...) means
//! the provider is unavailable for this call.
//!
//! # API Reference
//! - https://developers.google.com/maps/documentation/geocoding/requests-geocoding
//! - https://developers.google.com/maps/documentation/places/web-service/search

use super::{get_json, http_client, DEFAULT_PROVIDER_TIMEOUT};
use crate::types::{Candidate, GeocodeProvider, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";
const TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
const FIND_PLACE_URL: &str = "https://maps.googleapis.com/maps/api/place/findplacefromtext/json";

/// Rooftop-accurate geocodes
const ROOFTOP_CONFIDENCE: f64 = 1.0;
/// Interpolated or approximate geocodes
const APPROXIMATE_CONFIDENCE: f64 = 0.8;
/// Places with a user rating are established listings
const RATED_PLACE_CONFIDENCE: f64 = 0.9;
const UNRATED_PLACE_CONFIDENCE: f64 = 0.7;
const FIND_PLACE_CONFIDENCE: f64 = 0.8;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Geometry {
    pub location: LatLng,
    #[serde(default)]
    pub location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResult {
    pub formatted_address: String,
    pub geometry: Geometry,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GeocodeResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaceResult {
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub geometry: Geometry,
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TextSearchResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FindPlaceResponse {
    pub status: String,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub candidates: Vec<PlaceResult>,
}

/// Map the Google `status` envelope onto provider errors
fn check_status(status: &str, error_message: Option<&str>) -> Result<(), ProviderError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" => Err(ProviderError::NoResults),
        other => Err(ProviderError::Unavailable(format!(
            "{}: {}",
            other,
            error_message.unwrap_or("no detail")
        ))),
    }
}

fn require_key(api_key: &str, provider: &str) -> Result<(), ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::NotConfigured(format!("{} API key is empty", provider)));
    }
    Ok(())
}

// ============================================================================
// Geocoding API ("maps")
// ============================================================================

/// Google Geocoding API adapter
pub struct GoogleMapsGeocoder {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleMapsGeocoder {
    pub const NAME: &'static str = "maps";

    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        require_key(&api_key, Self::NAME)?;
        Ok(Self {
            http_client: http_client(DEFAULT_PROVIDER_TIMEOUT)?,
            api_key,
            base_url: GEOCODE_URL.to_string(),
        })
    }

    /// Point the adapter at a different endpoint (proxies, test servers)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn candidate_from_response(response: GeocodeResponse) -> Result<Candidate, ProviderError> {
        check_status(&response.status, response.error_message.as_deref())?;

        let result = response.results.into_iter().next().ok_or(ProviderError::NoResults)?;
        let confidence = match result.geometry.location_type.as_deref() {
            Some("ROOFTOP") => ROOFTOP_CONFIDENCE,
            _ => APPROXIMATE_CONFIDENCE,
        };

        Ok(Candidate::new(
            result.geometry.location.lat,
            result.geometry.location.lng,
            result.formatted_address,
            confidence,
            Self::NAME,
        ))
    }
}

#[async_trait]
impl GeocodeProvider for GoogleMapsGeocoder {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        debug!(query = %query, "Querying Google Geocoding API");

        let response: GeocodeResponse = get_json(
            &self.http_client,
            &self.base_url,
            &[("address", query), ("key", &self.api_key)],
        )
        .await?;

        Self::candidate_from_response(response)
    }
}

// ============================================================================
// Places Text Search ("places")
// ============================================================================

/// Google Places text search adapter
pub struct GooglePlacesSearch {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GooglePlacesSearch {
    pub const NAME: &'static str = "places";

    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        require_key(&api_key, Self::NAME)?;
        Ok(Self {
            http_client: http_client(DEFAULT_PROVIDER_TIMEOUT)?,
            api_key,
            base_url: TEXT_SEARCH_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn candidate_from_response(response: TextSearchResponse) -> Result<Candidate, ProviderError> {
        check_status(&response.status, response.error_message.as_deref())?;

        let place = response.results.into_iter().next().ok_or(ProviderError::NoResults)?;
        let confidence = if place.rating.is_some() {
            RATED_PLACE_CONFIDENCE
        } else {
            UNRATED_PLACE_CONFIDENCE
        };

        place_candidate(place, confidence, Self::NAME)
    }
}

#[async_trait]
impl GeocodeProvider for GooglePlacesSearch {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        debug!(query = %query, "Querying Google Places text search");

        let response: TextSearchResponse = get_json(
            &self.http_client,
            &self.base_url,
            &[("query", query), ("key", &self.api_key)],
        )
        .await?;

        Self::candidate_from_response(response)
    }
}

// ============================================================================
// Places Find-Place ("place_finder")
// ============================================================================

/// Google Places find-place-from-text adapter
///
/// Used as an independent verification source alongside the cascade result.
pub struct GooglePlaceFinder {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GooglePlaceFinder {
    pub const NAME: &'static str = "place_finder";

    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        require_key(&api_key, Self::NAME)?;
        Ok(Self {
            http_client: http_client(DEFAULT_PROVIDER_TIMEOUT)?,
            api_key,
            base_url: FIND_PLACE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn candidate_from_response(response: FindPlaceResponse) -> Result<Candidate, ProviderError> {
        check_status(&response.status, response.error_message.as_deref())?;

        let place = response.candidates.into_iter().next().ok_or(ProviderError::NoResults)?;
        place_candidate(place, FIND_PLACE_CONFIDENCE, Self::NAME)
    }
}

#[async_trait]
impl GeocodeProvider for GooglePlaceFinder {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn geocode(&self, query: &str) -> Result<Candidate, ProviderError> {
        debug!(query = %query, "Querying Google Places find-place");

        let response: FindPlaceResponse = get_json(
            &self.http_client,
            &self.base_url,
            &[
                ("input", query),
                ("inputtype", "textquery"),
                ("fields", "geometry,formatted_address,name"),
                ("key", &self.api_key),
            ],
        )
        .await?;

        Self::candidate_from_response(response)
    }
}

/// Places results may omit the address; fall back to the place name
fn place_candidate(place: PlaceResult, confidence: f64, provider: &str) -> Result<Candidate, ProviderError> {
    let address = place
        .formatted_address
        .or(place.name)
        .ok_or_else(|| ProviderError::Parse("place has neither address nor name".to_string()))?;

    Ok(Candidate::new(
        place.geometry.location.lat,
        place.geometry.location.lng,
        address,
        confidence,
        provider,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::stub_http::serve_json_once;

    #[test]
    fn test_geocode_rooftop_confidence() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "formatted_address": "123 Main St, Springfield, IL 62701, USA",
                    "geometry": {"location": {"lat": 39.7817, "lng": -89.6501}, "location_type": "ROOFTOP"}
                }]
            }"#,
        )
        .unwrap();

        let candidate = GoogleMapsGeocoder::candidate_from_response(response).unwrap();
        assert_eq!(candidate.provider_name, "maps");
        assert_eq!(candidate.provider_confidence, 1.0);
        assert_eq!(candidate.latitude, 39.7817);
    }

    #[test]
    fn test_geocode_approximate_confidence() {
        let response: GeocodeResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "formatted_address": "Springfield, IL, USA",
                    "geometry": {"location": {"lat": 39.78, "lng": -89.65}, "location_type": "APPROXIMATE"}
                }]
            }"#,
        )
        .unwrap();

        let candidate = GoogleMapsGeocoder::candidate_from_response(response).unwrap();
        assert_eq!(candidate.provider_confidence, 0.8);
    }

    #[test]
    fn test_status_envelope() {
        let zero: GeocodeResponse = serde_json::from_str(r#"{"status": "ZERO_RESULTS", "results": []}"#).unwrap();
        assert_eq!(
            GoogleMapsGeocoder::candidate_from_response(zero),
            Err(ProviderError::NoResults)
        );

        let denied: GeocodeResponse = serde_json::from_str(
            r#"{"status": "REQUEST_DENIED", "error_message": "The provided API key is invalid."}"#,
        )
        .unwrap();
        assert!(matches!(
            GoogleMapsGeocoder::candidate_from_response(denied),
            Err(ProviderError::Unavailable(msg)) if msg.contains("REQUEST_DENIED")
        ));
    }

    #[test]
    fn test_text_search_rating_confidence() {
        let response: TextSearchResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "results": [{
                    "name": "Loon Fung",
                    "formatted_address": "42-44 Gerrard St, London W1D 5QG, UK",
                    "geometry": {"location": {"lat": 51.5116, "lng": -0.1311}},
                    "rating": 4.2
                }]
            }"#,
        )
        .unwrap();

        let candidate = GooglePlacesSearch::candidate_from_response(response).unwrap();
        assert_eq!(candidate.provider_name, "places");
        assert_eq!(candidate.provider_confidence, 0.9);
    }

    #[test]
    fn test_find_place_falls_back_to_name() {
        let response: FindPlaceResponse = serde_json::from_str(
            r#"{
                "status": "OK",
                "candidates": [{
                    "name": "Venchi",
                    "geometry": {"location": {"lat": 51.51, "lng": -0.13}}
                }]
            }"#,
        )
        .unwrap();

        let candidate = GooglePlaceFinder::candidate_from_response(response).unwrap();
        assert_eq!(candidate.formatted_address, "Venchi");
        assert_eq!(candidate.provider_confidence, 0.8);
    }

    #[tokio::test]
    async fn test_maps_queries_configured_endpoint() {
        let (url, request) = serve_json_once(
            r#"{"status": "OK", "results": [{"formatted_address": "10 Downing St, London SW1A 2AA, UK",
                "geometry": {"location": {"lat": 51.5034, "lng": -0.1276}, "location_type": "ROOFTOP"}}]}"#,
        )
        .await;

        let geocoder = GoogleMapsGeocoder::new("test-key".to_string()).unwrap().with_base_url(url);
        let candidate = geocoder.geocode("10 Downing Street").await.unwrap();
        assert_eq!(candidate.provider_name, "maps");
        assert_eq!(candidate.provider_confidence, 1.0);

        let request_line = request.await.unwrap();
        assert!(request_line.starts_with("GET /endpoint?address=10"), "{}", request_line);
        assert!(request_line.contains("key=test-key"));
    }

    #[tokio::test]
    async fn test_places_queries_configured_endpoint() {
        let (url, request) = serve_json_once(
            r#"{"status": "OK", "results": [{"name": "Loon Fung", "formatted_address": "42-44 Gerrard St, London",
                "geometry": {"location": {"lat": 51.5116, "lng": -0.1311}}}]}"#,
        )
        .await;

        let search = GooglePlacesSearch::new("test-key".to_string()).unwrap().with_base_url(url);
        let candidate = search.geocode("Loon Fung").await.unwrap();
        assert_eq!(candidate.provider_name, "places");
        assert_eq!(candidate.provider_confidence, 0.7);

        let request_line = request.await.unwrap();
        assert!(request_line.starts_with("GET /endpoint?query=Loon"), "{}", request_line);
    }

    #[tokio::test]
    async fn test_place_finder_queries_configured_endpoint() {
        let (url, request) = serve_json_once(r#"{"status": "ZERO_RESULTS", "candidates": []}"#).await;

        let finder = GooglePlaceFinder::new("test-key".to_string()).unwrap().with_base_url(url);
        assert_eq!(finder.geocode("Nowhere Cafe").await, Err(ProviderError::NoResults));

        let request_line = request.await.unwrap();
        assert!(request_line.contains("inputtype=textquery"), "{}", request_line);
    }

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(
            GoogleMapsGeocoder::new("   ".to_string()),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
