//! Provider configuration for navres
//!
//! Resolves API keys (environment first, then TOML) and assembles the
//! provider sets used by the resolver. Providers without a usable key are
//! not registered.

use crate::providers::{CachedProvider, GeocodioClient, GoogleMapsGeocoder, GooglePlaceFinder, GooglePlacesSearch};
use crate::types::{GeocodeProvider, ProviderError};
use navres_common::config::TomlConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const GOOGLE_MAPS_KEY_ENV: &str = "NAVRES_GOOGLE_MAPS_API_KEY";
pub const GOOGLE_PLACES_KEY_ENV: &str = "NAVRES_GOOGLE_PLACES_API_KEY";
pub const GEOCODIO_KEY_ENV: &str = "NAVRES_GEOCODIO_API_KEY";

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one API key
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(label: &str, env_var: &str, toml_key: Option<&str>) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_key.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in environment and TOML config. Using environment ({}).",
            label, env_var
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", label);
        return Some(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", label);
        return Some(key.to_string());
    }

    None
}

/// Providers assembled from configuration
pub struct ProviderSet {
    /// Resolution cascade members, in registration order
    pub cascade: Vec<Arc<dyn GeocodeProvider>>,
    /// Independent sources fanned out by verification
    pub verification: Vec<Arc<dyn GeocodeProvider>>,
}

impl ProviderSet {
    pub fn is_empty(&self) -> bool {
        self.cascade.is_empty() && self.verification.is_empty()
    }
}

/// Build every provider that has a key, each behind a shared TTL cache
///
/// Places adapters fall back to the Maps key when no dedicated Places key is
/// configured. Verification fans out to every registered source.
pub fn build_providers(config: &TomlConfig) -> ProviderSet {
    let keys = &config.providers;
    let ttl = Duration::from_secs(config.resolver.cache_ttl_secs);

    let maps_key = resolve_api_key(
        "Google Maps",
        GOOGLE_MAPS_KEY_ENV,
        keys.google_maps_api_key.as_deref(),
    );
    let places_key = resolve_api_key(
        "Google Places",
        GOOGLE_PLACES_KEY_ENV,
        keys.google_places_api_key.as_deref(),
    )
    .or_else(|| maps_key.clone());
    let geocodio_key = resolve_api_key("Geocodio", GEOCODIO_KEY_ENV, keys.geocodio_api_key.as_deref());

    let mut cascade: Vec<Arc<dyn GeocodeProvider>> = Vec::new();
    let mut verification: Vec<Arc<dyn GeocodeProvider>> = Vec::new();

    if let Some(provider) = register(GoogleMapsGeocoder::NAME, maps_key.clone().map(GoogleMapsGeocoder::new), ttl) {
        cascade.push(Arc::clone(&provider));
        verification.push(provider);
    }

    if let Some(provider) = register(GeocodioClient::NAME, geocodio_key.map(GeocodioClient::new), ttl) {
        cascade.push(Arc::clone(&provider));
        verification.push(provider);
    }

    if let Some(provider) = register(GooglePlacesSearch::NAME, places_key.clone().map(GooglePlacesSearch::new), ttl) {
        cascade.push(Arc::clone(&provider));
        verification.push(provider);
    }

    if let Some(provider) = register(GooglePlaceFinder::NAME, places_key.map(GooglePlaceFinder::new), ttl) {
        verification.push(provider);
    }

    info!(
        cascade = cascade.len(),
        verification = verification.len(),
        "Providers registered"
    );

    ProviderSet { cascade, verification }
}

fn register<P>(name: &str, built: Option<Result<P, ProviderError>>, ttl: Duration) -> Option<Arc<dyn GeocodeProvider>>
where
    P: GeocodeProvider + 'static,
{
    match built {
        None => {
            info!(provider = name, "No API key configured, provider disabled");
            None
        }
        Some(Err(e)) => {
            warn!(provider = name, error = %e, "Provider could not be created, disabled");
            None
        }
        Some(Ok(provider)) => Some(Arc::new(CachedProvider::with_ttl(provider, ttl))),
    }
}
