//! Provider Adapters
//!
//! Thin HTTP clients, one per upstream geocoding/places source. Each
//! implements [`GeocodeProvider`] so the router cascade and the consensus
//! verifier can treat them uniformly.
//!
//! # Adapters
//! 1. **google** - `maps` (Geocoding API), `places` (text search),
//!    `place_finder` (find-place-from-text, used as a verification source)
//! 2. **geocodio** - `geocodio` (postal/street geocoder)
//! 3. **cached** - TTL cache wrapper for any provider
//!
//! # Parallel Execution
//! [`ParallelGeocoder`] runs a provider set concurrently. Failed providers
//! are logged and dropped; they never cancel their siblings.

pub mod cached;
pub mod geocodio;
pub mod google;

pub use cached::CachedProvider;
pub use geocodio::GeocodioClient;
pub use google::{GoogleMapsGeocoder, GooglePlaceFinder, GooglePlacesSearch};

use crate::types::{Candidate, GeocodeProvider, ProviderError};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// User agent sent to every upstream
pub(crate) const USER_AGENT: &str = concat!("navres/", env!("CARGO_PKG_VERSION"));

/// Default per-call timeout
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the shared reqwest client configuration
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Unavailable(format!("HTTP client init failed: {}", e)))
}

/// GET `url` with query parameters and decode the JSON body
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    params: &[(&str, &str)],
) -> Result<T, ProviderError> {
    let response = client
        .get(url)
        .query(params)
        .send()
        .await
        .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(ProviderError::Unavailable(format!(
            "HTTP {}: {}",
            status.as_u16(),
            error_text
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Geocode with a hard per-call deadline
pub async fn geocode_with_timeout(
    provider: &dyn GeocodeProvider,
    query: &str,
    timeout: Duration,
) -> Result<Candidate, ProviderError> {
    match tokio::time::timeout(timeout, provider.geocode(query)).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout.as_millis())),
    }
}

/// Concurrent fan-out over a provider set
///
/// Waits for every provider to settle. Successes come back in registration
/// order regardless of completion order.
pub struct ParallelGeocoder {
    providers: Vec<Arc<dyn GeocodeProvider>>,
    timeout: Duration,
}

impl ParallelGeocoder {
    pub fn new(providers: Vec<Arc<dyn GeocodeProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Query every provider concurrently, keeping only successes
    pub async fn geocode_all(&self, query: &str) -> Vec<Candidate> {
        self.geocode_all_except(query, None).await
    }

    /// Like [`geocode_all`](Self::geocode_all), but never calls the provider named `skip`
    pub async fn geocode_all_except(&self, query: &str, skip: Option<&str>) -> Vec<Candidate> {
        let selected = self
            .providers
            .iter()
            .filter(|provider| skip.map_or(true, |name| provider.name() != name));

        let futures = selected.map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                match geocode_with_timeout(provider.as_ref(), query, self.timeout).await {
                    Ok(candidate) => {
                        debug!(
                            provider = provider.name(),
                            address = %candidate.formatted_address,
                            "Provider returned candidate"
                        );
                        Some(candidate)
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            error = %e,
                            "Provider failed (tolerated)"
                        );
                        None
                    }
                }
            }
        });

        join_all(futures).await.into_iter().flatten().collect()
    }

    pub fn count(&self) -> usize {
        self.providers.len()
    }
}

// ============================================================================
// Mock Provider for Testing
// ============================================================================


// ============================================================================
// One-shot HTTP Endpoint for Testing
// ============================================================================

#[cfg(test)]
pub mod stub_http {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one request on an ephemeral local port with a fixed JSON body
    ///
    /// Returns the endpoint URL and a handle yielding the request line.
    pub async fn serve_json_once(body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });

        (format!("http://{}/endpoint", addr), handle)
    }
}
