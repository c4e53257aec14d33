//! Error types for the resolution engine
//!
//! Provider failures (`ProviderError`) never surface here: they are absorbed
//! by the cascade and the verifier. An unverified consensus is a value
//! (`VerificationResult::verified == false`), not an error.

use thiserror::Error;

/// Resolution error
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No provider in the cascade produced an accepted result
    #[error("Location not found for query: {0}")]
    NotFound(String),

    /// Candidates existed but none crossed the contextual acceptance bar
    #[error("No confident match for '{business_name}' (best score: {best_score:?})")]
    NoConfidentMatch {
        business_name: String,
        best_score: Option<f64>,
    },

    /// Outcome store failure
    #[error("Outcome store error: {0}")]
    Store(#[from] navres_common::Error),
}

/// Result type for resolution operations
pub type ResolveResult<T> = Result<T, ResolveError>;
