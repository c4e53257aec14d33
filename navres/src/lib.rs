//! navres library interface
//!
//! Resolves free-text place queries to coordinates by routing them across
//! several geocoding providers, learning which provider wins for which kind
//! of query, cross-checking results by consensus, and re-ranking candidates
//! with caller-supplied context.

pub mod config;
pub mod db;
pub mod error;
pub mod providers;
pub mod services;
pub mod types;
pub mod utils;

pub use crate::error::{ResolveError, ResolveResult};
pub use crate::services::{Resolver, ResolverOptions};
pub use crate::types::{
    Alternative, Candidate, Coordinates, GeocodeProvider, Pattern, ProviderError, RoutingStat, ScoredLocation,
    SideSignals, VerificationResult,
};
