//! Resolution engine services

pub mod adaptive_router;
pub mod consensus_verifier;
pub mod contextual_scorer;
pub mod known_locations;
pub mod outcome_store;
pub mod pattern_classifier;
pub mod resolver;

pub use adaptive_router::AdaptiveRouter;
pub use consensus_verifier::{find_consensus, ConsensusVerifier};
pub use contextual_scorer::{ContextualScorer, ScoringRule};
pub use known_locations::KnownLocations;
pub use outcome_store::{FeedbackRecord, FeedbackSummary, MemoryOutcomeStore, OutcomeStore, RoutingOutcome};
pub use pattern_classifier::classify;
pub use resolver::{Resolver, ResolverOptions};
