//! Shared error type for the navres crates
//!
//! Covers configuration, logging setup and outcome persistence. Resolution
//! failures live in the library's own `ResolveError`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Outcome database failure
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data folder, config or log file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed config file or log filter
    #[error("Configuration error: {0}")]
    Config(String),

    /// Subscriber installation or outcome store failure
    #[error("Internal error: {0}")]
    Internal(String),
}
