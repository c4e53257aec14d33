//! # navres common library
//!
//! Shared code for the navres workspace:
//! - Error and result types
//! - TOML configuration model and loading
//! - Data folder resolution
//! - Logging initialization

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
