//! Error type for the configuration layer.
//!
//! Nothing on the logging path returns an error. Only loading, validating
//! and watching settings, and parsing a level string, do.

use thiserror::Error;

/// Errors surfaced by settings handling.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),

    #[error("Invalid log level: {0}")]
    InvalidLevel(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
