//! Crate-wide error type

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ContextError>;

/// Errors raised while building or configuring a context window manager.
///
/// Preparing a context window never fails; these only surface from
/// construction, configuration loading and tokenizer initialisation.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),
}

impl From<config::ConfigError> for ContextError {
    fn from(err: config::ConfigError) -> Self {
        ContextError::Configuration(err.to_string())
    }
}
