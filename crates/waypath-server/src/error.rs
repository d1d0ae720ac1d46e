//! Error types for the Waypath server

use thiserror::Error;
use waypath_core::CoreError;

/// Server error types
#[derive(Error, Debug)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Seeding the store failed
    #[error("Seed error: {0}")]
    SeedError(String),

    /// Error raised by the core runtime
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ServerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::ConfigError(_) => "CONFIGURATION",
            ServerError::SeedError(_) => "SEED",
            ServerError::Core(e) => e.kind().as_str(),
        }
    }
}

/// Result type for server operations
pub type ServerResult<T> = Result<T, ServerError>;
