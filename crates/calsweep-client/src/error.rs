//! Client error types.

use calsweep_providers::ProviderError;
use calsweep_store::StoreError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Fatal provider error (authentication, credentials).
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Persistence error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Rendering the output failed.
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<calsweep_core::TimeParseError> for ClientError {
    fn from(err: calsweep_core::TimeParseError) -> Self {
        Self::Config(err.to_string())
    }
}
