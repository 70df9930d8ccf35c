//! Error types for the storefront core.

use thiserror::Error;

use crate::ratelimit::StoreError;
use crate::storage::StorageError;

/// Main error type for storefront operations.
#[derive(Error, Debug)]
pub enum StorefrontError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage backend errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Rate limit store errors
    #[error("Rate limit store error: {0}")]
    RateLimitStore(#[from] StoreError),

    /// Unknown rate limit policy name
    #[error("Unknown rate limit policy: {0}")]
    UnknownPolicy(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for StorefrontError {
    fn from(err: config::ConfigError) -> Self {
        StorefrontError::Config(err.to_string())
    }
}

/// Result type alias for storefront operations.
pub type Result<T> = std::result::Result<T, StorefrontError>;
