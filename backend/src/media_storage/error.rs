//! Error types for bucket operations

use thiserror::Error;

/// Result type for bucket operations
pub type BucketResult<T> = Result<T, BucketError>;

/// Errors that can occur while preparing uploads to the bucket
#[derive(Error, Debug)]
pub enum BucketError {
    /// Signing the request failed
    #[error("Presigning error: {0}")]
    PresignError(String),

    /// Presigning configuration could not be built
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
