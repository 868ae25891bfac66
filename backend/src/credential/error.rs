use thiserror::Error;

/// Result type for credential issuance
pub type CredentialResult<T> = Result<T, CredentialError>;

/// Reasons an upload request is refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Requested content type is not on the allow-list
    #[error("Content type not allowed: {0}")]
    InvalidContentType(String),

    /// File name or requester identity cannot be turned into an object key
    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),
}
