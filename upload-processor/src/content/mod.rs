//! Content processing applied to validated uploads

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Result type for content processing
pub type ContentResult<T> = Result<T, ProcessingError>;

/// Failure modes of a content processor
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    /// Processing can never succeed for this object
    #[error("Permanent processing failure: {0}")]
    Permanent(String),

    /// Processing may succeed if the event is delivered again
    #[error("Transient processing failure: {0}")]
    Transient(String),
}

/// Metadata extracted from an upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMetadata {
    /// Lowercase hex SHA-256 of the content
    pub sha256: String,
}

/// Domain processing step run on every validated upload
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    /// Processes object content whose type has already been verified
    ///
    /// # Errors
    ///
    /// Returns `ProcessingError::Permanent` to fail the upload,
    /// `ProcessingError::Transient` to have the event redelivered
    async fn process(
        &self,
        object_key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> ContentResult<ContentMetadata>;
}

/// Default processor: extracts the content digest
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestProcessor;

#[async_trait]
impl ContentProcessor for DigestProcessor {
    async fn process(
        &self,
        _object_key: &str,
        _content_type: &str,
        bytes: &[u8],
    ) -> ContentResult<ContentMetadata> {
        Ok(ContentMetadata {
            sha256: hex::encode(Sha256::digest(bytes)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_digest_of_known_content() {
        let metadata = DigestProcessor
            .process("uploads/a/1-aaaaaaaaaaaa/a.png", "image/png", b"abc")
            .await
            .unwrap();

        assert_eq!(
            metadata.sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
