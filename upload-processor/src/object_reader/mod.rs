//! Reads uploaded objects back from the bucket for validation

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;

pub use error::{ObjectReadError, ObjectReadResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryObjectStore;

/// Content and metadata of a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Object bytes
    pub bytes: Vec<u8>,
    /// `Content-Type` the object was stored with, if any
    pub content_type: Option<String>,
}

/// Read access to uploaded objects
#[async_trait]
pub trait ObjectReader: Send + Sync {
    /// Reads one version of an object, keeping at most `byte_limit` bytes
    ///
    /// `version` is the identifier carried by the storage event; readers that
    /// cannot address it directly read the current object. Callers that need to
    /// detect oversized objects ask for one byte more than they accept.
    ///
    /// # Errors
    ///
    /// Returns `ObjectReadError::NotFound` if the object does not exist,
    /// `ObjectReadError::Unavailable` for any other failure
    async fn read(&self, key: &str, version: &str, byte_limit: u64)
        -> ObjectReadResult<StoredObject>;
}

/// S3 reader for the upload bucket
pub struct S3ObjectReader {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl S3ObjectReader {
    /// Creates a new reader
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket uploads land in
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ObjectReader for S3ObjectReader {
    async fn read(
        &self,
        key: &str,
        version: &str,
        byte_limit: u64,
    ) -> ObjectReadResult<StoredObject> {
        let mut request = self.s3_client.get_object().bucket(&self.bucket_name).key(key);

        // Unversioned buckets identify objects by ETag instead of a version id
        request = match etag_value(version) {
            Some(etag) => request.if_match(format!("\"{etag}\"")),
            None => request.version_id(version),
        };

        let output = request.send().await?;
        let content_type = output.content_type().map(ToString::to_string);

        let limit = usize::try_from(byte_limit).unwrap_or(usize::MAX);
        let mut body = output.body;
        let mut bytes = Vec::new();

        while bytes.len() < limit {
            let Some(chunk) = body
                .try_next()
                .await
                .map_err(|e| ObjectReadError::Unavailable(format!("Failed to read body: {e}")))?
            else {
                break;
            };
            let take = chunk.len().min(limit - bytes.len());
            bytes.extend_from_slice(&chunk[..take]);
        }

        Ok(StoredObject {
            bytes,
            content_type,
        })
    }
}

/// Returns the bare ETag if `version` has the shape of one: 32 hex digits,
/// optionally followed by `-{parts}` for multipart uploads
fn etag_value(version: &str) -> Option<&str> {
    let etag = version.trim_matches('"');
    let (digest, parts) = etag.split_once('-').map_or((etag, None), |(d, p)| (d, Some(p)));

    let digest_ok = digest.len() == 32 && digest.chars().all(|c| c.is_ascii_hexdigit());
    let parts_ok = parts.is_none_or(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));

    (digest_ok && parts_ok).then_some(etag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_shapes() {
        assert_eq!(
            etag_value("d41d8cd98f00b204e9800998ecf8427e"),
            Some("d41d8cd98f00b204e9800998ecf8427e")
        );
        assert_eq!(
            etag_value("\"d41d8cd98f00b204e9800998ecf8427e-3\""),
            Some("d41d8cd98f00b204e9800998ecf8427e-3")
        );
        assert_eq!(etag_value("3HL4kqtJlcpXroDTDmJ+rmSpXd3dIbrHY+MTRCxf3vjVBH40Nrjfkd"), None);
        assert_eq!(etag_value("d41d8cd98f00b204e9800998ecf8427e-"), None);
    }
}
