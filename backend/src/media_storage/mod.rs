//! S3 presigning for direct client uploads
mod error;

use std::collections::BTreeMap;
use std::sync::Arc;

use aws_sdk_s3::{presigning::PresigningConfig, Client as S3Client};
use chrono::{DateTime, Utc};

use crate::credential::UploadCredential;

pub use error::{BucketError, BucketResult};

/// Presigned request the client replays against the bucket
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    /// The presigned URL
    pub url: String,
    /// HTTP method to use
    pub method: String,
    /// Headers covered by the signature, lower-cased
    pub headers: BTreeMap<String, String>,
    /// When the signature stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Upload bucket client
pub struct MediaStorage {
    s3_client: Arc<S3Client>,
    bucket_name: String,
}

impl MediaStorage {
    /// Creates a new media storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `bucket_name` - Bucket uploads are written to
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, bucket_name: String) -> Self {
        Self {
            s3_client,
            bucket_name,
        }
    }

    /// Presigns a `PUT` of the credential's target key
    ///
    /// The signature covers `Content-Type`, so the client must upload with
    /// exactly the type the credential was issued for. The URL lives only as
    /// long as the credential has left.
    ///
    /// # Errors
    ///
    /// Returns `BucketError::ConfigError` if the credential has already expired
    /// Returns `BucketError::PresignError` if signing fails
    pub async fn presign_put(&self, credential: &UploadCredential) -> BucketResult<PresignedUrl> {
        let content_type = credential
            .content_type()
            .ok_or_else(|| BucketError::ConfigError("credential has no content type".to_string()))?
            .to_string();

        let remaining = (credential.expires_at - Utc::now())
            .to_std()
            .map_err(|_| BucketError::ConfigError("credential already expired".to_string()))?;

        let presigned_config = PresigningConfig::expires_in(remaining).map_err(|e| {
            BucketError::ConfigError(format!("Failed to create presigning config: {e}"))
        })?;

        let presigned = self
            .s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&credential.target_key)
            .content_type(&content_type)
            .presigned(presigned_config)
            .await
            .map_err(|e| BucketError::PresignError(format!("Failed to generate presigned URL: {e}")))?;

        let mut headers: BTreeMap<String, String> = presigned
            .headers()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.to_string()))
            .collect();
        headers.entry("content-type".to_string()).or_insert(content_type);

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            method: credential.method.as_str().to_string(),
            headers,
            expires_at: credential.expires_at,
        })
    }
}
