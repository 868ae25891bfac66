//! Upload credential issuance
//!
//! A credential authorizes exactly one `PUT` of one object key, for one content
//! type, up to the configured size, until it expires. Issuance is pure: nothing
//! is persisted and the idempotency ledger is never consulted.

mod error;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use common_types::{normalize_content_type, UploadKey, UploadKeyError, UploadPolicy};

pub use error::{CredentialError, CredentialResult};

/// A client's request to upload one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Name the client gave the file
    pub file_name: String,
    /// Declared MIME type
    pub content_type: String,
    /// Identity of the caller
    pub requested_by: String,
    /// When the request was received
    pub timestamp: DateTime<Utc>,
}

/// HTTP method a credential is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    /// Single-object `PUT`
    Put,
}

impl UploadMethod {
    /// Method name as sent on the wire
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "PUT",
        }
    }
}

/// Limits the storage layer enforces on the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConstraints {
    /// Largest object accepted, in bytes
    pub max_size_bytes: u64,
    /// Content types the upload may declare
    pub allowed_content_types: BTreeSet<String>,
}

/// Time-limited authorization to write one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCredential {
    /// The only key this credential can write
    pub target_key: String,
    /// Permitted method
    pub method: UploadMethod,
    /// Instant after which the credential is void
    pub expires_at: DateTime<Utc>,
    /// Size and type limits
    pub constraints: UploadConstraints,
}

impl UploadCredential {
    /// Whether a write with these attributes falls within the credential
    ///
    /// Mirrors what the storage layer checks when the presigned request arrives.
    #[must_use]
    pub fn authorizes(
        &self,
        key: &str,
        content_type: &str,
        size_bytes: u64,
        at: DateTime<Utc>,
    ) -> bool {
        let type_allowed = normalize_content_type(content_type)
            .is_some_and(|ct| self.constraints.allowed_content_types.contains(&ct));

        key == self.target_key
            && type_allowed
            && size_bytes <= self.constraints.max_size_bytes
            && at <= self.expires_at
    }

    /// The single content type this credential was issued for
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.constraints
            .allowed_content_types
            .iter()
            .next()
            .map(String::as_str)
    }
}

/// Turns upload requests into scoped credentials
#[derive(Debug, Clone)]
pub struct CredentialIssuer {
    policy: UploadPolicy,
}

impl CredentialIssuer {
    /// Creates an issuer enforcing the given policy
    #[must_use]
    pub const fn new(policy: UploadPolicy) -> Self {
        Self { policy }
    }

    /// Policy the issuer enforces
    #[must_use]
    pub const fn policy(&self) -> &UploadPolicy {
        &self.policy
    }

    /// Issues a credential for a single upload
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::InvalidContentType` if the content type is not
    /// allowed, `CredentialError::InvalidRequest` if the file name or requester
    /// cannot be used in an object key
    pub fn issue(&self, req: &UploadRequest) -> CredentialResult<UploadCredential> {
        let content_type = normalize_content_type(&req.content_type)
            .filter(|ct| self.policy.allows_content_type(ct))
            .ok_or_else(|| CredentialError::InvalidContentType(req.content_type.clone()))?;

        let key = UploadKey::generate(
            &self.policy.key_prefix,
            &req.requested_by,
            &req.file_name,
            req.timestamp,
        )
        .map_err(|e| match e {
            UploadKeyError::InvalidFileName(name) => {
                CredentialError::InvalidRequest(format!("unusable file name {name:?}"))
            }
            UploadKeyError::InvalidRequester(requester) => {
                CredentialError::InvalidRequest(format!("unusable requester {requester:?}"))
            }
            other => CredentialError::InvalidRequest(other.to_string()),
        })?;

        // Expiry counts from the issuance time recorded in the key so the
        // processor derives the same instant
        let expires_at = key.issued_at() + self.policy.credential_expiry();
        let target_key = key.to_string();

        tracing::info!(
            target_key = %target_key,
            requested_by = %req.requested_by,
            expires_at = %expires_at.to_rfc3339(),
            "Issued upload credential"
        );

        Ok(UploadCredential {
            target_key,
            method: UploadMethod::Put,
            expires_at,
            constraints: UploadConstraints {
                max_size_bytes: self.policy.max_upload_size_bytes,
                allowed_content_types: BTreeSet::from([content_type]),
            },
        })
    }
}
