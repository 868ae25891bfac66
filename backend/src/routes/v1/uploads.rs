use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{Extension, Json};
use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use validator::Validate;

use crate::{
    credential::{CredentialIssuer, UploadRequest},
    media_storage::MediaStorage,
    middleware::Requester,
    types::{AppError, ValidatedJson},
};

#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUploadRequest {
    /// Name of the file being uploaded; only its last path component is kept
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    /// MIME type the file will be uploaded with
    #[validate(length(min = 1, max = 255))]
    pub content_type: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadResponse {
    /// Object key the upload will be stored under
    pub target_key: String,
    /// Presigned URL to upload the file to
    pub url: String,
    /// HTTP method to use with the URL
    pub method: String,
    /// Headers that must accompany the upload
    pub headers: BTreeMap<String, String>,
    /// ISO-8601 UTC timestamp when the URL expires
    pub expires_at: String,
    /// Largest accepted upload, in bytes
    pub max_size_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadConfigResponse {
    /// Largest accepted upload, in bytes
    pub max_size_bytes: u64,
    /// Content types that can be uploaded
    pub allowed_content_types: Vec<String>,
    /// Lifetime of an upload URL in seconds
    pub credential_expiry_secs: u64,
}

/// Issues a presigned URL for uploading one file directly to storage
///
/// The returned URL can write exactly `targetKey`, only with the requested
/// content type, and only until `expiresAt`. Processing starts once the upload
/// completes; its outcome is published asynchronously.
///
/// # Errors
///
/// - `invalid_content_type` - the content type is not on the allow-list
/// - `invalid_request` - the file name is empty or has no usable characters
/// - `internal_error` - the URL could not be signed
#[instrument(skip(issuer, media_storage, payload))]
pub async fn create_upload(
    Extension(issuer): Extension<Arc<CredentialIssuer>>,
    Extension(media_storage): Extension<Arc<MediaStorage>>,
    Requester(requested_by): Requester,
    ValidatedJson(payload): ValidatedJson<CreateUploadRequest>,
) -> Result<Json<CreateUploadResponse>, AppError> {
    let request = UploadRequest {
        file_name: payload.file_name,
        content_type: payload.content_type,
        requested_by,
        timestamp: Utc::now(),
    };

    let credential = issuer.issue(&request)?;
    let presigned = media_storage.presign_put(&credential).await?;

    Ok(Json(CreateUploadResponse {
        target_key: credential.target_key,
        url: presigned.url,
        method: presigned.method,
        headers: presigned.headers,
        expires_at: presigned.expires_at.to_rfc3339(),
        max_size_bytes: credential.constraints.max_size_bytes,
    }))
}

/// Upload limits clients can check before asking for a URL
pub async fn get_upload_config(
    Extension(issuer): Extension<Arc<CredentialIssuer>>,
) -> Json<UploadConfigResponse> {
    let policy = issuer.policy();

    Json(UploadConfigResponse {
        max_size_bytes: policy.max_upload_size_bytes,
        allowed_content_types: policy.allowed_content_types.iter().cloned().collect(),
        credential_expiry_secs: policy.credential_expiry_secs,
    })
}
