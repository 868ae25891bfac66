//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{credential::CredentialError, media_storage::BucketError};

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Machine-readable error code
    pub error_code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
    /// Whether the client should retry the request
    pub allow_retry: bool,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                error_code: code,
                message: msg,
                allow_retry: retry,
            },
        }
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.error_code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error_code,
                self.inner.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error_code,
                self.inner.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

impl From<CredentialError> for AppError {
    fn from(err: CredentialError) -> Self {
        tracing::debug!("Credential request refused: {err}");

        match err {
            CredentialError::InvalidContentType(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_content_type",
                "Content type is not allowed for upload",
                false,
            ),
            CredentialError::InvalidRequest(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_request",
                "File name is missing or unusable",
                false,
            ),
        }
    }
}

impl From<BucketError> for AppError {
    fn from(err: BucketError) -> Self {
        match &err {
            BucketError::PresignError(msg) => {
                tracing::error!("Presigning failed: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    true,
                )
            }
            BucketError::ConfigError(msg) => {
                tracing::error!("Configuration error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response = AppError::from(CredentialError::InvalidContentType(
            "application/x-msdownload".to_string(),
        ))
        .into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "errorCode": "invalid_content_type",
                "message": "Content type is not allowed for upload",
                "allowRetry": false,
            })
        );
    }

    #[test]
    fn test_presign_failure_is_retryable_server_error() {
        let err = AppError::from(BucketError::PresignError("signing failed".to_string()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "internal_error");
        assert!(err.inner.allow_retry);
    }
}
