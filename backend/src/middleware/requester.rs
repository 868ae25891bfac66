use aide::OperationIo;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderName, StatusCode},
};

use crate::types::AppError;

/// Header carrying the caller identity, set by the upstream gateway
pub const REQUESTER_HEADER: HeaderName = HeaderName::from_static("x-requester-id");

/// Identity used when the gateway does not forward one
pub const ANONYMOUS_REQUESTER: &str = "anonymous";

/// Caller identity the upload key is scoped to
#[derive(Debug, Clone, PartialEq, Eq, OperationIo)]
pub struct Requester(pub String);

/// Axum extractor for the caller identity
///
/// ```ignore
/// async fn handler(Requester(id): Requester) -> impl IntoResponse {
///     id
/// }
/// ```
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(&REQUESTER_HEADER) else {
            return Ok(Self(ANONYMOUS_REQUESTER.to_string()));
        };

        let requester = value.to_str().map(str::trim).map_err(|_| {
            AppError::new(
                StatusCode::BAD_REQUEST,
                "invalid_requester",
                "Requester header must be visible ASCII",
                false,
            )
        })?;

        if requester.is_empty() {
            return Ok(Self(ANONYMOUS_REQUESTER.to_string()));
        }

        Ok(Self(requester.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    async fn extract(header: Option<HeaderValue>) -> Result<Requester, AppError> {
        let mut builder = Request::builder().uri("/v1/uploads");
        if let Some(value) = header {
            builder = builder.header(REQUESTER_HEADER, value);
        }
        let (mut parts, ()) = builder.body(()).unwrap().into_parts();
        Requester::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn test_missing_header_is_anonymous() {
        let requester = extract(None).await.unwrap();
        assert_eq!(requester, Requester("anonymous".to_string()));
    }

    #[tokio::test]
    async fn test_header_value_is_trimmed() {
        let requester = extract(Some(HeaderValue::from_static(" user-42 ")))
            .await
            .unwrap();
        assert_eq!(requester, Requester("user-42".to_string()));
    }

    #[tokio::test]
    async fn test_non_ascii_header_is_rejected() {
        let value = HeaderValue::from_bytes(&[0xE2, 0x9C, 0x93]).unwrap();
        let err = extract(Some(value)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
