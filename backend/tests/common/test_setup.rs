use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::Client as S3Client;
use axum::{body::Body, http::Request, response::Response, Router};
use backend::{
    credential::CredentialIssuer, media_storage::MediaStorage, server, types::Environment,
};
use common_types::UploadPolicy;
use tower::ServiceExt;

pub const TEST_BUCKET: &str = "uploads-bucket";

/// Setup test logging
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// S3 client with static credentials; presigning happens locally so no
/// endpoint needs to be reachable
pub fn test_s3_client() -> Arc<S3Client> {
    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::from_keys("test", "test", None))
        .endpoint_url("http://localhost:4566")
        .force_path_style(true)
        .build();

    Arc::new(S3Client::from_conf(config))
}

/// Router wired like the real server, minus the tracing and timeout layers
pub struct TestSetup {
    pub router: Router,
    pub policy: UploadPolicy,
}

impl TestSetup {
    pub fn new(environment: &Environment, policy: UploadPolicy) -> Self {
        setup_test_env();

        let media_storage = Arc::new(MediaStorage::new(test_s3_client(), TEST_BUCKET.to_string()));
        let issuer = Arc::new(CredentialIssuer::new(policy.clone()));

        Self {
            router: server::router(environment, issuer, media_storage),
            policy,
        }
    }

    pub fn development() -> Self {
        Self::new(&Environment::Development, UploadPolicy::default())
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        requester: Option<&str>,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(requester) = requester {
            builder = builder.header("x-requester-id", requester);
        }
        let request = builder.body(Body::from(payload.to_string()))?;

        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }
}

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    use http_body_util::BodyExt;

    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();
    serde_json::from_slice(&body).expect("Response body is not JSON")
}
