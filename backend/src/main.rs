use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;

use backend::{
    credential::CredentialIssuer, media_storage::MediaStorage, server, types::Environment,
};
use common_types::UploadPolicy;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // JSON logs for Datadog in deployed stages, human-readable locally
    match environment {
        Environment::Production | Environment::Staging => {
            fmt()
                .json()
                .with_env_filter(EnvFilter::from_default_env())
                .init();
        }
        Environment::Development => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
        }
    }

    let policy = UploadPolicy::from_env();
    tracing::info!(
        key_prefix = %policy.key_prefix,
        max_upload_size_bytes = policy.max_upload_size_bytes,
        credential_expiry_secs = policy.credential_expiry_secs,
        "Loaded upload policy"
    );

    let s3_client = Arc::new(S3Client::from_conf(environment.s3_client_config().await));
    let media_storage = Arc::new(MediaStorage::new(s3_client, environment.s3_bucket()));
    let issuer = Arc::new(CredentialIssuer::new(policy));

    server::start(environment, issuer, media_storage).await
}
