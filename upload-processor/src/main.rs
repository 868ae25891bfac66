use std::sync::Arc;

use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_sns::Client as SnsClient;
use aws_sdk_sqs::Client as SqsClient;
use backend_storage::{
    notification::SnsNotificationDispatcher, queue::StorageEventQueue,
    upload_ledger::DynamoDbLedger,
};
use common_types::UploadPolicy;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use upload_processor::health;
use upload_processor::object_reader::S3ObjectReader;
use upload_processor::processor::{ProcessorConfig, UploadProcessor};
use upload_processor::types::environment::Environment;
use upload_processor::worker::{UploadWorker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = Environment::from_env();

    if env.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    info!("Starting upload processor in {:?} environment", env);

    let aws_config = env.aws_config().await;
    let s3_client = Arc::new(S3Client::from_conf(env.s3_client_config().await));
    let dynamodb_client = Arc::new(DynamoDbClient::new(&aws_config));
    let sns_client = Arc::new(SnsClient::new(&aws_config));
    let sqs_client = Arc::new(SqsClient::new(&aws_config));

    let processor = UploadProcessor::new(
        ProcessorConfig {
            policy: UploadPolicy::from_env(),
            ledger_retention: env.ledger_retention(),
        },
        Arc::new(DynamoDbLedger::new(dynamodb_client, env.ledger_table_name())),
        Arc::new(SnsNotificationDispatcher::new(
            sns_client,
            env.results_topic_arn(),
        )),
        Arc::new(S3ObjectReader::new(s3_client, env.s3_bucket())),
    );

    let worker = UploadWorker::new(
        WorkerConfig::with_workers(env.num_workers()),
        Arc::new(StorageEventQueue::new(
            sqs_client,
            env.upload_events_queue_config(),
        )),
        Arc::new(processor),
    );

    let shutdown_token = worker.shutdown_token();

    // Start health check server
    let health_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Err(e) = health::start_health_server(health_shutdown).await {
            error!("Health server error: {}", e);
        }
    });

    // Spawn signal handler
    let signal_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, initiating graceful shutdown...");
                signal_shutdown.cancel();
            }
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {}", e);
            }
        }
    });

    worker.start().await;

    info!("Upload processor stopped");
    Ok(())
}
