//! SQS queue carrying storage-completion events
//!
//! S3 publishes `ObjectCreated` notifications into this queue. Delivery is
//! at-least-once; a message becomes visible again if it is not acknowledged
//! within the visibility timeout.

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sqs::Client as SqsClient;
use common_types::StorageEvent;

use crate::queue::{
    error::QueueResult,
    types::{QueueConfig, QueueMessage},
    EventQueue,
};

/// SQS queue of storage events
pub struct StorageEventQueue {
    sqs_client: Arc<SqsClient>,
    config: QueueConfig,
}

impl StorageEventQueue {
    /// Creates a new storage event queue
    ///
    /// # Arguments
    ///
    /// * `sqs_client` - Pre-configured SQS client
    /// * `config` - Queue configuration including URL and default parameters
    #[must_use]
    pub const fn new(sqs_client: Arc<SqsClient>, config: QueueConfig) -> Self {
        Self { sqs_client, config }
    }
}

#[async_trait]
impl EventQueue for StorageEventQueue {
    async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage<Vec<StorageEvent>>>> {
        let result = self
            .sqs_client
            .receive_message()
            .queue_url(&self.config.queue_url)
            .max_number_of_messages(self.config.default_max_messages)
            .visibility_timeout(self.config.default_visibility_timeout)
            .wait_time_seconds(self.config.default_wait_time_seconds)
            .send()
            .await?;

        // Undecodable bodies are left unacknowledged so the redrive policy can
        // move them to the dead-letter queue
        let messages = result
            .messages()
            .iter()
            .filter_map(|msg| {
                let body = msg.body()?;
                let receipt_handle = msg.receipt_handle()?.to_string();
                let message_id = msg.message_id()?.to_string();

                match StorageEvent::from_message_body(body, &message_id) {
                    Ok(events) => Some(QueueMessage {
                        body: events,
                        receipt_handle,
                        message_id,
                    }),
                    Err(e) => {
                        tracing::error!(message_id = %message_id, "Failed to decode storage event: {}", e);
                        None
                    }
                }
            })
            .collect();

        Ok(messages)
    }

    async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()> {
        self.sqs_client
            .delete_message()
            .queue_url(&self.config.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await?;

        Ok(())
    }
}
