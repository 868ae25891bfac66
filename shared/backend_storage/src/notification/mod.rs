//! Result notification via an SNS fan-out topic
//!
//! Publishing is best-effort: the dispatcher guarantees the publish call to the
//! topic, not receipt by subscribers (operator inbox, chat, audit log).

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod recording;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_sns::{types::MessageAttributeValue, Client as SnsClient};
use common_types::ProcessingResult;

pub use error::{DispatchError, DispatchResult};
#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingDispatcher;

/// Message attribute subscribers can filter on
pub const STATUS_ATTRIBUTE: &str = "status";

/// Acknowledgement of a successful publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Identifier assigned by the topic, if any
    pub message_id: Option<String>,
}

/// Publishes processing results to subscribers
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Publishes a processing result to the topic
    ///
    /// # Errors
    ///
    /// Returns `DispatchError` if the message cannot be built or published
    async fn publish(&self, result: &ProcessingResult) -> DispatchResult<Ack>;
}

/// SNS topic client for result notifications
pub struct SnsNotificationDispatcher {
    sns_client: Arc<SnsClient>,
    topic_arn: String,
}

impl SnsNotificationDispatcher {
    /// Creates a new dispatcher
    ///
    /// # Arguments
    ///
    /// * `sns_client` - Pre-configured SNS client
    /// * `topic_arn` - ARN of the results topic
    #[must_use]
    pub const fn new(sns_client: Arc<SnsClient>, topic_arn: String) -> Self {
        Self {
            sns_client,
            topic_arn,
        }
    }
}

#[async_trait]
impl NotificationDispatcher for SnsNotificationDispatcher {
    async fn publish(&self, result: &ProcessingResult) -> DispatchResult<Ack> {
        let body = serde_json::to_string(result)?;

        let status = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(result.status.to_string())
            .build()
            .map_err(|e| DispatchError::InvalidMessage(e.to_string()))?;

        let output = self
            .sns_client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(format!("Upload {}", result.status))
            .message(body)
            .message_attributes(STATUS_ATTRIBUTE, status)
            .send()
            .await?;

        Ok(Ack {
            message_id: output.message_id().map(ToString::to_string),
        })
    }
}
