//! Queue operations for the upload pipeline
//!
//! This module provides the SQS queue that delivers storage-completion events
//! to the upload processor.

/// Error types for queue operations
pub mod error;
/// Storage event queue backed by SQS
pub mod sqs_queue;
/// Common types for queue operations
pub mod types;

use async_trait::async_trait;
use common_types::StorageEvent;

pub use error::{QueueError, QueueResult};
pub use sqs_queue::StorageEventQueue;
pub use types::{QueueConfig, QueueMessage};

/// Source of storage-event messages
#[async_trait]
pub trait EventQueue: Send + Sync {
    /// Polls the next batch of messages, each decoded into the events it carries
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the poll operation fails
    async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage<Vec<StorageEvent>>>>;

    /// Acknowledges a message so it is not delivered again
    ///
    /// # Errors
    ///
    /// Returns `QueueError` if the acknowledgment fails
    async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()>;
}
