//! Error types for notification dispatch

use aws_sdk_sns::error::SdkError;
use aws_sdk_sns::operation::publish::PublishError;
use thiserror::Error;

/// Result type for notification dispatch
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur while publishing a processing result
#[derive(Error, Debug)]
pub enum DispatchError {
    /// SNS rejected or failed the publish call
    #[error("Failed to publish to SNS topic: {0:?}")]
    Publish(#[from] SdkError<PublishError>),

    /// Error serializing the notification message
    #[error("Failed to serialize notification: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Message could not be assembled
    #[error("Invalid notification message: {0}")]
    InvalidMessage(String),

    /// Topic is unreachable
    #[error("Notification topic unavailable: {0}")]
    Unavailable(String),
}
