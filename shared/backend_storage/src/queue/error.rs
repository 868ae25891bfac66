use aws_sdk_sqs::error::SdkError;
use aws_sdk_sqs::operation::delete_message::DeleteMessageError;
use aws_sdk_sqs::operation::receive_message::ReceiveMessageError;
use thiserror::Error;

/// Result type alias for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Error types for queue operations
#[derive(Error, Debug)]
pub enum QueueError {
    /// Error receiving messages from SQS
    #[error("Failed to receive messages from SQS: {0:?}")]
    ReceiveMessage(#[from] SdkError<ReceiveMessageError>),

    /// Error deleting message from SQS
    #[error("Failed to delete message from SQS: {0:?}")]
    DeleteMessage(#[from] SdkError<DeleteMessageError>),
}

impl QueueError {
    /// Checks if this error represents an upstream error: a 5xx response or a
    /// queue that could not be reached at all
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Self::ReceiveMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
            Self::DeleteMessage(sdk_err) => Self::check_sdk_error_status(sdk_err),
        }
    }

    fn check_sdk_error_status<E>(sdk_err: &SdkError<E>) -> bool {
        match sdk_err {
            SdkError::ServiceError(err) => err.raw().status().as_u16() >= 500,
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_queue_is_upstream() {
        let err = QueueError::ReceiveMessage(SdkError::timeout_error("receive timed out"));
        assert!(err.is_upstream_error());
    }

    #[test]
    fn test_request_construction_failure_is_not_upstream() {
        let err = QueueError::DeleteMessage(SdkError::construction_failure("missing receipt"));
        assert!(!err.is_upstream_error());
    }
}
