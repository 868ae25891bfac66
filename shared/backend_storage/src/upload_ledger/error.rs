//! Error types for idempotency ledger operations

use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::operation::{get_item::GetItemError, put_item::PutItemError};
use thiserror::Error;

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur during ledger operations
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Failed to write ledger entry into Dynamo DB
    #[error("Failed to write ledger entry into DynamoDB: {0:?}")]
    DynamoDbPutError(#[from] SdkError<PutItemError>),

    /// Failed to read ledger entry from Dynamo DB
    #[error("Failed to read ledger entry from DynamoDB: {0:?}")]
    DynamoDbGetError(#[from] SdkError<GetItemError>),

    /// Conditional write lost but the winning entry could not be read back
    #[error("Ledger entry for {object_key}@{object_version} vanished after a conflicting write")]
    MissingAfterConflict {
        /// Object key of the entry
        object_key: String,
        /// Object version of the entry
        object_version: String,
    },

    /// Failed to convert a ledger entry to or from a `DynamoDB` item
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_dynamo::Error> for LedgerError {
    fn from(err: serde_dynamo::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}
