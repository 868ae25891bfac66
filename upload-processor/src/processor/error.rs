use backend_storage::upload_ledger::LedgerError;
use thiserror::Error;

/// Result type for event handling
pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// Recoverable failures: nothing is recorded and the event must be redelivered
#[derive(Error, Debug)]
pub enum ProcessorError {
    /// Object storage or content processing failed in a retryable way
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Idempotency ledger could not be read or written
    #[error("Ledger failure: {0}")]
    Ledger(#[from] LedgerError),
}
