use aws_sdk_s3::{error::SdkError, operation::get_object::GetObjectError};
use thiserror::Error;

/// Result type for object reads
pub type ObjectReadResult<T> = Result<T, ObjectReadError>;

/// Errors that can occur while reading an uploaded object
#[derive(Error, Debug)]
pub enum ObjectReadError {
    /// The object does not exist (never uploaded, or deleted since)
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Storage failed in a way that may succeed on retry
    #[error("Object store error: {0}")]
    Unavailable(String),
}

impl From<SdkError<GetObjectError>> for ObjectReadError {
    fn from(error: SdkError<GetObjectError>) -> Self {
        match &error {
            SdkError::ServiceError(err) => match err.err() {
                GetObjectError::NoSuchKey(_) => Self::NotFound(format!("{:?}", err.err())),
                // 412: the version named by the event has been overwritten
                _ if matches!(err.raw().status().as_u16(), 404 | 412) => {
                    Self::NotFound(format!("{:?}", err.err()))
                }
                _ => Self::Unavailable(format!("{:?}", err.err())),
            },
            _ => Self::Unavailable(error.to_string()),
        }
    }
}
