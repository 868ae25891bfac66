use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Terminal outcome of processing one object version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    /// Object passed validation and was processed
    Success,
    /// Object failed validation
    Rejected,
    /// Processing failed permanently
    Failed,
}

/// Outcome of processing one `(object_key, object_version)` pair.
///
/// Immutable once emitted; this is also the body of the published
/// notification message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingResult {
    /// Key of the processed object
    pub object_key: String,
    /// Version (or `ETag`) of the processed object
    pub object_version: String,
    /// Terminal status
    pub status: ProcessingStatus,
    /// Why the object was rejected or failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When processing finished
    pub processed_at: DateTime<Utc>,
    /// Content type detected from the object bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Lowercase hex SHA-256 of the object content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ProcessingResult {
    /// Successful outcome with extracted metadata
    #[must_use]
    pub fn success(
        object_key: impl Into<String>,
        object_version: impl Into<String>,
        content_type: impl Into<String>,
        sha256: impl Into<String>,
    ) -> Self {
        Self {
            object_key: object_key.into(),
            object_version: object_version.into(),
            status: ProcessingStatus::Success,
            reason: None,
            processed_at: Utc::now(),
            content_type: Some(content_type.into()),
            sha256: Some(sha256.into()),
        }
    }

    /// Validation failure
    #[must_use]
    pub fn rejected(
        object_key: impl Into<String>,
        object_version: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::terminal_failure(
            object_key,
            object_version,
            ProcessingStatus::Rejected,
            reason,
        )
    }

    /// Permanent processing failure
    #[must_use]
    pub fn failed(
        object_key: impl Into<String>,
        object_version: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::terminal_failure(object_key, object_version, ProcessingStatus::Failed, reason)
    }

    fn terminal_failure(
        object_key: impl Into<String>,
        object_version: impl Into<String>,
        status: ProcessingStatus,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            object_key: object_key.into(),
            object_version: object_version.into(),
            status,
            reason: Some(reason.into()),
            processed_at: Utc::now(),
            content_type: None,
            sha256: None,
        }
    }
}
