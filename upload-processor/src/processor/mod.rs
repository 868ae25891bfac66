//! Storage event handling
//!
//! Every delivery of a storage event runs [`UploadProcessor::handle_event`]
//! independently. Deliveries are at-least-once, so the ledger decides which
//! invocation produces the one result that is published for an object version.

mod error;

use std::sync::Arc;

use backend_storage::{
    notification::NotificationDispatcher,
    upload_ledger::{IdempotencyLedger, LedgerEntry},
};
use chrono::TimeDelta;
use common_types::{
    normalize_content_type, sniff_content_type, ProcessingResult, StorageEvent, UploadKey,
    UploadPolicy,
};
use tracing::{info, instrument, warn};

use crate::content::{ContentProcessor, DigestProcessor, ProcessingError};
use crate::object_reader::{ObjectReadError, ObjectReader};

pub use error::{ProcessorError, ProcessorResult};

/// Tolerated difference between the issuer's clock and the storage clock, in seconds
pub const CLOCK_SKEW_SECS: i64 = 60;

/// Rejection reasons carried in `ProcessingResult::reason`
pub mod reasons {
    /// Key was not issued under the configured prefix and layout
    pub const UNEXPECTED_KEY: &str = "unexpected object key";
    /// Zero-byte object
    pub const EMPTY: &str = "object is empty";
    /// Object larger than the configured maximum
    pub const TOO_LARGE: &str = "size exceeds limit";
    /// Write completed after the credential expired
    pub const EXPIRED: &str = "credential expired";
    /// Object disappeared before it could be read
    pub const NOT_READABLE: &str = "object not readable";
    /// Content signature is unknown or not allowed
    pub const UNRECOGNIZED_TYPE: &str = "unrecognized content type";
    /// Stored `Content-Type` disagrees with the content signature
    pub const TYPE_MISMATCH: &str = "content type mismatch";
}

/// Settings of the upload processor
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Upload settings shared with the credential issuer
    pub policy: UploadPolicy,
    /// How long ledger entries are kept
    pub ledger_retention: TimeDelta,
}

/// Validates, processes and reports uploaded objects
pub struct UploadProcessor {
    config: ProcessorConfig,
    ledger: Arc<dyn IdempotencyLedger>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    objects: Arc<dyn ObjectReader>,
    content: Arc<dyn ContentProcessor>,
}

impl UploadProcessor {
    /// Creates a processor that extracts a content digest from every valid upload
    #[must_use]
    pub fn new(
        config: ProcessorConfig,
        ledger: Arc<dyn IdempotencyLedger>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        objects: Arc<dyn ObjectReader>,
    ) -> Self {
        Self {
            config,
            ledger,
            dispatcher,
            objects,
            content: Arc::new(DigestProcessor),
        }
    }

    /// Replaces the content processing step
    #[must_use]
    pub fn with_content_processor(mut self, content: Arc<dyn ContentProcessor>) -> Self {
        self.content = content;
        self
    }

    /// Handles one delivery of a storage event
    ///
    /// Returns the result recorded for the event's object version: the one
    /// computed by this call, or the one an earlier or concurrent delivery
    /// recorded. Only the call that records a result publishes it.
    ///
    /// # Errors
    ///
    /// Returns `ProcessorError` when the event must be delivered again; nothing
    /// has been recorded or published in that case
    #[instrument(
        skip(self, event),
        fields(
            object_key = %event.object_key,
            object_version = %event.object_version,
            delivery_id = %event.delivery_id,
        )
    )]
    pub async fn handle_event(&self, event: &StorageEvent) -> ProcessorResult<ProcessingResult> {
        if let Some(entry) = self
            .ledger
            .lookup(&event.object_key, &event.object_version)
            .await?
        {
            info!(status = %entry.status, "Duplicate delivery, returning recorded result");
            return Ok(entry.result);
        }

        let result = self.evaluate(event).await?;

        let outcome = self
            .ledger
            .record_if_absent(LedgerEntry::new(result, self.config.ledger_retention))
            .await?;

        if !outcome.inserted {
            info!(
                status = %outcome.existing.status,
                "Concurrent delivery recorded first, discarding this result"
            );
            return Ok(outcome.existing.result);
        }

        let result = outcome.existing.result;
        info!(status = %result.status, reason = ?result.reason, "Recorded processing result");

        // Notification is best effort; the recorded result stands either way
        if let Err(e) = self.dispatcher.publish(&result).await {
            warn!(error = %e, "Failed to publish processing result");
        }

        Ok(result)
    }

    /// Validates and processes the object without touching the ledger
    async fn evaluate(&self, event: &StorageEvent) -> ProcessorResult<ProcessingResult> {
        let policy = &self.config.policy;
        let reject = |reason: &str| {
            ProcessingResult::rejected(&event.object_key, &event.object_version, reason)
        };

        let Ok(key) = UploadKey::parse(&policy.key_prefix, &event.object_key) else {
            return Ok(reject(reasons::UNEXPECTED_KEY));
        };

        if event.size_bytes == 0 {
            return Ok(reject(reasons::EMPTY));
        }
        if event.size_bytes > policy.max_upload_size_bytes {
            return Ok(reject(reasons::TOO_LARGE));
        }

        // An issue time the issuer could never have produced overflows here
        let Some(deadline) = key
            .issued_at()
            .checked_add_signed(policy.credential_expiry())
            .and_then(|expiry| expiry.checked_add_signed(TimeDelta::seconds(CLOCK_SKEW_SECS)))
        else {
            return Ok(reject(reasons::UNEXPECTED_KEY));
        };
        if event.event_time > deadline {
            return Ok(reject(reasons::EXPIRED));
        }

        let object = match self
            .objects
            .read(
                &event.object_key,
                &event.object_version,
                policy.max_upload_size_bytes.saturating_add(1),
            )
            .await
        {
            Ok(object) => object,
            Err(ObjectReadError::NotFound(_)) => return Ok(reject(reasons::NOT_READABLE)),
            Err(e @ ObjectReadError::Unavailable(_)) => {
                return Err(ProcessorError::Transient(e.to_string()))
            }
        };

        // The event size is reported by storage; the bytes are what was kept.
        // Reads stop one byte past the limit, which is enough to reject.
        if object.bytes.is_empty() {
            return Ok(reject(reasons::EMPTY));
        }
        if object.bytes.len() as u64 > policy.max_upload_size_bytes {
            return Ok(reject(reasons::TOO_LARGE));
        }

        let Some(sniffed) =
            sniff_content_type(&object.bytes).filter(|ct| policy.allows_content_type(ct))
        else {
            return Ok(reject(reasons::UNRECOGNIZED_TYPE));
        };

        let declared = object
            .content_type
            .as_deref()
            .and_then(normalize_content_type);
        if declared.as_deref() != Some(sniffed) {
            return Ok(reject(reasons::TYPE_MISMATCH));
        }

        match self
            .content
            .process(&event.object_key, sniffed, &object.bytes)
            .await
        {
            Ok(metadata) => Ok(ProcessingResult::success(
                &event.object_key,
                &event.object_version,
                sniffed,
                metadata.sha256,
            )),
            Err(ProcessingError::Permanent(reason)) => Ok(ProcessingResult::failed(
                &event.object_key,
                &event.object_version,
                reason,
            )),
            Err(ProcessingError::Transient(reason)) => Err(ProcessorError::Transient(reason)),
        }
    }
}
