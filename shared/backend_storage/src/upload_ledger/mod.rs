//! Idempotency ledger backed by Dynamo DB
//!
//! The ledger records the terminal outcome of every processed object version.
//! Its conditional insert is the only mutual-exclusion point between
//! concurrent deliveries of the same storage event.

mod error;
#[cfg(any(test, feature = "test-utils"))]
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_dynamodb::{error::SdkError, types::AttributeValue, Client as DynamoDbClient};
use chrono::{DateTime, TimeDelta, Utc};
use common_types::{ProcessingResult, ProcessingStatus};
use serde::{Deserialize, Serialize};
use strum::Display;

pub use error::{LedgerError, LedgerResult};
#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryLedger;

/// Attribute names for the upload ledger table
#[derive(Debug, Clone, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LedgerAttribute {
    /// Object key (Partition Key)
    ObjectKey,
    /// Object version (Sort Key)
    ObjectVersion,
    /// Terminal processing status
    Status,
    /// When the entry was written
    RecordedAt,
    /// Stored processing result
    Result,
    /// TTL timestamp
    Ttl,
}

/// Ledger entry for one processed object version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Object key (Partition Key)
    pub object_key: String,
    /// Object version (Sort Key)
    pub object_version: String,
    /// Terminal processing status
    pub status: ProcessingStatus,
    /// When the entry was written
    pub recorded_at: DateTime<Utc>,
    /// Processing result, stored in the same item so both become visible together
    pub result: ProcessingResult,
    /// TTL timestamp (Unix timestamp in seconds)
    pub ttl: i64,
}

impl LedgerEntry {
    /// Creates an entry for a processing result
    ///
    /// # Arguments
    ///
    /// * `result` - The terminal result to store
    /// * `retention` - How long the entry is kept; must far exceed the redelivery window
    #[must_use]
    pub fn new(result: ProcessingResult, retention: TimeDelta) -> Self {
        let recorded_at = Utc::now();
        Self {
            object_key: result.object_key.clone(),
            object_version: result.object_version.clone(),
            status: result.status,
            recorded_at,
            ttl: (recorded_at + retention).timestamp(),
            result,
        }
    }
}

/// Outcome of a conditional insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Whether this call wrote the entry
    pub inserted: bool,
    /// The entry now stored, written by this call or by an earlier winner
    pub existing: LedgerEntry,
}

/// Tracks which object versions have already been processed
#[async_trait]
pub trait IdempotencyLedger: Send + Sync {
    /// Gets the entry for an object version, if one was recorded
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the backing store cannot be read
    async fn lookup(
        &self,
        object_key: &str,
        object_version: &str,
    ) -> LedgerResult<Option<LedgerEntry>>;

    /// Atomically stores `entry` unless an entry for the same
    /// `(object_key, object_version)` exists.
    ///
    /// Exactly one concurrent caller observes `inserted = true`; every other
    /// caller gets the winner's entry back.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if the backing store cannot be written or read
    async fn record_if_absent(&self, entry: LedgerEntry) -> LedgerResult<RecordOutcome>;
}

/// Ledger client for Dynamo DB operations
pub struct DynamoDbLedger {
    dynamodb_client: Arc<DynamoDbClient>,
    table_name: String,
}

impl DynamoDbLedger {
    /// Creates a new ledger client
    ///
    /// # Arguments
    ///
    /// * `dynamodb_client` - Pre-configured Dynamo DB client
    /// * `table_name` - Dynamo DB table name, keyed by `object_key` (hash) and `object_version` (range)
    #[must_use]
    pub const fn new(dynamodb_client: Arc<DynamoDbClient>, table_name: String) -> Self {
        Self {
            dynamodb_client,
            table_name,
        }
    }
}

#[async_trait]
impl IdempotencyLedger for DynamoDbLedger {
    async fn lookup(
        &self,
        object_key: &str,
        object_version: &str,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let response = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .key(
                LedgerAttribute::ObjectKey.to_string(),
                AttributeValue::S(object_key.to_string()),
            )
            .key(
                LedgerAttribute::ObjectVersion.to_string(),
                AttributeValue::S(object_version.to_string()),
            )
            // A stale read here would let a duplicate slip past the fast path
            .consistent_read(true)
            .send()
            .await?;

        let entry = response
            .item()
            .map(|item| serde_dynamo::from_item(item.clone()))
            .transpose()?;

        Ok(entry)
    }

    async fn record_if_absent(&self, entry: LedgerEntry) -> LedgerResult<RecordOutcome> {
        let item = serde_dynamo::to_item(&entry)?;

        let result = self
            .dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#pk)")
            .expression_attribute_names("#pk", LedgerAttribute::ObjectKey.to_string())
            .send()
            .await;

        match result {
            Ok(_) => Ok(RecordOutcome {
                inserted: true,
                existing: entry,
            }),
            Err(SdkError::ServiceError(ref svc))
                if svc.err().is_conditional_check_failed_exception() =>
            {
                tracing::debug!(
                    object_key = %entry.object_key,
                    object_version = %entry.object_version,
                    "Ledger entry already recorded by another invocation"
                );

                let winner = self
                    .lookup(&entry.object_key, &entry.object_version)
                    .await?;

                conflict_outcome(entry, winner)
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Outcome of a conditional write that lost to `winner`
fn conflict_outcome(entry: LedgerEntry, winner: Option<LedgerEntry>) -> LedgerResult<RecordOutcome> {
    let existing = winner.ok_or(LedgerError::MissingAfterConflict {
        object_key: entry.object_key,
        object_version: entry.object_version,
    })?;

    Ok(RecordOutcome {
        inserted: false,
        existing,
    })
}
