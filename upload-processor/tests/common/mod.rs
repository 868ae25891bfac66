// Not every helper is used in every test, so we allow dead code
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_sqs::error::SdkError;
use backend_storage::{
    notification::RecordingDispatcher,
    queue::{EventQueue, QueueError, QueueMessage, QueueResult},
    upload_ledger::{
        IdempotencyLedger, InMemoryLedger, LedgerEntry, LedgerError, LedgerResult, RecordOutcome,
    },
};
use chrono::{DateTime, TimeDelta, Utc};
use common_types::{StorageEvent, UploadKey, UploadPolicy};
use upload_processor::{
    content::ContentProcessor,
    object_reader::InMemoryObjectStore,
    processor::{ProcessorConfig, UploadProcessor},
};

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n%%EOF\n";
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
pub const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10, b'J', b'F', b'I', b'F'];

/// Upload processor wired to in-memory collaborators
pub struct TestHarness {
    pub policy: UploadPolicy,
    pub ledger: Arc<ScriptedLedger>,
    pub dispatcher: Arc<RecordingDispatcher>,
    pub objects: Arc<InMemoryObjectStore>,
    pub processor: Arc<UploadProcessor>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::build(UploadPolicy::default(), None)
    }

    pub fn with_policy(policy: UploadPolicy) -> Self {
        Self::build(policy, None)
    }

    pub fn with_content_processor(content: Arc<dyn ContentProcessor>) -> Self {
        Self::build(UploadPolicy::default(), Some(content))
    }

    fn build(policy: UploadPolicy, content: Option<Arc<dyn ContentProcessor>>) -> Self {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();

        let ledger = Arc::new(ScriptedLedger::new());
        let dispatcher = Arc::new(RecordingDispatcher::new());
        let objects = Arc::new(InMemoryObjectStore::new());

        let mut processor = UploadProcessor::new(
            ProcessorConfig {
                policy: policy.clone(),
                ledger_retention: TimeDelta::days(90),
            },
            ledger.clone(),
            dispatcher.clone(),
            objects.clone(),
        );
        if let Some(content) = content {
            processor = processor.with_content_processor(content);
        }

        Self {
            policy,
            ledger,
            dispatcher,
            objects,
            processor: Arc::new(processor),
        }
    }

    /// Key as the credential issuer would derive it
    pub fn issue_key(&self, file_name: &str, issued_at: DateTime<Utc>) -> String {
        UploadKey::generate(&self.policy.key_prefix, "user-42", file_name, issued_at)
            .unwrap()
            .to_string()
    }

    /// Puts an object under a freshly issued key and returns the matching event
    pub fn upload(&self, file_name: &str, bytes: &[u8], content_type: &str) -> StorageEvent {
        let key = self.issue_key(file_name, Utc::now());
        self.objects.put(&key, bytes.to_vec(), Some(content_type));
        storage_event(&key, bytes.len() as u64, Utc::now())
    }
}

pub fn storage_event(key: &str, size_bytes: u64, event_time: DateTime<Utc>) -> StorageEvent {
    StorageEvent {
        object_key: key.to_string(),
        object_version: uuid::Uuid::new_v4().simple().to_string(),
        size_bytes,
        event_time,
        delivery_id: uuid::Uuid::new_v4().to_string(),
    }
}

/// Same event, delivered again
pub fn redelivery(event: &StorageEvent) -> StorageEvent {
    StorageEvent {
        delivery_id: uuid::Uuid::new_v4().to_string(),
        ..event.clone()
    }
}

/// In-memory ledger whose next reads or writes can be made to time out
#[derive(Default)]
pub struct ScriptedLedger {
    inner: InMemoryLedger,
    failing_lookups: AtomicUsize,
    failing_records: AtomicUsize,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_lookups(&self, count: usize) {
        self.failing_lookups.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_records(&self, count: usize) {
        self.failing_records.store(count, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl IdempotencyLedger for ScriptedLedger {
    async fn lookup(
        &self,
        object_key: &str,
        object_version: &str,
    ) -> LedgerResult<Option<LedgerEntry>> {
        if Self::take_failure(&self.failing_lookups) {
            return Err(LedgerError::DynamoDbGetError(
                aws_sdk_dynamodb::error::SdkError::timeout_error("get_item timed out"),
            ));
        }
        self.inner.lookup(object_key, object_version).await
    }

    async fn record_if_absent(&self, entry: LedgerEntry) -> LedgerResult<RecordOutcome> {
        if Self::take_failure(&self.failing_records) {
            return Err(LedgerError::DynamoDbPutError(
                aws_sdk_dynamodb::error::SdkError::timeout_error("put_item timed out"),
            ));
        }
        self.inner.record_if_absent(entry).await
    }
}

/// Event queue that serves scripted batches and records acknowledgements
#[derive(Default)]
pub struct ScriptedQueue {
    batches: Mutex<VecDeque<QueueResult<Vec<QueueMessage<Vec<StorageEvent>>>>>>,
    acked: Mutex<Vec<String>>,
}

impl ScriptedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_batch(&self, messages: Vec<QueueMessage<Vec<StorageEvent>>>) {
        self.batches.lock().unwrap().push_back(Ok(messages));
    }

    /// Queues a poll that times out before reaching the queue
    pub fn push_error(&self, message: &str) {
        self.batches
            .lock()
            .unwrap()
            .push_back(Err(QueueError::ReceiveMessage(SdkError::timeout_error(
                message.to_string(),
            ))));
    }

    pub fn acked(&self) -> Vec<String> {
        self.acked.lock().unwrap().clone()
    }

    pub fn remaining_batches(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl EventQueue for ScriptedQueue {
    async fn poll_messages(&self) -> QueueResult<Vec<QueueMessage<Vec<StorageEvent>>>> {
        let next = self.batches.lock().unwrap().pop_front();
        match next {
            Some(batch) => batch,
            None => {
                // Empty long poll
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn ack_message(&self, receipt_handle: &str) -> QueueResult<()> {
        self.acked.lock().unwrap().push(receipt_handle.to_string());
        Ok(())
    }
}

pub fn queue_message(receipt_handle: &str, events: Vec<StorageEvent>) -> QueueMessage<Vec<StorageEvent>> {
    QueueMessage {
        body: events,
        receipt_handle: receipt_handle.to_string(),
        message_id: format!("msg-{receipt_handle}"),
    }
}

/// Waits until `condition` holds, panicking after two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
