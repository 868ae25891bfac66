use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{ObjectReadError, ObjectReadResult, ObjectReader, StoredObject};

/// Object store kept in memory, keyed by object key
///
/// Versions are ignored: every read returns the latest object put under a key.
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    unavailable_reads: AtomicUsize,
    reads: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    pub fn put(&self, key: &str, bytes: Vec<u8>, content_type: Option<&str>) {
        self.objects.lock().expect("object store lock poisoned").insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.map(ToString::to_string),
            },
        );
    }

    /// Makes the next `count` reads fail with `ObjectReadError::Unavailable`
    pub fn fail_next_reads(&self, count: usize) {
        self.unavailable_reads.store(count, Ordering::SeqCst);
    }

    /// Number of reads served so far, failed ones included
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectReader for InMemoryObjectStore {
    async fn read(
        &self,
        key: &str,
        _version: &str,
        byte_limit: u64,
    ) -> ObjectReadResult<StoredObject> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .unavailable_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(ObjectReadError::Unavailable("store unreachable".to_string()));
        }

        self.objects
            .lock()
            .expect("object store lock poisoned")
            .get(key)
            .map(|object| {
                let limit = usize::try_from(byte_limit).unwrap_or(usize::MAX);
                StoredObject {
                    bytes: object.bytes.iter().take(limit).copied().collect(),
                    content_type: object.content_type.clone(),
                }
            })
            .ok_or_else(|| ObjectReadError::NotFound(key.to_string()))
    }
}
