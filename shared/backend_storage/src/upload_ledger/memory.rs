use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{IdempotencyLedger, LedgerEntry, LedgerResult, RecordOutcome};

/// In-process ledger with the same conditional-insert semantics as
/// [`super::DynamoDbLedger`]
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    entries: Mutex<HashMap<(String, String), LedgerEntry>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded entries
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().expect("ledger lock poisoned").len()
    }

    /// Whether nothing was recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl IdempotencyLedger for InMemoryLedger {
    async fn lookup(
        &self,
        object_key: &str,
        object_version: &str,
    ) -> LedgerResult<Option<LedgerEntry>> {
        let entries = self.entries.lock().expect("ledger lock poisoned");
        Ok(entries
            .get(&(object_key.to_string(), object_version.to_string()))
            .cloned())
    }

    async fn record_if_absent(&self, entry: LedgerEntry) -> LedgerResult<RecordOutcome> {
        let mut entries = self.entries.lock().expect("ledger lock poisoned");
        let key = (entry.object_key.clone(), entry.object_version.clone());

        if let Some(existing) = entries.get(&key) {
            return Ok(RecordOutcome {
                inserted: false,
                existing: existing.clone(),
            });
        }

        entries.insert(key, entry.clone());
        Ok(RecordOutcome {
            inserted: true,
            existing: entry,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use common_types::{ProcessingResult, ProcessingStatus};
    use futures::future::join_all;

    use super::*;

    #[tokio::test]
    async fn test_record_if_absent_keeps_first_writer() {
        let ledger = InMemoryLedger::new();
        let first = LedgerEntry::new(
            ProcessingResult::success("uploads/a", "v1", "image/png", "aa"),
            TimeDelta::days(1),
        );
        let second = LedgerEntry::new(
            ProcessingResult::failed("uploads/a", "v1", "boom"),
            TimeDelta::days(1),
        );

        let outcome = ledger.record_if_absent(first.clone()).await.unwrap();
        assert!(outcome.inserted);

        let outcome = ledger.record_if_absent(second).await.unwrap();
        assert!(!outcome.inserted);
        assert_eq!(outcome.existing, first);
        assert_eq!(ledger.len(), 1);

        let found = ledger.lookup("uploads/a", "v1").await.unwrap();
        assert_eq!(found.map(|e| e.status), Some(ProcessingStatus::Success));
        assert!(ledger.lookup("uploads/a", "v2").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_have_one_winner() {
        let ledger = Arc::new(InMemoryLedger::new());

        let attempts = (0..16).map(|i| {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move {
                let entry = LedgerEntry::new(
                    ProcessingResult::failed("uploads/a", "v1", format!("attempt {i}")),
                    TimeDelta::days(1),
                );
                ledger.record_if_absent(entry).await.unwrap()
            })
        });

        let outcomes: Vec<RecordOutcome> = join_all(attempts)
            .await
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(outcomes.iter().filter(|o| o.inserted).count(), 1);
        let winner = &outcomes.iter().find(|o| o.inserted).unwrap().existing;
        assert!(outcomes.iter().all(|o| &o.existing == winner));
    }
}
