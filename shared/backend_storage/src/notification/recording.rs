use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use common_types::ProcessingResult;

use super::{Ack, DispatchError, DispatchResult, NotificationDispatcher};

/// Dispatcher that keeps published results in memory and can be switched
/// into a failing state
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    published: Mutex<Vec<ProcessingResult>>,
    failing: AtomicBool,
}

impl RecordingDispatcher {
    /// Creates a dispatcher that accepts every publish
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent publishes fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Results published so far, in publish order
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned
    #[must_use]
    pub fn published(&self) -> Vec<ProcessingResult> {
        self.published
            .lock()
            .expect("dispatcher lock poisoned")
            .clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn publish(&self, result: &ProcessingResult) -> DispatchResult<Ack> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::Unavailable("topic unreachable".to_string()));
        }

        let mut published = self.published.lock().expect("dispatcher lock poisoned");
        published.push(result.clone());

        Ok(Ack {
            message_id: Some(format!("msg-{}", published.len())),
        })
    }
}
