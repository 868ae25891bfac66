use std::sync::Arc;

use backend_storage::queue::EventQueue;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::Message;
use crate::processor::UploadProcessor;

/// `MessageProcessor` runs storage events through the upload processor and
/// acknowledges the messages that carried them
pub struct MessageProcessor {
    worker_id: usize,
    queue: Arc<dyn EventQueue>,
    processor: Arc<UploadProcessor>,
}

impl MessageProcessor {
    /// Creates a new `MessageProcessor`
    #[must_use]
    pub fn new(worker_id: usize, queue: Arc<dyn EventQueue>, processor: Arc<UploadProcessor>) -> Self {
        Self {
            worker_id,
            queue,
            processor,
        }
    }

    /// Runs the message processor loop
    ///
    /// A message that has been received is always processed to the end;
    /// shutdown only stops the processor from taking the next one.
    pub async fn run(&self, receiver: flume::Receiver<Message>, shutdown_token: CancellationToken) {
        info!("Message processor {} started", self.worker_id);

        loop {
            tokio::select! {
                () = shutdown_token.cancelled() => {
                    info!("Message processor {} received shutdown signal", self.worker_id);
                    break;
                }
                result = receiver.recv_async() => {
                    match result {
                        Ok(message) => self.process_message(message).await,
                        Err(flume::RecvError::Disconnected) => {
                            info!("Message channel closed for processor {}", self.worker_id);
                            break;
                        }
                    }
                }
            }
        }

        info!("Message processor {} stopped", self.worker_id);
    }

    /// Processes every event in a message and acknowledges it once all of them
    /// have a recorded result
    #[instrument(skip(self, message), fields(worker_id = self.worker_id, message_id = %message.message_id))]
    async fn process_message(&self, message: Message) {
        let mut pending = 0usize;

        for event in &message.body {
            match self.processor.handle_event(event).await {
                Ok(result) => info!(
                    object_key = %result.object_key,
                    status = %result.status,
                    "Storage event handled"
                ),
                Err(e) => {
                    pending += 1;
                    warn!(object_key = %event.object_key, error = %e, "Storage event not handled");
                }
            }
        }

        if pending > 0 {
            info!(pending, "Leaving message for redelivery");
            return;
        }

        if let Err(e) = self.queue.ack_message(&message.receipt_handle).await {
            // The message comes back and is answered from the ledger
            error!(error = %e, "Failed to acknowledge message");
        }
    }
}
