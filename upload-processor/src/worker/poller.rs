use std::sync::Arc;
use std::time::Duration;

use backend_storage::queue::EventQueue;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::Message;

/// Delays applied after a failed poll
#[derive(Debug, Clone, Copy)]
pub struct PollBackoff {
    /// Delay after a 5xx or unreachable queue
    pub upstream: Duration,
    /// Delay after any other poll failure
    pub other: Duration,
}

impl Default for PollBackoff {
    fn default() -> Self {
        Self {
            upstream: Duration::from_secs(5),
            other: Duration::from_secs(1),
        }
    }
}

/// Long-polls the event queue and feeds messages to the processors
pub struct QueuePoller {
    queue: Arc<dyn EventQueue>,
    sender: flume::Sender<Message>,
    shutdown_token: CancellationToken,
    backoff: PollBackoff,
}

impl QueuePoller {
    /// Creates a new poller
    #[must_use]
    pub fn new(
        queue: Arc<dyn EventQueue>,
        sender: flume::Sender<Message>,
        shutdown_token: CancellationToken,
        backoff: PollBackoff,
    ) -> Self {
        Self {
            queue,
            sender,
            shutdown_token,
            backoff,
        }
    }

    /// Polls until shutdown is requested or every processor has gone away
    pub async fn run(self) {
        info!("Queue poller started");

        while !self.shutdown_token.is_cancelled() {
            let result = tokio::select! {
                () = self.shutdown_token.cancelled() => break,
                result = self.queue.poll_messages() => result,
            };

            match result {
                Ok(messages) => {
                    debug!("Received {} messages", messages.len());
                    for message in messages {
                        if !self.forward(message).await {
                            info!("Queue poller stopped while forwarding");
                            return;
                        }
                    }
                }
                Err(e) => {
                    let delay = if e.is_upstream_error() {
                        warn!(error = %e, "Queue unavailable, backing off");
                        self.backoff.upstream
                    } else {
                        error!(error = %e, "Failed to poll messages");
                        self.backoff.other
                    };

                    tokio::select! {
                        () = self.shutdown_token.cancelled() => break,
                        () = sleep(delay) => {}
                    }
                }
            }
        }

        info!("Queue poller stopped");
    }

    /// Hands a message to the processors; `false` once the worker is stopping
    async fn forward(&self, message: Message) -> bool {
        tokio::select! {
            () = self.shutdown_token.cancelled() => false,
            sent = self.sender.send_async(message) => sent.is_ok(),
        }
    }
}
