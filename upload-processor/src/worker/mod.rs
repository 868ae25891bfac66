//! SQS-driven worker: one poller feeding a pool of message processors

pub mod message_processor;
pub mod poller;

use std::sync::Arc;

use backend_storage::queue::{EventQueue, QueueMessage};
use common_types::StorageEvent;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::processor::UploadProcessor;

use self::message_processor::MessageProcessor;
pub use self::poller::PollBackoff;
use self::poller::QueuePoller;

/// Message type that flows through the worker pipeline
pub type Message = QueueMessage<Vec<StorageEvent>>;

/// Configuration for the upload worker
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Number of processor tasks to spawn
    pub num_workers: usize,
    /// Capacity of the channel between the poller and the processors
    pub channel_capacity: usize,
    /// Delays applied after failed polls
    pub backoff: PollBackoff,
}

impl WorkerConfig {
    /// Configuration with `num_workers` processors and a channel twice that size
    #[must_use]
    pub fn with_workers(num_workers: usize) -> Self {
        Self {
            num_workers,
            channel_capacity: num_workers * 2,
            backoff: PollBackoff::default(),
        }
    }
}

/// Upload worker that manages queue polling and event processing
pub struct UploadWorker {
    config: WorkerConfig,
    queue: Arc<dyn EventQueue>,
    processor: Arc<UploadProcessor>,
    shutdown_token: CancellationToken,
}

impl UploadWorker {
    /// Creates a new upload worker
    #[must_use]
    pub fn new(
        config: WorkerConfig,
        queue: Arc<dyn EventQueue>,
        processor: Arc<UploadProcessor>,
    ) -> Self {
        Self {
            config,
            queue,
            processor,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Returns a clone of the shutdown token for external control
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs the poller and processors until the shutdown token is cancelled
    pub async fn start(self) {
        info!(
            "Starting upload worker with {} processors",
            self.config.num_workers
        );

        let (message_tx, message_rx) = self.create_message_channel();
        let processor_handles = self.spawn_processors(&message_rx);
        drop(message_rx);

        QueuePoller::new(
            Arc::clone(&self.queue),
            message_tx,
            self.shutdown_token.clone(),
            self.config.backoff,
        )
        .run()
        .await;

        self.shutdown_and_cleanup(processor_handles).await;
    }

    /// Creates and logs the message channel
    fn create_message_channel(&self) -> (flume::Sender<Message>, flume::Receiver<Message>) {
        let capacity = self.config.channel_capacity.max(1);
        let (message_tx, message_rx) = flume::bounded::<Message>(capacity);
        info!("Created flume channel with capacity: {capacity}");
        (message_tx, message_rx)
    }

    /// Stops every component and waits for in-flight messages to finish
    async fn shutdown_and_cleanup(&self, processor_handles: Vec<JoinHandle<()>>) {
        self.shutdown_token.cancel();
        info!("Upload worker shutdown initiated");

        for handle in processor_handles {
            if let Err(e) = handle.await {
                error!("Processor task error: {}", e);
            }
        }
        info!("All upload worker components stopped");
    }

    /// Spawns message processor tasks
    fn spawn_processors(&self, receiver: &flume::Receiver<Message>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        for i in 0..self.config.num_workers {
            let processor =
                MessageProcessor::new(i, Arc::clone(&self.queue), Arc::clone(&self.processor));
            let rx = receiver.clone();
            let shutdown_token = self.shutdown_token.clone();

            let handle = tokio::spawn(async move {
                processor.run(rx, shutdown_token).await;
            });

            handles.push(handle);
        }

        handles
    }
}
