//! Receive, log, delete

use queueflow_core::{ConfigError, MessagingConfig};
use queueflow_sqs::{QueueClient, QueueError, ReceiveOptions, ReceivedMessage};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Where to consume from and how each receive call is shaped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerSettings {
    pub queue_url: String,
    pub receive: ReceiveOptions,
}

impl ConsumerSettings {
    pub fn new(queue_url: impl Into<String>) -> Self {
        Self {
            queue_url: queue_url.into(),
            receive: ReceiveOptions::default(),
        }
    }

    /// The queue URL is required here, unlike in the messaging API
    pub fn from_config(config: &MessagingConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.queue_url()?))
    }

    pub fn with_receive(mut self, receive: ReceiveOptions) -> Self {
        self.receive = receive;
        self
    }
}

/// Outcome of one processed batch, by message id
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

impl BatchReport {
    pub fn received(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}

pub struct Consumer {
    queue: Arc<dyn QueueClient>,
    settings: ConsumerSettings,
}

impl Consumer {
    pub fn new(queue: Arc<dyn QueueClient>, settings: ConsumerSettings) -> Self {
        Self { queue, settings }
    }

    /// Poll until `shutdown` is cancelled or a receive fails.
    ///
    /// Cancellation abandons a pending receive but never a batch being
    /// processed; messages leased by an abandoned receive become visible
    /// again after their visibility timeout.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), QueueError> {
        info!(queue = %self.settings.queue_url, "Worker started");

        loop {
            let batch = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                received = self.receive() => received?,
            };

            self.process_batch(batch).await;
        }

        info!(queue = %self.settings.queue_url, "Worker stopped");
        Ok(())
    }

    /// One receive followed by processing of whatever it returned
    pub async fn poll_once(&self) -> Result<BatchReport, QueueError> {
        let batch = self.receive().await?;
        Ok(self.process_batch(batch).await)
    }

    /// Handle messages strictly in order. A failed delete is logged and the
    /// message is left for redelivery.
    pub async fn process_batch(&self, batch: Vec<ReceivedMessage>) -> BatchReport {
        let mut report = BatchReport::default();

        for message in batch {
            info!(
                message_id = %message.message_id,
                body = %message.body,
                receive_count = message.receive_count,
                "Processing message"
            );

            match self
                .queue
                .delete_message(&self.settings.queue_url, &message.receipt_handle)
                .await
            {
                Ok(()) => {
                    info!(message_id = %message.message_id, "Message deleted");
                    report.deleted.push(message.message_id);
                }
                Err(e) => {
                    error!(message_id = %message.message_id, error = %e, "Failed to delete message");
                    report.failed.push(message.message_id);
                }
            }
        }

        report
    }

    async fn receive(&self) -> Result<Vec<ReceivedMessage>, QueueError> {
        self.queue
            .receive_messages(&self.settings.queue_url, &self.settings.receive)
            .await
    }
}
