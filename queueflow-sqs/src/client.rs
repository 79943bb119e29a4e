//! Queue client trait and shared types

use async_trait::async_trait;
use queueflow_core::MessageAttributes;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue does not exist: {0}")]
    QueueNotFound(String),

    #[error("Receipt handle is invalid: {0}")]
    ReceiptHandleInvalid(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("SQS service error: {0}")]
    Service(String),
}

/// Parameters of a single receive call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Upper bound on the batch size (SQS accepts 1 to 10)
    pub max_messages: i32,
    /// How long to wait for a message before returning an empty batch
    pub wait_time: Duration,
    /// How long received messages stay hidden from other receivers
    pub visibility_timeout: Duration,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: 5,
            wait_time: Duration::from_secs(20),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

/// A message leased by a receive call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    /// Valid until the visibility timeout of this lease expires
    pub receipt_handle: String,
    pub body: String,
    pub attributes: MessageAttributes,
    /// How many times the message has been received, this lease included
    pub receive_count: u32,
}

/// Point-to-point queue operations
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Send a message and return the service-assigned message id
    async fn send_message(
        &self,
        queue_url: &str,
        body: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, QueueError>;

    /// Receive up to `options.max_messages` messages
    async fn receive_messages(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Delete a leased message
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str)
        -> Result<(), QueueError>;
}
