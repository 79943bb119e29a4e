//! In-memory queue with SQS lease semantics

use async_trait::async_trait;
use dashmap::DashMap;
use queueflow_core::MessageAttributes;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::info;

use crate::client::{QueueClient, QueueError, ReceiveOptions, ReceivedMessage};

#[derive(Debug, Clone)]
pub struct Queue {
    pub name: String,
    pub url: String,
}

impl Queue {
    pub fn new(name: String) -> Self {
        Self {
            url: format!("http://localhost:4566/000000000000/{name}"),
            name,
        }
    }
}

#[derive(Debug)]
struct StoredMessage {
    message_id: String,
    body: String,
    attributes: MessageAttributes,
    /// Handle of the current lease, if the message has ever been received
    receipt_handle: Option<String>,
    receive_count: u32,
    visible_at: Instant,
}

/// Queue service kept in process memory.
///
/// Received messages stay in the queue, hidden until their visibility timeout
/// elapses; only `delete_message` with the current receipt handle removes
/// them.
#[derive(Debug, Default)]
pub struct InMemoryQueue {
    queues: DashMap<String, Queue>,
    messages: DashMap<String, VecDeque<StoredMessage>>,
    arrivals: Notify,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a queue, or return the existing one with the same name
    pub fn create_queue(&self, name: &str) -> Queue {
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| {
                let queue = Queue::new(name.to_string());
                info!(name = %name, url = %queue.url, "Creating queue");
                self.messages.insert(name.to_string(), VecDeque::new());
                queue
            })
            .clone()
    }

    pub fn delete_queue(&self, queue_url: &str) -> Result<(), QueueError> {
        let name = queue_name(queue_url);
        if self.queues.remove(name).is_none() {
            return Err(QueueError::QueueNotFound(name.to_string()));
        }

        info!(name = %name, "Deleting queue");
        self.messages.remove(name);
        Ok(())
    }

    /// Number of stored messages, visible or leased
    pub fn len(&self, queue_url: &str) -> usize {
        self.messages
            .get(queue_name(queue_url))
            .map_or(0, |msgs| msgs.len())
    }

    pub fn is_empty(&self, queue_url: &str) -> bool {
        self.len(queue_url) == 0
    }

    /// Number of messages currently leased to a receiver
    pub fn in_flight(&self, queue_url: &str) -> usize {
        let now = Instant::now();
        self.messages
            .get(queue_name(queue_url))
            .map_or(0, |msgs| msgs.iter().filter(|m| m.visible_at > now).count())
    }

    fn ensure_exists(&self, name: &str) -> Result<(), QueueError> {
        if self.queues.contains_key(name) {
            Ok(())
        } else {
            Err(QueueError::QueueNotFound(name.to_string()))
        }
    }

    fn lease_visible(
        &self,
        name: &str,
        max_messages: i32,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let mut messages = self
            .messages
            .get_mut(name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?;

        let now = Instant::now();
        let max = usize::try_from(max_messages.clamp(1, 10)).unwrap_or(1);

        let batch = messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max)
            .map(|msg| {
                let receipt_handle = uuid::Uuid::new_v4().to_string();
                msg.receive_count += 1;
                msg.visible_at = now + visibility_timeout;
                msg.receipt_handle = Some(receipt_handle.clone());

                ReceivedMessage {
                    message_id: msg.message_id.clone(),
                    receipt_handle,
                    body: msg.body.clone(),
                    attributes: msg.attributes.clone(),
                    receive_count: msg.receive_count,
                }
            })
            .collect();

        Ok(batch)
    }

    /// Earliest moment a currently leased message becomes visible again
    fn next_visible_at(&self, name: &str) -> Option<Instant> {
        let now = Instant::now();
        self.messages.get(name).and_then(|msgs| {
            msgs.iter()
                .map(|m| m.visible_at)
                .filter(|at| *at > now)
                .min()
        })
    }
}

/// The queue name is the last path segment of its URL
fn queue_name(queue_url: &str) -> &str {
    queue_url.split('/').next_back().unwrap_or(queue_url)
}

#[async_trait]
impl QueueClient for InMemoryQueue {
    async fn send_message(
        &self,
        queue_url: &str,
        body: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, QueueError> {
        let name = queue_name(queue_url);
        self.ensure_exists(name)?;

        let message_id = uuid::Uuid::new_v4().to_string();
        self.messages
            .get_mut(name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?
            .push_back(StoredMessage {
                message_id: message_id.clone(),
                body: body.to_string(),
                attributes: attributes.clone(),
                receipt_handle: None,
                receive_count: 0,
                visible_at: Instant::now(),
            });
        self.arrivals.notify_waiters();

        info!(queue = %name, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let name = queue_name(queue_url);
        self.ensure_exists(name)?;

        let deadline = Instant::now() + options.wait_time;
        loop {
            // Registered before checking so a send in between still wakes us
            let arrival = self.arrivals.notified();

            let batch = self.lease_visible(name, options.max_messages, options.visibility_timeout)?;
            if !batch.is_empty() || Instant::now() >= deadline {
                info!(queue = %name, count = batch.len(), "Received messages");
                return Ok(batch);
            }

            let wake_at = self
                .next_visible_at(name)
                .map_or(deadline, |at| at.min(deadline));

            tokio::select! {
                () = arrival => {}
                () = tokio::time::sleep_until(wake_at) => {}
            }
        }
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        let name = queue_name(queue_url);
        let mut messages = self
            .messages
            .get_mut(name)
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?;

        let position = messages
            .iter()
            .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
            .ok_or_else(|| QueueError::ReceiptHandleInvalid(receipt_handle.to_string()))?;

        if let Some(message) = messages.remove(position) {
            info!(
                queue = %name,
                message_id = %message.message_id,
                receive_count = message.receive_count,
                "Deleted message"
            );
        }
        Ok(())
    }
}
