//! Queue client adapter for QueueFlow
//!
//! Provides the [`QueueClient`] seam used by the messaging API and the worker:
//! - SendMessage with string-typed message attributes
//! - ReceiveMessage with long polling and a visibility timeout
//! - DeleteMessage by receipt handle
//!
//! [`SqsQueueClient`] talks to Amazon SQS; [`InMemoryQueue`] keeps queues in
//! process memory with the same lease semantics.

mod client;
mod memory;
mod sdk;

pub use client::{QueueClient, QueueError, ReceiveOptions, ReceivedMessage};
pub use memory::{InMemoryQueue, Queue};
pub use sdk::SqsQueueClient;
