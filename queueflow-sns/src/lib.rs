//! Topic client adapter for QueueFlow
//!
//! Provides the [`TopicClient`] seam used by the messaging API to publish a
//! message with string-typed attributes. [`SnsTopicClient`] talks to Amazon
//! SNS; [`InMemoryTopic`] records published messages in process memory.

mod client;
mod memory;
mod sdk;

pub use client::{TopicClient, TopicError};
pub use memory::{InMemoryTopic, PublishedMessage, Topic};
pub use sdk::SnsTopicClient;
