//! In-memory topics

use async_trait::async_trait;
use dashmap::DashMap;
use queueflow_core::MessageAttributes;
use tracing::info;

use crate::client::{TopicClient, TopicError};

#[derive(Debug, Clone)]
pub struct Topic {
    pub name: String,
    pub arn: String,
}

impl Topic {
    pub fn new(name: String) -> Self {
        Self {
            arn: format!("arn:aws:sns:us-east-1:000000000000:{name}"),
            name,
        }
    }
}

/// A message accepted by [`InMemoryTopic::publish`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub message_id: String,
    pub message: String,
    pub attributes: MessageAttributes,
}

/// Topic service kept in process memory; every publish is recorded in order.
#[derive(Debug, Default)]
pub struct InMemoryTopic {
    topics: DashMap<String, Topic>,
    published: DashMap<String, Vec<PublishedMessage>>,
}

impl InMemoryTopic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a topic, or return the existing one with the same name
    pub fn create_topic(&self, name: &str) -> Topic {
        self.topics
            .entry(name.to_string())
            .or_insert_with(|| {
                let topic = Topic::new(name.to_string());
                info!(name = %name, arn = %topic.arn, "Creating topic");
                self.published.insert(name.to_string(), Vec::new());
                topic
            })
            .clone()
    }

    pub fn delete_topic(&self, topic_arn: &str) -> Result<(), TopicError> {
        let name = topic_name(topic_arn);
        if self.topics.remove(name).is_none() {
            return Err(TopicError::TopicNotFound(name.to_string()));
        }

        info!(name = %name, "Deleting topic");
        self.published.remove(name);
        Ok(())
    }

    /// Messages published to a topic so far, oldest first
    pub fn published(&self, topic_arn: &str) -> Vec<PublishedMessage> {
        self.published
            .get(topic_name(topic_arn))
            .map(|msgs| msgs.clone())
            .unwrap_or_default()
    }
}

/// The topic name is the last `:` segment of its ARN
fn topic_name(topic_arn: &str) -> &str {
    topic_arn.split(':').next_back().unwrap_or(topic_arn)
}

#[async_trait]
impl TopicClient for InMemoryTopic {
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, TopicError> {
        let name = topic_name(topic_arn);
        let mut published = self
            .published
            .get_mut(name)
            .ok_or_else(|| TopicError::TopicNotFound(name.to_string()))?;

        let message_id = uuid::Uuid::new_v4().to_string();
        published.push(PublishedMessage {
            message_id: message_id.clone(),
            message: message.to_string(),
            attributes: attributes.clone(),
        });

        info!(topic = %name, message_id = %message_id, "Published message");
        Ok(message_id)
    }
}
