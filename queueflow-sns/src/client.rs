//! Topic client trait

use async_trait::async_trait;
use queueflow_core::MessageAttributes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopicError {
    #[error("Topic does not exist: {0}")]
    TopicNotFound(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("SNS service error: {0}")]
    Service(String),
}

/// Broadcast destination operations
#[async_trait]
pub trait TopicClient: Send + Sync {
    /// Publish a message and return the service-assigned message id
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, TopicError>;
}
