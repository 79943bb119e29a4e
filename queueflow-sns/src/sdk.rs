//! Amazon SNS backed topic client

use async_trait::async_trait;
use aws_sdk_sns::error::DisplayErrorContext;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;
use queueflow_core::MessageAttributes;
use std::collections::HashMap;
use tracing::info;

use crate::client::{TopicClient, TopicError};

/// [`TopicClient`] over the AWS SDK
#[derive(Debug, Clone)]
pub struct SnsTopicClient {
    client: Client,
}

impl SnsTopicClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

#[async_trait]
impl TopicClient for SnsTopicClient {
    async fn publish(
        &self,
        topic_arn: &str,
        message: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, TopicError> {
        let mut request = self.client.publish().topic_arn(topic_arn).message(message);

        if !attributes.is_empty() {
            request = request.set_message_attributes(Some(string_attributes(attributes)?));
        }

        let output = request
            .send()
            .await
            .map_err(|e| TopicError::Service(DisplayErrorContext(e).to_string()))?;
        let message_id = output.message_id().map(str::to_string).ok_or_else(|| {
            TopicError::Service("Publish response did not include a message id".to_string())
        })?;

        info!(topic = %topic_arn, message_id = %message_id, "Published message");
        Ok(message_id)
    }
}

fn string_attributes(
    attributes: &MessageAttributes,
) -> Result<HashMap<String, MessageAttributeValue>, TopicError> {
    attributes
        .iter()
        .map(|(name, value)| {
            let value = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| TopicError::InvalidParameter(e.to_string()))?;
            Ok((name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_attributes_use_string_data_type() {
        let mut attributes = MessageAttributes::new();
        attributes.insert("region".to_string(), "eu".to_string());
        attributes.insert("kind".to_string(), "signup".to_string());

        let converted = string_attributes(&attributes).unwrap();
        assert_eq!(converted.len(), 2);
        for value in converted.values() {
            assert_eq!(value.data_type(), "String");
        }
        assert_eq!(converted["kind"].string_value(), Some("signup"));
    }
}
