//! Amazon SQS backed queue client

use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::{Message, MessageAttributeValue, MessageSystemAttributeName};
use aws_sdk_sqs::Client;
use queueflow_core::MessageAttributes;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

use crate::client::{QueueClient, QueueError, ReceiveOptions, ReceivedMessage};

/// [`QueueClient`] over the AWS SDK
#[derive(Debug, Clone)]
pub struct SqsQueueClient {
    client: Client,
}

impl SqsQueueClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_conf(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(Client::new(sdk_config))
    }
}

#[async_trait]
impl QueueClient for SqsQueueClient {
    async fn send_message(
        &self,
        queue_url: &str,
        body: &str,
        attributes: &MessageAttributes,
    ) -> Result<String, QueueError> {
        let mut request = self
            .client
            .send_message()
            .queue_url(queue_url)
            .message_body(body);

        if !attributes.is_empty() {
            request = request.set_message_attributes(Some(string_attributes(attributes)?));
        }

        let output = request.send().await.map_err(service_error)?;
        let message_id = output.message_id().map(str::to_string).ok_or_else(|| {
            QueueError::Service("SendMessage response did not include a message id".to_string())
        })?;

        info!(queue = %queue_url, message_id = %message_id, "Sent message");
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(options.max_messages)
            .wait_time_seconds(whole_seconds(options.wait_time))
            .visibility_timeout(whole_seconds(options.visibility_timeout))
            .message_attribute_names("All")
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(service_error)?;

        let messages: Vec<ReceivedMessage> =
            output.messages().iter().map(received_message).collect();

        debug!(queue = %queue_url, count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(service_error)?;

        Ok(())
    }
}

fn string_attributes(
    attributes: &MessageAttributes,
) -> Result<HashMap<String, MessageAttributeValue>, QueueError> {
    attributes
        .iter()
        .map(|(name, value)| {
            let value = MessageAttributeValue::builder()
                .data_type("String")
                .string_value(value)
                .build()
                .map_err(|e| QueueError::InvalidParameter(e.to_string()))?;
            Ok((name.clone(), value))
        })
        .collect()
}

fn received_message(message: &Message) -> ReceivedMessage {
    let attributes = message
        .message_attributes()
        .map(|attrs| {
            attrs
                .iter()
                .filter_map(|(name, value)| {
                    value
                        .string_value()
                        .map(|v| (name.clone(), v.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let receive_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount))
        .and_then(|count| count.parse().ok())
        .unwrap_or(0);

    ReceivedMessage {
        message_id: message.message_id().unwrap_or_default().to_string(),
        receipt_handle: message.receipt_handle().unwrap_or_default().to_string(),
        body: message.body().unwrap_or_default().to_string(),
        attributes,
        receive_count,
    }
}

fn whole_seconds(duration: Duration) -> i32 {
    i32::try_from(duration.as_secs()).unwrap_or(i32::MAX)
}

fn service_error<E>(err: E) -> QueueError
where
    E: std::error::Error + 'static,
{
    QueueError::Service(DisplayErrorContext(err).to_string())
}
