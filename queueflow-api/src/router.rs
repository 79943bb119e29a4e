//! Request routing by method and path suffix

use axum::http::Method;
use bytes::Bytes;
use chrono::Utc;
use queueflow_core::{
    ApiError, ApiResponse, ConfigError, Envelope, MessagingConfig, Payload, PayloadError,
};
use queueflow_sns::{TopicClient, TopicError};
use queueflow_sqs::{QueueClient, QueueError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Failures of the downstream queue or topic call.
///
/// These are not answered by the router itself; the host turns them into a
/// 500 response.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to enqueue message: {0}")]
    Queue(#[from] QueueError),

    #[error("Failed to publish message: {0}")]
    Topic(#[from] TopicError),
}

impl DispatchError {
    pub fn to_response(&self) -> ApiResponse {
        ApiResponse::new(500, Envelope::error("Internal Server Error"))
    }
}

/// A request as seen by the router, independent of the host
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// Body bytes as received; checked for UTF-8 when parsed
    pub body: Option<Bytes>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>, body: Option<String>) -> Self {
        Self::with_raw_body(method, path, body.map(Bytes::from))
    }

    pub fn with_raw_body(method: Method, path: impl Into<String>, body: Option<Bytes>) -> Self {
        Self {
            method,
            path: path.into(),
            body,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Status,
    Enqueue,
    Publish,
    Unmatched,
}

impl Action {
    fn resolve(method: &Method, path: &str) -> Self {
        if *method == Method::GET && path.ends_with("/status") {
            Self::Status
        } else if *method == Method::POST && path.ends_with("/enqueue") {
            Self::Enqueue
        } else if *method == Method::POST && path.ends_with("/publish") {
            Self::Publish
        } else {
            Self::Unmatched
        }
    }
}

enum Rejection {
    Api(ApiError),
    Dispatch(DispatchError),
}

impl From<ApiError> for Rejection {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

impl From<PayloadError> for Rejection {
    fn from(err: PayloadError) -> Self {
        Self::Api(err.into())
    }
}

impl From<ConfigError> for Rejection {
    fn from(err: ConfigError) -> Self {
        Self::Api(err.into())
    }
}

impl From<QueueError> for Rejection {
    fn from(err: QueueError) -> Self {
        Self::Dispatch(err.into())
    }
}

impl From<TopicError> for Rejection {
    fn from(err: TopicError) -> Self {
        Self::Dispatch(err.into())
    }
}

/// The messaging API: immutable after construction, shared across requests
pub struct MessagingApi {
    config: MessagingConfig,
    queue: Arc<dyn QueueClient>,
    topic: Arc<dyn TopicClient>,
}

impl MessagingApi {
    pub fn new(
        config: MessagingConfig,
        queue: Arc<dyn QueueClient>,
        topic: Arc<dyn TopicClient>,
    ) -> Self {
        Self {
            config,
            queue,
            topic,
        }
    }

    /// Produce exactly one response for a request.
    ///
    /// Validation and configuration problems become error envelopes; only a
    /// failed send or publish is returned as `Err`.
    pub async fn handle(&self, request: &ApiRequest) -> Result<ApiResponse, DispatchError> {
        let action = Action::resolve(&request.method, &request.path);

        let response = match self.route(action, request.body.as_deref()).await {
            Ok(response) => response,
            Err(Rejection::Api(err)) => {
                match &err {
                    ApiError::MalformedBody(cause) => {
                        warn!(path = %request.path, cause = %cause, "Rejected malformed body");
                    }
                    other => warn!(path = %request.path, error = %other, "Rejected request"),
                }
                err.to_response()
            }
            Err(Rejection::Dispatch(err)) => return Err(err),
        };

        info!(
            method = %request.method,
            path = %request.path,
            status = response.status,
            "Handled request"
        );
        Ok(response)
    }

    async fn route(&self, action: Action, body: Option<&[u8]>) -> Result<ApiResponse, Rejection> {
        match action {
            // Status never looks at the body
            Action::Status => Ok(ApiResponse::ok(Envelope::status(Utc::now()))),
            Action::Enqueue => {
                let payload = Payload::from_slice(body)?;
                let message = required_message(&payload)?;
                let queue_url = self.config.queue_url()?;

                let message_id = self
                    .queue
                    .send_message(queue_url, message, &payload.attributes)
                    .await?;
                Ok(ApiResponse::ok(Envelope::accepted(message_id)))
            }
            Action::Publish => {
                let payload = Payload::from_slice(body)?;
                let message = required_message(&payload)?;
                let topic_arn = self.config.topic_arn()?;

                let message_id = self
                    .topic
                    .publish(topic_arn, message, &payload.attributes)
                    .await?;
                Ok(ApiResponse::ok(Envelope::accepted(message_id)))
            }
            Action::Unmatched => {
                // A malformed body is reported even when nothing matches
                Payload::from_slice(body)?;
                Err(ApiError::NotFound.into())
            }
        }
    }
}

fn required_message(payload: &Payload) -> Result<&str, ApiError> {
    payload.message().ok_or(ApiError::MissingField("message"))
}
