//! Configuration management
//!
//! Destinations are optional at load time and validated when a route needs
//! them, so a process that only publishes does not need a queue configured.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("SQS_QUEUE_URL not configured")]
    MissingQueueUrl,

    #[error("SNS_TOPIC_ARN not configured")]
    MissingTopicArn,

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Destinations and AWS client overrides shared by the API and the worker.
///
/// Keys mirror the environment variable names in lower case, so
/// `SQS_QUEUE_URL` in the environment and `sqs_queue_url` in
/// `queueflow.toml` set the same value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagingConfig {
    #[serde(default, rename = "sqs_queue_url")]
    queue_url: Option<String>,

    #[serde(default, rename = "sns_topic_arn")]
    topic_arn: Option<String>,

    #[serde(default, rename = "aws_endpoint_url")]
    endpoint_url: Option<String>,

    #[serde(default, rename = "aws_region")]
    region: Option<String>,
}

impl MessagingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from an optional file and the process environment.
    ///
    /// Without an explicit path, `queueflow.{toml,json,yaml}` in the working
    /// directory is used when present.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(file, ::config::Environment::default())
    }

    fn load_from(file: Option<&Path>, env: ::config::Environment) -> Result<Self, ConfigError> {
        let builder = match file {
            Some(path) => {
                ::config::Config::builder().add_source(::config::File::from(path).required(true))
            }
            None => ::config::Config::builder()
                .add_source(::config::File::with_name("queueflow").required(false)),
        };

        let config = builder.add_source(env).build()?;
        let loaded = config.try_deserialize::<MessagingConfig>()?.normalized();

        debug!(
            queue_configured = loaded.queue_url.is_some(),
            topic_configured = loaded.topic_arn.is_some(),
            endpoint = ?loaded.endpoint_url,
            "Loaded messaging configuration"
        );

        Ok(loaded)
    }

    pub fn with_queue_url(mut self, queue_url: impl Into<String>) -> Self {
        self.queue_url = Some(queue_url.into());
        self.normalized()
    }

    pub fn with_topic_arn(mut self, topic_arn: impl Into<String>) -> Self {
        self.topic_arn = Some(topic_arn.into());
        self.normalized()
    }

    /// Queue URL, or a typed error if the queue is not configured
    pub fn queue_url(&self) -> Result<&str, ConfigError> {
        self.queue_url.as_deref().ok_or(ConfigError::MissingQueueUrl)
    }

    /// Topic ARN, or a typed error if the topic is not configured
    pub fn topic_arn(&self) -> Result<&str, ConfigError> {
        self.topic_arn.as_deref().ok_or(ConfigError::MissingTopicArn)
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint_url.as_deref()
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    /// Build the shared AWS SDK configuration, applying endpoint and region
    /// overrides on top of the default provider chain.
    pub async fn aws_sdk_config(&self) -> aws_config::SdkConfig {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = self.region() {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        if let Some(endpoint) = self.endpoint_url() {
            loader = loader.endpoint_url(endpoint);
        }

        loader.load().await
    }

    // Blank values behave exactly like unset ones.
    fn normalized(self) -> Self {
        Self {
            queue_url: non_blank(self.queue_url),
            topic_arn: non_blank(self.topic_arn),
            endpoint_url: non_blank(self.endpoint_url),
            region: non_blank(self.region),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
