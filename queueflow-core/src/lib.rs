//! Core types for QueueFlow
//!
//! This crate provides the pieces shared by the messaging API and the queue
//! worker: the request payload, the response envelope, the API error
//! taxonomy, configuration loading, and process plumbing (logging setup and
//! shutdown signals).

pub mod config;
pub mod envelope;
pub mod error;
pub mod logging;
pub mod payload;
pub mod shutdown;

pub use self::config::{ConfigError, MessagingConfig};
pub use envelope::{ApiResponse, Envelope, CONTENT_TYPE_JSON, SERVICE_NAME};
pub use error::ApiError;
pub use payload::{MessageAttributes, Payload, PayloadError};
