//! API error types and status mapping

use thiserror::Error;

use crate::config::ConfigError;
use crate::envelope::{ApiResponse, Envelope};
use crate::payload::PayloadError;

/// Errors the router reports to the caller.
///
/// The display text is what the caller sees; wrapped sources are for logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid JSON. Example: {{\"message\":\"hello\"}}")]
    MalformedBody(#[source] PayloadError),

    #[error("required field missing: {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    NotConfigured(#[from] ConfigError),

    #[error("Not Found")]
    NotFound,
}

impl ApiError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::MalformedBody(_) | Self::MissingField(_) => 400,
            Self::NotFound => 404,
            Self::NotConfigured(_) => 500,
        }
    }

    pub fn to_response(&self) -> ApiResponse {
        ApiResponse::new(self.http_status(), Envelope::error(self.to_string()))
    }
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        Self::MalformedBody(err)
    }
}
