//! JSON response envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Service name reported by the status route
pub const SERVICE_NAME: &str = "queueflow-messaging-api";

/// Content type of every response
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Body of every response. `ok` is always present; the other fields depend on
/// the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub ok: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl Envelope {
    fn empty(ok: bool) -> Self {
        Self {
            ok,
            error: None,
            message_id: None,
            service: None,
            time: None,
        }
    }

    /// Health response
    pub fn status(time: DateTime<Utc>) -> Self {
        Self {
            service: Some(SERVICE_NAME.to_string()),
            time: Some(time),
            ..Self::empty(true)
        }
    }

    /// A message was accepted by the queue or topic
    pub fn accepted(message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..Self::empty(true)
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::empty(false)
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"ok":{},"error":"response serialization failed"}}"#,
                self.ok
            )
        })
    }
}

/// Host-independent response: an HTTP status plus the envelope
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub envelope: Envelope,
}

impl ApiResponse {
    pub fn new(status: u16, envelope: Envelope) -> Self {
        Self { status, envelope }
    }

    pub fn ok(envelope: Envelope) -> Self {
        Self::new(200, envelope)
    }

    pub fn body(&self) -> String {
        self.envelope.to_json()
    }
}
