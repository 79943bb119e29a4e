//! Request payload parsing

use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// String-typed message attributes forwarded to SQS and SNS
pub type MessageAttributes = HashMap<String, String>;

/// Reasons a request body could not be read as a [`Payload`].
///
/// These never reach the caller verbatim; the router answers with a fixed
/// message and only logs the detail.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Body is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("Body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    #[error("Field '{field}' must be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },
}

/// Body of an enqueue or publish request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    pub message: Option<String>,
    pub attributes: MessageAttributes,
}

impl Payload {
    /// Parse a raw request body; bytes that are not UTF-8 are malformed.
    pub fn from_slice(body: Option<&[u8]>) -> Result<Self, PayloadError> {
        let body = body.map(std::str::from_utf8).transpose()?;
        Self::parse(body)
    }

    /// Parse a request body.
    ///
    /// Field names are matched case-insensitively and unknown fields are
    /// ignored. A missing or blank body, or a literal `null`, yields an empty
    /// payload so that the missing-field check decides the response.
    pub fn parse(body: Option<&str>) -> Result<Self, PayloadError> {
        let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
            return Ok(Self::default());
        };

        let fields = match serde_json::from_str::<Value>(body)? {
            Value::Null => return Ok(Self::default()),
            Value::Object(fields) => fields,
            other => return Err(PayloadError::NotAnObject(json_kind(&other))),
        };

        let mut payload = Self::default();
        for (key, value) in fields {
            if key.eq_ignore_ascii_case("message") {
                payload.message = parse_message(value)?;
            } else if key.eq_ignore_ascii_case("attributes") {
                payload.attributes = parse_attributes(value)?;
            }
        }

        Ok(payload)
    }

    /// The message text, if present and not blank
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.trim().is_empty())
    }
}

fn parse_message(value: Value) -> Result<Option<String>, PayloadError> {
    match value {
        Value::Null => Ok(None),
        Value::String(message) => Ok(Some(message)),
        _ => Err(PayloadError::InvalidField {
            field: "message",
            expected: "a string",
        }),
    }
}

fn parse_attributes(value: Value) -> Result<MessageAttributes, PayloadError> {
    let invalid = || PayloadError::InvalidField {
        field: "attributes",
        expected: "an object of string values",
    };

    match value {
        Value::Null => Ok(MessageAttributes::new()),
        Value::Object(entries) => entries
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(value) => Ok((key, value)),
                _ => Err(invalid()),
            })
            .collect(),
        _ => Err(invalid()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_message_and_attributes() {
        let payload =
            Payload::parse(Some(r#"{"message":"hello","attributes":{"tenant":"acme"}}"#)).unwrap();

        assert_eq!(payload.message(), Some("hello"));
        assert_eq!(payload.attributes.get("tenant").map(String::as_str), Some("acme"));
    }

    #[test]
    fn test_field_names_are_case_insensitive() {
        let payload =
            Payload::parse(Some(r#"{"Message":"hi","ATTRIBUTES":{"Kind":"test"}}"#)).unwrap();

        assert_eq!(payload.message(), Some("hi"));
        // Attribute keys are data, not field names, and keep their case
        assert!(payload.attributes.contains_key("Kind"));
    }

    #[test]
    fn test_empty_bodies_yield_empty_payload() {
        for body in [None, Some(""), Some("  \n"), Some("null"), Some("{}")] {
            let payload = Payload::parse(body).unwrap();
            assert_eq!(payload, Payload::default(), "body: {body:?}");
        }
    }

    #[test]
    fn test_blank_message_is_missing() {
        let payload = Payload::parse(Some(r#"{"message":"   "}"#)).unwrap();
        assert_eq!(payload.message(), None);

        let payload = Payload::parse(Some(r#"{"message":null,"attributes":null}"#)).unwrap();
        assert_eq!(payload.message(), None);
        assert!(payload.attributes.is_empty());
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let payload = Payload::parse(Some(r#"{"message":"x","priority":7}"#)).unwrap();
        assert_eq!(payload.message(), Some("x"));
    }

    #[test]
    fn test_malformed_json() {
        let result = Payload::parse(Some(r#"{"message": "unterminated"#));
        assert!(matches!(result, Err(PayloadError::Json(_))));
    }

    #[test]
    fn test_raw_body_must_be_utf8() {
        let result = Payload::from_slice(Some(b"{\"message\":\"caf\xff\"}".as_slice()));
        assert!(matches!(result, Err(PayloadError::NotUtf8(_))));

        let payload = Payload::from_slice(Some("{\"message\":\"café\"}".as_bytes())).unwrap();
        assert_eq!(payload.message(), Some("café"));
        assert_eq!(Payload::from_slice(None).unwrap(), Payload::default());
    }

    #[test]
    fn test_non_object_body() {
        assert!(matches!(
            Payload::parse(Some("[1, 2]")),
            Err(PayloadError::NotAnObject("an array"))
        ));
        assert!(matches!(
            Payload::parse(Some(r#""hello""#)),
            Err(PayloadError::NotAnObject("a string"))
        ));
    }

    #[test]
    fn test_wrongly_typed_fields() {
        assert!(matches!(
            Payload::parse(Some(r#"{"message": 42}"#)),
            Err(PayloadError::InvalidField { field: "message", .. })
        ));
        assert!(matches!(
            Payload::parse(Some(r#"{"message":"x","attributes":{"n":1}}"#)),
            Err(PayloadError::InvalidField { field: "attributes", .. })
        ));
        assert!(matches!(
            Payload::parse(Some(r#"{"message":"x","attributes":["a"]}"#)),
            Err(PayloadError::InvalidField { field: "attributes", .. })
        ));
    }
}
