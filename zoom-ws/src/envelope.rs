//! Two-layer inbound envelope.
//!
//! ```text
//! {"module":"message","content":"{\"event\":\"user.created\",\"payload\":{...}}"}
//!                                ^ serialized JSON object, decoded a second time
//! ```

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a frame was skipped. None of these end the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("frame is not a JSON object: {0}")]
    Outer(String),
    #[error("frame has no string `content` field")]
    MissingContent,
    #[error("`content` is not a JSON object: {0}")]
    Inner(String),
    #[error("content has no string `event` field")]
    MissingEvent,
}

/// Decoded inner envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub event: String,
    /// The whole inner object, `event` included.
    pub content: Map<String, Value>,
}

fn parse_object(text: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!("expected object, got {}", json_kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decodes outer frame, then its `content` string, then reads `event`.
pub fn decode(text: &str) -> Result<Envelope, EnvelopeError> {
    let outer = parse_object(text).map_err(EnvelopeError::Outer)?;
    let content = outer
        .get("content")
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingContent)?;
    let content = parse_object(content).map_err(EnvelopeError::Inner)?;
    let event = content
        .get("event")
        .and_then(Value::as_str)
        .ok_or(EnvelopeError::MissingEvent)?
        .to_string();
    Ok(Envelope { event, content })
}
