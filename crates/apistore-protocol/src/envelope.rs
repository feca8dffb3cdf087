//! Call and reply envelopes.
//!
//! Both transports carry the same JSON shapes:
//!
//! ```text
//! call:  { "id": 7, "operation": "addServer", "arguments": ["https://x"] }
//! reply: { "id": 7, "result": "https://x" }
//!        { "id": 7, "error": true, "message": "...", "stack": "..." }
//! ```
//!
//! Anything arriving on a channel without an `id` is a change notification.

use crate::change::{ChangeNotification, ChangeRecord};
use crate::ProtocolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    /// Correlation id, unique per connection.
    pub id: u64,
    /// Wire name of the requested operation.
    pub operation: String,
    /// Operation arguments, opaque to the transport layer.
    #[serde(default)]
    pub arguments: Vec<Value>,
}

impl MessageEnvelope {
    /// Create a new envelope.
    pub fn new(id: u64, operation: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            id,
            operation: operation.into(),
            arguments,
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Failure reported by the engine for a single call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationFailure {
    pub message: String,
    pub stack: Option<String>,
}

/// A reply to a previously sent [`MessageEnvelope`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Id of the call this reply answers.
    pub id: u64,
    /// Result data (if successful).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Set when the engine failed the call.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
    /// Human readable failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Remote stack trace, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ReplyEnvelope {
    /// Create a successful reply.
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: false,
            message: None,
            stack: None,
        }
    }

    /// Create a failed reply.
    pub fn failure(id: u64, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            id,
            result: None,
            error: true,
            message: Some(message.into()),
            stack,
        }
    }

    /// Check if the reply is successful.
    pub fn is_success(&self) -> bool {
        !self.error
    }

    /// Split the reply into the call outcome.
    ///
    /// A missing `result` on a successful reply is `null`.
    pub fn into_outcome(self) -> Result<Value, OperationFailure> {
        if self.error {
            Err(OperationFailure {
                message: self.message.unwrap_or_else(|| "Unknown error".to_string()),
                stack: self.stack,
            })
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Anything a transport can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Reply(ReplyEnvelope),
    Change(ChangeNotification),
}

impl Inbound {
    /// Classify a raw payload: with an `id` it is a reply, without one a
    /// change notification. Notifications come either wrapped as
    /// `{event, data}` or as a bare change record.
    pub fn classify(value: Value) -> Result<Self, ProtocolError> {
        if !value.is_object() {
            return Err(ProtocolError::Shape(format!(
                "expected a JSON object, got {}",
                value
            )));
        }

        if value.get("id").is_some() {
            Ok(Inbound::Reply(serde_json::from_value(value)?))
        } else if value.get("event").is_some() {
            Ok(Inbound::Change(serde_json::from_value(value)?))
        } else {
            let record: ChangeRecord = serde_json::from_value(value)?;
            Ok(Inbound::Change(ChangeNotification::from_record(record)))
        }
    }

    /// Parse and classify a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(json)?;
        Self::classify(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_serialization() {
        let envelope = MessageEnvelope::new(3, "addServer", vec![json!("https://x")]);
        let json = envelope.to_json().unwrap();

        assert!(json.contains("\"id\":3"));
        assert!(json.contains("\"operation\":\"addServer\""));
        assert!(json.contains("\"arguments\":[\"https://x\"]"));
    }

    #[test]
    fn test_envelope_missing_arguments_defaults_empty() {
        let envelope = MessageEnvelope::from_json(r#"{"id":1,"operation":"getApi"}"#).unwrap();
        assert!(envelope.arguments.is_empty());
    }

    #[test]
    fn test_reply_success_omits_error_fields() {
        let reply = ReplyEnvelope::success(9, json!({"ok": true}));
        let json = reply.to_json().unwrap();

        assert!(json.contains("\"id\":9"));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn test_reply_failure_outcome_keeps_stack() {
        let reply = ReplyEnvelope::failure(2, "boom", Some("at engine.js:1".to_string()));
        let failure = reply.into_outcome().unwrap_err();

        assert_eq!(failure.message, "boom");
        assert_eq!(failure.stack.as_deref(), Some("at engine.js:1"));
    }

    #[test]
    fn test_reply_error_without_message() {
        let reply = ReplyEnvelope::from_json(r#"{"id":4,"error":true}"#).unwrap();
        let failure = reply.into_outcome().unwrap_err();
        assert_eq!(failure.message, "Unknown error");
    }

    #[test]
    fn test_reply_without_result_is_null() {
        let reply = ReplyEnvelope::from_json(r#"{"id":5}"#).unwrap();
        assert!(reply.is_success());
        assert_eq!(reply.into_outcome().unwrap(), Value::Null);
    }

    #[test]
    fn test_classify_reply_and_change() {
        let reply = Inbound::classify(json!({"id": 1, "result": 2})).unwrap();
        assert!(matches!(reply, Inbound::Reply(r) if r.id == 1));

        let change = Inbound::classify(json!({
            "event": "EndPoint#created",
            "data": {"graphId": "e1", "domainType": "EndPoint", "item": {"path": "/a"}}
        }))
        .unwrap();
        assert!(matches!(change, Inbound::Change(c) if c.data.graph_id == "e1"));
    }

    #[test]
    fn test_classify_bare_change_records() {
        let created = Inbound::classify(json!({
            "graphId": "e1",
            "domainType": "EndPoint",
            "item": {"path": "/a"}
        }))
        .unwrap();
        assert!(matches!(created, Inbound::Change(ref c) if c.event == "EndPoint#created"));

        let updated = Inbound::classify(json!({
            "graphId": "cp1",
            "domainType": "CustomDomainProperty",
            "property": "name",
            "item": {"name": "x"}
        }))
        .unwrap();
        assert!(matches!(
            updated,
            Inbound::Change(ref c) if c.event == "CustomDomainProperty#property-updated"
        ));

        let deleted = Inbound::classify(json!({
            "graphId": "o1",
            "domainType": "Operation",
            "domainParent": "e1"
        }))
        .unwrap();
        match deleted {
            Inbound::Change(c) => {
                assert_eq!(c.event, "Operation#deleted");
                assert_eq!(c.data.domain_parent.as_deref(), Some("e1"));
            }
            other => panic!("unexpected inbound: {:?}", other),
        }
    }

    #[test]
    fn test_classify_rejects_garbage() {
        assert!(Inbound::classify(json!("hello")).is_err());
        assert!(Inbound::classify(json!({"event": "x"})).is_err());
        assert!(Inbound::from_json("not json").is_err());
    }
}
