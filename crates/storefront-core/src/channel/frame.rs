//! Inbound frame decoding and the heartbeat acknowledgment.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::notification::{Notification, NotificationKind};
use crate::wire::{deserialize_id, deserialize_timestamp};

/// Frame `type` of the keepalive probe and its echo.
pub const HEARTBEAT_TYPE: &str = "heartbeat";

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Server keepalive probe; must be echoed immediately.
    Heartbeat,
    /// Anything else is a notification. `read` is always `false` on arrival.
    Notification(Notification),
}

#[derive(Deserialize)]
struct NotificationPayload {
    #[serde(deserialize_with = "deserialize_id")]
    id: String,
    #[serde(rename = "type")]
    kind: NotificationKind,
    #[serde(default)]
    message: String,
    #[serde(default = "Utc::now", deserialize_with = "deserialize_timestamp")]
    timestamp: DateTime<Utc>,
}

impl InboundFrame {
    /// Decodes a text frame.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;
        let frame_type = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingType)?;

        if frame_type == HEARTBEAT_TYPE {
            return Ok(Self::Heartbeat);
        }

        let payload: NotificationPayload = serde_json::from_value(value)
            .map_err(|e| ParseError::InvalidNotification(e.to_string()))?;
        Ok(Self::Notification(Notification::new(
            payload.id,
            payload.kind,
            payload.message,
            payload.timestamp,
        )))
    }
}

/// The `{"type":"heartbeat"}` echo sent in reply to a probe.
pub fn heartbeat_ack() -> String {
    serde_json::json!({ "type": HEARTBEAT_TYPE }).to_string()
}
