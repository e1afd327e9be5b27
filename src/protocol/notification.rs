//! Normalized notification record.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identifiers::NotificationId;

use super::event::{EventKey, InboundFrame, Severity};

// ============================================================================
// Notification
// ============================================================================

/// A record derived from one successfully decoded frame.
///
/// Only `read` changes after creation, and only through the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique identifier.
    pub id: NotificationId,

    /// Wire tag (`CLASS_CREATED`, or any unrecognized string).
    #[serde(rename = "type")]
    pub kind: String,

    /// Display text. Empty when the frame carried none.
    pub message: String,

    /// Type-specific payload, `null` when absent.
    pub data: Value,

    /// Display severity derived from the tag.
    pub severity: Severity,

    /// When the frame was classified.
    pub timestamp: DateTime<Utc>,

    /// Whether a consumer has marked this as read.
    #[serde(default)]
    pub read: bool,
}

impl Notification {
    /// Builds a fresh, unread notification from a decoded frame.
    #[must_use]
    pub fn from_frame(frame: InboundFrame) -> Self {
        let severity = Severity::for_tag(&frame.kind);
        Self {
            id: NotificationId::generate(),
            kind: frame.kind,
            message: frame.message.unwrap_or_default(),
            data: frame.data,
            severity,
            timestamp: Utc::now(),
            read: false,
        }
    }

    /// Returns the typed key if the tag is recognized.
    #[inline]
    #[must_use]
    pub fn event_key(&self) -> Option<EventKey> {
        EventKey::from_tag(&self.kind)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_frame() {
        let frame = InboundFrame {
            kind: "CLASS_DELETED".into(),
            message: Some("Class Y deleted".into()),
            data: json!({"id": 7}),
        };

        let n = Notification::from_frame(frame);
        assert_eq!(n.kind, "CLASS_DELETED");
        assert_eq!(n.message, "Class Y deleted");
        assert_eq!(n.data, json!({"id": 7}));
        assert_eq!(n.severity, Severity::Warning);
        assert_eq!(n.event_key(), Some(EventKey::ClassDeleted));
        assert!(!n.read);
    }

    #[test]
    fn test_missing_message_is_empty() {
        let frame = InboundFrame {
            kind: "PING".into(),
            message: None,
            data: Value::Null,
        };
        let n = Notification::from_frame(frame);
        assert_eq!(n.message, "");
        assert!(n.event_key().is_none());
    }

    #[test]
    fn test_serializes_type_field() {
        let frame = InboundFrame {
            kind: "CLASS_CREATED".into(),
            message: None,
            data: json!({}),
        };
        let value = serde_json::to_value(Notification::from_frame(frame)).expect("serialize");
        assert_eq!(value["type"], "CLASS_CREATED");
        assert_eq!(value["severity"], "success");
        assert_eq!(value["read"], false);
    }
}
