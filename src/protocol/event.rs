//! Inbound frame types.
//!
//! Frames are pushed by the server over the notification socket. Each frame
//! is a JSON object with a required `type` tag:
//!
//! ```json
//! {
//!   "type": "CLASS_CREATED",
//!   "message": "Class X created",
//!   "data": { "id": 1, "className": "X" }
//! }
//! ```
//!
//! # Known Tags
//!
//! | Tag | [`EventKey`] | [`Severity`] |
//! |-----|--------------|--------------|
//! | `CLASS_CREATED` | [`EventKey::ClassCreated`] | [`Severity::Success`] |
//! | `CLASS_UPDATED` | [`EventKey::ClassUpdated`] | [`Severity::Info`] |
//! | `CLASS_DELETED` | [`EventKey::ClassDeleted`] | [`Severity::Warning`] |
//!
//! Any other tag is still a valid frame; it simply has no typed key and is
//! delivered on the generic channel only.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::result::Result as StdResult;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// EventKey
// ============================================================================

/// Typed subscription key for a recognized event tag.
///
/// This is a closed set: the generic channel is not a key, it is a separate
/// listener kind that receives every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKey {
    /// A class resource was created.
    ClassCreated,
    /// A class resource was updated.
    ClassUpdated,
    /// A class resource was deleted.
    ClassDeleted,
}

impl EventKey {
    /// All typed keys, in table order.
    pub const ALL: [EventKey; 3] = [
        EventKey::ClassCreated,
        EventKey::ClassUpdated,
        EventKey::ClassDeleted,
    ];

    /// Looks up the typed key for a wire tag.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "CLASS_CREATED" => Some(Self::ClassCreated),
            "CLASS_UPDATED" => Some(Self::ClassUpdated),
            "CLASS_DELETED" => Some(Self::ClassDeleted),
            _ => None,
        }
    }

    /// Returns the wire tag for this key.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ClassCreated => "CLASS_CREATED",
            Self::ClassUpdated => "CLASS_UPDATED",
            Self::ClassDeleted => "CLASS_DELETED",
        }
    }

    /// Display severity for notifications of this kind.
    #[inline]
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ClassCreated => Severity::Success,
            Self::ClassUpdated => Severity::Info,
            Self::ClassDeleted => Severity::Warning,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Severity
// ============================================================================

/// How prominently a notification should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Something was added.
    Success,
    /// Neutral update.
    #[default]
    Info,
    /// Something was removed.
    Warning,
}

impl Severity {
    /// Severity for an arbitrary wire tag. Unknown tags are [`Severity::Info`].
    #[inline]
    #[must_use]
    pub fn for_tag(tag: &str) -> Self {
        EventKey::from_tag(tag).map_or(Self::Info, EventKey::severity)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
        }
    }
}

// ============================================================================
// InboundFrame
// ============================================================================

/// A decoded server frame.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct InboundFrame {
    /// Event type tag.
    #[serde(rename = "type")]
    pub kind: String,

    /// Human-readable message.
    ///
    /// Non-string values are kept in their JSON text form; `null` is absent.
    #[serde(
        default,
        deserialize_with = "lenient_message",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,

    /// Type-specific payload.
    #[serde(default)]
    pub data: Value,
}

impl InboundFrame {
    /// Decodes a raw text frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if the text is not JSON, not an object, or lacks a
    ///   string `type` field
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::decode(format!("not valid JSON: {e}")))?;

        if !value.is_object() {
            return Err(Error::decode("frame is not a JSON object"));
        }

        serde_json::from_value(value).map_err(|e| Error::decode(e.to_string()))
    }

    /// Returns the typed key if the tag is recognized.
    #[inline]
    #[must_use]
    pub fn event_key(&self) -> Option<EventKey> {
        EventKey::from_tag(&self.kind)
    }
}

fn lenient_message<'de, D>(deserializer: D) -> StdResult<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    })
}

// ============================================================================
// Tests
// ============================================================================
