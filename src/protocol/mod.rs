//! Wire message types.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | [`InboundFrame`] | Server → Client | Pushed event (`type`, `message`, `data`) |
//! | any `Serialize` | Client → Server | Sent verbatim as JSON text, no envelope |
//!
//! A decoded frame becomes a [`Notification`] once the router classifies it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Frame decoding, typed keys, severities |
//! | `notification` | Normalized notification record |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound frame decoding and classification table.
pub mod event;

/// Normalized notification record.
pub mod notification;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{EventKey, InboundFrame, Severity};
pub use notification::Notification;
