//! Connection state, status snapshot, and lifecycle signals.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::Serialize;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the notification socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Socket is open; frames flow and `send` transmits.
    Open,
    /// No socket. Initial state, and the state after any close.
    #[default]
    Closed,
    /// Transport reported an error; a close follows.
    Errored,
}

impl ConnectionState {
    /// Returns `true` only for [`ConnectionState::Open`].
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Errored => "errored",
        };
        f.write_str(s)
    }
}

// ============================================================================
// ConnectionStatus
// ============================================================================

/// Point-in-time status of a connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// `true` while the socket is open.
    pub is_connected: bool,
    /// Failed attempts since the last successful open.
    pub reconnect_attempts: u32,
    /// Current lifecycle state.
    pub ready_state: ConnectionState,
}

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Lifecycle signal delivered to connection listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection attempt started.
    Connecting {
        /// Failed attempts so far (0 for a fresh `connect`).
        attempt: u32,
    },
    /// The socket opened.
    Connected,
    /// The socket closed or the handshake failed.
    Disconnected {
        /// Close code from the peer, if one was received.
        code: Option<u16>,
        /// Close reason or failure description.
        reason: String,
    },
    /// The transport reported an error. Always followed by `Disconnected`.
    Error {
        /// Error description.
        message: String,
    },
}

impl ConnectionEvent {
    /// The state a listener should show after this signal.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        match self {
            Self::Connecting { .. } => ConnectionState::Connecting,
            Self::Connected => ConnectionState::Open,
            Self::Disconnected { .. } => ConnectionState::Closed,
            Self::Error { .. } => ConnectionState::Errored,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_closed() {
        assert_eq!(ConnectionState::default(), ConnectionState::Closed);
        assert!(!ConnectionState::default().is_open());
    }

    #[test]
    fn test_event_state_mapping() {
        assert_eq!(
            ConnectionEvent::Connecting { attempt: 2 }.state(),
            ConnectionState::Connecting
        );
        assert_eq!(ConnectionEvent::Connected.state(), ConnectionState::Open);
        assert_eq!(
            ConnectionEvent::Error {
                message: "boom".into()
            }
            .state(),
            ConnectionState::Errored
        );
    }

    #[test]
    fn test_status_serializes_camel_case() {
        let status = ConnectionStatus {
            is_connected: true,
            reconnect_attempts: 0,
            ready_state: ConnectionState::Open,
        };
        let value = serde_json::to_value(status).expect("serialize");
        assert_eq!(value["isConnected"], true);
        assert_eq!(value["reconnectAttempts"], 0);
        assert_eq!(value["readyState"], "open");
    }
}
