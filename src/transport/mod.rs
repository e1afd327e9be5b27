//! WebSocket transport layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                          ┌─────────────────┐
//! │  ConnectionManager   │         WebSocket        │  Notification   │
//! │                      │◄─────────────────────────│  server         │
//! │  connection task ────┼──► EventRouter           │                 │
//! │  retry timer         │                          │                 │
//! └──────────────────────┘                          └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `connect` - move to Connecting, spawn the connection task
//! 2. Handshake succeeds - Open, attempt count reset
//! 3. Frames flow to the router until the socket closes
//! 4. Close - retry after backoff while the policy allows
//! 5. `disconnect` - cancel retry, close socket, stay Closed
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection manager and event loop |
//! | `reconnect` | Backoff policy |
//! | `state` | State enum, status snapshot, lifecycle events |

// ============================================================================
// Submodules
// ============================================================================

/// Connection manager and event loop.
pub mod connection;

/// Reconnect backoff policy.
pub mod reconnect;

/// Connection state types.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{ConnectionManager, DEFAULT_CONNECT_TIMEOUT};
pub use reconnect::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, ReconnectAttempt, ReconnectPolicy};
pub use state::{ConnectionEvent, ConnectionState, ConnectionStatus};
