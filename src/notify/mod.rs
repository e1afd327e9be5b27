//! Notification routing, history, and view bindings.
//!
//! # Data Flow
//!
//! ```text
//! text frame ──► EventRouter ──► NotificationStore (record)
//!                    │
//!                    ├──► typed listeners   (EventKey, data)
//!                    └──► generic listeners (Notification)
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `bridge` | Bind/unbind lifecycle for views |
//! | `router` | Subscription registry and dispatch |
//! | `store` | Bounded history |

// ============================================================================
// Submodules
// ============================================================================

/// View bindings with scoped release.
pub mod bridge;

/// Subscription registry and frame dispatch.
pub mod router;

/// Bounded notification history.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use bridge::{BindCallbacks, Binding, SubscriptionBridge};
pub use router::{ConnectionCallback, EventRouter, Listener, NotificationCallback, PayloadCallback};
pub use store::{DEFAULT_HISTORY_CAPACITY, NotificationStore};
