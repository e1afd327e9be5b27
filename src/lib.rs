//! campus-notify - Real-time notification client for the campus class service.
//!
//! Keeps one WebSocket connection to the notification server, classifies
//! pushed frames, keeps a bounded history, and fans events out to typed and
//! generic subscribers.
//!
//! # Architecture
//!
//! - **Transport**: one socket per client, reconnected with exponential
//!   backoff up to a retry cap
//! - **Routing**: every frame is recorded, then typed listeners run, then
//!   generic ones
//! - **Views**: bind for the lifetime of a screen, release on unbind or drop
//!
//! Nothing starts on its own. The application builds a [`NotificationClient`]
//! and decides when to [`connect`](NotificationClient::connect).
//!
//! # Quick Start
//!
//! ```no_run
//! use campus_notify::{Environment, NotificationClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = NotificationClient::builder()
//!         .environment(Environment::Development)
//!         .build()?;
//!
//!     client.on_class_created(|data| {
//!         println!("Class created: {}", data["className"]);
//!     });
//!     client.on_notification(|n| println!("[{}] {}", n.severity, n.message));
//!
//!     client.connect();
//!     tokio::signal::ctrl_c().await.ok();
//!     client.shutdown();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder, and options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Notification and subscription IDs |
//! | [`notify`] | Router, history, and view bindings |
//! | [`protocol`] | Wire frames and notification records |
//! | [`transport`] | Connection manager and reconnect policy |
//!
//! # Features
//!
//! - **`tls`**: enables `wss://` endpoints through native-tls

// ============================================================================
// Modules
// ============================================================================

/// Client entry point and configuration.
///
/// Use [`NotificationClient::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// Fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Frame routing, notification history, and view bindings.
pub mod notify;

/// Wire message types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Connection lifecycle, backoff, and status types.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{ClientBuilder, ClientOptions, Environment, NotificationClient};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{NotificationId, SubscriptionId};

// Routing types
pub use notify::{BindCallbacks, Binding, EventRouter, Listener, NotificationStore, SubscriptionBridge};

// Protocol types
pub use protocol::{EventKey, InboundFrame, Notification, Severity};

// Transport types
pub use transport::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStatus, ReconnectPolicy};
