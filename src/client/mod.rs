//! Client entry point and configuration.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`NotificationClient`] | Owns the connection, router, history, and bridge |
//! | [`ClientBuilder`] | Fluent, validating configuration builder |
//! | [`ClientOptions`] | Resolved settings |
//! | [`Environment`] | Development/production endpoint selection |
//!
//! # Example
//!
//! ```no_run
//! use campus_notify::{Environment, NotificationClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = NotificationClient::builder()
//!     .environment(Environment::Production)
//!     .build()?;
//!
//! client.on_notification(|n| println!("{}: {}", n.kind, n.message));
//! client.connect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Environment detection and resolved options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use core::NotificationClient;
pub use options::{ClientOptions, DEVELOPMENT_ENDPOINT, ENVIRONMENT_VAR, Environment, PRODUCTION_ENDPOINT};
