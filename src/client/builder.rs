//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`NotificationClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use campus_notify::{Environment, NotificationClient};
//!
//! # fn example() -> campus_notify::Result<()> {
//! let client = NotificationClient::builder()
//!     .environment(Environment::Development)
//!     .max_reconnect_attempts(8)
//!     .reconnect_base_delay(Duration::from_secs(1))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::{Error, Result};
use crate::transport::ReconnectPolicy;

use super::core::NotificationClient;
use super::options::{ClientOptions, Environment};

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`NotificationClient`].
///
/// Use [`NotificationClient::builder()`] to create a new builder. Unset values
/// fall back to the detected [`Environment`] and the crate defaults.
#[derive(Debug, Default, Clone)]
pub struct ClientBuilder {
    /// Environment used to pick the endpoint.
    environment: Option<Environment>,
    /// Explicit endpoint, overrides the environment.
    endpoint: Option<String>,
    /// Base policy; individual fields below override it.
    reconnect_policy: Option<ReconnectPolicy>,
    max_reconnect_attempts: Option<u32>,
    reconnect_base_delay: Option<Duration>,
    history_capacity: Option<usize>,
    connect_timeout: Option<Duration>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with nothing set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects the environment instead of detecting it.
    #[inline]
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets the WebSocket URL explicitly.
    ///
    /// # Arguments
    ///
    /// * `url` - `ws://` or `wss://` URL (e.g., "ws://localhost:8088/notifications")
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the whole reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect_policy = Some(policy);
        self
    }

    /// Sets the automatic retry cap.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Sets the delay before the first retry. Later retries double it.
    #[inline]
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = Some(delay);
        self
    }

    /// Sets how many notifications the history keeps.
    #[inline]
    #[must_use]
    pub fn history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = Some(capacity);
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Validates the configuration and resolves it into options.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] if the endpoint is not a `ws`/`wss` URL
    /// - [`Error::Config`] if capacity, retry cap, or timeout is zero
    pub fn options(&self) -> Result<ClientOptions> {
        let environment = self.environment.unwrap_or_else(Environment::detect);
        let defaults = ClientOptions::for_environment(environment);

        Ok(ClientOptions {
            endpoint: self.validate_endpoint(defaults.endpoint)?,
            reconnect_policy: self.validate_policy(defaults.reconnect_policy)?,
            history_capacity: self.validate_capacity(defaults.history_capacity)?,
            connect_timeout: self.validate_timeout(defaults.connect_timeout)?,
        })
    }

    /// Builds the client. Nothing connects until
    /// [`NotificationClient::connect`] is called.
    ///
    /// # Errors
    ///
    /// Same as [`options`](Self::options).
    pub fn build(self) -> Result<NotificationClient> {
        let options = self.options()?;
        Ok(NotificationClient::new(options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint URL.
    fn validate_endpoint(&self, default: String) -> Result<String> {
        let endpoint = self.endpoint.clone().unwrap_or(default);
        let url = Url::parse(&endpoint)
            .map_err(|e| Error::invalid_endpoint(&endpoint, e.to_string()))?;

        match url.scheme() {
            "ws" => {}
            "wss" => {
                if !cfg!(feature = "tls") {
                    warn!(endpoint = %endpoint, "wss endpoint without the `tls` feature, handshakes will fail");
                }
            }
            other => {
                return Err(Error::invalid_endpoint(
                    &endpoint,
                    format!("unsupported scheme '{other}', expected ws or wss"),
                ));
            }
        }

        if url.host_str().is_none_or(str::is_empty) {
            return Err(Error::invalid_endpoint(&endpoint, "missing host"));
        }

        Ok(endpoint)
    }

    /// Resolves the reconnect policy from its parts.
    fn validate_policy(&self, default: ReconnectPolicy) -> Result<ReconnectPolicy> {
        let base = self.reconnect_policy.unwrap_or(default);
        let max_attempts = self.max_reconnect_attempts.unwrap_or(base.max_attempts());
        let base_delay = self.reconnect_base_delay.unwrap_or(base.base_delay());

        if max_attempts == 0 {
            return Err(Error::config(
                "max_reconnect_attempts must be at least 1.\n\
                 Example: NotificationClient::builder().max_reconnect_attempts(5)",
            ));
        }

        Ok(ReconnectPolicy::new(max_attempts, base_delay))
    }

    fn validate_capacity(&self, default: usize) -> Result<usize> {
        let capacity = self.history_capacity.unwrap_or(default);
        if capacity == 0 {
            return Err(Error::config(
                "history_capacity must be at least 1.\n\
                 Example: NotificationClient::builder().history_capacity(100)",
            ));
        }
        Ok(capacity)
    }

    fn validate_timeout(&self, default: Duration) -> Result<Duration> {
        let timeout = self.connect_timeout.unwrap_or(default);
        if timeout.is_zero() {
            return Err(Error::config("connect_timeout must be greater than zero"));
        }
        Ok(timeout)
    }
}

// ============================================================================
// Tests
// ============================================================================
