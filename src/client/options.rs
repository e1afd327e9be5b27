//! Deployment environment and resolved client settings.
//!
//! # Environment Selection
//!
//! | `CAMPUS_NOTIFY_ENV` | Build | Environment | Endpoint |
//! |---------------------|-------|-------------|----------|
//! | `production` | any | Production | `wss://your-domain.com/notifications` |
//! | `development` | any | Development | `ws://localhost:8088/notifications` |
//! | unset / other | debug | Development | `ws://localhost:8088/notifications` |
//! | unset / other | release | Production | `wss://your-domain.com/notifications` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use tracing::warn;

use crate::notify::DEFAULT_HISTORY_CAPACITY;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, ReconnectPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Variable consulted by [`Environment::detect`].
pub const ENVIRONMENT_VAR: &str = "CAMPUS_NOTIFY_ENV";

/// Endpoint used during development.
pub const DEVELOPMENT_ENDPOINT: &str = "ws://localhost:8088/notifications";

/// Endpoint used in production.
pub const PRODUCTION_ENDPOINT: &str = "wss://your-domain.com/notifications";

// ============================================================================
// Environment
// ============================================================================

/// Deployment environment, which selects the default endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    /// Local server over plain `ws`.
    Development,
    /// Public server over `wss`.
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::detect()
    }
}

impl Environment {
    /// Reads `CAMPUS_NOTIFY_ENV`, falling back to the build profile.
    #[must_use]
    pub fn detect() -> Self {
        let value = std::env::var(ENVIRONMENT_VAR).ok();
        Self::resolve(value.as_deref(), cfg!(debug_assertions))
    }

    /// Parses an environment name, case-insensitively.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Default endpoint for this environment.
    #[inline]
    #[must_use]
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Development => DEVELOPMENT_ENDPOINT,
            Self::Production => PRODUCTION_ENDPOINT,
        }
    }

    fn resolve(value: Option<&str>, debug_build: bool) -> Self {
        if let Some(value) = value {
            match Self::from_name(value) {
                Some(env) => return env,
                None => warn!(value, var = ENVIRONMENT_VAR, "Unknown environment, using build default"),
            }
        }

        if debug_build {
            Self::Development
        } else {
            Self::Production
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Validated settings a client is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// WebSocket URL (`ws` or `wss`).
    pub endpoint: String,

    /// Backoff and retry cap.
    pub reconnect_policy: ReconnectPolicy,

    /// Maximum retained notifications.
    pub history_capacity: usize,

    /// Upper bound on a single handshake.
    pub connect_timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::for_environment(Environment::detect())
    }
}

impl ClientOptions {
    /// Default settings for `environment`.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            endpoint: environment.endpoint().to_string(),
            reconnect_policy: ReconnectPolicy::default(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
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
    fn test_from_name() {
        assert_eq!(Environment::from_name("production"), Some(Environment::Production));
        assert_eq!(Environment::from_name(" Development "), Some(Environment::Development));
        assert_eq!(Environment::from_name("PROD"), Some(Environment::Production));
        assert_eq!(Environment::from_name("staging"), None);
    }

    #[test]
    fn test_resolve_prefers_variable() {
        assert_eq!(Environment::resolve(Some("production"), true), Environment::Production);
        assert_eq!(Environment::resolve(Some("development"), false), Environment::Development);
    }

    #[test]
    fn test_resolve_falls_back_to_build() {
        assert_eq!(Environment::resolve(None, true), Environment::Development);
        assert_eq!(Environment::resolve(None, false), Environment::Production);
        assert_eq!(Environment::resolve(Some("staging"), false), Environment::Production);
    }

    #[test]
    fn test_endpoints() {
        assert_eq!(Environment::Development.endpoint(), "ws://localhost:8088/notifications");
        assert_eq!(Environment::Production.endpoint(), "wss://your-domain.com/notifications");
    }

    #[test]
    fn test_options_defaults() {
        let options = ClientOptions::for_environment(Environment::Development);
        assert_eq!(options.endpoint, DEVELOPMENT_ENDPOINT);
        assert_eq!(options.history_capacity, 100);
        assert_eq!(options.reconnect_policy.max_attempts(), 5);
        assert_eq!(options.reconnect_policy.base_delay(), Duration::from_millis(3000));
        assert_eq!(options.connect_timeout, Duration::from_secs(10));
    }
}
