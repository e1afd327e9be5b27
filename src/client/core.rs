//! Notification client, the crate's composition root.
//!
//! The [`NotificationClient`] owns the history, the router, the connection
//! manager, and the bridge views bind through. Nothing is shared globally:
//! an application builds one client and hands clones to whoever needs it.
//!
//! # Example
//!
//! ```no_run
//! use campus_notify::{BindCallbacks, Environment, NotificationClient};
//!
//! # async fn example() -> campus_notify::Result<()> {
//! let client = NotificationClient::builder()
//!     .environment(Environment::Development)
//!     .build()?;
//!
//! client.on_class_created(|data| println!("class created: {data}"));
//! client.connect();
//!
//! let binding = client.bind(BindCallbacks::new().on_notification(|n| {
//!     println!("[{}] {}", n.severity, n.message);
//! }));
//! # drop(binding);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::identifiers::{NotificationId, SubscriptionId};
use crate::notify::{BindCallbacks, Binding, EventRouter, Listener, NotificationStore, SubscriptionBridge};
use crate::protocol::{EventKey, Notification};
use crate::transport::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStatus};

use super::builder::ClientBuilder;
use super::options::ClientOptions;

// ============================================================================
// Types
// ============================================================================

/// Shared state behind every client handle.
struct ClientInner {
    options: ClientOptions,
    store: Arc<NotificationStore>,
    router: Arc<EventRouter>,
    manager: ConnectionManager,
    bridge: SubscriptionBridge,
}

// ============================================================================
// NotificationClient
// ============================================================================

/// Real-time notification client.
///
/// Cloning yields another handle to the same connection and history.
///
/// # Runtime
///
/// [`connect`](Self::connect) and [`reconnect`](Self::reconnect) spawn tokio
/// tasks and must be called from within a tokio runtime.
#[derive(Clone)]
pub struct NotificationClient {
    inner: Arc<ClientInner>,
}

// ============================================================================
// NotificationClient - Display
// ============================================================================

impl fmt::Debug for NotificationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationClient")
            .field("endpoint", &self.endpoint())
            .field("status", &self.status())
            .field("history", &self.inner.store.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NotificationClient - Construction
// ============================================================================

impl NotificationClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Wires a client from resolved options. Does not connect.
    ///
    /// Prefer [`builder`](Self::builder), which validates the options first.
    #[must_use]
    pub fn new(options: ClientOptions) -> Self {
        let store = Arc::new(NotificationStore::with_capacity(options.history_capacity));
        let router = Arc::new(EventRouter::new(Arc::clone(&store)));
        let manager = ConnectionManager::new(
            options.endpoint.clone(),
            options.reconnect_policy,
            options.connect_timeout,
            Arc::clone(&router),
        );
        let bridge = SubscriptionBridge::new(manager.clone(), Arc::clone(&router));

        info!(
            endpoint = %options.endpoint,
            history_capacity = options.history_capacity,
            max_attempts = options.reconnect_policy.max_attempts(),
            "Notification client created"
        );

        Self {
            inner: Arc::new(ClientInner {
                options,
                store,
                router,
                manager,
                bridge,
            }),
        }
    }
}

// ============================================================================
// NotificationClient - Connection
// ============================================================================

impl NotificationClient {
    /// Starts connecting. No-op if already connecting or open.
    #[inline]
    pub fn connect(&self) {
        self.inner.manager.connect();
    }

    /// Closes the connection and suppresses automatic reconnection.
    #[inline]
    pub fn disconnect(&self) {
        self.inner.manager.disconnect();
    }

    /// Disconnects, then connects with a fresh attempt count.
    #[inline]
    pub fn reconnect(&self) {
        self.inner.manager.reconnect();
    }

    /// Disconnects and drops this handle.
    ///
    /// Other clones keep the history and listeners, and may connect again.
    pub fn shutdown(self) {
        self.inner.manager.disconnect();
        info!(endpoint = %self.endpoint(), "Notification client shut down");
    }

    /// Sends `message` as JSON if the connection is open.
    ///
    /// Returns `false` when not open; nothing is queued.
    #[inline]
    pub fn send<T>(&self, message: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.inner.manager.send(message)
    }

    /// Current connection status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.inner.manager.status()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.manager.state()
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.manager.is_connected()
    }

    /// The configured endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.inner.options.endpoint
    }

    /// The options this client was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }
}

// ============================================================================
// NotificationClient - Subscriptions
// ============================================================================

impl NotificationClient {
    /// Registers a listener and returns its token.
    #[inline]
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        self.inner.router.subscribe(listener)
    }

    /// Removes a listener. Returns `false` if the token is unknown.
    #[inline]
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.router.unsubscribe(id)
    }

    /// Subscribes to a typed key.
    pub fn on<F>(&self, key: EventKey, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.router.on(key, callback)
    }

    /// Subscribes to [`EventKey::ClassCreated`].
    pub fn on_class_created<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassCreated, callback)
    }

    /// Subscribes to [`EventKey::ClassUpdated`].
    pub fn on_class_updated<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassUpdated, callback)
    }

    /// Subscribes to [`EventKey::ClassDeleted`].
    pub fn on_class_deleted<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassDeleted, callback)
    }

    /// Subscribes to every notification.
    pub fn on_notification<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.inner.router.on_notification(callback)
    }

    /// Subscribes to connection lifecycle signals.
    pub fn on_connection<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.inner.router.on_connection(callback)
    }

    /// Binds a view. See [`SubscriptionBridge::bind`].
    #[inline]
    pub fn bind(&self, callbacks: BindCallbacks) -> Binding {
        self.inner.bridge.bind(callbacks)
    }

    /// Releases a view's subscriptions.
    #[inline]
    pub fn unbind(&self, binding: Binding) {
        self.inner.bridge.unbind(binding);
    }
}

// ============================================================================
// NotificationClient - History
// ============================================================================

impl NotificationClient {
    /// Snapshot of the history, most recent first.
    #[inline]
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.store.snapshot()
    }

    /// Clears the history.
    #[inline]
    pub fn clear_notifications(&self) {
        self.inner.store.clear();
    }

    /// Removes one notification. Returns `false` if it was not present.
    #[inline]
    pub fn remove_notification(&self, id: NotificationId) -> bool {
        self.inner.store.remove(id)
    }

    /// Number of notifications not yet marked read.
    #[inline]
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.inner.store.unread_count()
    }

    /// The shared history.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.inner.store
    }

    /// The router frames are dispatched through.
    #[inline]
    #[must_use]
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.inner.router
    }

    /// The underlying connection manager.
    #[inline]
    #[must_use]
    pub fn manager(&self) -> &ConnectionManager {
        &self.inner.manager
    }
}

// ============================================================================
// Tests
// ============================================================================
