//! Bind/unbind adapter for views that come and go.
//!
//! A view calls [`SubscriptionBridge::bind`] when it appears and gets a
//! [`Binding`] that owns every subscription made on its behalf. Unbinding,
//! or simply dropping the binding, releases all of them exactly once.
//!
//! ```ignore
//! let binding = client.bind(
//!     BindCallbacks::new()
//!         .on_class_created(|data| println!("new class: {data}"))
//!         .on_notification(|n| println!("{}", n.message)),
//! );
//!
//! let mut updates = binding.updates();
//! while updates.changed().await.is_ok() {
//!     render(binding.state(), binding.notifications());
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::identifiers::{NotificationId, SubscriptionId};
use crate::protocol::{EventKey, Notification};
use crate::transport::{ConnectionEvent, ConnectionManager, ConnectionState, ConnectionStatus};

use super::router::{ConnectionCallback, EventRouter, Listener, NotificationCallback, PayloadCallback};

// ============================================================================
// BindCallbacks
// ============================================================================

/// Callbacks a view wants registered for the lifetime of its binding.
#[derive(Default, Clone)]
pub struct BindCallbacks {
    typed: Vec<(EventKey, PayloadCallback)>,
    notification: Option<NotificationCallback>,
    connection: Option<ConnectionCallback>,
}

impl fmt::Debug for BindCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindCallbacks")
            .field("typed", &self.typed.iter().map(|(k, _)| *k).collect::<Vec<_>>())
            .field("notification", &self.notification.is_some())
            .field("connection", &self.connection.is_some())
            .finish()
    }
}

impl BindCallbacks {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a callback for `key`.
    #[must_use]
    pub fn on<F>(mut self, key: EventKey, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.typed.push((key, Arc::new(callback)));
        self
    }

    /// Adds a callback for [`EventKey::ClassCreated`].
    #[inline]
    #[must_use]
    pub fn on_class_created<F>(self, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassCreated, callback)
    }

    /// Adds a callback for [`EventKey::ClassUpdated`].
    #[inline]
    #[must_use]
    pub fn on_class_updated<F>(self, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassUpdated, callback)
    }

    /// Adds a callback for [`EventKey::ClassDeleted`].
    #[inline]
    #[must_use]
    pub fn on_class_deleted<F>(self, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.on(EventKey::ClassDeleted, callback)
    }

    /// Sets the callback for every notification.
    #[must_use]
    pub fn on_notification<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.notification = Some(Arc::new(callback));
        self
    }

    /// Sets the callback for connection lifecycle signals.
    #[must_use]
    pub fn on_connection<F>(mut self, callback: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.connection = Some(Arc::new(callback));
        self
    }
}

// ============================================================================
// SubscriptionBridge
// ============================================================================

/// Hands out [`Binding`]s over one connection and router.
#[derive(Clone)]
pub struct SubscriptionBridge {
    manager: ConnectionManager,
    router: Arc<EventRouter>,
}

impl fmt::Debug for SubscriptionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionBridge")
            .field("endpoint", &self.manager.endpoint())
            .field("listeners", &self.router.listener_count())
            .finish()
    }
}

impl SubscriptionBridge {
    /// Creates a bridge over `manager` and `router`.
    #[must_use]
    pub fn new(manager: ConnectionManager, router: Arc<EventRouter>) -> Self {
        Self { manager, router }
    }

    /// Registers `callbacks` and returns the binding that owns them.
    ///
    /// The binding's state is seeded from the manager's current status once
    /// its connection listener is registered, so no transition in between is
    /// missed.
    pub fn bind(&self, callbacks: BindCallbacks) -> Binding {
        let BindCallbacks {
            typed,
            notification,
            connection,
        } = callbacks;

        let shared = Arc::new(BindingShared {
            state: Mutex::new(ConnectionState::Closed),
            revision: watch::channel(0).0,
        });
        let mut subscriptions = Vec::with_capacity(typed.len() + 2);

        let status_shared = Arc::clone(&shared);
        subscriptions.push(self.router.on_connection(move |event| {
            *status_shared.state.lock() = event.state();
            status_shared.bump();
            if let Some(callback) = &connection {
                callback(event);
            }
        }));
        *shared.state.lock() = self.manager.state();

        let generic_shared = Arc::clone(&shared);
        subscriptions.push(self.router.on_notification(move |n| {
            generic_shared.bump();
            if let Some(callback) = &notification {
                callback(n);
            }
        }));

        for (key, callback) in typed {
            subscriptions.push(self.router.subscribe(Listener::Event(key, callback)));
        }

        debug!(subscriptions = subscriptions.len(), "View bound");

        Binding {
            updates: shared.revision.subscribe(),
            shared,
            subscriptions,
            manager: self.manager.clone(),
            router: Arc::clone(&self.router),
        }
    }

    /// Releases every subscription owned by `binding`.
    #[inline]
    pub fn unbind(&self, binding: Binding) {
        binding.unbind();
    }
}

// ============================================================================
// Binding
// ============================================================================

struct BindingShared {
    state: Mutex<ConnectionState>,
    revision: watch::Sender<u64>,
}

impl BindingShared {
    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

/// A bound view's handle on the notification service.
///
/// Dropping the binding releases its subscriptions.
pub struct Binding {
    shared: Arc<BindingShared>,
    updates: watch::Receiver<u64>,
    subscriptions: Vec<SubscriptionId>,
    manager: ConnectionManager,
    router: Arc<EventRouter>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("state", &self.state())
            .field("subscriptions", &self.subscriptions)
            .finish_non_exhaustive()
    }
}

impl Binding {
    /// Returns `true` while the last observed state is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_open()
    }

    /// Last connection state observed by this binding.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    /// Live status from the connection manager.
    #[inline]
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    /// Snapshot of the shared history, most recent first.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.router.store().snapshot()
    }

    /// Sends `message` if the connection is open.
    pub fn send<T>(&self, message: &T) -> bool
    where
        T: Serialize + ?Sized,
    {
        self.manager.send(message)
    }

    /// Clears the shared history.
    pub fn clear_all(&self) {
        self.router.store().clear();
        self.shared.bump();
    }

    /// Removes one notification from the shared history.
    pub fn remove_one(&self, id: NotificationId) -> bool {
        let removed = self.router.store().remove(id);
        if removed {
            self.shared.bump();
        }
        removed
    }

    /// Marks one notification as read.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let found = self.router.store().mark_read(id);
        if found {
            self.shared.bump();
        }
        found
    }

    /// Receiver bumped on every state change and every new notification.
    #[must_use]
    pub fn updates(&self) -> watch::Receiver<u64> {
        self.updates.clone()
    }

    /// Number of subscriptions still held.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Releases every subscription. Same as dropping the binding.
    #[inline]
    pub fn unbind(self) {}

    fn release(&mut self) {
        let subscriptions = std::mem::take(&mut self.subscriptions);
        if subscriptions.is_empty() {
            return;
        }

        let count = subscriptions.len();
        for id in subscriptions {
            self.router.unsubscribe(id);
        }
        trace!(count, "View unbound");
    }
}

impl Drop for Binding {
    fn drop(&mut self) {
        self.release();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::notify::NotificationStore;
    use crate::transport::ReconnectPolicy;
    use crate::transport::testing::{TestServer, wait_until};

    fn bridge() -> (SubscriptionBridge, Arc<EventRouter>) {
        let router = Arc::new(EventRouter::new(Arc::new(NotificationStore::new())));
        let manager = ConnectionManager::new(
            "ws://127.0.0.1:9/notifications",
            ReconnectPolicy::default(),
            Duration::from_secs(1),
            Arc::clone(&router),
        );
        (SubscriptionBridge::new(manager, Arc::clone(&router)), router)
    }

    fn class_created() -> String {
        json!({
            "type": "CLASS_CREATED",
            "message": "New class",
            "data": { "classId": 7 }
        })
        .to_string()
    }

    #[test]
    fn test_bind_seeds_closed_state() {
        let (bridge, _router) = bridge();
        let binding = bridge.bind(BindCallbacks::new());

        assert_eq!(binding.state(), ConnectionState::Closed);
        assert!(!binding.is_connected());
        assert!(binding.notifications().is_empty());
        assert_eq!(binding.connection_status().reconnect_attempts, 0);
    }

    #[tokio::test]
    async fn test_bind_seeds_current_state() {
        let server = TestServer::bind().await;
        let router = Arc::new(EventRouter::new(Arc::new(NotificationStore::new())));
        let manager = ConnectionManager::new(
            server.url(),
            ReconnectPolicy::default(),
            Duration::from_secs(2),
            Arc::clone(&router),
        );
        let bridge = SubscriptionBridge::new(manager.clone(), router);

        manager.connect();
        let binding = bridge.bind(BindCallbacks::new());
        assert_eq!(binding.state(), ConnectionState::Connecting);

        let _peer = server.accept().await;
        wait_until(|| binding.is_connected()).await;
        assert_eq!(binding.state(), manager.state());

        manager.disconnect();
        wait_until(|| binding.state() == ConnectionState::Closed).await;
    }

    #[test]
    fn test_bind_registers_and_unbind_releases() {
        let (bridge, router) = bridge();
        let binding = bridge.bind(
            BindCallbacks::new()
                .on_class_created(|_| {})
                .on_class_deleted(|_| {}),
        );

        // Status, generic, and two typed
        assert_eq!(binding.subscription_count(), 4);
        assert_eq!(router.listener_count(), 4);

        bridge.unbind(binding);
        assert_eq!(router.listener_count(), 0);
    }

    #[test]
    fn test_drop_releases() {
        let (bridge, router) = bridge();
        {
            let _binding = bridge.bind(BindCallbacks::new().on_class_updated(|_| {}));
            assert_eq!(router.listener_count(), 3);
        }
        assert_eq!(router.listener_count(), 0);
    }

    #[test]
    fn test_typed_and_generic_callbacks_fire() {
        let (bridge, router) = bridge();
        let typed = Arc::new(AtomicUsize::new(0));
        let generic = Arc::new(AtomicUsize::new(0));

        let typed_count = Arc::clone(&typed);
        let generic_count = Arc::clone(&generic);
        let binding = bridge.bind(
            BindCallbacks::new()
                .on_class_created(move |data| {
                    assert_eq!(data["classId"], 7);
                    typed_count.fetch_add(1, Ordering::SeqCst);
                })
                .on_notification(move |n| {
                    assert_eq!(n.kind, "CLASS_CREATED");
                    generic_count.fetch_add(1, Ordering::SeqCst);
                }),
        );
        let updates = binding.updates();

        router.dispatch(&class_created());

        assert_eq!(typed.load(Ordering::SeqCst), 1);
        assert_eq!(generic.load(Ordering::SeqCst), 1);
        assert_eq!(binding.notifications().len(), 1);
        assert_eq!(*updates.borrow(), 1);
    }

    #[test]
    fn test_no_delivery_after_unbind() {
        let (bridge, router) = bridge();
        let calls = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&calls);
        let binding = bridge.bind(BindCallbacks::new().on_class_created(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        binding.unbind();
        router.dispatch(&class_created());

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        // History is still recorded
        assert_eq!(router.store().len(), 1);
    }

    #[test]
    fn test_state_follows_connection_events() {
        let (bridge, router) = bridge();
        let seen = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&seen);
        let binding = bridge.bind(BindCallbacks::new().on_connection(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }));

        router.emit_connection(&ConnectionEvent::Connecting { attempt: 0 });
        assert_eq!(binding.state(), ConnectionState::Connecting);

        router.emit_connection(&ConnectionEvent::Connected);
        assert!(binding.is_connected());

        router.emit_connection(&ConnectionEvent::Error {
            message: "reset".into(),
        });
        assert_eq!(binding.state(), ConnectionState::Errored);

        router.emit_connection(&ConnectionEvent::Disconnected {
            code: None,
            reason: "reset".into(),
        });
        assert_eq!(binding.state(), ConnectionState::Closed);
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert_eq!(*binding.updates().borrow(), 4);
    }

    #[test]
    fn test_remove_and_clear() {
        let (bridge, router) = bridge();
        let binding = bridge.bind(BindCallbacks::new());

        let first = router.dispatch(&class_created()).expect("valid frame");
        router.dispatch(&class_created());
        assert_eq!(binding.notifications().len(), 2);

        assert!(binding.mark_read(first.id));
        assert!(binding.remove_one(first.id));
        assert!(!binding.remove_one(first.id));
        assert_eq!(binding.notifications().len(), 1);

        binding.clear_all();
        assert!(binding.notifications().is_empty());
    }

    #[test]
    fn test_send_while_closed_is_dropped() {
        let (bridge, _router) = bridge();
        let binding = bridge.bind(BindCallbacks::new());
        assert!(!binding.send(&json!({ "type": "PING" })));
    }

    #[test]
    fn test_rebind_is_independent() {
        let (bridge, router) = bridge();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let count = Arc::clone(&first);
        let binding = bridge.bind(BindCallbacks::new().on_class_created(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        binding.unbind();

        let count = Arc::clone(&second);
        let rebound = bridge.bind(BindCallbacks::new().on_class_created(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        }));
        router.dispatch(&class_created());

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(router.listener_count(), rebound.subscription_count());
    }
}
