//! Frame classification and subscriber fan-out.
//!
//! # Dispatch Contract
//!
//! For every text frame:
//!
//! 1. Decode. Malformed frames are logged and dropped here.
//! 2. Record the [`Notification`] in the [`NotificationStore`].
//! 3. If the tag maps to an [`EventKey`], call every listener on that key
//!    with the frame's `data`.
//! 4. Call every generic listener with the full [`Notification`].
//!
//! Typed listeners always run before generic ones. Within a group, listeners
//! run in registration order. A panicking listener is logged and skipped; the
//! rest still run.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::identifiers::SubscriptionId;
use crate::protocol::{EventKey, InboundFrame, Notification};
use crate::transport::ConnectionEvent;

use super::store::NotificationStore;

// ============================================================================
// Constants
// ============================================================================

/// Characters of a rejected frame kept in the warning log.
const MALFORMED_PREVIEW_CHARS: usize = 128;

// ============================================================================
// Types
// ============================================================================

/// Callback for a typed key. Receives the frame's `data`.
pub type PayloadCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Callback for the generic channel. Receives the full record.
pub type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

/// Callback for connection lifecycle signals.
pub type ConnectionCallback = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

// ============================================================================
// Listener
// ============================================================================

/// A callback together with what it listens to.
#[derive(Clone)]
pub enum Listener {
    /// Frames whose tag maps to the given key.
    Event(EventKey, PayloadCallback),
    /// Every decoded frame (the generic channel).
    Notification(NotificationCallback),
    /// Connection lifecycle signals.
    Connection(ConnectionCallback),
}

impl Listener {
    /// Wraps a closure as a typed-key listener.
    pub fn event<F>(key: EventKey, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        Self::Event(key, Arc::new(callback))
    }

    /// Wraps a closure as a generic-channel listener.
    pub fn notification<F>(callback: F) -> Self
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        Self::Notification(Arc::new(callback))
    }

    /// Wraps a closure as a connection listener.
    pub fn connection<F>(callback: F) -> Self
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        Self::Connection(Arc::new(callback))
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event(key, _) => f.debug_tuple("Event").field(key).finish_non_exhaustive(),
            Self::Notification(_) => f.write_str("Notification(..)"),
            Self::Connection(_) => f.write_str("Connection(..)"),
        }
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Listener lists, each in registration order.
#[derive(Default)]
struct Registry {
    typed: FxHashMap<EventKey, Vec<(SubscriptionId, PayloadCallback)>>,
    generic: Vec<(SubscriptionId, NotificationCallback)>,
    connection: Vec<(SubscriptionId, ConnectionCallback)>,
}

impl Registry {
    fn insert(&mut self, id: SubscriptionId, listener: Listener) {
        match listener {
            Listener::Event(key, callback) => {
                self.typed.entry(key).or_default().push((id, callback));
            }
            Listener::Notification(callback) => self.generic.push((id, callback)),
            Listener::Connection(callback) => self.connection.push((id, callback)),
        }
    }

    fn remove(&mut self, id: SubscriptionId) -> bool {
        for list in self.typed.values_mut() {
            if let Some(index) = list.iter().position(|(sid, _)| *sid == id) {
                list.remove(index);
                return true;
            }
        }

        if let Some(index) = self.generic.iter().position(|(sid, _)| *sid == id) {
            self.generic.remove(index);
            return true;
        }

        if let Some(index) = self.connection.iter().position(|(sid, _)| *sid == id) {
            self.connection.remove(index);
            return true;
        }

        false
    }

    fn len(&self) -> usize {
        self.typed.values().map(Vec::len).sum::<usize>()
            + self.generic.len()
            + self.connection.len()
    }
}

// ============================================================================
// EventRouter
// ============================================================================

/// Decodes frames, records them, and fans them out to listeners.
///
/// Callbacks are cloned out of the registry before they run, so a callback
/// may subscribe or unsubscribe without deadlocking.
pub struct EventRouter {
    registry: RwLock<Registry>,
    store: Arc<NotificationStore>,
}

impl fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventRouter")
            .field("listeners", &self.listener_count())
            .field("history", &self.store.len())
            .finish()
    }
}

impl EventRouter {
    /// Creates a router that records into `store`.
    #[must_use]
    pub fn new(store: Arc<NotificationStore>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            store,
        }
    }

    /// The store this router records into.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a listener and returns its token.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId::next();
        trace!(subscription = %id, ?listener, "Listener registered");
        self.registry.write().insert(id, listener);
        id
    }

    /// Removes the listener registered under `id`.
    ///
    /// Returns `false` (and logs a warning) if no such listener exists.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.registry.write().remove(id);
        if removed {
            trace!(subscription = %id, "Listener removed");
        } else {
            warn!(subscription = %id, "Unsubscribe for unknown subscription");
        }
        removed
    }

    /// Subscribes to a typed key.
    pub fn on<F>(&self, key: EventKey, callback: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe(Listener::event(key, callback))
    }

    /// Subscribes to the generic channel.
    pub fn on_notification<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(Listener::notification(callback))
    }

    /// Subscribes to connection lifecycle signals.
    pub fn on_connection<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        self.subscribe(Listener::connection(callback))
    }

    /// Total number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.registry.read().len()
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Handles one raw text frame.
    ///
    /// Returns the recorded notification, or `None` if the frame was dropped.
    pub fn dispatch(&self, raw: &str) -> Option<Notification> {
        let frame = match InboundFrame::decode(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(
                    error = %e,
                    len = raw.len(),
                    preview = %preview(raw),
                    "Dropping malformed frame"
                );
                return None;
            }
        };

        Some(self.dispatch_frame(frame))
    }

    /// Handles an already decoded frame.
    pub fn dispatch_frame(&self, frame: InboundFrame) -> Notification {
        let notification = Notification::from_frame(frame);
        let key = notification.event_key();

        debug!(
            id = %notification.id,
            kind = %notification.kind,
            typed = key.is_some(),
            "Dispatching notification"
        );

        self.store.record(notification.clone());

        let (typed, generic) = {
            let registry = self.registry.read();
            let typed: Vec<PayloadCallback> = key
                .and_then(|k| registry.typed.get(&k))
                .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            let generic: Vec<NotificationCallback> =
                registry.generic.iter().map(|(_, cb)| Arc::clone(cb)).collect();
            (typed, generic)
        };

        for callback in typed {
            invoke(&notification.kind, || callback(&notification.data));
        }

        for callback in generic {
            invoke(&notification.kind, || callback(&notification));
        }

        notification
    }

    /// Delivers a connection lifecycle signal to connection listeners.
    pub fn emit_connection(&self, event: &ConnectionEvent) {
        let listeners: Vec<ConnectionCallback> = self
            .registry
            .read()
            .connection
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        trace!(?event, listeners = listeners.len(), "Emitting connection event");

        for callback in listeners {
            invoke("connection", || callback(event));
        }
    }
}

/// Leading slice of `raw`, cut on a character boundary.
fn preview(raw: &str) -> &str {
    raw.char_indices()
        .nth(MALFORMED_PREVIEW_CHARS)
        .map_or(raw, |(end, _)| &raw[..end])
}

/// Runs one listener, containing any panic.
fn invoke(channel: &str, f: impl FnOnce()) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(f)) {
        let message = panic
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(channel, panic = %message, "Listener panicked");
    }
}

// ============================================================================
// Tests
// ============================================================================
