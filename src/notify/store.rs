//! Bounded notification history.
//!
//! Most-recent-first sequence backed by a `VecDeque`: `record` pushes to the
//! front and pops from the back once the capacity is exceeded, so the oldest
//! entry is always the one evicted.
//!
//! Every mutation bumps a revision counter published on a
//! [`tokio::sync::watch`] channel, so views can re-read a snapshot when the
//! history changes.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::identifiers::NotificationId;
use crate::protocol::Notification;

// ============================================================================
// Constants
// ============================================================================

/// Default number of notifications retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

// ============================================================================
// NotificationStore
// ============================================================================

/// Capacity-bounded, most-recent-first notification history.
///
/// Readers get owned snapshots; the live sequence never leaves the store.
#[derive(Debug)]
pub struct NotificationStore {
    entries: RwLock<VecDeque<Notification>>,
    capacity: usize,
    revision: watch::Sender<u64>,
}

impl Default for NotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationStore {
    /// Creates a store with the default capacity of 100.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    /// Creates a store holding at most `capacity` entries (minimum 1).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity + 1)),
            capacity,
            revision: watch::channel(0).0,
        }
    }

    /// Maximum number of retained entries.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current revision. Increases on every mutation.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    /// Receiver that observes every revision bump.
    #[must_use]
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    /// Prepends a notification, evicting the oldest if over capacity.
    pub fn record(&self, notification: Notification) {
        {
            let mut entries = self.entries.write();
            trace!(id = %notification.id, kind = %notification.kind, "Recording notification");
            entries.push_front(notification);
            while entries.len() > self.capacity {
                if let Some(evicted) = entries.pop_back() {
                    trace!(id = %evicted.id, "Evicted oldest notification");
                }
            }
        }
        self.bump();
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let count = {
            let mut entries = self.entries.write();
            let count = entries.len();
            entries.clear();
            count
        };
        debug!(count, "Cleared notification history");
        self.bump();
    }

    /// Removes the entry with `id`. Returns `false` if it was not present.
    pub fn remove(&self, id: NotificationId) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            match entries.iter().position(|n| n.id == id) {
                Some(index) => entries.remove(index).is_some(),
                None => false,
            }
        };
        if removed {
            self.bump();
        }
        removed
    }

    /// Marks one entry as read. Returns `false` if it was not present.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let found = {
            let mut entries = self.entries.write();
            match entries.iter_mut().find(|n| n.id == id) {
                Some(notification) => {
                    notification.read = true;
                    true
                }
                None => false,
            }
        };
        if found {
            self.bump();
        }
        found
    }

    /// Marks every entry as read.
    pub fn mark_all_read(&self) {
        for notification in self.entries.write().iter_mut() {
            notification.read = true;
        }
        self.bump();
    }

    /// Returns a copy of the history, most recent first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Notification> {
        self.entries.read().iter().cloned().collect()
    }

    /// Returns a copy of one entry.
    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<Notification> {
        self.entries.read().iter().find(|n| n.id == id).cloned()
    }

    /// Returns a copy of the most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<Notification> {
        self.entries.read().front().cloned()
    }

    /// Number of retained entries.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is retained.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of entries not yet marked read.
    #[must_use]
    pub fn unread_count(&self) -> usize {
        self.entries.read().iter().filter(|n| !n.read).count()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::InboundFrame;
    use proptest::prelude::*;
    use serde_json::json;

    fn notification(seq: usize) -> Notification {
        Notification::from_frame(InboundFrame {
            kind: "ANNOUNCEMENT".into(),
            message: Some(format!("message {seq}")),
            data: json!({ "seq": seq }),
        })
    }

    #[test]
    fn test_record_prepends() {
        let store = NotificationStore::new();
        store.record(notification(1));
        store.record(notification(2));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].data["seq"], 2);
        assert_eq!(snapshot[1].data["seq"], 1);
        assert_eq!(store.latest().map(|n| n.data["seq"].clone()), Some(json!(2)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let store = NotificationStore::new();
        for seq in 0..150 {
            store.record(notification(seq));
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 100);
        assert_eq!(snapshot[0].data["seq"], 149);
        assert_eq!(snapshot[99].data["seq"], 50);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let store = NotificationStore::with_capacity(0);
        assert_eq!(store.capacity(), 1);
        store.record(notification(1));
        store.record(notification(2));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove() {
        let store = NotificationStore::new();
        let first = notification(1);
        let id = first.id;
        store.record(first);
        store.record(notification(2));

        assert!(store.remove(id));
        assert_eq!(store.len(), 1);
        assert!(store.get(id).is_none());

        // Second removal is a no-op
        assert!(!store.remove(id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_clear() {
        let store = NotificationStore::new();
        store.record(notification(1));
        store.clear();
        assert!(store.is_empty());
        assert!(store.latest().is_none());
    }

    #[test]
    fn test_mark_read() {
        let store = NotificationStore::new();
        let n = notification(1);
        let id = n.id;
        store.record(n);
        store.record(notification(2));
        assert_eq!(store.unread_count(), 2);

        assert!(store.mark_read(id));
        assert_eq!(store.unread_count(), 1);
        assert!(store.get(id).is_some_and(|n| n.read));
        assert!(!store.mark_read(NotificationId::generate()));

        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn test_revision_tracks_mutations() {
        let store = NotificationStore::new();
        let changes = store.changes();
        assert_eq!(store.revision(), 0);

        let n = notification(1);
        let id = n.id;
        store.record(n);
        assert_eq!(store.revision(), 1);
        assert!(changes.has_changed().expect("sender alive"));

        // Misses do not bump
        assert!(!store.remove(NotificationId::generate()));
        assert_eq!(store.revision(), 1);

        assert!(store.remove(id));
        store.clear();
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = NotificationStore::new();
        store.record(notification(1));

        let mut snapshot = store.snapshot();
        snapshot.clear();
        assert_eq!(store.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(count in 0usize..400, capacity in 1usize..150) {
            let store = NotificationStore::with_capacity(capacity);
            for seq in 0..count {
                store.record(notification(seq));
                prop_assert!(store.len() <= capacity);
            }
            prop_assert_eq!(store.len(), count.min(capacity));
            if count > 0 {
                prop_assert_eq!(store.snapshot()[0].data["seq"].as_u64(), Some((count - 1) as u64));
            }
        }
    }
}
