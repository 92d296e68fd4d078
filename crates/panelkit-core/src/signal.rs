//! Observer lists with typed payloads.
//!
//! Models announce mutations through a [`Signal`]; views and widgets subscribe
//! closures to it. The payload is a concrete type per signal (a delta struct,
//! a size, a key path), never a dynamically typed argument list.
//!
//! - [`Signal<Args>`]: the observer list
//! - [`ConnectionId`]: handle returned by [`Signal::connect`]
//! - [`ConnectionGuard`]: disconnects its slot on drop
//!
//! # Delivery
//!
//! `emit` runs every slot synchronously on the calling thread, in the order
//! the slots were connected. Slots are snapshotted first: a slot may connect
//! or disconnect (itself included) and the change applies to the next `emit`.
//!
//! ```
//! use panelkit_core::Signal;
//!
//! // (index, removed count, inserted count)
//! let items_replaced = Signal::<(usize, usize, usize)>::new();
//! let id = items_replaced.connect(|&(index, removed, inserted)| {
//!     println!("{removed} removed and {inserted} inserted at {index}");
//! });
//!
//! items_replaced.emit((0, 0, 1));
//! assert!(items_replaced.disconnect(id));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Identifies one connected slot; pass it to [`Signal::disconnect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

struct Connections<Args> {
    ids: SlotMap<ConnectionId, ()>,
    /// Slots in connection order.
    slots: Vec<(ConnectionId, Slot<Args>)>,
}

/// An ordered list of slots notified with `&Args` on every [`emit`](Self::emit).
///
/// Use `()` for payload-less notifications and a struct or tuple when several
/// values travel together.
pub struct Signal<Args> {
    connections: Mutex<Connections<Args>>,
    blocked: AtomicBool,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(Connections {
                ids: SlotMap::with_key(),
                slots: Vec::new(),
            }),
            blocked: AtomicBool::new(false),
        }
    }

    /// Subscribe `slot`; it runs after every slot connected before it.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let mut connections = self.connections.lock();
        let id = connections.ids.insert(());
        connections.slots.push((id, Arc::new(slot)));
        tracing::trace!(target: targets::SIGNAL, ?id, "slot connected");
        id
    }

    /// Subscribe `slot` for the lifetime of the returned guard.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use panelkit_core::Signal;
    ///
    /// let resized = Signal::<f32>::new();
    /// let calls = Arc::new(AtomicUsize::new(0));
    /// {
    ///     let calls = calls.clone();
    ///     let _guard = resized.connect_scoped(move |_| {
    ///         calls.fetch_add(1, Ordering::SeqCst);
    ///     });
    ///     resized.emit(200.0);
    /// }
    /// resized.emit(250.0);
    /// assert_eq!(calls.load(Ordering::SeqCst), 1);
    /// ```
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            signal: self,
            id: self.connect(slot),
        }
    }

    /// Remove the slot behind `id`. Returns `false` if it was already gone.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.lock();
        if connections.ids.remove(id).is_none() {
            return false;
        }
        connections.slots.retain(|(slot_id, _)| *slot_id != id);
        tracing::trace!(target: targets::SIGNAL, ?id, "slot disconnected");
        true
    }

    pub fn disconnect_all(&self) {
        let mut connections = self.connections.lock();
        connections.ids.clear();
        connections.slots.clear();
    }

    pub fn connection_count(&self) -> usize {
        self.connections.lock().slots.len()
    }

    /// While blocked, [`emit`](Self::emit) drops the payload.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Run every connected slot with `args`.
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "emit suppressed, signal is blocked");
            return;
        }
        let slots: Vec<Slot<Args>> = self
            .connections
            .lock()
            .slots
            .iter()
            .map(|(_, slot)| slot.clone())
            .collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emit");
        for slot in &slots {
            slot(&args);
        }
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("slots", &self.connections.lock().slots.len())
            .field("blocked", &self.blocked.load(Ordering::SeqCst))
            .finish()
    }
}

/// Keeps one slot connected until dropped. See [`Signal::connect_scoped`].
pub struct ConnectionGuard<'a, Args: Send + 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: Send + 'static> ConnectionGuard<'_, Args> {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: Send + 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}
