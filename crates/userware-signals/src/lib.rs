//! # userware-signals
//!
//! A small signal dispatcher. Account events (such as a staff member
//! switching to another user) are announced through a [`Signal`] owned by
//! the application state; receivers are connected at startup.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use userware_signals::Signal;
//!
//! struct Switched {
//!     target: String,
//! }
//!
//! let signal: Signal<Switched> = Signal::new();
//! signal.connect("audit", Arc::new(|event: &Switched| {
//!     println!("switched to {}", event.target);
//! }));
//!
//! assert_eq!(signal.send(&Switched { target: "bob".into() }), 1);
//! ```

use std::sync::{Arc, PoisonError, RwLock};

/// The type signature for a signal receiver callback.
pub type SignalReceiver<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A signal that can be connected to and dispatched.
///
/// Receivers are called synchronously, in the order they were connected.
pub struct Signal<T: 'static> {
    receivers: RwLock<Vec<(String, SignalReceiver<T>)>>,
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("receivers", &self.receiver_ids())
            .finish()
    }
}

impl<T: 'static> Signal<T> {
    /// Creates a new signal with no connected receivers.
    pub fn new() -> Self {
        Self {
            receivers: RwLock::new(Vec::new()),
        }
    }

    /// Connects a receiver to this signal.
    ///
    /// A receiver connected under an existing ID replaces the previous one
    /// in place.
    pub fn connect(&self, receiver_id: impl Into<String>, callback: SignalReceiver<T>) {
        let id = receiver_id.into();
        let mut receivers = self.receivers.write().unwrap_or_else(PoisonError::into_inner);

        if let Some(entry) = receivers.iter_mut().find(|(rid, _)| *rid == id) {
            entry.1 = callback;
        } else {
            receivers.push((id, callback));
        }
    }

    /// Disconnects the receiver with the given ID.
    ///
    /// Returns `true` if a receiver was found and removed.
    pub fn disconnect(&self, receiver_id: &str) -> bool {
        let mut receivers = self.receivers.write().unwrap_or_else(PoisonError::into_inner);
        let len_before = receivers.len();
        receivers.retain(|(id, _)| id != receiver_id);
        receivers.len() < len_before
    }

    /// Sends the signal to all connected receivers and returns how many ran.
    pub fn send(&self, payload: &T) -> usize {
        // Snapshot so receivers may connect or disconnect without deadlocking.
        let receivers: Vec<_> = self
            .receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        tracing::trace!(receivers = receivers.len(), "dispatching signal");
        for callback in &receivers {
            callback(payload);
        }
        receivers.len()
    }

    /// Returns the number of connected receivers.
    pub fn receiver_count(&self) -> usize {
        self.receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns the connected receiver IDs in dispatch order.
    pub fn receiver_ids(&self) -> Vec<String> {
        self.receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, _)| id.clone())
            .collect()
    }
}
