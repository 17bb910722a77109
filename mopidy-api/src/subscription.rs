//! Push event subscriptions
//!
//! [`EventSource`] is the seam between the socket layer that receives Mopidy
//! notifications and the code reacting to them. [`EventHub`] is the in-process
//! implementation: the socket reader feeds raw messages into
//! [`EventHub::deliver_raw`] and the hub fans them out to the handlers
//! registered for each [`EventKind`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::events::{Event, EventKind};
use crate::Result;

/// Callback invoked for each delivered event of the subscribed kind
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Token returned by [`EventSource::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Anything able to deliver Mopidy push events to registered handlers
pub trait EventSource: Send + Sync {
    /// Register `handler` for events of `kind`
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId;

    /// Drop a registration; `false` when the id is unknown
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Whether the underlying connection still delivers events
    fn is_alive(&self) -> bool;

    /// Re-establish the connection
    ///
    /// Registrations do not survive a reconnect; callers subscribe again
    /// afterwards.
    fn reconnect(&self) -> Result<()>;
}

/// In-process [`EventSource`] fed by a socket reader
pub struct EventHub {
    handlers: RwLock<HashMap<SubscriptionId, (EventKind, EventHandler)>>,
    next_id: AtomicU64,
    alive: AtomicBool,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("handlers", &self.handlers.read().len())
            .field("alive", &self.is_alive())
            .finish()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            alive: AtomicBool::new(true),
        }
    }

    /// Dispatch an event to every handler of its kind, returning how many ran
    pub fn deliver(&self, event: &Event) -> usize {
        let kind = event.kind();
        // Handlers run outside the lock so they may subscribe or unsubscribe
        let targets: Vec<EventHandler> = self
            .handlers
            .read()
            .values()
            .filter(|(k, _)| *k == kind)
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        for handler in &targets {
            handler(event);
        }
        targets.len()
    }

    /// Decode a raw socket message and dispatch it
    ///
    /// Returns the number of handlers that ran; untracked messages run none.
    pub fn deliver_raw(&self, text: &str) -> Result<usize> {
        match Event::from_json(text)? {
            Some(event) => Ok(self.deliver(&event)),
            None => {
                tracing::trace!("Ignoring untracked message: {}", text);
                Ok(0)
            }
        }
    }

    /// Called by the socket reader when the connection drops
    pub fn mark_disconnected(&self) {
        if self.alive.swap(false, Ordering::SeqCst) {
            tracing::warn!("Event connection lost");
        }
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl EventSource for EventHub {
    fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().insert(id, (kind, handler));
        tracing::debug!("Subscribed {:?} to {}", id, kind);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.handlers.write().remove(&id).is_some()
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn reconnect(&self) -> Result<()> {
        let dropped = {
            let mut handlers = self.handlers.write();
            let count = handlers.len();
            handlers.clear();
            count
        };
        self.alive.store(true, Ordering::SeqCst);
        tracing::info!("Event connection re-established, dropped {} registrations", dropped);
        Ok(())
    }
}
