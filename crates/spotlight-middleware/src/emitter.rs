//! Synchronous, in-process event emission.
//!
//! The [`EventBus`][crate::bus::EventBus] carries traffic between tasks.  For
//! observers that live next to a component (a logger, a bus forwarder, a
//! test probe) components implement the [`Emitter`] capability instead and
//! delegate to an [`EventHub`].
//!
//! ```rust
//! use spotlight_middleware::emitter::{Emitter, EventHub, NamedEvent};
//!
//! struct Ping;
//! impl NamedEvent for Ping {
//!     fn name(&self) -> &'static str { "ping" }
//! }
//!
//! let mut hub: EventHub<Ping> = EventHub::new();
//! let id = hub.on("ping", Box::new(|_: &Ping| println!("pong")));
//! assert_eq!(hub.emit(&Ping), 1);
//! assert!(hub.off(id));
//! assert_eq!(hub.emit(&Ping), 0);
//! ```

/// Listener name that receives every event regardless of its name.
pub const ANY_EVENT: &str = "*";

/// Events carry a stable name such as `"hotspot.clicked"`.
pub trait NamedEvent {
    fn name(&self) -> &'static str;
}

/// Callback registered with [`Emitter::on`].
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Token returned by [`Emitter::on`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Publish/subscribe capability of a component.
pub trait Emitter<E: NamedEvent> {
    /// Register `listener` for events called `name` (or [`ANY_EVENT`]).
    fn on(&mut self, name: &'static str, listener: Listener<E>) -> ListenerId;

    /// Unregister a listener.  Returns `false` if it was not registered.
    fn off(&mut self, id: ListenerId) -> bool;

    /// Deliver `event` to every matching listener, in registration order.
    /// Returns the number of listeners invoked.
    fn emit(&mut self, event: &E) -> usize;
}

/// Plain listener table implementing [`Emitter`].
pub struct EventHub<E> {
    next_id: u64,
    listeners: Vec<(ListenerId, &'static str, Listener<E>)>,
}

impl<E> EventHub<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<E: NamedEvent> Emitter<E> for EventHub<E> {
    fn on(&mut self, name: &'static str, listener: Listener<E>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, name, listener));
        id
    }

    fn off(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _, _)| *lid != id);
        self.listeners.len() != before
    }

    fn emit(&mut self, event: &E) -> usize {
        let name = event.name();
        let mut invoked = 0;
        for (_, wanted, listener) in &mut self.listeners {
            if *wanted == name || *wanted == ANY_EVENT {
                listener(event);
                invoked += 1;
            }
        }
        invoked
    }
}
