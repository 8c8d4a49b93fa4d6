//! Synchronous publish/subscribe bus over a tagged-union event type.
//!
//! Handlers are keyed by the event's *kind* (a plain `Copy` discriminant) and
//! run on the publishing call stack, in subscription order. There is no
//! queue and no cross-frame delay. Publishing a kind nobody listens to is a
//! no-op.
//!
//! Handlers are owned closures; they cannot reach back into the bus or the
//! scene while it is dispatching. A subscriber that needs to act on an event
//! with access to its own entity forwards the payload into an [`Inbox`] and
//! drains it during its next update.
//!
//! Subscribers unsubscribe themselves (typically when their entity is
//! destroyed). The bus does not know which entity owns a handler.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use tracing::trace;

// ---------------------------------------------------------------------------
// BusEvent
// ---------------------------------------------------------------------------

/// An event type the bus can dispatch.
pub trait BusEvent {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

// ---------------------------------------------------------------------------
// SubscriptionId
// ---------------------------------------------------------------------------

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

type Handler<E> = Box<dyn FnMut(&E)>;

pub struct EventBus<E: BusEvent> {
    handlers: HashMap<E::Kind, Vec<(SubscriptionId, Handler<E>)>>,
    next_id: u64,
    published: u64,
}

impl<E: BusEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            next_id: 0,
            published: 0,
        }
    }
}

impl<E: BusEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for every future event of `kind`.
    pub fn subscribe<F>(&mut self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));
        trace!(kind = ?kind, subscription = id.0, "subscribed");
        id
    }

    /// Remove a handler. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for list in self.handlers.values_mut() {
            if let Some(pos) = list.iter().position(|(sid, _)| *sid == id) {
                // `remove`, not `swap_remove`: dispatch order is subscription order.
                list.remove(pos);
                return true;
            }
        }
        false
    }

    /// Invoke every handler registered for the event's kind, in subscription
    /// order. Returns how many handlers ran.
    pub fn publish(&mut self, event: &E) -> usize {
        self.published += 1;
        let kind = event.kind();
        let Some(list) = self.handlers.get_mut(&kind) else {
            trace!(kind = ?kind, "published with no subscribers");
            return 0;
        };
        for (_, handler) in list.iter_mut() {
            handler(event);
        }
        list.len()
    }

    pub fn subscriber_count(&self, kind: E::Kind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Total handlers across all kinds.
    pub fn total_subscribers(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Number of `publish` calls since construction.
    pub fn published_count(&self) -> u64 {
        self.published
    }

    /// Subscribe a handler that maps each event of `kind` into `inbox`.
    ///
    /// Events for which `map` returns `None` are skipped.
    pub fn forward<T, F>(&mut self, kind: E::Kind, inbox: &Inbox<T>, map: F) -> SubscriptionId
    where
        T: 'static,
        F: Fn(&E) -> Option<T> + 'static,
    {
        let sink = inbox.clone();
        self.subscribe(kind, move |event| {
            if let Some(item) = map(event) {
                sink.push(item);
            }
        })
    }
}

impl<E: BusEvent> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("kinds", &self.handlers.len())
            .field("subscribers", &self.total_subscribers())
            .field("published", &self.published)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Inbox
// ---------------------------------------------------------------------------

/// Shared FIFO mailbox filled by bus handlers and drained by its owner.
///
/// Cloning an inbox yields another handle to the same queue.
pub struct Inbox<T> {
    queue: Rc<RefCell<VecDeque<T>>>,
}

impl<T> Clone for Inbox<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Rc::clone(&self.queue),
        }
    }
}

impl<T> Default for Inbox<T> {
    fn default() -> Self {
        Self {
            queue: Rc::new(RefCell::new(VecDeque::new())),
        }
    }
}

impl<T> Inbox<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, item: T) {
        self.queue.borrow_mut().push_back(item);
    }

    /// Take every queued item, oldest first.
    pub fn drain(&self) -> Vec<T> {
        self.queue.borrow_mut().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl<T> fmt::Debug for Inbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inbox(len={})", self.len())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
