//! Per-item-type publish/subscribe channel.
//!
//! A [`TopicBus`] keeps two independent subscriber lists: *incoming*
//! (server → local consumers) and *outgoing* (local mutations → transport).
//! Publishing is a plain synchronous fan-out on the caller's thread, in
//! registration order. The bus has no failure modes of its own.
//!
//! Subscribers must not panic. A panicking callback unwinds through
//! `publish_*` and the remaining subscribers for that publish are skipped.
//!
//! The subscriber lists sit behind a mutex, but the lock is released before
//! callbacks run, so a callback may subscribe or publish on the same bus.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::items::{ActionItem, Column, Item, Thought};

/// Kind of local mutation carried by an outgoing publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutgoingAction {
    Create,
    Edit,
    Delete,
}

impl OutgoingAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for OutgoingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutgoingAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "edit" => Ok(Self::Edit),
            "delete" => Ok(Self::Delete),
            _ => Err(format!("Invalid action: {}", s)),
        }
    }
}

pub type IncomingCallback<T> = Arc<dyn Fn(Option<&T>) + Send + Sync>;
pub type OutgoingCallback<T> = Arc<dyn Fn(Option<&T>, OutgoingAction) + Send + Sync>;

struct Subscribers<T> {
    next_id: u64,
    incoming: Vec<(u64, IncomingCallback<T>)>,
    outgoing: Vec<(u64, OutgoingCallback<T>)>,
}

impl<T> Subscribers<T> {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Publish/subscribe channel for one item type. Clones share the same lists.
pub struct TopicBus<T> {
    inner: Arc<Mutex<Subscribers<T>>>,
}

impl<T> Clone for TopicBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for TopicBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for TopicBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subs = self.lock();
        f.debug_struct("TopicBus")
            .field("incoming", &subs.incoming.len())
            .field("outgoing", &subs.outgoing.len())
            .finish()
    }
}

impl<T> TopicBus<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Subscribers {
                next_id: 0,
                incoming: Vec::new(),
                outgoing: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Subscribers<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn incoming_count(&self) -> usize {
        self.lock().incoming.len()
    }

    pub fn outgoing_count(&self) -> usize {
        self.lock().outgoing.len()
    }

    pub fn clear_outgoing_subscribers(&self) {
        self.lock().outgoing.clear();
    }

    pub fn clear_all_subscribers(&self) {
        let mut subs = self.lock();
        subs.incoming.clear();
        subs.outgoing.clear();
    }
}

impl<T: Send + 'static> TopicBus<T> {
    /// Register a callback for every incoming item. Registering the same
    /// closure twice yields two subscribers.
    pub fn subscribe_incoming<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&T>) + Send + Sync + 'static,
    {
        let id = {
            let mut subs = self.lock();
            let id = subs.allocate_id();
            let callback: IncomingCallback<T> = Arc::new(callback);
            subs.incoming.push((id, callback));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            remove_subscriber(&weak, |subs| subs.incoming.retain(|(sid, _)| *sid != id))
        })
    }

    pub fn subscribe_outgoing<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&T>, OutgoingAction) + Send + Sync + 'static,
    {
        let id = {
            let mut subs = self.lock();
            let id = subs.allocate_id();
            let callback: OutgoingCallback<T> = Arc::new(callback);
            subs.outgoing.push((id, callback));
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            remove_subscriber(&weak, |subs| subs.outgoing.retain(|(sid, _)| *sid != id))
        })
    }

    /// Invoke every incoming subscriber. `None` signals "no item".
    pub fn publish_incoming(&self, item: Option<&T>) {
        let callbacks: Vec<IncomingCallback<T>> =
            self.lock().incoming.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(item);
        }
    }

    /// Publish each item in order; an empty slice publishes `None` once.
    pub fn publish_incoming_list(&self, items: &[T]) {
        if items.is_empty() {
            self.publish_incoming(None);
            return;
        }
        for item in items {
            self.publish_incoming(Some(item));
        }
    }

    pub fn publish_outgoing(&self, item: Option<&T>, action: OutgoingAction) {
        let callbacks: Vec<OutgoingCallback<T>> =
            self.lock().outgoing.iter().map(|(_, cb)| Arc::clone(cb)).collect();
        for callback in callbacks {
            callback(item, action);
        }
    }
}

fn remove_subscriber<T>(weak: &Weak<Mutex<Subscribers<T>>>, remove: impl FnOnce(&mut Subscribers<T>)) {
    if let Some(inner) = weak.upgrade() {
        let mut subs = inner.lock().unwrap_or_else(PoisonError::into_inner);
        remove(&mut subs);
    }
}

/// Handle for one registered callback.
///
/// Dropping the handle leaves the subscriber registered; call
/// [`Subscription::cancel`] to remove just this one.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove this subscriber. A no-op if the bus was already cleared or dropped.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// The three independent buses the sync core works with.
#[derive(Debug, Clone, Default)]
pub struct Buses {
    pub thoughts: TopicBus<Thought>,
    pub action_items: TopicBus<ActionItem>,
    pub columns: TopicBus<Column>,
}

impl Buses {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_outgoing_subscribers(&self) {
        self.columns.clear_outgoing_subscribers();
        self.action_items.clear_outgoing_subscribers();
        self.thoughts.clear_outgoing_subscribers();
    }

    pub fn clear_all_subscribers(&self) {
        self.thoughts.clear_all_subscribers();
        self.action_items.clear_all_subscribers();
        self.columns.clear_all_subscribers();
    }

    pub fn bus<T: BusItem>(&self) -> &TopicBus<T> {
        T::bus_of(self)
    }
}

/// Items that have a dedicated bus inside [`Buses`].
pub trait BusItem: Item {
    fn bus_of(buses: &Buses) -> &TopicBus<Self>;
}

impl BusItem for Thought {
    fn bus_of(buses: &Buses) -> &TopicBus<Self> {
        &buses.thoughts
    }
}

impl BusItem for ActionItem {
    fn bus_of(buses: &Buses) -> &TopicBus<Self> {
        &buses.action_items
    }
}

impl BusItem for Column {
    fn bus_of(buses: &Buses) -> &TopicBus<Self> {
        &buses.columns
    }
}
