//! Local item collections kept current from a bus.
//!
//! An [`ItemStore`] is what a consumer of incoming bus traffic holds: it
//! upserts full items, removes items on tombstones, and keeps the per-type
//! board ordering after every change.

use std::cmp::Ordering;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::bus::{BusItem, Subscription, TopicBus};
use crate::errors::SyncError;
use crate::items::{ActionItem, Column, Item, Thought, Topic};

/// Board ordering for a stored item type.
pub trait Ordered: Item {
    fn board_order(a: &Self, b: &Self) -> Ordering;
}

/// Happy, confused, sad; undiscussed first within a topic; then by id.
impl Ordered for Thought {
    fn board_order(a: &Self, b: &Self) -> Ordering {
        a.topic
            .display_index()
            .cmp(&b.topic.display_index())
            .then(a.discussed.cmp(&b.discussed))
            .then(a.id.cmp(&b.id))
    }
}

/// Open items before completed ones, then by id.
impl Ordered for ActionItem {
    fn board_order(a: &Self, b: &Self) -> Ordering {
        a.completed.cmp(&b.completed).then(a.id.cmp(&b.id))
    }
}

impl Ordered for Column {
    fn board_order(a: &Self, b: &Self) -> Ordering {
        a.topic
            .display_index()
            .cmp(&b.topic.display_index())
            .then(a.id.cmp(&b.id))
    }
}

/// What [`ItemStore::apply`] did with an incoming value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change<T> {
    Inserted,
    Replaced,
    Removed(T),
    /// `None`, or a tombstone for an id that was never stored.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct ItemStore<T> {
    items: Vec<T>,
}

impl<T> Default for ItemStore<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Ordered> ItemStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Insert `item`, or replace the stored item with the same id in place.
    /// Returns true when the id was new.
    pub fn add_or_replace(&mut self, item: T) -> bool {
        match self.items.iter_mut().find(|existing| existing.id() == item.id()) {
            Some(existing) => {
                *existing = item;
                false
            }
            None => {
                self.items.push(item);
                true
            }
        }
    }

    /// Remove the stored item with `item`'s id and return it.
    pub fn delete(&mut self, item: &T) -> Result<T, SyncError> {
        let id = item.id();
        let index = self
            .items
            .iter()
            .position(|existing| existing.id() == id)
            .ok_or(SyncError::ItemNotFound { id })?;
        Ok(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn sort(&mut self) {
        self.items.sort_by(T::board_order);
    }

    /// Fold one incoming bus value into the store, keeping it sorted.
    pub fn apply(&mut self, incoming: Option<&T>) -> Change<T> {
        let Some(item) = incoming else {
            return Change::Ignored;
        };

        if item.is_deletion() {
            return match self.delete(item) {
                Ok(removed) => Change::Removed(removed),
                Err(e) => {
                    debug!(kind = %T::KIND, error = %e, "Ignoring delete for unknown item");
                    Change::Ignored
                }
            };
        }

        let inserted = self.add_or_replace(item.clone());
        self.sort();
        if inserted {
            Change::Inserted
        } else {
            Change::Replaced
        }
    }
}

impl ItemStore<Thought> {
    /// Thoughts in one column, in board order.
    pub fn of_topic(&self, topic: Topic) -> Vec<&Thought> {
        let mut thoughts: Vec<&Thought> = self.items.iter().filter(|t| t.topic == topic).collect();
        thoughts.sort_by(|a, b| Thought::board_order(a, b));
        thoughts
    }

    pub fn count_of_topic(&self, topic: Topic) -> usize {
        self.items.iter().filter(|t| t.topic == topic).count()
    }
}

impl ItemStore<Column> {
    /// Title of the column for `topic`, or empty when none is stored.
    pub fn title_for(&self, topic: Topic) -> &str {
        self.items
            .iter()
            .find(|c| c.topic == topic)
            .map(|c| c.title.as_str())
            .unwrap_or_default()
    }
}

/// A store shared with the bus callback that feeds it.
pub type SharedStore<T> = Arc<Mutex<ItemStore<T>>>;

/// Subscribe a fresh store to `bus`'s incoming side.
pub fn track<T: Ordered + BusItem>(bus: &TopicBus<T>) -> (SharedStore<T>, Subscription) {
    let store: SharedStore<T> = Arc::new(Mutex::new(ItemStore::new()));
    let sink = Arc::clone(&store);
    let subscription = bus.subscribe_incoming(move |item| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .apply(item);
    });
    (store, subscription)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::ThoughtChanges;

    fn thought(id: i64, topic: Topic, discussed: bool) -> Thought {
        Thought::new(id, format!("t{}", id), 0, topic, discussed, "team")
    }

    fn action_item(id: i64, completed: bool) -> ActionItem {
        ActionItem::new(id, format!("a{}", id), completed, "team", None, None)
    }

    fn ids<T: Item>(items: &[T]) -> Vec<i64> {
        items.iter().map(Item::id).collect()
    }

    #[test]
    fn test_add_or_replace_reports_insert() {
        let mut store = ItemStore::new();
        assert!(store.add_or_replace(thought(1, Topic::Happy, false)));
        assert!(!store.add_or_replace(thought(1, Topic::Happy, false).starred()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(1).unwrap().hearts, 1);
    }

    #[test]
    fn test_delete_missing_item_errors() {
        let mut store: ItemStore<Thought> = ItemStore::new();
        match store.delete(&Thought::tombstone(9, "team")) {
            Err(SyncError::ItemNotFound { id }) => assert_eq!(id, 9),
            other => panic!("Expected ItemNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_delete_returns_stored_item() {
        let mut store = ItemStore::new();
        store.add_or_replace(thought(4, Topic::Sad, false));
        let removed = store.delete(&Thought::tombstone(4, "team")).unwrap();
        assert_eq!(removed.message, "t4");
        assert!(store.is_empty());
    }

    #[test]
    fn test_thought_board_order() {
        let mut store = ItemStore::new();
        for t in [
            thought(5, Topic::Sad, false),
            thought(3, Topic::Happy, true),
            thought(4, Topic::Happy, false),
            thought(1, Topic::Confused, false),
            thought(2, Topic::Happy, false),
        ] {
            store.add_or_replace(t);
        }
        store.sort();
        assert_eq!(ids(store.items()), vec![2, 4, 3, 1, 5]);
        assert_eq!(
            store.of_topic(Topic::Happy).iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![2, 4, 3]
        );
        assert_eq!(store.count_of_topic(Topic::Happy), 3);
        assert_eq!(store.count_of_topic(Topic::Sad), 1);
    }

    #[test]
    fn test_action_item_board_order() {
        let mut store = ItemStore::new();
        for a in [action_item(3, true), action_item(2, false), action_item(1, true)] {
            store.add_or_replace(a);
        }
        store.sort();
        assert_eq!(ids(store.items()), vec![2, 1, 3]);
    }

    #[test]
    fn test_apply_upserts_and_deletes() {
        let mut store = ItemStore::new();
        assert_eq!(store.apply(Some(&thought(1, Topic::Happy, false))), Change::Inserted);
        let edited = thought(1, Topic::Happy, false).with_changes(ThoughtChanges {
            discussed: Some(true),
            ..Default::default()
        });
        assert_eq!(store.apply(Some(&edited)), Change::Replaced);
        assert!(store.get(1).unwrap().discussed);

        assert_eq!(
            store.apply(Some(&Thought::tombstone(1, "team"))),
            Change::Removed(edited)
        );
        assert_eq!(store.apply(Some(&Thought::tombstone(1, "team"))), Change::Ignored);
        assert_eq!(store.apply(None), Change::Ignored);
    }

    #[test]
    fn test_column_titles() {
        let mut store = ItemStore::new();
        store.apply(Some(&Column::new(2, Topic::Sad, "Sad", "team")));
        store.apply(Some(&Column::new(1, Topic::Happy, "Happy", "team")));
        assert_eq!(store.title_for(Topic::Happy), "Happy");
        assert_eq!(store.title_for(Topic::Confused), "");
        assert_eq!(ids(store.items()), vec![1, 2]);
    }

    #[test]
    fn test_track_follows_bus() {
        let bus = TopicBus::<ActionItem>::new();
        let (store, subscription) = track(&bus);

        bus.publish_incoming_list(&[action_item(2, true), action_item(1, false)]);
        bus.publish_incoming(Some(&ActionItem::tombstone(2, "team")));
        assert_eq!(ids(store.lock().unwrap().items()), vec![1]);

        subscription.cancel();
        bus.publish_incoming(Some(&action_item(7, false)));
        assert_eq!(store.lock().unwrap().len(), 1);
    }
}
