//! [`ObservableList<T>`]: an indexable sequence announcing every structural
//! change.
//!
//! # Notification order
//!
//! Each successful mutation:
//!
//! 1. raises [`COUNT_KEY`] when the length may have changed,
//! 2. raises [`ITEMS_KEY`],
//! 3. raises exactly one [`CollectionChanged`] while the list's
//!    [`ReentrancyMonitor`] is held.
//!
//! # Reentrancy
//!
//! A collection-changed subscriber that mutates the list while the monitor
//! is busy gets [`Error::InvalidState`] if more than one collection-changed
//! subscriber exists, since the others would observe the list out of step
//! with the event they are handling. A sole subscriber may mutate freely.
//! [`ObservableList::block_reentrancy`] holds the monitor explicitly.
//!
//! # Failure Modes
//!
//! Index errors return [`Error::IndexOutOfRange`] and leave the list
//! untouched. Nothing is raised for a failed mutation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_core::{Error, Notifier, NotifyPropertyChanged, PropertyChanged, Result, Subscription};
use tracing::trace;

use crate::change::CollectionChanged;
use crate::monitor::{ReentrancyGuard, ReentrancyMonitor};

/// Key raised when the number of items changed.
pub const COUNT_KEY: &str = "Count";

/// Key raised when the item at any index may have changed.
pub const ITEMS_KEY: &str = "Item[]";

struct Inner<T> {
    items: RefCell<Vec<T>>,
    collection_changed: Notifier<CollectionChanged<T>>,
    property_changed: Notifier<PropertyChanged>,
    monitor: ReentrancyMonitor,
}

/// Observable, reentrancy-guarded list. Clones share the same list.
pub struct ObservableList<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + 'static> FromIterator<T> for ObservableList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// A list holding `items`. Nothing is raised.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            inner: Rc::new(Inner {
                items: RefCell::new(items),
                collection_changed: Notifier::new(),
                property_changed: Notifier::new(),
                monitor: ReentrancyMonitor::new(),
            }),
        }
    }

    // -- reads -------------------------------------------------------------

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.items.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.items.borrow().get(index).cloned()
    }

    /// Run `f` over the current items.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.items.borrow())
    }

    /// Snapshot of the current items.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.items.borrow().clone()
    }

    /// Fired once per structural change.
    #[must_use]
    pub fn collection_changed(&self) -> &Notifier<CollectionChanged<T>> {
        &self.inner.collection_changed
    }

    /// Shorthand for subscribing to [`collection_changed`](Self::collection_changed).
    pub fn subscribe(&self, handler: impl Fn(&CollectionChanged<T>) + 'static) -> Subscription {
        self.inner.collection_changed.subscribe(handler)
    }

    /// Hold the reentrancy monitor until the guard drops. Guards nest.
    #[must_use = "blocking ends as soon as the guard is dropped"]
    pub fn block_reentrancy(&self) -> ReentrancyGuard {
        self.inner.monitor.enter()
    }

    /// Whether a change notification is being dispatched or a
    /// [`block_reentrancy`](Self::block_reentrancy) guard is alive.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.monitor.is_busy()
    }

    // -- mutations ---------------------------------------------------------

    /// Insert `item` at `index`, shifting later items right.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when `index > len`; [`Error::InvalidState`]
    /// on rejected reentrant mutation.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.check_position(index)?;
        self.check_reentrancy()?;
        self.inner.items.borrow_mut().insert(index, item.clone());
        self.finish(true, CollectionChanged::add(vec![item], index));
        Ok(())
    }

    /// Append `item`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn push(&self, item: T) -> Result<()> {
        self.insert(self.len(), item)
    }

    /// Remove and return the item at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when `index >= len`; [`Error::InvalidState`]
    /// on rejected reentrant mutation.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.check_index(index)?;
        self.check_reentrancy()?;
        let removed = self.inner.items.borrow_mut().remove(index);
        self.finish(true, CollectionChanged::remove(vec![removed.clone()], index));
        Ok(removed)
    }

    /// Replace the item at `index`, returning the previous one.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when `index >= len`; [`Error::InvalidState`]
    /// on rejected reentrant mutation.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        self.check_index(index)?;
        self.check_reentrancy()?;
        let old = std::mem::replace(&mut self.inner.items.borrow_mut()[index], item.clone());
        self.finish(false, CollectionChanged::replace(old.clone(), item, index));
        Ok(old)
    }

    /// Move the item at `old_index` so it ends up at `new_index`, reported
    /// as a single [`CollectionAction::Move`](crate::CollectionAction::Move).
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when either index is `>= len`;
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn move_item(&self, old_index: usize, new_index: usize) -> Result<()> {
        self.check_index(old_index)?;
        self.check_index(new_index)?;
        self.check_reentrancy()?;
        let item = {
            let mut items = self.inner.items.borrow_mut();
            let item = items.remove(old_index);
            items.insert(new_index, item.clone());
            item
        };
        self.finish(false, CollectionChanged::moved(item, new_index, old_index));
        Ok(())
    }

    /// Remove every item, reported as a reset.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn clear(&self) -> Result<()> {
        self.check_reentrancy()?;
        self.inner.items.borrow_mut().clear();
        self.finish(true, CollectionChanged::reset());
        Ok(())
    }

    /// Insert `items` at `index` as one `Add`. An empty range changes
    /// nothing and raises nothing.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when `index > len`; [`Error::InvalidState`]
    /// on rejected reentrant mutation.
    pub fn insert_range(&self, index: usize, items: impl IntoIterator<Item = T>) -> Result<()> {
        self.check_position(index)?;
        let added: Vec<T> = items.into_iter().collect();
        if added.is_empty() {
            return Ok(());
        }
        self.check_reentrancy()?;
        self.inner
            .items
            .borrow_mut()
            .splice(index..index, added.iter().cloned());
        self.finish(true, CollectionChanged::add(added, index));
        Ok(())
    }

    /// Append `items` as one `Add`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        self.insert_range(self.len(), items)
    }

    /// Remove `count` items starting at `start` as one `Remove`, returning
    /// them. Removing zero items changes nothing and raises nothing.
    ///
    /// # Errors
    ///
    /// [`Error::IndexOutOfRange`] when `start + count > len`;
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn remove_range(&self, start: usize, count: usize) -> Result<Vec<T>> {
        let len = self.len();
        let end = start.checked_add(count).filter(|end| *end <= len).ok_or(
            Error::IndexOutOfRange {
                index: start.saturating_add(count),
                len,
            },
        )?;
        if count == 0 {
            return Ok(Vec::new());
        }
        self.check_reentrancy()?;
        let removed: Vec<T> = self.inner.items.borrow_mut().drain(start..end).collect();
        self.finish(true, CollectionChanged::remove(removed.clone(), start));
        Ok(removed)
    }

    /// Replace the whole contents with `items`, reported as a reset.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn reset(&self, items: impl IntoIterator<Item = T>) -> Result<()> {
        let fresh: Vec<T> = items.into_iter().collect();
        self.check_reentrancy()?;
        let previous = self.inner.items.replace(fresh);
        drop(previous);
        self.finish(true, CollectionChanged::reset());
        Ok(())
    }

    // -- helpers -----------------------------------------------------------

    fn check_index(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index < len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange { index, len })
        }
    }

    fn check_position(&self, index: usize) -> Result<()> {
        let len = self.len();
        if index <= len {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange { index, len })
        }
    }

    fn check_reentrancy(&self) -> Result<()> {
        if self.inner.monitor.is_busy() && self.inner.collection_changed.subscriber_count() > 1 {
            tracing::debug!(
                depth = self.inner.monitor.depth(),
                "reentrant observable list mutation rejected"
            );
            return Err(Error::invalid_state(
                "cannot change an observable list during a collection-changed notification",
            ));
        }
        Ok(())
    }

    /// Raise the property notifications, then the structural event under the
    /// reentrancy monitor. Called with no borrow of the items held.
    fn finish(&self, count_changed: bool, change: CollectionChanged<T>) {
        if count_changed {
            self.raise_property_changed(COUNT_KEY);
        }
        self.raise_property_changed(ITEMS_KEY);
        trace!(
            action = ?change.action(),
            new_index = ?change.new_index(),
            old_index = ?change.old_index(),
            "collection changed"
        );
        if self.inner.collection_changed.is_empty() {
            return;
        }
        let _busy = self.inner.monitor.enter();
        self.inner.collection_changed.emit(&change);
    }

    fn raise_property_changed(&self, key: &'static str) {
        self.inner.property_changed.emit(&PropertyChanged::new(key));
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.inner.items.borrow().contains(item)
    }

    /// Index of the first item equal to `item`.
    #[must_use]
    pub fn index_of(&self, item: &T) -> Option<usize> {
        self.inner.items.borrow().iter().position(|x| x == item)
    }

    /// Remove the first item equal to `item`. Returns whether one was found.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] on rejected reentrant mutation.
    pub fn remove(&self, item: &T) -> Result<bool> {
        match self.index_of(item) {
            Some(index) => self.remove_at(index).map(|_| true),
            None => Ok(false),
        }
    }
}

impl<T> NotifyPropertyChanged for ObservableList<T> {
    fn property_changed(&self) -> &Notifier<PropertyChanged> {
        &self.inner.property_changed
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &self.inner.items.borrow())
            .field("busy", &self.inner.monitor.is_busy())
            .finish()
    }
}
