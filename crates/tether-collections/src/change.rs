//! Structural change descriptions raised by observable collections.

/// Kind of structural change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionAction {
    /// Items were inserted at `new_index`.
    Add,
    /// Items were removed from `old_index`.
    Remove,
    /// The item at `new_index` was replaced.
    Replace,
    /// One item moved from `old_index` to `new_index`.
    Move,
    /// The contents changed wholesale; re-read everything.
    Reset,
}

/// One structural change: what happened, to which items, and where.
///
/// Indices are `None` where the action has no such position: `Add` has no
/// old index, `Remove` has no new index, `Reset` has neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionChanged<T> {
    action: CollectionAction,
    new_items: Vec<T>,
    old_items: Vec<T>,
    new_index: Option<usize>,
    old_index: Option<usize>,
}

impl<T> CollectionChanged<T> {
    /// `items` were inserted starting at `index`.
    pub fn add(items: Vec<T>, index: usize) -> Self {
        Self {
            action: CollectionAction::Add,
            new_items: items,
            old_items: Vec::new(),
            new_index: Some(index),
            old_index: None,
        }
    }

    /// `items` were removed starting at `index`.
    pub fn remove(items: Vec<T>, index: usize) -> Self {
        Self {
            action: CollectionAction::Remove,
            new_items: Vec::new(),
            old_items: items,
            new_index: None,
            old_index: Some(index),
        }
    }

    /// `old` at `index` was replaced by `new`.
    pub fn replace(old: T, new: T, index: usize) -> Self {
        Self {
            action: CollectionAction::Replace,
            new_items: vec![new],
            old_items: vec![old],
            new_index: Some(index),
            old_index: Some(index),
        }
    }

    /// `item` moved from `old_index` to `new_index`.
    pub fn moved(item: T, new_index: usize, old_index: usize) -> Self
    where
        T: Clone,
    {
        Self {
            action: CollectionAction::Move,
            new_items: vec![item.clone()],
            old_items: vec![item],
            new_index: Some(new_index),
            old_index: Some(old_index),
        }
    }

    /// The contents changed wholesale.
    #[must_use]
    pub fn reset() -> Self {
        Self {
            action: CollectionAction::Reset,
            new_items: Vec::new(),
            old_items: Vec::new(),
            new_index: None,
            old_index: None,
        }
    }

    #[must_use]
    pub fn action(&self) -> CollectionAction {
        self.action
    }

    /// Items present after the change.
    #[must_use]
    pub fn new_items(&self) -> &[T] {
        &self.new_items
    }

    /// Items present before the change.
    #[must_use]
    pub fn old_items(&self) -> &[T] {
        &self.old_items
    }

    #[must_use]
    pub fn new_index(&self) -> Option<usize> {
        self.new_index
    }

    #[must_use]
    pub fn old_index(&self) -> Option<usize> {
        self.old_index
    }
}

impl<T> CollectionChanged<T> {
    /// Apply this change to `items`, reproducing the list it was raised by.
    ///
    /// `Reset` carries no items, so it yields the `fresh` contents supplied
    /// by the caller (usually read back from the list).
    pub fn apply_to(&self, items: &mut Vec<T>, fresh: impl FnOnce() -> Vec<T>)
    where
        T: Clone,
    {
        match self.action() {
            CollectionAction::Add => {
                let at = self.new_index().unwrap_or(items.len());
                items.splice(at..at, self.new_items().iter().cloned());
            }
            CollectionAction::Remove => {
                let at = self.old_index().unwrap_or(0);
                items.drain(at..at + self.old_items().len());
            }
            CollectionAction::Replace => {
                if let (Some(at), Some(item)) = (self.new_index(), self.new_items().first()) {
                    items[at] = item.clone();
                }
            }
            CollectionAction::Move => {
                if let (Some(from), Some(to)) = (self.old_index(), self.new_index()) {
                    let item = items.remove(from);
                    items.insert(to, item);
                }
            }
            CollectionAction::Reset => *items = fresh(),
        }
    }
}
