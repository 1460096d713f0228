//! Ordered callback registries and RAII subscriptions.
//!
//! A [`Notifier<A>`] is the change signal every other Tether type is built
//! on: observable slots, property-changed owners, command can-execute
//! signals, list structural events. Subscribing returns a [`Subscription`]
//! that removes the callback when dropped or [disposed](Subscription::dispose).
//!
//! # Invariants
//!
//! 1. Handlers are invoked in subscription order, synchronously, before
//!    [`Notifier::emit`] returns.
//! 2. The handler list is snapshotted before dispatch, so handlers may
//!    subscribe or unsubscribe (even themselves) while being notified. Such
//!    changes take effect from the next emission.
//! 3. Dropping a [`Subscription`] has no side effect other than removing its
//!    handler. Dropping it after the notifier is gone is a no-op.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use tether_core::Notifier;
//!
//! let changed: Notifier<u32> = Notifier::new();
//! let seen = Rc::new(Cell::new(0));
//! let s = Rc::clone(&seen);
//! let sub = changed.subscribe(move |v| s.set(*v));
//!
//! changed.emit(&7);
//! assert_eq!(seen.get(), 7);
//!
//! sub.dispose();
//! changed.emit(&9);
//! assert_eq!(seen.get(), 7);
//! ```

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Handler<A> = Rc<dyn Fn(&A)>;

struct Slots<A: ?Sized> {
    next_id: Cell<u64>,
    handlers: RefCell<Vec<(u64, Handler<A>)>>,
}

/// An ordered registry of callbacks receiving `&A`.
///
/// Cloning a `Notifier` yields another handle to the same registry.
pub struct Notifier<A: ?Sized> {
    slots: Rc<Slots<A>>,
}

impl<A: ?Sized> Clone for Notifier<A> {
    fn clone(&self) -> Self {
        Self {
            slots: Rc::clone(&self.slots),
        }
    }
}

impl<A: ?Sized + 'static> Default for Notifier<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> Notifier<A> {
    /// Create an empty notifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Rc::new(Slots {
                next_id: Cell::new(0),
                handlers: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Register `handler`. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription immediately unsubscribes the handler"]
    pub fn subscribe(&self, handler: impl Fn(&A) + 'static) -> Subscription {
        self.subscribe_rc(Rc::new(handler))
    }

    /// Register an already shared handler.
    #[must_use = "dropping the subscription immediately unsubscribes the handler"]
    pub fn subscribe_rc(&self, handler: Rc<dyn Fn(&A)>) -> Subscription {
        let id = self.slots.next_id.get();
        self.slots.next_id.set(id + 1);
        self.slots.handlers.borrow_mut().push((id, handler));

        let slots: Weak<Slots<A>> = Rc::downgrade(&self.slots);
        Subscription::new(move || {
            if let Some(slots) = slots.upgrade() {
                slots.handlers.borrow_mut().retain(|(hid, _)| *hid != id);
            }
        })
    }

    /// Invoke every registered handler with `args`, in subscription order.
    pub fn emit(&self, args: &A) {
        let snapshot: Vec<Handler<A>> = self
            .slots
            .handlers
            .borrow()
            .iter()
            .map(|(_, h)| Rc::clone(h))
            .collect();
        for handler in snapshot {
            handler(args);
        }
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.slots.handlers.borrow().len()
    }

    /// Whether no handler is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Notifier<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// RAII handle for a registered callback.
///
/// Dropping the handle (or calling [`dispose`](Self::dispose)) stops
/// delivery.
#[must_use = "dropping the subscription immediately unsubscribes the handler"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Create a subscription that runs `release` exactly once when disposed.
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    /// A subscription with nothing to release.
    pub fn empty() -> Self {
        Self { release: None }
    }

    /// Combine several subscriptions into one; they are released in order.
    pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let subs: Vec<Subscription> = subscriptions.into_iter().collect();
        Self::new(move || drop(subs))
    }

    /// Release the subscription now.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Property-changed protocol
// ---------------------------------------------------------------------------

/// Arguments of a property-changed notification: the key that changed.
///
/// An empty key means "the whole object changed".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    key: Cow<'static, str>,
}

impl PropertyChanged {
    /// Notification for `key`.
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self { key: key.into() }
    }

    /// Notification describing a change of the whole object.
    #[must_use]
    pub fn whole_object() -> Self {
        Self::new("")
    }

    /// The key that changed.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether this notification describes the whole object.
    #[must_use]
    pub fn is_whole_object(&self) -> bool {
        self.key.is_empty()
    }
}

/// Objects that announce changes of their keyed properties.
pub trait NotifyPropertyChanged {
    /// The notifier fired with the key of each changed property.
    fn property_changed(&self) -> &Notifier<PropertyChanged>;
}
