//! A shared, version-tracked value slot with change notification.
//!
//! [`Observable<T>`] is the simplest owner a binding can attach to: one
//! value, one change signal. View models with many keyed properties use
//! [`NotifyPropertyChanged`](crate::NotifyPropertyChanged) instead.
//!
//! # Invariants
//!
//! 1. The version increments exactly once per mutation that changes the
//!    value.
//! 2. Setting a value equal to the current one is a no-op (no version bump,
//!    no notification).
//! 3. Subscribers are notified in registration order, after the new value
//!    is stored, with no borrow of the slot held, so a subscriber may read
//!    or write the observable again.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::notify::{Notifier, Subscription};

struct Inner<T> {
    value: RefCell<T>,
    version: Cell<u64>,
    changed: Notifier<T>,
}

/// Shared observable value. Clones share the same slot.
pub struct Observable<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(Inner {
                value: RefCell::new(value),
                version: Cell::new(0),
                changed: Notifier::new(),
            }),
        }
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Store `value` and notify subscribers if it differs from the current one.
    pub fn set(&self, value: T) {
        {
            let mut slot = self.inner.value.borrow_mut();
            if *slot == value {
                return;
            }
            *slot = value;
        }
        self.inner.version.set(self.inner.version.get() + 1);
        let current = self.get();
        self.inner.changed.emit(&current);
    }

    /// Modify the value in place; notifies only if the result differs.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Subscribe to value changes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        self.inner.changed.subscribe(callback)
    }

    /// The change signal of this slot.
    #[must_use]
    pub fn changed(&self) -> &Notifier<T> {
        &self.inner.changed
    }

    /// Number of value-changing mutations so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Whether `self` and `other` share one slot.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}
