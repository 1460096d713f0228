//! Two-way synchronization between a source and a target [`Property`].
//!
//! # Usage
//!
//! ```
//! use tether_binding::{Binding, Property, PropertyBinding};
//! use tether_core::Observable;
//!
//! let model = Observable::new(String::from("Ada"));
//! let field = Observable::new(String::new());
//!
//! let binding = PropertyBinding::new(Property::from_observable(&model, "Name"))
//!     .to(Property::from_observable(&field, "Text"));
//! binding.bind().unwrap();
//! binding.update_target();
//! assert_eq!(field.get(), "Ada");
//!
//! field.set("Grace".into());
//! assert_eq!(model.get(), "Grace");
//! ```
//!
//! # Invariants
//!
//! 1. Source and target can only be replaced while unbound.
//! 2. A sync step runs only if its direction is enabled, the binding is
//!    enabled, and no other step of this binding is in progress. The last
//!    rule breaks source→target→source feedback loops.
//! 3. The default actions never write a read-only side.
//! 4. `is_bound()` is true exactly while the source subscription exists.
//!
//! # Failure Modes
//!
//! - `bind()` without a source: [`Error::InvalidState`].
//! - `bind()` on a two-way binding whose target has no strategy: the
//!   target's [`Error::InvalidState`] is returned and nothing stays
//!   subscribed. A one-way binding skips such a target instead.
//! - Action panic: propagates; the in-progress flag is still cleared.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{Error, Result, Subscription};

use crate::binding::{Binding, BindingId, FlagGuard, SyncDirection, WeakBindingHandle};
use crate::property::Property;

/// Action run for one sync step. Receives the binding and the step's direction.
pub type SyncAction<T> = Rc<dyn Fn(&PropertyBinding<T>, SyncDirection)>;

struct Inner<T> {
    id: BindingId,
    source: RefCell<Option<Property<T>>>,
    target: RefCell<Option<Property<T>>>,
    enabled: Cell<bool>,
    updating: Cell<bool>,
    target_action: RefCell<Option<SyncAction<T>>>,
    source_action: RefCell<Option<SyncAction<T>>>,
    before_target: RefCell<Option<SyncAction<T>>>,
    after_target: RefCell<Option<SyncAction<T>>>,
    before_source: RefCell<Option<SyncAction<T>>>,
    after_source: RefCell<Option<SyncAction<T>>>,
    source_sub: RefCell<Option<Subscription>>,
    target_sub: RefCell<Option<Subscription>>,
}

/// Keeps a target property in sync with a source property.
pub struct PropertyBinding<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for PropertyBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

fn copy_to_target<T: 'static>(binding: &PropertyBinding<T>, _: SyncDirection) {
    let (Some(source), Some(target)) = (binding.source(), binding.target()) else {
        return;
    };
    if !target.is_read_only() {
        if let Err(err) = target.set_value(source.value()) {
            tracing::warn!(binding = %binding.id(), %err, "target not updated");
        }
    }
}

fn copy_to_source<T: 'static>(binding: &PropertyBinding<T>, _: SyncDirection) {
    let (Some(source), Some(target)) = (binding.source(), binding.target()) else {
        return;
    };
    if !source.is_read_only() {
        if let Err(err) = source.set_value(target.value()) {
            tracing::warn!(binding = %binding.id(), %err, "source not updated");
        }
    }
}

impl<T: 'static> PropertyBinding<T> {
    /// A two-way binding from `source` with no target yet.
    pub fn new(source: Property<T>) -> Self {
        let binding = Self::unconfigured();
        *binding.inner.source.borrow_mut() = Some(source);
        binding
    }

    /// A binding with neither source nor target.
    #[must_use]
    pub fn unconfigured() -> Self {
        let to_target: SyncAction<T> = Rc::new(copy_to_target::<T>);
        let to_source: SyncAction<T> = Rc::new(copy_to_source::<T>);
        Self {
            inner: Rc::new(Inner {
                id: BindingId::next(),
                source: RefCell::new(None),
                target: RefCell::new(None),
                enabled: Cell::new(true),
                updating: Cell::new(false),
                target_action: RefCell::new(Some(to_target)),
                source_action: RefCell::new(Some(to_source)),
                before_target: RefCell::new(None),
                after_target: RefCell::new(None),
                before_source: RefCell::new(None),
                after_source: RefCell::new(None),
                source_sub: RefCell::new(None),
                target_sub: RefCell::new(None),
            }),
        }
    }

    fn from_inner(inner: Rc<Inner<T>>) -> Self {
        Self { inner }
    }

    // -- configuration ------------------------------------------------------

    /// Set the target. Ignored with a warning while bound; use
    /// [`set_target`](Self::set_target) to observe the error.
    #[must_use]
    pub fn to(self, target: Property<T>) -> Self {
        if let Err(err) = self.set_target(target) {
            tracing::warn!(binding = %self.inner.id, %err, "target not replaced");
        }
        self
    }

    /// Replace the source.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while bound.
    pub fn set_source(&self, source: Property<T>) -> Result<()> {
        self.ensure_unbound("source")?;
        *self.inner.source.borrow_mut() = Some(source);
        Ok(())
    }

    /// Replace the target.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while bound.
    pub fn set_target(&self, target: Property<T>) -> Result<()> {
        self.ensure_unbound("target")?;
        *self.inner.target.borrow_mut() = Some(target);
        Ok(())
    }

    fn ensure_unbound(&self, what: &str) -> Result<()> {
        if self.is_bound() {
            return Err(Error::invalid_state(format!(
                "cannot replace {what} of bound binding {}",
                self.inner.id
            )));
        }
        Ok(())
    }

    /// Replace the source→target action.
    #[must_use]
    pub fn update_target_with(self, action: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        *self.inner.target_action.borrow_mut() = Some(Rc::new(action));
        self
    }

    /// Replace the target→source action.
    #[must_use]
    pub fn update_source_with(self, action: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        *self.inner.source_action.borrow_mut() = Some(Rc::new(action));
        self
    }

    /// Run `hook` before each source→target step. Ignored on a binding that
    /// never updates its target.
    #[must_use]
    pub fn before_target_update(self, hook: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        if self.updates_target() {
            *self.inner.before_target.borrow_mut() = Some(Rc::new(hook));
        }
        self
    }

    /// Run `hook` after each source→target step.
    #[must_use]
    pub fn after_target_update(self, hook: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        if self.updates_target() {
            *self.inner.after_target.borrow_mut() = Some(Rc::new(hook));
        }
        self
    }

    /// Run `hook` before each target→source step. Ignored on a binding that
    /// never updates its source.
    #[must_use]
    pub fn before_source_update(self, hook: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        if self.updates_source() {
            *self.inner.before_source.borrow_mut() = Some(Rc::new(hook));
        }
        self
    }

    /// Run `hook` after each target→source step.
    #[must_use]
    pub fn after_source_update(self, hook: impl Fn(&Self, SyncDirection) + 'static) -> Self {
        if self.updates_source() {
            *self.inner.after_source.borrow_mut() = Some(Rc::new(hook));
        }
        self
    }

    /// Source→target only. Target changes are never written back unless a
    /// source action is installed later. A target without a change strategy
    /// is then left unobserved.
    #[must_use]
    pub fn one_way(self) -> Self {
        *self.inner.source_action.borrow_mut() = None;
        *self.inner.before_source.borrow_mut() = None;
        *self.inner.after_source.borrow_mut() = None;
        self
    }

    /// Target→source only. The source is still subscribed but never writes
    /// the target.
    #[must_use]
    pub fn one_way_to_source(self) -> Self {
        *self.inner.target_action.borrow_mut() = None;
        *self.inner.before_target.borrow_mut() = None;
        *self.inner.after_target.borrow_mut() = None;
        self
    }

    /// Start disabled.
    #[must_use]
    pub fn disabled(self) -> Self {
        self.inner.enabled.set(false);
        self
    }

    // -- accessors ----------------------------------------------------------

    /// The source property, if set.
    #[must_use]
    pub fn source(&self) -> Option<Property<T>> {
        self.inner.source.borrow().clone()
    }

    /// The target property, if set.
    #[must_use]
    pub fn target(&self) -> Option<Property<T>> {
        self.inner.target.borrow().clone()
    }

    /// Whether the source→target direction is enabled.
    #[must_use]
    pub fn updates_target(&self) -> bool {
        self.inner.target_action.borrow().is_some()
    }

    /// Whether the target→source direction is enabled.
    #[must_use]
    pub fn updates_source(&self) -> bool {
        self.inner.source_action.borrow().is_some()
    }

    /// Whether a sync step is running right now.
    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.inner.updating.get()
    }

    // -- sync ---------------------------------------------------------------

    fn perform(&self, direction: SyncDirection) {
        let inner = &self.inner;
        if !inner.enabled.get() || inner.updating.get() {
            return;
        }
        let (action, before, after) = match direction {
            SyncDirection::ToTarget => (
                inner.target_action.borrow().clone(),
                inner.before_target.borrow().clone(),
                inner.after_target.borrow().clone(),
            ),
            SyncDirection::ToSource => (
                inner.source_action.borrow().clone(),
                inner.before_source.borrow().clone(),
                inner.after_source.borrow().clone(),
            ),
        };
        let Some(action) = action else {
            return;
        };

        tracing::trace!(binding = %inner.id, ?direction, "sync");
        let _guard = FlagGuard::set(&inner.updating);
        if let Some(hook) = before {
            hook(self, direction);
        }
        action(self, direction);
        if let Some(hook) = after {
            hook(self, direction);
        }
    }

    fn subscribe_side(
        &self,
        property: &Property<T>,
        direction: SyncDirection,
    ) -> Result<Subscription> {
        let weak: Weak<Inner<T>> = Rc::downgrade(&self.inner);
        property.on_property_change(move || {
            if let Some(inner) = weak.upgrade() {
                PropertyBinding::from_inner(inner).perform(direction);
            }
        })
    }
}

impl<T: 'static> Binding for PropertyBinding<T> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.set(enabled);
    }

    fn is_bound(&self) -> bool {
        self.inner.source_sub.borrow().is_some()
    }

    fn bind(&self) -> Result<()> {
        if self.is_bound() {
            return Ok(());
        }
        let source = self.source().ok_or_else(|| {
            Error::invalid_state(format!("binding {} has no source", self.inner.id))
        })?;
        let source_sub = self.subscribe_side(&source, SyncDirection::ToTarget)?;
        let target_sub = match self.target() {
            Some(target) if self.updates_source() || target.has_strategy() => {
                Some(self.subscribe_side(&target, SyncDirection::ToSource)?)
            }
            Some(target) => {
                let key = target.key();
                tracing::trace!(binding = %self.inner.id, key, "target not observed");
                None
            }
            None => None,
        };

        *self.inner.source_sub.borrow_mut() = Some(source_sub);
        *self.inner.target_sub.borrow_mut() = target_sub;
        tracing::debug!(binding = %self.inner.id, key = source.key(), "bound");
        Ok(())
    }

    fn unbind(&self) {
        let source_sub = self.inner.source_sub.borrow_mut().take();
        let target_sub = self.inner.target_sub.borrow_mut().take();
        if source_sub.is_none() {
            return;
        }
        drop(source_sub);
        drop(target_sub);
        tracing::debug!(binding = %self.inner.id, "unbound");
    }

    fn update_target(&self) {
        self.perform(SyncDirection::ToTarget);
    }

    fn update_source(&self) {
        self.perform(SyncDirection::ToSource);
    }

    fn downgrade(&self) -> WeakBindingHandle {
        let weak = Rc::downgrade(&self.inner);
        WeakBindingHandle::new(self.inner.id, move || {
            weak.upgrade()
                .map(|inner| Rc::new(PropertyBinding::from_inner(inner)) as Rc<dyn Binding>)
        })
    }
}

impl<T> fmt::Debug for PropertyBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("bound", &self.inner.source_sub.borrow().is_some())
            .finish()
    }
}
