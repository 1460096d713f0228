//! The [`Binding`] contract shared by property bindings, command bindings
//! and binding lists.
//!
//! Bindings are `Rc`-backed handles: cloning one yields another handle to
//! the same binding, and every method takes `&self`. A binding stays alive
//! while at least one strong handle exists; its change subscriptions hold
//! only weak references back to it, so dropping the last handle also
//! unsubscribes it.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tether_core::Result;

/// Unique identifier of a binding, stable across handle clones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

impl BindingId {
    /// Allocate a fresh identifier.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BindingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Direction of a synchronization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncDirection {
    /// Source value flows into the target.
    ToTarget,
    /// Target value flows back into the source.
    ToSource,
}

/// Connects a source to a target and keeps them synchronized.
///
/// # Lifecycle
///
/// Constructed, configured, [`bind`](Self::bind), any number of sync events,
/// [`unbind`](Self::unbind). Binding again after unbinding is allowed.
pub trait Binding {
    /// Identity of this binding.
    fn id(&self) -> BindingId;

    /// Whether synchronization steps run.
    fn enabled(&self) -> bool;

    fn set_enabled(&self, enabled: bool);

    /// Whether change subscriptions are active.
    fn is_bound(&self) -> bool;

    /// Subscribe to change signals. No-op when already bound.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`](tether_core::Error::InvalidState) when
    /// required configuration (such as the source) is missing, or whatever
    /// the underlying subscription reports.
    fn bind(&self) -> Result<()>;

    /// Dispose change subscriptions. No-op when not bound.
    fn unbind(&self);

    /// Push data from source to target.
    fn update_target(&self);

    /// Push data from target to source.
    fn update_source(&self);

    /// Non-owning handle to this binding.
    fn downgrade(&self) -> WeakBindingHandle;
}

impl<B: Binding + ?Sized> Binding for Rc<B> {
    fn id(&self) -> BindingId {
        (**self).id()
    }

    fn enabled(&self) -> bool {
        (**self).enabled()
    }

    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled);
    }

    fn is_bound(&self) -> bool {
        (**self).is_bound()
    }

    fn bind(&self) -> Result<()> {
        (**self).bind()
    }

    fn unbind(&self) {
        (**self).unbind();
    }

    fn update_target(&self) {
        (**self).update_target();
    }

    fn update_source(&self) {
        (**self).update_source();
    }

    fn downgrade(&self) -> WeakBindingHandle {
        (**self).downgrade()
    }
}

/// Non-owning handle to a binding, as returned by [`Binding::downgrade`].
pub struct WeakBindingHandle {
    id: BindingId,
    upgrade: Box<dyn Fn() -> Option<Rc<dyn Binding>>>,
}

impl WeakBindingHandle {
    /// Create a handle from an upgrade function.
    pub fn new(id: BindingId, upgrade: impl Fn() -> Option<Rc<dyn Binding>> + 'static) -> Self {
        Self {
            id,
            upgrade: Box::new(upgrade),
        }
    }

    #[must_use]
    pub fn id(&self) -> BindingId {
        self.id
    }

    /// A strong handle, if the binding is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Rc<dyn Binding>> {
        (self.upgrade)()
    }

    /// Whether the binding is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.upgrade().is_some()
    }
}

impl fmt::Debug for WeakBindingHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBindingHandle")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Resets a `Cell<bool>` flag when dropped, so an in-progress marker is
/// cleared even if a user action panics.
pub(crate) struct FlagGuard<'a> {
    flag: &'a std::cell::Cell<bool>,
}

impl<'a> FlagGuard<'a> {
    pub(crate) fn set(flag: &'a std::cell::Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for FlagGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
