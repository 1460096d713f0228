//! Aggregates of bindings that are bound, enabled and updated together.
//!
//! A view model typically keeps one [`BindingList`] for everything it wires
//! up, so the whole set can be bound on appear and unbound on disappear.
//! [`WeakBindingList`] does the same without owning its members.
//!
//! # Invariants
//!
//! 1. A binding is a member at most once (compared by [`BindingId`]).
//! 2. `is_bound()` reflects the last list-level `bind()`/`unbind()`, not the
//!    state of individual members.
//! 3. `enabled()` is the AND of all members and `true` for an empty list.
//! 4. Members are iterated over a snapshot, so a member may add or remove
//!    bindings from inside its own callbacks.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{Error, Result};
use tracing::debug;

use crate::binding::{Binding, BindingId, WeakBindingHandle};

struct ListInner {
    id: BindingId,
    members: RefCell<Vec<Rc<dyn Binding>>>,
    bound: Cell<bool>,
}

/// Owning, ordered collection of bindings.
#[derive(Clone)]
pub struct BindingList {
    inner: Rc<ListInner>,
}

impl Default for BindingList {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ListInner {
                id: BindingId::next(),
                members: RefCell::new(Vec::new()),
                bound: Cell::new(false),
            }),
        }
    }

    /// Add `binding`. If the list is bound, the binding is bound and its
    /// target updated right away.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the binding (or this list itself) is
    /// already a member; whatever `bind()` reports otherwise, in which case
    /// the binding is not added.
    pub fn add(&self, binding: impl Binding + 'static) -> Result<()> {
        let binding: Rc<dyn Binding> = Rc::new(binding);
        self.add_rc(binding)
    }

    /// [`add`](Self::add) for an already shared binding.
    ///
    /// # Errors
    ///
    /// See [`add`](Self::add).
    pub fn add_rc(&self, binding: Rc<dyn Binding>) -> Result<()> {
        let id = binding.id();
        if id == self.inner.id || self.contains(id) {
            return Err(Error::invalid_argument(format!(
                "binding {id} is already in list {}",
                self.inner.id
            )));
        }
        binding.set_enabled(self.enabled());
        if self.is_bound() {
            binding.bind()?;
        }
        self.inner.members.borrow_mut().push(Rc::clone(&binding));
        if self.is_bound() {
            binding.update_target();
        }
        Ok(())
    }

    /// Unbind and drop `binding`. Returns whether it was a member.
    pub fn remove(&self, binding: &dyn Binding) -> bool {
        let id = binding.id();
        let removed = {
            let mut members = self.inner.members.borrow_mut();
            members
                .iter()
                .position(|m| m.id() == id)
                .map(|at| members.remove(at))
        };
        match removed {
            Some(member) => {
                member.unbind();
                true
            }
            None => false,
        }
    }

    /// Unbind everything, then empty the list.
    pub fn clear(&self) {
        self.unbind();
        let members = self.inner.members.take();
        drop(members);
    }

    #[must_use]
    pub fn contains(&self, id: BindingId) -> bool {
        self.inner.members.borrow().iter().any(|m| m.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.members.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the members in insertion order.
    #[must_use]
    pub fn members(&self) -> Vec<Rc<dyn Binding>> {
        self.inner.members.borrow().clone()
    }

    fn from_inner(inner: Rc<ListInner>) -> Self {
        Self { inner }
    }
}

impl Binding for BindingList {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.members().iter().all(|m| m.enabled())
    }

    fn set_enabled(&self, enabled: bool) {
        for member in self.members() {
            member.set_enabled(enabled);
        }
    }

    fn is_bound(&self) -> bool {
        self.inner.bound.get()
    }

    /// Bind every member, stopping at the first failure. The list is only
    /// marked bound when all members bound.
    fn bind(&self) -> Result<()> {
        let members = self.members();
        for member in &members {
            member.bind()?;
        }
        self.inner.bound.set(true);
        debug!(list = %self.inner.id, members = members.len(), "binding list bound");
        Ok(())
    }

    fn unbind(&self) {
        for member in self.members() {
            member.unbind();
        }
        if self.inner.bound.replace(false) {
            debug!(list = %self.inner.id, "binding list unbound");
        }
    }

    fn update_target(&self) {
        for member in self.members() {
            member.update_target();
        }
    }

    fn update_source(&self) {
        for member in self.members() {
            member.update_source();
        }
    }

    fn downgrade(&self) -> WeakBindingHandle {
        let weak: Weak<ListInner> = Rc::downgrade(&self.inner);
        WeakBindingHandle::new(self.inner.id, move || {
            weak.upgrade()
                .map(|inner| Rc::new(BindingList::from_inner(inner)) as Rc<dyn Binding>)
        })
    }
}

impl fmt::Debug for BindingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingList")
            .field("id", &self.inner.id)
            .field("len", &self.len())
            .field("bound", &self.is_bound())
            .finish()
    }
}

struct WeakListInner {
    id: BindingId,
    members: RefCell<Vec<WeakBindingHandle>>,
    bound: Cell<bool>,
}

/// Like [`BindingList`], but membership does not keep a binding alive.
///
/// Dropped bindings are skipped and pruned on the next traversal; since a
/// dropped binding's subscriptions die with it, nothing needs unbinding.
#[derive(Clone)]
pub struct WeakBindingList {
    inner: Rc<WeakListInner>,
}

impl Default for WeakBindingList {
    fn default() -> Self {
        Self::new()
    }
}

impl WeakBindingList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(WeakListInner {
                id: BindingId::next(),
                members: RefCell::new(Vec::new()),
                bound: Cell::new(false),
            }),
        }
    }

    /// Track `binding` without owning it. If the list is bound, the binding
    /// is bound and its target updated right away.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] when the binding is already a live member;
    /// whatever `bind()` reports otherwise, in which case the binding is not
    /// added.
    pub fn add(&self, binding: &dyn Binding) -> Result<()> {
        let id = binding.id();
        if id == self.inner.id || self.live().iter().any(|m| m.id() == id) {
            return Err(Error::invalid_argument(format!(
                "binding {id} is already in list {}",
                self.inner.id
            )));
        }
        binding.set_enabled(self.enabled());
        if self.is_bound() {
            binding.bind()?;
        }
        self.inner.members.borrow_mut().push(binding.downgrade());
        if self.is_bound() {
            binding.update_target();
        }
        Ok(())
    }

    /// Unbind and forget `binding`. Returns whether it was a live member.
    pub fn remove(&self, binding: &dyn Binding) -> bool {
        let id = binding.id();
        let removed = {
            let mut members = self.inner.members.borrow_mut();
            members
                .iter()
                .position(|h| h.id() == id)
                .map(|at| members.remove(at))
        };
        match removed.and_then(|h| h.upgrade()) {
            Some(member) => {
                member.unbind();
                true
            }
            None => false,
        }
    }

    /// Unbind every live member, then empty the list.
    pub fn clear(&self) {
        self.unbind();
        let members = self.inner.members.take();
        drop(members);
    }

    /// Number of members still alive.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Strong handles to the live members, pruning dead entries.
    fn live(&self) -> Vec<Rc<dyn Binding>> {
        let mut live = Vec::new();
        self.inner
            .members
            .borrow_mut()
            .retain(|handle| match handle.upgrade() {
                Some(binding) => {
                    live.push(binding);
                    true
                }
                None => false,
            });
        live
    }

    fn from_inner(inner: Rc<WeakListInner>) -> Self {
        Self { inner }
    }
}

impl Binding for WeakBindingList {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.live().iter().all(|m| m.enabled())
    }

    fn set_enabled(&self, enabled: bool) {
        for member in self.live() {
            member.set_enabled(enabled);
        }
    }

    fn is_bound(&self) -> bool {
        self.inner.bound.get()
    }

    fn bind(&self) -> Result<()> {
        for member in self.live() {
            member.bind()?;
        }
        self.inner.bound.set(true);
        debug!(list = %self.inner.id, "weak binding list bound");
        Ok(())
    }

    fn unbind(&self) {
        for member in self.live() {
            member.unbind();
        }
        self.inner.bound.set(false);
    }

    fn update_target(&self) {
        for member in self.live() {
            member.update_target();
        }
    }

    fn update_source(&self) {
        for member in self.live() {
            member.update_source();
        }
    }

    fn downgrade(&self) -> WeakBindingHandle {
        let weak: Weak<WeakListInner> = Rc::downgrade(&self.inner);
        WeakBindingHandle::new(self.inner.id, move || {
            weak.upgrade()
                .map(|inner| Rc::new(WeakBindingList::from_inner(inner)) as Rc<dyn Binding>)
        })
    }
}

impl fmt::Debug for WeakBindingList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakBindingList")
            .field("id", &self.inner.id)
            .field("tracked", &self.inner.members.borrow().len())
            .field("bound", &self.is_bound())
            .finish()
    }
}
