//! Commands whose action runs as a future on a host-provided executor.
//!
//! [`AsyncCommand<P>`] never spawns threads or picks an executor itself: the
//! host hands it a [`LocalSpawn`] (a UI event loop, a `LocalPool`, a
//! `LocalSet` adapter). Each run receives a [`CancellationToken`];
//! cancellation is advisory and takes effect when the action observes it.
//!
//! # Invariants
//!
//! 1. `is_running()` is true from the synchronous start of a run until its
//!    future completes or is dropped unfinished.
//! 2. Every flip of `is_running()` fires `"IsRunning"` on
//!    [`property_changed`](tether_core::NotifyPropertyChanged::property_changed)
//!    and then `can_execute_changed`.
//! 3. An action failure is stored in [`error`](AsyncCommand::error) before
//!    `is_running()` turns false. A failure reported after cancellation was
//!    requested counts as the cancellation and is not stored.
//! 4. The cancel companion can execute exactly while the owner runs and no
//!    cancellation of the current run is pending.
//!
//! # Failure Modes
//!
//! - Action re-entering `execute_async` while it builds its future:
//!   [`Error::InvalidState`].
//! - Spawn rejected by the executor: logged at `warn!`, the run settles
//!   immediately.
//! - Action panic while building its future: propagates to the caller.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::rc::{Rc, Weak};

use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::{self, LocalBoxFuture};
use futures::task::{LocalSpawn, LocalSpawnExt};
use tether_core::{
    Error, Notifier, NotifyPropertyChanged, PropertyChanged, Result, Subscription,
};
use tokio_util::sync::CancellationToken;

use crate::binding::FlagGuard;
use crate::command::Command;
use crate::property::Property;
use crate::strategy::PropertyChangedStrategy;

type Action<P> =
    Rc<dyn Fn(Option<P>, CancellationToken) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

struct Inner<P> {
    action: Action<P>,
    can_execute: Option<Box<dyn Fn(Option<&P>) -> bool>>,
    spawner: Rc<dyn LocalSpawn>,
    running: Cell<usize>,
    building: Cell<bool>,
    error: RefCell<Option<Rc<anyhow::Error>>>,
    token: RefCell<Option<CancellationToken>>,
    can_execute_changed: Notifier<()>,
    property_changed: Notifier<PropertyChanged>,
    cancel: CancelState,
}

struct CancelState {
    pending: Cell<bool>,
    waiters: RefCell<Vec<oneshot::Sender<()>>>,
    can_execute_changed: Notifier<()>,
    property_changed: Notifier<PropertyChanged>,
}

/// A command running its action as a local future.
pub struct AsyncCommand<P> {
    inner: Rc<Inner<P>>,
}

impl<P> Clone for AsyncCommand<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<P: Clone + 'static> AsyncCommand<P> {
    /// Create a command running `action` on `spawner`.
    ///
    /// Without [`with_can_execute`](Self::with_can_execute) the command can
    /// execute whenever it is not already running.
    pub fn new<F>(
        spawner: impl LocalSpawn + 'static,
        action: impl Fn(Option<P>, CancellationToken) -> F + 'static,
    ) -> Self
    where
        F: Future<Output = anyhow::Result<()>> + 'static,
    {
        let action: Action<P> =
            Rc::new(move |parameter, token| action(parameter, token).boxed_local());
        Self {
            inner: Rc::new(Inner {
                action,
                can_execute: None,
                spawner: Rc::new(spawner),
                running: Cell::new(0),
                building: Cell::new(false),
                error: RefCell::new(None),
                token: RefCell::new(None),
                can_execute_changed: Notifier::new(),
                property_changed: Notifier::new(),
                cancel: CancelState {
                    pending: Cell::new(false),
                    waiters: RefCell::new(Vec::new()),
                    can_execute_changed: Notifier::new(),
                    property_changed: Notifier::new(),
                },
            }),
        }
    }

    /// Replace the default "not running" availability check.
    ///
    /// Must be called before the command is shared; later calls on a cloned
    /// handle are ignored with a warning.
    #[must_use]
    pub fn with_can_execute(mut self, predicate: impl Fn(Option<&P>) -> bool + 'static) -> Self {
        match Rc::get_mut(&mut self.inner) {
            Some(inner) => inner.can_execute = Some(Box::new(predicate)),
            None => tracing::warn!("can_execute not replaced on a shared async command"),
        }
        self
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.get() > 0
    }

    /// Failure of the last run, cleared when the next run starts.
    #[must_use]
    pub fn error(&self) -> Option<Rc<anyhow::Error>> {
        self.inner.error.borrow().clone()
    }

    /// Token of the current run, created on demand.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.inner
            .token
            .borrow_mut()
            .get_or_insert_with(CancellationToken::new)
            .clone()
    }

    /// The companion command cancelling this one.
    #[must_use]
    pub fn cancel_command(&self) -> CancelCommand<P> {
        CancelCommand {
            owner: self.clone(),
        }
    }

    /// Bindable `"IsRunning"` property.
    #[must_use]
    pub fn is_running_property(&self) -> Property<bool> {
        let this = self.clone();
        Property::new(Rc::new(self.clone()), "IsRunning", move || this.is_running())
            .with_strategy(PropertyChangedStrategy::<Self>::new())
    }

    /// Bindable `"Error"` property.
    #[must_use]
    pub fn error_property(&self) -> Property<Option<Rc<anyhow::Error>>> {
        let this = self.clone();
        Property::new(Rc::new(self.clone()), "Error", move || this.error())
            .with_strategy(PropertyChangedStrategy::<Self>::new())
    }

    /// Run the command and resolve when the run settles.
    ///
    /// Resolves to `Ok(())` immediately when `can_execute` refuses. A
    /// failure of the action is stored in [`error`](Self::error) and also
    /// returned here as [`Error::CommandFailed`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] when called from inside the action while it
    /// builds its future; [`Error::CommandFailed`] when the action fails.
    pub fn execute_async(&self, parameter: Option<&P>) -> LocalBoxFuture<'static, Result<()>> {
        if !self.can_execute(parameter) {
            return future::ready(Ok(())).boxed_local();
        }
        let run = match self.start(parameter.cloned()) {
            Ok(run) => run,
            Err(err) => return future::ready(Err(err)).boxed_local(),
        };
        let this = self.clone();
        async move {
            run.await;
            match this.error() {
                Some(err) => Err(Error::CommandFailed(err)),
                None => Ok(()),
            }
        }
        .boxed_local()
    }

    fn start(&self, parameter: Option<P>) -> Result<LocalBoxFuture<'static, ()>> {
        let inner = &self.inner;
        if inner.building.get() {
            return Err(Error::invalid_state(
                "async command action cannot be run recursively",
            ));
        }
        self.set_error(None);
        let token = self.token();
        self.set_running(inner.running.get() + 1);

        let settle = Settle {
            command: self.clone(),
        };
        let action = {
            let _building = FlagGuard::set(&inner.building);
            (inner.action)(parameter, token.clone())
        };
        tracing::trace!("async command started");

        Ok(async move {
            let result = action.await;
            if let Err(err) = result {
                if token.is_cancelled() {
                    tracing::debug!(%err, "async command cancelled");
                } else {
                    tracing::warn!(%err, "async command failed");
                    settle.command.set_error(Some(Rc::new(err)));
                }
            }
            drop(settle);
        }
        .boxed_local())
    }

    fn settle(&self) {
        let remaining = self.inner.running.get().saturating_sub(1);
        if remaining == 0 {
            self.inner.token.borrow_mut().take();
        }
        self.set_running(remaining);
        if !self.is_running() {
            self.set_cancel_pending(false);
        }
    }

    fn set_running(&self, count: usize) {
        let was = self.is_running();
        self.inner.running.set(count);
        if was != self.is_running() {
            self.inner
                .property_changed
                .emit(&PropertyChanged::new("IsRunning"));
            self.inner.can_execute_changed.emit(&());
            self.inner.cancel.can_execute_changed.emit(&());
        }
    }

    fn set_error(&self, error: Option<Rc<anyhow::Error>>) {
        let changed = {
            let mut slot = self.inner.error.borrow_mut();
            let changed = match (slot.as_ref(), error.as_ref()) {
                (None, None) => false,
                (Some(a), Some(b)) => !Rc::ptr_eq(a, b),
                _ => true,
            };
            *slot = error;
            changed
        };
        if changed {
            self.inner
                .property_changed
                .emit(&PropertyChanged::new("Error"));
        }
    }

    fn set_cancel_pending(&self, pending: bool) {
        let cancel = &self.inner.cancel;
        if cancel.pending.replace(pending) == pending {
            return;
        }
        if !pending {
            for waiter in cancel.waiters.take() {
                let _ = waiter.send(());
            }
        }
        cancel
            .property_changed
            .emit(&PropertyChanged::new("IsRunning"));
        cancel.can_execute_changed.emit(&());
    }

    fn request_cancel(&self) {
        let token = self.inner.token.borrow().clone();
        let Some(token) = token else {
            return;
        };
        if token.is_cancelled() || !self.is_running() {
            return;
        }
        token.cancel();
        if self.is_running() {
            self.set_cancel_pending(true);
        }
    }
}

/// Settles one run when dropped, whether the run finished or was dropped
/// unpolled by the executor.
struct Settle<P: Clone + 'static> {
    command: AsyncCommand<P>,
}

impl<P: Clone + 'static> Drop for Settle<P> {
    fn drop(&mut self) {
        self.command.settle();
    }
}

impl<P: Clone + 'static> Command<P> for AsyncCommand<P> {
    fn can_execute(&self, parameter: Option<&P>) -> bool {
        match &self.inner.can_execute {
            Some(predicate) => predicate(parameter),
            None => !self.is_running(),
        }
    }

    fn execute(&self, parameter: Option<&P>) {
        if !self.can_execute(parameter) {
            return;
        }
        let run = match self.start(parameter.cloned()) {
            Ok(run) => run,
            Err(err) => {
                tracing::warn!(%err, "async command not started");
                return;
            }
        };
        if let Err(err) = self.inner.spawner.spawn_local(run) {
            tracing::warn!(%err, "async command could not be spawned");
        }
    }

    fn can_execute_changed(&self) -> &Notifier<()> {
        &self.inner.can_execute_changed
    }

    fn subscribe_running(&self, on_running: Rc<dyn Fn(bool)>) -> Option<Subscription> {
        let weak: Weak<Inner<P>> = Rc::downgrade(&self.inner);
        Some(self.inner.property_changed.subscribe(move |args| {
            if args.key() != "IsRunning" {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                on_running(inner.running.get() > 0);
            }
        }))
    }
}

impl<P> NotifyPropertyChanged for AsyncCommand<P> {
    fn property_changed(&self) -> &Notifier<PropertyChanged> {
        &self.inner.property_changed
    }
}

impl<P> fmt::Debug for AsyncCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCommand")
            .field("running", &self.inner.running.get())
            .field("has_error", &self.inner.error.borrow().is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// CancelCommand
// ---------------------------------------------------------------------------

/// Companion command requesting cancellation of its owner's current run.
pub struct CancelCommand<P> {
    owner: AsyncCommand<P>,
}

impl<P> Clone for CancelCommand<P> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner.clone(),
        }
    }
}

impl<P: Clone + 'static> CancelCommand<P> {
    /// Whether a cancellation was requested and the owner has not settled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.owner.inner.cancel.pending.get()
    }

    /// Request cancellation; resolves once the owner's run settles.
    pub fn execute_async(&self) -> LocalBoxFuture<'static, ()> {
        if !self.can_execute(None) {
            return future::ready(()).boxed_local();
        }
        self.owner.request_cancel();
        if !self.is_running() {
            return future::ready(()).boxed_local();
        }
        let (tx, rx) = oneshot::channel();
        self.owner.inner.cancel.waiters.borrow_mut().push(tx);
        async move {
            let _ = rx.await;
        }
        .boxed_local()
    }
}

impl<P: Clone + 'static> Command<P> for CancelCommand<P> {
    fn can_execute(&self, _parameter: Option<&P>) -> bool {
        !self.is_running() && self.owner.is_running()
    }

    fn execute(&self, parameter: Option<&P>) {
        if self.can_execute(parameter) {
            self.owner.request_cancel();
        }
    }

    fn can_execute_changed(&self) -> &Notifier<()> {
        &self.owner.inner.cancel.can_execute_changed
    }
}

impl<P> NotifyPropertyChanged for CancelCommand<P> {
    fn property_changed(&self) -> &Notifier<PropertyChanged> {
        &self.owner.inner.cancel.property_changed
    }
}

impl<P> fmt::Debug for CancelCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelCommand")
            .field("pending", &self.owner.inner.cancel.pending.get())
            .finish()
    }
}
