//! The [`Command`] capability and a closure-backed synchronous command.

use std::fmt;
use std::rc::Rc;

use tether_core::{Notifier, Subscription};

/// An action a view can trigger, with an availability check.
///
/// `P` is the parameter type; `None` means "no parameter".
pub trait Command<P> {
    /// Whether [`execute`](Self::execute) would run for `parameter`.
    fn can_execute(&self, parameter: Option<&P>) -> bool;

    /// Run the command if [`can_execute`](Self::can_execute) allows it.
    fn execute(&self, parameter: Option<&P>);

    /// Fired whenever the result of `can_execute` may have changed.
    fn can_execute_changed(&self) -> &Notifier<()>;

    /// For commands that run in the background: invoke `on_running` with the
    /// new running state each time it flips. Synchronous commands return
    /// `None`.
    fn subscribe_running(&self, on_running: Rc<dyn Fn(bool)>) -> Option<Subscription> {
        let _ = on_running;
        None
    }
}

impl<P, C: Command<P> + ?Sized> Command<P> for Rc<C> {
    fn can_execute(&self, parameter: Option<&P>) -> bool {
        (**self).can_execute(parameter)
    }

    fn execute(&self, parameter: Option<&P>) {
        (**self).execute(parameter);
    }

    fn can_execute_changed(&self) -> &Notifier<()> {
        (**self).can_execute_changed()
    }

    fn subscribe_running(&self, on_running: Rc<dyn Fn(bool)>) -> Option<Subscription> {
        (**self).subscribe_running(on_running)
    }
}

/// Synchronous command built from closures.
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use tether_binding::{Command, DelegateCommand};
///
/// let total = Rc::new(Cell::new(0));
/// let t = Rc::clone(&total);
/// let add = DelegateCommand::new(move |n: Option<&i32>| t.set(t.get() + n.copied().unwrap_or(1)))
///     .with_can_execute(|n| n.is_none_or(|n| *n > 0));
///
/// add.execute(Some(&5));
/// add.execute(Some(&-3));
/// add.execute(None);
/// assert_eq!(total.get(), 6);
/// ```
pub struct DelegateCommand<P> {
    action: Box<dyn Fn(Option<&P>)>,
    can_execute: Option<Box<dyn Fn(Option<&P>) -> bool>>,
    changed: Notifier<()>,
}

impl<P: 'static> DelegateCommand<P> {
    pub fn new(action: impl Fn(Option<&P>) + 'static) -> Self {
        Self {
            action: Box::new(action),
            can_execute: None,
            changed: Notifier::new(),
        }
    }

    /// Gate execution on `predicate`. Without one the command always runs.
    #[must_use]
    pub fn with_can_execute(mut self, predicate: impl Fn(Option<&P>) -> bool + 'static) -> Self {
        self.can_execute = Some(Box::new(predicate));
        self
    }

    /// Tell listeners that `can_execute` may now answer differently.
    pub fn raise_can_execute_changed(&self) {
        self.changed.emit(&());
    }
}

impl<P: 'static> Command<P> for DelegateCommand<P> {
    fn can_execute(&self, parameter: Option<&P>) -> bool {
        self.can_execute.as_ref().is_none_or(|f| f(parameter))
    }

    fn execute(&self, parameter: Option<&P>) {
        if self.can_execute(parameter) {
            (self.action)(parameter);
        }
    }

    fn can_execute_changed(&self) -> &Notifier<()> {
        &self.changed
    }
}

impl<P> fmt::Debug for DelegateCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateCommand")
            .field("guarded", &self.can_execute.is_some())
            .finish()
    }
}
