//! Binding a [`Command`] to an [`EventSource`].
//!
//! The command is the source, the event source the target. While bound,
//! every trigger of the target executes the command, and every change of
//! the command's availability enables or disables the target.
//!
//! # Invariants
//!
//! 1. An explicit parameter always wins over one extracted from the event.
//!    Outside a trigger the target's default parameter stands in for the
//!    extracted one.
//! 2. `after_execute` and the finished hook run even if `execute` panics.
//! 3. For commands reporting their running state (asynchronous commands),
//!    the started and finished hooks follow that state instead of the
//!    trigger, so each fires once per run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{Error, Result, Subscription};

use crate::binding::{Binding, BindingId, WeakBindingHandle};
use crate::command::Command;
use crate::event_source::EventSource;

/// Hook receiving the binding.
pub type CommandHook<P, E> = Rc<dyn Fn(&CommandBinding<P, E>)>;

struct Hooks<P, E: ?Sized> {
    update_target: Option<CommandHook<P, E>>,
    before_execute: Option<CommandHook<P, E>>,
    after_execute: Option<CommandHook<P, E>>,
    started: Option<CommandHook<P, E>>,
    finished: Option<CommandHook<P, E>>,
}

impl<P, E: ?Sized> Clone for Hooks<P, E> {
    fn clone(&self) -> Self {
        Self {
            update_target: self.update_target.clone(),
            before_execute: self.before_execute.clone(),
            after_execute: self.after_execute.clone(),
            started: self.started.clone(),
            finished: self.finished.clone(),
        }
    }
}

struct Inner<P, E: ?Sized> {
    id: BindingId,
    source: RefCell<Option<Rc<dyn Command<P>>>>,
    target: RefCell<Option<Rc<dyn EventSource<E, P>>>>,
    parameter: RefCell<Option<P>>,
    convert: RefCell<Option<Rc<dyn Fn(P) -> P>>>,
    enabled: Cell<bool>,
    hooks: RefCell<Hooks<P, E>>,
    can_execute_sub: RefCell<Option<Subscription>>,
    trigger_sub: RefCell<Option<Subscription>>,
    running_sub: RefCell<Option<Subscription>>,
}

/// Executes a command when an event source triggers.
pub struct CommandBinding<P, E: ?Sized> {
    inner: Rc<Inner<P, E>>,
}

impl<P, E: ?Sized> Clone for CommandBinding<P, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

fn enable_when_executable<P: Clone + 'static, E: ?Sized + 'static>(
    binding: &CommandBinding<P, E>,
) {
    let (Some(command), Some(target)) = (binding.source(), binding.target()) else {
        return;
    };
    let parameter = binding.current_parameter();
    target.set_enabled(command.can_execute(parameter.as_ref()));
}

/// Runs the after-execute hooks when dropped.
struct ExecuteGuard<'a, P, E: ?Sized> {
    binding: &'a CommandBinding<P, E>,
    hooks: &'a Hooks<P, E>,
    run_finished: bool,
}

impl<P, E: ?Sized> Drop for ExecuteGuard<'_, P, E> {
    fn drop(&mut self) {
        if let Some(hook) = &self.hooks.after_execute {
            hook(self.binding);
        }
        if self.run_finished {
            if let Some(hook) = &self.hooks.finished {
                hook(self.binding);
            }
        }
    }
}

impl<P: Clone + 'static, E: ?Sized + 'static> CommandBinding<P, E> {
    /// A binding executing `command`, with no target yet.
    pub fn new(command: impl Command<P> + 'static) -> Self {
        let update_target: CommandHook<P, E> = Rc::new(enable_when_executable::<P, E>);
        let command: Rc<dyn Command<P>> = Rc::new(command);
        Self {
            inner: Rc::new(Inner {
                id: BindingId::next(),
                source: RefCell::new(Some(command)),
                target: RefCell::new(None),
                parameter: RefCell::new(None),
                convert: RefCell::new(None),
                enabled: Cell::new(true),
                hooks: RefCell::new(Hooks {
                    update_target: Some(update_target),
                    before_execute: None,
                    after_execute: None,
                    started: None,
                    finished: None,
                }),
                can_execute_sub: RefCell::new(None),
                trigger_sub: RefCell::new(None),
                running_sub: RefCell::new(None),
            }),
        }
    }

    fn from_inner(inner: Rc<Inner<P, E>>) -> Self {
        Self { inner }
    }

    // -- configuration ------------------------------------------------------

    /// Set the event source. Ignored with a warning while bound.
    #[must_use]
    pub fn to(self, target: impl EventSource<E, P> + 'static) -> Self {
        if let Err(err) = self.set_target(target) {
            tracing::warn!(binding = %self.inner.id, %err, "target not replaced");
        }
        self
    }

    /// Replace the command.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while bound.
    pub fn set_source(&self, command: impl Command<P> + 'static) -> Result<()> {
        self.ensure_unbound("source")?;
        *self.inner.source.borrow_mut() = Some(Rc::new(command));
        Ok(())
    }

    /// Replace the event source.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while bound.
    pub fn set_target(&self, target: impl EventSource<E, P> + 'static) -> Result<()> {
        self.ensure_unbound("target")?;
        *self.inner.target.borrow_mut() = Some(Rc::new(target));
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

    /// Always execute with `parameter`.
    #[must_use]
    pub fn with_parameter(self, parameter: P) -> Self {
        self.set_parameter(Some(parameter));
        self
    }

    /// Replace the explicit parameter; `None` falls back to extraction.
    pub fn set_parameter(&self, parameter: Option<P>) {
        *self.inner.parameter.borrow_mut() = parameter;
    }

    /// Convert parameters extracted from events. Explicit parameters are
    /// passed as is.
    #[must_use]
    pub fn convert_parameter(self, convert: impl Fn(P) -> P + 'static) -> Self {
        *self.inner.convert.borrow_mut() = Some(Rc::new(convert));
        self
    }

    /// Replace the default "enable target when the command can execute".
    #[must_use]
    pub fn update_target_with(self, action: impl Fn(&Self) + 'static) -> Self {
        self.inner.hooks.borrow_mut().update_target = Some(Rc::new(action));
        self
    }

    /// Runs right before `execute`.
    #[must_use]
    pub fn before_execute(self, hook: impl Fn(&Self) + 'static) -> Self {
        self.inner.hooks.borrow_mut().before_execute = Some(Rc::new(hook));
        self
    }

    /// Runs right after `execute` returns. Does not wait for asynchronous
    /// commands; see [`on_finished`](Self::on_finished).
    #[must_use]
    pub fn after_execute(self, hook: impl Fn(&Self) + 'static) -> Self {
        self.inner.hooks.borrow_mut().after_execute = Some(Rc::new(hook));
        self
    }

    /// Runs when a run starts.
    #[must_use]
    pub fn on_started(self, hook: impl Fn(&Self) + 'static) -> Self {
        self.inner.hooks.borrow_mut().started = Some(Rc::new(hook));
        self
    }

    /// Runs when a run finishes, even if `execute` panicked.
    #[must_use]
    pub fn on_finished(self, hook: impl Fn(&Self) + 'static) -> Self {
        self.inner.hooks.borrow_mut().finished = Some(Rc::new(hook));
        self
    }

    /// Start disabled.
    #[must_use]
    pub fn disabled(self) -> Self {
        self.inner.enabled.set(false);
        self
    }

    // -- accessors ----------------------------------------------------------

    /// The bound command.
    #[must_use]
    pub fn source(&self) -> Option<Rc<dyn Command<P>>> {
        self.inner.source.borrow().clone()
    }

    /// The event source, if set.
    #[must_use]
    pub fn target(&self) -> Option<Rc<dyn EventSource<E, P>>> {
        self.inner.target.borrow().clone()
    }

    /// The explicit parameter.
    #[must_use]
    pub fn parameter(&self) -> Option<P> {
        self.inner.parameter.borrow().clone()
    }

    /// Parameter a trigger with `event` executes with.
    pub fn resolve_parameter(&self, event: &E) -> Option<P> {
        if let Some(explicit) = self.parameter() {
            return Some(explicit);
        }
        let extracted = self.target()?.extract_parameter(event)?;
        Some(self.converted(extracted))
    }

    /// Parameter used when no trigger is in flight: the explicit one, else
    /// the target's [`default_parameter`](EventSource::default_parameter)
    /// after conversion.
    #[must_use]
    pub fn current_parameter(&self) -> Option<P> {
        if let Some(explicit) = self.parameter() {
            return Some(explicit);
        }
        let fallback = self.target()?.default_parameter()?;
        Some(self.converted(fallback))
    }

    fn converted(&self, parameter: P) -> P {
        let convert = self.inner.convert.borrow().clone();
        match convert {
            Some(convert) => convert(parameter),
            None => parameter,
        }
    }

    // -- execution ----------------------------------------------------------

    fn on_trigger(&self, event: &E) {
        if !self.inner.enabled.get() {
            return;
        }
        let Some(command) = self.source() else {
            return;
        };
        let hooks = self.inner.hooks.borrow().clone();
        let reports_running = self.inner.running_sub.borrow().is_some();

        if let Some(hook) = &hooks.before_execute {
            hook(self);
        }
        if !reports_running {
            if let Some(hook) = &hooks.started {
                hook(self);
            }
        }
        let parameter = self.resolve_parameter(event);
        let _guard = ExecuteGuard {
            binding: self,
            hooks: &hooks,
            run_finished: !reports_running,
        };
        tracing::trace!(binding = %self.inner.id, "executing command");
        command.execute(parameter.as_ref());
    }

    fn on_running_changed(&self, running: bool) {
        let hook = {
            let hooks = self.inner.hooks.borrow();
            if running {
                hooks.started.clone()
            } else {
                hooks.finished.clone()
            }
        };
        if let Some(hook) = hook {
            hook(self);
        }
    }
}

impl<P: Clone + 'static, E: ?Sized + 'static> Binding for CommandBinding<P, E> {
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
        self.inner.can_execute_sub.borrow().is_some()
    }

    fn bind(&self) -> Result<()> {
        if self.is_bound() {
            return Ok(());
        }
        let command = self.source().ok_or_else(|| {
            Error::invalid_state(format!("binding {} has no command", self.inner.id))
        })?;

        let weak: Weak<Inner<P, E>> = Rc::downgrade(&self.inner);
        let can_execute_sub = command.can_execute_changed().subscribe(move |()| {
            if let Some(inner) = weak.upgrade() {
                CommandBinding::from_inner(inner).update_target();
            }
        });

        let trigger_sub = self.target().map(|target| {
            let weak = Rc::downgrade(&self.inner);
            target.subscribe(Rc::new(move |event: &E| {
                if let Some(inner) = weak.upgrade() {
                    CommandBinding::from_inner(inner).on_trigger(event);
                }
            }))
        });

        let weak = Rc::downgrade(&self.inner);
        let running_sub = command.subscribe_running(Rc::new(move |running| {
            if let Some(inner) = weak.upgrade() {
                CommandBinding::from_inner(inner).on_running_changed(running);
            }
        }));

        *self.inner.can_execute_sub.borrow_mut() = Some(can_execute_sub);
        *self.inner.trigger_sub.borrow_mut() = trigger_sub;
        *self.inner.running_sub.borrow_mut() = running_sub;
        tracing::debug!(binding = %self.inner.id, "command bound");
        Ok(())
    }

    fn unbind(&self) {
        let subs = (
            self.inner.can_execute_sub.borrow_mut().take(),
            self.inner.trigger_sub.borrow_mut().take(),
            self.inner.running_sub.borrow_mut().take(),
        );
        if subs.0.is_none() {
            return;
        }
        drop(subs);
        tracing::debug!(binding = %self.inner.id, "command unbound");
    }

    fn update_target(&self) {
        if !self.inner.enabled.get() {
            return;
        }
        let action = self.inner.hooks.borrow().update_target.clone();
        if let Some(action) = action {
            action(self);
        }
    }

    /// Commands have nothing to write back.
    fn update_source(&self) {}

    fn downgrade(&self) -> WeakBindingHandle {
        let weak = Rc::downgrade(&self.inner);
        WeakBindingHandle::new(self.inner.id, move || {
            weak.upgrade()
                .map(|inner| Rc::new(CommandBinding::from_inner(inner)) as Rc<dyn Binding>)
        })
    }
}

impl<P, E: ?Sized> fmt::Debug for CommandBinding<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("bound", &self.inner.can_execute_sub.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::async_command::AsyncCommand;
    use crate::command::DelegateCommand;
    use crate::event_source::EventHandlerSource;
    use futures::executor::LocalPool;
    use futures::channel::oneshot;
    use tether_core::Notifier;

    struct Button {
        clicked: Notifier<u32>,
        enabled: Rc<Cell<bool>>,
    }

    impl Button {
        fn new() -> Self {
            Self {
                clicked: Notifier::new(),
                enabled: Rc::new(Cell::new(true)),
            }
        }

        fn source(&self) -> EventHandlerSource<u32, u32> {
            let enabled = Rc::clone(&self.enabled);
            EventHandlerSource::new(&self.clicked)
                .with_set_enabled(move |on| enabled.set(on))
                .with_parameter(|n| Some(*n))
        }
    }

    fn recording_command() -> (Rc<DelegateCommand<u32>>, Rc<RefCell<Vec<Option<u32>>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let cmd = Rc::new(DelegateCommand::new(move |p: Option<&u32>| {
            s.borrow_mut().push(p.copied());
        }));
        (cmd, seen)
    }

    #[test]
    fn trigger_executes_with_extracted_parameter() {
        let button = Button::new();
        let (cmd, seen) = recording_command();
        let binding = CommandBinding::new(cmd).to(button.source());
        binding.bind().unwrap();

        button.clicked.emit(&4);
        assert_eq!(*seen.borrow(), [Some(4)]);
    }

    #[test]
    fn explicit_parameter_wins_and_conversion_applies_to_extracted() {
        let button = Button::new();
        let (cmd, seen) = recording_command();
        let binding = CommandBinding::new(cmd)
            .to(button.source())
            .convert_parameter(|n| n * 100);
        binding.bind().unwrap();

        button.clicked.emit(&2);
        binding.set_parameter(Some(9));
        button.clicked.emit(&2);
        assert_eq!(*seen.borrow(), [Some(200), Some(9)]);
    }

    #[test]
    fn enabled_state_uses_converted_default_parameter() {
        let button = Button::new();
        let selected = Rc::new(Cell::new(None));
        let s = Rc::clone(&selected);
        let asked = Rc::new(RefCell::new(Vec::new()));
        let a = Rc::clone(&asked);
        let cmd = Rc::new(DelegateCommand::<u32>::new(|_| {}).with_can_execute(move |p| {
            a.borrow_mut().push(p.copied());
            p.is_some_and(|n| *n >= 10)
        }));
        let binding = CommandBinding::new(Rc::clone(&cmd))
            .to(button.source().with_default_parameter(move || s.get()))
            .convert_parameter(|n| n * 10);
        binding.bind().unwrap();

        binding.update_target();
        assert!(!button.enabled.get());
        selected.set(Some(2));
        cmd.raise_can_execute_changed();
        assert!(button.enabled.get());
        assert_eq!(binding.current_parameter(), Some(20));

        binding.set_parameter(Some(3));
        binding.update_target();
        assert!(!button.enabled.get());
        assert_eq!(*asked.borrow(), [None, Some(20), Some(3)]);
    }

    #[test]
    fn bind_requires_command_and_locks_endpoints() {
        let button = Button::new();
        let (cmd, _) = recording_command();
        let binding = CommandBinding::new(Rc::clone(&cmd)).to(button.source());
        binding.bind().unwrap();
        assert!(binding.set_source(cmd).unwrap_err().is_invalid_state());
        assert!(binding.set_target(button.source()).unwrap_err().is_invalid_state());
    }

    #[test]
    fn can_execute_changes_toggle_target() {
        let button = Button::new();
        let allowed = Rc::new(Cell::new(true));
        let a = Rc::clone(&allowed);
        let cmd = Rc::new(DelegateCommand::<u32>::new(|_| {}).with_can_execute(move |_| a.get()));
        let binding = CommandBinding::new(Rc::clone(&cmd)).to(button.source());
        binding.bind().unwrap();

        allowed.set(false);
        cmd.raise_can_execute_changed();
        assert!(!button.enabled.get());
        allowed.set(true);
        cmd.raise_can_execute_changed();
        assert!(button.enabled.get());
    }

    #[test]
    fn hooks_run_in_order_around_sync_command() {
        let button = Button::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = Rc::clone(&log);
        let cmd = DelegateCommand::<u32>::new(move |_| l.borrow_mut().push("execute"));
        let push = |name: &'static str| {
            let log = Rc::clone(&log);
            move |_: &CommandBinding<u32, u32>| log.borrow_mut().push(name)
        };
        let binding = CommandBinding::new(cmd)
            .to(button.source())
            .before_execute(push("before"))
            .after_execute(push("after"))
            .on_started(push("started"))
            .on_finished(push("finished"));
        binding.bind().unwrap();

        button.clicked.emit(&1);
        assert_eq!(
            *log.borrow(),
            ["before", "started", "execute", "after", "finished"]
        );
    }

    #[test]
    fn disabled_binding_ignores_triggers() {
        let button = Button::new();
        let (cmd, seen) = recording_command();
        let binding = CommandBinding::new(cmd).to(button.source()).disabled();
        binding.bind().unwrap();
        button.clicked.emit(&1);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn async_command_drives_started_and_finished() {
        let mut pool = LocalPool::new();
        let (tx, rx) = oneshot::channel::<()>();
        let gate = Rc::new(RefCell::new(Some(rx)));
        let cmd = AsyncCommand::new(pool.spawner(), move |_: Option<u32>, _| {
            let rx = gate.borrow_mut().take();
            async move {
                if let Some(rx) = rx {
                    let _ = rx.await;
                }
                anyhow::Ok(())
            }
        });
        let button = Button::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3) = (Rc::clone(&log), Rc::clone(&log), Rc::clone(&log));
        let binding = CommandBinding::new(cmd.clone())
            .to(button.source())
            .on_started(move |_| l1.borrow_mut().push("started"))
            .after_execute(move |_| l2.borrow_mut().push("after"))
            .on_finished(move |_| l3.borrow_mut().push("finished"));
        binding.bind().unwrap();

        button.clicked.emit(&1);
        assert_eq!(*log.borrow(), ["started", "after"]);
        assert!(!button.enabled.get());

        tx.send(()).unwrap();
        pool.run_until_stalled();
        assert_eq!(*log.borrow(), ["started", "after", "finished"]);
        assert!(button.enabled.get());
    }

    #[test]
    fn unbind_stops_execution_and_update_source_is_inert() {
        let button = Button::new();
        let (cmd, seen) = recording_command();
        let binding = CommandBinding::new(cmd).to(button.source());
        binding.bind().unwrap();
        binding.update_source();
        binding.unbind();
        assert!(!binding.is_bound());
        button.clicked.emit(&1);
        assert!(seen.borrow().is_empty());
    }
}
