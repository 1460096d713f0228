//! Event sources that trigger commands.
//!
//! An [`EventSource<E, P>`] is the target side of a
//! [`CommandBinding`](crate::CommandBinding): it raises a trigger event with
//! arguments `E`, can be enabled or disabled, and may derive a command
//! parameter `P` from the event.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tether_core::{Notifier, Subscription};

/// Something a command binding can listen to.
pub trait EventSource<E: ?Sized, P> {
    /// Invoke `handler` on every trigger.
    fn subscribe(&self, handler: Rc<dyn Fn(&E)>) -> Subscription;

    /// Enable or disable the underlying control.
    fn set_enabled(&self, enabled: bool);

    /// Command parameter carried by `event`, if any.
    fn extract_parameter(&self, event: &E) -> Option<P> {
        let _ = event;
        None
    }

    /// Parameter to assume when no event is at hand, e.g. while refreshing
    /// the enabled state.
    fn default_parameter(&self) -> Option<P> {
        None
    }
}

impl<E: ?Sized, P, S: EventSource<E, P> + ?Sized> EventSource<E, P> for Rc<S> {
    fn subscribe(&self, handler: Rc<dyn Fn(&E)>) -> Subscription {
        (**self).subscribe(handler)
    }

    fn set_enabled(&self, enabled: bool) {
        (**self).set_enabled(enabled);
    }

    fn extract_parameter(&self, event: &E) -> Option<P> {
        (**self).extract_parameter(event)
    }

    fn default_parameter(&self) -> Option<P> {
        (**self).default_parameter()
    }
}

type EnableFn = Rc<dyn Fn(bool)>;
type ExtractFn<E, P> = Box<dyn Fn(&E) -> Option<P>>;
type DefaultFn<P> = Box<dyn Fn() -> Option<P>>;

// ---------------------------------------------------------------------------
// EventHandlerSource
// ---------------------------------------------------------------------------

/// Adapts one [`Notifier<E>`] of a control.
pub struct EventHandlerSource<E: ?Sized, P> {
    event: Notifier<E>,
    set_enabled: Option<EnableFn>,
    extract: Option<ExtractFn<E, P>>,
    default: Option<DefaultFn<P>>,
}

impl<E: ?Sized + 'static, P> EventHandlerSource<E, P> {
    pub fn new(event: &Notifier<E>) -> Self {
        Self {
            event: event.clone(),
            set_enabled: None,
            extract: None,
            default: None,
        }
    }

    /// Called by [`EventSource::set_enabled`]. Without it enabling is a no-op.
    #[must_use]
    pub fn with_set_enabled(mut self, f: impl Fn(bool) + 'static) -> Self {
        self.set_enabled = Some(Rc::new(f));
        self
    }

    /// Derive the command parameter from the event arguments.
    #[must_use]
    pub fn with_parameter(mut self, f: impl Fn(&E) -> Option<P> + 'static) -> Self {
        self.extract = Some(Box::new(f));
        self
    }

    /// Parameter reported when no event is at hand.
    #[must_use]
    pub fn with_default_parameter(mut self, f: impl Fn() -> Option<P> + 'static) -> Self {
        self.default = Some(Box::new(f));
        self
    }
}

impl<E: ?Sized + 'static, P> EventSource<E, P> for EventHandlerSource<E, P> {
    fn subscribe(&self, handler: Rc<dyn Fn(&E)>) -> Subscription {
        self.event.subscribe_rc(handler)
    }

    fn set_enabled(&self, enabled: bool) {
        if let Some(f) = &self.set_enabled {
            f(enabled);
        }
    }

    fn extract_parameter(&self, event: &E) -> Option<P> {
        self.extract.as_ref().and_then(|f| f(event))
    }

    fn default_parameter(&self) -> Option<P> {
        self.default.as_ref().and_then(|f| f())
    }
}

impl<E: ?Sized, P> fmt::Debug for EventHandlerSource<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlerSource")
            .field("extracts_parameter", &self.extract.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// EventListSource
// ---------------------------------------------------------------------------

struct Listened {
    set_enabled: Option<EnableFn>,
    _relay: Subscription,
}

/// Fans the same trigger in from several controls, e.g. every row button of
/// a list.
///
/// Controls added with [`listen`](Self::listen) after handlers subscribed
/// are picked up immediately.
pub struct EventListSource<E: ?Sized, P> {
    relay: Notifier<E>,
    owners: RefCell<Vec<Listened>>,
    extract: Option<ExtractFn<E, P>>,
    default: Option<DefaultFn<P>>,
}

impl<E: ?Sized + 'static, P> Default for EventListSource<E, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ?Sized + 'static, P> EventListSource<E, P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            relay: Notifier::new(),
            owners: RefCell::new(Vec::new()),
            extract: None,
            default: None,
        }
    }

    /// Derive the command parameter from the event arguments.
    #[must_use]
    pub fn with_parameter(mut self, f: impl Fn(&E) -> Option<P> + 'static) -> Self {
        self.extract = Some(Box::new(f));
        self
    }

    /// Parameter reported when no event is at hand.
    #[must_use]
    pub fn with_default_parameter(mut self, f: impl Fn() -> Option<P> + 'static) -> Self {
        self.default = Some(Box::new(f));
        self
    }

    /// Forward triggers of `event`.
    pub fn listen(&self, event: &Notifier<E>) {
        self.push(event, None);
    }

    /// Forward triggers of `event`; `set_enabled` toggles its control.
    pub fn listen_with(&self, event: &Notifier<E>, set_enabled: impl Fn(bool) + 'static) {
        self.push(event, Some(Rc::new(set_enabled)));
    }

    fn push(&self, event: &Notifier<E>, set_enabled: Option<EnableFn>) {
        let relay = self.relay.clone();
        let sub = event.subscribe(move |args| relay.emit(args));
        self.owners.borrow_mut().push(Listened {
            set_enabled,
            _relay: sub,
        });
    }

    /// Number of controls listened to.
    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: ?Sized + 'static, P> EventSource<E, P> for EventListSource<E, P> {
    fn subscribe(&self, handler: Rc<dyn Fn(&E)>) -> Subscription {
        self.relay.subscribe_rc(handler)
    }

    fn set_enabled(&self, enabled: bool) {
        let toggles: Vec<EnableFn> = self
            .owners
            .borrow()
            .iter()
            .filter_map(|o| o.set_enabled.clone())
            .collect();
        for toggle in toggles {
            toggle(enabled);
        }
    }

    fn extract_parameter(&self, event: &E) -> Option<P> {
        self.extract.as_ref().and_then(|f| f(event))
    }

    fn default_parameter(&self) -> Option<P> {
        self.default.as_ref().and_then(|f| f())
    }
}

impl<E: ?Sized, P> fmt::Debug for EventListSource<E, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListSource")
            .field("owners", &self.owners.borrow().len())
            .finish()
    }
}
