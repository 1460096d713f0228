//! Forwarding every property change of an object to one handler.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tether_core::{Error, NotifyPropertyChanged, PropertyChanged, Result, Subscription};

use crate::binding::{Binding, BindingId, WeakBindingHandle};
use crate::list::BindingList;

type Handler = Rc<dyn Fn(&PropertyChanged)>;

struct Inner {
    id: BindingId,
    source: RefCell<Option<Rc<dyn NotifyPropertyChanged>>>,
    handler: RefCell<Option<Handler>>,
    enabled: Cell<bool>,
    sub: RefCell<Option<Subscription>>,
}

/// Binding whose target is a handler called with each
/// [`PropertyChanged`] of the source object.
///
/// [`update_target`](Binding::update_target) sends a whole-object
/// notification, telling the handler to refresh everything.
#[derive(Clone)]
pub struct ObjectBinding {
    inner: Rc<Inner>,
}

impl ObjectBinding {
    pub fn new<O: NotifyPropertyChanged + 'static>(source: &Rc<O>) -> Self {
        let source: Rc<dyn NotifyPropertyChanged> = Rc::clone(source) as _;
        let binding = Self::unconfigured();
        *binding.inner.source.borrow_mut() = Some(source);
        binding
    }

    #[must_use]
    pub fn unconfigured() -> Self {
        Self {
            inner: Rc::new(Inner {
                id: BindingId::next(),
                source: RefCell::new(None),
                handler: RefCell::new(None),
                enabled: Cell::new(true),
                sub: RefCell::new(None),
            }),
        }
    }

    /// Set the handler.
    #[must_use]
    pub fn on_change(self, handler: impl Fn(&PropertyChanged) + 'static) -> Self {
        *self.inner.handler.borrow_mut() = Some(Rc::new(handler));
        self
    }

    /// Replace the source object.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] while bound.
    pub fn set_source(&self, source: Rc<dyn NotifyPropertyChanged>) -> Result<()> {
        if self.is_bound() {
            return Err(Error::invalid_state(format!(
                "cannot change source of bound binding {}",
                self.inner.id
            )));
        }
        *self.inner.source.borrow_mut() = Some(source);
        Ok(())
    }

    fn forward(&self, args: &PropertyChanged) {
        if !self.inner.enabled.get() {
            return;
        }
        let handler = self.inner.handler.borrow().clone();
        if let Some(handler) = handler {
            handler(args);
        }
    }
}

impl Binding for ObjectBinding {
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
        self.inner.sub.borrow().is_some()
    }

    fn bind(&self) -> Result<()> {
        if self.is_bound() {
            return Ok(());
        }
        let source = self.inner.source.borrow().clone().ok_or_else(|| {
            Error::invalid_state(format!("binding {} has no source", self.inner.id))
        })?;
        let weak: Weak<Inner> = Rc::downgrade(&self.inner);
        let sub = source.property_changed().subscribe(move |args| {
            if let Some(inner) = weak.upgrade() {
                ObjectBinding { inner }.forward(args);
            }
        });
        *self.inner.sub.borrow_mut() = Some(sub);
        tracing::debug!(binding = %self.inner.id, "object binding bound");
        Ok(())
    }

    fn unbind(&self) {
        let sub = self.inner.sub.borrow_mut().take();
        drop(sub);
    }

    fn update_target(&self) {
        self.forward(&PropertyChanged::whole_object());
    }

    fn update_source(&self) {}

    fn downgrade(&self) -> WeakBindingHandle {
        let weak = Rc::downgrade(&self.inner);
        WeakBindingHandle::new(self.inner.id, move || {
            weak.upgrade()
                .map(|inner| Rc::new(ObjectBinding { inner }) as Rc<dyn Binding>)
        })
    }
}

impl fmt::Debug for ObjectBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl BindingList {
    /// Add an [`ObjectBinding`] from `source` to `handler`.
    ///
    /// # Errors
    ///
    /// See [`BindingList::add`].
    pub fn object<O: NotifyPropertyChanged + 'static>(
        &self,
        source: &Rc<O>,
        handler: impl Fn(&PropertyChanged) + 'static,
    ) -> Result<()> {
        self.add(ObjectBinding::new(source).on_change(handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::Notifier;

    #[derive(Default)]
    struct Person {
        changed: Notifier<PropertyChanged>,
    }

    impl NotifyPropertyChanged for Person {
        fn property_changed(&self) -> &Notifier<PropertyChanged> {
            &self.changed
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&PropertyChanged) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        (seen, move |args: &PropertyChanged| s.borrow_mut().push(args.key().to_owned()))
    }

    #[test]
    fn forwards_every_key_while_enabled() {
        let person = Rc::new(Person::default());
        let (seen, handler) = recorder();
        let binding = ObjectBinding::new(&person).on_change(handler);
        binding.bind().unwrap();

        person.changed.emit(&PropertyChanged::new("Name"));
        person.changed.emit(&PropertyChanged::new("Age"));
        binding.set_enabled(false);
        person.changed.emit(&PropertyChanged::new("Ignored"));
        assert_eq!(*seen.borrow(), ["Name", "Age"]);
    }

    #[test]
    fn update_target_sends_whole_object() {
        let person = Rc::new(Person::default());
        let (seen, handler) = recorder();
        let binding = ObjectBinding::new(&person).on_change(handler);
        binding.update_target();
        assert_eq!(*seen.borrow(), [""]);
    }

    #[test]
    fn unbind_stops_forwarding_and_unlocks_source() {
        let person = Rc::new(Person::default());
        let (seen, handler) = recorder();
        let binding = ObjectBinding::new(&person).on_change(handler);
        binding.bind().unwrap();
        assert!(binding.set_source(Rc::new(Person::default())).unwrap_err().is_invalid_state());

        binding.unbind();
        person.changed.emit(&PropertyChanged::new("Name"));
        assert!(seen.borrow().is_empty());
        assert!(binding.set_source(Rc::new(Person::default())).is_ok());
    }

    #[test]
    fn bind_without_source_fails() {
        assert!(ObjectBinding::unconfigured().bind().unwrap_err().is_invalid_state());
    }

    #[test]
    fn list_helper_binds_with_the_list() {
        let person = Rc::new(Person::default());
        let (seen, handler) = recorder();
        let list = BindingList::new();
        list.bind().unwrap();
        list.object(&person, handler).unwrap();
        person.changed.emit(&PropertyChanged::new("Name"));
        assert_eq!(*seen.borrow(), ["", "Name"]);
    }
}
