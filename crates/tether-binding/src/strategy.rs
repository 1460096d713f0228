//! Change-subscription strategies for [`Property`](crate::Property).
//!
//! A strategy knows how to attach a callback to whatever change signal an
//! owner exposes. Strategies are stateless factories: every call to
//! [`BindingStrategy::subscribe`] yields an independent [`Subscription`].
//!
//! # Failure Modes
//!
//! - Owner of the wrong type: `subscribe` returns
//!   [`Error::InvalidArgument`]. This only happens when a strategy is paired
//!   with a property of a different owner type by hand.

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tether_core::{Error, Notifier, NotifyPropertyChanged, Observable, Result, Subscription};

/// Adapts an owner's native change signal into a property subscription.
pub trait BindingStrategy {
    /// Invoke `on_change` whenever the property `key` of `owner` changes.
    ///
    /// # Errors
    ///
    /// Implementations return [`Error::InvalidArgument`] when `owner` does
    /// not expose the signal they adapt.
    fn subscribe(
        &self,
        owner: &Rc<dyn Any>,
        key: &str,
        on_change: Rc<dyn Fn()>,
    ) -> Result<Subscription>;
}

fn downcast_owner<'a, O: 'static>(owner: &'a Rc<dyn Any>, key: &str) -> Result<&'a O> {
    owner.downcast_ref::<O>().ok_or_else(|| {
        Error::invalid_argument(format!(
            "owner of '{key}' is not a {}",
            type_name::<O>()
        ))
    })
}

// ---------------------------------------------------------------------------
// PropertyChangedStrategy
// ---------------------------------------------------------------------------

/// Listens to the owner's [`NotifyPropertyChanged`] signal and forwards only
/// notifications whose key equals the property key.
pub struct PropertyChangedStrategy<O> {
    _owner: PhantomData<fn(&O)>,
}

impl<O> PropertyChangedStrategy<O> {
    /// Create the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _owner: PhantomData,
        }
    }
}

impl<O> Default for PropertyChangedStrategy<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> fmt::Debug for PropertyChangedStrategy<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyChangedStrategy<{}>", type_name::<O>())
    }
}

impl<O: NotifyPropertyChanged + 'static> BindingStrategy for PropertyChangedStrategy<O> {
    fn subscribe(
        &self,
        owner: &Rc<dyn Any>,
        key: &str,
        on_change: Rc<dyn Fn()>,
    ) -> Result<Subscription> {
        let typed = downcast_owner::<O>(owner, key)?;
        let key = key.to_owned();
        Ok(typed.property_changed().subscribe(move |args| {
            if args.key() == key {
                on_change();
            }
        }))
    }
}

// ---------------------------------------------------------------------------
// EventStrategy
// ---------------------------------------------------------------------------

/// Listens to one specific notifier of the owner, ignoring its arguments.
///
/// Used for controls that raise a dedicated event per property, such as a
/// text field's `text_changed`.
pub struct EventStrategy<O, A: ?Sized> {
    select: Rc<dyn Fn(&O) -> Notifier<A>>,
}

impl<O, A: ?Sized> Clone for EventStrategy<O, A> {
    fn clone(&self) -> Self {
        Self {
            select: Rc::clone(&self.select),
        }
    }
}

impl<O: 'static, A: ?Sized + 'static> EventStrategy<O, A> {
    /// Create a strategy subscribing to the notifier `select` returns.
    pub fn new(select: impl Fn(&O) -> Notifier<A> + 'static) -> Self {
        Self {
            select: Rc::new(select),
        }
    }
}

impl<O, A: ?Sized> fmt::Debug for EventStrategy<O, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventStrategy<{}>", type_name::<O>())
    }
}

impl<O: 'static, A: ?Sized + 'static> BindingStrategy for EventStrategy<O, A> {
    fn subscribe(
        &self,
        owner: &Rc<dyn Any>,
        key: &str,
        on_change: Rc<dyn Fn()>,
    ) -> Result<Subscription> {
        let typed = downcast_owner::<O>(owner, key)?;
        Ok((self.select)(typed).subscribe(move |_| on_change()))
    }
}

// ---------------------------------------------------------------------------
// ObservableStrategy
// ---------------------------------------------------------------------------

/// Listens to an [`Observable<T>`] owner.
pub struct ObservableStrategy<T> {
    _value: PhantomData<fn(&T)>,
}

impl<T> ObservableStrategy<T> {
    /// Create the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self {
            _value: PhantomData,
        }
    }
}

impl<T> Default for ObservableStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObservableStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObservableStrategy<{}>", type_name::<T>())
    }
}

impl<T: Clone + PartialEq + 'static> BindingStrategy for ObservableStrategy<T> {
    fn subscribe(
        &self,
        owner: &Rc<dyn Any>,
        key: &str,
        on_change: Rc<dyn Fn()>,
    ) -> Result<Subscription> {
        let slot = downcast_owner::<Observable<T>>(owner, key)?;
        Ok(slot.subscribe(move |_| on_change()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tether_core::PropertyChanged;

    struct Model {
        changed: Notifier<PropertyChanged>,
        text_changed: Notifier<String>,
    }

    impl NotifyPropertyChanged for Model {
        fn property_changed(&self) -> &Notifier<PropertyChanged> {
            &self.changed
        }
    }

    fn model() -> Rc<dyn Any> {
        Rc::new(Model {
            changed: Notifier::new(),
            text_changed: Notifier::new(),
        })
    }

    fn counter() -> (Rc<Cell<u32>>, Rc<dyn Fn()>) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        (hits, Rc::new(move || h.set(h.get() + 1)))
    }

    #[test]
    fn property_changed_filters_by_key() {
        let owner = model();
        let (hits, cb) = counter();
        let _sub = PropertyChangedStrategy::<Model>::new()
            .subscribe(&owner, "Name", cb)
            .unwrap();

        let m = owner.downcast_ref::<Model>().unwrap();
        m.changed.emit(&PropertyChanged::new("Other"));
        m.changed.emit(&PropertyChanged::new("Name"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn event_strategy_ignores_arguments() {
        let owner = model();
        let (hits, cb) = counter();
        let strategy = EventStrategy::new(|m: &Model| m.text_changed.clone());
        let sub = strategy.subscribe(&owner, "Text", cb).unwrap();

        let m = owner.downcast_ref::<Model>().unwrap();
        m.text_changed.emit(&"a".to_string());
        drop(sub);
        m.text_changed.emit(&"b".to_string());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn observable_strategy_follows_slot() {
        let slot = Observable::new(1);
        let owner: Rc<dyn Any> = Rc::new(slot.clone());
        let (hits, cb) = counter();
        let _sub = ObservableStrategy::<i32>::new()
            .subscribe(&owner, "Value", cb)
            .unwrap();
        slot.set(2);
        slot.set(2);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn wrong_owner_type_is_rejected() {
        let owner: Rc<dyn Any> = Rc::new(5_u8);
        let (_, cb) = counter();
        let err = PropertyChangedStrategy::<Model>::new()
            .subscribe(&owner, "Name", cb)
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
