//! Named, typed, observable slots of data.
//!
//! A [`Property<T>`] is identified by its owner handle and a string key.
//! Reading and writing go through closures resolved once at construction,
//! either from the owner's [`AccessorTable`](tether_core::AccessorTable)
//! ([`Property::of`]) or supplied directly ([`Property::new`]). Change
//! subscription goes through an optional [`BindingStrategy`].
//!
//! Properties are cheap to clone; clones denote the same logical slot.
//!
//! # Example
//!
//! ```
//! use tether_binding::Property;
//! use tether_core::Observable;
//!
//! let slot = Observable::new(String::from("Ada"));
//! let name = Property::from_observable(&slot, "Name");
//! let upper = name.clone().map(|s| s.to_uppercase());
//!
//! name.set_value("Grace".into()).unwrap();
//! assert_eq!(slot.get(), "Grace");
//! assert_eq!(upper.value(), "GRACE");
//! assert!(upper.is_read_only());
//! ```
//!
//! # Failure Modes
//!
//! - [`Property::on_property_change`] without a strategy returns
//!   [`Error::InvalidState`].
//! - Writing a read-only property returns [`Error::InvalidState`] and leaves
//!   the owner untouched.

use std::any::{Any, TypeId, type_name};
use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use tether_core::{
    DataErrorInfo, Error, KeyValueCoding, NotifyPropertyChanged, Observable, Result,
    Subscription, ValidationError, Validator,
};

use crate::strategy::{BindingStrategy, ObservableStrategy, PropertyChangedStrategy};

/// A named, typed slot on an owner.
pub struct Property<T> {
    owner: Rc<dyn Any>,
    key: Cow<'static, str>,
    getter: Rc<dyn Fn() -> T>,
    setter: Option<Rc<dyn Fn(T)>>,
    errors: Option<Rc<dyn Fn() -> Vec<ValidationError>>>,
    strategy: Option<Rc<dyn BindingStrategy>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            owner: Rc::clone(&self.owner),
            key: self.key.clone(),
            getter: Rc::clone(&self.getter),
            setter: self.setter.clone(),
            errors: self.errors.clone(),
            strategy: self.strategy.clone(),
        }
    }
}

impl<T: 'static> Property<T> {
    /// A read-only property over `getter`. Chain [`with_setter`](Self::with_setter)
    /// to make it writable.
    pub fn new(
        owner: Rc<dyn Any>,
        key: impl Into<Cow<'static, str>>,
        getter: impl Fn() -> T + 'static,
    ) -> Self {
        Self {
            owner,
            key: key.into(),
            getter: Rc::new(getter),
            setter: None,
            errors: None,
            strategy: None,
        }
    }

    /// Resolve `key` in the accessor table of `O`.
    ///
    /// The entry's value type is checked once here; reads and writes call
    /// the typed accessor directly afterwards. Errors are read from the
    /// owner's [`KeyValueCoding::error_info`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `key` is unknown or not of type `T`.
    pub fn of<O: KeyValueCoding>(owner: &Rc<O>, key: &str) -> Result<Self> {
        let table = O::accessors();
        let accessor = table.accessor::<T>(key)?;
        let key = table
            .canonical_key(key)
            .ok_or_else(|| Error::invalid_argument(format!("unknown key '{key}'")))?;

        let getter = {
            let owner = Rc::clone(owner);
            move || accessor.get(&owner)
        };
        let setter: Option<Rc<dyn Fn(T)>> = if accessor.is_read_only() {
            None
        } else {
            let owner = Rc::clone(owner);
            Some(Rc::new(move |value| {
                accessor.set(&owner, value);
            }))
        };
        let errors = {
            let owner = Rc::clone(owner);
            move || {
                owner
                    .error_info()
                    .map_or_else(Vec::new, |info| info.errors_for(key))
            }
        };

        let owner: Rc<dyn Any> = Rc::clone(owner) as Rc<dyn Any>;
        Ok(Self {
            owner,
            key: Cow::Borrowed(key),
            getter: Rc::new(getter),
            setter,
            errors: Some(Rc::new(errors)),
            strategy: None,
        })
    }

    /// [`Property::of`] with a [`PropertyChangedStrategy`] attached.
    ///
    /// # Errors
    ///
    /// See [`Property::of`].
    pub fn notifying<O>(owner: &Rc<O>, key: &str) -> Result<Self>
    where
        O: KeyValueCoding + NotifyPropertyChanged,
    {
        Ok(Self::of(owner, key)?.with_strategy(PropertyChangedStrategy::<O>::new()))
    }

    /// Make the property writable through `setter`.
    #[must_use]
    pub fn with_setter(mut self, setter: impl Fn(T) + 'static) -> Self {
        self.setter = Some(Rc::new(setter));
        self
    }

    /// Attach a change-subscription strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl BindingStrategy + 'static) -> Self {
        self.strategy = Some(Rc::new(strategy));
        self
    }

    /// Read errors for this key from `info`.
    #[must_use]
    pub fn with_error_info(mut self, info: Rc<dyn DataErrorInfo>) -> Self {
        let key = self.key.clone();
        self.errors = Some(Rc::new(move || info.errors_for(&key)));
        self
    }

    /// Current value.
    pub fn value(&self) -> T {
        (self.getter)()
    }

    /// Write `value` to the owner.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if the property is read-only.
    pub fn set_value(&self, value: T) -> Result<()> {
        match &self.setter {
            Some(setter) => {
                setter(value);
                Ok(())
            }
            None => Err(Error::invalid_state(format!(
                "property '{}' is read-only",
                self.key
            ))),
        }
    }

    /// Owner handle.
    #[must_use]
    pub fn owner(&self) -> &Rc<dyn Any> {
        &self.owner
    }

    /// Property key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// `TypeId` of the value type.
    #[must_use]
    pub fn property_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    /// Name of the value type, for diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    /// Whether the property has no setter.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }

    /// Validation errors attached to this key.
    #[must_use]
    pub fn errors(&self) -> Vec<ValidationError> {
        self.errors.as_ref().map_or_else(Vec::new, |f| f())
    }

    /// Whether [`errors`](Self::errors) is non-empty.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors().is_empty()
    }

    /// Whether a change-subscription strategy is attached.
    #[must_use]
    pub fn has_strategy(&self) -> bool {
        self.strategy.is_some()
    }

    /// Invoke `action` each time the property changes.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidState`] if no strategy is attached, or whatever the
    /// strategy reports.
    pub fn on_property_change(&self, action: impl Fn() + 'static) -> Result<Subscription> {
        let strategy = self.strategy.as_ref().ok_or_else(|| {
            Error::invalid_state(format!(
                "property '{}' has no binding strategy",
                self.key
            ))
        })?;
        strategy.subscribe(&self.owner, &self.key, Rc::new(action))
    }

    /// Read-only derived property whose value is `to(self.value())`.
    ///
    /// Shares owner, key, errors and strategy with `self`.
    #[must_use]
    pub fn map<U: 'static>(self, to: impl Fn(T) -> U + 'static) -> Property<U> {
        let getter = self.getter;
        Property {
            owner: self.owner,
            key: self.key,
            getter: Rc::new(move || to(getter())),
            setter: None,
            errors: self.errors,
            strategy: self.strategy,
        }
    }

    /// Derived property converting both ways.
    ///
    /// Writes go through `from` and then the source setter. If the source is
    /// read-only, so is the result.
    #[must_use]
    pub fn convert<U: 'static>(
        self,
        to: impl Fn(T) -> U + 'static,
        from: impl Fn(U) -> T + 'static,
    ) -> Property<U> {
        let getter = self.getter;
        let setter = self.setter.map(|set| {
            let back: Rc<dyn Fn(U)> = Rc::new(move |value| set(from(value)));
            back
        });
        Property {
            owner: self.owner,
            key: self.key,
            getter: Rc::new(move || to(getter())),
            setter,
            errors: self.errors,
            strategy: self.strategy,
        }
    }
}

impl<T: Clone + PartialEq + 'static> Property<T> {
    /// Read-write property over an [`Observable<T>`] slot.
    pub fn from_observable(slot: &Observable<T>, key: impl Into<Cow<'static, str>>) -> Self {
        let getter = {
            let slot = slot.clone();
            move || slot.get()
        };
        let setter = {
            let slot = slot.clone();
            move |value| slot.set(value)
        };
        Self::new(Rc::new(slot.clone()), key, getter)
            .with_setter(setter)
            .with_strategy(ObservableStrategy::<T>::new())
    }
}

impl Property<Vec<ValidationError>> {
    /// Read-only property over every error in `validator`, notified through
    /// its `errors_changed` signal.
    pub fn validator_errors(validator: &Validator) -> Self {
        let getter = {
            let v = validator.clone();
            move || v.all_errors()
        };
        let strategy = crate::strategy::EventStrategy::new(|v: &Validator| {
            v.errors_changed().clone()
        });
        Self::new(Rc::new(validator.clone()), "Errors", getter).with_strategy(strategy)
    }
}

impl<T> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("key", &self.key)
            .field("type", &type_name::<T>())
            .field("read_only", &self.setter.is_none())
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::sync::LazyLock;
    use tether_core::{AccessorTable, Notifier, PropertyChanged};

    struct Person {
        name: RefCell<String>,
        age: Cell<u32>,
        changed: Notifier<PropertyChanged>,
        validator: Validator,
    }

    impl Person {
        fn new() -> Rc<Self> {
            Rc::new(Self {
                name: RefCell::new("Ada".into()),
                age: Cell::new(36),
                changed: Notifier::new(),
                validator: Validator::new(),
            })
        }

        fn set_name(&self, name: &str) {
            let _ = self.validator.check_property("Name", name).not_empty();
            *self.name.borrow_mut() = name.to_owned();
            self.changed.emit(&PropertyChanged::new("Name"));
        }
    }

    impl NotifyPropertyChanged for Person {
        fn property_changed(&self) -> &Notifier<PropertyChanged> {
            &self.changed
        }
    }

    impl KeyValueCoding for Person {
        fn accessors() -> &'static AccessorTable<Self> {
            static TABLE: LazyLock<AccessorTable<Person>> = LazyLock::new(|| {
                AccessorTable::new()
                    .read_write(
                        "Name",
                        |p: &Person| p.name.borrow().clone(),
                        |p, v: String| p.set_name(&v),
                    )
                    .read_only("Age", |p: &Person| p.age.get())
            });
            &TABLE
        }

        fn error_info(&self) -> Option<&dyn DataErrorInfo> {
            Some(&self.validator)
        }
    }

    #[test]
    fn accessor_backed_read_write() {
        let p = Person::new();
        let name = Property::<String>::of(&p, "Name").unwrap();
        assert_eq!(name.value(), "Ada");
        name.set_value("Grace".into()).unwrap();
        assert_eq!(*p.name.borrow(), "Grace");
        assert_eq!(name.key(), "Name");
        assert_eq!(name.property_type(), TypeId::of::<String>());
    }

    #[test]
    fn read_only_accessor_rejects_writes() {
        let p = Person::new();
        let age = Property::<u32>::of(&p, "Age").unwrap();
        assert!(age.is_read_only());
        assert!(age.set_value(1).unwrap_err().is_invalid_state());
        assert_eq!(p.age.get(), 36);
    }

    #[test]
    fn unknown_key_and_wrong_type() {
        let p = Person::new();
        assert!(Property::<String>::of(&p, "Nope").unwrap_err().is_invalid_argument());
        assert!(Property::<String>::of(&p, "Age").unwrap_err().is_invalid_argument());
    }

    #[test]
    fn subscription_requires_strategy() {
        let p = Person::new();
        let name = Property::<String>::of(&p, "Name").unwrap();
        assert!(name.on_property_change(|| {}).unwrap_err().is_invalid_state());
    }

    #[test]
    fn notifying_property_sees_own_key_only() {
        let p = Person::new();
        let name = Property::<String>::notifying(&p, "Name").unwrap();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = name.on_property_change(move || h.set(h.get() + 1)).unwrap();

        p.changed.emit(&PropertyChanged::new("Age"));
        p.set_name("Grace");
        assert_eq!(hits.get(), 1);
        sub.dispose();
        p.set_name("Linus");
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn errors_come_from_owner() {
        let p = Person::new();
        let name = Property::<String>::of(&p, "Name").unwrap();
        assert!(!name.has_errors());
        name.set_value(String::new()).unwrap();
        assert!(name.has_errors());
        assert_eq!(name.errors()[0].key(), "Name");
    }

    #[test]
    fn convert_round_trips_through_source() {
        let slot = Observable::new(21_i32);
        let text = Property::from_observable(&slot, "Value")
            .convert(|n| n.to_string(), |s: String| s.parse().unwrap_or_default());
        assert_eq!(text.value(), "21");
        text.set_value("42".into()).unwrap();
        assert_eq!(slot.get(), 42);
        assert!(text.has_strategy());
    }

    #[test]
    fn validator_errors_property_tracks_changes() {
        let validator = Validator::new();
        let errors = Property::validator_errors(&validator);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let _sub = errors.on_property_change(move || h.set(h.get() + 1)).unwrap();

        validator.add_error(ValidationError::new("Name", "required"));
        assert_eq!(hits.get(), 1);
        assert_eq!(errors.value().len(), 1);
        assert!(errors.is_read_only());
    }
}
