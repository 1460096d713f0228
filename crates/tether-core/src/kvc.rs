//! Key-value coding: precomputed accessor tables keyed by property name.
//!
//! Bindings and data contexts need to read and write an owner's property by
//! *name* (`"Name"`, `"Industry"`) without knowing its concrete type. Instead
//! of runtime introspection, each owner type builds an [`AccessorTable`] once
//! and hands it out through [`KeyValueCoding::accessors`].
//!
//! Typed access ([`AccessorTable::accessor`]) checks the value type once and
//! then calls the registered closures directly. Untyped access
//! ([`AccessorTable::get`], [`AccessorTable::set`]) moves values as
//! [`AnyValue`] and is what edit transactions and validation sweeps use.
//!
//! # Example
//!
//! ```
//! use std::cell::RefCell;
//! use std::sync::LazyLock;
//! use tether_core::{AccessorTable, KeyValueCoding};
//!
//! struct Person {
//!     name: RefCell<String>,
//! }
//!
//! impl KeyValueCoding for Person {
//!     fn accessors() -> &'static AccessorTable<Self> {
//!         static TABLE: LazyLock<AccessorTable<Person>> = LazyLock::new(|| {
//!             AccessorTable::new()
//!                 .read_write("Name", |p: &Person| p.name.borrow().clone(), |p, v| {
//!                     *p.name.borrow_mut() = v;
//!                 })
//!                 .read_only("Initial", |p: &Person| p.name.borrow().chars().next())
//!         });
//!         &TABLE
//!     }
//! }
//!
//! let p = Person { name: RefCell::new("Ada".into()) };
//! let name = Person::accessors().accessor::<String>("Name").unwrap();
//! name.set(&p, "Grace".into());
//! assert_eq!(name.get(&p), "Grace");
//! assert!(Person::accessors().is_read_only("Initial"));
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt;

use crate::error::{Error, Result};
use crate::validation::DataErrorInfo;

/// A type-erased property value.
pub type AnyValue = Box<dyn Any>;

/// Typed getter/setter pair for one property of `O`.
pub struct Accessor<O, T> {
    getter: Box<dyn Fn(&O) -> T + Send + Sync>,
    setter: Option<Box<dyn Fn(&O, T) + Send + Sync>>,
}

impl<O, T> Accessor<O, T> {
    /// Read the property from `owner`.
    pub fn get(&self, owner: &O) -> T {
        (self.getter)(owner)
    }

    /// Write the property on `owner`. Returns `false` for read-only
    /// properties, leaving the owner untouched.
    pub fn set(&self, owner: &O, value: T) -> bool {
        match &self.setter {
            Some(setter) => {
                setter(owner, value);
                true
            }
            None => false,
        }
    }

    /// Whether the property has no setter.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

impl<O, T> fmt::Debug for Accessor<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("read_only", &self.is_read_only())
            .finish_non_exhaustive()
    }
}

trait ErasedAccessor<O>: Send + Sync {
    fn get_any(&self, owner: &O) -> AnyValue;
    fn set_any(&self, owner: &O, key: &str, value: AnyValue) -> Result<()>;
    fn read_only(&self) -> bool;
    fn value_type(&self) -> TypeId;
    fn value_type_name(&self) -> &'static str;
    fn as_any(&self) -> &dyn Any;
}

impl<O: 'static, T: 'static> ErasedAccessor<O> for Accessor<O, T> {
    fn get_any(&self, owner: &O) -> AnyValue {
        Box::new(self.get(owner))
    }

    fn set_any(&self, owner: &O, key: &str, value: AnyValue) -> Result<()> {
        let value = value.downcast::<T>().map_err(|_| {
            Error::invalid_argument(format!(
                "value for '{key}' is not of type {}",
                type_name::<T>()
            ))
        })?;
        if self.set(owner, *value) {
            Ok(())
        } else {
            Err(Error::invalid_state(format!("property '{key}' is read-only")))
        }
    }

    fn read_only(&self) -> bool {
        self.is_read_only()
    }

    fn value_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn value_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Entry<O> {
    key: &'static str,
    accessor: Box<dyn ErasedAccessor<O>>,
    validate: bool,
}

/// Ordered table of named accessors for owner type `O`.
///
/// Entries keep registration order; [`keys`](Self::keys) and the validation
/// sweep of a data context iterate in that order. Registering a key twice
/// replaces the earlier entry in place.
pub struct AccessorTable<O> {
    entries: Vec<Entry<O>>,
}

impl<O: 'static> Default for AccessorTable<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: 'static> AccessorTable<O> {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a read-write property.
    #[must_use]
    pub fn read_write<T: 'static>(
        self,
        key: &'static str,
        getter: impl Fn(&O) -> T + Send + Sync + 'static,
        setter: impl Fn(&O, T) + Send + Sync + 'static,
    ) -> Self {
        self.insert(
            key,
            Accessor {
                getter: Box::new(getter),
                setter: Some(Box::new(setter)),
            },
        )
    }

    /// Register a read-only property.
    #[must_use]
    pub fn read_only<T: 'static>(
        self,
        key: &'static str,
        getter: impl Fn(&O) -> T + Send + Sync + 'static,
    ) -> Self {
        self.insert(
            key,
            Accessor {
                getter: Box::new(getter),
                setter: None,
            },
        )
    }

    /// Exclude `key` from the get-then-set round trip of validation sweeps.
    #[must_use]
    pub fn skip_validation(mut self, key: &str) -> Self {
        match self.entries.iter_mut().find(|e| e.key == key) {
            Some(entry) => entry.validate = false,
            None => tracing::warn!(key, "skip_validation for unregistered key"),
        }
        self
    }

    fn insert<T: 'static>(mut self, key: &'static str, accessor: Accessor<O, T>) -> Self {
        let entry = Entry {
            key,
            accessor: Box::new(accessor),
            validate: true,
        };
        if let Some(existing) = self.entries.iter_mut().find(|e| e.key == key) {
            tracing::debug!(key, "accessor replaced");
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
        self
    }

    fn entry(&self, key: &str) -> Result<&Entry<O>> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "'{}' has no property named '{key}'",
                    type_name::<O>()
                ))
            })
    }

    /// Typed accessor for `key`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `key` is unknown or its value type is
    /// not `T`.
    pub fn accessor<T: 'static>(&self, key: &str) -> Result<&Accessor<O, T>> {
        let entry = self.entry(key)?;
        entry
            .accessor
            .as_any()
            .downcast_ref::<Accessor<O, T>>()
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "property '{key}' has type {}, not {}",
                    entry.accessor.value_type_name(),
                    type_name::<T>()
                ))
            })
    }

    /// Read `key` from `owner` as an [`AnyValue`].
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `key` is unknown.
    pub fn get(&self, owner: &O, key: &str) -> Result<AnyValue> {
        Ok(self.entry(key)?.accessor.get_any(owner))
    }

    /// Write an [`AnyValue`] to `key` on `owner`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] for an unknown key or a value of the wrong
    /// type, [`Error::InvalidState`] for a read-only property.
    pub fn set(&self, owner: &O, key: &str, value: AnyValue) -> Result<()> {
        self.entry(key)?.accessor.set_any(owner, key, value)
    }

    /// Whether `key` is read-only. Unknown keys report `true`.
    #[must_use]
    pub fn is_read_only(&self, key: &str) -> bool {
        self.entry(key).map_or(true, |e| e.accessor.read_only())
    }

    /// Whether `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    /// The registered `'static` spelling of `key`.
    #[must_use]
    pub fn canonical_key(&self, key: &str) -> Option<&'static str> {
        self.entries.iter().find(|e| e.key == key).map(|e| e.key)
    }

    /// Value type of `key`.
    #[must_use]
    pub fn value_type(&self, key: &str) -> Option<TypeId> {
        self.entry(key).ok().map(|e| e.accessor.value_type())
    }

    /// All keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.key)
    }

    /// Read-write keys that take part in validation sweeps.
    pub fn validation_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(|e| e.validate && !e.accessor.read_only())
            .map(|e| e.key)
    }

    /// Number of registered properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<O> fmt::Debug for AccessorTable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.key))
            .finish()
    }
}

/// Owner types whose properties can be read and written by name.
pub trait KeyValueCoding: Sized + 'static {
    /// The accessor table for this type, built once.
    fn accessors() -> &'static AccessorTable<Self>;

    /// Error-reporting capability of this owner, if it has one.
    fn error_info(&self) -> Option<&dyn DataErrorInfo> {
        None
    }

    /// Read `key` as an [`AnyValue`].
    ///
    /// # Errors
    ///
    /// See [`AccessorTable::get`].
    fn value_for_key(&self, key: &str) -> Result<AnyValue> {
        Self::accessors().get(self, key)
    }

    /// Write `key` from an [`AnyValue`].
    ///
    /// # Errors
    ///
    /// See [`AccessorTable::set`].
    fn set_value_for_key(&self, key: &str, value: AnyValue) -> Result<()> {
        Self::accessors().set(self, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::sync::LazyLock;

    struct Counter {
        count: Cell<i32>,
        label: &'static str,
    }

    impl KeyValueCoding for Counter {
        fn accessors() -> &'static AccessorTable<Self> {
            static TABLE: LazyLock<AccessorTable<Counter>> = LazyLock::new(|| {
                AccessorTable::new()
                    .read_write("Count", |c: &Counter| c.count.get(), |c, v| c.count.set(v))
                    .read_only("Label", |c: &Counter| c.label)
                    .read_write("Shadow", |c: &Counter| c.count.get() * 2, |_, _: i32| {})
                    .skip_validation("Shadow")
            });
            &TABLE
        }
    }

    fn counter() -> Counter {
        Counter {
            count: Cell::new(1),
            label: "clicks",
        }
    }

    #[test]
    fn typed_accessor_round_trip() {
        let c = counter();
        let acc = Counter::accessors().accessor::<i32>("Count").unwrap();
        assert!(acc.set(&c, 4));
        assert_eq!(acc.get(&c), 4);
    }

    #[test]
    fn typed_accessor_rejects_wrong_type() {
        let err = Counter::accessors().accessor::<String>("Count").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn unknown_key_is_invalid_argument() {
        let c = counter();
        assert!(c.value_for_key("Missing").unwrap_err().is_invalid_argument());
        assert!(Counter::accessors().is_read_only("Missing"));
    }

    #[test]
    fn erased_get_and_set() {
        let c = counter();
        let v = c.value_for_key("Count").unwrap();
        assert_eq!(v.downcast_ref::<i32>(), Some(&1));
        c.set_value_for_key("Count", Box::new(10_i32)).unwrap();
        assert_eq!(c.count.get(), 10);
    }

    #[test]
    fn erased_set_checks_type_and_read_only() {
        let c = counter();
        assert!(
            c.set_value_for_key("Count", Box::new("ten"))
                .unwrap_err()
                .is_invalid_argument()
        );
        assert!(
            c.set_value_for_key("Label", Box::new("x"))
                .unwrap_err()
                .is_invalid_state()
        );
    }

    #[test]
    fn key_iteration_order_and_validation_filter() {
        let table = Counter::accessors();
        assert_eq!(table.keys().collect::<Vec<_>>(), ["Count", "Label", "Shadow"]);
        assert_eq!(table.validation_keys().collect::<Vec<_>>(), ["Count"]);
        assert_eq!(table.canonical_key("Label"), Some("Label"));
        assert_eq!(table.value_type("Count"), Some(TypeId::of::<i32>()));
    }

    #[test]
    fn re_registering_replaces_in_place() {
        let table: AccessorTable<Counter> = AccessorTable::new()
            .read_only("A", |_: &Counter| 1)
            .read_only("B", |_: &Counter| 2)
            .read_only("A", |_: &Counter| 3);
        assert_eq!(table.len(), 2);
        let c = counter();
        assert_eq!(table.accessor::<i32>("A").unwrap().get(&c), 3);
    }
}
