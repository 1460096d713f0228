//! State and notifications of an editable view model.
//!
//! A [`DataContext`] is embedded in a view model and carries everything the
//! edit/validate state machine needs that does not depend on the owner
//! type: the open change map, the validating flag, the validator, the
//! property-changed notifier and a [`BindingList`] for the model's bindings.
//! Transitions that read or write the owner's properties live on
//! [`EditableExt`](crate::EditableExt).

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;

use indexmap::IndexMap;
use tether_binding::BindingList;
use tether_core::{
    AnyValue, DataErrorInfo, Notifier, NotifyPropertyChanged, PropertyChanged, ValidationError,
    Validator,
};

/// Key of the notification raised when an edit transaction opens or closes.
pub const EDITING_KEY: &str = "Editing";

/// Key of the notification raised when the change map gains its first entry
/// or is discarded.
pub const HAS_CHANGES_KEY: &str = "HasChanges";

/// Original values captured during an edit transaction, in capture order.
pub(crate) type Changes = IndexMap<&'static str, AnyValue>;

/// Edit, validation and notification state of one view model.
pub struct DataContext {
    property_changed: Notifier<PropertyChanged>,
    validator: Validator,
    pub(crate) changes: RefCell<Option<Changes>>,
    pub(crate) validating: Cell<bool>,
    pub(crate) validated: Cell<bool>,
    bindings: BindingList,
}

impl Default for DataContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DataContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            property_changed: Notifier::new(),
            validator: Validator::new(),
            changes: RefCell::new(None),
            validating: Cell::new(false),
            validated: Cell::new(false),
            bindings: BindingList::new(),
        }
    }

    /// Whether an edit transaction is open.
    #[must_use]
    pub fn is_editing(&self) -> bool {
        self.changes.borrow().is_some()
    }

    /// Whether the open transaction captured at least one original value.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.changes.borrow().as_ref().is_some_and(|c| !c.is_empty())
    }

    /// Whether a validation sweep is running.
    #[must_use]
    pub fn is_validating(&self) -> bool {
        self.validating.get()
    }

    /// Whether at least one validation sweep has started.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.validated.get()
    }

    /// Keys captured by the open transaction, in capture order.
    #[must_use]
    pub fn changed_keys(&self) -> Vec<&'static str> {
        self.changes
            .borrow()
            .as_ref()
            .map(|c| c.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Value `key` had before the open transaction first touched it.
    ///
    /// `None` when not editing, when `key` was not captured, or when `T` is
    /// not the property's type.
    #[must_use]
    pub fn original_value<T: Any + Clone>(&self, key: &str) -> Option<T> {
        self.changes
            .borrow()
            .as_ref()?
            .get(key)?
            .downcast_ref::<T>()
            .cloned()
    }

    /// The validator guarded setters report to.
    ///
    /// Reading it here never runs a sweep; view models that want the first
    /// read to reflect every property use
    /// [`EditableExt::validator_checked`](crate::EditableExt::validator_checked).
    #[must_use]
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    #[must_use]
    pub fn has_errors_for_key(&self, key: &str) -> bool {
        self.validator.has_errors_for_key(key)
    }

    /// Bindings owned by this view model.
    #[must_use]
    pub fn bindings(&self) -> &BindingList {
        &self.bindings
    }

    /// Raise a change notification for `key`. Suppressed while validating.
    pub fn raise_property_changed(&self, key: &str) {
        if self.validating.get() {
            tracing::trace!(key, "change notification suppressed during validation");
            return;
        }
        self.property_changed.emit(&PropertyChanged::new(key.to_owned()));
    }

    /// Store `value` in `slot` and raise a change notification for `key`.
    ///
    /// Returns `false`, leaving `slot` untouched, while validating or when
    /// the value is unchanged.
    pub fn set_property<T: PartialEq>(&self, slot: &RefCell<T>, value: T, key: &str) -> bool {
        if self.validating.get() || *slot.borrow() == value {
            return false;
        }
        *slot.borrow_mut() = value;
        self.raise_property_changed(key);
        true
    }

    /// Emit directly, bypassing the validation suppression.
    pub(crate) fn emit(&self, key: &str) {
        self.property_changed.emit(&PropertyChanged::new(key.to_owned()));
    }
}

impl NotifyPropertyChanged for DataContext {
    fn property_changed(&self) -> &Notifier<PropertyChanged> {
        &self.property_changed
    }
}

impl DataErrorInfo for DataContext {
    fn errors_for(&self, key: &str) -> Vec<ValidationError> {
        self.validator.errors_for(key)
    }

    fn has_errors(&self) -> bool {
        self.validator.has_errors()
    }
}

impl fmt::Debug for DataContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataContext")
            .field("editing", &self.is_editing())
            .field("changed_keys", &self.changed_keys())
            .field("validating", &self.validating.get())
            .field("validator", &self.validator)
            .finish()
    }
}
