//! The edit transaction and validation sweep of an editable view model.
//!
//! # State machine
//!
//! ```text
//!            begin_edit                 end_edit / cancel_edit
//!   Idle ────────────────▶ Editing ──────────────────────────▶ Idle
//!     │                      │
//!     └── validate ──▶ Validating (overlaps either state) ──▶ back
//! ```
//!
//! # Invariants
//!
//! 1. The change map holds at most one original per key, captured on the
//!    first [`remember`](EditableExt::remember) of the transaction.
//! 2. `cancel_edit` closes the transaction before restoring, so the
//!    restoring setters never capture again.
//! 3. While validating, ordinary change notifications are suppressed and
//!    [`DataContext::set_property`] does not store; afterwards exactly one
//!    notification is raised per key carrying an error, even if a hook
//!    panicked.

use std::cell::RefCell;

use tether_core::{DataErrorInfo, KeyValueCoding, ValidationError, Validator};
use tracing::{debug, trace, warn};

use crate::context::{DataContext, EDITING_KEY, HAS_CHANGES_KEY};

/// A view model with an embedded [`DataContext`].
///
/// Guarded setters follow the same pattern: check the value through the
/// context's validator, then commit with
/// [`update_property`](EditableExt::update_property), which remembers the
/// key before storing. Validation errors never prevent the write.
///
/// ```
/// use std::cell::RefCell;
/// use std::sync::LazyLock;
/// use tether_context::{DataContext, Editable, EditableExt};
/// use tether_core::{AccessorTable, KeyValueCoding};
///
/// #[derive(Default)]
/// struct Profile {
///     ctx: DataContext,
///     name: RefCell<String>,
/// }
///
/// impl Profile {
///     fn set_name(&self, value: String) {
///         let _ = self.ctx.validator().check_property("Name", &value).not_empty();
///         self.update_property(&self.name, value, "Name");
///     }
/// }
///
/// impl KeyValueCoding for Profile {
///     fn accessors() -> &'static AccessorTable<Self> {
///         static TABLE: LazyLock<AccessorTable<Profile>> = LazyLock::new(|| {
///             AccessorTable::new().read_write(
///                 "Name",
///                 |p: &Profile| p.name.borrow().clone(),
///                 Profile::set_name,
///             )
///         });
///         &TABLE
///     }
/// }
///
/// impl Editable for Profile {
///     fn data_context(&self) -> &DataContext {
///         &self.ctx
///     }
/// }
///
/// let profile = Profile::default();
/// assert!(profile.validate());
///
/// profile.begin_edit();
/// profile.set_name("Ada".into());
/// profile.cancel_edit();
/// assert_eq!(*profile.name.borrow(), "");
/// ```
pub trait Editable: KeyValueCoding {
    /// The embedded context.
    fn data_context(&self) -> &DataContext;

    /// Runs after a transaction opens.
    fn on_begin_edit(&self) {}

    /// Runs before the captured originals are restored.
    fn on_cancel_edit(&self) {}

    /// Runs before a transaction closes keeping its values.
    fn on_end_edit(&self) {}

    /// Runs after the property sweep of [`validate`](EditableExt::validate),
    /// for checks spanning several properties.
    fn on_validate(&self) {}
}

/// Transitions of the edit/validate state machine, available on every
/// [`Editable`].
pub trait EditableExt: Editable {
    /// Open an edit transaction. No-op when one is open.
    fn begin_edit(&self) {
        let ctx = self.data_context();
        if ctx.is_editing() {
            return;
        }
        *ctx.changes.borrow_mut() = Some(Default::default());
        debug!(editing = true, "edit transaction opened");
        self.on_begin_edit();
        ctx.raise_property_changed(EDITING_KEY);
    }

    /// Capture the current value of `key` if this is its first touch in the
    /// open transaction. No-op when not editing or while validating.
    fn remember(&self, key: &str) {
        let ctx = self.data_context();
        if ctx.is_validating() {
            return;
        }
        let already = match ctx.changes.borrow().as_ref() {
            None => return,
            Some(changes) => changes.contains_key(key),
        };
        if already {
            return;
        }
        let Some(key) = Self::accessors().canonical_key(key) else {
            warn!(key, "remember called for unregistered key");
            return;
        };
        let original = match Self::accessors().get(self, key) {
            Ok(value) => value,
            Err(err) => {
                warn!(key, %err, "could not capture original value");
                return;
            }
        };
        let first = {
            let mut changes = ctx.changes.borrow_mut();
            let Some(changes) = changes.as_mut() else {
                return;
            };
            changes.insert(key, original);
            changes.len() == 1
        };
        trace!(key, "original captured");
        if first {
            ctx.raise_property_changed(HAS_CHANGES_KEY);
        }
    }

    /// [`begin_edit`](Self::begin_edit) if needed, then
    /// [`remember`](Self::remember) `key`.
    fn remember_and_begin_edit(&self, key: &str) {
        self.begin_edit();
        self.remember(key);
    }

    /// Close the transaction and write every captured original back, in
    /// capture order. No-op when not editing.
    fn cancel_edit(&self) {
        let ctx = self.data_context();
        if !ctx.is_editing() {
            return;
        }
        self.on_cancel_edit();
        let changes = ctx.changes.borrow_mut().take().unwrap_or_default();
        debug!(editing = false, restored = changes.len(), "edit transaction cancelled");
        for (key, original) in changes {
            if let Err(err) = Self::accessors().set(self, key, original) {
                warn!(key, %err, "could not restore original value");
            }
        }
        ctx.raise_property_changed(HAS_CHANGES_KEY);
        ctx.raise_property_changed(EDITING_KEY);
    }

    /// Close the transaction keeping current values. No-op when not editing.
    fn end_edit(&self) {
        let ctx = self.data_context();
        if !ctx.is_editing() {
            return;
        }
        self.on_end_edit();
        let changes = ctx.changes.borrow_mut().take();
        debug!(
            editing = false,
            kept = changes.as_ref().map_or(0, |c| c.len()),
            "edit transaction ended"
        );
        ctx.raise_property_changed(HAS_CHANGES_KEY);
        ctx.raise_property_changed(EDITING_KEY);
    }

    /// [`remember`](Self::remember) `key`, then store `value` through
    /// [`DataContext::set_property`]. The usual tail of a guarded setter.
    fn update_property<T: PartialEq>(&self, slot: &RefCell<T>, value: T, key: &str) -> bool {
        self.remember(key);
        self.data_context().set_property(slot, value, key)
    }

    /// Re-run every guarded setter and report whether any validation error
    /// exists afterwards.
    ///
    /// Clears the validator, writes each read-write property not exempt
    /// from validation back to itself, then runs
    /// [`on_validate`](Editable::on_validate).
    fn validate(&self) -> bool {
        let ctx = self.data_context();
        let sweep = Sweep::start(ctx);
        ctx.validator().clear();
        for key in Self::accessors().validation_keys() {
            let round_trip = Self::accessors()
                .get(self, key)
                .and_then(|value| Self::accessors().set(self, key, value));
            if let Err(err) = round_trip {
                warn!(key, %err, "validation round trip failed");
            }
        }
        self.on_validate();
        drop(sweep);
        ctx.has_errors()
    }

    /// The context's validator, after a first full [`validate`](Self::validate)
    /// if none has run yet. Inside a sweep the validator is returned as is.
    fn validator_checked(&self) -> &Validator {
        let ctx = self.data_context();
        if !ctx.is_validated() && !ctx.is_validating() {
            trace!("first validator access, running initial sweep");
            self.validate();
        }
        ctx.validator()
    }

    /// Whether any property carries a validation error. The first call on a
    /// fresh context runs a full sweep, so an invalid model reports errors
    /// before any setter ran.
    fn has_errors(&self) -> bool {
        self.validator_checked().has_errors()
    }

    /// Errors of `key`, with the same initial sweep as
    /// [`has_errors`](Self::has_errors).
    fn errors_for_key(&self, key: &str) -> Vec<ValidationError> {
        self.validator_checked().errors_for(key)
    }
}

impl<T: Editable> EditableExt for T {}

/// Marks a validation sweep. Dropping it reports the keys carrying errors
/// and leaves the validating state.
struct Sweep<'a> {
    ctx: &'a DataContext,
}

impl<'a> Sweep<'a> {
    fn start(ctx: &'a DataContext) -> Self {
        ctx.validating.set(true);
        ctx.validated.set(true);
        Self { ctx }
    }
}

impl Drop for Sweep<'_> {
    fn drop(&mut self) {
        let keys = self.ctx.validator().keys_with_errors();
        debug!(errors = keys.len(), "validation sweep finished");
        for key in &keys {
            self.ctx.emit(key);
        }
        self.ctx.validating.set(false);
    }
}
