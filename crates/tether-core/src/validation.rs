//! Per-key validation error accumulation.
//!
//! Validation failures are never returned as [`Error`](crate::Error)s. A
//! guarded setter runs checks through [`Validator::check_property`]; failed
//! checks attach a [`ValidationError`] to the property's key and the setter
//! carries on. Bindings read the accumulated errors back through
//! [`DataErrorInfo`].
//!
//! # Invariants
//!
//! 1. [`Validator::check_property`] clears the errors of its key before the
//!    first check runs, so the errors of a key reflect its latest write.
//! 2. A check chain records at most one error: once a check fails, later
//!    checks in the same chain are skipped.
//! 3. `errors_changed` fires with the affected key after the error map is
//!    updated, with no borrow held.

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::notify::Notifier;

/// A validation failure attached to a property key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    key: Cow<'static, str>,
    message: Cow<'static, str>,
}

impl ValidationError {
    /// Create an error for `key`.
    pub fn new(key: impl Into<Cow<'static, str>>, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Key of the offending property.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human-readable description.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message)
    }
}

/// Read access to accumulated validation errors.
pub trait DataErrorInfo {
    /// Errors attached to `key`, in the order they were recorded.
    fn errors_for(&self, key: &str) -> Vec<ValidationError>;

    /// Whether any key carries an error.
    fn has_errors(&self) -> bool;
}

#[derive(Default)]
struct State {
    by_key: AHashMap<Cow<'static, str>, Vec<ValidationError>>,
    order: Vec<Cow<'static, str>>,
}

struct Inner {
    state: RefCell<State>,
    errors_changed: Notifier<str>,
}

/// Shared error store. Clones refer to the same store.
#[derive(Clone)]
pub struct Validator {
    inner: Rc<Inner>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create an empty validator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Inner {
                state: RefCell::new(State::default()),
                errors_changed: Notifier::new(),
            }),
        }
    }

    /// Fired with the key whose errors changed.
    #[must_use]
    pub fn errors_changed(&self) -> &Notifier<str> {
        &self.inner.errors_changed
    }

    /// Attach `error` to its key.
    pub fn add_error(&self, error: ValidationError) {
        let key = error.key.clone();
        {
            let mut state = self.inner.state.borrow_mut();
            if !state.by_key.contains_key(&key) {
                state.order.push(key.clone());
            }
            state.by_key.entry(key.clone()).or_default().push(error);
        }
        tracing::trace!(key = %key, "validation error recorded");
        self.inner.errors_changed.emit(&*key);
    }

    /// Remove the errors of `key`.
    pub fn clear_key(&self, key: &str) {
        let removed = {
            let mut state = self.inner.state.borrow_mut();
            let removed = state.by_key.remove(key).is_some();
            if removed {
                state.order.retain(|k| k != key);
            }
            removed
        };
        if removed {
            self.inner.errors_changed.emit(key);
        }
    }

    /// Remove every error.
    pub fn clear(&self) {
        let keys = {
            let mut state = self.inner.state.borrow_mut();
            state.by_key.clear();
            std::mem::take(&mut state.order)
        };
        for key in keys {
            self.inner.errors_changed.emit(&*key);
        }
    }

    /// Whether `key` carries an error.
    #[must_use]
    pub fn has_errors_for_key(&self, key: &str) -> bool {
        self.inner.state.borrow().by_key.contains_key(key)
    }

    /// Every error, grouped by key in first-failure order.
    #[must_use]
    pub fn all_errors(&self) -> Vec<ValidationError> {
        let state = self.inner.state.borrow();
        state
            .order
            .iter()
            .filter_map(|k| state.by_key.get(k))
            .flatten()
            .cloned()
            .collect()
    }

    /// Keys that carry errors, in first-failure order.
    #[must_use]
    pub fn keys_with_errors(&self) -> Vec<String> {
        self.inner
            .state
            .borrow()
            .order
            .iter()
            .map(|k| k.to_string())
            .collect()
    }

    /// Start a check chain for the value about to be written to `key`.
    ///
    /// Clears the previous errors of `key` first.
    pub fn check_property<'v, T: ?Sized>(
        &'v self,
        key: impl Into<Cow<'static, str>>,
        value: &'v T,
    ) -> Check<'v, T> {
        let key = key.into();
        self.clear_key(&key);
        Check {
            validator: self,
            key,
            value,
            valid: true,
        }
    }
}

impl DataErrorInfo for Validator {
    fn errors_for(&self, key: &str) -> Vec<ValidationError> {
        self.inner
            .state
            .borrow()
            .by_key
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn has_errors(&self) -> bool {
        !self.inner.state.borrow().order.is_empty()
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("keys_with_errors", &self.keys_with_errors())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Check chains
// ---------------------------------------------------------------------------

/// A chain of checks against one value. See [`Validator::check_property`].
#[must_use = "checks are recorded as they run; call is_valid() to read the outcome"]
pub struct Check<'v, T: ?Sized> {
    validator: &'v Validator,
    key: Cow<'static, str>,
    value: &'v T,
    valid: bool,
}

impl<'v, T: ?Sized> Check<'v, T> {
    /// Fail with `message` unless `pred` holds.
    pub fn satisfies(
        mut self,
        pred: impl FnOnce(&T) -> bool,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        if self.valid && !pred(self.value) {
            self.valid = false;
            self.validator
                .add_error(ValidationError::new(self.key.clone(), message));
        }
        self
    }

    /// Whether every check so far passed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl<'v, T: AsRef<str> + ?Sized> Check<'v, T> {
    /// Fail when the string is empty.
    pub fn not_empty(self) -> Self {
        let message = format!("{} must not be empty", self.key);
        self.satisfies(|v| !v.as_ref().is_empty(), message)
    }

    /// Fail when the string has fewer than `min` characters.
    pub fn min_length(self, min: usize) -> Self {
        let message = format!("{} must be at least {min} characters", self.key);
        self.satisfies(|v| v.as_ref().chars().count() >= min, message)
    }

    /// Fail when the string has more than `max` characters.
    pub fn max_length(self, max: usize) -> Self {
        let message = format!("{} must be at most {max} characters", self.key);
        self.satisfies(|v| v.as_ref().chars().count() <= max, message)
    }
}

impl<'v, T: PartialEq + fmt::Debug> Check<'v, T> {
    /// Fail unless the value equals one of `allowed`.
    pub fn one_of(self, allowed: &[T]) -> Self {
        let message = format!("{} must be one of {allowed:?}", self.key);
        self.satisfies(|v| allowed.contains(v), message)
    }
}

impl<'v, U> Check<'v, Option<U>> {
    /// Fail when the value is `None`.
    pub fn is_some(self) -> Self {
        let message = format!("{} is required", self.key);
        self.satisfies(Option::is_some, message)
    }
}
