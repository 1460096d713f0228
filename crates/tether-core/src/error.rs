//! Error taxonomy shared by every Tether crate.
//!
//! # Failure Modes
//!
//! | Variant | Cause |
//! |---------|-------|
//! | `InvalidArgument` | Bad configuration input (unknown key, duplicate member, type mismatch) |
//! | `IndexOutOfRange` | List index outside `0..len` (or `0..=len` for inserts) |
//! | `InvalidState` | Operation forbidden in the current state (rebinding while bound, no change strategy, reentrant mutation) |
//! | `CommandFailed` | Error captured from an asynchronous command action |
//!
//! Validation failures are *not* errors: they accumulate in a
//! [`Validator`](crate::Validator) and are reported through
//! [`DataErrorInfo`](crate::DataErrorInfo).

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

/// Errors raised by bindings, commands, contexts and observable lists.
#[derive(Debug, Clone)]
pub enum Error {
    /// A configuration call received an argument it cannot accept.
    InvalidArgument(Cow<'static, str>),
    /// An index was outside the valid range for the collection.
    IndexOutOfRange { index: usize, len: usize },
    /// The operation is not allowed in the current state.
    InvalidState(Cow<'static, str>),
    /// An asynchronous command action failed; the error is shared with the
    /// command's `error()` attribute.
    CommandFailed(Rc<anyhow::Error>),
}

impl Error {
    /// Shorthand for [`Error::InvalidArgument`].
    pub fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Shorthand for [`Error::InvalidState`].
    pub fn invalid_state(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Whether this error belongs to the argument-invalid family.
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::IndexOutOfRange { .. })
    }

    /// Whether this error is an invalid-state signal.
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::InvalidState(msg) => write!(f, "invalid state: {msg}"),
            Self::CommandFailed(err) => write!(f, "command failed: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CommandFailed(err) => {
                let inner: &(dyn std::error::Error + 'static) = (**err).as_ref();
                Some(inner)
            }
            _ => None,
        }
    }
}

/// Result alias used across Tether.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            Error::invalid_argument("unknown key 'x'").to_string(),
            "invalid argument: unknown key 'x'"
        );
        assert_eq!(
            Error::IndexOutOfRange { index: 4, len: 2 }.to_string(),
            "index 4 out of range for length 2"
        );
        assert_eq!(
            Error::invalid_state("source is not set").to_string(),
            "invalid state: source is not set"
        );
    }

    #[test]
    fn classification() {
        assert!(Error::IndexOutOfRange { index: 0, len: 0 }.is_invalid_argument());
        assert!(Error::invalid_state("busy").is_invalid_state());
        assert!(!Error::invalid_state("busy").is_invalid_argument());
    }

    #[test]
    fn command_failure_exposes_source() {
        let err = Error::CommandFailed(Rc::new(anyhow::anyhow!("disk full")));
        assert_eq!(err.to_string(), "command failed: disk full");
        assert!(std::error::Error::source(&err).is_some());
    }
}
