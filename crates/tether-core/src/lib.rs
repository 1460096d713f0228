#![forbid(unsafe_code)]

//! Core primitives for Tether view-model bindings.
//!
//! Everything here is single-threaded: shared state lives in `Rc` with
//! `Cell`/`RefCell` interiors, and change signals are synchronous ordered
//! callback registries.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`notify`] | [`Notifier`], RAII [`Subscription`], property-changed protocol |
//! | [`observable`] | [`Observable<T>`] value slot |
//! | [`kvc`] | [`AccessorTable`] and [`KeyValueCoding`]: by-name property access |
//! | [`validation`] | [`Validator`], check chains, [`DataErrorInfo`] |
//! | [`error`] | [`Error`] and [`Result`] |

pub mod error;
pub mod kvc;
pub mod notify;
pub mod observable;
pub mod validation;

pub use error::{Error, Result};
pub use kvc::{Accessor, AccessorTable, AnyValue, KeyValueCoding};
pub use notify::{Notifier, NotifyPropertyChanged, PropertyChanged, Subscription};
pub use observable::Observable;
pub use validation::{Check, DataErrorInfo, ValidationError, Validator};
