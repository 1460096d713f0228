#![forbid(unsafe_code)]

//! Observable collections for Tether view models.
//!
//! [`ObservableList<T>`] raises one [`CollectionChanged`] per structural
//! mutation plus `"Count"`/`"Item[]"` property notifications, and refuses
//! mutation from inside its own change notification when other subscribers
//! are still to be notified.

pub mod change;
pub mod list;
pub mod monitor;

pub use change::{CollectionAction, CollectionChanged};
pub use list::{COUNT_KEY, ITEMS_KEY, ObservableList};
pub use monitor::{ReentrancyGuard, ReentrancyMonitor};
