#![forbid(unsafe_code)]

//! Editable data contexts for Tether view models.
//!
//! Embed a [`DataContext`] in a view model, implement [`Editable`] for it,
//! and the [`EditableExt`] transitions (`begin_edit`, `cancel_edit`,
//! `end_edit`, `validate`) become available on the view model itself.

pub mod context;
pub mod editable;

pub use context::{DataContext, EDITING_KEY, HAS_CHANGES_KEY};
pub use editable::{Editable, EditableExt};
