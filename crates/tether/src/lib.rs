#![forbid(unsafe_code)]

//! Tether: properties, bindings, commands, editable data contexts and
//! observable collections for view models.
//!
//! | Crate | Re-exported as |
//! |-------|----------------|
//! | `tether-core` | [`base`] |
//! | `tether-binding` | [`binding`] |
//! | `tether-context` (feature `context`) | [`context`] |
//! | `tether-collections` (feature `collections`) | [`collections`] |
//!
//! Most applications only need the [`prelude`].
//!
//! ```
//! use tether::prelude::*;
//!
//! let model = Observable::new(3);
//! let view = Observable::new(0);
//! let bindings = BindingList::new();
//! bindings
//!     .add(
//!         PropertyBinding::new(Property::from_observable(&model, "Value"))
//!             .to(Property::from_observable(&view, "Text"))
//!             .one_way(),
//!     )
//!     .unwrap();
//!
//! bindings.bind().unwrap();
//! bindings.update_target();
//! assert_eq!(view.get(), 3);
//! ```

pub use tether_binding as binding;
#[cfg(feature = "collections")]
pub use tether_collections as collections;
#[cfg(feature = "context")]
pub use tether_context as context;
pub use tether_core as base;

pub use tether_core::{Error, Result};

/// The types and traits most view models use.
pub mod prelude {
    pub use tether_binding::{
        AsyncCommand, Binding, BindingList, BindingStrategy, CancelCommand, CancellationToken,
        Command, CommandBinding, DelegateCommand, EventHandlerSource, EventListSource,
        EventSource, ObjectBinding, Property, PropertyBinding, WeakBindingList,
    };
    #[cfg(feature = "collections")]
    pub use tether_collections::{CollectionAction, CollectionChanged, ObservableList};
    #[cfg(feature = "context")]
    pub use tether_context::{DataContext, Editable, EditableExt};
    pub use tether_core::{
        AccessorTable, DataErrorInfo, Error, KeyValueCoding, Notifier, NotifyPropertyChanged,
        Observable, PropertyChanged, Result, Subscription, ValidationError, Validator,
    };
}
