#![forbid(unsafe_code)]

//! Properties, bindings and commands for Tether view models.
//!
//! A [`Property`] names one value slot of an owner object and knows how to
//! read it, write it, and (through a [`BindingStrategy`]) hear about its
//! changes. Bindings connect properties and commands to each other:
//!
//! | Binding | Source | Target |
//! |---------|--------|--------|
//! | [`PropertyBinding`] | property | property |
//! | [`CommandBinding`] | [`Command`] | [`EventSource`] |
//! | [`ObjectBinding`] | any [`NotifyPropertyChanged`](tether_core::NotifyPropertyChanged) | handler |
//! | [`BindingList`] / [`WeakBindingList`] | many bindings | |
//!
//! Asynchronous work goes through [`AsyncCommand`], which runs its futures
//! on a caller-supplied [`LocalSpawn`](futures::task::LocalSpawn) and pairs
//! with a [`CancelCommand`].

pub mod async_command;
pub mod binding;
pub mod command;
pub mod command_binding;
pub mod event_source;
pub mod list;
pub mod object_binding;
pub mod property;
pub mod property_binding;
pub mod strategy;

pub use async_command::{AsyncCommand, CancelCommand};
pub use binding::{Binding, BindingId, SyncDirection, WeakBindingHandle};
pub use command::{Command, DelegateCommand};
pub use command_binding::{CommandBinding, CommandHook};
pub use event_source::{EventHandlerSource, EventListSource, EventSource};
pub use list::{BindingList, WeakBindingList};
pub use object_binding::ObjectBinding;
pub use property::Property;
pub use property_binding::{PropertyBinding, SyncAction};
pub use strategy::{BindingStrategy, EventStrategy, ObservableStrategy, PropertyChangedStrategy};
pub use tokio_util::sync::CancellationToken;
