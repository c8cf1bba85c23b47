#![doc = include_str!("../README.md")]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

mod binder;
pub mod component;
mod error;
pub mod host;
mod patch;
mod reconciler;
mod registry;
mod render;
pub mod vnode;


pub use binder::{CLASS_NAME_PROP, EVENT_PREFIX};
pub use component::{Component, ComponentType, Handle, InstanceId, Scope};
pub use error::{Error, Result};
pub use host::{Host, NodeId, Property};
pub use reconciler::{Reconciler, ReconcilerBuilder, ReconcilerOptions};
pub use vnode::{Callback, Child, Event, Key, NodeType, PropValue, Props, Stateless, VNode};
