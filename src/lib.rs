#![doc = include_str!("../README.md")]
#![allow(clippy::multiple_crate_versions)]

pub mod logging;

#[doc(inline)]
pub use ripple_core::{
    CLASS_NAME_PROP, Callback, Child, Component, ComponentType, EVENT_PREFIX, Error, Event, Handle,
    Host, InstanceId, Key, NodeId, NodeType, PropValue, Property, Props, Reconciler,
    ReconcilerBuilder, ReconcilerOptions, Result, Scope, Stateless, VNode, component, host, vnode,
};

/// Re-export of the `tracing` crate the engine logs through.
pub use tracing as log;

pub mod prelude {
    //! The types needed to describe and mount a tree.
    //!
    //! ```rust
    //! use ripple::prelude::*;
    //!
    //! let host = MemoryHost::new();
    //! let reconciler = Reconciler::new(host.clone());
    //! let tree: Child = VNode::element("p").child("hello").into();
    //! reconciler.render(&tree, Some(host.root())).unwrap();
    //! assert_eq!(host.inner_html(host.root()), "<p>hello</p>");
    //! ```
    pub use ripple_core::host::memory::MemoryHost;
    pub use ripple_core::{
        Callback, Child, Component, Event, Handle, Host, Key, NodeId, PropValue, Props,
        Reconciler, Scope, VNode,
    };
}
