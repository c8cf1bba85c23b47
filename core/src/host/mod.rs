//! The presentation-tree provider consumed by the engine.
//!
//! The engine never creates or inspects live nodes itself. Everything goes
//! through a [`Host`], which hands out opaque [`NodeId`] handles. Any
//! retained-mode backend can implement it: the browser DOM (see the
//! `ripple-web` crate) or the in-memory [`memory::MemoryHost`].

use alloc::{string::String, vec::Vec};
use core::fmt;

use crate::vnode::{Callback, PropValue};

pub mod memory;

/// Opaque handle to a live node, issued by a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Wraps a raw handle value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Live properties set directly on a node instead of as string attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// The current value of a form control.
    Value,
    /// The checked state of a checkbox or radio button.
    Checked,
    /// The node identifier.
    Id,
}

impl Property {
    /// Maps a prop name to a reserved property.
    #[must_use]
    pub fn from_prop(name: &str) -> Option<Self> {
        match name {
            "value" => Some(Self::Value),
            "checked" => Some(Self::Checked),
            "id" => Some(Self::Id),
            _ => None,
        }
    }

    /// The prop name of this property.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Value => "value",
            Self::Checked => "checked",
            Self::Id => "id",
        }
    }
}

/// A retained-mode presentation tree.
///
/// Methods take `&self`; implementations use interior mutability the way DOM
/// bindings do. The engine only passes handles that this host created.
pub trait Host {
    /// Creates a detached element.
    fn create_element(&self, tag: &str) -> NodeId;

    /// Creates a detached text node.
    fn create_text(&self, text: &str) -> NodeId;

    /// Tag name of an element. `None` for text nodes and roots.
    fn tag_name(&self, node: NodeId) -> Option<String>;

    /// Content of a text node. `None` for anything else.
    fn text_content(&self, node: NodeId) -> Option<String>;

    /// Current parent of a node.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Current children of a node, in order.
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Appends `child` as the last child of `parent`, detaching it from any
    /// previous position first.
    fn append_child(&self, parent: NodeId, child: NodeId);

    /// Puts `new` in the position of `old` under `parent` and detaches `old`.
    fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId);

    /// Detaches a node from its parent.
    fn remove(&self, node: NodeId);

    /// Names of the attributes currently set on a node.
    fn attribute_names(&self, node: NodeId) -> Vec<String>;

    /// Reads a string attribute.
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Writes a string attribute.
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);

    /// Removes a string attribute.
    fn remove_attribute(&self, node: NodeId, name: &str);

    /// Writes a live property. Only primitive values are passed.
    fn set_property(&self, node: NodeId, property: Property, value: &PropValue);

    /// Registers an event listener.
    fn add_listener(&self, node: NodeId, event: &str, listener: &Callback);

    /// Removes a previously registered event listener.
    fn remove_listener(&self, node: NodeId, event: &str, listener: &Callback);

    /// The node that currently has focus.
    fn focused(&self) -> Option<NodeId>;

    /// Moves focus to a node.
    fn focus(&self, node: NodeId);

    /// Called once the engine has discarded a detached node for good.
    fn release(&self, node: NodeId) {
        let _ = node;
    }
}
