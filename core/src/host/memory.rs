//! In-memory presentation tree.
//!
//! [`MemoryHost`] keeps a small document in an arena. It is used for headless
//! rendering and throughout the test-suite, and behaves like a DOM where it
//! matters to the engine: `append_child` moves nodes, the `id` property is
//! reflected as an attribute while `value` and `checked` are not, and focus is
//! a single document-wide slot.

use alloc::{rc::Rc, string::String, vec::Vec};
use core::cell::RefCell;
use core::fmt::Write as _;
use std::collections::HashMap;

use indexmap::IndexMap;

use super::{Host, NodeId, Property};
use crate::vnode::{Callback, Event, PropValue};

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Root,
    Element(String),
    Text(String),
}

#[derive(Debug)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attributes: IndexMap<String, String>,
    properties: HashMap<Property, PropValue>,
    listeners: Vec<(String, Callback)>,
    released: bool,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attributes: IndexMap::new(),
            properties: HashMap::new(),
            listeners: Vec::new(),
            released: false,
        }
    }
}

#[derive(Debug)]
struct Document {
    nodes: Vec<NodeData>,
    focused: Option<NodeId>,
}

impl Document {
    fn alloc(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_raw(self.nodes.len() as u64);
        self.nodes.push(NodeData::new(kind));
        id
    }

    #[allow(clippy::cast_possible_truncation)]
    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.into_raw() as usize]
    }

    #[allow(clippy::cast_possible_truncation)]
    fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.into_raw() as usize]
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node_mut(child).parent.take() {
            self.node_mut(parent).children.retain(|c| *c != child);
        }
    }
}

/// A cloneable handle to an in-memory document.
///
/// Clones share the same document, so a test can keep one handle while the
/// [`Reconciler`](crate::Reconciler) owns another.
#[derive(Debug, Clone)]
pub struct MemoryHost {
    doc: Rc<RefCell<Document>>,
    root: NodeId,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    /// Creates an empty document with a single root container.
    #[must_use]
    pub fn new() -> Self {
        let mut doc = Document {
            nodes: Vec::new(),
            focused: None,
        };
        let root = doc.alloc(NodeKind::Root);
        Self {
            doc: Rc::new(RefCell::new(doc)),
            root,
        }
    }

    /// The document's root container.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Reads a live property.
    #[must_use]
    pub fn property(&self, node: NodeId, property: Property) -> Option<PropValue> {
        self.doc.borrow().node(node).properties.get(&property).cloned()
    }

    /// Number of listeners registered for `event` on a node.
    #[must_use]
    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.doc
            .borrow()
            .node(node)
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .count()
    }

    /// Whether the engine has released this node.
    #[must_use]
    pub fn is_released(&self, node: NodeId) -> bool {
        self.doc.borrow().node(node).released
    }

    /// Fires `event` on a node, invoking every matching listener in
    /// registration order. Returns how many listeners ran.
    ///
    /// The document is not borrowed while listeners run, so they may freely
    /// re-enter the engine.
    pub fn dispatch(&self, node: NodeId, event: &str) -> usize {
        let listeners: Vec<Callback> = self
            .doc
            .borrow()
            .node(node)
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, cb)| cb.clone())
            .collect();
        let event = Event::new(event, node);
        for listener in &listeners {
            listener.call(&event);
        }
        listeners.len()
    }

    /// Serializes a node and its subtree as markup.
    ///
    /// The root container serializes as its children only.
    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        write_node(&self.doc.borrow(), node, &mut out);
        out
    }

    /// Serializes the children of a node.
    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let doc = self.doc.borrow();
        let mut out = String::new();
        for child in &doc.node(node).children {
            write_node(&doc, *child, &mut out);
        }
        out
    }
}

fn write_node(doc: &Document, node: NodeId, out: &mut String) {
    let data = doc.node(node);
    match &data.kind {
        NodeKind::Text(text) => out.push_str(&escape(text, false)),
        NodeKind::Root => {
            for child in &data.children {
                write_node(doc, *child, out);
            }
        }
        NodeKind::Element(tag) => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in &data.attributes {
                let _ = write!(out, " {name}=\"{}\"", escape(value, true));
            }
            out.push('>');
            for child in &data.children {
                write_node(doc, *child, out);
            }
            let _ = write!(out, "</{tag}>");
        }
    }
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

impl Host for MemoryHost {
    fn create_element(&self, tag: &str) -> NodeId {
        self.doc.borrow_mut().alloc(NodeKind::Element(tag.into()))
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.doc.borrow_mut().alloc(NodeKind::Text(text.into()))
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        match &self.doc.borrow().node(node).kind {
            NodeKind::Element(tag) => Some(tag.clone()),
            NodeKind::Root | NodeKind::Text(_) => None,
        }
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        match &self.doc.borrow().node(node).kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Root | NodeKind::Element(_) => None,
        }
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.doc.borrow().node(node).parent
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.doc.borrow().node(node).children.clone()
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        let mut doc = self.doc.borrow_mut();
        doc.detach(child);
        doc.node_mut(parent).children.push(child);
        doc.node_mut(child).parent = Some(parent);
    }

    fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) {
        let mut doc = self.doc.borrow_mut();
        doc.detach(new);
        let Some(position) = doc.node(parent).children.iter().position(|c| *c == old) else {
            tracing::warn!(%parent, %old, "replace_child: node is not a child of parent");
            return;
        };
        doc.node_mut(parent).children[position] = new;
        doc.node_mut(new).parent = Some(parent);
        doc.node_mut(old).parent = None;
    }

    fn remove(&self, node: NodeId) {
        self.doc.borrow_mut().detach(node);
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.doc
            .borrow()
            .node(node)
            .attributes
            .keys()
            .cloned()
            .collect()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc.borrow().node(node).attributes.get(name).cloned()
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        self.doc
            .borrow_mut()
            .node_mut(node)
            .attributes
            .insert(name.into(), value.into());
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        self.doc
            .borrow_mut()
            .node_mut(node)
            .attributes
            .shift_remove(name);
    }

    fn set_property(&self, node: NodeId, property: Property, value: &PropValue) {
        let mut doc = self.doc.borrow_mut();
        let data = doc.node_mut(node);
        if property == Property::Id {
            // reflected, as in the DOM
            let id = value.attribute_value().unwrap_or_default();
            data.attributes.insert("id".into(), id);
        }
        data.properties.insert(property, value.clone());
    }

    fn add_listener(&self, node: NodeId, event: &str, listener: &Callback) {
        let mut doc = self.doc.borrow_mut();
        let listeners = &mut doc.node_mut(node).listeners;
        if !listeners.iter().any(|(name, cb)| name == event && cb == listener) {
            listeners.push((event.into(), listener.clone()));
        }
    }

    fn remove_listener(&self, node: NodeId, event: &str, listener: &Callback) {
        self.doc
            .borrow_mut()
            .node_mut(node)
            .listeners
            .retain(|(name, cb)| !(name == event && cb == listener));
    }

    fn focused(&self) -> Option<NodeId> {
        self.doc.borrow().focused
    }

    fn focus(&self, node: NodeId) {
        let mut doc = self.doc.borrow_mut();
        if !doc.node_mut(node).released {
            doc.focused = Some(node);
        }
    }

    fn release(&self, node: NodeId) {
        let mut doc = self.doc.borrow_mut();
        let data = doc.node_mut(node);
        data.released = true;
        data.listeners.clear();
        if doc.focused == Some(node) {
            doc.focused = None;
        }
    }
}
