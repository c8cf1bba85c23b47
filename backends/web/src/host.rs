//! [`Host`] implementation over the browser DOM.
//!
//! DOM nodes are JavaScript objects, so they cannot be used as map keys on the
//! Rust side. [`WebHost`] keeps its own table of the nodes it created, and a
//! `WeakMap` from node to handle for the reverse lookup needed by
//! `parent`, `children` and `focused`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use js_sys::{Function, Object, Reflect, WeakMap};
use ripple_core::{Callback, Event, Host, NodeId, PropValue, Property};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, Node};

struct Listener {
    event: String,
    callback: Callback,
    /// Owned by the JS heap, so a listener may be removed while it runs.
    function: Function,
}

struct DomTable {
    document: Document,
    nodes: RefCell<Vec<Option<Node>>>,
    ids: WeakMap,
    listeners: RefCell<HashMap<NodeId, Vec<Listener>>>,
}

/// A [`Host`] that renders into a live DOM document.
///
/// Clones share the same node table.
#[derive(Clone)]
pub struct WebHost {
    table: Rc<DomTable>,
}

impl core::fmt::Debug for WebHost {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WebHost")
            .field("nodes", &self.table.nodes.borrow().len())
            .field("listening", &self.table.listeners.borrow().len())
            .finish_non_exhaustive()
    }
}

fn object(node: &Node) -> &Object {
    node.as_ref()
}

fn js_value(value: &PropValue) -> JsValue {
    match value {
        PropValue::Str(s) => JsValue::from_str(s),
        PropValue::Number(n) => JsValue::from_f64(*n),
        PropValue::Bool(b) => JsValue::from_bool(*b),
        _ => JsValue::NULL,
    }
}

fn log_js(operation: &str, result: Result<impl Sized, JsValue>) {
    if let Err(err) = result {
        tracing::error!(operation, error = ?err, "DOM operation failed");
    }
}

impl WebHost {
    /// Creates a host producing nodes in `document`.
    #[must_use]
    pub fn new(document: Document) -> Self {
        Self {
            table: Rc::new(DomTable {
                document,
                nodes: RefCell::new(Vec::new()),
                ids: WeakMap::new(),
                listeners: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Registers an existing node, such as the mounting element, and returns
    /// its handle. Registering the same node twice returns the same handle.
    pub fn adopt(&self, node: &Node) -> NodeId {
        if let Some(id) = self.lookup(node) {
            return id;
        }
        let mut nodes = self.table.nodes.borrow_mut();
        let id = NodeId::from_raw(nodes.len() as u64);
        nodes.push(Some(node.clone()));
        #[allow(clippy::cast_precision_loss)]
        self.table
            .ids
            .set(object(node), &JsValue::from_f64(id.into_raw() as f64));
        id
    }

    /// The DOM node behind a handle, unless it has been released.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<Node> {
        let index = usize::try_from(id.into_raw()).ok()?;
        self.table.nodes.borrow().get(index).cloned().flatten()
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn lookup(&self, node: &Node) -> Option<NodeId> {
        self.table
            .ids
            .get(object(node))
            .as_f64()
            .map(|raw| NodeId::from_raw(raw as u64))
    }

    fn element(&self, id: NodeId) -> Option<Element> {
        self.node(id)?.dyn_into::<Element>().ok()
    }
}

impl Host for WebHost {
    fn create_element(&self, tag: &str) -> NodeId {
        match self.table.document.create_element(tag) {
            Ok(element) => self.adopt(&element.into()),
            Err(err) => {
                tracing::error!(
                    tag,
                    error = ?err,
                    "create_element failed; using an empty text node"
                );
                self.create_text("")
            }
        }
    }

    fn create_text(&self, text: &str) -> NodeId {
        self.adopt(&self.table.document.create_text_node(text).into())
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.element(node).map(|element| element.local_name())
    }

    fn text_content(&self, node: NodeId) -> Option<String> {
        let node = self.node(node)?;
        (node.node_type() == Node::TEXT_NODE).then(|| node.text_content().unwrap_or_default())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.node(node)?.parent_node()?;
        self.lookup(&parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(node) else {
            return Vec::new();
        };
        let list = node.child_nodes();
        (0..list.length())
            .filter_map(|index| list.item(index))
            .filter_map(|child| self.lookup(&child))
            .collect()
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        if let (Some(parent), Some(child)) = (self.node(parent), self.node(child)) {
            log_js("append_child", parent.append_child(&child));
        }
    }

    fn replace_child(&self, parent: NodeId, new: NodeId, old: NodeId) {
        if let (Some(parent), Some(new), Some(old)) =
            (self.node(parent), self.node(new), self.node(old))
        {
            log_js("replace_child", parent.replace_child(&new, &old));
        }
    }

    fn remove(&self, node: NodeId) {
        let Some(node) = self.node(node) else {
            return;
        };
        if let Some(parent) = node.parent_node() {
            log_js("remove_child", parent.remove_child(&node));
        }
    }

    fn attribute_names(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(|element| {
                element
                    .get_attribute_names()
                    .iter()
                    .filter_map(|name| name.as_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.element(node)?.get_attribute(name)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(element) = self.element(node) {
            log_js("set_attribute", element.set_attribute(name, value));
        }
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        if let Some(element) = self.element(node) {
            log_js("remove_attribute", element.remove_attribute(name));
        }
    }

    fn set_property(&self, node: NodeId, property: Property, value: &PropValue) {
        if let Some(node) = self.node(node) {
            let key = JsValue::from_str(property.name());
            log_js("set_property", Reflect::set(&node, &key, &js_value(value)));
        }
    }

    fn add_listener(&self, node: NodeId, event: &str, listener: &Callback) {
        let Some(target) = self.node(node) else {
            return;
        };
        let mut listeners = self.table.listeners.borrow_mut();
        let bound = listeners.entry(node).or_default();
        if bound.iter().any(|l| l.event == event && l.callback == *listener) {
            return;
        }

        let callback = listener.clone();
        let name = event.to_owned();
        let function: Function =
            Closure::<dyn FnMut(web_sys::Event)>::new(move |_: web_sys::Event| {
                callback.call(&Event::new(name.clone(), node));
            })
            .into_js_value()
            .unchecked_into();
        log_js(
            "add_event_listener",
            target.add_event_listener_with_callback(event, &function),
        );
        bound.push(Listener {
            event: event.to_owned(),
            callback: listener.clone(),
            function,
        });
    }

    fn remove_listener(&self, node: NodeId, event: &str, listener: &Callback) {
        let Some(target) = self.node(node) else {
            return;
        };
        let mut listeners = self.table.listeners.borrow_mut();
        let Some(bound) = listeners.get_mut(&node) else {
            return;
        };
        bound.retain(|l| {
            let matches = l.event == event && l.callback == *listener;
            if matches {
                log_js(
                    "remove_event_listener",
                    target.remove_event_listener_with_callback(&l.event, &l.function),
                );
            }
            !matches
        });
    }

    fn focused(&self) -> Option<NodeId> {
        let active = self.table.document.active_element()?;
        self.lookup(&active.into())
    }

    fn focus(&self, node: NodeId) {
        if let Some(element) = self.node(node).and_then(|n| n.dyn_into::<HtmlElement>().ok()) {
            log_js("focus", element.focus());
        }
    }

    fn release(&self, node: NodeId) {
        let Some(target) = self.node(node) else {
            return;
        };
        let removed = self.table.listeners.borrow_mut().remove(&node);
        for listener in removed.into_iter().flatten() {
            log_js(
                "remove_event_listener",
                target.remove_event_listener_with_callback(&listener.event, &listener.function),
            );
        }
        self.table.ids.delete(object(&target));
        let Ok(index) = usize::try_from(node.into_raw()) else {
            return;
        };
        if let Some(slot) = self.table.nodes.borrow_mut().get_mut(index) {
            *slot = None;
        }
    }
}
