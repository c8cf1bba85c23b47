//! Virtual tree description.
//!
//! A [`VNode`] is an immutable description of one node of the presentation
//! tree. Trees are built fresh on every render pass and handed to the
//! [`Reconciler`](crate::Reconciler), which turns them into live nodes or
//! patches an existing live tree towards them.
//!
//! The type of a node is decided once, when it is constructed, and never
//! re-inspected by shape: see [`NodeType`].

use alloc::{collections::BTreeMap, rc::Rc, string::String, vec::Vec};
use core::{any::type_name, fmt};

use crate::component::{Component, ComponentType};
use crate::host::NodeId;

/// Name of the reserved reconciliation key prop.
pub const KEY_PROP: &str = "key";

/// Name of the reserved children prop handed to components.
pub const CHILDREN_PROP: &str = "children";

/// An event delivered to a [`Callback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    name: String,
    target: NodeId,
}

impl Event {
    /// Creates an event of the given name targeting `target`.
    #[must_use]
    pub fn new(name: impl Into<String>, target: NodeId) -> Self {
        Self {
            name: name.into(),
            target,
        }
    }

    /// The lower-cased event name, e.g. `click`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The live node the listener was registered on.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }
}

/// A shared event handler.
///
/// Two callbacks are equal only when they are clones of the same handler.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
    /// Wraps a closure into a callback.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the handler.
    pub fn call(&self, event: &Event) {
        (self.0)(event);
    }
}

impl PartialEq for Callback {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Callback {}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callback({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

impl<F: Fn(&Event) + 'static> From<F> for Callback {
    fn from(value: F) -> Self {
        Self::new(value)
    }
}

/// Value of a single prop.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// A string value.
    Str(String),
    /// A numeric value.
    Number(f64),
    /// A boolean value.
    Bool(bool),
    /// An explicit null.
    Null,
    /// An event handler.
    Callback(Callback),
    /// Structured data. Never rendered as an attribute.
    Object(serde_json::Value),
    /// The reserved `children` override.
    Children(Vec<Child>),
}

impl PropValue {
    /// Returns the string form used when this value is written as an attribute.
    ///
    /// Objects, callbacks, children and null have no attribute form.
    #[must_use]
    pub fn attribute_value(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(b) => Some(if *b { "true" } else { "false" }.into()),
            Self::Null | Self::Callback(_) | Self::Object(_) | Self::Children(_) => None,
        }
    }

    /// Whether this value is callable.
    #[must_use]
    pub const fn is_callable(&self) -> bool {
        matches!(self, Self::Callback(_))
    }

    /// Interprets this value as a reconciliation key.
    #[must_use]
    pub fn as_key(&self) -> Option<Key> {
        match self {
            Self::Str(s) => Some(Key(s.clone())),
            Self::Number(n) => Some(Key(format_number(*n))),
            _ => None,
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        Self::Str(value.into())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Callback> for PropValue {
    fn from(value: Callback) -> Self {
        Self::Callback(value)
    }
}

impl From<serde_json::Value> for PropValue {
    fn from(value: serde_json::Value) -> Self {
        Self::Object(value)
    }
}

macro_rules! impl_number_prop {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropValue {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_number_prop!(f64, f32, i32, i64, u32, u64, usize);

/// Formats a number the way it appears in text nodes and attributes.
///
/// Integral values print without a fractional part, `-0` prints as `0`, and
/// the non-finite values print as `NaN`, `Infinity` and `-Infinity`.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.into()
    } else if n == 0.0 {
        "0".into()
    } else {
        alloc::format!("{n}")
    }
}

/// Identity token matching old and new children across patches.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(String);

impl Key {
    /// Creates a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Self(value.into())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<usize> for Key {
    fn from(value: usize) -> Self {
        Self(alloc::format!("{value}"))
    }
}

/// Props of a virtual node: unique names mapped to values.
///
/// Cloning is cheap; mutation copies on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(Rc<BTreeMap<String, PropValue>>);

impl Props {
    /// Creates an empty prop set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a prop.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropValue>) {
        Rc::make_mut(&mut self.0).insert(name.into(), value.into());
    }

    /// Returns a copy of these props with one prop inserted or replaced.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a prop.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.0.get(name)
    }

    /// Iterates over every prop in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of props.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no props.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a string prop.
    #[must_use]
    pub fn str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns a numeric prop.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns a boolean prop.
    #[must_use]
    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns a callback prop.
    #[must_use]
    pub fn callback(&self, name: &str) -> Option<&Callback> {
        match self.get(name)? {
            PropValue::Callback(cb) => Some(cb),
            _ => None,
        }
    }

    /// The explicit reconciliation key, if any.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        self.get(KEY_PROP).and_then(PropValue::as_key)
    }

    /// The reserved children prop, or an empty slice.
    #[must_use]
    pub fn children(&self) -> &[Child] {
        match self.get(CHILDREN_PROP) {
            Some(PropValue::Children(children)) => children,
            _ => &[],
        }
    }
}

impl<K: Into<String>, V: Into<PropValue>> FromIterator<(K, V)> for Props {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(Rc::new(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        ))
    }
}

/// One entry of a virtual node's children.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// Rendered as a text node.
    Text(String),
    /// Rendered as a text node holding the number's string form.
    Number(f64),
    /// Rendered as an empty placeholder text node.
    Bool(bool),
    /// Rendered as an empty placeholder text node.
    Null,
    /// A structured node.
    Node(VNode),
    /// A nested run of children, flattened one level before use.
    List(Vec<Child>),
}

impl Child {
    /// Whether this is a primitive, boolean or null value.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Text(_) | Self::Number(_) | Self::Bool(_) | Self::Null
        )
    }

    /// Text content a leaf renders to. `None` for nodes and lists.
    #[must_use]
    pub fn leaf_text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Number(n) => Some(format_number(*n)),
            Self::Bool(_) | Self::Null => Some(String::new()),
            Self::Node(_) | Self::List(_) => None,
        }
    }

    /// The structured node, if this is one.
    #[must_use]
    pub const fn as_node(&self) -> Option<&VNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// The explicit `key` prop of a structured node.
    #[must_use]
    pub fn key(&self) -> Option<Key> {
        self.as_node().and_then(|node| node.props.key())
    }
}

/// Flattens a child list by one level.
///
/// Lists nested deeper than one level are kept as [`Child::List`] entries and
/// rejected when rendered.
#[must_use]
pub fn flatten(children: &[Child]) -> Vec<&Child> {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Child::List(items) => flat.extend(items),
            other => flat.push(other),
        }
    }
    flat
}

impl From<&str> for Child {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Child {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Child {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<bool> for Child {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<()> for Child {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl From<VNode> for Child {
    fn from(value: VNode) -> Self {
        Self::Node(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Child {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Child {
    fn from(value: Vec<T>) -> Self {
        Self::List(value.into_iter().map(Into::into).collect())
    }
}

macro_rules! impl_number_child {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Child {
                #[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
                fn from(value: $ty) -> Self {
                    Self::Number(value as f64)
                }
            }
        )*
    };
}

impl_number_child!(f64, f32, i32, i64, u32, u64, usize);

/// A plain render function: props in, virtual tree out. No state, no hooks.
#[derive(Clone)]
pub struct Stateless {
    name: &'static str,
    func: Rc<dyn Fn(&Props) -> Child>,
}

impl Stateless {
    /// Wraps a render function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Props) -> Child + 'static,
    {
        Self {
            name: type_name::<F>(),
            func: Rc::new(func),
        }
    }

    /// Runs the function.
    #[must_use]
    pub fn call(&self, props: &Props) -> Child {
        (self.func)(props)
    }

    /// Type name of the wrapped function.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for Stateless {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.func, &other.func)
    }
}

impl fmt::Debug for Stateless {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Stateless").field(&self.name).finish()
    }
}

/// What a virtual node describes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeType {
    /// A host element with the given tag name.
    Element(String),
    /// A plain render function.
    Stateless(Stateless),
    /// A stateful component.
    Stateful(ComponentType),
}

impl NodeType {
    /// Whether this node is resolved through the component dispatcher.
    #[must_use]
    pub const fn is_component(&self) -> bool {
        !matches!(self, Self::Element(_))
    }
}

/// Immutable description of one UI node.
#[derive(Debug, Clone, PartialEq)]
pub struct VNode {
    kind: NodeType,
    props: Props,
    children: Vec<Child>,
}

impl VNode {
    /// Creates a node of any type with no props or children.
    #[must_use]
    pub fn new(kind: NodeType) -> Self {
        Self {
            kind,
            props: Props::new(),
            children: Vec::new(),
        }
    }

    /// Creates a host element node.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::new(NodeType::Element(tag.into()))
    }

    /// Creates a node rendered by a plain function.
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&Props) -> Child + 'static,
    {
        Self::new(NodeType::Stateless(Stateless::new(func)))
    }

    /// Creates a node rendered by an existing plain function.
    #[must_use]
    pub fn stateless(func: &Stateless) -> Self {
        Self::new(NodeType::Stateless(func.clone()))
    }

    /// Creates a node rendered by the stateful component `C`.
    #[must_use]
    pub fn component<C: Component>() -> Self {
        Self::new(NodeType::Stateful(ComponentType::of::<C>()))
    }

    /// Sets a prop.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name, value);
        self
    }

    /// Replaces all props.
    #[must_use]
    pub fn props(mut self, props: Props) -> Self {
        self.props = props;
        self
    }

    /// Binds an event handler; `on("click", ..)` sets the `onclick` prop.
    ///
    /// The prop always carries the default `on` prefix. A reconciler built
    /// with another [`event_prefix`](crate::ReconcilerOptions::event_prefix)
    /// ignores it, so set the prefixed prop through [`VNode::attr`] there.
    #[must_use]
    pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
        self.attr(alloc::format!("on{event}"), Callback::new(handler))
    }

    /// Sets the explicit reconciliation key.
    #[must_use]
    pub fn key(self, key: impl Into<Key>) -> Self {
        let key: Key = key.into();
        self.attr(KEY_PROP, key.0)
    }

    /// Appends a child.
    #[must_use]
    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Appends several children.
    #[must_use]
    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Child>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    /// The node type.
    #[must_use]
    pub const fn kind(&self) -> &NodeType {
        &self.kind
    }

    /// The node's props.
    #[must_use]
    pub const fn prop_map(&self) -> &Props {
        &self.props
    }

    /// The node's children, unflattened.
    #[must_use]
    pub fn child_list(&self) -> &[Child] {
        &self.children
    }

    /// The tag name for element nodes.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeType::Element(tag) => Some(tag),
            _ => None,
        }
    }

    /// Props handed to a component: this node's props with `children` set to
    /// this node's children.
    #[must_use]
    pub fn component_props(&self) -> Props {
        self.props
            .clone()
            .with(CHILDREN_PROP, PropValue::Children(self.children.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn numbers_format_like_text_content() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(f64::INFINITY), "Infinity");
        assert_eq!(format_number(f64::NAN), "NaN");
    }

    #[test]
    fn flatten_spreads_one_level_only() {
        let children = vec![
            Child::from("a"),
            Child::from(vec![Child::from(1), Child::List(vec![Child::Null])]),
        ];
        let flat = flatten(&children);
        assert_eq!(flat.len(), 3);
        assert_eq!(flat[1], &Child::Number(1.0));
        assert!(matches!(flat[2], Child::List(_)));
    }

    #[test]
    fn key_prop_accepts_strings_and_numbers() {
        let node = VNode::element("li").key("x");
        assert_eq!(Child::from(node).key(), Some(Key::from("x")));
        let node = VNode::element("li").attr(KEY_PROP, 0);
        assert_eq!(node.prop_map().key(), Some(Key::from("0")));
        let node = VNode::element("li").attr(KEY_PROP, serde_json::json!({"a": 1}));
        assert_eq!(node.prop_map().key(), None);
    }

    #[test]
    fn component_props_carry_children() {
        let node = VNode::function(|_| Child::Null)
            .attr("title", "hi")
            .child("x");
        let props = node.component_props();
        assert_eq!(props.str("title"), Some("hi"));
        assert_eq!(props.children(), &[Child::from("x")]);
        assert!(node.prop_map().children().is_empty());
    }

    #[test]
    fn callbacks_compare_by_identity() {
        let a = Callback::new(|_| {});
        let b = Callback::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn attribute_values() {
        assert_eq!(PropValue::from(true).attribute_value().as_deref(), Some("true"));
        assert_eq!(PropValue::from(2).attribute_value().as_deref(), Some("2"));
        assert_eq!(PropValue::Null.attribute_value(), None);
        assert_eq!(
            PropValue::Object(serde_json::json!([1])).attribute_value(),
            None
        );
    }
}
