//! Applies a single prop to a live element.

use crate::host::{Host, NodeId, Property};
use crate::reconciler::Engine;
use crate::vnode::{KEY_PROP, PropValue};

/// Default prefix marking a prop as an event handler: `onClick` binds `click`.
pub const EVENT_PREFIX: &str = "on";

/// Prop alias written as the host's `class` attribute.
pub const CLASS_NAME_PROP: &str = "className";

impl<H: Host + 'static> Engine<H> {
    /// Applies one prop to `node`.
    ///
    /// - a callback whose name starts with the event prefix (`on` unless
    ///   configured otherwise) replaces the listener for that event, so each
    ///   node carries at most one handler per event;
    /// - `value`, `checked` and `id` are written as live properties;
    /// - `key` becomes the node's reconciliation key and is not rendered;
    /// - any other primitive becomes an attribute, with `className` written
    ///   as `class`.
    ///
    /// Everything else (objects, stray callbacks, nulls) is ignored.
    pub(crate) fn apply_property(&mut self, node: NodeId, name: &str, value: &PropValue) {
        let event = name.strip_prefix(self.options.event_prefix.as_str());
        if let (PropValue::Callback(handler), Some(event)) = (value, event) {
            let event = event.to_lowercase();
            if let Some(previous) = self.registry.swap_handler(node, &event, handler.clone()) {
                self.host.remove_listener(node, &event, &previous);
            }
            self.host.add_listener(node, &event, handler);
            tracing::trace!(%node, %event, "listener bound");
        } else if let Some(property) = Property::from_prop(name) {
            match value {
                PropValue::Str(_) | PropValue::Number(_) | PropValue::Bool(_) | PropValue::Null => {
                    self.host.set_property(node, property, value);
                }
                _ => tracing::trace!(%node, prop = name, "non-primitive property ignored"),
            }
        } else if name == KEY_PROP {
            self.registry.set_key(node, value.as_key());
        } else if let Some(attribute) = value.attribute_value() {
            let name = if name == CLASS_NAME_PROP { "class" } else { name };
            self.host.set_attribute(node, name, &attribute);
        } else {
            tracing::trace!(%node, prop = name, "prop has no attribute form; ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use crate::host::memory::MemoryHost;
    use crate::host::{Host, Property};
    use crate::vnode::{Callback, Child, PropValue, VNode};
    use crate::{Key, Reconciler};

    fn element(reconciler: &Reconciler<MemoryHost>, node: VNode) -> crate::NodeId {
        reconciler
            .render(&Child::Node(node), None)
            .expect("valid tree")
    }

    #[test]
    fn class_name_is_written_as_class() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let div = element(&reconciler, VNode::element("div").attr("className", "box"));
        assert_eq!(host.attribute(div, "class").as_deref(), Some("box"));
        assert_eq!(host.attribute(div, "className"), None);
    }

    #[test]
    fn reserved_names_become_properties() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let input = element(
            &reconciler,
            VNode::element("input")
                .attr("value", "typed")
                .attr("checked", true)
                .attr("id", "field"),
        );
        assert_eq!(
            host.property(input, Property::Checked),
            Some(PropValue::Bool(true))
        );
        assert_eq!(
            host.property(input, Property::Value),
            Some(PropValue::from("typed"))
        );
        assert_eq!(host.attribute(input, "value"), None);
        assert_eq!(host.attribute(input, "id").as_deref(), Some("field"));
    }

    #[test]
    fn key_is_recorded_not_rendered() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let li = element(&reconciler, VNode::element("li").key("k1"));
        assert!(host.attribute_names(li).is_empty());
        assert_eq!(reconciler.key_of(li), Some(Key::from("k1")));
    }

    #[test]
    fn objects_and_stray_callbacks_are_ignored() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let div = element(
            &reconciler,
            VNode::element("div")
                .attr("data", serde_json::json!({ "a": 1 }))
                .attr("render", Callback::new(|_| {}))
                .attr("hidden", PropValue::Null)
                .attr("tabindex", 3),
        );
        assert_eq!(host.attribute_names(div), vec!["tabindex".to_owned()]);
        assert_eq!(host.attribute(div, "tabindex").as_deref(), Some("3"));
    }

    #[test]
    fn event_prefix_is_configurable() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::builder(host.clone()).event_prefix("when").build();
        let button = element(
            &reconciler,
            VNode::element("button")
                .attr("whenPress", Callback::new(|_| {}))
                .attr("onClick", Callback::new(|_| {})),
        );
        assert_eq!(host.listener_count(button, "press"), 1);
        assert_eq!(host.listener_count(button, "click"), 0);
    }

    #[test]
    fn on_uses_the_default_prefix_only() {
        let host = MemoryHost::new();
        let default = Reconciler::new(host.clone());
        let custom = Reconciler::builder(host.clone()).event_prefix("when").build();
        let tree = || VNode::element("button").on("click", |_| {});
        let bound = element(&default, tree());
        let ignored = element(&custom, tree());
        assert_eq!(host.listener_count(bound, "click"), 1);
        assert_eq!(host.listener_count(ignored, "click"), 0);
    }

    #[test]
    fn event_names_are_lower_cased() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let button = element(
            &reconciler,
            VNode::element("button").attr(
                "onDoubleClick",
                Callback::new(move |_| counter.set(counter.get() + 1)),
            ),
        );
        assert_eq!(host.dispatch(button, "doubleclick"), 1);
        assert_eq!(hits.get(), 1);
        assert!(host.attribute_names(button).is_empty());
    }
}
