//! Builds live subtrees from virtual trees.

use crate::error::{Error, Result};
use crate::host::{Host, NodeId};
use crate::reconciler::Engine;
use crate::vnode::{Child, NodeType, VNode, flatten};

/// Whether `tag` can name a host element.
pub(crate) fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && !tag.chars().any(|c| c.is_whitespace() || c == '<' || c == '>')
}

impl<H: Host + 'static> Engine<H> {
    /// Creates the live subtree for `child`.
    ///
    /// With a `parent`, the new node is appended as its last child. The node
    /// is returned either way.
    pub(crate) fn render(&mut self, child: &Child, parent: Option<NodeId>) -> Result<NodeId> {
        let node = match child {
            Child::Node(vnode) => match vnode.kind() {
                NodeType::Element(tag) => self.render_element(vnode, tag)?,
                NodeType::Stateless(_) | NodeType::Stateful(_) => {
                    return self.render_component(vnode, parent);
                }
            },
            Child::List(_) => return Err(Error::InvalidTree(child.clone())),
            leaf => {
                let text = leaf.leaf_text().unwrap_or_default();
                self.host.create_text(&text)
            }
        };
        if let Some(parent) = parent {
            self.host.append_child(parent, node);
        }
        Ok(node)
    }

    fn render_element(&mut self, vnode: &VNode, tag: &str) -> Result<NodeId> {
        if !is_valid_tag(tag) {
            return Err(Error::InvalidTree(Child::Node(vnode.clone())));
        }
        let element = self.host.create_element(tag);
        // children first, so no handler is live while the subtree is built
        for child in flatten(vnode.child_list()) {
            if let Err(err) = self.render(child, Some(element)) {
                self.discard(element, 0);
                return Err(err);
            }
        }
        for (name, value) in vnode.prop_map().iter() {
            self.apply_property(element, name, value);
        }
        Ok(element)
    }
}

#[cfg(test)]
mod tests {
    use crate::host::memory::MemoryHost;
    use crate::host::Host;
    use crate::vnode::{Child, VNode};
    use crate::{Error, Reconciler};

    #[test]
    fn leaves_render_as_text() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let text = reconciler.render(&Child::from("hi"), None).unwrap();
        let number = reconciler.render(&Child::from(42), None).unwrap();
        let flag = reconciler.render(&Child::from(false), None).unwrap();
        let null = reconciler.render(&Child::Null, None).unwrap();
        assert_eq!(host.text_content(text).as_deref(), Some("hi"));
        assert_eq!(host.text_content(number).as_deref(), Some("42"));
        assert_eq!(host.text_content(flag).as_deref(), Some(""));
        assert_eq!(host.text_content(null).as_deref(), Some(""));
    }

    #[test]
    fn parent_receives_the_new_node_last() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let root = host.root();
        let first = reconciler.render(&Child::from("a"), Some(root)).unwrap();
        let second = reconciler
            .render(&Child::Node(VNode::element("b")), Some(root))
            .unwrap();
        assert_eq!(host.children(root), vec![first, second]);
        assert_eq!(host.inner_html(root), "a<b></b>");
    }

    #[test]
    fn nested_lists_are_flattened_once() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let tree = VNode::element("ul")
            .child(VNode::element("li").child("0"))
            .child(vec![
                VNode::element("li").child("1"),
                VNode::element("li").child("2"),
            ]);
        let ul = reconciler.render(&Child::Node(tree), None).unwrap();
        assert_eq!(
            host.outer_html(ul),
            "<ul><li>0</li><li>1</li><li>2</li></ul>"
        );
    }

    #[test]
    fn unrecognized_shapes_are_rejected() {
        let reconciler = Reconciler::new(MemoryHost::new());
        let deep = Child::List(vec![Child::from("x")]);
        let tree = VNode::element("div").child(Child::List(vec![deep.clone()]));
        assert_eq!(
            reconciler.render(&Child::Node(tree), None),
            Err(Error::InvalidTree(deep.clone()))
        );
        assert_eq!(
            reconciler.render(&deep, None),
            Err(Error::InvalidTree(deep))
        );
        assert!(matches!(
            reconciler.render(&Child::Node(VNode::element("")), None),
            Err(Error::InvalidTree(_))
        ));
    }

    #[test]
    fn failed_render_leaves_parent_untouched() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let root = host.root();
        let tree = VNode::element("div")
            .child("ok")
            .child(Child::List(vec![Child::List(vec![])]));
        assert!(reconciler.render(&Child::Node(tree), Some(root)).is_err());
        assert!(host.children(root).is_empty());
    }

    #[test]
    fn function_components_render_their_output() {
        let host = MemoryHost::new();
        let reconciler = Reconciler::new(host.clone());
        let greeting = VNode::function(|props| {
            VNode::element("p")
                .child(format!("hello {}", props.str("name").unwrap_or("?")))
                .children(props.children().to_vec())
                .into()
        })
        .attr("name", "ada")
        .child("!");
        let p = reconciler.render(&Child::Node(greeting), None).unwrap();
        assert_eq!(host.outer_html(p), "<p>hello ada!</p>");
        assert_eq!(reconciler.instance_count(), 0);
    }
}
