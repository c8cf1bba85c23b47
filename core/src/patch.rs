//! Brings an existing live subtree in sync with a new virtual tree.
//!
//! For each node the patcher either keeps the live node and reconciles it in
//! place, or renders a replacement. Children are matched through a pool keyed
//! by explicit `key` props, falling back to the child's position. Unkeyed
//! lists are therefore matched by index: inserting at the front of an unkeyed
//! list patches every following child rather than moving it.

use alloc::vec::Vec;
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::host::{Host, NodeId};
use crate::reconciler::Engine;
use crate::render::is_valid_tag;
use crate::vnode::{Child, KEY_PROP, Key, VNode, flatten};

/// Slot of an old child in the reconciliation pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum PoolKey {
    Explicit(Key),
    Index(usize),
}

impl PoolKey {
    fn new(explicit: Option<Key>, index: usize) -> Self {
        explicit.map_or(Self::Index(index), Self::Explicit)
    }
}

impl<H: Host + 'static> Engine<H> {
    /// Patches `node` against `child`, returning the node that now represents
    /// it. `depth` is the component nesting level, see
    /// [`Engine::patch_component`].
    pub(crate) fn patch_at(
        &mut self,
        node: NodeId,
        child: &Child,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        match child {
            Child::List(_) => Err(Error::InvalidTree(child.clone())),
            Child::Node(vnode) if vnode.kind().is_component() => {
                self.patch_component(node, vnode, parent, depth)
            }
            Child::Node(vnode) => {
                let tag = vnode.tag().unwrap_or_default();
                if !is_valid_tag(tag) {
                    return Err(Error::InvalidTree(child.clone()));
                }
                let same_tag = self
                    .host
                    .tag_name(node)
                    .is_some_and(|current| current.eq_ignore_ascii_case(tag));
                if same_tag {
                    self.reconcile(node, vnode, depth)
                } else {
                    tracing::debug!(%node, tag, "element type changed; replacing");
                    let fresh = self.render(child, None)?;
                    Ok(self.replace(node, fresh, parent, depth))
                }
            }
            leaf => {
                let text = leaf.leaf_text().unwrap_or_default();
                match self.host.text_content(node) {
                    Some(current) if current == text => Ok(node),
                    current => {
                        if current.is_none() {
                            tracing::debug!(%node, "element became text; replacing");
                        }
                        let fresh = self.render(leaf, None)?;
                        Ok(self.replace(node, fresh, parent, depth))
                    }
                }
            }
        }
    }

    /// In-place update of an element whose tag matches.
    ///
    /// Below a component (`depth > 0`) the node's key belongs to the
    /// outermost component, so the output's own `key` prop is not applied.
    fn reconcile(&mut self, node: NodeId, vnode: &VNode, depth: usize) -> Result<NodeId> {
        let focused = if self.options.preserve_focus {
            self.host.focused()
        } else {
            None
        };

        let previous = self.host.children(node);
        let mut pool: HashMap<PoolKey, NodeId> = HashMap::with_capacity(previous.len());
        for (index, child) in previous.iter().enumerate() {
            let key = PoolKey::new(self.registry.key(*child).cloned(), index);
            pool.insert(key, *child);
        }

        let mut claimed = HashSet::with_capacity(previous.len());
        for (index, child) in flatten(vnode.child_list()).into_iter().enumerate() {
            let explicit = child.key();
            let slot = PoolKey::new(explicit.clone(), index);
            let live = match pool.remove(&slot) {
                Some(old) => {
                    tracing::trace!(parent = %node, child = %old, ?slot, "reusing child");
                    claimed.insert(old);
                    self.patch_at(old, child, Some(node), 0)?
                }
                None => self.render(child, None)?,
            };
            self.host.append_child(node, live);
            self.registry.set_key(live, explicit);
        }

        for stale in previous.into_iter().filter(|c| !claimed.contains(c)) {
            self.remove(stale);
        }

        for name in self.host.attribute_names(node) {
            self.host.remove_attribute(node, &name);
        }
        for (name, value) in vnode.prop_map().iter() {
            if depth > 0 && name == KEY_PROP {
                continue;
            }
            self.apply_property(node, name, value);
        }

        // skip nodes removed during this pass
        if let Some(focused) =
            focused.filter(|&focused| focused == node || self.host.parent(focused).is_some())
        {
            self.host.focus(focused);
        }
        Ok(node)
    }

    /// Unmounts and detaches a child that has no counterpart any more.
    fn remove(&mut self, node: NodeId) {
        tracing::trace!(%node, "removing unclaimed child");
        self.notify_unmount(node);
        self.host.remove(node);
        self.discard(node, 0);
    }

    /// Substitutes `fresh` for `old` under `parent` and discards `old`.
    ///
    /// Bindings of `old` below `depth` belong to components that are still
    /// patching and will move themselves onto `fresh`.
    pub(crate) fn replace(
        &mut self,
        old: NodeId,
        fresh: NodeId,
        parent: Option<NodeId>,
        depth: usize,
    ) -> NodeId {
        if let Some(parent) = parent {
            self.host.replace_child(parent, fresh, old);
        }
        if depth > 0 || self.registry.key(fresh).is_none() {
            let key = self.registry.key(old).cloned();
            self.registry.set_key(fresh, key);
        }
        self.discard(old, depth);
        fresh
    }

    /// Forgets a detached subtree for good: drops its metadata and the
    /// instances bound in it (except the first `keep` bindings of the root),
    /// then releases every node to the host. No hooks run.
    pub(crate) fn discard(&mut self, node: NodeId, keep: usize) {
        let nodes: Vec<NodeId> = self.subtree(node);
        for (position, current) in nodes.into_iter().enumerate() {
            if let Some(meta) = self.registry.forget(current) {
                let skip = if position == 0 { keep } else { 0 };
                for id in meta.instances.into_iter().skip(skip) {
                    self.instances.remove(&id);
                }
            }
            self.host.release(current);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::host::memory::MemoryHost;
    use crate::host::Host;
    use crate::vnode::{Child, VNode};
    use crate::{Error, Reconciler};

    fn setup() -> (MemoryHost, Reconciler<MemoryHost>) {
        let host = MemoryHost::new();
        (host.clone(), Reconciler::new(host))
    }

    #[test]
    fn attributes_are_fully_replaced() {
        let (host, reconciler) = setup();
        let root = host.root();
        let first = Child::from(VNode::element("a").attr("href", "/x").attr("title", "t"));
        let a = reconciler.render(&first, Some(root)).unwrap();
        let second = Child::from(VNode::element("a").attr("href", "/y"));
        assert_eq!(reconciler.patch(a, &second).unwrap(), a);
        assert_eq!(host.outer_html(a), "<a href=\"/y\"></a>");
    }

    #[test]
    fn tags_compare_case_insensitively() {
        let (host, reconciler) = setup();
        let div = reconciler
            .render(&Child::from(VNode::element("DIV")), Some(host.root()))
            .unwrap();
        let patched = reconciler
            .patch(div, &Child::from(VNode::element("div").attr("title", "x")))
            .unwrap();
        assert_eq!(patched, div);
    }

    #[test]
    fn element_replaced_by_text() {
        let (host, reconciler) = setup();
        let root = host.root();
        let span = reconciler
            .render(&Child::from(VNode::element("span")), Some(root))
            .unwrap();
        let text = reconciler.patch(span, &Child::from("plain")).unwrap();
        assert_ne!(text, span);
        assert_eq!(host.children(root), vec![text]);
        assert!(host.is_released(span));
    }

    #[test]
    fn text_replaced_by_element() {
        let (host, reconciler) = setup();
        let root = host.root();
        let text = reconciler.render(&Child::from("plain"), Some(root)).unwrap();
        let em = reconciler
            .patch(text, &Child::from(VNode::element("em").child("x")))
            .unwrap();
        assert_eq!(host.inner_html(root), "<em>x</em>");
        assert_ne!(em, text);
    }

    #[test]
    fn unkeyed_children_grow_and_shrink_by_position() {
        let (host, reconciler) = setup();
        let root = host.root();
        let list = |n: usize| {
            Child::from(VNode::element("ul").children(
                (0..n).map(|i| VNode::element("li").child(i)),
            ))
        };
        let ul = reconciler.render(&list(2), Some(root)).unwrap();
        let before = host.children(ul);
        reconciler.patch(ul, &list(3)).unwrap();
        let after = host.children(ul);
        assert_eq!(&after[..2], &before[..]);
        assert_eq!(host.outer_html(ul), "<ul><li>0</li><li>1</li><li>2</li></ul>");
        reconciler.patch(ul, &list(1)).unwrap();
        assert_eq!(host.children(ul), vec![before[0]]);
    }

    #[test]
    fn keys_and_positions_do_not_collide() {
        let (host, reconciler) = setup();
        let root = host.root();
        let first = Child::from(VNode::element("ul").child(VNode::element("li").child("pos")));
        let ul = reconciler.render(&first, Some(root)).unwrap();
        let old = host.children(ul)[0];
        let second = Child::from(
            VNode::element("ul").child(VNode::element("li").key("0").child("keyed")),
        );
        reconciler.patch(ul, &second).unwrap();
        let new = host.children(ul)[0];
        assert_ne!(new, old);
        assert!(host.is_released(old));
    }

    #[test]
    fn duplicate_keys_keep_the_last_match() {
        let (host, reconciler) = setup();
        let root = host.root();
        let first = Child::from(VNode::element("ul").children([
            VNode::element("li").key("d").child("1"),
            VNode::element("li").key("d").child("2"),
        ]));
        let ul = reconciler.render(&first, Some(root)).unwrap();
        let old = host.children(ul);
        let second =
            Child::from(VNode::element("ul").child(VNode::element("li").key("d").child("3")));
        reconciler.patch(ul, &second).unwrap();
        assert_eq!(host.children(ul), vec![old[1]]);
        assert_eq!(host.outer_html(ul), "<ul><li>3</li></ul>");
    }

    #[test]
    fn invalid_child_aborts_the_patch() {
        let (host, reconciler) = setup();
        let ul = reconciler
            .render(&Child::from(VNode::element("ul")), Some(host.root()))
            .unwrap();
        let bad = Child::from(VNode::element("ul").child(Child::List(vec![Child::List(vec![])])));
        assert!(matches!(reconciler.patch(ul, &bad), Err(Error::InvalidTree(_))));
    }

    #[test]
    fn focus_is_restored_after_patch() {
        let (host, reconciler) = setup();
        let root = host.root();
        let tree = Child::from(VNode::element("form").child(VNode::element("input")));
        let form = reconciler.render(&tree, Some(root)).unwrap();
        let input = host.children(form)[0];
        host.focus(input);
        reconciler.patch(form, &tree).unwrap();
        assert_eq!(host.focused(), Some(input));
    }

    #[test]
    fn focus_is_dropped_with_a_removed_node() {
        let (host, reconciler) = setup();
        let root = host.root();
        let with_input = Child::from(VNode::element("form").child(VNode::element("input")));
        let form = reconciler.render(&with_input, Some(root)).unwrap();
        let input = host.children(form)[0];
        host.focus(input);
        reconciler.patch(form, &Child::from(VNode::element("form"))).unwrap();
        assert!(host.is_released(input));
        assert_eq!(host.focused(), None);
    }

    #[test]
    fn detached_root_is_replaced_without_parent() {
        let (host, reconciler) = setup();
        let span = reconciler.render(&Child::from(VNode::element("span")), None).unwrap();
        let div = reconciler.patch(span, &Child::from(VNode::element("div"))).unwrap();
        assert_ne!(div, span);
        assert_eq!(host.parent(div), None);
        assert_eq!(host.tag_name(div).as_deref(), Some("div"));
    }
}
