//! Out-of-band metadata for live nodes.
//!
//! The engine never stores anything on the host's nodes. What it has to
//! remember about a live node between passes lives here, keyed by [`NodeId`]:
//! the reconciliation key, the component instances whose output is rooted at
//! the node, and the event handlers the binder registered on it.

use alloc::vec::Vec;
use std::collections::HashMap;

use crate::component::InstanceId;
use crate::host::NodeId;
use crate::vnode::{Callback, Key};

/// Metadata of one live node.
#[derive(Debug, Default)]
pub(crate) struct NodeMeta {
    pub(crate) key: Option<Key>,
    /// Outermost component first.
    pub(crate) instances: Vec<InstanceId>,
    pub(crate) handlers: HashMap<alloc::string::String, Callback>,
}

impl NodeMeta {
    fn is_empty(&self) -> bool {
        self.key.is_none() && self.instances.is_empty() && self.handlers.is_empty()
    }
}

#[derive(Debug, Default)]
pub(crate) struct Registry {
    nodes: HashMap<NodeId, NodeMeta>,
}

impl Registry {
    fn entry(&mut self, node: NodeId) -> &mut NodeMeta {
        self.nodes.entry(node).or_default()
    }

    fn prune(&mut self, node: NodeId) {
        if self.nodes.get(&node).is_some_and(NodeMeta::is_empty) {
            self.nodes.remove(&node);
        }
    }

    pub(crate) fn key(&self, node: NodeId) -> Option<&Key> {
        self.nodes.get(&node)?.key.as_ref()
    }

    pub(crate) fn set_key(&mut self, node: NodeId, key: Option<Key>) {
        self.entry(node).key = key;
        self.prune(node);
    }

    pub(crate) fn instances(&self, node: NodeId) -> &[InstanceId] {
        self.nodes
            .get(&node)
            .map_or(&[], |meta| meta.instances.as_slice())
    }

    pub(crate) fn instance_at(&self, node: NodeId, depth: usize) -> Option<InstanceId> {
        self.instances(node).get(depth).copied()
    }

    pub(crate) fn depth_of(&self, node: NodeId, instance: InstanceId) -> Option<usize> {
        self.instances(node).iter().position(|id| *id == instance)
    }

    /// Binds `instance` as the outermost component rooted at `node`.
    pub(crate) fn bind_outer(&mut self, node: NodeId, instance: InstanceId) {
        self.entry(node).instances.insert(0, instance);
    }

    /// Replaces the handler for `event`, returning the previous one.
    pub(crate) fn swap_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: Callback,
    ) -> Option<Callback> {
        self.entry(node).handlers.insert(event.into(), handler)
    }

    /// Drops everything known about a node.
    pub(crate) fn forget(&mut self, node: NodeId) -> Option<NodeMeta> {
        self.nodes.remove(&node)
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bindings_are_outermost_first() {
        let mut registry = Registry::default();
        let node = NodeId::from_raw(7);
        registry.bind_outer(node, InstanceId::from_raw(2));
        registry.bind_outer(node, InstanceId::from_raw(1));
        assert_eq!(registry.instance_at(node, 0), Some(InstanceId::from_raw(1)));
        assert_eq!(registry.depth_of(node, InstanceId::from_raw(2)), Some(1));
        assert_eq!(registry.instance_at(node, 2), None);
    }

    #[test]
    fn clearing_a_key_prunes_empty_entries() {
        let mut registry = Registry::default();
        let node = NodeId::from_raw(1);
        registry.set_key(node, Some(Key::from("a")));
        assert_eq!(registry.key(node), Some(&Key::from("a")));
        registry.set_key(node, None);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn swapping_handlers_returns_the_previous_one() {
        let mut registry = Registry::default();
        let node = NodeId::from_raw(3);
        let first = Callback::new(|_| {});
        let second = Callback::new(|_| {});
        assert!(registry.swap_handler(node, "click", first.clone()).is_none());
        assert_eq!(registry.swap_handler(node, "click", second), Some(first));
    }
}
