//! The runtime handle and its configuration.

use alloc::{rc::Rc, rc::Weak, string::String, vec::Vec};
use core::cell::RefCell;
use core::fmt;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::binder::EVENT_PREFIX;
use crate::component::{Component, Handle, InstanceId, InstanceRecord};
use crate::error::{Error, Result};
use crate::host::{Host, NodeId};
use crate::registry::Registry;
use crate::vnode::{Child, Key};

/// Behavior switches of a [`Reconciler`].
///
/// Every field has a default, so a partial JSON document is a valid
/// configuration:
///
/// ```
/// use ripple_core::ReconcilerOptions;
///
/// let options = ReconcilerOptions::from_json(r#"{ "preserve_focus": false }"#).unwrap();
/// assert!(!options.preserve_focus);
/// assert!(options.unmount_descendants);
/// assert_eq!(options.event_prefix, "on");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerOptions {
    /// Restore the focused node after an element's attributes are rewritten.
    pub preserve_focus: bool,
    /// Notify every component bound inside a removed subtree, not just the
    /// one bound to the removed node itself.
    pub unmount_descendants: bool,
    /// Prefix marking a callback prop as an event handler.
    pub event_prefix: String,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            preserve_focus: true,
            unmount_descendants: true,
            event_prefix: EVENT_PREFIX.into(),
        }
    }
}

impl ReconcilerOptions {
    /// Parses options from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed JSON or mistyped fields.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Builder for [`Reconciler`].
#[derive(Debug)]
pub struct ReconcilerBuilder<H> {
    host: H,
    options: ReconcilerOptions,
}

impl<H: Host + 'static> ReconcilerBuilder<H> {
    /// Creates a builder with default options.
    #[must_use]
    pub fn new(host: H) -> Self {
        Self {
            host,
            options: ReconcilerOptions::default(),
        }
    }

    /// Replaces all options at once.
    #[must_use]
    pub fn options(mut self, options: ReconcilerOptions) -> Self {
        self.options = options;
        self
    }

    /// See [`ReconcilerOptions::preserve_focus`].
    #[must_use]
    pub const fn preserve_focus(mut self, preserve: bool) -> Self {
        self.options.preserve_focus = preserve;
        self
    }

    /// See [`ReconcilerOptions::unmount_descendants`].
    #[must_use]
    pub const fn unmount_descendants(mut self, descendants: bool) -> Self {
        self.options.unmount_descendants = descendants;
        self
    }

    /// See [`ReconcilerOptions::event_prefix`].
    #[must_use]
    pub fn event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.options.event_prefix = prefix.into();
        self
    }

    /// Finalises the builder.
    #[must_use]
    pub fn build(self) -> Reconciler<H> {
        let engine = Rc::new_cyclic(|this| {
            RefCell::new(Engine {
                host: self.host,
                registry: Registry::default(),
                instances: HashMap::new(),
                next_instance: 0,
                options: self.options,
                this: this.clone(),
            })
        });
        Reconciler { engine }
    }
}

/// Engine state shared by a [`Reconciler`] and the handles it gives out.
pub(crate) struct Engine<H> {
    pub(crate) host: H,
    pub(crate) registry: Registry,
    pub(crate) instances: HashMap<InstanceId, InstanceRecord>,
    next_instance: u64,
    pub(crate) options: ReconcilerOptions,
    pub(crate) this: Weak<RefCell<Self>>,
}

impl<H: Host + 'static> Engine<H> {
    pub(crate) fn alloc_instance(&mut self, record: InstanceRecord) -> InstanceId {
        let id = InstanceId::from_raw(self.next_instance);
        self.next_instance += 1;
        self.instances.insert(id, record);
        id
    }

    /// `node` and all its descendants, parents before children.
    pub(crate) fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = alloc::vec![node];
        while let Some(current) = stack.pop() {
            order.push(current);
            let mut children = self.host.children(current);
            children.reverse();
            stack.extend(children);
        }
        order
    }
}

/// Renders virtual trees into a [`Host`] and keeps them in sync.
///
/// The handle is cheap to clone; all clones drive the same engine. Every
/// operation runs to completion on the calling thread.
pub struct Reconciler<H> {
    engine: Rc<RefCell<Engine<H>>>,
}

impl<H> Clone for Reconciler<H> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<H> fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Reconciler");
        if let Ok(engine) = self.engine.try_borrow() {
            s.field("options", &engine.options)
                .field("instances", &engine.instances.len())
                .field("tracked_nodes", &engine.registry.len());
        }
        s.finish_non_exhaustive()
    }
}

impl<H: Host + 'static> Reconciler<H> {
    /// Creates a reconciler with default options.
    #[must_use]
    pub fn new(host: H) -> Self {
        ReconcilerBuilder::new(host).build()
    }

    /// Starts configuring a reconciler.
    #[must_use]
    pub fn builder(host: H) -> ReconcilerBuilder<H> {
        ReconcilerBuilder::new(host)
    }

    fn engine(&self) -> Result<core::cell::RefMut<'_, Engine<H>>> {
        self.engine.try_borrow_mut().map_err(|_| Error::Unavailable)
    }

    /// Builds a live subtree for `tree`.
    ///
    /// With a `parent` the new node is appended as its last child; without
    /// one it is returned detached.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTree`] if `tree` contains an unrecognized shape, and
    /// [`Error::Unavailable`] if called from inside a running pass.
    #[tracing::instrument(level = "debug", skip(self, tree))]
    pub fn render(&self, tree: &Child, parent: Option<NodeId>) -> Result<NodeId> {
        self.engine()?.render(tree, parent)
    }

    /// Brings `node` in sync with `tree`, under the node's current parent.
    ///
    /// Returns the live node now representing `tree`, which differs from
    /// `node` when it had to be replaced.
    ///
    /// # Errors
    ///
    /// Same as [`Reconciler::render`].
    #[tracing::instrument(level = "debug", skip(self, tree))]
    pub fn patch(&self, node: NodeId, tree: &Child) -> Result<NodeId> {
        let mut engine = self.engine()?;
        let parent = engine.host.parent(node);
        engine.patch_at(node, tree, parent, 0)
    }

    /// Like [`Reconciler::patch`], with an explicit parent used for
    /// replacements.
    ///
    /// # Errors
    ///
    /// Same as [`Reconciler::render`].
    #[tracing::instrument(level = "debug", skip(self, tree))]
    pub fn patch_in(&self, node: NodeId, tree: &Child, parent: Option<NodeId>) -> Result<NodeId> {
        self.engine()?.patch_at(node, tree, parent, 0)
    }

    /// Runs `f` with the host.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a running pass.
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.engine.borrow().host)
    }

    /// The reconciliation key recorded for a live node.
    #[must_use]
    pub fn key_of(&self, node: NodeId) -> Option<Key> {
        self.engine.try_borrow().ok()?.registry.key(node).cloned()
    }

    /// Number of live component instances.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.engine.try_borrow().map_or(0, |engine| engine.instances.len())
    }

    /// The options this reconciler runs with.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a running pass.
    #[must_use]
    pub fn options(&self) -> ReconcilerOptions {
        self.engine.borrow().options.clone()
    }

    /// A handle to the instance of `C` bound to `node`, if any.
    #[must_use]
    pub fn handle_at<C: Component>(&self, node: NodeId) -> Option<Handle<C>> {
        let engine = self.engine.try_borrow().ok()?;
        engine
            .registry
            .instances(node)
            .iter()
            .copied()
            .find(|id| engine.instances.get(id).is_some_and(|r| r.kind.is::<C>()))
            .map(|id| Handle::new(engine.this.clone(), id))
    }
}
