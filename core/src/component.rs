//! Components and the lifecycle state machine.
//!
//! A stateful component implements [`Component`]. Each time a node of that
//! type is mounted where no matching instance exists, the engine creates an
//! instance, stores it in its instance arena and binds it to the live root of
//! the instance's output. From then on the instance moves through
//!
//! ```text
//! mounting -> mounted -> (updating)* -> unmounting
//! ```
//!
//! State is replaced wholesale by [`Scope::set_state`] or
//! [`Handle::set_state`]; each call runs its own synchronous patch pass
//! unless [`Component::should_update`] declines.

use alloc::{boxed::Box, rc::Rc, rc::Weak, vec::Vec};
use core::any::{Any, TypeId, type_name};
use core::cell::RefCell;
use core::fmt;
use core::marker::PhantomData;

use crate::error::{Error, Result};
use crate::host::{Host, NodeId};
use crate::reconciler::Engine;
use crate::vnode::{Child, NodeType, Props, VNode};

/// A stateful component.
///
/// Only `create`, `initial_state` and `render` are required; every hook
/// defaults to a no-op and `should_update` defaults to `true`.
pub trait Component: Sized + 'static {
    /// Instance-owned state, replaced wholesale on every update.
    type State: 'static;

    /// Constructs an instance from its first props.
    fn create(props: &Props) -> Self;

    /// State of a freshly constructed instance.
    fn initial_state(&self, props: &Props) -> Self::State;

    /// Describes the instance's output.
    fn render(&self, props: &Props, state: &Self::State) -> Child;

    /// Decides whether a state change re-renders.
    ///
    /// When this returns `false` the new state is still stored.
    fn should_update(&self, _props: &Props, _next_state: &Self::State) -> bool {
        true
    }

    /// Runs before new props replace the current ones.
    fn will_receive_props(&self, _next_props: &Props, _scope: &mut Scope<'_, Self>) {}

    /// Runs before the first render.
    fn will_mount(&self, _scope: &mut Scope<'_, Self>) {}

    /// Runs once the output is rendered and bound.
    fn did_mount(&self, _scope: &mut Scope<'_, Self>) {}

    /// Runs before an accepted state change is applied.
    fn will_update(
        &self,
        _next_props: &Props,
        _next_state: &Self::State,
        _scope: &mut Scope<'_, Self>,
    ) {
    }

    /// Runs after the output was patched for a state change.
    fn did_update(
        &self,
        _prev_props: &Props,
        _prev_state: &Self::State,
        _scope: &mut Scope<'_, Self>,
    ) {
    }

    /// Runs when the instance's output is removed from the tree.
    fn will_unmount(&self, _scope: &mut Scope<'_, Self>) {}
}

/// Identity of a mounted component instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Runtime descriptor of a [`Component`] type.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: TypeId,
    name: &'static str,
    create: fn(&Props) -> Rc<dyn ErasedComponent>,
}

impl ComponentType {
    /// Descriptor of `C`.
    #[must_use]
    pub fn of<C: Component>() -> Self {
        Self {
            id: TypeId::of::<C>(),
            name: type_name::<C>(),
            create: create_erased::<C>,
        }
    }

    /// Type name of the component.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this describes `C`.
    #[must_use]
    pub fn is<C: Component>(&self) -> bool {
        self.id == TypeId::of::<C>()
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentType").field(&self.name).finish()
    }
}

fn create_erased<C: Component>(props: &Props) -> Rc<dyn ErasedComponent> {
    Rc::new(C::create(props))
}

fn state_of<C: Component>(state: &dyn Any) -> &C::State {
    state
        .downcast_ref::<C::State>()
        .expect("instance state always has its component's state type")
}

/// Object-safe view of a [`Component`] used by the engine.
pub(crate) trait ErasedComponent {
    fn initial_state(&self, props: &Props) -> Box<dyn Any>;
    fn render(&self, props: &Props, state: &dyn Any) -> Child;
    fn should_update(&self, props: &Props, next_state: &dyn Any) -> bool;
    fn will_receive_props(&self, next_props: &Props, cx: &mut dyn Context, id: InstanceId);
    fn will_mount(&self, cx: &mut dyn Context, id: InstanceId);
    fn did_mount(&self, cx: &mut dyn Context, id: InstanceId);
    fn will_update(
        &self,
        props: &Props,
        next_state: &dyn Any,
        cx: &mut dyn Context,
        id: InstanceId,
    );
    fn did_update(&self, props: &Props, prev_state: &dyn Any, cx: &mut dyn Context, id: InstanceId);
    fn will_unmount(&self, cx: &mut dyn Context, id: InstanceId);
}

impl<C: Component> ErasedComponent for C {
    fn initial_state(&self, props: &Props) -> Box<dyn Any> {
        Box::new(Component::initial_state(self, props))
    }

    fn render(&self, props: &Props, state: &dyn Any) -> Child {
        Component::render(self, props, state_of::<C>(state))
    }

    fn should_update(&self, props: &Props, next_state: &dyn Any) -> bool {
        Component::should_update(self, props, state_of::<C>(next_state))
    }

    fn will_receive_props(&self, next_props: &Props, cx: &mut dyn Context, id: InstanceId) {
        Component::will_receive_props(self, next_props, &mut Scope::new(cx, id));
    }

    fn will_mount(&self, cx: &mut dyn Context, id: InstanceId) {
        Component::will_mount(self, &mut Scope::new(cx, id));
    }

    fn did_mount(&self, cx: &mut dyn Context, id: InstanceId) {
        Component::did_mount(self, &mut Scope::new(cx, id));
    }

    fn will_update(
        &self,
        props: &Props,
        next_state: &dyn Any,
        cx: &mut dyn Context,
        id: InstanceId,
    ) {
        Component::will_update(self, props, state_of::<C>(next_state), &mut Scope::new(cx, id));
    }

    fn did_update(
        &self,
        props: &Props,
        prev_state: &dyn Any,
        cx: &mut dyn Context,
        id: InstanceId,
    ) {
        Component::did_update(self, props, state_of::<C>(prev_state), &mut Scope::new(cx, id));
    }

    fn will_unmount(&self, cx: &mut dyn Context, id: InstanceId) {
        Component::will_unmount(self, &mut Scope::new(cx, id));
    }
}

/// Engine operations reachable from lifecycle hooks and handles.
pub(crate) trait Context {
    fn instance_props(&self, id: InstanceId) -> Option<Props>;
    fn instance_state(&self, id: InstanceId) -> Option<&dyn Any>;
    fn instance_base(&self, id: InstanceId) -> Option<NodeId>;
    fn update_state(&mut self, id: InstanceId, next: Box<dyn Any>) -> Result<()>;
    fn runtime(&self) -> Weak<RefCell<dyn Context>>;
}

/// Lifecycle phase of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    /// Constructed, output not rendered yet.
    Mounting,
    Mounted,
    /// `will_unmount` has run or is running.
    Unmounting,
}

pub(crate) struct InstanceRecord {
    pub(crate) component: Rc<dyn ErasedComponent>,
    pub(crate) kind: ComponentType,
    pub(crate) props: Props,
    pub(crate) state: Box<dyn Any>,
    pub(crate) base: Option<NodeId>,
    pub(crate) phase: Phase,
}

impl fmt::Debug for InstanceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceRecord")
            .field("kind", &self.kind)
            .field("base", &self.base)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

/// Access to an instance from inside its own lifecycle hooks.
///
/// [`Scope::set_state`] runs synchronously on the current call stack: a hook
/// that keeps setting state recurses, and must bound that itself.
pub struct Scope<'a, C: Component> {
    cx: &'a mut dyn Context,
    id: InstanceId,
    _component: PhantomData<fn() -> C>,
}

impl<'a, C: Component> Scope<'a, C> {
    pub(crate) fn new(cx: &'a mut dyn Context, id: InstanceId) -> Self {
        Self {
            cx,
            id,
            _component: PhantomData,
        }
    }

    /// The instance this scope belongs to.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Current props of the instance.
    #[must_use]
    pub fn props(&self) -> Props {
        self.cx.instance_props(self.id).unwrap_or_default()
    }

    /// Current state of the instance.
    #[must_use]
    pub fn state(&self) -> Option<&C::State> {
        self.cx.instance_state(self.id).map(state_of::<C>)
    }

    /// Root of the instance's output, once rendered.
    #[must_use]
    pub fn base(&self) -> Option<NodeId> {
        self.cx.instance_base(self.id)
    }

    /// Replaces the instance state, re-rendering if allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTree`] if the new output is malformed.
    pub fn set_state(&mut self, next: C::State) -> Result<()> {
        self.cx.update_state(self.id, Box::new(next))
    }

    /// A handle that outlives this scope, e.g. for event callbacks.
    #[must_use]
    pub fn handle(&self) -> Handle<C> {
        Handle::new(self.cx.runtime(), self.id)
    }
}

impl<C: Component> fmt::Debug for Scope<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("component", &type_name::<C>())
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Weak, cloneable reference to a component instance.
pub struct Handle<C: Component> {
    runtime: Weak<RefCell<dyn Context>>,
    id: InstanceId,
    _component: PhantomData<fn() -> C>,
}

impl<C: Component> Handle<C> {
    pub(crate) fn new(runtime: Weak<RefCell<dyn Context>>, id: InstanceId) -> Self {
        Self {
            runtime,
            id,
            _component: PhantomData,
        }
    }

    /// The instance this handle refers to.
    #[must_use]
    pub const fn id(&self) -> InstanceId {
        self.id
    }

    /// Replaces the instance state, re-rendering if allowed.
    ///
    /// State set on an instance that has since been unmounted is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] when the runtime is gone or a pass is
    /// already running (use [`Scope::set_state`] from inside hooks), and
    /// [`Error::InvalidTree`] if the new output is malformed.
    pub fn set_state(&self, next: C::State) -> Result<()> {
        let runtime = self.runtime.upgrade().ok_or(Error::Unavailable)?;
        let Ok(mut cx) = runtime.try_borrow_mut() else {
            tracing::warn!(instance = %self.id, "set_state called while a pass is running");
            return Err(Error::Unavailable);
        };
        cx.update_state(self.id, Box::new(next))
    }

    /// Reads the instance's props and state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] when the runtime is gone or busy, or the
    /// instance no longer exists.
    pub fn read<R>(&self, f: impl FnOnce(&Props, &C::State) -> R) -> Result<R> {
        let runtime = self.runtime.upgrade().ok_or(Error::Unavailable)?;
        let cx = runtime.try_borrow().map_err(|_| Error::Unavailable)?;
        let props = cx.instance_props(self.id).ok_or(Error::Unavailable)?;
        let state = cx.instance_state(self.id).ok_or(Error::Unavailable)?;
        Ok(f(&props, state_of::<C>(state)))
    }

    /// Whether the instance still exists in its runtime.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.runtime
            .upgrade()
            .and_then(|runtime| {
                runtime
                    .try_borrow()
                    .ok()
                    .map(|cx| cx.instance_props(self.id).is_some())
            })
            .unwrap_or(false)
    }
}

impl<C: Component> Clone for Handle<C> {
    fn clone(&self) -> Self {
        Self {
            runtime: self.runtime.clone(),
            id: self.id,
            _component: PhantomData,
        }
    }
}

impl<C: Component> fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("component", &type_name::<C>())
            .field("id", &self.id)
            .finish()
    }
}

impl<H: Host + 'static> Context for Engine<H> {
    fn instance_props(&self, id: InstanceId) -> Option<Props> {
        self.instances.get(&id).map(|record| record.props.clone())
    }

    fn instance_state(&self, id: InstanceId) -> Option<&dyn Any> {
        self.instances.get(&id).map(|record| record.state.as_ref())
    }

    fn instance_base(&self, id: InstanceId) -> Option<NodeId> {
        self.instances.get(&id).and_then(|record| record.base)
    }

    fn update_state(&mut self, id: InstanceId, next: Box<dyn Any>) -> Result<()> {
        self.set_state(id, next)
    }

    fn runtime(&self) -> Weak<RefCell<dyn Context>> {
        let this: Weak<RefCell<dyn Context>> = self.this.clone();
        this
    }
}

impl<H: Host + 'static> Engine<H> {
    fn instance_output(&self, id: InstanceId) -> Option<Child> {
        let record = self.instances.get(&id)?;
        Some(record.component.render(&record.props, record.state.as_ref()))
    }

    /// Mounts a function or stateful component node.
    pub(crate) fn render_component(
        &mut self,
        vnode: &VNode,
        parent: Option<NodeId>,
    ) -> Result<NodeId> {
        let props = vnode.component_props();
        let kind = match vnode.kind() {
            NodeType::Stateless(func) => {
                let node = self.render(&func.call(&props), parent)?;
                self.registry.set_key(node, vnode.prop_map().key());
                return Ok(node);
            }
            NodeType::Stateful(kind) => *kind,
            NodeType::Element(_) => return self.render(&Child::Node(vnode.clone()), parent),
        };

        let component = (kind.create)(&props);
        let state = component.initial_state(&props);
        let id = self.alloc_instance(InstanceRecord {
            component: component.clone(),
            kind,
            props,
            state,
            base: None,
            phase: Phase::Mounting,
        });
        tracing::debug!(component = kind.name(), instance = %id, "mounting");

        component.will_mount(self, id);
        let output = self.instance_output(id).unwrap_or(Child::Null);
        let node = match self.render(&output, parent) {
            Ok(node) => node,
            Err(err) => {
                self.instances.remove(&id);
                return Err(err);
            }
        };

        self.registry.bind_outer(node, id);
        self.registry.set_key(node, vnode.prop_map().key());
        if let Some(record) = self.instances.get_mut(&id) {
            record.base = Some(node);
            record.phase = Phase::Mounted;
        }
        component.did_mount(self, id);
        Ok(node)
    }

    /// Patches a live node against a function or stateful component node.
    ///
    /// `depth` selects which of the instances bound to `node` this component
    /// level corresponds to, outermost first.
    pub(crate) fn patch_component(
        &mut self,
        node: NodeId,
        vnode: &VNode,
        parent: Option<NodeId>,
        depth: usize,
    ) -> Result<NodeId> {
        let props = vnode.component_props();
        let kind = match vnode.kind() {
            NodeType::Stateless(func) => {
                return self.patch_at(node, &func.call(&props), parent, depth);
            }
            NodeType::Stateful(kind) => *kind,
            NodeType::Element(_) => {
                return self.patch_at(node, &Child::Node(vnode.clone()), parent, depth);
            }
        };

        let bound = self
            .registry
            .instance_at(node, depth)
            .filter(|id| self.instances.get(id).is_some_and(|r| r.kind == kind));

        let Some(id) = bound else {
            tracing::debug!(component = kind.name(), %node, "remounting");
            let fresh = self.render_component(vnode, None)?;
            return Ok(self.replace(node, fresh, parent, depth));
        };

        if let Some(component) = self.instances.get(&id).map(|r| r.component.clone()) {
            component.will_receive_props(&props, self, id);
        }
        if let Some(record) = self.instances.get_mut(&id) {
            record.props = props;
        }
        let Some(output) = self.instance_output(id) else {
            return Ok(node);
        };
        let patched = self.patch_at(node, &output, parent, depth + 1)?;
        if patched != node {
            self.rebase(id, patched);
        }
        Ok(patched)
    }

    /// Moves an instance onto a new output root.
    fn rebase(&mut self, id: InstanceId, node: NodeId) {
        self.registry.bind_outer(node, id);
        if let Some(record) = self.instances.get_mut(&id) {
            record.base = Some(node);
        }
    }

    /// Replaces the state of an instance, re-rendering unless gated.
    pub(crate) fn set_state(&mut self, id: InstanceId, next: Box<dyn Any>) -> Result<()> {
        let Some(record) = self.instances.get_mut(&id) else {
            tracing::debug!(instance = %id, "state set on a discarded instance");
            return Ok(());
        };
        if record.phase != Phase::Mounted || record.base.is_none() {
            record.state = next;
            return Ok(());
        }
        let component = record.component.clone();
        let props = record.props.clone();
        if !component.should_update(&props, next.as_ref()) {
            tracing::debug!(component = record.kind.name(), instance = %id, "update declined");
            record.state = next;
            return Ok(());
        }

        component.will_update(&props, next.as_ref(), self, id);
        let Some(record) = self.instances.get_mut(&id) else {
            return Ok(());
        };
        let prev = core::mem::replace(&mut record.state, next);
        let Some(base) = record.base else {
            return Ok(());
        };

        let depth = self.registry.depth_of(base, id).unwrap_or(0);
        let outer: Vec<InstanceId> = self.registry.instances(base)[..depth].to_vec();
        let Some(output) = self.instance_output(id) else {
            return Ok(());
        };
        let parent = self.host.parent(base);
        let patched = self.patch_at(base, &output, parent, depth + 1)?;
        if patched != base {
            self.rebase(id, patched);
            for outer_id in outer.into_iter().rev() {
                self.rebase(outer_id, patched);
            }
        }

        component.did_update(&props, prev.as_ref(), self, id);
        Ok(())
    }

    /// Runs `will_unmount` for every mounted instance bound in the subtree of
    /// `node`, parents before children, outermost binding first.
    pub(crate) fn notify_unmount(&mut self, node: NodeId) {
        let nodes = if self.options.unmount_descendants {
            self.subtree(node)
        } else {
            alloc::vec![node]
        };
        for current in nodes {
            for id in self.registry.instances(current).to_vec() {
                let Some(record) = self.instances.get_mut(&id) else {
                    continue;
                };
                if record.phase != Phase::Mounted {
                    continue;
                }
                record.phase = Phase::Unmounting;
                tracing::debug!(component = record.kind.name(), instance = %id, "unmounting");
                let component = record.component.clone();
                component.will_unmount(self, id);
            }
        }
    }
}
