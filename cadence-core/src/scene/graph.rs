//! In-Memory Scene Graph
//!
//! A minimal arena-backed [`SceneTree`] for embedders that have no rendering
//! backend of their own, and for tests. Each node carries one scalar
//! [`Transition`] as its local state and a derived world value equal to the
//! parent's world value plus the node's local value.
//!
//! While transitions are suppressed, world refreshes read each node's target
//! instead of its interpolated value.

use smallvec::SmallVec;

use super::node::{NodeId, SceneTree};
use crate::error::SchedulerError;

/// A scalar that moves toward a target at a bounded rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    target: f64,
    current: f64,
    /// Units per second. `f64::INFINITY` snaps to the target on every step.
    rate: f64,
}

impl Transition {
    /// Create a transition resting at `value` that snaps to new targets.
    pub fn new(value: f64) -> Self {
        Self {
            target: value,
            current: value,
            rate: f64::INFINITY,
        }
    }

    /// Create a transition resting at `value` that moves at `rate` units per
    /// second.
    pub fn with_rate(value: f64, rate: f64) -> Self {
        Self {
            target: value,
            current: value,
            rate: rate.abs(),
        }
    }

    /// The value being approached.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// The interpolated value.
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Set a new target. The current value is untouched until the next step.
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Whether the current value has reached the target.
    pub fn is_settled(&self) -> bool {
        self.current == self.target
    }

    /// Move `current` toward `target` by at most `rate * delta_time`.
    pub fn step(&mut self, delta_time: f64) {
        let remaining = self.target - self.current;
        let max_step = self.rate * delta_time;
        if remaining.abs() <= max_step || !max_step.is_finite() {
            self.current = self.target;
        } else {
            self.current += max_step.copysign(remaining);
        }
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    local: Transition,
    world: f64,
}

/// Arena-backed scene tree with scalar transitions.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    transitions_suppressed: bool,
}

impl SceneGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parentless node.
    pub fn add_root(&mut self, local: Transition) -> NodeId {
        self.push(None, local)
    }

    /// Add `local` as the last child of `parent`.
    pub fn add_child(&mut self, parent: NodeId, local: Transition) -> Result<NodeId, SchedulerError> {
        if !self.contains(parent) {
            return Err(SchedulerError::UnknownNode(parent));
        }
        let id = self.push(Some(parent), local);
        self.nodes[parent.index()].children.push(id);
        Ok(id)
    }

    fn push(&mut self, parent: Option<NodeId>, local: Transition) -> NodeId {
        let id = NodeId::new(self.nodes.len() as u32);
        let parent_world = parent.map_or(0.0, |p| self.nodes[p.index()].world);
        self.nodes.push(SceneNode {
            parent,
            children: Vec::new(),
            local,
            world: parent_world + local.current(),
        });
        id
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node's local transition.
    pub fn transition(&self, node: NodeId) -> Option<&Transition> {
        self.nodes.get(node.index()).map(|n| &n.local)
    }

    /// Mutable access to the node's local transition.
    pub fn transition_mut(&mut self, node: NodeId) -> Option<&mut Transition> {
        self.nodes.get_mut(node.index()).map(|n| &mut n.local)
    }

    /// Set the node's local target.
    pub fn set_target(&mut self, node: NodeId, target: f64) -> Result<(), SchedulerError> {
        let transition = self
            .transition_mut(node)
            .ok_or(SchedulerError::UnknownNode(node))?;
        transition.set_target(target);
        Ok(())
    }

    /// The node's local value as currently observable: the target while
    /// transitions are suppressed, the interpolated value otherwise.
    pub fn local(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(node.index()).map(|n| self.observe(&n.local))
    }

    /// The node's world value as of its last refresh.
    pub fn world(&self, node: NodeId) -> Option<f64> {
        self.nodes.get(node.index()).map(|n| n.world)
    }

    /// Whether transition smoothing is currently suppressed.
    pub fn transitions_suppressed(&self) -> bool {
        self.transitions_suppressed
    }

    fn observe(&self, transition: &Transition) -> f64 {
        if self.transitions_suppressed {
            transition.target()
        } else {
            transition.current()
        }
    }
}

impl SceneTree for SceneGraph {
    fn contains(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.index()).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.index())
            .map_or(&[], |n| n.children.as_slice())
    }

    fn refresh_world(&mut self, node: NodeId) {
        if !self.contains(node) {
            return;
        }
        let mut stack: SmallVec<[NodeId; 16]> = SmallVec::new();
        stack.push(node);
        while let Some(id) = stack.pop() {
            let parent_world = self.nodes[id.index()]
                .parent
                .map_or(0.0, |p| self.nodes[p.index()].world);
            let local = self.observe(&self.nodes[id.index()].local);
            let entry = &mut self.nodes[id.index()];
            entry.world = parent_world + local;
            stack.extend(entry.children.iter().rev().copied());
        }
    }

    fn step_transition(&mut self, node: NodeId, delta_time: f64) {
        if let Some(entry) = self.nodes.get_mut(node.index()) {
            entry.local.step(delta_time);
        }
    }

    fn set_transitions_suppressed(&mut self, suppressed: bool) {
        self.transitions_suppressed = suppressed;
    }
}
