//! Scene Nodes
//!
//! This module defines the node handle and the adapter trait through which
//! the scheduler talks to an externally owned tree.

use std::fmt;

/// Handle to a node in an externally owned scene tree.
///
/// The scheduler never dereferences a handle itself; it only passes it back
/// to the [`SceneTree`] it was given. Bookkeeping is kept in a side table
/// keyed by this handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a handle from a raw index.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw index.
    pub fn raw(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// The boundary between the scheduler and a concrete scene representation.
///
/// Implementors own the tree. The scheduler asks for topology, triggers
/// world-state refreshes on subtrees, and steps each node's transition once
/// per frame.
pub trait SceneTree {
    /// Whether `node` belongs to this tree.
    fn contains(&self, node: NodeId) -> bool;

    /// Parent of `node`, or `None` for a root.
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Direct children of `node`, in traversal order.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Recompute derived world state for `node` and its whole subtree.
    fn refresh_world(&mut self, node: NodeId);

    /// Advance `node`'s transient state toward its target by `delta_time`.
    fn step_transition(&mut self, node: NodeId, delta_time: f64);

    /// Toggle global transition smoothing.
    ///
    /// While suppressed, reads of transitioning state must observe the raw
    /// target rather than the interpolated value.
    fn set_transitions_suppressed(&mut self, _suppressed: bool) {}
}
