//! Update Scheduler
//!
//! The scheduler runs every node's behaviors once per frame and guarantees
//! that a node's whole ancestor chain is current before the node itself runs.
//!
//! # Algorithm
//!
//! Evaluation is lazy and memoized. Each node has an `updated` flag in a side
//! table owned by the scheduler. [`Frame::ensure_update`] is the only way a
//! node gets evaluated:
//!
//! 1. If the node is already flagged, return.
//! 2. Flag the node, then recursively ensure its parent. Flagging first is
//!    what keeps re-entrant calls from looping.
//! 3. With transition smoothing suppressed, run the node's `update` hooks in
//!    order, refreshing the node's subtree after each one.
//! 4. With smoothing restored, step the node's transition once.
//! 5. Run the node's `post_update` hooks in order, refreshing after each.
//!
//! A frame evaluates the reference view first, then walks the tree from the
//! root. Behaviors may call `ensure_update` on any node at any time to pull a
//! dependency current before reading it.
//!
//! # Frame Lifecycle
//!
//! [`UpdateScheduler::begin_frame`] clears all `updated` flags and returns a
//! [`Frame`] guard. The flags stay readable through
//! [`UpdateScheduler::was_updated`] after the guard is dropped, until the
//! next frame begins.

use std::mem;

use indexmap::IndexMap;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use super::behavior::{Behavior, HookResult};
use super::node::{NodeId, SceneTree};
use crate::error::SchedulerError;

/// Scheduler bookkeeping for one node.
struct NodeRecord<T: SceneTree> {
    behaviors: Vec<Behavior<T>>,
    updated: bool,
}

impl<T: SceneTree> Default for NodeRecord<T> {
    fn default() -> Self {
        Self {
            behaviors: Vec::new(),
            updated: false,
        }
    }
}

/// Counters collected over one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// Nodes evaluated this frame.
    pub nodes_evaluated: usize,
    /// `update` and `post_update` hooks invoked this frame.
    pub hooks_run: usize,
}

/// Orchestrates per-frame behavior evaluation over a [`SceneTree`].
pub struct UpdateScheduler<T: SceneTree> {
    /// Side table of per-node bookkeeping.
    records: IndexMap<NodeId, NodeRecord<T>>,

    /// Set while a [`Frame`] guard is alive.
    frame_active: bool,

    /// Number of frames begun so far.
    frame_count: u64,
}

impl<T: SceneTree> UpdateScheduler<T> {
    /// Create a scheduler with no behaviors.
    pub fn new() -> Self {
        Self {
            records: IndexMap::new(),
            frame_active: false,
            frame_count: 0,
        }
    }

    /// Attach a behavior to `node`.
    ///
    /// The behavior's `init` hook runs immediately. Behaviors run in the
    /// order they were added; attaching the same logic twice runs it twice.
    pub fn add_behavior(&mut self, node: NodeId, behavior: Behavior<T>) {
        attach(&mut self.records, node, behavior);
    }

    /// Attach a bare update closure to `node`.
    pub fn on_update<F>(&mut self, node: NodeId, update: F)
    where
        F: FnMut(&mut Frame<'_, T>, NodeId) -> HookResult + 'static,
    {
        self.add_behavior(node, Behavior::from_fn(update));
    }

    /// Number of behaviors attached to `node`.
    pub fn behavior_count(&self, node: NodeId) -> usize {
        self.records.get(&node).map_or(0, |r| r.behaviors.len())
    }

    /// Drop all bookkeeping for `node`, returning how many behaviors it had.
    ///
    /// Call this when the external tree deletes the node.
    pub fn remove_behaviors(&mut self, node: NodeId) -> usize {
        self.records
            .shift_remove(&node)
            .map_or(0, |r| r.behaviors.len())
    }

    /// Whether `node` was evaluated in the current or most recent frame.
    pub fn was_updated(&self, node: NodeId) -> bool {
        self.records.get(&node).is_some_and(|r| r.updated)
    }

    /// Number of frames begun so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Whether a frame guard is currently alive.
    pub fn is_frame_active(&self) -> bool {
        self.frame_active
    }

    /// Start a frame.
    ///
    /// Clears every node's `updated` flag and returns the frame guard through
    /// which nodes are evaluated.
    pub fn begin_frame<'a>(
        &'a mut self,
        tree: &'a mut T,
        root: NodeId,
        reference_view: NodeId,
        delta_time: f64,
    ) -> Result<Frame<'a, T>, SchedulerError> {
        if self.frame_active {
            return Err(SchedulerError::FrameAlreadyActive);
        }
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(SchedulerError::InvalidDeltaTime(delta_time));
        }
        for node in [root, reference_view] {
            if !tree.contains(node) {
                return Err(SchedulerError::UnknownNode(node));
            }
        }

        for record in self.records.values_mut() {
            record.updated = false;
        }
        self.frame_active = true;
        self.frame_count += 1;
        debug!(frame = self.frame_count, ?root, ?reference_view, delta_time, "frame begin");

        let stats = FrameStats {
            frame: self.frame_count,
            ..FrameStats::default()
        };
        Ok(Frame {
            scheduler: self,
            tree,
            root,
            reference_view,
            delta_time,
            transitions_suppressed: false,
            stats,
        })
    }

    /// Run one complete frame: begin, evaluate every node, end.
    pub fn update(
        &mut self,
        tree: &mut T,
        root: NodeId,
        reference_view: NodeId,
        delta_time: f64,
    ) -> Result<FrameStats, SchedulerError> {
        let mut frame = self.begin_frame(tree, root, reference_view, delta_time)?;
        frame.run()?;
        Ok(frame.end())
    }
}

impl<T: SceneTree> Default for UpdateScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: SceneTree> std::fmt::Debug for UpdateScheduler<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("tracked_nodes", &self.records.len())
            .field("frame_active", &self.frame_active)
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

fn attach<T: SceneTree>(
    records: &mut IndexMap<NodeId, NodeRecord<T>>,
    node: NodeId,
    mut behavior: Behavior<T>,
) {
    behavior.init(node);
    records.entry(node).or_default().behaviors.push(behavior);
}

/// The explicit context of one scheduler pass.
///
/// Only obtainable from [`UpdateScheduler::begin_frame`], so every call that
/// requires an active frame takes one as a parameter. Dropping the frame
/// ends it.
pub struct Frame<'a, T: SceneTree> {
    scheduler: &'a mut UpdateScheduler<T>,
    tree: &'a mut T,
    root: NodeId,
    reference_view: NodeId,
    delta_time: f64,
    transitions_suppressed: bool,
    stats: FrameStats,
}

impl<'a, T: SceneTree> Frame<'a, T> {
    /// Root of the tree being updated.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The observer node evaluated before anything else.
    pub fn reference_view(&self) -> NodeId {
        self.reference_view
    }

    /// Seconds elapsed since the previous frame.
    pub fn delta_time(&self) -> f64 {
        self.delta_time
    }

    /// Frame number, starting at 1.
    pub fn number(&self) -> u64 {
        self.stats.frame
    }

    /// The tree being updated.
    pub fn tree(&self) -> &T {
        &*self.tree
    }

    /// Mutable access to the tree, for hooks that write target state.
    pub fn tree_mut(&mut self) -> &mut T {
        &mut *self.tree
    }

    /// Whether `node` has been evaluated in this frame.
    pub fn is_updated(&self, node: NodeId) -> bool {
        self.scheduler.was_updated(node)
    }

    /// Attach a behavior from inside a running frame.
    ///
    /// If `node` has already been evaluated this frame, the behavior first
    /// runs next frame.
    pub fn add_behavior(&mut self, node: NodeId, behavior: Behavior<T>) {
        attach(&mut self.scheduler.records, node, behavior);
    }

    /// Evaluate the whole tree: refresh world state from the root, pull the
    /// reference view current, then visit every node in pre-order.
    pub fn run(&mut self) -> Result<(), SchedulerError> {
        self.tree.refresh_world(self.root);
        self.ensure_update(self.reference_view)?;

        let mut stack: SmallVec<[NodeId; 32]> = smallvec![self.root];
        while let Some(node) = stack.pop() {
            self.ensure_update(node)?;
            stack.extend(self.tree.children(node).iter().rev().copied());
        }
        Ok(())
    }

    /// Make sure `node` and all its ancestors have been evaluated this
    /// frame. Idempotent within a frame.
    pub fn ensure_update(&mut self, node: NodeId) -> Result<(), SchedulerError> {
        if !self.tree.contains(node) {
            return Err(SchedulerError::UnknownNode(node));
        }

        let record = self.scheduler.records.entry(node).or_default();
        if record.updated {
            return Ok(());
        }
        record.updated = true;

        if let Some(parent) = self.tree.parent(node) {
            self.ensure_update(parent)?;
        }

        trace!(?node, frame = self.stats.frame, "evaluating node");
        self.stats.nodes_evaluated += 1;

        // Detach the list so hooks can re-enter the frame.
        let mut behaviors = self
            .scheduler
            .records
            .get_mut(&node)
            .map(|r| mem::take(&mut r.behaviors))
            .unwrap_or_default();

        let result = self.evaluate(node, &mut behaviors);

        if let Some(record) = self.scheduler.records.get_mut(&node) {
            let added = mem::replace(&mut record.behaviors, behaviors);
            record.behaviors.extend(added);
        }
        result
    }

    /// End the frame and return its counters.
    pub fn end(self) -> FrameStats {
        debug!(
            frame = self.stats.frame,
            nodes = self.stats.nodes_evaluated,
            hooks = self.stats.hooks_run,
            "frame end"
        );
        self.stats
    }

    fn evaluate(&mut self, node: NodeId, behaviors: &mut [Behavior<T>]) -> HookResult {
        let outer = self.transitions_suppressed;

        self.suppress_transitions(true);
        let mut result = self.run_update_hooks(node, behaviors);
        self.suppress_transitions(false);

        if result.is_ok() {
            self.tree.step_transition(node, self.delta_time);
            self.tree.refresh_world(node);
            result = self.run_post_update_hooks(node, behaviors);
        }

        self.suppress_transitions(outer);
        result
    }

    fn run_update_hooks(&mut self, node: NodeId, behaviors: &mut [Behavior<T>]) -> HookResult {
        for behavior in behaviors.iter_mut() {
            self.stats.hooks_run += 1;
            let outcome = behavior.update(self, node);
            self.tree.refresh_world(node);
            outcome?;
        }
        Ok(())
    }

    fn run_post_update_hooks(&mut self, node: NodeId, behaviors: &mut [Behavior<T>]) -> HookResult {
        for behavior in behaviors.iter_mut() {
            if matches!(behavior, Behavior::Update(_)) {
                continue;
            }
            self.stats.hooks_run += 1;
            let outcome = behavior.post_update(self, node);
            self.tree.refresh_world(node);
            outcome?;
        }
        Ok(())
    }

    fn suppress_transitions(&mut self, suppressed: bool) {
        if self.transitions_suppressed != suppressed {
            self.transitions_suppressed = suppressed;
            self.tree.set_transitions_suppressed(suppressed);
        }
    }
}

impl<T: SceneTree> Drop for Frame<'_, T> {
    fn drop(&mut self) {
        self.scheduler.frame_active = false;
    }
}

impl<T: SceneTree> std::fmt::Debug for Frame<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("root", &self.root)
            .field("reference_view", &self.reference_view)
            .field("delta_time", &self.delta_time)
            .field("stats", &self.stats)
            .finish()
    }
}
