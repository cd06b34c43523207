//! Behaviors
//!
//! A behavior is a unit of per-node logic run once per frame by the
//! [`UpdateScheduler`](super::UpdateScheduler). It comes in two shapes:
//!
//! - a bare update closure, the common case, and
//! - a full [`Hooks`] object implementing any subset of `init`, `update`
//!   and `post_update`.
//!
//! `update` hooks run with transition smoothing suppressed and see raw
//! targets. `post_update` hooks run after the node's transition step and see
//! the smoothed result.

use std::fmt;

use super::node::{NodeId, SceneTree};
use super::scheduler::Frame;
use crate::error::SchedulerError;

/// Result type returned by behavior hooks.
pub type HookResult = Result<(), SchedulerError>;

/// Boxed update closure.
pub type UpdateFn<T> = Box<dyn FnMut(&mut Frame<'_, T>, NodeId) -> HookResult>;

/// Per-node logic with optional lifecycle hooks.
///
/// Every method has a no-op default, so implementors only write the hooks
/// they need.
pub trait Hooks<T: SceneTree> {
    /// Called once when the behavior is attached to `node`.
    fn init(&mut self, _node: NodeId) {}

    /// Called every frame after the node's ancestors are current.
    fn update(&mut self, _frame: &mut Frame<'_, T>, _node: NodeId) -> HookResult {
        Ok(())
    }

    /// Called every frame after the node's transition step.
    fn post_update(&mut self, _frame: &mut Frame<'_, T>, _node: NodeId) -> HookResult {
        Ok(())
    }
}

/// A behavior attached to a node.
pub enum Behavior<T: SceneTree> {
    /// Update-only shorthand.
    Update(UpdateFn<T>),

    /// A full hook object.
    Hooks(Box<dyn Hooks<T>>),
}

impl<T: SceneTree> Behavior<T> {
    /// Wrap a bare update closure.
    pub fn from_fn<F>(update: F) -> Self
    where
        F: FnMut(&mut Frame<'_, T>, NodeId) -> HookResult + 'static,
    {
        Self::Update(Box::new(update))
    }

    /// Wrap a hook object.
    pub fn new<H>(hooks: H) -> Self
    where
        H: Hooks<T> + 'static,
    {
        Self::Hooks(Box::new(hooks))
    }

    pub(crate) fn init(&mut self, node: NodeId) {
        if let Self::Hooks(hooks) = self {
            hooks.init(node);
        }
    }

    pub(crate) fn update(&mut self, frame: &mut Frame<'_, T>, node: NodeId) -> HookResult {
        match self {
            Self::Update(update) => update(frame, node),
            Self::Hooks(hooks) => hooks.update(frame, node),
        }
    }

    pub(crate) fn post_update(&mut self, frame: &mut Frame<'_, T>, node: NodeId) -> HookResult {
        match self {
            Self::Update(_) => Ok(()),
            Self::Hooks(hooks) => hooks.post_update(frame, node),
        }
    }
}

impl<T: SceneTree> fmt::Debug for Behavior<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Update(_) => f.write_str("Behavior::Update"),
            Self::Hooks(_) => f.write_str("Behavior::Hooks"),
        }
    }
}
