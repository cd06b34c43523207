//! Scene Scheduling
//!
//! This module implements parent-first, at-most-once-per-frame evaluation of
//! behaviors attached to nodes of an externally owned tree.
//!
//! # Overview
//!
//! - [`SceneTree`] is the adapter boundary: parent lookup, child
//!   enumeration, subtree world refresh and per-node transition stepping.
//! - [`Behavior`] is a unit of per-node logic with `init`, `update` and
//!   `post_update` hooks.
//! - [`UpdateScheduler`] owns behaviors and per-node bookkeeping in a side
//!   table keyed by [`NodeId`], so the external tree is never annotated.
//! - [`Frame`] is the explicit context of one pass. Dependency pulls go
//!   through [`Frame::ensure_update`], which therefore cannot be called
//!   outside a frame.
//!
//! [`SceneGraph`] is a small in-memory tree implementing the adapter.

mod behavior;
mod graph;
mod node;
mod scheduler;

pub use behavior::{Behavior, HookResult, Hooks, UpdateFn};
pub use graph::{SceneGraph, Transition};
pub use node::{NodeId, SceneTree};
pub use scheduler::{Frame, FrameStats, UpdateScheduler};
