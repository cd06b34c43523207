//! Cadence Core
//!
//! This crate provides the per-frame update engine for hierarchical scenes
//! whose nodes carry behaviors. It implements:
//!
//! - A lazy, memoized, parent-first update scheduler
//! - Invalidation caches for derived per-frame metrics
//! - Hysteresis classifiers that turn those metrics into debounced states
//!
//! The scheduler decides *when* a behavior may safely run. It never decides
//! what a behavior computes, and it knows nothing about rendering: it talks
//! to the scene through the [`scene::SceneTree`] adapter trait.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `scene`: Node handles, the tree adapter, behaviors and the scheduler
//! - `cache`: Memoized values and invalidation groups
//! - `classify`: Zone maps, hysteresis classifiers and composites
//! - `config`: JSON configuration for classifiers
//!
//! # Example
//!
//! ```rust,ignore
//! use cadence_core::scene::{SceneGraph, Transition, UpdateScheduler};
//!
//! let mut graph = SceneGraph::new();
//! let root = graph.add_root(Transition::new(0.0));
//! let camera = graph.add_child(root, Transition::new(5.0))?;
//! let label = graph.add_child(root, Transition::with_rate(0.0, 4.0))?;
//!
//! let mut scheduler = UpdateScheduler::new();
//! scheduler.on_update(label, move |frame, node| {
//!     // Pull the camera current before reading it
//!     frame.ensure_update(camera)?;
//!     let target = frame.tree().world(camera).unwrap_or_default();
//!     frame.tree_mut().set_target(node, target)
//! });
//!
//! scheduler.update(&mut graph, root, camera, 1.0 / 60.0)?;
//! ```

pub mod cache;
pub mod classify;
pub mod config;
pub mod error;
pub mod scene;

pub use cache::{memoize, InvalidationCache, InvalidationGroup, Memo};
pub use classify::{CompositeClassifier, HysteresisClassifier, Zone, ZoneMap};
pub use config::{ClassifierConfig, CompositeConfig};
pub use error::{ClassifierError, ConfigError, SchedulerError};
pub use scene::{Behavior, Frame, Hooks, NodeId, SceneGraph, SceneTree, UpdateScheduler};
