//! Invalidation Cache
//!
//! Lazily recomputed, memoized values with coarse, group-wide invalidation.
//!
//! # Concepts
//!
//! ## Memos
//!
//! A [`Memo`] caches the result of a producer closure. It starts dirty, runs
//! its producer on the first read, and returns the cached value until it is
//! marked dirty again.
//!
//! ## Groups
//!
//! An [`InvalidationGroup`] fans one invalidation out to many memos. A memo
//! may belong to several groups, so independent triggers (a transform change,
//! a camera move) can each invalidate the same derived metric.
//!
//! [`InvalidationCache`] keeps groups by name for callers that prefer string
//! keys over passing group handles around.

mod group;
mod memo;

pub use group::{InvalidationCache, InvalidationGroup};
pub use memo::{memoize, Memo};
