//! Invalidation Groups
//!
//! A group is a named bucket of memos that can be marked dirty together.
//! Invalidation is coarse: the whole group goes dirty at once. Callers that
//! need finer control partition their memos into more groups.
//!
//! Groups hold weak references. A memo dropped by every handle silently
//! leaves all of its groups.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::trace;

use super::memo::{memoize, Invalidate, Memo};

/// A shareable bucket of memos invalidated together.
///
/// Cloning yields another handle to the same bucket.
#[derive(Clone)]
pub struct InvalidationGroup {
    name: Arc<str>,
    members: Arc<Mutex<Vec<Weak<dyn Invalidate>>>>,
}

impl InvalidationGroup {
    /// Create an empty group.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            members: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// The group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add `memo` to this group, pruning members that have been dropped.
    pub fn register<T>(&self, memo: &Memo<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let cell = memo.as_invalidate();
        let mut members = self.members.lock();
        members.retain(|weak| weak.strong_count() > 0);
        members.push(Arc::downgrade(&cell));
    }

    /// Mark every live member dirty. Nothing is recomputed here.
    pub fn invalidate_all(&self) {
        let mut members = self.members.lock();
        members.retain(|weak| match weak.upgrade() {
            Some(cell) => {
                cell.mark_dirty();
                true
            }
            None => false,
        });
        trace!(group = %self.name, members = members.len(), "group invalidated");
    }

    /// Whether no live member is waiting to recompute.
    ///
    /// An empty group is clean.
    pub fn is_clean(&self) -> bool {
        self.members
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .all(|cell| !cell.is_dirty())
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.members
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Whether the group has no live members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for InvalidationGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationGroup")
            .field("name", &self.name)
            .field("members", &self.len())
            .finish()
    }
}

/// A set of named invalidation groups.
///
/// Groups are created on first use.
#[derive(Debug, Default)]
pub struct InvalidationCache {
    groups: IndexMap<String, InvalidationGroup>,
}

impl InvalidationCache {
    /// Create a cache with no groups.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle to the group called `name`, creating it if needed.
    pub fn group(&mut self, name: &str) -> InvalidationGroup {
        self.groups
            .entry(name.to_owned())
            .or_insert_with(|| InvalidationGroup::new(name))
            .clone()
    }

    /// Create a memo registered in each of the named groups.
    pub fn memoize<T, F>(&mut self, producer: F, groups: &[&str]) -> Memo<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let handles: Vec<InvalidationGroup> = groups.iter().map(|name| self.group(name)).collect();
        let refs: Vec<&InvalidationGroup> = handles.iter().collect();
        memoize(producer, &refs)
    }

    /// Invalidate the named group. Returns `false` if no such group exists.
    pub fn invalidate(&self, name: &str) -> bool {
        match self.groups.get(name) {
            Some(group) => {
                group.invalidate_all();
                true
            }
            None => false,
        }
    }

    /// Invalidate every group.
    pub fn invalidate_everything(&self) {
        for group in self.groups.values() {
            group.invalidate_all();
        }
    }

    /// Whether the named group is clean, or `None` if it does not exist.
    pub fn is_clean(&self, name: &str) -> Option<bool> {
        self.groups.get(name).map(InvalidationGroup::is_clean)
    }

    /// Names of all groups, in creation order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}
