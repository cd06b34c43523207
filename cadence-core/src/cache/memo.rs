//! Memo Implementation
//!
//! A Memo is a lazily computed, cached value with a dirty flag.
//!
//! # How Memos Work
//!
//! 1. A new memo starts dirty and holds no value. Its producer does not run.
//!
//! 2. Reading a dirty memo runs the producer exactly once, caches the result
//!    and clears the flag.
//!
//! 3. Reading a clean memo returns the cached value without running the
//!    producer.
//!
//! 4. Invalidation only sets the flag. Recomputation waits for the next read.
//!
//! The cached value is valid if and only if the memo is clean.
//!
//! # Sharing
//!
//! Cloning a memo yields another handle to the same cell. Groups hold weak
//! references, so a cell lives exactly as long as its last handle.

use std::fmt::{self, Debug};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::group::InvalidationGroup;

/// Counter for generating unique memo IDs.
static MEMO_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_memo_id() -> u64 {
    MEMO_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Something a group can mark dirty.
pub(crate) trait Invalidate: Send + Sync {
    fn mark_dirty(&self);
    fn is_dirty(&self) -> bool;
}

struct CellState<T> {
    value: Option<T>,
    dirty: bool,
    /// Bumped on every invalidation so a read racing an invalidation does
    /// not clear the flag.
    generation: u64,
}

struct MemoCell<T> {
    id: u64,
    producer: Box<dyn Fn() -> T + Send + Sync>,
    state: RwLock<CellState<T>>,
}

impl<T> Invalidate for MemoCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn mark_dirty(&self) {
        let mut state = self.state.write();
        state.dirty = true;
        state.generation = state.generation.wrapping_add(1);
    }

    fn is_dirty(&self) -> bool {
        self.state.read().dirty
    }
}

/// A lazily computed cached value.
///
/// Create one with [`memoize`] or
/// [`InvalidationCache::memoize`](super::InvalidationCache::memoize).
pub struct Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: Arc<MemoCell<T>>,
}

impl<T> Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a standalone memo that belongs to no group.
    pub fn new<F>(producer: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self {
            cell: Arc::new(MemoCell {
                id: next_memo_id(),
                producer: Box::new(producer),
                state: RwLock::new(CellState {
                    value: None,
                    dirty: true,
                    generation: 0,
                }),
            }),
        }
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> u64 {
        self.cell.id
    }

    /// Get the current value, running the producer first if dirty.
    pub fn get(&self) -> T {
        let generation = {
            let state = self.cell.state.read();
            if let (false, Some(value)) = (state.dirty, state.value.as_ref()) {
                return value.clone();
            }
            state.generation
        };

        trace!(memo = self.cell.id, "recomputing memo");
        let value = (self.cell.producer)();

        let mut state = self.cell.state.write();
        state.value = Some(value.clone());
        if state.generation == generation {
            state.dirty = false;
        }
        value
    }

    /// Mark the memo dirty. The producer runs on the next read.
    pub fn mark_dirty(&self) {
        self.cell.mark_dirty();
    }

    /// Whether the next read will run the producer.
    pub fn is_dirty(&self) -> bool {
        self.cell.is_dirty()
    }

    /// Whether a value has ever been produced.
    pub fn has_value(&self) -> bool {
        self.cell.state.read().value.is_some()
    }

    pub(crate) fn as_invalidate(&self) -> Arc<dyn Invalidate> {
        self.cell.clone()
    }
}

impl<T> Clone for Memo<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Clone + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cell.state.read();
        f.debug_struct("Memo")
            .field("id", &self.cell.id)
            .field("dirty", &state.dirty)
            .field("value", &state.value)
            .finish()
    }
}

/// Create a memo and register it in every group in `groups`.
///
/// Invalidating any one of those groups marks the memo dirty.
///
/// The producer must be `Send + Sync` because memo cells are shared through
/// `Arc` and groups may invalidate them from any thread. Single-threaded
/// state captured by a producer has to live behind `Arc` and a lock rather
/// than `Rc`.
pub fn memoize<T, F>(producer: F, groups: &[&InvalidationGroup]) -> Memo<T>
where
    T: Clone + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let memo = Memo::new(producer);
    for group in groups {
        group.register(&memo);
    }
    memo
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
