//! State Classification
//!
//! Turns continuous per-frame signals into discrete, debounced states.
//!
//! - [`ZoneMap`] describes the states and the pivots between them.
//! - [`HysteresisClassifier`] samples a [`Metric`] each update and commits a
//!   zone only after the value clears a hysteresis margin and, optionally,
//!   stays put for a commit delay.
//! - [`CompositeClassifier`] combines several classifiers under names and
//!   answers AND-composed, edge-triggered transition queries.

mod classifier;
mod composite;
mod zone;

pub use classifier::{HysteresisClassifier, Metric};
pub use composite::CompositeClassifier;
pub use zone::{Zone, ZoneMap, ZoneMapBuilder, ZoneMapEntry};
