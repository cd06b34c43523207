//! Hysteresis Classifier
//!
//! Converts a continuous metric into one of the discrete states of a
//! [`ZoneMap`], debounced in two ways:
//!
//! - **Hysteresis margin.** Once a zone is committed, every zone's bounds are
//!   narrowed by its margin. A value inside the band around a pivot matches
//!   no zone and leaves the committed state alone. The very first
//!   classification uses no margin, so initial placement is exact.
//!
//! - **Commit delay.** A candidate zone different from the committed one
//!   must stay the best match for longer than its delay before it is
//!   committed. Any frame that matches the committed zone again resets the
//!   timer, as does a switch to a different candidate.
//!
//! The classifier keeps the committed state from before the latest update as
//! its previous state, which drives the edge queries ([`changed`],
//! [`changed_to`], [`changed_from`]).
//!
//! [`changed`]: HysteresisClassifier::changed
//! [`changed_to`]: HysteresisClassifier::changed_to
//! [`changed_from`]: HysteresisClassifier::changed_from

use std::fmt;

use tracing::debug;

use super::zone::ZoneMap;
use crate::config::check_non_negative;
use crate::error::{ClassifierError, ConfigError};

/// Source of the scalar being classified, sampled once per update.
pub type Metric = Box<dyn FnMut() -> f64>;

/// A debounced classifier over a [`ZoneMap`].
pub struct HysteresisClassifier {
    zones: ZoneMap,
    metric: Metric,

    /// Margin for zones without their own.
    margin: f64,
    /// Commit delay for zones without their own.
    delay: f64,

    current: Option<usize>,
    previous: Option<usize>,
    pending: Option<usize>,
    pending_time: f64,
    value: Option<f64>,
}

impl HysteresisClassifier {
    /// Create a classifier with zero default margin and delay.
    pub fn new<F>(zones: ZoneMap, metric: F) -> Self
    where
        F: FnMut() -> f64 + 'static,
    {
        Self {
            zones,
            metric: Box::new(metric),
            margin: 0.0,
            delay: 0.0,
            current: None,
            previous: None,
            pending: None,
            pending_time: 0.0,
            value: None,
        }
    }

    /// Set the default hysteresis margin.
    pub fn with_margin(mut self, margin: f64) -> Result<Self, ConfigError> {
        self.margin = check_non_negative("margin", margin)?;
        Ok(self)
    }

    /// Set the default commit delay, in seconds.
    pub fn with_delay(mut self, delay: f64) -> Result<Self, ConfigError> {
        self.delay = check_non_negative("delay", delay)?;
        Ok(self)
    }

    /// The zone map.
    pub fn zones(&self) -> &ZoneMap {
        &self.zones
    }

    /// Sample the metric and advance the state machine by `delta_time`
    /// seconds.
    ///
    /// A negative or non-finite `delta_time` is rejected before the metric
    /// is sampled, leaving all state untouched.
    pub fn update(&mut self, delta_time: f64) -> Result<(), ClassifierError> {
        if !delta_time.is_finite() || delta_time < 0.0 {
            return Err(ClassifierError::InvalidDeltaTime(delta_time));
        }

        let value = (self.metric)();
        if value.is_nan() {
            return Err(ClassifierError::MetricNaN);
        }
        if value.is_infinite() {
            return Err(ClassifierError::MetricInfinite(value));
        }

        self.value = Some(value);
        self.previous = self.current;

        let candidate = match (self.matching_zone(value), self.current) {
            (Some(index), _) => index,
            (None, Some(current)) => current,
            (None, None) => return Err(ClassifierError::Unclassified(value)),
        };

        let Some(current) = self.current else {
            self.commit(candidate, value);
            return Ok(());
        };

        if candidate == current {
            self.pending = None;
            self.pending_time = 0.0;
            return Ok(());
        }

        if self.pending == Some(candidate) {
            self.pending_time += delta_time;
        } else {
            self.pending = Some(candidate);
            self.pending_time = delta_time;
        }

        let delay = self.zones.zones()[candidate].delay.unwrap_or(self.delay);
        if delay <= 0.0 || self.pending_time > delay {
            self.commit(candidate, value);
        }
        Ok(())
    }

    fn matching_zone(&self, value: f64) -> Option<usize> {
        let established = self.current.is_some();
        self.zones.zones().iter().enumerate().find_map(|(index, zone)| {
            let margin = if established {
                zone.margin.unwrap_or(self.margin)
            } else {
                0.0
            };
            let (lower, upper) = self.zones.bounds(index);
            (value >= lower + margin && value <= upper - margin).then_some(index)
        })
    }

    fn commit(&mut self, index: usize, value: f64) {
        debug!(
            from = self.current.map(|i| self.zones.zones()[i].state.as_str()),
            to = %self.zones.zones()[index].state,
            value,
            "classifier state committed"
        );
        self.current = Some(index);
        self.pending = None;
        self.pending_time = 0.0;
    }

    fn name(&self, index: usize) -> &str {
        &self.zones.zones()[index].state
    }

    fn committed(&self) -> Result<usize, ClassifierError> {
        self.current.ok_or(ClassifierError::NotYetClassified)
    }

    /// The committed state.
    pub fn state(&self) -> Result<&str, ClassifierError> {
        self.committed().map(|index| self.name(index))
    }

    /// The committed state before the latest update, if there was one.
    pub fn previous_state(&self) -> Result<Option<&str>, ClassifierError> {
        self.committed()?;
        Ok(self.previous.map(|index| self.name(index)))
    }

    /// The most recent metric sample.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// The zone waiting to be committed and how long it has been waiting.
    pub fn pending(&self) -> Option<(&str, f64)> {
        self.pending.map(|index| (self.name(index), self.pending_time))
    }

    /// Whether the committed state is `state`.
    pub fn is(&self, state: &str) -> Result<bool, ClassifierError> {
        Ok(self.state()? == state)
    }

    /// Whether the state before the latest update was `state`.
    pub fn was(&self, state: &str) -> Result<bool, ClassifierError> {
        Ok(self.previous_state()? == Some(state))
    }

    /// Whether the latest update committed a different state.
    ///
    /// True after the very first update.
    pub fn changed(&self) -> Result<bool, ClassifierError> {
        self.committed()?;
        Ok(self.current != self.previous)
    }

    /// Whether the latest update left `state`.
    pub fn changed_from(&self, state: &str) -> Result<bool, ClassifierError> {
        Ok(self.changed()? && self.was(state)?)
    }

    /// Whether the latest update entered `state`.
    pub fn changed_to(&self, state: &str) -> Result<bool, ClassifierError> {
        Ok(self.changed()? && self.is(state)?)
    }
}

impl fmt::Debug for HysteresisClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HysteresisClassifier")
            .field("state", &self.current.map(|i| self.name(i)))
            .field("previous", &self.previous.map(|i| self.name(i)))
            .field("pending", &self.pending())
            .field("value", &self.value)
            .field("margin", &self.margin)
            .field("delay", &self.delay)
            .finish()
    }
}
