//! Classifier Configuration
//!
//! Classifiers can be described in JSON and instantiated once their metric
//! sources are known. A single classifier looks like:
//!
//! ```json
//! {
//!   "zones": [{"state": "near"}, 2.5, {"state": "far", "delay": 0.3}],
//!   "margin": 0.1,
//!   "delay": 0.0
//! }
//! ```
//!
//! A composite is an object mapping member names to such entries. Members
//! keep the order in which they appear.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::{CompositeClassifier, HysteresisClassifier, Metric, ZoneMap};
use crate::error::ConfigError;

/// Reject negative or non-finite settings.
pub(crate) fn check_non_negative(field: &'static str, value: f64) -> Result<f64, ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::InvalidSetting {
            field,
            reason: format!("must be a finite non-negative number, got {value}"),
        });
    }
    Ok(value)
}

/// Configuration of one [`HysteresisClassifier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// The zones to classify into.
    pub zones: ZoneMap,

    /// Default hysteresis margin.
    #[serde(default)]
    pub margin: f64,

    /// Default commit delay, in seconds.
    #[serde(default)]
    pub delay: f64,
}

impl ClassifierConfig {
    /// Configuration with zero margin and delay.
    pub fn new(zones: ZoneMap) -> Self {
        Self {
            zones,
            margin: 0.0,
            delay: 0.0,
        }
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the scalar settings. The zone map validates itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_non_negative("margin", self.margin)?;
        check_non_negative("delay", self.delay)?;
        Ok(())
    }

    /// Instantiate a classifier sampling `metric`.
    pub fn build<F>(self, metric: F) -> Result<HysteresisClassifier, ConfigError>
    where
        F: FnMut() -> f64 + 'static,
    {
        HysteresisClassifier::new(self.zones, metric)
            .with_margin(self.margin)?
            .with_delay(self.delay)
    }
}

/// Configuration of a [`CompositeClassifier`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeConfig {
    /// Member configurations, by name.
    pub members: IndexMap<String, ClassifierConfig>,
}

impl CompositeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        for member in config.members.values() {
            member.validate()?;
        }
        Ok(config)
    }

    /// Instantiate every member, asking `metrics` for each member's source.
    pub fn build<M>(self, mut metrics: M) -> Result<CompositeClassifier, ConfigError>
    where
        M: FnMut(&str) -> Option<Metric>,
    {
        let mut composite = CompositeClassifier::new();
        for (key, config) in self.members {
            let metric = metrics(&key).ok_or_else(|| ConfigError::MissingMetric(key.clone()))?;
            let classifier = config.build(metric)?;
            composite.insert(key, classifier);
        }
        Ok(composite)
    }
}
