//! Error Types
//!
//! Every failure in this crate is a caller contract violation rather than a
//! transient condition, so nothing here is retried. Errors are grouped by the
//! subsystem that raises them.

use thiserror::Error;

use crate::scene::NodeId;

/// Boxed error raised by a behavior hook.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while scheduling a frame.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A frame was started while a previous frame guard is still alive.
    #[error("a frame is already active; end it before starting another")]
    FrameAlreadyActive,

    /// The node is not part of the tree handed to the frame.
    #[error("node {0:?} is not part of the scene tree")]
    UnknownNode(NodeId),

    /// The frame's delta-time is negative or not finite.
    #[error("delta time must be finite and non-negative, got {0}")]
    InvalidDeltaTime(f64),

    /// A behavior hook failed. The frame is aborted.
    #[error("behavior on node {node:?} failed: {source}")]
    Behavior {
        /// Node whose hook failed.
        node: NodeId,
        /// The hook's own error.
        #[source]
        source: BoxError,
    },
}

impl SchedulerError {
    /// Wrap an arbitrary error raised by a hook running on `node`.
    pub fn behavior<E>(node: NodeId, error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Behavior {
            node,
            source: error.into(),
        }
    }
}

/// Errors raised by classifiers at update or query time.
#[derive(Debug, Error, PartialEq)]
pub enum ClassifierError {
    /// The classifier was queried before its first `update`.
    #[error("classifier has not been updated yet")]
    NotYetClassified,

    /// The metric produced NaN.
    #[error("metric produced NaN")]
    MetricNaN,

    /// The metric produced an infinite value.
    #[error("metric produced a non-finite value: {0}")]
    MetricInfinite(f64),

    /// The update's delta-time is negative or not finite.
    #[error("delta time must be finite and non-negative, got {0}")]
    InvalidDeltaTime(f64),

    /// No zone matched and no zone was previously committed. Only reachable
    /// with a malformed zone map.
    #[error("value {0} did not fall in any zone")]
    Unclassified(f64),

    /// A composite query named a member that does not exist.
    #[error("no classifier named `{0}`")]
    UnknownMember(String),
}

/// Errors raised while building or loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The zone map is structurally invalid.
    #[error("invalid zone map: {0}")]
    InvalidZoneMap(String),

    /// A scalar setting is out of range.
    #[error("invalid {field}: {reason}")]
    InvalidSetting {
        /// Name of the offending setting.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A configured classifier has no metric source.
    #[error("no metric supplied for classifier `{0}`")]
    MissingMetric(String),

    /// The configuration could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
