//! Zones and Zone Maps
//!
//! A zone map partitions the real line into named zones separated by pivots.
//! It is written as an alternating sequence that starts and ends with a zone:
//!
//! ```text
//! [low] 0.0 [mid] 10.0 [high]
//! ```
//!
//! The first zone has no lower bound and the last zone has no upper bound.
//! In JSON the same map is `[{"state": "low"}, 0, {"state": "mid"}, 10,
//! {"state": "high"}]`.

use serde::{Deserialize, Serialize};

use crate::config::check_non_negative;
use crate::error::ConfigError;

/// A named discrete state with optional per-zone overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Zone {
    /// Name reported by the classifier while this zone is committed.
    pub state: String,

    /// Hysteresis margin applied to this zone's bounds. Falls back to the
    /// classifier's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,

    /// Seconds this zone must remain the best match before it is committed.
    /// Falls back to the classifier's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl Zone {
    /// Create a zone with no overrides.
    pub fn new(state: impl Into<String>) -> Self {
        Self {
            state: state.into(),
            margin: None,
            delay: None,
        }
    }

    /// Override the hysteresis margin.
    pub fn with_margin(mut self, margin: f64) -> Self {
        self.margin = Some(margin);
        self
    }

    /// Override the commit delay.
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// One element of the alternating zone-map sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneMapEntry {
    /// A boundary between two zones.
    Pivot(f64),
    /// A zone.
    Zone(Zone),
}

impl From<Zone> for ZoneMapEntry {
    fn from(zone: Zone) -> Self {
        Self::Zone(zone)
    }
}

impl From<f64> for ZoneMapEntry {
    fn from(pivot: f64) -> Self {
        Self::Pivot(pivot)
    }
}

/// A validated partition of the real line into zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ZoneMapEntry>", into = "Vec<ZoneMapEntry>")]
pub struct ZoneMap {
    zones: Vec<Zone>,
    /// `pivots[i]` separates `zones[i]` from `zones[i + 1]`.
    pivots: Vec<f64>,
}

impl ZoneMap {
    /// Build a zone map from the alternating sequence.
    ///
    /// The sequence must start and end with a zone, alternate zones and
    /// pivots, use finite non-decreasing pivots, non-negative overrides and
    /// unique state names.
    pub fn new(entries: Vec<ZoneMapEntry>) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::InvalidZoneMap("zone map is empty".into()));
        }
        if entries.len() % 2 == 0 {
            return Err(ConfigError::InvalidZoneMap(
                "zone map must start and end with a zone".into(),
            ));
        }

        let mut zones = Vec::with_capacity(entries.len() / 2 + 1);
        let mut pivots = Vec::with_capacity(entries.len() / 2);

        for (position, entry) in entries.into_iter().enumerate() {
            let expects_zone = position % 2 == 0;
            match (expects_zone, entry) {
                (true, ZoneMapEntry::Zone(zone)) => {
                    if zones.iter().any(|z: &Zone| z.state == zone.state) {
                        return Err(ConfigError::InvalidZoneMap(format!(
                            "duplicate state `{}`",
                            zone.state
                        )));
                    }
                    if let Some(margin) = zone.margin {
                        check_non_negative("zone margin", margin)?;
                    }
                    if let Some(delay) = zone.delay {
                        check_non_negative("zone delay", delay)?;
                    }
                    zones.push(zone);
                }
                (false, ZoneMapEntry::Pivot(pivot)) => {
                    if !pivot.is_finite() {
                        return Err(ConfigError::InvalidZoneMap(format!(
                            "pivot at position {position} is not finite"
                        )));
                    }
                    if pivots.last().is_some_and(|&last| pivot < last) {
                        return Err(ConfigError::InvalidZoneMap(format!(
                            "pivot {pivot} at position {position} is smaller than the one before it"
                        )));
                    }
                    pivots.push(pivot);
                }
                (true, ZoneMapEntry::Pivot(pivot)) => {
                    return Err(ConfigError::InvalidZoneMap(format!(
                        "expected a zone at position {position}, found pivot {pivot}"
                    )));
                }
                (false, ZoneMapEntry::Zone(zone)) => {
                    return Err(ConfigError::InvalidZoneMap(format!(
                        "expected a pivot at position {position}, found zone `{}`",
                        zone.state
                    )));
                }
            }
        }

        Ok(Self { zones, pivots })
    }

    /// Start building a zone map from its lowest zone.
    pub fn starting_with(zone: Zone) -> ZoneMapBuilder {
        ZoneMapBuilder {
            entries: vec![ZoneMapEntry::Zone(zone)],
        }
    }

    /// Zones in ascending order.
    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Pivots in ascending order.
    pub fn pivots(&self) -> &[f64] {
        &self.pivots
    }

    /// Number of zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Always `false`; a valid map has at least one zone.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Index of the zone named `state`.
    pub fn position(&self, state: &str) -> Option<usize> {
        self.zones.iter().position(|z| z.state == state)
    }

    /// Unwidened `(lower, upper)` bounds of zone `index`.
    pub fn bounds(&self, index: usize) -> (f64, f64) {
        let lower = index
            .checked_sub(1)
            .and_then(|i| self.pivots.get(i))
            .copied()
            .unwrap_or(f64::NEG_INFINITY);
        let upper = self.pivots.get(index).copied().unwrap_or(f64::INFINITY);
        (lower, upper)
    }
}

impl TryFrom<Vec<ZoneMapEntry>> for ZoneMap {
    type Error = ConfigError;

    fn try_from(entries: Vec<ZoneMapEntry>) -> Result<Self, Self::Error> {
        Self::new(entries)
    }
}

impl From<ZoneMap> for Vec<ZoneMapEntry> {
    fn from(map: ZoneMap) -> Self {
        let mut entries = Vec::with_capacity((map.zones.len() * 2).saturating_sub(1));
        let mut pivots = map.pivots.into_iter();
        for zone in map.zones {
            if !entries.is_empty() {
                if let Some(pivot) = pivots.next() {
                    entries.push(ZoneMapEntry::Pivot(pivot));
                }
            }
            entries.push(ZoneMapEntry::Zone(zone));
        }
        entries
    }
}

/// Fluent construction of a [`ZoneMap`].
#[derive(Debug, Clone)]
pub struct ZoneMapBuilder {
    entries: Vec<ZoneMapEntry>,
}

impl ZoneMapBuilder {
    /// Append a pivot and the zone above it.
    pub fn then(mut self, pivot: f64, zone: Zone) -> Self {
        self.entries.push(ZoneMapEntry::Pivot(pivot));
        self.entries.push(ZoneMapEntry::Zone(zone));
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<ZoneMap, ConfigError> {
        ZoneMap::new(self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_zones() -> ZoneMap {
        ZoneMap::starting_with(Zone::new("low"))
            .then(0.0, Zone::new("mid"))
            .then(10.0, Zone::new("high"))
            .build()
            .unwrap()
    }

    #[test]
    fn bounds_are_open_at_the_ends() {
        let map = three_zones();
        assert_eq!(map.len(), 3);
        assert_eq!(map.bounds(0), (f64::NEG_INFINITY, 0.0));
        assert_eq!(map.bounds(1), (0.0, 10.0));
        assert_eq!(map.bounds(2), (10.0, f64::INFINITY));
        assert_eq!(map.position("mid"), Some(1));
        assert_eq!(map.position("nope"), None);
    }

    #[test]
    fn single_zone_is_valid() {
        let map = ZoneMap::new(vec![Zone::new("only").into()]).unwrap();
        assert_eq!(map.bounds(0), (f64::NEG_INFINITY, f64::INFINITY));
    }

    #[test]
    fn must_start_and_end_with_zone() {
        let err = ZoneMap::new(vec![ZoneMapEntry::Pivot(0.0), Zone::new("a").into(), ZoneMapEntry::Pivot(1.0)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidZoneMap(_)));

        let err = ZoneMap::new(vec![Zone::new("a").into(), ZoneMapEntry::Pivot(1.0)]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidZoneMap(_)));

        let err = ZoneMap::new(Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidZoneMap(_)));
    }

    #[test]
    fn rejects_broken_alternation_and_bad_pivots() {
        let err = ZoneMap::new(vec![
            Zone::new("a").into(),
            Zone::new("b").into(),
            Zone::new("c").into(),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("expected a pivot"));

        let err = ZoneMap::starting_with(Zone::new("a"))
            .then(5.0, Zone::new("b"))
            .then(1.0, Zone::new("c"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("smaller"));

        let err = ZoneMap::starting_with(Zone::new("a"))
            .then(f64::NAN, Zone::new("b"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not finite"));
    }

    #[test]
    fn rejects_duplicates_and_negative_overrides() {
        let err = ZoneMap::starting_with(Zone::new("a"))
            .then(1.0, Zone::new("a"))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("duplicate"));

        let err = ZoneMap::starting_with(Zone::new("a").with_delay(-1.0))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSetting { .. }));
    }

    #[test]
    fn parses_alternating_json() {
        let map: ZoneMap = serde_json::from_str(
            r#"[{"state": "low"}, 0, {"state": "mid", "margin": 0.5}, 10, {"state": "high", "delay": 2}]"#,
        )
        .unwrap();
        assert_eq!(map.pivots(), &[0.0, 10.0]);
        assert_eq!(map.zones()[1].margin, Some(0.5));
        assert_eq!(map.zones()[2].delay, Some(2.0));

        let json = serde_json::to_string(&map).unwrap();
        assert!(json.starts_with(r#"[{"state":"low"},0.0,{"state":"mid""#));
    }

    #[test]
    fn json_without_trailing_zone_is_rejected() {
        let result: Result<ZoneMap, _> = serde_json::from_str(r#"[{"state": "low"}, 0]"#);
        assert!(result.is_err());
    }
}
