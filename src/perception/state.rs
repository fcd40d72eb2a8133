//! Shared perception state
//!
//! The single source of truth produced by the detection loop and read by
//! the voice command channel. One writer, snapshot-clone readers; the lock
//! is never held across an await point.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use super::spatial::Zone;
use super::stability::NOTHING;

/// Bounding box in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    /// Box width; non-negative
    pub width: f32,
    /// Box height; non-negative
    pub height: f32,
}

impl Rect {
    /// Bottom edge of the box (`y + height`)
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// A single detection produced by one inference call
///
/// Not retained beyond one tick except through the label history.
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
pub struct DetectedObject {
    /// Bounding box in frame coordinates
    #[serde(alias = "box")]
    pub rect: Rect,
    /// Class label (e.g. "person", "car")
    pub label: String,
    /// Detection confidence in [0, 1]
    pub confidence: f32,
}

/// Per-zone sets of distinct visible labels
///
/// Recomputed in full every tick and compared set-wise against the previous
/// snapshot for change detection. Ordered collections keep comparisons and
/// spoken compositions deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurroundingsSnapshot {
    zones: BTreeMap<Zone, BTreeSet<String>>,
}

impl SurroundingsSnapshot {
    /// Create an empty snapshot
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label to a zone's set (duplicates within a zone collapse)
    pub fn insert(&mut self, zone: Zone, label: impl Into<String>) {
        self.zones.entry(zone).or_default().insert(label.into());
    }

    /// Labels visible in a zone, if any
    #[must_use]
    pub fn labels_in(&self, zone: Zone) -> Option<&BTreeSet<String>> {
        self.zones.get(&zone)
    }

    /// Whether no objects are visible anywhere
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.values().all(BTreeSet::is_empty)
    }

    /// Iterate non-empty zones in Left, Center, Right order
    pub fn iter(&self) -> impl Iterator<Item = (Zone, &BTreeSet<String>)> {
        self.zones
            .iter()
            .filter(|(_, labels)| !labels.is_empty())
            .map(|(zone, labels)| (*zone, labels))
    }
}

/// Perception state shared between the detection loop and voice channel
///
/// Created with neutral defaults when the pipeline starts, mutated on every
/// successful detection tick, discarded when the pipeline stops.
#[derive(Debug, Clone)]
pub struct PerceptionState {
    /// Most recent stable label, or the "nothing" sentinel
    pub stable_label: String,
    /// Heuristic distance to the primary object in meters
    pub current_distance: f32,
    /// Labels currently visible per zone
    pub surroundings: SurroundingsSnapshot,
}

impl Default for PerceptionState {
    fn default() -> Self {
        Self {
            stable_label: NOTHING.to_string(),
            current_distance: 0.0,
            surroundings: SurroundingsSnapshot::new(),
        }
    }
}

/// Shared handle to the perception state
///
/// The detection loop is the only writer; the voice channel takes
/// snapshot clones. Reads may observe the most recent completed tick,
/// never a partially applied one.
#[derive(Debug, Clone, Default)]
pub struct SharedPerception {
    inner: Arc<RwLock<PerceptionState>>,
}

impl SharedPerception {
    /// Create a handle with neutral defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the current state
    ///
    /// Falls back to defaults if the lock is poisoned, which only happens
    /// if a writer panicked mid-update.
    #[must_use]
    pub fn snapshot(&self) -> PerceptionState {
        self.inner
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Apply a mutation to the state
    pub fn update(&self, f: impl FnOnce(&mut PerceptionState)) {
        if let Ok(mut state) = self.inner.write() {
            f(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_dedups_within_zone() {
        let mut snap = SurroundingsSnapshot::new();
        snap.insert(Zone::Left, "person");
        snap.insert(Zone::Left, "person");
        snap.insert(Zone::Left, "dog");

        let labels = snap.labels_in(Zone::Left).unwrap();
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_snapshot_equality_is_setwise() {
        let mut a = SurroundingsSnapshot::new();
        a.insert(Zone::Center, "car");
        a.insert(Zone::Center, "person");

        let mut b = SurroundingsSnapshot::new();
        b.insert(Zone::Center, "person");
        b.insert(Zone::Center, "car");

        assert_eq!(a, b);

        b.insert(Zone::Right, "bicycle");
        assert_ne!(a, b);
    }

    #[test]
    fn test_shared_perception_roundtrip() {
        let shared = SharedPerception::new();
        assert_eq!(shared.snapshot().stable_label, NOTHING);

        shared.update(|state| {
            state.stable_label = "person".to_string();
            state.current_distance = 1.25;
        });

        let snap = shared.snapshot();
        assert_eq!(snap.stable_label, "person");
        assert!((snap.current_distance - 1.25).abs() < f32::EPSILON);
    }
}
