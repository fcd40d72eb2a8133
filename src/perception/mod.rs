//! Perception analysis
//!
//! Pure analysis over raw per-frame detections: spatial zoning and distance
//! estimation, majority-vote label stabilization, hazard detection, and the
//! shared state both the detection loop and voice channel work against.

mod hazard;
mod spatial;
mod stability;
mod state;

pub use hazard::{HazardDetector, DEFAULT_HAZARD_LABELS};
pub use spatial::{distance_of, zone_of, Zone};
pub use stability::{LabelHistory, StabilityFilter, NOTHING};
pub use state::{
    DetectedObject, PerceptionState, Rect, SharedPerception, SurroundingsSnapshot,
};
