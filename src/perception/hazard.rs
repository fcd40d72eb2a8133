//! Hazard detection
//!
//! Flags a specific geometric pattern in the raw detections: a vehicle-class
//! object centered ahead and occupying the lower part of the frame. The
//! predicate is stateless per tick; repeated alerts across ticks are left to
//! the announcement throttle.

use super::spatial::{zone_of, Zone};
use super::state::DetectedObject;

/// Fraction of frame height below which a box bottom counts as ground-level
const GROUND_LEVEL_RATIO: f32 = 0.7;

/// Default hazard vocabulary (vehicle-class labels)
pub const DEFAULT_HAZARD_LABELS: &[&str] = &["car", "truck", "bus", "motorcycle", "bicycle"];

/// Stateless hazard predicate over a tick's raw detections
#[derive(Debug, Clone)]
pub struct HazardDetector {
    labels: Vec<String>,
}

impl HazardDetector {
    /// Create a detector with a custom hazard vocabulary
    #[must_use]
    pub fn new(labels: Vec<String>) -> Self {
        let labels = labels.into_iter().map(|l| l.to_lowercase()).collect();
        Self { labels }
    }

    /// Whether any detection matches the hazard pattern
    ///
    /// True iff a detection with a hazard-vocabulary label is zoned
    /// `Center` and has its bottom edge below 70% of the frame height.
    #[must_use]
    pub fn check(&self, detections: &[DetectedObject], frame_width: f32, frame_height: f32) -> bool {
        detections.iter().any(|d| {
            self.labels.iter().any(|l| l == &d.label.to_lowercase())
                && zone_of(&d.rect, frame_width) == Zone::Center
                && d.rect.bottom() > frame_height * GROUND_LEVEL_RATIO
        })
    }
}

impl Default for HazardDetector {
    fn default() -> Self {
        Self::new(DEFAULT_HAZARD_LABELS.iter().map(ToString::to_string).collect())
    }
}
