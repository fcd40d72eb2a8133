//! Spatial analysis of bounding boxes
//!
//! Maps a detection's bounding box to a horizontal zone and a heuristic
//! distance. The distance is a monotone approximation (larger apparent
//! height means closer), not a calibrated measurement.

use super::state::Rect;

/// Distance floor in meters; nothing is ever reported closer than this
const MIN_DISTANCE: f32 = 0.5;

/// Horizontal region of the camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Zone {
    /// Left third of the frame
    Left,
    /// Center third of the frame
    Center,
    /// Right third of the frame
    Right,
}

impl Zone {
    /// Human-readable phrase for spoken descriptions
    #[must_use]
    pub const fn as_phrase(self) -> &'static str {
        match self {
            Self::Left => "on your left",
            Self::Center => "ahead of you",
            Self::Right => "on your right",
        }
    }
}

/// Classify a bounding box into a zone by its horizontal center
///
/// The frame width is partitioned into three equal thirds. Boxes whose
/// center falls exactly on a boundary are assigned to `Center`.
#[must_use]
pub fn zone_of(rect: &Rect, frame_width: f32) -> Zone {
    let x_center = rect.width.mul_add(0.5, rect.x);
    let third = frame_width / 3.0;

    if x_center < third {
        Zone::Left
    } else if x_center > 2.0 * third {
        Zone::Right
    } else {
        Zone::Center
    }
}

/// Estimate distance in meters from apparent height
///
/// `distance = max(0.5, 5 - height_ratio * 6)` where `height_ratio` is the
/// box height relative to the frame. Monotonically non-increasing in the
/// ratio, floored at 0.5.
#[must_use]
pub fn distance_of(rect: &Rect, frame_height: f32) -> f32 {
    let height_ratio = rect.height / frame_height;
    (height_ratio.mul_add(-6.0, 5.0)).max(MIN_DISTANCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32, y: f32, width: f32, height: f32) -> Rect {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_zone_partition() {
        let width = 640.0;

        // Sweep box centers across the frame; every position gets a zone
        // and the zones appear in order Left, Center, Right.
        let mut seen = Vec::new();
        for x in 0..640 {
            let z = zone_of(&rect(x as f32, 0.0, 0.0, 10.0), width);
            if seen.last() != Some(&z) {
                seen.push(z);
            }
        }
        assert_eq!(seen, vec![Zone::Left, Zone::Center, Zone::Right]);
    }

    #[test]
    fn test_zone_boundaries() {
        let width = 600.0;

        assert_eq!(zone_of(&rect(199.0, 0.0, 0.0, 10.0), width), Zone::Left);
        // Exactly on the first boundary: not strictly less than a third
        assert_eq!(zone_of(&rect(200.0, 0.0, 0.0, 10.0), width), Zone::Center);
        // Exactly on the second boundary: not strictly greater than two thirds
        assert_eq!(zone_of(&rect(400.0, 0.0, 0.0, 10.0), width), Zone::Center);
        assert_eq!(zone_of(&rect(401.0, 0.0, 0.0, 10.0), width), Zone::Right);
    }

    #[test]
    fn test_zone_uses_box_center() {
        // Box starts in the left third but its center is in the right third
        let r = rect(400.0, 100.0, 100.0, 300.0);
        assert_eq!(zone_of(&r, 640.0), Zone::Right);
    }

    #[test]
    fn test_distance_example() {
        // height_ratio = 300/480 = 0.625 -> 5 - 3.75 = 1.25
        let r = rect(400.0, 100.0, 100.0, 300.0);
        let d = distance_of(&r, 480.0);
        assert!((d - 1.25).abs() < 1e-6);
    }

    #[test]
    fn test_distance_floor() {
        // A box filling the whole frame would go negative without the floor
        let r = rect(0.0, 0.0, 640.0, 480.0);
        assert!((distance_of(&r, 480.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_distance_monotone() {
        let mut last = f32::INFINITY;
        for h in 0..=480 {
            let d = distance_of(&rect(0.0, 0.0, 10.0, h as f32), 480.0);
            assert!(d <= last, "distance must not increase with height");
            assert!(d >= 0.5);
            last = d;
        }
    }
}
