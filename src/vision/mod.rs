//! Vision collaborators
//!
//! Camera frame acquisition and object-detection inference, behind trait
//! seams so the pipeline can be driven by mocks in tests. The shipped
//! providers talk to an IP-camera snapshot endpoint and a detection
//! inference HTTP service.

mod capture;
mod detector;

pub use capture::SnapshotCamera;
pub use detector::HttpDetector;

use async_trait::async_trait;

use crate::Result;

/// A single captured camera frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image bytes (JPEG)
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: f32,
    /// Frame height in pixels
    pub height: f32,
}

/// Source of camera frames
///
/// `start` may fail with permission or device errors; once capturing, the
/// latest frame is available through `current_frame`. Stop is idempotent.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Begin capturing frames
    ///
    /// # Errors
    ///
    /// Returns error if the capture device is unavailable or permission
    /// is denied
    async fn start(&self) -> Result<()>;

    /// Stop capturing and release the device; safe to call repeatedly
    fn stop(&self);

    /// Most recently captured frame, if any
    fn current_frame(&self) -> Option<Frame>;

    /// Whether capture is currently running
    fn is_capturing(&self) -> bool;
}

/// Object-detection inference capability
///
/// Assumed stateless between calls aside from internal warm-up; must be
/// callable repeatedly.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    /// Run inference on a frame
    ///
    /// # Errors
    ///
    /// Returns error if inference fails; per-tick failures are non-fatal
    /// to the detection loop
    async fn detect(&self, frame: &Frame) -> Result<Vec<crate::perception::DetectedObject>>;
}
