//! Sightline - perception-to-speech assistant pipeline
//!
//! This library provides the core functionality of the Sightline assistant:
//! - A backpressure-respecting detection loop over a live camera feed
//! - Spatial and stability analysis of raw detections
//! - Deduplicated, throttled speech announcements
//! - An auto-restarting voice-command listener
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  Collaborators                        │
//! │  Camera  │  Detector  │  TTS/Playback  │  STT        │
//! └────────────────────┬─────────────────────────────────┘
//!                      │
//! ┌────────────────────▼─────────────────────────────────┐
//! │               Detection loop                          │
//! │  frame-skip │ busy flag │ zones │ stability │ hazard │
//! └────────────────────┬─────────────────────────────────┘
//!                      │ PerceptionState
//! ┌────────────────────▼─────────────────────────────────┐
//! │  Announcements (throttle)  │  Voice commands (STT)   │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod announce;
pub mod commands;
pub mod config;
pub mod error;
pub mod perception;
pub mod pipeline;
pub mod speech;
pub mod vision;

pub use announce::{AnnouncementManager, VoiceMatcher, VoicePreference};
pub use commands::{VoiceCommand, VoiceCommandChannel};
pub use config::Config;
pub use error::{Error, Result};
pub use perception::{
    DetectedObject, HazardDetector, LabelHistory, PerceptionState, Rect, SharedPerception,
    StabilityFilter, SurroundingsSnapshot, Zone, NOTHING,
};
pub use pipeline::{DetectionLoop, Pipeline};
pub use speech::{SpeechOutput, SpeechRecognizer, TranscriptEvent, VoiceInfo};
pub use vision::{Frame, FrameSource, ObjectDetector};
