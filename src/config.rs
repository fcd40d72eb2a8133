//! Configuration for the Sightline pipeline
//!
//! Loaded from a TOML file in the XDG config directory, with environment
//! overrides for secrets. Tuning values are named options with defaults
//! matching the pipeline's design, not hard-coded literals.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::perception::DEFAULT_HAZARD_LABELS;
use crate::{Error, Result};

/// Sightline configuration
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Perception tuning
    pub perception: PerceptionConfig,

    /// Speech synthesis and recognition
    pub speech: SpeechConfig,

    /// Camera and detector endpoints
    pub services: ServicesConfig,
}

/// Detection loop and analysis tuning
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct PerceptionConfig {
    /// Milliseconds between tick opportunities
    pub tick_interval_ms: u64,

    /// Frame-skip factor K: only 1 of every K ticks runs inference
    pub frame_skip: u32,

    /// Label history capacity
    pub history_len: usize,

    /// Fraction of the history a label needs to be stable
    pub majority_ratio: f32,

    /// Detections at or below this confidence are discarded
    pub confidence_threshold: f32,

    /// Minimum milliseconds between spoken announcements
    pub min_announce_interval_ms: u64,

    /// Labels considered hazards when centered and ground-level
    pub hazard_labels: Vec<String>,
}

impl Default for PerceptionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            frame_skip: 2,
            history_len: 7,
            majority_ratio: 0.45,
            confidence_threshold: 0.4,
            min_announce_interval_ms: 2500,
            hazard_labels: DEFAULT_HAZARD_LABELS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl PerceptionConfig {
    /// Minimum announcement interval as a [`Duration`]
    #[must_use]
    pub const fn min_announce_interval(&self) -> Duration {
        Duration::from_millis(self.min_announce_interval_ms)
    }

    /// Tick interval as a [`Duration`]
    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Speech provider settings
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Base URL of the OpenAI-compatible speech API
    pub api_base_url: String,

    /// API key; overridden by `SIGHTLINE_SPEECH_API_KEY`
    pub api_key: String,

    /// TTS model identifier
    pub tts_model: String,

    /// TTS speed multiplier
    pub tts_speed: f32,

    /// STT model identifier
    pub stt_model: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.openai.com".to_string(),
            api_key: String::new(),
            tts_model: "tts-1".to_string(),
            tts_speed: 1.0,
            stt_model: "whisper-1".to_string(),
        }
    }
}

/// Camera and inference endpoints
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// HTTP snapshot endpoint of the camera
    pub camera_url: String,

    /// Milliseconds between camera snapshot polls
    pub camera_poll_ms: u64,

    /// Detection inference endpoint
    pub detector_url: String,

    /// Optional detector API key; overridden by `SIGHTLINE_DETECTOR_API_KEY`
    pub detector_api_key: Option<String>,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            camera_url: "http://127.0.0.1:8080/frame.jpg".to_string(),
            camera_poll_ms: 100,
            detector_url: "http://127.0.0.1:8081/v1/detect".to_string(),
            detector_api_key: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// Missing file means defaults; a present but invalid file is an error.
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path())
    }

    /// Load configuration from an explicit path
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&raw)?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            config
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides for secrets
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("SIGHTLINE_SPEECH_API_KEY") {
            self.speech.api_key = key;
        }
        if let Ok(key) = std::env::var("SIGHTLINE_DETECTOR_API_KEY") {
            self.services.detector_api_key = Some(key);
        }
    }

    /// Reject configurations the pipeline cannot run with
    fn validate(&self) -> Result<()> {
        let p = &self.perception;
        if p.frame_skip == 0 {
            return Err(Error::Config("perception.frame_skip must be >= 1".to_string()));
        }
        if p.history_len == 0 {
            return Err(Error::Config("perception.history_len must be >= 1".to_string()));
        }
        if !(0.0..=1.0).contains(&p.majority_ratio) {
            return Err(Error::Config(
                "perception.majority_ratio must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&p.confidence_threshold) {
            return Err(Error::Config(
                "perception.confidence_threshold must be in [0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

/// Default config file path (`~/.config/omni/sightline/config.toml` on Linux)
#[must_use]
pub fn default_config_path() -> PathBuf {
    directories::ProjectDirs::from("dev", "omni", "sightline").map_or_else(
        || PathBuf::from("sightline.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.perception.frame_skip, 2);
        assert_eq!(config.perception.history_len, 7);
        assert_eq!(
            config.perception.min_announce_interval(),
            Duration::from_millis(2500)
        );
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [perception]
            frame_skip = 3
            majority_ratio = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.perception.frame_skip, 3);
        assert!((config.perception.majority_ratio - 0.5).abs() < f32::EPSILON);
        // Untouched fields keep defaults
        assert_eq!(config.perception.history_len, 7);
        assert_eq!(config.speech.tts_model, "tts-1");
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = Config::default();
        config.perception.frame_skip = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.perception.majority_ratio = 1.5;
        assert!(config.validate().is_err());
    }
}
