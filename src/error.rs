//! Error types for the Sightline pipeline

use thiserror::Error;

/// Result type alias for Sightline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Sightline pipeline
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Camera capture error (permission denied, device unavailable)
    #[error("capture error: {0}")]
    Capture(String),

    /// Object detection / inference error
    #[error("inference error: {0}")]
    Inference(String),

    /// Audio device error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Voice command channel error
    #[error("voice error: {0}")]
    Voice(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
