//! Speech collaborators
//!
//! Text-to-speech output and speech-to-text input behind trait seams.
//! The shipped providers use an OpenAI-compatible HTTP API for synthesis
//! and transcription, cpal for the microphone and speakers, and an
//! RMS-energy segmenter to find utterance boundaries.

mod engine;
mod mic;
mod playback;
mod recognizer;
mod segmenter;
mod tts;

pub use engine::SpeechEngine;
pub use mic::MicCapture;
pub use playback::Speaker;
pub use recognizer::MicRecognizer;
pub use segmenter::UtteranceSegmenter;
pub use tts::TextToSpeech;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;

/// Sample rate for microphone capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// A synthesis voice as reported by the TTS provider
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct VoiceInfo {
    /// Voice name (e.g. "alloy")
    pub name: String,
    /// BCP 47 language tag (e.g. "en-US")
    #[serde(default)]
    pub language: String,
}

/// Speech synthesis and playback capability
#[async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Enumerate available voices
    ///
    /// The list may be populated asynchronously by the provider; callers
    /// should tolerate repeated calls returning a growing list.
    ///
    /// # Errors
    ///
    /// Returns error if the provider cannot be reached
    async fn voices(&self) -> Result<Vec<VoiceInfo>>;

    /// Synthesize and play `text`; playback itself is fire-and-forget
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()>;

    /// Cancel any in-flight speech output
    fn cancel(&self);
}

/// Event emitted by a recognition session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// A final recognized utterance
    Transcript(String),
    /// The session ended (error or end-of-stream); carries the reason
    Ended(String),
}

/// Continuous speech recognition capability
///
/// `listen` opens a session that emits events until it ends; the caller
/// owns restart policy. Sessions must be restartable indefinitely.
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Open a recognition session
    ///
    /// # Errors
    ///
    /// Returns error if the session cannot be started (e.g. no microphone)
    async fn listen(&self) -> Result<mpsc::Receiver<TranscriptEvent>>;
}

/// Convert f32 samples to WAV bytes for STT APIs
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| crate::Error::Audio(e.to_string()))?;

        for &sample in samples {
            #[allow(clippy::cast_possible_truncation)]
            let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer
                .write_sample(sample_i16)
                .map_err(|e| crate::Error::Audio(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| crate::Error::Audio(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_to_wav_header() {
        let samples = vec![0.0f32, 0.5, -0.5, 0.25];
        let wav = samples_to_wav(&samples, SAMPLE_RATE).unwrap();

        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert!(wav.len() > 44);
    }
}
