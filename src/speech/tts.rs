//! Text-to-speech synthesis
//!
//! Talks to an OpenAI-compatible speech API. Synthesis returns MP3 bytes;
//! playback lives in [`super::playback`].

use super::VoiceInfo;
use crate::{Error, Result};

/// Synthesizes speech from text via an HTTP speech API
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    speed: f32,
}

impl TextToSpeech {
    /// Create a new TTS instance
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(base_url: String, api_key: String, model: String, speed: f32) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("API key required for TTS".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            speed,
        })
    }

    /// Enumerate voices offered by the provider
    ///
    /// Falls back to the provider's documented built-in voices when the
    /// endpoint does not expose a listing.
    ///
    /// # Errors
    ///
    /// Returns error if the response cannot be decoded
    pub async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        let url = format!("{}/v1/voices", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => {
                let voices: Vec<VoiceInfo> = r.json().await?;
                tracing::debug!(count = voices.len(), "voices listed by provider");
                Ok(voices)
            }
            _ => {
                tracing::debug!("voice listing unavailable, using built-in set");
                Ok(builtin_voices())
            }
        }
    }

    /// Synthesize text to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

/// Voices every OpenAI-compatible endpoint is expected to carry
fn builtin_voices() -> Vec<VoiceInfo> {
    ["alloy", "echo", "fable", "onyx", "nova", "shimmer"]
        .iter()
        .map(|name| VoiceInfo {
            name: (*name).to_string(),
            language: "en-US".to_string(),
        })
        .collect()
}
