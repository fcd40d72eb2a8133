//! Combined synthesis + playback engine
//!
//! Implements [`SpeechOutput`] by synthesizing through [`TextToSpeech`]
//! and playing the result on a [`Speaker`]. Playback runs on a blocking
//! task so callers never wait for audio to finish.

use std::sync::Arc;

use async_trait::async_trait;

use super::{Speaker, SpeechOutput, TextToSpeech, VoiceInfo};
use crate::Result;

/// Default voice used when no preference has resolved yet
const FALLBACK_VOICE: &str = "alloy";

/// Speech output backed by HTTP TTS and local playback
pub struct SpeechEngine {
    tts: TextToSpeech,
    speaker: Arc<Speaker>,
}

impl SpeechEngine {
    /// Create an engine from its two halves
    #[must_use]
    pub fn new(tts: TextToSpeech, speaker: Speaker) -> Self {
        Self {
            tts,
            speaker: Arc::new(speaker),
        }
    }
}

#[async_trait]
impl SpeechOutput for SpeechEngine {
    async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        self.tts.voices().await
    }

    async fn speak(&self, text: &str, voice: Option<&VoiceInfo>) -> Result<()> {
        let voice_name = voice.map_or(FALLBACK_VOICE, |v| v.name.as_str());
        let audio = self.tts.synthesize(text, voice_name).await?;

        let speaker = Arc::clone(&self.speaker);
        tokio::task::spawn_blocking(move || {
            if let Err(e) = speaker.play_mp3_blocking(&audio) {
                tracing::warn!(error = %e, "playback failed");
            }
        });

        Ok(())
    }

    fn cancel(&self) {
        self.speaker.cancel();
    }
}
