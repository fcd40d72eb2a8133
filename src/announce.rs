//! Announcement management
//!
//! All speech requests funnel through here. Announcements are dropped,
//! never queued: any request arriving inside the minimum interval is
//! silently lost, duplicate of the last spoken text or not. Once the
//! interval elapses, even identical text speaks again.
//! Several triggers may fire in one detection tick; the throttle guarantees
//! at most one of them actually speaks, which is the intended policy.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::speech::{SpeechOutput, VoiceInfo};
use crate::Result;

/// Confirmation phrase spoken after a stop request
const STOP_CONFIRMATION: &str = "Okay, stopping.";

/// A single voice-selection predicate
#[derive(Debug, Clone)]
pub enum VoiceMatcher {
    /// Voice name contains the given substring (case-insensitive)
    NameContains(String),
    /// Voice language tag starts with the given prefix
    LanguagePrefix(String),
}

impl VoiceMatcher {
    fn matches(&self, voice: &VoiceInfo) -> bool {
        match self {
            Self::NameContains(s) => voice.name.to_lowercase().contains(&s.to_lowercase()),
            Self::LanguagePrefix(p) => voice.language.starts_with(p.as_str()),
        }
    }
}

/// Ordered list of voice matchers; the first matcher with any match wins
#[derive(Debug, Clone)]
pub struct VoicePreference {
    matchers: Vec<VoiceMatcher>,
}

impl VoicePreference {
    /// Create a preference from an ordered matcher list
    #[must_use]
    pub fn new(matchers: Vec<VoiceMatcher>) -> Self {
        Self { matchers }
    }

    /// Resolve against an available-voice list
    ///
    /// Matchers are tried in order; the first voice satisfying a matcher
    /// is selected. Resolution is pure, so re-running it on a grown voice
    /// list is safe and idempotent.
    #[must_use]
    pub fn resolve(&self, voices: &[VoiceInfo]) -> Option<VoiceInfo> {
        self.matchers
            .iter()
            .find_map(|m| voices.iter().find(|v| m.matches(v)))
            .cloned()
    }
}

impl Default for VoicePreference {
    fn default() -> Self {
        Self::new(vec![
            VoiceMatcher::NameContains("nova".to_string()),
            VoiceMatcher::LanguagePrefix("en".to_string()),
        ])
    }
}

/// Throttle bookkeeping owned exclusively by the manager
#[derive(Debug, Default)]
struct AnnouncementState {
    last_spoken_text: String,
    last_spoken_at: Option<Instant>,
}

/// Deduplicates and rate-limits speech output
pub struct AnnouncementManager {
    output: Arc<dyn SpeechOutput>,
    preference: VoicePreference,
    min_interval: Duration,
    state: Mutex<AnnouncementState>,
    voice: Mutex<Option<VoiceInfo>>,
}

impl AnnouncementManager {
    /// Create a manager speaking through `output`
    #[must_use]
    pub fn new(
        output: Arc<dyn SpeechOutput>,
        preference: VoicePreference,
        min_interval: Duration,
    ) -> Self {
        Self {
            output,
            preference,
            min_interval,
            state: Mutex::new(AnnouncementState::default()),
            voice: Mutex::new(None),
        }
    }

    /// Resolve the preferred voice from the provider's current list
    ///
    /// Safe to call repeatedly as voices are discovered incrementally.
    pub async fn resolve_voice(&self) {
        match self.output.voices().await {
            Ok(voices) => self.apply_voices(&voices),
            Err(e) => {
                tracing::warn!(error = %e, "voice listing failed, keeping current voice");
            }
        }
    }

    /// Re-resolve the preference against a known voice list
    pub fn apply_voices(&self, voices: &[VoiceInfo]) {
        let resolved = self.preference.resolve(voices);
        if let Some(ref v) = resolved {
            tracing::debug!(voice = %v.name, "voice selected");
        }
        if let Ok(mut slot) = self.voice.lock() {
            *slot = resolved;
        }
    }

    /// Request an announcement; returns whether it was actually spoken
    ///
    /// Empty text and requests inside the minimum interval are dropped
    /// silently. Deduplication only lasts as long as the interval: the
    /// same text requested again after it elapses is spoken again.
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    pub async fn announce(&self, text: &str) -> Result<bool> {
        if text.is_empty() {
            return Ok(false);
        }

        let now = Instant::now();
        {
            let Ok(mut state) = self.state.lock() else {
                return Ok(false);
            };

            if let Some(at) = state.last_spoken_at {
                if now.duration_since(at) < self.min_interval {
                    if state.last_spoken_text == text {
                        tracing::trace!(text, "duplicate announcement dropped");
                    } else {
                        tracing::trace!(text, "announcement throttled");
                    }
                    return Ok(false);
                }
            }

            state.last_spoken_text = text.to_string();
            state.last_spoken_at = Some(now);
        }

        self.output.cancel();
        let voice = self.voice.lock().ok().and_then(|v| v.clone());
        tracing::info!(text, "announcing");
        self.output.speak(text, voice.as_ref()).await?;

        Ok(true)
    }

    /// Cancel in-flight speech and confirm
    ///
    /// Resets the throttle window: the confirmation is spoken outside the
    /// normal gate and does not start a new interval, so the next
    /// announcement goes through regardless of elapsed time.
    ///
    /// # Errors
    ///
    /// Returns error if the confirmation cannot be synthesized
    pub async fn stop_speaking(&self) -> Result<()> {
        self.output.cancel();

        if let Ok(mut state) = self.state.lock() {
            state.last_spoken_text = STOP_CONFIRMATION.to_string();
            state.last_spoken_at = None;
        }

        let voice = self.voice.lock().ok().and_then(|v| v.clone());
        tracing::info!("speech stopped by request");
        self.output.speak(STOP_CONFIRMATION, voice.as_ref()).await?;
        Ok(())
    }

    /// Cancel pending speech without confirming; used during teardown
    pub fn cancel(&self) {
        self.output.cancel();
    }
}
