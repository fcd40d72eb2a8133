//! Voice command channel
//!
//! Consumes recognition sessions, parses utterances into a small command
//! vocabulary, and answers queries against the shared perception state.
//! When a session ends or errors the channel restarts it after a short
//! backoff, indefinitely: transient recognition failures must never
//! silence the voice-command surface.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::announce::AnnouncementManager;
use crate::perception::{PerceptionState, SharedPerception, NOTHING};
use crate::speech::{SpeechRecognizer, TranscriptEvent};
use crate::vision::FrameSource;

/// Delay before restarting a failed recognition session
const RESTART_BACKOFF: Duration = Duration::from_secs(1);

/// A recognized spoken command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Describe what is currently visible
    DescribeSurroundings,
    /// Cancel in-flight speech
    StopSpeaking,
    /// Start (or restart) camera capture
    StartCamera,
}

impl VoiceCommand {
    /// Parse a final utterance into a command
    ///
    /// The utterance is trimmed and lowercased; matching is by substring.
    /// Unrecognized utterances return `None` and are ignored.
    #[must_use]
    pub fn parse(utterance: &str) -> Option<Self> {
        let normalized = utterance.trim().to_lowercase();

        if normalized.contains("what do you see") || normalized.contains("surroundings") {
            Some(Self::DescribeSurroundings)
        } else if normalized.contains("stop speaking") {
            Some(Self::StopSpeaking)
        } else if normalized.contains("start camera") {
            Some(Self::StartCamera)
        } else {
            None
        }
    }
}

/// Compose a spoken description of the current perception state
#[must_use]
pub fn compose_description(state: &PerceptionState) -> String {
    if state.surroundings.is_empty() {
        return "I don't see anything right now".to_string();
    }

    let parts: Vec<String> = state
        .surroundings
        .iter()
        .map(|(zone, labels)| format!("{} {}", join_labels(labels), zone.as_phrase()))
        .collect();

    let mut text = format!("I can see {}", parts.join(", "));
    if state.stable_label != NOTHING {
        let _ = write!(
            text,
            ". The {} is about {:.1} meters away",
            state.stable_label, state.current_distance
        );
    }
    text
}

/// Join labels into natural speech: "a car and a person"
fn join_labels(labels: &BTreeSet<String>) -> String {
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
    match labels.as_slice() {
        [] => String::new(),
        [one] => format!("a {one}"),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(|l| format!("a {l}")).collect();
            format!("{} and a {last}", head.join(", "))
        }
    }
}

/// Long-lived listener translating utterances into pipeline actions
pub struct VoiceCommandChannel {
    recognizer: Arc<dyn SpeechRecognizer>,
    perception: SharedPerception,
    announcer: Arc<AnnouncementManager>,
    frames: Arc<dyn FrameSource>,
}

impl VoiceCommandChannel {
    /// Create a channel wired to the shared pipeline components
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        perception: SharedPerception,
        announcer: Arc<AnnouncementManager>,
        frames: Arc<dyn FrameSource>,
    ) -> Self {
        Self {
            recognizer,
            perception,
            announcer,
            frames,
        }
    }

    /// Listen until shutdown, restarting sessions forever
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.recognizer.listen().await {
                Ok(mut events) => loop {
                    tokio::select! {
                        _ = shutdown.changed() => return,
                        event = events.recv() => match event {
                            Some(TranscriptEvent::Transcript(text)) => {
                                self.handle_utterance(&text).await;
                            }
                            Some(TranscriptEvent::Ended(reason)) => {
                                tracing::warn!(reason, "recognition session ended, restarting");
                                break;
                            }
                            None => {
                                tracing::warn!("recognition session closed, restarting");
                                break;
                            }
                        }
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "recognition session failed to start");
                }
            }

            tokio::select! {
                _ = shutdown.changed() => return,
                () = tokio::time::sleep(RESTART_BACKOFF) => {}
            }
        }
    }

    /// Handle one final utterance
    pub async fn handle_utterance(&self, utterance: &str) {
        let Some(command) = VoiceCommand::parse(utterance) else {
            tracing::trace!(utterance, "unrecognized utterance ignored");
            return;
        };

        tracing::info!(?command, "voice command");
        match command {
            VoiceCommand::DescribeSurroundings => {
                let description = compose_description(&self.perception.snapshot());
                if let Err(e) = self.announcer.announce(&description).await {
                    tracing::warn!(error = %e, "failed to announce description");
                }
            }
            VoiceCommand::StopSpeaking => {
                if let Err(e) = self.announcer.stop_speaking().await {
                    tracing::warn!(error = %e, "failed to confirm stop");
                }
            }
            VoiceCommand::StartCamera => {
                if let Err(e) = self.frames.start().await {
                    tracing::warn!(error = %e, "failed to start camera");
                }
            }
        }
    }
}
