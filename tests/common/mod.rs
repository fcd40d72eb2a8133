//! Shared test doubles for the pipeline collaborators

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use sightline::perception::{DetectedObject, Rect};
use sightline::speech::{SpeechOutput, SpeechRecognizer, TranscriptEvent, VoiceInfo};
use sightline::vision::{Frame, FrameSource, ObjectDetector};
use sightline::{Error, Result};

/// Frame source serving a fixed 640x480 frame, optionally failing to start
pub struct MockFrames {
    running: AtomicBool,
    fail_start: bool,
}

impl MockFrames {
    #[must_use]
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            fail_start: false,
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            running: AtomicBool::new(false),
            fail_start: true,
        }
    }
}

#[async_trait]
impl FrameSource for MockFrames {
    async fn start(&self) -> Result<()> {
        if self.fail_start {
            return Err(Error::Capture("permission denied".to_string()));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn current_frame(&self) -> Option<Frame> {
        self.running.load(Ordering::SeqCst).then(|| Frame {
            data: Vec::new(),
            width: 640.0,
            height: 480.0,
        })
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Detector returning the same detections on every call
pub struct ConstantDetector {
    detections: Vec<DetectedObject>,
}

impl ConstantDetector {
    #[must_use]
    pub fn new(detections: Vec<DetectedObject>) -> Self {
        Self { detections }
    }
}

#[async_trait]
impl ObjectDetector for ConstantDetector {
    async fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedObject>> {
        Ok(self.detections.clone())
    }
}

/// Speech output recording every request
#[derive(Default)]
pub struct RecordingSpeech {
    pub spoken: Mutex<Vec<String>>,
    pub cancels: AtomicUsize,
}

#[async_trait]
impl SpeechOutput for RecordingSpeech {
    async fn voices(&self) -> Result<Vec<VoiceInfo>> {
        Ok(vec![VoiceInfo {
            name: "nova".to_string(),
            language: "en-US".to_string(),
        }])
    }

    async fn speak(&self, text: &str, _voice: Option<&VoiceInfo>) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

impl RecordingSpeech {
    /// Whether any spoken text satisfies the predicate
    pub fn any_spoken(&self, f: impl Fn(&str) -> bool) -> bool {
        self.spoken.lock().unwrap().iter().any(|s| f(s))
    }
}

/// Recognizer replaying scripted sessions
///
/// Each `listen` call pops the next script and emits its events, then
/// ends the session. With no scripts left the session stays open silently.
pub struct ScriptedRecognizer {
    scripts: Mutex<VecDeque<Vec<String>>>,
    pub sessions: Arc<AtomicUsize>,
}

impl ScriptedRecognizer {
    #[must_use]
    pub fn new(scripts: Vec<Vec<&str>>) -> Self {
        Self {
            scripts: Mutex::new(
                scripts
                    .into_iter()
                    .map(|s| s.into_iter().map(String::from).collect())
                    .collect(),
            ),
            sessions: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl SpeechRecognizer for ScriptedRecognizer {
    async fn listen(&self) -> Result<mpsc::Receiver<TranscriptEvent>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        let script = self.scripts.lock().unwrap().pop_front();
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            match script {
                Some(utterances) => {
                    for utterance in utterances {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        if tx
                            .send(TranscriptEvent::Transcript(utterance))
                            .await
                            .is_err()
                        {
                            return;
                        }
                    }
                    let _ = tx
                        .send(TranscriptEvent::Ended("script finished".to_string()))
                        .await;
                }
                None => {
                    // Keep the session open without events
                    tx.closed().await;
                }
            }
        });

        Ok(rx)
    }
}

/// A confident person detection centered ahead
#[must_use]
pub fn person_ahead() -> DetectedObject {
    DetectedObject {
        rect: Rect {
            x: 270.0,
            y: 100.0,
            width: 100.0,
            height: 300.0,
        },
        label: "person".to_string(),
        confidence: 0.9,
    }
}
