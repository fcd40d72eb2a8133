//! Detection pipeline
//!
//! [`DetectionLoop`] drives the perception cycle: grab the current frame,
//! run inference at most once at a time, smooth the result through the
//! stability filter, update shared state, and hand announcement requests
//! to the throttle. [`Pipeline`] ties the loop and the voice command
//! channel together with shared shutdown and idempotent teardown.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use crate::announce::AnnouncementManager;
use crate::commands::{compose_description, VoiceCommandChannel};
use crate::config::PerceptionConfig;
use crate::perception::{
    distance_of, zone_of, DetectedObject, HazardDetector, LabelHistory, SharedPerception,
    StabilityFilter, SurroundingsSnapshot, NOTHING,
};
use crate::speech::SpeechRecognizer;
use crate::vision::{FrameSource, ObjectDetector};
use crate::Result;

/// Spoken warning for the hazard pattern
const HAZARD_WARNING: &str = "Caution, vehicle ahead";

/// Per-tick analysis state guarded by one lock
///
/// Only `tick` touches this, but `tick` is a public operation and may be
/// driven from outside the built-in scheduler.
struct TickState {
    history: LabelHistory,
    prev_stable: String,
    prev_surroundings: SurroundingsSnapshot,
}

/// The backpressure-respecting detection loop
pub struct DetectionLoop {
    frames: Arc<dyn FrameSource>,
    detector: Arc<dyn ObjectDetector>,
    announcer: Arc<AnnouncementManager>,
    perception: SharedPerception,
    filter: StabilityFilter,
    hazard: HazardDetector,
    config: PerceptionConfig,
    /// True while an inference call is in flight; the sole backpressure
    busy: AtomicBool,
    /// Counts tick opportunities for frame skipping
    tick_counter: AtomicU64,
    state: Mutex<TickState>,
}

impl DetectionLoop {
    /// Create a loop over the given collaborators
    #[must_use]
    pub fn new(
        frames: Arc<dyn FrameSource>,
        detector: Arc<dyn ObjectDetector>,
        announcer: Arc<AnnouncementManager>,
        perception: SharedPerception,
        config: PerceptionConfig,
    ) -> Self {
        let state = Mutex::new(TickState {
            history: LabelHistory::new(config.history_len),
            prev_stable: NOTHING.to_string(),
            prev_surroundings: SurroundingsSnapshot::new(),
        });

        Self {
            frames,
            detector,
            announcer,
            perception,
            filter: StabilityFilter::new(config.majority_ratio),
            hazard: HazardDetector::new(config.hazard_labels.clone()),
            config,
            busy: AtomicBool::new(false),
            tick_counter: AtomicU64::new(0),
            state,
        }
    }

    /// One tick opportunity
    ///
    /// Safe under re-entrancy: if an inference call is already in flight
    /// the tick is a no-op. A frame-skip factor K discards (K-1) of every
    /// K ticks before even checking the busy flag.
    pub async fn tick(&self) {
        let n = self.tick_counter.fetch_add(1, Ordering::Relaxed);
        if n % u64::from(self.config.frame_skip) != 0 {
            return;
        }

        // At most one in-flight inference system-wide.
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::trace!("tick skipped, inference in flight");
            return;
        }

        let Some(frame) = self.frames.current_frame() else {
            self.busy.store(false, Ordering::SeqCst);
            return;
        };

        let result = self.detector.detect(&frame).await;
        self.busy.store(false, Ordering::SeqCst);

        match result {
            Ok(detections) => {
                self.process(&detections, frame.width, frame.height).await;
            }
            Err(e) => {
                // Never fatal; skip this tick's state update and carry on.
                tracing::warn!(error = %e, "inference failed, tick skipped");
            }
        }
    }

    /// Fold one tick's detections into state and announcements
    async fn process(&self, detections: &[DetectedObject], frame_width: f32, frame_height: f32) {
        let mut announcements: Vec<String> = Vec::new();

        {
            let Ok(mut tick) = self.state.lock() else {
                return;
            };

            let mut surroundings = SurroundingsSnapshot::new();
            let mut primary: Option<(&DetectedObject, f32)> = None;

            let mut survivors: Vec<&DetectedObject> = detections
                .iter()
                .filter(|d| d.confidence > self.config.confidence_threshold)
                .collect();
            survivors.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

            if survivors.is_empty() {
                tick.history.push(NOTHING);
            } else {
                for &detection in &survivors {
                    let zone = zone_of(&detection.rect, frame_width);
                    let distance = distance_of(&detection.rect, frame_height);
                    surroundings.insert(zone, detection.label.clone());

                    let closer = primary.is_none_or(|(_, d)| distance < d);
                    if closer {
                        primary = Some((detection, distance));
                    }
                }

                if let Some((detection, _)) = primary {
                    tick.history.push(detection.label.clone());
                }
            }

            let stable = self.filter.stable_label(&tick.history);
            let primary_distance = primary.map_or(0.0, |(_, d)| d);

            if stable != tick.prev_stable {
                tracing::debug!(from = %tick.prev_stable, to = %stable, "stable label changed");
                tick.prev_stable = stable.clone();

                self.perception.update(|state| {
                    state.stable_label = stable.clone();
                    state.current_distance = primary_distance;
                });

                if stable != NOTHING {
                    announcements
                        .push(format!("A {stable}, about {primary_distance:.1} meters away"));
                }
            }

            if surroundings != tick.prev_surroundings {
                tracing::debug!("surroundings changed");
                tick.prev_surroundings = surroundings.clone();

                self.perception.update(|state| {
                    state.surroundings = surroundings.clone();
                });

                announcements.push(compose_description(&self.perception.snapshot()));
            }

            if self.hazard.check(detections, frame_width, frame_height) {
                announcements.push(HAZARD_WARNING.to_string());
            }
        }

        // Several triggers may fire in one tick; the throttle guarantees
        // at most one of them speaks. Lossy by design.
        for text in announcements {
            if let Err(e) = self.announcer.announce(&text).await {
                tracing::warn!(error = %e, "announcement failed");
            }
        }
    }

    /// Drive ticks until shutdown
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            tick_interval_ms = self.config.tick_interval_ms,
            frame_skip = self.config.frame_skip,
            "detection loop running"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("detection loop stopped");
    }
}

/// The assembled pipeline: detection loop + voice command channel
pub struct Pipeline {
    detection: Arc<DetectionLoop>,
    channel: Option<VoiceCommandChannel>,
    frames: Arc<dyn FrameSource>,
    announcer: Arc<AnnouncementManager>,
    shutdown_tx: watch::Sender<bool>,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators
    ///
    /// Passing no recognizer runs the pipeline without the voice command
    /// surface (recognition unsupported or explicitly disabled).
    #[must_use]
    pub fn new(
        frames: Arc<dyn FrameSource>,
        detector: Arc<dyn ObjectDetector>,
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        announcer: Arc<AnnouncementManager>,
        config: PerceptionConfig,
    ) -> Self {
        let perception = SharedPerception::new();
        let (shutdown_tx, _) = watch::channel(false);

        let detection = Arc::new(DetectionLoop::new(
            Arc::clone(&frames),
            detector,
            Arc::clone(&announcer),
            perception.clone(),
            config,
        ));

        let channel = recognizer.map(|recognizer| {
            VoiceCommandChannel::new(
                recognizer,
                perception,
                Arc::clone(&announcer),
                Arc::clone(&frames),
            )
        });

        Self {
            detection,
            channel,
            frames,
            announcer,
            shutdown_tx,
        }
    }

    /// Run until shutdown is requested
    ///
    /// Capture start failures abort before any loop runs: the pipeline
    /// does not start without a camera, and retrying is the caller's
    /// decision.
    ///
    /// # Errors
    ///
    /// Returns error if camera capture cannot be started
    pub async fn run(&self) -> Result<()> {
        self.frames.start().await?;
        self.announcer.resolve_voice().await;

        let detection_rx = self.shutdown_tx.subscribe();

        if let Some(channel) = &self.channel {
            let channel_rx = self.shutdown_tx.subscribe();
            tokio::join!(self.detection.run(detection_rx), channel.run(channel_rx));
        } else {
            tracing::warn!("voice commands unavailable, running detection only");
            self.detection.run(detection_rx).await;
        }

        self.teardown();
        Ok(())
    }

    /// Request shutdown; both loops exit at their next opportunity
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Release capture and pending speech; safe to call repeatedly
    fn teardown(&self) {
        self.frames.stop();
        self.announcer.cancel();
        tracing::info!("pipeline torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::VoicePreference;
    use crate::perception::Rect;
    use crate::speech::{SpeechOutput, VoiceInfo};
    use crate::vision::Frame;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticFrames {
        running: AtomicBool,
    }

    #[async_trait]
    impl FrameSource for StaticFrames {
        async fn start(&self) -> Result<()> {
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn current_frame(&self) -> Option<Frame> {
            Some(Frame {
                data: Vec::new(),
                width: 640.0,
                height: 480.0,
            })
        }

        fn is_capturing(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    /// Detector returning a fixed script of responses, one per call
    struct ScriptedDetector {
        script: Mutex<Vec<Result<Vec<DetectedObject>>>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Vec<DetectedObject>>>) -> Self {
            let mut script = script;
            script.reverse();
            Self {
                script: Mutex::new(script),
            }
        }
    }

    #[async_trait]
    impl ObjectDetector for ScriptedDetector {
        async fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedObject>> {
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    #[derive(Default)]
    struct SilentOutput {
        spoken: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechOutput for SilentOutput {
        async fn voices(&self) -> Result<Vec<VoiceInfo>> {
            Ok(Vec::new())
        }

        async fn speak(&self, text: &str, _voice: Option<&VoiceInfo>) -> Result<()> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn cancel(&self) {}
    }

    fn person(confidence: f32) -> DetectedObject {
        DetectedObject {
            rect: Rect {
                x: 270.0,
                y: 100.0,
                width: 100.0,
                height: 300.0,
            },
            label: "person".to_string(),
            confidence,
        }
    }

    fn detection_loop(
        script: Vec<Result<Vec<DetectedObject>>>,
        output: &Arc<SilentOutput>,
    ) -> DetectionLoop {
        let config = PerceptionConfig {
            frame_skip: 1,
            history_len: 3,
            majority_ratio: 0.5,
            ..PerceptionConfig::default()
        };
        let announcer = Arc::new(AnnouncementManager::new(
            Arc::clone(output) as Arc<dyn SpeechOutput>,
            VoicePreference::default(),
            Duration::from_millis(0),
        ));

        DetectionLoop::new(
            Arc::new(StaticFrames {
                running: AtomicBool::new(true),
            }),
            Arc::new(ScriptedDetector::new(script)),
            announcer,
            SharedPerception::new(),
            config,
        )
    }

    #[tokio::test]
    async fn test_stable_label_announced_after_convergence() {
        let output = Arc::new(SilentOutput::default());
        let detections = vec![person(0.9)];
        let dl = detection_loop(
            vec![
                Ok(detections.clone()),
                Ok(detections.clone()),
                Ok(detections),
            ],
            &output,
        );

        dl.tick().await;
        dl.tick().await;
        dl.tick().await;

        let snap = dl.perception.snapshot();
        assert_eq!(snap.stable_label, "person");
        assert!((snap.current_distance - 1.25).abs() < 1e-6);

        let spoken = output.spoken.lock().unwrap();
        assert!(spoken.iter().any(|s| s.contains("person")));
    }

    #[tokio::test]
    async fn test_low_confidence_treated_as_nothing() {
        let output = Arc::new(SilentOutput::default());
        let dl = detection_loop(vec![Ok(vec![person(0.3)])], &output);

        dl.tick().await;

        let snap = dl.perception.snapshot();
        assert_eq!(snap.stable_label, NOTHING);
        assert!(snap.surroundings.is_empty());
    }

    #[tokio::test]
    async fn test_inference_failure_is_not_fatal() {
        let output = Arc::new(SilentOutput::default());
        let dl = detection_loop(
            vec![
                Err(crate::Error::Inference("model crashed".to_string())),
                Ok(vec![person(0.9)]),
            ],
            &output,
        );

        dl.tick().await;
        // State untouched by the failed tick
        assert_eq!(dl.perception.snapshot().stable_label, NOTHING);

        dl.tick().await;
        // Loop kept going and processed the next tick
        assert!(!dl.perception.snapshot().surroundings.is_empty());
    }

    #[tokio::test]
    async fn test_frame_skip_discards_ticks() {
        let output = Arc::new(SilentOutput::default());
        let config = PerceptionConfig {
            frame_skip: 3,
            ..PerceptionConfig::default()
        };
        let announcer = Arc::new(AnnouncementManager::new(
            Arc::clone(&output) as Arc<dyn SpeechOutput>,
            VoicePreference::default(),
            Duration::from_millis(0),
        ));
        let dl = DetectionLoop::new(
            Arc::new(StaticFrames {
                running: AtomicBool::new(true),
            }),
            Arc::new(ScriptedDetector::new(vec![Ok(vec![person(0.9)])])),
            announcer,
            SharedPerception::new(),
            config,
        );

        // Ticks 0 runs, 1 and 2 are skipped; the script has one entry so
        // a second accepted tick would see empty detections.
        dl.tick().await;
        dl.tick().await;
        dl.tick().await;

        assert!(!dl.perception.snapshot().surroundings.is_empty());
    }

    #[tokio::test]
    async fn test_hazard_announced() {
        let output = Arc::new(SilentOutput::default());
        let hazard = DetectedObject {
            rect: Rect {
                x: 280.0,
                y: 250.0,
                width: 80.0,
                height: 200.0,
            },
            label: "car".to_string(),
            confidence: 0.95,
        };
        let dl = detection_loop(vec![Ok(vec![hazard])], &output);

        dl.tick().await;

        let spoken = output.spoken.lock().unwrap();
        assert!(spoken.iter().any(|s| s == HAZARD_WARNING));
    }

    #[tokio::test]
    async fn test_surroundings_change_detection() {
        let output = Arc::new(SilentOutput::default());
        let detections = vec![person(0.9)];
        // Same scene twice, then empty
        let dl = detection_loop(
            vec![Ok(detections.clone()), Ok(detections), Ok(Vec::new())],
            &output,
        );

        dl.tick().await;
        let after_first = output.spoken.lock().unwrap().len();

        dl.tick().await;
        // Unchanged scene adds no surroundings announcement beyond the
        // stable-label one
        let after_second = output.spoken.lock().unwrap().len();

        dl.tick().await;
        let snap = dl.perception.snapshot();

        assert!(after_first >= 1);
        assert!(after_second <= after_first + 1);
        assert!(snap.surroundings.is_empty());
    }
}
