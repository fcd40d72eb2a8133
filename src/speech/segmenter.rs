//! Utterance segmentation
//!
//! Splits the continuous microphone stream into discrete utterances using
//! RMS energy: speech starts when energy crosses a threshold, and the
//! segment completes after enough trailing silence.

/// Minimum audio energy to consider speech
const ENERGY_THRESHOLD: f32 = 0.03;

/// Minimum speech length to emit a segment (in samples at 16kHz)
const MIN_SPEECH_SAMPLES: usize = 4800; // 0.3 seconds

/// Trailing silence marking end of utterance (in samples)
const SILENCE_SAMPLES: usize = 8000; // 0.5 seconds

/// Segments a sample stream into utterances by energy
#[derive(Debug, Default)]
pub struct UtteranceSegmenter {
    speech_buffer: Vec<f32>,
    silence_counter: usize,
    in_speech: bool,
}

impl UtteranceSegmenter {
    /// Create an idle segmenter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed samples; returns a completed utterance when one ends
    pub fn process(&mut self, samples: &[f32]) -> Option<Vec<f32>> {
        let energy = calculate_energy(samples);
        let is_speech = energy > ENERGY_THRESHOLD;

        if !self.in_speech {
            if is_speech {
                self.in_speech = true;
                self.speech_buffer.clear();
                self.speech_buffer.extend_from_slice(samples);
                self.silence_counter = 0;
                tracing::trace!(energy, "speech started");
            }
            return None;
        }

        self.speech_buffer.extend_from_slice(samples);
        if is_speech {
            self.silence_counter = 0;
        } else {
            self.silence_counter += samples.len();
        }

        if self.silence_counter > SILENCE_SAMPLES {
            // The buffer holds the trailing silence too; judge length by
            // the speech portion alone.
            let speech_len = self.speech_buffer.len().saturating_sub(self.silence_counter);
            let segment = std::mem::take(&mut self.speech_buffer);
            self.reset();

            if speech_len > MIN_SPEECH_SAMPLES {
                tracing::debug!(samples = segment.len(), "utterance complete");
                return Some(segment);
            }
            tracing::trace!("segment too short, discarded");
        }

        None
    }

    /// Return to idle, discarding any buffered speech
    pub fn reset(&mut self) {
        self.in_speech = false;
        self.speech_buffer.clear();
        self.silence_counter = 0;
    }
}

/// RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
