//! Speech playback to speakers
//!
//! Plays synthesized MP3 audio through the default output device with
//! support for mid-playback cancellation ("stop speaking").

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};

use crate::{Error, Result};

/// Sample rate for playback (matches common TTS output)
const PLAYBACK_SAMPLE_RATE: u32 = 24000;

/// Plays audio to the default output device, cancellable
pub struct Speaker {
    config: StreamConfig,
    cancelled: Arc<AtomicBool>,
}

impl Speaker {
    /// Create a new speaker instance
    ///
    /// # Errors
    ///
    /// Returns error if no suitable output device exists
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        let supported_config = device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() <= 2
                    && c.min_sample_rate() <= SampleRate(PLAYBACK_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(PLAYBACK_SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable output config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(PLAYBACK_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = PLAYBACK_SAMPLE_RATE,
            channels = config.channels,
            "speaker initialized"
        );

        Ok(Self {
            config,
            cancelled: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Cancel the playback currently in progress, if any
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Play MP3 audio, blocking until done or cancelled
    ///
    /// # Errors
    ///
    /// Returns error if decoding or the audio device fails
    pub fn play_mp3_blocking(&self, mp3_data: &[u8]) -> Result<()> {
        let samples = decode_mp3(mp3_data)?;
        if samples.is_empty() {
            return Ok(());
        }

        // A new playback claims the cancel flag for itself.
        self.cancelled.store(false, Ordering::SeqCst);

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device".to_string()))?;

        let config = self.config.clone();
        let channels = config.channels as usize;

        let sample_count = samples.len();
        let shared = Arc::new(Mutex::new((samples, 0usize)));
        let finished = Arc::new(AtomicBool::new(false));
        let cancelled = Arc::clone(&self.cancelled);

        let shared_cb = Arc::clone(&shared);
        let finished_cb = Arc::clone(&finished);
        let cancelled_cb = Arc::clone(&cancelled);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    if cancelled_cb.load(Ordering::SeqCst) {
                        data.fill(0.0);
                        finished_cb.store(true, Ordering::SeqCst);
                        return;
                    }

                    let Ok(mut guard) = shared_cb.lock() else {
                        data.fill(0.0);
                        return;
                    };
                    let (samples, pos) = &mut *guard;

                    for frame in data.chunks_mut(channels) {
                        let sample = if *pos < samples.len() {
                            let s = samples[*pos];
                            *pos += 1;
                            s
                        } else {
                            finished_cb.store(true, Ordering::SeqCst);
                            0.0
                        };
                        frame.fill(sample);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let duration_ms = (sample_count as u64 * 1000) / u64::from(PLAYBACK_SAMPLE_RATE);
        let start = std::time::Instant::now();
        let timeout = std::time::Duration::from_millis(duration_ms + 500);

        while !finished.load(Ordering::SeqCst) {
            if start.elapsed() > timeout {
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        drop(stream);

        if cancelled.load(Ordering::SeqCst) {
            tracing::debug!("playback cancelled");
        } else {
            tracing::debug!(samples = sample_count, "playback complete");
        }

        Ok(())
    }
}

/// Decode MP3 bytes to f32 samples, folding stereo to mono
fn decode_mp3(mp3_data: &[u8]) -> Result<Vec<f32>> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        // minimp3 skips unsyncable data and reaches EOF with no frames
        let samples = decode_mp3(&[0u8; 64]).unwrap_or_default();
        assert!(samples.is_empty());
    }
}
