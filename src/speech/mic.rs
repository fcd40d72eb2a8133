//! Microphone capture
//!
//! Accumulates mono f32 samples from the default input device into a
//! shared buffer. The cpal stream handle is not `Send`, so it lives on a
//! dedicated thread that holds it open until stopped; callers drain the
//! buffer from wherever they like.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleRate;

use super::SAMPLE_RATE;
use crate::{Error, Result};

/// Captures audio from the default input device
pub struct MicCapture {
    buffer: Arc<Mutex<Vec<f32>>>,
    running: Arc<AtomicBool>,
}

impl MicCapture {
    /// Open the default input device and start capturing
    ///
    /// # Errors
    ///
    /// Returns error if no suitable input device is available
    pub fn start() -> Result<Self> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let running = Arc::new(AtomicBool::new(true));

        // Probe the device on the caller's thread so failures surface
        // here rather than inside the capture thread.
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::Audio("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Audio("no suitable input config found".to_string()))?;

        let config = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = SAMPLE_RATE,
            "microphone capture starting"
        );

        let thread_buffer = Arc::clone(&buffer);
        let thread_running = Arc::clone(&running);

        // The cpal stream handle stays on this thread for its lifetime.
        std::thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || {
                let host = cpal::default_host();
                let Some(device) = host.default_input_device() else {
                    tracing::error!("input device disappeared");
                    thread_running.store(false, Ordering::SeqCst);
                    return;
                };

                let callback_buffer = Arc::clone(&thread_buffer);
                let stream = device.build_input_stream(
                    &config,
                    move |data: &[f32], _: &cpal::InputCallbackInfo| {
                        if let Ok(mut buf) = callback_buffer.lock() {
                            buf.extend_from_slice(data);
                        }
                    },
                    |err| {
                        tracing::error!(error = %err, "microphone capture error");
                    },
                    None,
                );

                let stream = stream
                    .map_err(|e| e.to_string())
                    .and_then(|s| s.play().map(|()| s).map_err(|e| e.to_string()));

                match stream {
                    Ok(stream) => {
                        while thread_running.load(Ordering::SeqCst) {
                            std::thread::sleep(Duration::from_millis(100));
                        }
                        drop(stream);
                        tracing::debug!("microphone capture stopped");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "failed to open microphone stream");
                        thread_running.store(false, Ordering::SeqCst);
                    }
                }
            })?;

        Ok(Self { buffer, running })
    }

    /// Take the samples captured since the last call
    #[must_use]
    pub fn take_buffer(&self) -> Vec<f32> {
        self.buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default()
    }

    /// Whether the capture thread is still running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop capturing and release the device
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

impl Drop for MicCapture {
    fn drop(&mut self) {
        self.stop();
    }
}
