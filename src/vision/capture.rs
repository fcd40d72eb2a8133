//! Camera frame capture
//!
//! Polls an IP-camera style snapshot endpoint into a latest-frame slot.
//! The detection loop reads whatever frame is current; stale frames are
//! overwritten, never queued.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{Frame, FrameSource};
use crate::{Error, Result};

/// Captures frames by polling an HTTP snapshot endpoint
pub struct SnapshotCamera {
    client: reqwest::Client,
    url: String,
    poll_interval: Duration,
    latest: Arc<Mutex<Option<Frame>>>,
    running: Arc<AtomicBool>,
}

impl SnapshotCamera {
    /// Create a camera polling `url` every `poll_interval`
    #[must_use]
    pub fn new(url: String, poll_interval: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
            poll_interval,
            latest: Arc::new(Mutex::new(None)),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Fetch a single frame from the endpoint
    async fn fetch_frame(client: &reqwest::Client, url: &str) -> Result<Frame> {
        let response = client.get(url).send().await?;

        if response.status() == reqwest::StatusCode::FORBIDDEN
            || response.status() == reqwest::StatusCode::UNAUTHORIZED
        {
            return Err(Error::Capture("camera permission denied".to_string()));
        }
        if !response.status().is_success() {
            return Err(Error::Capture(format!(
                "camera unavailable: HTTP {}",
                response.status()
            )));
        }

        let data = response.bytes().await?.to_vec();
        let (width, height) = probe_dimensions(&data)?;

        Ok(Frame {
            data,
            width,
            height,
        })
    }
}

#[async_trait]
impl FrameSource for SnapshotCamera {
    async fn start(&self) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Fetch one frame up front so start surfaces permission and
        // device errors instead of hiding them in the poll task.
        let first = match Self::fetch_frame(&self.client, &self.url).await {
            Ok(frame) => frame,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        tracing::debug!(
            url = %self.url,
            width = first.width,
            height = first.height,
            "camera capture started"
        );

        if let Ok(mut slot) = self.latest.lock() {
            *slot = Some(first);
        }

        let client = self.client.clone();
        let url = self.url.clone();
        let latest = Arc::clone(&self.latest);
        let running = Arc::clone(&self.running);
        let poll_interval = self.poll_interval;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            while running.load(Ordering::SeqCst) {
                interval.tick().await;
                match Self::fetch_frame(&client, &url).await {
                    Ok(frame) => {
                        if let Ok(mut slot) = latest.lock() {
                            *slot = Some(frame);
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "frame fetch failed");
                    }
                }
            }

            tracing::debug!("camera poll task exited");
        });

        Ok(())
    }

    fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Ok(mut slot) = self.latest.lock() {
                *slot = None;
            }
            tracing::debug!("camera capture stopped");
        }
    }

    fn current_frame(&self) -> Option<Frame> {
        self.latest.lock().ok().and_then(|slot| slot.clone())
    }

    fn is_capturing(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Read image dimensions without decoding the full frame
#[allow(clippy::cast_precision_loss)]
fn probe_dimensions(data: &[u8]) -> Result<(f32, f32)> {
    let reader = image::ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::Capture(format!("unreadable frame: {e}")))?;
    let (w, h) = reader
        .into_dimensions()
        .map_err(|e| Error::Capture(format!("bad frame data: {e}")))?;
    Ok((w as f32, h as f32))
}
