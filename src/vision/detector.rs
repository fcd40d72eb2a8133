//! HTTP object-detection provider
//!
//! Posts the encoded frame to a detection inference service and decodes
//! the returned detections.

use async_trait::async_trait;

use super::{Frame, ObjectDetector};
use crate::perception::DetectedObject;
use crate::{Error, Result};

/// Response envelope from the detection service
#[derive(serde::Deserialize)]
struct DetectResponse {
    detections: Vec<DetectedObject>,
}

/// Object detector backed by an inference HTTP endpoint
pub struct HttpDetector {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl HttpDetector {
    /// Create a detector posting frames to `url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is empty
    pub fn new(url: String, api_key: Option<String>) -> Result<Self> {
        if url.is_empty() {
            return Err(Error::Config(
                "detector endpoint URL required".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url,
            api_key,
        })
    }
}

#[async_trait]
impl ObjectDetector for HttpDetector {
    async fn detect(&self, frame: &Frame) -> Result<Vec<DetectedObject>> {
        let part = reqwest::multipart::Part::bytes(frame.data.clone())
            .file_name("frame.jpg")
            .mime_str("image/jpeg")
            .map_err(|e| Error::Inference(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("image", part);

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "detection request failed");
            Error::Inference(e.to_string())
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!(
                "detection API error {status}: {body}"
            )));
        }

        let result: DetectResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse detection response");
            Error::Inference(e.to_string())
        })?;

        tracing::trace!(count = result.detections.len(), "detections received");
        Ok(result.detections)
    }
}
