//! Continuous speech recognition
//!
//! A recognition session drains the microphone, segments utterances by
//! energy, and transcribes each segment through a Whisper-compatible HTTP
//! API. The session ends on microphone loss; the voice command channel
//! owns the restart policy.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{samples_to_wav, MicCapture, SpeechRecognizer, TranscriptEvent, UtteranceSegmenter, SAMPLE_RATE};
use crate::{Error, Result};

/// How often the session drains the microphone buffer
const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// Response from a Whisper-compatible transcription API
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Recognizer using the local microphone and an HTTP transcription API
pub struct MicRecognizer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl MicRecognizer {
    /// Create a new recognizer
    ///
    /// # Errors
    ///
    /// Returns error if the API key is missing
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "API key required for transcription".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
        })
    }

    /// Transcribe a WAV-encoded utterance
    async fn transcribe(&self, wav: Vec<u8>) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(wav)
                    .file_name("utterance.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| Error::Stt(e.to_string()))?,
            )
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/v1/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Stt(format!("transcription error {status}: {body}")));
        }

        let result: WhisperResponse = response.json().await?;
        Ok(result.text)
    }
}

#[async_trait]
impl SpeechRecognizer for MicRecognizer {
    async fn listen(&self) -> Result<mpsc::Receiver<TranscriptEvent>> {
        let mic = MicCapture::start()?;
        let (tx, rx) = mpsc::channel(16);

        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let api_key = self.api_key.clone();
        let model = self.model.clone();

        tokio::spawn(async move {
            let recognizer = MicRecognizer {
                client,
                base_url,
                api_key,
                model,
            };
            let mut segmenter = UtteranceSegmenter::new();
            let mut interval = tokio::time::interval(DRAIN_INTERVAL);

            loop {
                interval.tick().await;

                if !mic.is_running() {
                    let _ = tx
                        .send(TranscriptEvent::Ended("microphone lost".to_string()))
                        .await;
                    break;
                }
                if tx.is_closed() {
                    mic.stop();
                    break;
                }

                let samples = mic.take_buffer();
                if samples.is_empty() {
                    continue;
                }

                let Some(segment) = segmenter.process(&samples) else {
                    continue;
                };

                let wav = match samples_to_wav(&segment, SAMPLE_RATE) {
                    Ok(wav) => wav,
                    Err(e) => {
                        tracing::warn!(error = %e, "WAV encoding failed");
                        continue;
                    }
                };

                match recognizer.transcribe(wav).await {
                    Ok(text) if !text.trim().is_empty() => {
                        tracing::debug!(transcript = %text, "utterance transcribed");
                        if tx.send(TranscriptEvent::Transcript(text)).await.is_err() {
                            mic.stop();
                            break;
                        }
                    }
                    Ok(_) => {
                        tracing::trace!("empty transcription, ignored");
                    }
                    Err(e) => {
                        // Transient API failures should not end the session
                        tracing::warn!(error = %e, "transcription failed");
                    }
                }
            }
        });

        tracing::info!("recognition session started");
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_rejected() {
        let result = MicRecognizer::new(
            "https://api.openai.com".to_string(),
            String::new(),
            "whisper-1".to_string(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_whisper_response_decoding() {
        let parsed: WhisperResponse =
            serde_json::from_str(r#"{"text": "what do you see"}"#).unwrap();
        assert_eq!(parsed.text, "what do you see");
    }
}
