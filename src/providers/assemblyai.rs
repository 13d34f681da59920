//! AssemblyAI speech-to-text provider

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Transcriber, Transcription, http_client};
use crate::{Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.assemblyai.com";

/// Delay between transcript status checks
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Serialize)]
struct TranscriptRequest<'a> {
    audio_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: TranscriptStatus,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TranscriptStatus {
    Queued,
    Processing,
    Completed,
    Error,
}

/// Transcribes audio with the AssemblyAI upload + transcript API
pub struct AssemblyAiTranscriber {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    poll_interval: Duration,
}

impl AssemblyAiTranscriber {
    /// Create a new AssemblyAI transcriber
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, request_timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config(
                "AssemblyAI API key required for STT".to_string(),
            ));
        }

        Ok(Self {
            client: http_client(request_timeout)?,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Point at a different API host (self-hosted proxy, test server)
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    async fn upload(&self, audio: &[u8]) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .header("content-type", "application/octet-stream")
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "AssemblyAI upload failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "AssemblyAI upload error");
            return Err(Error::Stt(format!("AssemblyAI upload error {status}: {body}")));
        }

        let upload: UploadResponse = response.json().await?;
        Ok(upload.upload_url)
    }

    async fn request_transcript(&self, audio_url: &str) -> Result<TranscriptResponse> {
        let response = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&TranscriptRequest { audio_url })
            .send()
            .await?;

        Self::read_transcript(response).await
    }

    async fn poll_transcript(&self, id: &str) -> Result<TranscriptResponse> {
        let response = self
            .client
            .get(format!("{}/v2/transcript/{id}", self.base_url))
            .header("authorization", &self.api_key)
            .send()
            .await?;

        Self::read_transcript(response).await
    }

    async fn read_transcript(response: reqwest::Response) -> Result<TranscriptResponse> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "AssemblyAI API error");
            return Err(Error::Stt(format!("AssemblyAI API error {status}: {body}")));
        }

        Ok(response.json().await?)
    }
}

/// Resolve a transcript once it reaches a terminal status
///
/// Returns `Ok(None)` while the job is still queued or processing.
fn finished_transcription(transcript: TranscriptResponse) -> Result<Option<Transcription>> {
    match transcript.status {
        TranscriptStatus::Queued | TranscriptStatus::Processing => Ok(None),
        TranscriptStatus::Error => Err(Error::Stt(format!(
            "Transcription failed: {}",
            transcript.error.unwrap_or_else(|| "unknown error".to_string())
        ))),
        TranscriptStatus::Completed => Ok(Some(Transcription {
            text: transcript.text.unwrap_or_default(),
            confidence: transcript.confidence,
        })),
    }
}

#[async_trait]
impl Transcriber for AssemblyAiTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription> {
        tracing::debug!(audio_bytes = audio.len(), "starting AssemblyAI transcription");

        let audio_url = self.upload(audio).await?;
        let mut transcript = self.request_transcript(&audio_url).await?;
        let id = transcript.id.clone();

        loop {
            if let Some(result) = finished_transcription(transcript)? {
                tracing::info!(
                    transcript_id = %id,
                    chars = result.text.len(),
                    "transcription complete"
                );
                return Ok(result);
            }

            tokio::time::sleep(self.poll_interval).await;
            transcript = self.poll_transcript(&id).await?;
        }
    }

    fn name(&self) -> &'static str {
        "assemblyai"
    }
}
