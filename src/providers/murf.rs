//! Murf text-to-speech provider

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SpeechSynthesizer, http_client};
use crate::{Error, Result};

/// Default Murf speech generation endpoint
pub const DEFAULT_API_URL: &str = "https://api.murf.ai/v1/speech/generate";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    format: &'static str,
    quality: &'static str,
}

/// Murf has returned the audio link under several names across API versions
#[derive(Deserialize)]
struct SpeechResponse {
    #[serde(default, rename = "audioFile")]
    audio_file: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    audio_url: Option<String>,
    #[serde(default, rename = "audioUrl")]
    audio_url_camel: Option<String>,
}

impl SpeechResponse {
    fn into_audio_url(self) -> Option<String> {
        [self.audio_file, self.url, self.audio_url, self.audio_url_camel]
            .into_iter()
            .flatten()
            .find(|u| !u.is_empty())
    }
}

/// Synthesizes speech with the Murf API, returning a hosted MP3 URL
pub struct MurfSynthesizer {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
}

impl MurfSynthesizer {
    /// Create a new Murf synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(api_key: String, api_url: String, request_timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("Murf API key required for TTS".to_string()));
        }

        Ok(Self {
            client: http_client(request_timeout)?,
            api_key,
            api_url,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for MurfSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String> {
        tracing::debug!(voice_id, text_chars = text.len(), "requesting Murf speech");

        let request = SpeechRequest {
            text,
            voice_id,
            format: "mp3",
            quality: "high",
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    tracing::error!("Murf API took too long to respond");
                } else {
                    tracing::error!(error = %e, "Murf request failed");
                }
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Murf API error");
            return Err(Error::Tts(format!("Murf API error {status}: {body}")));
        }

        let result: SpeechResponse = response.json().await?;
        let audio_url = result
            .into_audio_url()
            .ok_or_else(|| Error::Tts("audio URL not found in Murf response".to_string()))?;

        tracing::info!("speech generation successful");
        Ok(audio_url)
    }

    fn name(&self) -> &'static str {
        "murf"
    }
}
