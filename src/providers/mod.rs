//! External capability providers
//!
//! Transcription, reply generation, and speech synthesis are opaque
//! services reached over HTTP. The chat pipeline only sees the traits
//! defined here, so tests and alternative backends can stand in for them.

mod assemblyai;
mod gemini;
mod murf;

pub use assemblyai::AssemblyAiTranscriber;
pub use gemini::{DEFAULT_MODEL as DEFAULT_GEMINI_MODEL, GeminiGenerator};
pub use murf::{DEFAULT_API_URL as DEFAULT_MURF_API_URL, MurfSynthesizer};

use async_trait::async_trait;
use serde::Serialize;

use crate::chat::{ConversationTurn, build_prompt};
use crate::Result;

/// Text recognized from an audio payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcription {
    pub text: String,
    /// Provider confidence in `0.0..=1.0`, when reported
    pub confidence: Option<f64>,
}

/// Speech-to-text provider
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe raw audio bytes
    ///
    /// # Errors
    ///
    /// Returns error if the provider rejects the audio or is unreachable
    async fn transcribe(&self, audio: &[u8]) -> Result<Transcription>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Language model that produces the next utterance
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate a reply for a free-form prompt
    ///
    /// # Errors
    ///
    /// Returns error if generation fails
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate the next assistant utterance for a conversation
    ///
    /// # Errors
    ///
    /// Returns error if generation fails
    async fn generate_with_history(&self, history: &[ConversationTurn]) -> Result<String> {
        let prompt = build_prompt(history);
        tracing::debug!(turns = history.len(), "generating reply with history");
        self.generate(&prompt).await
    }

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Text-to-speech provider returning a reference to hosted audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with the given voice and return the audio URL
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails or no audio reference is returned
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Build an HTTP client with a per-request deadline
pub(crate) fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| crate::Error::Config(format!("failed to create HTTP client: {e}")))
}
