//! Shared test utilities

#![allow(dead_code)]

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use parley_gateway::{
    ChatOrchestrator, ChatSettings, Error, ReplyGenerator, Result, SessionStore,
    SpeechSynthesizer, Transcriber, Transcription,
};

pub const AUDIO_URL: &str = "https://x/audio.mp3";

/// What a stub provider does when called
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Return(T),
    Fail(&'static str),
    Panic,
    /// Never completes within any test deadline
    Hang,
}

impl<T: Clone> Outcome<T> {
    async fn resolve(&self, provider: &'static str) -> Result<T> {
        match self {
            Self::Return(value) => Ok(value.clone()),
            Self::Fail(message) => Err(Error::Tts(format!("{provider}: {message}"))),
            Self::Panic => panic!("{provider} exploded"),
            Self::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Err(Error::Tts(format!("{provider} woke up")))
            }
        }
    }
}

/// Transcriber stub returning a fixed outcome
pub struct StubTranscriber {
    outcome: Outcome<String>,
}

impl StubTranscriber {
    pub fn new(outcome: Outcome<String>) -> Self {
        Self { outcome }
    }

    pub fn text(text: &str) -> Self {
        Self::new(Outcome::Return(text.to_string()))
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<Transcription> {
        let text = self.outcome.resolve("stub-stt").await?;
        Ok(Transcription {
            text,
            confidence: Some(0.9),
        })
    }

    fn name(&self) -> &'static str {
        "stub-stt"
    }
}

/// Reply generator stub that records every prompt it receives
pub struct StubGenerator {
    outcome: Outcome<String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn new(outcome: Outcome<String>) -> Self {
        Self {
            outcome,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(reply: &str) -> Self {
        Self::new(Outcome::Return(reply.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ReplyGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.resolve("stub-llm").await
    }

    fn name(&self) -> &'static str {
        "stub-llm"
    }
}

/// Speech synthesizer stub
///
/// `primary` applies to every text except the configured fallback phrases,
/// which use `fallback`.
pub struct StubSynthesizer {
    primary: Outcome<String>,
    fallback: Outcome<String>,
    spoken: Mutex<Vec<(String, String)>>,
}

impl StubSynthesizer {
    pub fn new(primary: Outcome<String>, fallback: Outcome<String>) -> Self {
        Self {
            primary,
            fallback,
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn url(url: &str) -> Self {
        Self::new(Outcome::Return(url.to_string()), Outcome::Return(url.to_string()))
    }

    /// `(text, voice_id)` for every synthesis request
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

fn is_fallback_phrase(text: &str) -> bool {
    use parley_gateway::chat::messages;

    [
        messages::READ_FAILED,
        messages::STT_FAILED,
        messages::LLM_FAILED,
        messages::UNEXPECTED_FAILURE,
    ]
    .contains(&text)
}

#[async_trait]
impl SpeechSynthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String> {
        self.spoken
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((text.to_string(), voice_id.to_string()));

        if is_fallback_phrase(text) {
            self.fallback.resolve("stub-tts").await
        } else {
            self.primary.resolve("stub-tts").await
        }
    }

    fn name(&self) -> &'static str {
        "stub-tts"
    }
}

/// Short deadlines so timeout tests finish quickly
pub fn fast_settings() -> ChatSettings {
    ChatSettings {
        stt_timeout: Duration::from_millis(200),
        llm_timeout: Duration::from_millis(200),
        tts_timeout: Duration::from_millis(200),
        fallback_tts_timeout: Duration::from_millis(100),
        ..ChatSettings::default()
    }
}

/// Build an orchestrator over stub providers
pub fn orchestrator(
    transcriber: StubTranscriber,
    generator: Arc<StubGenerator>,
    synthesizer: Arc<StubSynthesizer>,
) -> ChatOrchestrator {
    ChatOrchestrator::new(
        Arc::new(SessionStore::new()),
        Arc::new(transcriber),
        generator,
        synthesizer,
    )
    .with_settings(fast_settings())
}

/// Orchestrator whose providers all succeed: "hello" -> "hi there" -> `AUDIO_URL`
pub fn happy_orchestrator() -> ChatOrchestrator {
    orchestrator(
        StubTranscriber::text("hello"),
        Arc::new(StubGenerator::reply("hi there")),
        Arc::new(StubSynthesizer::url(AUDIO_URL)),
    )
}
