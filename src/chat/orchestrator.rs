//! Chat turn orchestration: STT -> LLM -> TTS with fallbacks

use std::any::Any;
use std::collections::BTreeSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use super::audio::{AudioInfo, AudioSource, truncate_for_log};
use super::{ConversationTurn, ErrorKind, OrchestrationResult, SessionStore};
use crate::providers::{ReplyGenerator, SpeechSynthesizer, Transcriber};
use crate::{Error, Result};

/// Fixed replies used when a turn cannot produce a genuine answer
pub mod messages {
    pub const READ_FAILED: &str = "I'm having trouble receiving your audio right now.";
    pub const STT_FAILED: &str = "I'm having trouble hearing you right now.";
    pub const LLM_FAILED: &str = "I'm having trouble thinking right now.";
    pub const UNEXPECTED_FAILURE: &str = "I'm having trouble connecting right now.";

    pub const EMPTY_TRANSCRIPTION: &str = "Transcription returned empty text";
    pub const EMPTY_REPLY: &str = "LLM service returned empty response";
}

/// Default Murf voice for replies and fallback messages
pub const DEFAULT_VOICE_ID: &str = "en-US-ken";

/// Voice and per-provider deadlines for chat turns
#[derive(Debug, Clone)]
pub struct ChatSettings {
    /// Voice used for every synthesized reply
    pub voice_id: String,
    pub stt_timeout: Duration,
    pub llm_timeout: Duration,
    pub tts_timeout: Duration,
    /// Deadline for speaking a fallback message
    pub fallback_tts_timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            voice_id: DEFAULT_VOICE_ID.to_string(),
            stt_timeout: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(30),
            tts_timeout: Duration::from_secs(30),
            fallback_tts_timeout: Duration::from_secs(15),
        }
    }
}

/// Drives one request/response turn per call across the three providers
///
/// [`process_turn`](Self::process_turn) never fails: every failure becomes
/// an [`OrchestrationResult`] carrying a fixed apology, a best-effort audio
/// reference for it, and the [`ErrorKind`] of the step that broke.
pub struct ChatOrchestrator {
    sessions: Arc<SessionStore>,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    #[must_use]
    pub fn new(
        sessions: Arc<SessionStore>,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            sessions,
            transcriber,
            generator,
            synthesizer,
            settings: ChatSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub const fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    #[must_use]
    pub const fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub const fn transcriber(&self) -> &Arc<dyn Transcriber> {
        &self.transcriber
    }

    #[must_use]
    pub const fn generator(&self) -> &Arc<dyn ReplyGenerator> {
        &self.generator
    }

    #[must_use]
    pub const fn synthesizer(&self) -> &Arc<dyn SpeechSynthesizer> {
        &self.synthesizer
    }

    /// Run one chat turn for `session_id`
    pub async fn process_turn<A: AudioSource>(
        &self,
        session_id: &str,
        audio: A,
    ) -> OrchestrationResult {
        tracing::info!(session_id, "processing chat turn");

        let outcome = AssertUnwindSafe(self.run_turn(session_id, audio))
            .catch_unwind()
            .await;

        let details = match outcome {
            Ok(Ok(result)) => return result,
            Ok(Err(e)) => failure_details(&e),
            Err(panic) => panic_message(&*panic),
        };

        tracing::error!(session_id, error = %details, "error in chat interaction");
        self.fallback(
            String::new(),
            messages::UNEXPECTED_FAILURE,
            ErrorKind::UnexpectedFailure,
            details,
        )
        .await
    }

    /// Conversation so far; empty for unknown sessions
    #[must_use]
    pub fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        self.sessions.history(session_id)
    }

    /// Forget a session; `true` if it existed
    pub fn clear_history(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id)
    }

    #[must_use]
    pub fn active_sessions(&self) -> BTreeSet<String> {
        self.sessions.list_active()
    }

    /// The pipeline proper
    ///
    /// Step failures are turned into fallback results here. Anything that
    /// escapes via `Err` is handled as an unexpected failure by the caller.
    async fn run_turn<A: AudioSource>(
        &self,
        session_id: &str,
        audio: A,
    ) -> Result<OrchestrationResult> {
        let audio = match audio.read_audio().await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(session_id, error = %e, "error reading audio");
                return Ok(self
                    .fallback(
                        String::new(),
                        messages::READ_FAILED,
                        ErrorKind::ReadFailed,
                        failure_details(&e),
                    )
                    .await);
            }
        };
        log_audio(session_id, &audio);

        let user_text = match self.transcribe(&audio).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session_id, error = %e, "transcription failed");
                return Ok(self
                    .fallback(
                        String::new(),
                        messages::STT_FAILED,
                        ErrorKind::SttFailed,
                        failure_details(&e),
                    )
                    .await);
            }
        };
        tracing::info!(session_id, text = %truncate_for_log(&user_text), "user said");

        if session_id.is_empty() {
            return Err(Error::SessionNotFound("<empty session id>".to_string()));
        }

        let session = self.sessions.get_or_create(session_id);
        let generated = {
            let _turn = session.lock_turn().await;

            self.sessions
                .append_to(&session, ConversationTurn::user(user_text.as_str()))?;

            let generated = AssertUnwindSafe(self.generate(&session.turns()))
                .catch_unwind()
                .await;

            // A failed or panicked generation is still recorded so the
            // history keeps alternating and the next prompt sees it
            let recorded = match &generated {
                Ok(Ok(reply)) => reply.as_str(),
                Ok(Err(_)) | Err(_) => messages::LLM_FAILED,
            };
            self.sessions
                .append_to(&session, ConversationTurn::assistant(recorded))?;

            match generated {
                Ok(generated) => generated,
                Err(panic) => return Err(Error::Llm(panic_message(&*panic))),
            }
        };

        let reply = match generated {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session_id, error = %e, "reply generation failed");
                return Ok(self
                    .fallback(
                        user_text,
                        messages::LLM_FAILED,
                        ErrorKind::LlmFailed,
                        failure_details(&e),
                    )
                    .await);
            }
        };
        tracing::info!(session_id, reply = %truncate_for_log(&reply), "assistant replied");

        let audio_reference = match self.synthesize(&reply, self.settings.tts_timeout).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(session_id, error = %e, "TTS failed, continuing with text response");
                None
            }
        };

        Ok(OrchestrationResult {
            transcription: user_text,
            reply,
            audio_reference,
            error: None,
            details: None,
        })
    }

    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let transcription = with_deadline(
            self.transcriber.name(),
            self.settings.stt_timeout,
            self.transcriber.transcribe(audio),
        )
        .await?;

        if transcription.text.trim().is_empty() {
            return Err(Error::Stt(messages::EMPTY_TRANSCRIPTION.to_string()));
        }

        tracing::debug!(confidence = ?transcription.confidence, "transcription received");
        Ok(transcription.text)
    }

    async fn generate(&self, history: &[ConversationTurn]) -> Result<String> {
        let reply = with_deadline(
            self.generator.name(),
            self.settings.llm_timeout,
            self.generator.generate_with_history(history),
        )
        .await?;

        if reply.trim().is_empty() {
            return Err(Error::Llm(messages::EMPTY_REPLY.to_string()));
        }
        Ok(reply)
    }

    async fn synthesize(&self, text: &str, limit: Duration) -> Result<String> {
        let url = with_deadline(
            self.synthesizer.name(),
            limit,
            self.synthesizer.synthesize(text, &self.settings.voice_id),
        )
        .await?;

        if url.trim().is_empty() {
            return Err(Error::Tts("synthesizer returned no audio reference".to_string()));
        }
        Ok(url)
    }

    /// Build a degraded result, speaking `message` if the synthesizer allows
    async fn fallback(
        &self,
        transcription: String,
        message: &str,
        kind: ErrorKind,
        details: String,
    ) -> OrchestrationResult {
        let spoken = AssertUnwindSafe(self.synthesize(message, self.settings.fallback_tts_timeout))
            .catch_unwind()
            .await;

        let audio_reference = match spoken {
            Ok(Ok(url)) => Some(url),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "fallback audio generation failed");
                None
            }
            Err(panic) => {
                tracing::error!(
                    error = %panic_message(&*panic),
                    "fallback audio generation panicked"
                );
                None
            }
        };

        OrchestrationResult {
            transcription,
            reply: message.to_string(),
            audio_reference,
            error: Some(kind),
            details: Some(details),
        }
    }
}

/// Await a provider call, turning an overrun into `Error::Timeout`
pub(crate) async fn with_deadline<T>(
    provider: &'static str,
    limit: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| Error::Timeout {
            provider,
            elapsed: limit,
        })?
}

fn log_audio(session_id: &str, audio: &[u8]) {
    let info = AudioInfo::inspect(audio);
    tracing::debug!(
        session_id,
        size_bytes = info.size_bytes,
        format = info.format.as_str(),
        header = info.header_hex.as_deref().unwrap_or("n/a"),
        "read audio upload"
    );

    if info.looks_like_text {
        tracing::warn!(session_id, "audio upload looks like text, not binary audio");
    }
}

/// Provider errors are reported by their message alone
fn failure_details(e: &Error) -> String {
    match e {
        Error::Audio(msg) | Error::Stt(msg) | Error::Llm(msg) | Error::Tts(msg) => msg.clone(),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .map_or_else(
            || "provider panicked".to_string(),
            |msg| format!("provider panicked: {msg}"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*payload), "provider panicked: boom");

        let payload: Box<dyn Any + Send> = Box::new(String::from("kaboom"));
        assert_eq!(panic_message(&*payload), "provider panicked: kaboom");

        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(&*payload), "provider panicked");
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let err = with_deadline("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, Error>(())
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::Timeout { provider: "slow", .. }));
    }

    #[test]
    fn test_failure_details_strip_prefix() {
        let empty = Error::Stt(messages::EMPTY_TRANSCRIPTION.to_string());
        assert_eq!(failure_details(&empty), "Transcription returned empty text");

        let missing = Error::SessionNotFound("s1".to_string());
        assert_eq!(failure_details(&missing), "session not found: s1");
    }

    #[test]
    fn test_default_settings() {
        let settings = ChatSettings::default();
        assert_eq!(settings.voice_id, "en-US-ken");
        assert!(settings.fallback_tts_timeout < settings.tts_timeout);
    }
}
