//! Multi-turn voice chat
//!
//! One chat turn runs audio through three external providers in order:
//! speech-to-text, reply generation, and text-to-speech. The
//! [`ChatOrchestrator`] owns that ordering and the fallback policy; the
//! [`SessionStore`] keeps per-session conversation history in memory.

mod audio;
mod orchestrator;
mod prompt;
mod session;

pub use audio::{AudioFormat, AudioInfo, AudioSource, read_error, truncate_for_log};
pub use orchestrator::{ChatOrchestrator, ChatSettings, DEFAULT_VOICE_ID, messages};
pub(crate) use orchestrator::with_deadline;
pub use prompt::build_prompt;
pub use session::{SessionHistory, SessionStore};

use serde::{Deserialize, Serialize};

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Lowercase wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    /// Capitalized name used as a speaker label in prompts
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
        }
    }
}

/// One utterance within a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

impl ConversationTurn {
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    #[must_use]
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }
}

/// Pipeline step that failed during a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Audio could not be read from the caller
    ReadFailed,
    /// Transcription failed or came back empty
    SttFailed,
    /// Reply generation failed or came back empty
    LlmFailed,
    /// Anything not handled at a step boundary
    UnexpectedFailure,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReadFailed => "read_failed",
            Self::SttFailed => "stt_failed",
            Self::LlmFailed => "llm_failed",
            Self::UnexpectedFailure => "unexpected_failure",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one chat turn
///
/// Always fully populated. `error` and `details` are `None` only when every
/// step up to reply generation succeeded; a missing `audio_reference` alone
/// means speech synthesis failed and the caller should fall back to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub transcription: String,
    pub reply: String,
    pub audio_reference: Option<String>,
    pub error: Option<ErrorKind>,
    pub details: Option<String>,
}

impl OrchestrationResult {
    /// Whether the turn produced a genuine reply
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::UnexpectedFailure).unwrap();
        assert_eq!(json, "\"unexpected_failure\"");
        assert_eq!(ErrorKind::SttFailed.to_string(), "stt_failed");
    }

    #[test]
    fn test_turn_wire_format() {
        let turn = ConversationTurn::assistant("hi there");
        let json = serde_json::to_value(&turn).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["text"], "hi there");
    }
}
