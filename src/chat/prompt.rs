//! Prompt construction from conversation history

use super::{ConversationTurn, Role};

/// Build a transcript-style prompt from the full history
///
/// Each turn becomes `"<Role>: <text>"` on its own line, followed by a
/// trailing `"Assistant:"` line that cues the next utterance.
#[must_use]
pub fn build_prompt(history: &[ConversationTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.label(), turn.text))
        .chain(std::iter::once(format!("{}:", Role::Assistant.label())))
        .collect::<Vec<_>>()
        .join("\n")
}
