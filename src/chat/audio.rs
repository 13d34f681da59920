//! Audio input acquisition and inspection

use async_trait::async_trait;

use crate::{Error, Result};

/// Maximum characters of user/assistant text written to logs
const LOG_TEXT_LIMIT: usize = 100;

/// Source of the raw audio bytes for one chat turn
///
/// Reading may fail (e.g. a broken upload stream); the orchestrator turns
/// that into a `read_failed` result instead of propagating it.
#[async_trait]
pub trait AudioSource: Send {
    /// Consume the source and return its bytes
    ///
    /// # Errors
    ///
    /// Returns error if the audio cannot be read
    async fn read_audio(self) -> Result<Vec<u8>>;
}

#[async_trait]
impl AudioSource for Vec<u8> {
    async fn read_audio(self) -> Result<Vec<u8>> {
        Ok(self)
    }
}

#[async_trait]
impl AudioSource for &'static [u8] {
    async fn read_audio(self) -> Result<Vec<u8>> {
        Ok(self.to_vec())
    }
}

/// An upload that was already read, successfully or not
#[async_trait]
impl AudioSource for Result<Vec<u8>> {
    async fn read_audio(self) -> Result<Vec<u8>> {
        self
    }
}

/// Container format guessed from leading magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Ogg,
    Flac,
    WebM,
    Unknown,
}

impl AudioFormat {
    /// Guess the container format from the first bytes of a file
    #[must_use]
    pub fn sniff(data: &[u8]) -> Self {
        match data {
            [b'R', b'I', b'F', b'F', ..] => Self::Wav,
            [b'I', b'D', b'3', ..] | [0xff, 0xfb | 0xf3 | 0xf2, ..] => Self::Mp3,
            [b'O', b'g', b'g', b'S', ..] => Self::Ogg,
            [b'f', b'L', b'a', b'C', ..] => Self::Flac,
            [0x1a, 0x45, 0xdf, 0xa3, ..] => Self::WebM,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::WebM => "webm",
            Self::Unknown => "unknown",
        }
    }
}

/// Diagnostic summary of an uploaded audio payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    pub size_bytes: usize,
    pub format: AudioFormat,
    /// Hex dump of the first ten bytes, if there are that many
    pub header_hex: Option<String>,
    /// Payload decodes as plain ASCII, which real audio never does
    pub looks_like_text: bool,
}

impl AudioInfo {
    #[must_use]
    pub fn inspect(data: &[u8]) -> Self {
        let header_hex = data.get(..10).map(|head| {
            head.iter().map(|b| format!("{b:02x}")).collect::<String>()
        });

        Self {
            size_bytes: data.len(),
            format: AudioFormat::sniff(data),
            header_hex,
            looks_like_text: !data.is_empty() && data.is_ascii(),
        }
    }
}

/// Shorten text for log output without splitting a character
#[must_use]
pub fn truncate_for_log(text: &str) -> String {
    if text.is_empty() {
        return "empty".to_string();
    }

    let total = text.chars().count();
    if total <= LOG_TEXT_LIMIT {
        return text.to_string();
    }

    let head: String = text.chars().take(LOG_TEXT_LIMIT).collect();
    format!("{head}... (truncated from {total} chars)")
}

/// Wrap a transport read error as an audio error
pub fn read_error(e: impl std::fmt::Display) -> Error {
    Error::Audio(e.to_string())
}
