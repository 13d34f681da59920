//! Configuration management for Parley gateway
//!
//! Values are resolved in order: environment variable, config file, default.

pub mod file;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::{ChatSettings, DEFAULT_VOICE_ID};
use crate::providers::{DEFAULT_GEMINI_MODEL, DEFAULT_MURF_API_URL};
use crate::{Error, Result};

use file::ParleyConfigFile;

/// Default API server port
pub const DEFAULT_PORT: u16 = 8000;

/// Parley gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API keys
    pub api_keys: ApiKeys,

    /// Provider endpoints and voice
    pub providers: ProviderConfig,

    /// Per-provider call deadlines
    pub timeouts: TimeoutConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `AssemblyAI` API key (STT)
    pub assemblyai: Option<String>,

    /// Google Gemini API key (reply generation)
    pub gemini: Option<String>,

    /// Murf API key (TTS)
    pub murf: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| if key.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("ApiKeys")
            .field("assemblyai", &redact(&self.assemblyai))
            .field("gemini", &redact(&self.gemini))
            .field("murf", &redact(&self.murf))
            .finish()
    }
}

/// Provider endpoints and defaults
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Murf speech generation endpoint
    pub murf_api_url: String,

    /// Gemini model identifier
    pub gemini_model: String,

    /// Voice for synthesized replies
    pub voice_id: String,
}

/// Deadlines applied to each provider call
#[derive(Debug, Clone, Copy)]
pub struct TimeoutConfig {
    pub stt: Duration,
    pub llm: Duration,
    pub tts: Duration,
    pub fallback_tts: Duration,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// API key for session administration endpoints (from `PARLEY_API_KEY` env)
    pub api_key: Option<String>,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the config file
    ///
    /// A `.env` file in the working directory is loaded first if present.
    ///
    /// # Errors
    ///
    /// Returns error if a numeric setting cannot be parsed
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, reading the config file from `path` when given
    ///
    /// # Errors
    ///
    /// Returns error if a numeric setting cannot be parsed
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "loaded .env file"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
        }

        let file = path.map_or_else(file::load_config_file, file::load_config_file_from);
        Self::from_sources(file, |key| std::env::var(key).ok())
    }

    /// Build configuration from a parsed config file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a numeric setting cannot be parsed
    pub fn from_sources(
        file: ParleyConfigFile,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let api_keys = ApiKeys {
            assemblyai: env("ASSEMBLYAI_API_KEY").or(file.api_keys.assemblyai),
            gemini: env("GEMINI_API_KEY").or(file.api_keys.gemini),
            murf: env("MURF_API_KEY").or(file.api_keys.murf),
        };

        let providers = ProviderConfig {
            murf_api_url: env("MURF_API_URL")
                .or(file.providers.murf_api_url)
                .unwrap_or_else(|| DEFAULT_MURF_API_URL.to_string()),
            gemini_model: env("GEMINI_MODEL")
                .or(file.providers.gemini_model)
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            voice_id: env("PARLEY_VOICE_ID")
                .or(file.providers.voice_id)
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
        };

        let defaults = ChatSettings::default();
        let secs = |key: &str, from_file: Option<u64>, default: Duration| -> Result<Duration> {
            let value = match env(key) {
                Some(raw) => Some(raw.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("invalid {key} value {raw:?}: {e}"))
                })?),
                None => from_file,
            };
            match value {
                Some(0) => Err(Error::Config(format!("{key} must be greater than zero"))),
                Some(n) => Ok(Duration::from_secs(n)),
                None => Ok(default),
            }
        };

        let timeouts = TimeoutConfig {
            stt: secs("PARLEY_STT_TIMEOUT_SECS", file.timeouts.stt_secs, defaults.stt_timeout)?,
            llm: secs("PARLEY_LLM_TIMEOUT_SECS", file.timeouts.llm_secs, defaults.llm_timeout)?,
            tts: secs("PARLEY_TTS_TIMEOUT_SECS", file.timeouts.tts_secs, defaults.tts_timeout)?,
            fallback_tts: secs(
                "PARLEY_FALLBACK_TTS_TIMEOUT_SECS",
                file.timeouts.fallback_tts_secs,
                defaults.fallback_tts_timeout,
            )?,
        };

        let port = match env("PARLEY_PORT").or_else(|| env("PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| Error::Config(format!("invalid port {raw:?}: {e}")))?,
            None => file.server.port.unwrap_or(DEFAULT_PORT),
        };

        let api_server = ApiServerConfig {
            port,
            api_key: env("PARLEY_API_KEY").or(file.server.api_key),
            static_dir: env("PARLEY_STATIC_DIR")
                .or(file.server.static_dir)
                .map(PathBuf::from),
        };

        Ok(Self {
            api_keys,
            providers,
            timeouts,
            api_server,
        })
    }

    /// Ensure every provider has an API key
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` naming each missing key
    pub fn require_keys(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("ASSEMBLYAI_API_KEY", &self.api_keys.assemblyai),
            ("GEMINI_API_KEY", &self.api_keys.gemini),
            ("MURF_API_KEY", &self.api_keys.murf),
        ]
        .into_iter()
        .filter(|(_, key)| key.is_none())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "missing API keys: {}",
                missing.join(", ")
            )))
        }
    }

    /// Chat pipeline settings derived from this configuration
    #[must_use]
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            voice_id: self.providers.voice_id.clone(),
            stt_timeout: self.timeouts.stt,
            llm_timeout: self.timeouts.llm,
            tts_timeout: self.timeouts.tts,
            fallback_tts_timeout: self.timeouts.fallback_tts,
        }
    }
}
