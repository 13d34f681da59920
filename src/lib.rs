//! Parley Gateway - Voice chat backend for conversational assistants
//!
//! This library provides the core functionality for the Parley gateway:
//! - Multi-turn voice chat (STT, reply generation, TTS) with fallback replies
//! - In-memory per-session conversation history
//! - Provider clients for `AssemblyAI`, Gemini, and Murf
//! - HTTP API for browser clients
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     HTTP API                         │
//! │   /agent/chat  │  /llm/query  │  /generate-speech   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Chat Orchestrator                    │
//! │   Sessions  │  Prompt  │  Fallbacks  │  Deadlines   │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    Providers                         │
//! │   AssemblyAI (STT)  │  Gemini (LLM)  │  Murf (TTS)  │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod providers;

pub use chat::{
    AudioSource, ChatOrchestrator, ChatSettings, ConversationTurn, ErrorKind,
    OrchestrationResult, Role, SessionStore,
};
pub use config::Config;
pub use error::{Error, Result};
pub use providers::{ReplyGenerator, SpeechSynthesizer, Transcriber, Transcription};
