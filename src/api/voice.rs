//! Single-provider voice endpoints: voices, speech, transcription, one-shot query
//!
//! These routes call the providers directly without sessions or fallback
//! replies. Failures surface as HTTP errors.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiState, read_upload};
use crate::chat::{DEFAULT_VOICE_ID, messages, truncate_for_log, with_deadline};

/// Build voice router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/voices", get(voices))
        .route("/generate-speech", post(generate_speech))
        .route("/transcribe/file", post(transcribe_file))
        .route("/llm/query", post(llm_query))
        .with_state(state)
}

/// A selectable synthesis voice
#[derive(Debug, Serialize)]
pub struct VoiceInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub language: &'static str,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
}

const VOICES: [VoiceInfo; 3] = [
    VoiceInfo {
        id: "en-US-ken",
        name: "Ken (US English)",
        language: "en-US",
    },
    VoiceInfo {
        id: "en-US-sarah",
        name: "Sarah (US English)",
        language: "en-US",
    },
    VoiceInfo {
        id: "en-GB-oliver",
        name: "Oliver (UK English)",
        language: "en-GB",
    },
];

/// List available voices
async fn voices() -> Json<VoicesResponse> {
    Json(VoicesResponse {
        voices: VOICES.into(),
    })
}

/// Speech generation request
#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// Speech generation response
#[derive(Debug, Serialize)]
pub struct SpeechResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    pub message: String,
}

/// Synthesize text and return the hosted audio URL
///
/// Provider failures are reported in the body with `success: false`.
async fn generate_speech(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SpeechRequest>,
) -> Result<Json<SpeechResponse>, VoiceError> {
    if request.text.trim().is_empty() {
        return Err(VoiceError::BadRequest("Empty text"));
    }

    let orchestrator = &state.orchestrator;
    let voice_id = request.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
    tracing::info!(voice_id, text = %truncate_for_log(&request.text), "generating speech");

    let synthesizer = orchestrator.synthesizer();
    let result = with_deadline(
        synthesizer.name(),
        orchestrator.settings().tts_timeout,
        synthesizer.synthesize(&request.text, voice_id),
    )
    .await;

    let response = match result {
        Ok(url) if !url.trim().is_empty() => SpeechResponse {
            success: true,
            audio_url: Some(url),
            message: "Speech generated successfully!".to_string(),
        },
        Ok(_) => SpeechResponse {
            success: false,
            audio_url: None,
            message: "Failed to generate speech".to_string(),
        },
        Err(e) => {
            tracing::error!(error = %e, "error generating speech");
            SpeechResponse {
                success: false,
                audio_url: None,
                message: format!("Error: {e}"),
            }
        }
    };

    Ok(Json(response))
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
    pub status: &'static str,
    pub confidence: Option<f64>,
}

/// Transcribe an uploaded audio file
async fn transcribe_file(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<TranscribeResponse>, VoiceError> {
    let audio = read_upload(&mut multipart)
        .await
        .map_err(|e| VoiceError::InvalidUpload(e.to_string()))?;

    let transcriber = state.orchestrator.transcriber();
    let transcription = with_deadline(
        transcriber.name(),
        state.orchestrator.settings().stt_timeout,
        transcriber.transcribe(&audio),
    )
    .await
    .map_err(|e| VoiceError::TranscriptionFailed(e.to_string()))?;

    Ok(Json(TranscribeResponse {
        transcript: transcription.text,
        status: "completed",
        confidence: transcription.confidence,
    }))
}

/// One-shot query response
#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub transcription: String,
    pub llm_reply: String,
    pub murf_audio_url: String,
}

/// Transcribe, answer, and speak a single question without session history
async fn llm_query(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<QueryResponse>, VoiceError> {
    let audio = read_upload(&mut multipart)
        .await
        .map_err(|e| VoiceError::InvalidUpload(e.to_string()))?;

    let orchestrator = &state.orchestrator;
    let settings = orchestrator.settings();
    let (transcriber, generator, synthesizer) = (
        orchestrator.transcriber(),
        orchestrator.generator(),
        orchestrator.synthesizer(),
    );

    let transcription = with_deadline(
        transcriber.name(),
        settings.stt_timeout,
        transcriber.transcribe(&audio),
    )
    .await
    .map_err(|e| VoiceError::TranscriptionFailed(e.to_string()))?;
    if transcription.text.trim().is_empty() {
        return Err(VoiceError::TranscriptionFailed(
            messages::EMPTY_TRANSCRIPTION.to_string(),
        ));
    }
    tracing::info!(text = %truncate_for_log(&transcription.text), "transcribed query");

    let reply = with_deadline(
        generator.name(),
        settings.llm_timeout,
        generator.generate(&transcription.text),
    )
    .await
    .map_err(|e| VoiceError::GenerationFailed(e.to_string()))?;
    if reply.trim().is_empty() {
        return Err(VoiceError::GenerationFailed("LLM returned empty response".to_string()));
    }
    tracing::info!(reply = %truncate_for_log(&reply), "generated query reply");

    let audio_url = with_deadline(
        synthesizer.name(),
        settings.tts_timeout,
        synthesizer.synthesize(&reply, &settings.voice_id),
    )
    .await
    .map_err(|e| VoiceError::SynthesisFailed(e.to_string()))?;

    Ok(Json(QueryResponse {
        transcription: transcription.text,
        llm_reply: reply,
        murf_audio_url: audio_url,
    }))
}

/// Voice API errors
#[derive(Debug)]
pub enum VoiceError {
    BadRequest(&'static str),
    InvalidUpload(String),
    TranscriptionFailed(String),
    GenerationFailed(String),
    SynthesisFailed(String),
}

impl IntoResponse for VoiceError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.to_string()),
            Self::InvalidUpload(msg) => (StatusCode::BAD_REQUEST, "invalid_upload", msg),
            Self::TranscriptionFailed(msg) => {
                (StatusCode::BAD_REQUEST, "transcription_failed", msg)
            }
            Self::GenerationFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "generation_failed", msg)
            }
            Self::SynthesisFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "synthesis_failed", msg)
            }
        };

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
