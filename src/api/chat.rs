//! Conversational chat endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    middleware,
    routing::{get, post},
};
use serde::Serialize;

use super::{ApiState, auth::require_api_key, read_upload};
use crate::chat::{ConversationTurn, OrchestrationResult, read_error};

/// Build chat router
///
/// Session administration routes require the API key when one is configured.
pub fn router(state: Arc<ApiState>) -> Router {
    let admin = Router::new()
        .route(
            "/agent/chat/{session_id}/history",
            get(get_history).delete(clear_history),
        )
        .route("/agent/sessions", get(list_sessions))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key));

    Router::new()
        .route("/agent/chat/{session_id}", post(agent_chat))
        .merge(admin)
        .with_state(state)
}

/// Chat turn response
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub transcription: String,
    pub llm_reply: String,
    pub murf_audio_url: Option<String>,
    pub error: Option<String>,
    pub details: Option<String>,
}

impl From<OrchestrationResult> for ChatResponse {
    fn from(result: OrchestrationResult) -> Self {
        Self {
            transcription: result.transcription,
            llm_reply: result.reply,
            murf_audio_url: result.audio_reference,
            error: result.error.map(|kind| kind.as_str().to_string()),
            details: result.details,
        }
    }
}

/// Run one voice chat turn for a session
///
/// Always answers 200; failures are described in the body.
async fn agent_chat(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<ChatResponse> {
    let audio = match multipart {
        Ok(mut multipart) => read_upload(&mut multipart).await,
        Err(rejection) => Err(read_error(rejection.body_text())),
    };

    let result = state.orchestrator.process_turn(&session_id, audio).await;
    Json(result.into())
}

/// Conversation history for a session
async fn get_history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<Vec<ConversationTurn>> {
    Json(state.orchestrator.history(&session_id))
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

/// Forget a session's history
async fn clear_history(
    State(state): State<Arc<ApiState>>,
    Path(session_id): Path<String>,
) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.orchestrator.clear_history(&session_id),
    })
}

/// Identifiers of sessions with history
async fn list_sessions(State(state): State<Arc<ApiState>>) -> Json<Vec<String>> {
    Json(state.orchestrator.active_sessions().into_iter().collect())
}
