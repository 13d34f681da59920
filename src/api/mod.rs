//! HTTP API server for parley gateway

mod auth;
pub mod chat;
pub mod health;
pub mod voice;
pub mod websocket;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::multipart::Multipart;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::chat::{ChatOrchestrator, read_error};
use crate::Result;

/// Largest accepted upload (audio files are sent whole)
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Multipart field carrying the audio file
const UPLOAD_FIELD: &str = "file";

/// Shared state for API handlers
pub struct ApiState {
    pub orchestrator: Arc<ChatOrchestrator>,
    /// Bearer key for session administration; open access when `None`
    pub api_key: Option<String>,
}

impl ApiState {
    #[must_use]
    pub const fn new(orchestrator: Arc<ChatOrchestrator>, api_key: Option<String>) -> Self {
        Self {
            orchestrator,
            api_key,
        }
    }
}

/// Read the uploaded audio file from a multipart body
///
/// # Errors
///
/// Returns `Error::Audio` if the body is malformed or has no `file` field
pub async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>> {
    while let Some(field) = multipart.next_field().await.map_err(read_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        tracing::debug!(
            filename = field.file_name().unwrap_or("unknown"),
            content_type = field.content_type().unwrap_or("unknown"),
            "reading uploaded audio"
        );
        let bytes = field.bytes().await.map_err(read_error)?;
        return Ok(bytes.to_vec());
    }

    Err(read_error(format!("no '{UPLOAD_FIELD}' field in upload")))
}

/// API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
    static_dir: Option<PathBuf>,
}

impl ApiServer {
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self {
            state,
            port,
            static_dir: None,
        }
    }

    /// Set the static files directory for serving the web UI
    #[must_use]
    pub fn static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    /// Build the router with all routes
    #[must_use]
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .merge(chat::router(self.state.clone()))
            .merge(voice::router(self.state.clone()))
            .merge(websocket::router())
            .merge(health::router());

        // Serve static files if configured
        if let Some(static_dir) = &self.static_dir {
            let index_file = static_dir.join("index.html");
            let serve_dir =
                ServeDir::new(static_dir).not_found_service(ServeFile::new(&index_file));

            router = router.fallback_service(serve_dir);
            tracing::info!(path = %static_dir.display(), "serving static files");
        }

        // CORS layer for cross-origin requests from the browser UI
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        router
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| crate::Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
