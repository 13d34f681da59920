//! WebSocket echo endpoint for connectivity checks

use axum::{
    Router,
    extract::{
        WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};

/// Build websocket router
pub fn router() -> Router {
    Router::new().route("/ws", get(ws_handler))
}

async fn ws_handler(ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(handle_socket)
}

/// Echo every text frame back with an `Echo: ` prefix
async fn handle_socket(socket: WebSocket) {
    tracing::info!("websocket connection established");
    let (mut sender, mut receiver) = socket.split();

    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, "websocket receive error");
                break;
            }
        };

        match msg {
            Message::Text(text) => {
                tracing::debug!(text = %text.as_str(), "websocket message received");
                let reply = echo(text.as_str());
                if sender.send(Message::Text(reply.into())).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    tracing::info!("websocket connection closed");
}

fn echo(text: &str) -> String {
    format!("Echo: {text}")
}
