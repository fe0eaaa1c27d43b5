//! Streaming-chat WebSocket transport (§6, C13).
//!
//! Grounded on the teacher's `websocket::WebSocketHandler`: upgrade on a
//! per-user path, split the socket into a shared sender and a receive
//! loop, and drive one `ConversationEngine::process` call per inbound
//! text frame. Unlike the teacher's audio-frame protocol this transport
//! only ever exchanges JSON text frames — there is no audio codec in
//! scope (§1 non-goals: "the LLM vendor's wire protocol").

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use pregnancy_agent::EngineRequest;
use pregnancy_core::{ConversationId, UserId};

use crate::responder::WsResponder;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct InboundMessage {
    message: String,
    #[serde(default)]
    conversation_id: Option<ConversationId>,
    #[serde(default = "default_language")]
    language: String,
}

fn default_language() -> String {
    "en".to_string()
}

/// `GET /ws/:user_id` upgrade handler.
pub async fn handle(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, StatusCode> {
    if !state.rate_limiter.check_ip(&addr.ip().to_string()) || !state.rate_limiter.check_user(&user_id) {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, state, true)))
}

/// Shared by [`handle`] (streaming) and the voice transport (non-streaming):
/// splits the socket, reads JSON frames, and feeds them to the engine one
/// turn at a time.
pub(crate) async fn handle_socket(
    socket: axum::extract::ws::WebSocket,
    user_id: UserId,
    state: AppState,
    streaming: bool,
) {
    let (sender, mut receiver) = socket.split();
    let sender = Arc::new(Mutex::new(sender));
    let responder = WsResponder::new(sender.clone(), streaming);
    let connection_id = Uuid::new_v4().to_string();

    while let Some(next) = receiver.next().await {
        let msg = match next {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(error = %e, user = %user_id, "websocket receive error, closing connection");
                break;
            }
        };

        let text = match msg {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => continue,
        };

        let inbound: InboundMessage = match serde_json::from_str(&text) {
            Ok(inbound) => inbound,
            Err(e) => {
                tracing::debug!(error = %e, user = %user_id, "dropping malformed inbound frame");
                let _ = responder.send_error("malformed request").await;
                continue;
            }
        };

        if !state.rate_limiter.check_connection(&connection_id) {
            let _ = responder
                .send_error("You're sending messages too quickly. Please slow down.")
                .await;
            continue;
        }

        let request = EngineRequest {
            user: user_id.clone(),
            conversation_id: inbound.conversation_id,
            message: inbound.message,
            language_code: inbound.language,
        };

        let started = std::time::Instant::now();
        crate::metrics::record_turn_started();
        match state.engine.process(request, &responder).await {
            Ok(_) => crate::metrics::record_turn_duration(started.elapsed().as_secs_f64()),
            Err(e) => {
                crate::metrics::record_turn_failed("engine_error");
                tracing::warn!(error = %e, user = %user_id, "turn processing failed; closing connection");
                break;
            }
        }
    }
}
