//! Voice transport (§6, §9 open question 1).
//!
//! Identical wire protocol and connection lifecycle to the streaming-chat
//! transport, but answers `supports_streaming() == false`: the engine
//! calls `LlmClient::complete` instead of `LlmClient::stream` and the
//! responder accumulates the assistant's reply server-side before pushing
//! it as a single frame, matching "accumulates chunks into a final
//! utterance" (§6). Audio capture/synthesis is out of scope (§1 non-goals:
//! "the LLM vendor's wire protocol"); the caller is expected to have
//! already transcribed the utterance to text before it reaches this
//! transport.

use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use pregnancy_core::UserId;

use crate::state::AppState;
use crate::websocket::handle_socket;

/// `GET /voice/:user_id` upgrade handler.
pub async fn handle(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
) -> Result<Response, StatusCode> {
    if !state.rate_limiter.check_ip(&addr.ip().to_string()) || !state.rate_limiter.check_user(&user_id) {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, state, false)))
}
