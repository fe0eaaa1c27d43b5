//! `Responder` implementation shared by both transports (§4.12, §6, §9).
//!
//! Grounded on the teacher's `websocket::WsMessage` tagged-enum wire
//! protocol and its `Arc<Mutex<SplitSink>>`-wrapped sender, generalized so
//! the same frame writer backs both the streaming-chat socket and the
//! voice socket; the two differ only in `streaming`, which the engine
//! reads via `supports_streaming()` to pick `LlmClient::stream` vs.
//! `LlmClient::complete` (§9 open question 1).

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::SinkExt;
use pregnancy_core::responder::{CalendarSuggestion, ResponderError};
use pregnancy_core::turn::ConversationId;
use pregnancy_core::Responder;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Matches §6's literal wire shapes: `{"type":"message","content":"..."}`,
/// `{"type":"calendar","data":{...}}`, `{"type":"error","message":"..."}`,
/// `{"type":"done"}`. `conversation_id` has no prescribed frame in §6; it is
/// shaped the same way for consistency.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutboundFrame<'a> {
    ConversationId { id: ConversationId },
    Message { content: &'a str },
    Calendar { data: &'a CalendarSuggestion },
    Error { message: &'a str },
    Done,
}

pub struct WsResponder {
    sender: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    streaming: bool,
}

impl WsResponder {
    pub fn new(sender: Arc<Mutex<SplitSink<WebSocket, Message>>>, streaming: bool) -> Self {
        Self { sender, streaming }
    }

    async fn send_frame(&self, frame: &OutboundFrame<'_>) -> Result<(), ResponderError> {
        let text = serde_json::to_string(frame).map_err(|e| ResponderError(e.to_string()))?;
        self.sender
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| ResponderError(e.to_string()))
    }
}

#[async_trait]
impl Responder for WsResponder {
    async fn send_message(&self, chunk: &str) -> Result<(), ResponderError> {
        self.send_frame(&OutboundFrame::Message { content: chunk }).await
    }

    async fn send_calendar_suggestion(&self, suggestion: &CalendarSuggestion) -> Result<(), ResponderError> {
        self.send_frame(&OutboundFrame::Calendar { data: suggestion }).await
    }

    async fn send_error(&self, message: &str) -> Result<(), ResponderError> {
        self.send_frame(&OutboundFrame::Error { message }).await
    }

    async fn send_done(&self) -> Result<(), ResponderError> {
        self.send_frame(&OutboundFrame::Done).await
    }

    async fn set_conversation_id(&self, id: ConversationId) -> Result<(), ResponderError> {
        self.send_frame(&OutboundFrame::ConversationId { id }).await
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }
}
