//! The `Responder` capability (§4.12, §6, §9): the seam that lets the engine
//! stay generic over the streaming-chat transport and the voice transport.

use crate::turn::ConversationId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// The shape pushed to the client for a suggested (never auto-created)
/// calendar entry (§4.10, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarSuggestion {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    pub suggested_time: DateTime<Utc>,
    pub priority: Priority,
}

/// Errors a `Responder` implementation can surface while pushing data to a
/// transport. The orchestrator treats any of these as "the client is gone"
/// and abandons the rest of the turn rather than retrying.
#[derive(Debug, thiserror::Error)]
#[error("responder send failed: {0}")]
pub struct ResponderError(pub String);

/// Operations the engine uses to push data back to whichever transport
/// accepted the connection (§4.12). Implemented once per transport
/// (streaming-chat WebSocket, voice) so the orchestrator never needs to know
/// which one it is talking to.
#[async_trait]
pub trait Responder: Send + Sync {
    /// Push one chunk of assistant text. Called once per delta while
    /// streaming, or exactly once with the full text for a blocking call
    /// (§4.12 step 16).
    async fn send_message(&self, chunk: &str) -> Result<(), ResponderError>;

    /// Push a calendar suggestion. Sent before the LLM call starts when the
    /// suggester fires (§4.12 step 10).
    async fn send_calendar_suggestion(&self, suggestion: &CalendarSuggestion) -> Result<(), ResponderError>;

    /// Push a user-visible error frame. Never reveals infrastructure
    /// details (§7) — callers pass catalogue or validation text only.
    async fn send_error(&self, message: &str) -> Result<(), ResponderError>;

    /// Signal that this turn is complete. Exactly one `done` follows the
    /// last `message` frame for every successful turn (§8 invariant 5).
    async fn send_done(&self) -> Result<(), ResponderError>;

    /// Notify the transport of the (possibly newly created) conversation id
    /// (§4.12 step 1).
    async fn set_conversation_id(&self, id: ConversationId) -> Result<(), ResponderError>;

    /// Whether this transport can consume an incremental stream of chunks.
    /// Voice transports that must synthesize a single utterance typically
    /// answer `false` and accumulate server-side instead (§6, §9 open
    /// question 1).
    fn supports_streaming(&self) -> bool {
        true
    }
}
