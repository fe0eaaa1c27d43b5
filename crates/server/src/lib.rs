//! Conversation engine server
//!
//! Bootstraps tracing, configuration, the repository/LLM client, and the
//! `ConversationEngine`, then serves the streaming-chat WebSocket and the
//! voice transport over one shared router (§6, C13).

pub mod error;
pub mod http;
pub mod metrics;
pub mod responder;
pub mod state;
pub mod voice;
pub mod websocket;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;
