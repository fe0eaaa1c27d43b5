//! Chat-completion client (C9) and prompt builder (C8) for the
//! conversation engine.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{ChatChunk, ChatRequest, ChatResponse, LlmClient};
pub use error::LlmError;
pub use prompt::{Message, PromptBuilder, PromptInput};
