//! Shared error type returned by core, pure-logic operations.

use thiserror::Error;

/// Errors that can arise from core domain invariants (confidence clamping,
/// period arithmetic, etc). Infrastructure errors (database, HTTP, LLM) live
/// in their own crates and convert into the orchestrator's `EngineError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("invalid confidence value: {0} (must be in [0.0, 1.0])")]
    InvalidConfidence(f32),

    #[error("unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("unknown symptom kind: {0}")]
    UnknownSymptomKind(String),
}

pub type Result<T> = std::result::Result<T, Error>;
