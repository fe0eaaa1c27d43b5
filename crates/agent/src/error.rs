//! The only error type that crosses the orchestrator boundary back to a
//! transport (§7's propagation table). Every other failure mode described
//! in §7 — quota denied, feature absent, LLM timeout/error, circuit open,
//! validation — is absorbed in-band as a responder frame, not an `Err`
//! here; this type only carries the two genuinely fatal cases: persistence
//! failure on the user turn, and a dead responder.

use pregnancy_core::responder::ResponderError;
use pregnancy_persistence::PersistenceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Responder(#[from] ResponderError),
}
