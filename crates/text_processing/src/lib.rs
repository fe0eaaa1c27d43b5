//! Deterministic, pure text processing for the conversation engine:
//! intent classification (C1), PII redaction (C2), and symptom extraction
//! (C4). None of these modules perform I/O, hold mutable state, or call
//! out to a model — every function is a total, side-effect-free
//! transformation over its input, matching §4's "deterministic" framing
//! for all three components.

pub mod intent;
pub mod pii;
pub mod symptom;

pub use intent::classify;
pub use pii::{contains_pii, redact, sanitize_for_api, sanitize_for_logging, PIIEntity, PIIType};
pub use symptom::extract;
