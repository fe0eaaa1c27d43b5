//! Conversation engine orchestrator for the pregnancy support assistant.
//!
//! Ties the deterministic building blocks from `pregnancy-core` and
//! `pregnancy-text-processing` together with the stateful pieces owned by
//! this crate: short-term/session memory (C3), the rate limiter (C6), the
//! circuit breaker (C7), the calendar suggester (C10), the fallback
//! catalogue (C11), the quota & feature gate (C5), and finally the
//! `ConversationEngine` itself (C12), which drives one turn end to end.

pub mod calendar;
pub mod circuit_breaker;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod memory;
pub mod quota;
pub mod rate_limit;

pub use circuit_breaker::{CircuitBreaker, CircuitCallError};
pub use engine::{ConversationEngine, EngineConfig, EngineRequest};
pub use error::EngineError;
pub use memory::MemoryStore;
pub use rate_limit::RateLimiter;
