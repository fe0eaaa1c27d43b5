//! Core domain types and traits for the pregnancy support conversation engine.
//!
//! This crate provides the foundational vocabulary shared by every other
//! crate in the workspace:
//! - persisted entities (§3 of the design): users, conversations, turns,
//!   facts, symptom records, subscriptions, plans, usage counters
//! - in-memory-only state: conversation state, short-term memory window
//! - the `Repository`, `LlmProvider`, and `Responder` trait seams that let
//!   the orchestrator stay generic over storage, the LLM vendor, and the
//!   transport

pub mod error;
pub mod fallback;
pub mod fact;
pub mod intent;
pub mod language;
pub mod responder;
pub mod subscription;
pub mod symptom;
pub mod turn;
pub mod user;

pub use error::{Error, Result};
pub use fallback::{FallbackAction, FallbackEntry};
pub use fact::Fact;
pub use intent::{Classification, Intent};
pub use language::Language;
pub use responder::{CalendarSuggestion, Priority, Responder};
pub use subscription::{Feature, Plan, PlanFeature, QuotaLimit, QuotaPeriod, Subscription, SubscriptionStatus, UsageCounter};
pub use symptom::{Frequency, Severity, SymptomKind, SymptomRecord};
pub use turn::{Conversation, ConversationId, ConversationState, Role, ShortTermMemory, Turn, TurnId};
pub use user::{SystemSetting, User, UserId};
