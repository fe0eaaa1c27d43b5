//! User and system-setting entities.
//!
//! The core only *reads* users: they are created by an external auth
//! component (§3) and are immutable to the engine apart from usage counters
//! (owned by `pregnancy_core::subscription::UsageCounter`, not by `User`
//! itself).

use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Opaque user identifier, issued by the external auth component.
pub type UserId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub preferred_language: Language,
    pub is_admin: bool,
    /// Foreign key into the subscription table; the engine resolves the
    /// *current* subscription for quota purposes rather than trusting a
    /// cached plan here.
    pub subscription_id: String,
}

/// A single row of the `(key, value)` system setting map. The engine only
/// ever reads the `ai_name` key (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSetting {
    pub key: String,
    pub value: String,
}

pub const AI_NAME_SETTING_KEY: &str = "ai_name";
