//! Fallback catalogue entry shape (C11). The catalogue data itself lives in
//! `pregnancy_agent::fallback` since populating it is an application
//! concern, not a core type concern — this module only fixes the shape.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    Retry,
    ContactSupport,
    Emergency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub content: String,
    pub action: FallbackAction,
}

impl FallbackEntry {
    pub fn new(content: impl Into<String>, action: FallbackAction) -> Self {
        Self {
            content: content.into(),
            action,
        }
    }
}
