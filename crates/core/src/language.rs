//! Supported conversation languages.
//!
//! §6 requires at least {en, es, fr}; the set is otherwise open so a new
//! market can be added without touching the engine's control flow.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A BCP-47-ish language code. We keep the set small and explicit rather
/// than accepting arbitrary strings everywhere, so callers get a compile
/// error instead of a silently-ignored unsupported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    English,
    Spanish,
    French,
    /// Any other locale the transport passes through; the engine degrades
    /// to an explicit "respond in <code> if possible" instruction and falls
    /// back to English catalogue entries.
    Other,
}

impl Language {
    /// Parse a raw language code as received from the transport.
    pub fn parse(code: &str) -> (Self, String) {
        let normalized = code.trim().to_lowercase();
        let lang = match normalized.as_str() {
            "en" | "en-us" | "en-gb" => Language::English,
            "es" | "es-es" | "es-mx" => Language::Spanish,
            "fr" | "fr-fr" | "fr-ca" => Language::French,
            _ => Language::Other,
        };
        (lang, normalized)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::Other => "other",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::English
    }
}
