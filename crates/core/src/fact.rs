//! Confidence-weighted user facts (§3): `(user, key)` is unique; writes are
//! upserts that keep the higher confidence (invariant 6 in §8).

use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Recognized fact keys the engine writes itself. Callers may still store
/// arbitrary free-form keys (§3: "keys are free-form") — these constants
/// just name the ones the engine's own rule layer produces.
pub const FACT_PREGNANCY_WEEK: &str = "pregnancy_week";
pub const FACT_DIET: &str = "diet";
pub const FACT_EXERCISE: &str = "exercise";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    pub user: UserId,
    pub key: String,
    pub value: String,
    pub confidence: f32,
    pub updated_at: DateTime<Utc>,
}

impl Fact {
    pub fn new(user: UserId, key: impl Into<String>, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            user,
            key: key.into(),
            value: value.into(),
            confidence: confidence.clamp(0.0, 1.0),
            updated_at: Utc::now(),
        }
    }

    /// Apply the "keep higher confidence" tie-break used by
    /// `save_or_update_fact` (§4.5, §9): only overwrite when the incoming
    /// confidence is strictly greater than the existing one.
    pub fn merge_keeping_higher_confidence(existing: Option<&Fact>, incoming: Fact) -> Fact {
        match existing {
            Some(existing) if existing.confidence >= incoming.confidence => existing.clone(),
            _ => incoming,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_higher_confidence() {
        let low = Fact::new("u1".into(), FACT_PREGNANCY_WEEK, "10", 0.5);
        let high = Fact::new("u1".into(), FACT_PREGNANCY_WEEK, "14", 0.8);

        let merged = Fact::merge_keeping_higher_confidence(Some(&low), high.clone());
        assert_eq!(merged.value, "14");

        let merged_back = Fact::merge_keeping_higher_confidence(Some(&high), low);
        assert_eq!(merged_back.value, "14", "lower confidence must not overwrite");
    }

    #[test]
    fn merge_with_no_existing_takes_incoming() {
        let incoming = Fact::new("u1".into(), FACT_DIET, "vegetarian", 0.6);
        let merged = Fact::merge_keeping_higher_confidence(None, incoming.clone());
        assert_eq!(merged, incoming);
    }
}
