//! Calendar Suggester (C10, §4.10).
//!
//! Grounded on the teacher's `voice-agent-tools::domain_tools::tools::appointment`
//! plain-data-shape convention (a struct plus a priority enum), without the
//! teacher's LLM tool-calling registry — nothing here is invoked by the
//! model; the orchestrator calls these two pure functions directly.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use pregnancy_core::{CalendarSuggestion, Intent, Priority};
use regex::Regex;

/// Result of [`should_suggest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestDecision {
    pub suggest: bool,
    pub priority: Priority,
}

static URGENT_KEYWORDS: [&str; 3] = ["bleeding", "severe pain", "vision loss"];

static CONTRACTIONS_APART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)contraction[s]?.{0,20}\b(\d+)\s*min").expect("valid contraction-interval pattern"));

fn is_urgent(message: &str) -> bool {
    let lower = message.to_lowercase();
    URGENT_KEYWORDS.iter().any(|kw| lower.contains(kw)) || CONTRACTIONS_APART.is_match(message)
}

/// `should_suggest(intent, message) -> {suggest, priority}` (§4.10): never
/// for small talk or pregnancy questions; always for scheduling; for
/// symptom reports, escalated to `urgent` on a matching keyword.
pub fn should_suggest(intent: Intent, message: &str) -> SuggestDecision {
    match intent {
        Intent::SymptomReport => {
            let priority = if is_urgent(message) { Priority::Urgent } else { Priority::High };
            SuggestDecision { suggest: true, priority }
        }
        Intent::SchedulingRelated => SuggestDecision { suggest: true, priority: Priority::Medium },
        Intent::SmallTalk | Intent::PregnancyQuestion | Intent::Unclear => {
            SuggestDecision { suggest: false, priority: Priority::Low }
        }
    }
}

/// `build_suggestion(intent, message) -> {type, title, description,
/// suggested_time, priority}` (§4.10). Only ever describes a suggestion —
/// never creates a reminder itself.
pub fn build_suggestion(intent: Intent, message: &str) -> CalendarSuggestion {
    let decision = should_suggest(intent, message);
    let now = Utc::now();

    match intent {
        Intent::SymptomReport if decision.priority == Priority::Urgent => CalendarSuggestion {
            kind: "urgent_care".to_string(),
            title: "Seek urgent care".to_string(),
            description: "Your reported symptoms warrant prompt medical attention within 24 hours.".to_string(),
            suggested_time: now + Duration::hours(24),
            priority: decision.priority,
        },
        Intent::SymptomReport => CalendarSuggestion {
            kind: "monitoring".to_string(),
            title: "Monitor symptom".to_string(),
            description: "Keep an eye on this and mention it at your next appointment.".to_string(),
            suggested_time: tomorrow_9am(now),
            priority: decision.priority,
        },
        _ => CalendarSuggestion {
            kind: "appointment".to_string(),
            title: "Schedule appointment".to_string(),
            description: "Follow up on your scheduling request.".to_string(),
            suggested_time: tomorrow_9am(now),
            priority: decision.priority,
        },
    }
}

fn tomorrow_9am(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + Duration::days(1))
        .date_naive()
        .and_hms_opt(9, 0, 0)
        .expect("9am is always valid")
        .and_utc()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_suggests_for_small_talk_or_pregnancy_question() {
        assert!(!should_suggest(Intent::SmallTalk, "hi").suggest);
        assert!(!should_suggest(Intent::PregnancyQuestion, "how big is my baby").suggest);
    }

    #[test]
    fn symptom_report_escalates_to_urgent_on_keyword() {
        let decision = should_suggest(Intent::SymptomReport, "I have severe bleeding");
        assert!(decision.suggest);
        assert_eq!(decision.priority, Priority::Urgent);
    }

    #[test]
    fn symptom_report_without_urgent_keyword_is_high_priority() {
        let decision = should_suggest(Intent::SymptomReport, "I have a mild headache");
        assert!(decision.suggest);
        assert_eq!(decision.priority, Priority::High);
    }

    #[test]
    fn contractions_close_together_are_urgent() {
        let decision = should_suggest(Intent::SymptomReport, "my contractions are 4 min apart");
        assert_eq!(decision.priority, Priority::Urgent);
    }

    #[test]
    fn scheduling_related_suggests_medium_priority() {
        let decision = should_suggest(Intent::SchedulingRelated, "can I reschedule my appointment");
        assert!(decision.suggest);
        assert_eq!(decision.priority, Priority::Medium);
    }

    #[test]
    fn urgent_suggestion_offset_is_within_24h() {
        let suggestion = build_suggestion(Intent::SymptomReport, "severe bleeding");
        let delta = suggestion.suggested_time - Utc::now();
        assert!(delta <= Duration::hours(24) && delta > Duration::hours(23));
    }
}
