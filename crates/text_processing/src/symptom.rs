//! Symptom Extractor (C4, §4.4).
//!
//! Grounded on the teacher's `dst::extractor::SlotExtractor`: a table of
//! `(Regex, value)` pairs built once in `new()`, one table per field. Here
//! the fields are symptom triggers, severity adverbs, frequency phrases,
//! and onset patterns, restyled from the teacher's gold-loan slots
//! (amount/weight/lender) to the pregnancy-symptom domain.

use once_cell::sync::Lazy;
use pregnancy_core::{Frequency, Severity, SymptomKind, SymptomRecord, UserId};
use regex::Regex;

struct TriggerRule {
    kind: SymptomKind,
    pattern: Regex,
}

fn rule(kind: SymptomKind, pattern: &str) -> TriggerRule {
    TriggerRule {
        kind,
        pattern: Regex::new(pattern).expect("valid symptom trigger pattern"),
    }
}

static TRIGGERS: Lazy<Vec<TriggerRule>> = Lazy::new(|| {
    vec![
        rule(SymptomKind::NauseaVomiting, r"(?i)\b(nause(?:a|ous)|vomit(?:ing|ed)?|throwing up|morning sickness)\b"),
        rule(SymptomKind::Fatigue, r"(?i)\b(fatigue(?:d)?|exhaust(?:ed|ion)|tired(?:ness)?|no energy)\b"),
        rule(SymptomKind::Bleeding, r"(?i)\b(bleed(?:ing)?|spotting)\b"),
        rule(SymptomKind::Headache, r"(?i)\b(headache(?:s)?|migraine(?:s)?)\b"),
        rule(SymptomKind::Dizziness, r"(?i)\b(dizz(?:y|iness)|light-?headed|faint(?:ing)?)\b"),
        rule(SymptomKind::SwellingEdema, r"(?i)\b(swelling|swollen|edema|puffy (?:feet|ankles|hands))\b"),
        rule(SymptomKind::AbdominalPain, r"(?i)\b(abdominal pain|stomach pain|belly pain|abdominal cramp(?:ing|s)?|stomach cramp(?:ing|s)?)\b"),
        rule(SymptomKind::BackPain, r"(?i)\b(back pain|backache|my back hurts)\b"),
        rule(SymptomKind::Heartburn, r"(?i)\b(heartburn|acid reflux|indigestion)\b"),
        rule(SymptomKind::Constipation, r"(?i)\b(constipat(?:ed|ion))\b"),
        rule(SymptomKind::Contractions, r"(?i)\b(contraction(?:s)?|braxton hicks)\b"),
        rule(SymptomKind::VisionChanges, r"(?i)\b(blurry vision|vision (?:change|changes|problems)|seeing spots|flashing lights)\b"),
        rule(SymptomKind::ShortnessOfBreath, r"(?i)\b(shortness of breath|short of breath|can't catch my breath|breathless)\b"),
        rule(SymptomKind::FrequentUrination, r"(?i)\b(frequent urination|peeing (?:a lot|constantly)|having to pee)\b"),
        rule(SymptomKind::LegCramps, r"(?i)\b(leg cramp(?:s)?|charley horse)\b"),
        rule(SymptomKind::BreastTenderness, r"(?i)\b(breast tenderness|sore breasts|tender breasts)\b"),
        rule(SymptomKind::FoodAversion, r"(?i)\b(food aversion|can't stand the (?:smell|taste) of|off my food)\b"),
        rule(SymptomKind::MoodChanges, r"(?i)\b(mood swings|mood changes|feeling (?:anxious|irritable|weepy|low))\b"),
    ]
});

static SEVERE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(severe(?:ly)?|excruciating|unbearable|intense|extreme(?:ly)?|very bad|worst)\b").unwrap()
});
static MILD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(mild(?:ly)?|slight(?:ly)?|a little|bit of|minor)\b").unwrap()
});

static CONSTANT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(constant(?:ly)?|all the time|non-?stop|all day)\b").unwrap());
static DAILY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(every day|daily|each morning|each night)\b").unwrap());
static FREQUENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(frequently|often|a lot|several times)\b").unwrap());
static ONCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(once|one time|just (?:now|today)|this (?:morning|afternoon|evening))\b").unwrap());

static ONSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(since (?:yesterday|this morning|last night|last week|[a-z]+ weeks? ago)|for (?:the (?:past|last) )?\d+ (?:day|days|week|weeks)|started (?:yesterday|today|this week))\b").unwrap()
});

fn detect_severity(text: &str) -> Severity {
    if SEVERE.is_match(text) {
        Severity::Severe
    } else if MILD.is_match(text) {
        Severity::Mild
    } else {
        Severity::Moderate
    }
}

fn detect_frequency(text: &str) -> Frequency {
    if CONSTANT.is_match(text) {
        Frequency::Constant
    } else if DAILY.is_match(text) {
        Frequency::Daily
    } else if FREQUENT.is_match(text) {
        Frequency::Frequent
    } else if ONCE.is_match(text) {
        Frequency::Once
    } else {
        Frequency::Occasional
    }
}

fn detect_onset(text: &str) -> String {
    ONSET
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// `extract(user, text) -> Vec<SymptomRecord>` (§4.4): every distinct
/// symptom kind mentioned in `text` becomes one record, with the
/// severity/frequency/onset heuristics applied against the whole turn
/// (not per-match), and every *other* kind found in the same turn listed
/// as `associated`. Deterministic and pure — no network calls, no shared
/// state beyond the immutable trigger tables.
pub fn extract(user: &UserId, text: &str) -> Vec<SymptomRecord> {
    let mut kinds: Vec<SymptomKind> = Vec::new();
    for trigger in TRIGGERS.iter() {
        if trigger.pattern.is_match(text) && !kinds.contains(&trigger.kind) {
            kinds.push(trigger.kind);
        }
    }

    if kinds.is_empty() {
        return Vec::new();
    }

    let severity = detect_severity(text);
    let frequency = detect_frequency(text);
    let onset = detect_onset(text);

    kinds
        .iter()
        .map(|&kind| {
            let associated: Vec<SymptomKind> =
                kinds.iter().copied().filter(|&k| k != kind).collect();
            let mut record = SymptomRecord::new(user.clone(), kind, text);
            record.severity = severity;
            record.frequency = frequency;
            record.onset = onset.clone();
            record.associated = associated;
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        "u1".to_string()
    }

    #[test]
    fn no_trigger_returns_empty() {
        assert!(extract(&user(), "I'm feeling great today").is_empty());
    }

    #[test]
    fn detects_single_symptom() {
        let records = extract(&user(), "I have a headache");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, SymptomKind::Headache);
    }

    #[test]
    fn severe_bleeding_is_flagged() {
        let records = extract(&user(), "I have severe bleeding right now");
        assert_eq!(records[0].severity, Severity::Severe);
        assert!(records[0].is_red_flag(&[]));
    }

    #[test]
    fn severe_headache_with_vision_changes_co_reported_is_red_flag() {
        let records = extract(&user(), "severe headache and blurry vision");
        let kinds: Vec<SymptomKind> = records.iter().map(|r| r.kind).collect();
        assert!(kinds.contains(&SymptomKind::Headache));
        assert!(kinds.contains(&SymptomKind::VisionChanges));
        let headache = records.iter().find(|r| r.kind == SymptomKind::Headache).unwrap();
        assert!(headache.is_red_flag(&kinds));
    }

    #[test]
    fn mild_symptom_is_not_red_flag() {
        let records = extract(&user(), "just a mild headache today");
        assert_eq!(records[0].severity, Severity::Mild);
        assert!(!records[0].is_red_flag(&[]));
    }

    #[test]
    fn multiple_symptoms_cross_reference_as_associated() {
        let records = extract(&user(), "I have nausea and fatigue and a headache");
        assert_eq!(records.len(), 3);
        for record in &records {
            assert_eq!(record.associated.len(), 2);
            assert!(!record.associated.contains(&record.kind));
        }
    }

    #[test]
    fn constant_frequency_detected() {
        let records = extract(&user(), "constant back pain all the time");
        assert_eq!(records[0].frequency, Frequency::Constant);
    }

    #[test]
    fn onset_phrase_captured() {
        let records = extract(&user(), "I've had leg cramps since last night");
        assert!(records[0].onset.to_lowercase().contains("since"));
    }

    #[test]
    fn extract_is_pure() {
        let a = extract(&user(), "severe abdominal pain");
        let b = extract(&user(), "severe abdominal pain");
        assert_eq!(a.len(), b.len());
        assert_eq!(a[0].kind, b[0].kind);
        assert_eq!(a[0].severity, b[0].severity);
    }
}
