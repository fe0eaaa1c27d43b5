//! Intent Classifier (C1, §4.1).
//!
//! A pure, stateless function over `(text, language)`: compiled keyword
//! tables keyed by language, evaluated in a fixed priority order. Grounded
//! on the teacher's `intent::IntentDetector` shape (a struct holding
//! compiled `regex::Regex` tables, built once in `new()`), narrowed to a
//! closed intent set that the orchestrator matches on directly rather than
//! a runtime-editable `Vec<Intent>` — this classifier's intent set is fixed
//! by §4.1, so the `RwLock<Vec<Intent>>` the teacher uses for
//! config-driven domains is unnecessary here.

use once_cell::sync::Lazy;
use pregnancy_core::{Classification, Intent, Language};
use regex::Regex;

struct KeywordTable {
    symptom: Regex,
    scheduling: Regex,
    pregnancy_question: Regex,
    small_talk: Regex,
}

fn build(patterns: [&str; 4]) -> KeywordTable {
    KeywordTable {
        symptom: Regex::new(patterns[0]).expect("valid symptom pattern"),
        scheduling: Regex::new(patterns[1]).expect("valid scheduling pattern"),
        pregnancy_question: Regex::new(patterns[2]).expect("valid pregnancy pattern"),
        small_talk: Regex::new(patterns[3]).expect("valid small-talk pattern"),
    }
}

static ENGLISH: Lazy<KeywordTable> = Lazy::new(|| {
    build([
        r"(?i)\b(bleed(?:ing)?|cramp(?:s|ing)?|pain|ache|nause(?:a|ous)|vomit(?:ing)?|dizzy|dizziness|headache|swelling|spotting|contraction|fever|hurts?)\b",
        r"(?i)\b(appointment|schedule|reschedule|book(?:ing)?|reminder|calendar|visit|check-?up|next (?:appointment|visit))\b",
        r"(?i)\b(pregnan(?:t|cy)|trimester|baby|fetus|due date|week[s]?\s*(?:pregnant)?|ultrasound|prenatal)\b",
        r"(?i)\b(hi|hello|hey|thanks|thank you|good (?:morning|afternoon|evening)|how are you|bye|goodbye)\b",
    ])
});

static SPANISH: Lazy<KeywordTable> = Lazy::new(|| {
    build([
        r"(?i)\b(sangrado|sangrar|cólicos?|dolor|n[áa]usea(?:s)?|v[oó]mito(?:s)?|mareo(?:s)?|dolor de cabeza|hinchaz[oó]n|contracci[oó]n(?:es)?|fiebre)\b",
        r"(?i)\b(cita|agendar|reagendar|reservar|recordatorio|calendario|visita|chequeo)\b",
        r"(?i)\b(embarazo|embarazada|trimestre|beb[ée]|feto|semanas? de embarazo|ecograf[ií]a|prenatal)\b",
        r"(?i)\b(hola|gracias|buenos d[ií]as|buenas tardes|buenas noches|c[oó]mo est[aá]s|adi[oó]s)\b",
    ])
});

static FRENCH: Lazy<KeywordTable> = Lazy::new(|| {
    build([
        r"(?i)\b(saignement(?:s)?|saigner|crampe(?:s)?|douleur(?:s)?|naus[ée]e(?:s)?|vomissement(?:s)?|vertige(?:s)?|mal de t[êe]te|gonflement|contraction(?:s)?|fi[èe]vre)\b",
        r"(?i)\b(rendez-vous|planifier|reprogrammer|r[ée]server|rappel|calendrier|visite)\b",
        r"(?i)\b(enceinte|grossesse|trimestre|b[ée]b[ée]|f[œoe]tus|semaines? de grossesse|[ée]chographie|pr[ée]natal)\b",
        r"(?i)\b(bonjour|salut|merci|bonsoir|comment (?:ça|ca) va|au revoir)\b",
    ])
});

fn table_for(language: Language) -> &'static KeywordTable {
    match language {
        Language::English | Language::Other => &ENGLISH,
        Language::Spanish => &SPANISH,
        Language::French => &FRENCH,
    }
}

/// `classify(text, language) -> {intent, confidence}` (§4.1). Pure: no
/// network calls, no state, no per-call allocation beyond the match
/// itself. Evaluation order is fixed: `symptom_report` outranks
/// `scheduling_related` outranks `pregnancy_question` outranks
/// `small_talk`; empty/whitespace input is `unclear` at confidence 1.0.
pub fn classify(text: &str, language: Language) -> Classification {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Classification::new(Intent::Unclear, 1.0);
    }

    let table = table_for(language);

    if table.symptom.is_match(trimmed) {
        return Classification::new(Intent::SymptomReport, 0.9);
    }
    if table.scheduling.is_match(trimmed) {
        return Classification::new(Intent::SchedulingRelated, 0.85);
    }
    if table.pregnancy_question.is_match(trimmed) {
        return Classification::new(Intent::PregnancyQuestion, 0.8);
    }
    if table.small_talk.is_match(trimmed) {
        return Classification::new(Intent::SmallTalk, 0.75);
    }

    Classification::new(Intent::Unclear, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_unclear_at_full_confidence() {
        let c = classify("   ", Language::English);
        assert_eq!(c.intent, Intent::Unclear);
        assert_eq!(c.confidence, 1.0);
    }

    #[test]
    fn symptom_outranks_pregnancy_question() {
        let c = classify("I'm pregnant and have severe bleeding", Language::English);
        assert_eq!(c.intent, Intent::SymptomReport);
    }

    #[test]
    fn scheduling_outranks_pregnancy_question() {
        let c = classify("can I book an appointment about my pregnancy", Language::English);
        assert_eq!(c.intent, Intent::SchedulingRelated);
    }

    #[test]
    fn small_talk_is_lowest_priority() {
        let c = classify("hello there", Language::English);
        assert_eq!(c.intent, Intent::SmallTalk);
    }

    #[test]
    fn classify_is_pure() {
        let a = classify("I have a headache", Language::English);
        let b = classify("I have a headache", Language::English);
        assert_eq!(a, b);
    }

    #[test]
    fn spanish_symptom_keywords() {
        let c = classify("tengo sangrado y dolor", Language::Spanish);
        assert_eq!(c.intent, Intent::SymptomReport);
    }

    #[test]
    fn french_scheduling_keywords() {
        let c = classify("je voudrais prendre un rendez-vous", Language::French);
        assert_eq!(c.intent, Intent::SchedulingRelated);
    }

    #[test]
    fn unrecognized_text_is_unclear() {
        let c = classify("xyzzy plugh", Language::English);
        assert_eq!(c.intent, Intent::Unclear);
    }
}
