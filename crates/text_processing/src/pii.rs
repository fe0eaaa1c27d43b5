//! PII Redactor (C2, §4.2).
//!
//! Grounded on the teacher's `core::pii` module (`voice-agent-rust` sibling
//! tree): a closed `PIIType` enum, a `PIIEntity` describing a single match
//! span, and a fixed `RedactionStrategy` per type. That teacher module is
//! tuned for India-specific identifiers (Aadhaar, PAN); this one keeps the
//! same entity/strategy shape but narrows detection to the identifier
//! classes named in §4.2: email addresses, phone numbers, US Social
//! Security numbers, payment card numbers, and medical record numbers.

use once_cell::sync::Lazy;
use regex::Regex;

/// The closed set of PII categories this redactor recognizes (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PIIType {
    Email,
    Phone,
    SocialSecurityNumber,
    CardNumber,
    MedicalRecordNumber,
}

impl PIIType {
    /// The fixed replacement token substituted for every match of this
    /// type (§4.2: redaction is type-tagged, not a single generic mask).
    pub fn replacement_token(&self) -> &'static str {
        match self {
            PIIType::Email => "[EMAIL]",
            PIIType::Phone => "[PHONE]",
            PIIType::SocialSecurityNumber => "[SSN]",
            PIIType::CardNumber => "[CARD]",
            PIIType::MedicalRecordNumber => "[MEDICAL_ID]",
        }
    }
}

/// A single detected PII span, prior to redaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PIIEntity {
    pub pii_type: PIIType,
    pub start: usize,
    pub end: usize,
    pub matched_text: String,
}

struct Detector {
    pii_type: PIIType,
    pattern: Regex,
}

static DETECTORS: Lazy<Vec<Detector>> = Lazy::new(|| {
    vec![
        Detector {
            pii_type: PIIType::Email,
            pattern: Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").unwrap(),
        },
        Detector {
            pii_type: PIIType::SocialSecurityNumber,
            pattern: Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap(),
        },
        Detector {
            pii_type: PIIType::CardNumber,
            pattern: Regex::new(r"\b(?:\d[ -]?){13,19}\b").unwrap(),
        },
        Detector {
            pii_type: PIIType::MedicalRecordNumber,
            pattern: Regex::new(r"(?i)\bMRN[:\s#-]*\d{5,10}\b").unwrap(),
        },
        Detector {
            pii_type: PIIType::Phone,
            pattern: Regex::new(
                r"\b(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]\d{3}[-.\s]\d{4}\b|\b\d{3}[-.\s]\d{4}\b",
            )
            .unwrap(),
        },
    ]
});

/// Find every PII span in `text`, in left-to-right order, without
/// overlaps — once a byte range is claimed by one detector, later
/// detectors skip it (a card-number match absorbs digits a phone-number
/// pattern might otherwise also match).
fn detect(text: &str) -> Vec<PIIEntity> {
    let mut claimed: Vec<(usize, usize)> = Vec::new();
    let mut entities = Vec::new();

    for detector in DETECTORS.iter() {
        for m in detector.pattern.find_iter(text) {
            let (start, end) = (m.start(), m.end());
            if claimed.iter().any(|&(s, e)| start < e && s < end) {
                continue;
            }
            claimed.push((start, end));
            entities.push(PIIEntity {
                pii_type: detector.pii_type,
                start,
                end,
                matched_text: m.as_str().to_string(),
            });
        }
    }

    entities.sort_by_key(|e| e.start);
    entities
}

/// `contains_pii(text) -> bool` (§4.2).
pub fn contains_pii(text: &str) -> bool {
    !detect(text).is_empty()
}

/// `redact(text) -> String` (§4.2): replace every detected span with its
/// type's fixed token. Idempotent: redacting an already-redacted string
/// is a no-op, since the replacement tokens never match a detector
/// pattern.
pub fn redact(text: &str) -> String {
    let entities = detect(text);
    if entities.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for entity in entities {
        out.push_str(&text[cursor..entity.start]);
        out.push_str(entity.pii_type.replacement_token());
        cursor = entity.end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// `sanitize_for_logging(text) -> String` (§4.2): redact, then truncate to
/// 200 characters with a trailing ellipsis so log lines stay bounded even
/// for pasted documents.
pub fn sanitize_for_logging(text: &str) -> String {
    let redacted = redact(text);
    const LIMIT: usize = 200;
    if redacted.chars().count() <= LIMIT {
        return redacted;
    }
    let truncated: String = redacted.chars().take(LIMIT).collect();
    format!("{truncated}...")
}

/// `sanitize_for_api(text) -> String` (§4.2): redact before the text is
/// sent to the LLM vendor, so PII never leaves the process boundary.
pub fn sanitize_for_api(text: &str) -> String {
    redact(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_email() {
        assert!(contains_pii("reach me at jane.doe@example.com please"));
    }

    #[test]
    fn detects_ssn() {
        assert!(contains_pii("my ssn is 123-45-6789"));
    }

    #[test]
    fn detects_phone() {
        assert!(contains_pii("call me at (555) 123-4567"));
    }

    #[test]
    fn detects_seven_digit_phone() {
        let redacted = redact("my number is 555-1234");
        assert_eq!(redacted, "my number is [PHONE]");
    }

    #[test]
    fn detects_nineteen_digit_card() {
        assert!(contains_pii("card 1234-5678-9012-3456-789"));
    }

    #[test]
    fn redacts_email_with_fixed_token() {
        let redacted = redact("email jane.doe@example.com now");
        assert_eq!(redacted, "email [EMAIL] now");
    }

    #[test]
    fn redact_is_idempotent() {
        let once = redact("jane.doe@example.com and 123-45-6789");
        let twice = redact(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn no_pii_returns_original_text() {
        let text = "I feel nauseous this morning";
        assert_eq!(redact(text), text);
        assert!(!contains_pii(text));
    }

    #[test]
    fn mrn_detected_and_redacted() {
        let redacted = redact("patient MRN: 1234567 was seen today");
        assert!(redacted.contains("[MEDICAL_ID]"));
    }

    #[test]
    fn sanitize_for_logging_truncates_long_text() {
        let long = "a".repeat(250);
        let sanitized = sanitize_for_logging(&long);
        assert!(sanitized.ends_with("..."));
        assert_eq!(sanitized.chars().count(), 203);
    }

    #[test]
    fn multiple_entities_all_redacted() {
        let redacted = redact("contact jane.doe@example.com or 123-45-6789");
        assert!(redacted.contains("[EMAIL]"));
        assert!(redacted.contains("[SSN]"));
    }
}
