//! Prompt Builder (C8, §4.8).
//!
//! Grounded on the teacher's `llm::prompt::PromptBuilder` message-list
//! builder pattern (`Message { role, content }`, chained `with_*` methods,
//! a final `.build()`), restyled from gold-loan persona scripting to
//! pregnancy-domain system-prompt composition.

use pregnancy_core::{Frequency, Role, Severity, SymptomKind, SymptomRecord, Turn};

/// A single chat-completion message, the unit the LLM client (C9) sends
/// over the wire.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Input to [`PromptBuilder::build`] (§4.8): everything the builder needs
/// to compose one turn's message list.
pub struct PromptInput<'a> {
    pub sanitized_message: &'a str,
    pub language: pregnancy_core::Language,
    /// The normalized raw code the language was parsed from (e.g. "pt",
    /// "de"), used verbatim in the `Language::Other` instruction so an
    /// unsupported locale still names itself instead of the generic
    /// "other" sentinel (§4.8 rule 2c).
    pub language_code: &'a str,
    pub is_small_talk: bool,
    pub recent_turns: &'a [Turn],
    pub facts: &'a [pregnancy_core::Fact],
    pub recent_symptoms: &'a [SymptomRecord],
    pub ai_name: &'a str,
}

const PRIORITY_FACT_KEYS: [&str; 3] = [
    pregnancy_core::fact::FACT_PREGNANCY_WEEK,
    pregnancy_core::fact::FACT_DIET,
    pregnancy_core::fact::FACT_EXERCISE,
];

/// Keyword probe used to decide whether a *past* short-term-memory turn is
/// small talk and should be filtered out of the history appended to the
/// prompt (§4.8 rule 3). Deliberately coarser than the full classifier —
/// this only needs to recognize greetings/thanks, not the full intent set.
const HISTORY_SMALL_TALK_MARKERS: [&str; 8] =
    ["hi", "hello", "hey", "thanks", "thank you", "bye", "goodbye", "how are you"];

fn looks_like_small_talk(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() > 40 {
        return false;
    }
    let lower = trimmed.to_lowercase();
    HISTORY_SMALL_TALK_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Stateless builder for C8's output message list. Holds no connection,
/// no mutable shared state — constructed fresh per turn.
pub struct PromptBuilder;

impl PromptBuilder {
    /// `build(input) -> Vec<Message>` (§4.8).
    pub fn build(input: &PromptInput<'_>) -> Vec<Message> {
        if input.is_small_talk {
            return vec![
                Message::system(
                    "You are a friendly pregnancy support assistant; keep responses brief and warm",
                ),
                Message::user(input.sanitized_message),
            ];
        }

        let mut messages = Vec::with_capacity(input.recent_turns.len() + 2);
        messages.push(Message::system(Self::system_prompt(input)));

        for turn in input.recent_turns {
            if looks_like_small_talk(&turn.content) {
                continue;
            }
            messages.push(Message { role: turn.role, content: turn.content.clone() });
        }

        messages.push(Message::user(input.sanitized_message));
        messages
    }

    fn system_prompt(input: &PromptInput<'_>) -> String {
        let mut buf = String::with_capacity(512);

        let role_name = if input.ai_name.trim().is_empty() {
            "pregnancy support assistant".to_string()
        } else {
            format!("{}, a pregnancy support assistant", input.ai_name)
        };
        buf.push_str(&format!("You are {role_name}, here to help with pregnancy-related questions and concerns.\n\n"));

        buf.push_str(
            "Keep responses to at most 4 sentences, conversational in tone. \
             Ask 1-2 clarifying questions before giving advice about a reported symptom. \
             Avoid medical jargon; explain things simply.\n\n",
        );

        buf.push_str(&Self::language_instruction(input.language, input.language_code));
        buf.push('\n');

        if !input.facts.is_empty() {
            buf.push_str("\nKnown facts about this user:\n");
            buf.push_str(&Self::facts_block(input.facts));
        }

        if !input.recent_symptoms.is_empty() {
            buf.push_str("\nRecently reported symptoms:\n");
            buf.push_str(&Self::symptom_block(input.recent_symptoms));
        }

        buf
    }

    fn language_instruction(language: pregnancy_core::Language, language_code: &str) -> String {
        match language {
            pregnancy_core::Language::English => "Respond in English.".to_string(),
            pregnancy_core::Language::Spanish => "Respond in Spanish.".to_string(),
            pregnancy_core::Language::French => "Respond in French.".to_string(),
            pregnancy_core::Language::Other => {
                format!("Respond in {language_code} if possible, else English.")
            }
        }
    }

    fn facts_block(facts: &[pregnancy_core::Fact]) -> String {
        let mut ordered: Vec<&pregnancy_core::Fact> = Vec::with_capacity(facts.len());
        for key in PRIORITY_FACT_KEYS {
            if let Some(fact) = facts.iter().find(|f| f.key == key) {
                ordered.push(fact);
            }
        }
        for fact in facts {
            if !PRIORITY_FACT_KEYS.contains(&fact.key.as_str()) {
                ordered.push(fact);
            }
        }

        let mut buf = String::with_capacity(ordered.len() * 32);
        for fact in ordered {
            buf.push_str(&format!("- {}: {}\n", fact.key, fact.value));
        }
        buf
    }

    fn symptom_block(symptoms: &[SymptomRecord]) -> String {
        let mut buf = String::with_capacity(symptoms.len() * 48);
        let mut any_red_flag = false;
        let all_kinds: Vec<SymptomKind> = symptoms.iter().map(|s| s.kind).collect();

        for symptom in symptoms {
            let status = if symptom.resolved { "resolved" } else { "ongoing" };
            buf.push_str(&format!(
                "- {} ({}): {}, {} – {}\n",
                symptom.kind,
                status,
                severity_label(symptom.severity),
                frequency_label(symptom.frequency),
                symptom.onset,
            ));
            if symptom.is_red_flag(&all_kinds) {
                any_red_flag = true;
            }
        }

        if any_red_flag {
            buf.push_str(
                "\nOne or more of these symptoms (severe bleeding, severe headache with \
                 vision changes, or severe abdominal pain) warrants recommending the user \
                 seek urgent care immediately.\n",
            );
        }

        buf
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::Mild => "mild",
        Severity::Moderate => "moderate",
        Severity::Severe => "severe",
    }
}

fn frequency_label(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Once => "once",
        Frequency::Occasional => "occasional",
        Frequency::Frequent => "frequent",
        Frequency::Daily => "daily",
        Frequency::Constant => "constant",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pregnancy_core::{Fact, Language};

    fn input<'a>(
        message: &'a str,
        turns: &'a [Turn],
        facts: &'a [Fact],
        symptoms: &'a [SymptomRecord],
    ) -> PromptInput<'a> {
        PromptInput {
            sanitized_message: message,
            language: Language::English,
            language_code: "en",
            is_small_talk: false,
            recent_turns: turns,
            facts,
            recent_symptoms: symptoms,
            ai_name: "Maya",
        }
    }

    #[test]
    fn small_talk_is_short_system_and_user_only() {
        let i = PromptInput {
            sanitized_message: "hi there",
            language: Language::English,
            language_code: "en",
            is_small_talk: true,
            recent_turns: &[],
            facts: &[],
            recent_symptoms: &[],
            ai_name: "Maya",
        };
        let messages = PromptBuilder::build(&i);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn empty_ai_name_falls_back_to_generic_phrase() {
        let i = PromptInput {
            sanitized_message: "how many weeks am I?",
            language: Language::English,
            language_code: "en",
            is_small_talk: false,
            recent_turns: &[],
            facts: &[],
            recent_symptoms: &[],
            ai_name: "",
        };
        let messages = PromptBuilder::build(&i);
        assert!(messages[0].content.contains("pregnancy support assistant"));
        assert!(!messages[0].content.contains(", a pregnancy support assistant"));
    }

    #[test]
    fn unsupported_language_instruction_names_its_own_code() {
        let i = PromptInput {
            sanitized_message: "estou gravida",
            language: Language::Other,
            language_code: "pt",
            is_small_talk: false,
            recent_turns: &[],
            facts: &[],
            recent_symptoms: &[],
            ai_name: "Maya",
        };
        let messages = PromptBuilder::build(&i);
        assert!(messages[0].content.contains("Respond in pt if possible, else English."));
    }

    #[test]
    fn facts_are_ordered_with_priority_keys_first() {
        let facts = vec![
            Fact::new("u1".to_string(), "custom_key", "value", 0.9),
            Fact::new("u1".to_string(), "exercise", "walking", 0.9),
            Fact::new("u1".to_string(), "pregnancy_week", "20", 0.9),
        ];
        let i = input("test", &[], &facts, &[]);
        let messages = PromptBuilder::build(&i);
        let system = &messages[0].content;
        let week_pos = system.find("pregnancy_week").unwrap();
        let exercise_pos = system.find("exercise").unwrap();
        let custom_pos = system.find("custom_key").unwrap();
        assert!(week_pos < exercise_pos);
        assert!(exercise_pos < custom_pos);
    }

    #[test]
    fn red_flag_symptom_adds_urgent_notice() {
        let mut symptom = SymptomRecord::new("u1".to_string(), SymptomKind::Bleeding, "bleeding");
        symptom.severity = Severity::Severe;
        let i = input("test", &[], &[], std::slice::from_ref(&symptom));
        let messages = PromptBuilder::build(&i);
        assert!(messages[0].content.contains("urgent care"));
    }

    #[test]
    fn mild_symptom_has_no_urgent_notice() {
        let mut symptom = SymptomRecord::new("u1".to_string(), SymptomKind::Headache, "headache");
        symptom.severity = Severity::Mild;
        let i = input("test", &[], &[], std::slice::from_ref(&symptom));
        let messages = PromptBuilder::build(&i);
        assert!(!messages[0].content.contains("urgent care"));
    }

    #[test]
    fn short_smalltalk_history_turn_is_filtered() {
        let turns = vec![Turn::new(uuid::Uuid::new_v4(), Role::User, "hello there")];
        let i = input("how many weeks am I", &turns, &[], &[]);
        let messages = PromptBuilder::build(&i);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn substantive_history_turn_is_kept() {
        let turns = vec![Turn::new(
            uuid::Uuid::new_v4(),
            Role::User,
            "I've been having bad nausea every morning this week",
        )];
        let i = input("is that normal", &turns, &[], &[]);
        let messages = PromptBuilder::build(&i);
        assert_eq!(messages.len(), 3);
    }

    #[test]
    fn current_message_is_always_last() {
        let turns = vec![Turn::new(
            uuid::Uuid::new_v4(),
            Role::Assistant,
            "That sounds uncomfortable, tell me more",
        )];
        let i = input("it hurts a lot", &turns, &[], &[]);
        let messages = PromptBuilder::build(&i);
        assert_eq!(messages.last().unwrap().content, "it hurts a lot");
    }
}
