//! The fixed intent set output by the classifier (C1).

use serde::{Deserialize, Serialize};

/// One of the five deterministic categories the classifier can produce.
/// Evaluation priority (highest first) is owned by the classifier, not by
/// this type: `symptom_report` > `scheduling_related` > `pregnancy_question`
/// > `small_talk`, with `unclear` as the floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    SmallTalk,
    PregnancyQuestion,
    SymptomReport,
    SchedulingRelated,
    Unclear,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::SmallTalk => "small_talk",
            Intent::PregnancyQuestion => "pregnancy_question",
            Intent::SymptomReport => "symptom_report",
            Intent::SchedulingRelated => "scheduling_related",
            Intent::Unclear => "unclear",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classifier output: an intent plus a confidence in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
}

impl Classification {
    pub fn new(intent: Intent, confidence: f32) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
