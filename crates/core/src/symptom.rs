//! Symptom records (§3) and the closed catalogue of 18 symptom kinds the
//! extractor (C4) recognizes.

use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The closed catalogue of 18 symptom kinds (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymptomKind {
    NauseaVomiting,
    Fatigue,
    Bleeding,
    Headache,
    Dizziness,
    SwellingEdema,
    AbdominalPain,
    BackPain,
    Heartburn,
    Constipation,
    Contractions,
    VisionChanges,
    ShortnessOfBreath,
    FrequentUrination,
    LegCramps,
    BreastTenderness,
    FoodAversion,
    MoodChanges,
}

impl SymptomKind {
    pub const ALL: [SymptomKind; 18] = [
        SymptomKind::NauseaVomiting,
        SymptomKind::Fatigue,
        SymptomKind::Bleeding,
        SymptomKind::Headache,
        SymptomKind::Dizziness,
        SymptomKind::SwellingEdema,
        SymptomKind::AbdominalPain,
        SymptomKind::BackPain,
        SymptomKind::Heartburn,
        SymptomKind::Constipation,
        SymptomKind::Contractions,
        SymptomKind::VisionChanges,
        SymptomKind::ShortnessOfBreath,
        SymptomKind::FrequentUrination,
        SymptomKind::LegCramps,
        SymptomKind::BreastTenderness,
        SymptomKind::FoodAversion,
        SymptomKind::MoodChanges,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SymptomKind::NauseaVomiting => "nausea_vomiting",
            SymptomKind::Fatigue => "fatigue",
            SymptomKind::Bleeding => "bleeding",
            SymptomKind::Headache => "headache",
            SymptomKind::Dizziness => "dizziness",
            SymptomKind::SwellingEdema => "swelling_edema",
            SymptomKind::AbdominalPain => "abdominal_pain",
            SymptomKind::BackPain => "back_pain",
            SymptomKind::Heartburn => "heartburn",
            SymptomKind::Constipation => "constipation",
            SymptomKind::Contractions => "contractions",
            SymptomKind::VisionChanges => "vision_changes",
            SymptomKind::ShortnessOfBreath => "shortness_of_breath",
            SymptomKind::FrequentUrination => "frequent_urination",
            SymptomKind::LegCramps => "leg_cramps",
            SymptomKind::BreastTenderness => "breast_tenderness",
            SymptomKind::FoodAversion => "food_aversion",
            SymptomKind::MoodChanges => "mood_changes",
        }
    }
}

impl std::fmt::Display for SymptomKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Moderate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Occasional,
    Frequent,
    Daily,
    Constant,
}

impl Default for Frequency {
    fn default() -> Self {
        Frequency::Occasional
    }
}

/// Append-only, except the `resolved` flag which may flip (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomRecord {
    pub id: Uuid,
    pub user: UserId,
    pub kind: SymptomKind,
    pub description: String,
    pub severity: Severity,
    pub frequency: Frequency,
    pub onset: String,
    pub associated: Vec<SymptomKind>,
    pub resolved: bool,
    pub reported_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SymptomRecord {
    pub fn new(user: UserId, kind: SymptomKind, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user,
            kind,
            description: description.into(),
            severity: Severity::default(),
            frequency: Frequency::default(),
            onset: String::new(),
            associated: Vec::new(),
            resolved: false,
            reported_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Red-flag markers that must trigger an "urgent care" direction (§4.8,
    /// §7): severe bleeding, severe headache with a vision change, or severe
    /// abdominal pain.
    pub fn is_red_flag(&self, co_reported: &[SymptomKind]) -> bool {
        if self.severity != Severity::Severe {
            return false;
        }
        match self.kind {
            SymptomKind::Bleeding | SymptomKind::AbdominalPain => true,
            SymptomKind::Headache => co_reported.contains(&SymptomKind::VisionChanges)
                || self.associated.contains(&SymptomKind::VisionChanges),
            _ => false,
        }
    }
}
