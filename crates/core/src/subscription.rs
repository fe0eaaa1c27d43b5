//! Subscription, plan, feature, and usage-counter entities backing the
//! Quota & Feature Gate (C5).

use crate::user::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub user: UserId,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// "Current" per §3: status active and `ends_at` null or in the future.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.ends_at.map(|end| end > now).unwrap_or(true)
    }
}

/// A feature a plan can grant. Named rather than free-form so the
/// orchestrator's `feature = "chat"` lookup (§4.12 step 19) can't typo past
/// the type system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Chat,
    SymptomTracking,
    CalendarSuggestions,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Chat => "chat",
            Feature::SymptomTracking => "symptom_tracking",
            Feature::CalendarSuggestions => "calendar_suggestions",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPeriod {
    Daily,
    Weekly,
    Monthly,
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuotaLimit {
    Limited(u32),
    Unlimited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
}

/// A `(plan, feature)` grant with its quota shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanFeature {
    pub feature: Feature,
    pub quota_limit: QuotaLimit,
    pub quota_period: QuotaPeriod,
}

/// `(user, feature, period_start, period_end, count)` — the triple
/// `(user, feature, period_start)` is unique (§3); a new period creates a
/// new row and old rows remain for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub user: UserId,
    pub feature: Feature,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub count: u32,
}
