//! The repository capability the engine consumes (§6 "Engine -> Database").
//! Operation names follow §6 verbatim; the orchestrator is generic over
//! `dyn Repository` so the in-memory and ScyllaDB implementations are
//! interchangeable (tests use the former, the server binary the latter).

use crate::error::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pregnancy_core::{
    Conversation, ConversationId, Fact, Feature, PlanFeature, Role, Subscription, SymptomRecord,
    SystemSetting, Turn, UserId,
};

#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_conversation(
        &self,
        owner: &UserId,
        title: Option<String>,
    ) -> Result<Conversation, PersistenceError>;

    async fn save_message(
        &self,
        conversation_id: ConversationId,
        owner: &UserId,
        role: Role,
        content: &str,
    ) -> Result<Turn, PersistenceError>;

    async fn get_user_facts(&self, user: &UserId) -> Result<Vec<Fact>, PersistenceError>;

    /// Upsert keeping the higher confidence (§4.5, §9, invariant 6 in §8).
    async fn save_or_update_fact(
        &self,
        user: &UserId,
        key: &str,
        value: &str,
        confidence: f32,
    ) -> Result<Fact, PersistenceError>;

    async fn save_symptom(&self, record: SymptomRecord) -> Result<uuid::Uuid, PersistenceError>;

    async fn get_recent_symptoms(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<SymptomRecord>, PersistenceError>;

    async fn get_system_setting(&self, key: &str) -> Result<Option<SystemSetting>, PersistenceError>;

    /// The "current" subscription per §3: `status=active` and `ends_at`
    /// null or in the future. Returns `Ok(None)` when there is no active
    /// row — §4.5 treats that the same as "feature absent", not an error.
    async fn get_current_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<Subscription>, PersistenceError>;

    async fn get_plan_feature(
        &self,
        plan: &str,
        feature: Feature,
    ) -> Result<Option<PlanFeature>, PersistenceError>;

    async fn get_usage_count(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<u32, PersistenceError>;

    /// Atomic upsert-increment on `(user, feature, period_start)` (§4.5).
    async fn increment_usage(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<(), PersistenceError>;
}
