//! In-process `Repository` used for local development (when
//! `persistence.enabled = false`) and the engine test suite. Grounded on
//! the teacher's `dashmap::DashMap`-backed store style (e.g.
//! `sessions::ScyllaSessionStore`'s in-memory test double).

use crate::error::PersistenceError;
use crate::repository::Repository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use pregnancy_core::{
    Conversation, ConversationId, Fact, Feature, PlanFeature, Role, Subscription, SymptomRecord,
    SystemSetting, Turn, UserId,
};
use std::sync::Mutex;

#[derive(Default)]
pub struct InMemoryRepository {
    conversations: DashMap<ConversationId, Conversation>,
    turns: DashMap<ConversationId, Mutex<Vec<Turn>>>,
    facts: DashMap<(UserId, String), Fact>,
    symptoms: DashMap<UserId, Mutex<Vec<SymptomRecord>>>,
    settings: DashMap<String, String>,
    subscriptions: DashMap<UserId, Subscription>,
    plan_features: DashMap<(String, Feature), PlanFeature>,
    usage: DashMap<(UserId, Feature, DateTime<Utc>), u32>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a system setting, e.g. `ai_name` (§3), for tests/bootstrap.
    pub fn set_system_setting(&self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    /// Seed a subscription, used by tests to exercise the quota gate.
    pub fn seed_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .insert(subscription.user.clone(), subscription);
    }

    /// Seed a `(plan, feature)` grant.
    pub fn seed_plan_feature(&self, plan_feature: PlanFeature, plan: impl Into<String>) {
        self.plan_features
            .insert((plan.into(), plan_feature.feature), plan_feature);
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_conversation(
        &self,
        owner: &UserId,
        title: Option<String>,
    ) -> Result<Conversation, PersistenceError> {
        let conversation = Conversation::new(owner.clone(), title);
        self.conversations
            .insert(conversation.id, conversation.clone());
        self.turns.insert(conversation.id, Mutex::new(Vec::new()));
        Ok(conversation)
    }

    async fn save_message(
        &self,
        conversation_id: ConversationId,
        _owner: &UserId,
        role: Role,
        content: &str,
    ) -> Result<Turn, PersistenceError> {
        let turn = Turn::new(conversation_id, role, content);
        let slot = self
            .turns
            .entry(conversation_id)
            .or_insert_with(|| Mutex::new(Vec::new()));
        slot.lock().expect("turn list mutex poisoned").push(turn.clone());
        Ok(turn)
    }

    async fn get_user_facts(&self, user: &UserId) -> Result<Vec<Fact>, PersistenceError> {
        Ok(self
            .facts
            .iter()
            .filter(|entry| &entry.key().0 == user)
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn save_or_update_fact(
        &self,
        user: &UserId,
        key: &str,
        value: &str,
        confidence: f32,
    ) -> Result<Fact, PersistenceError> {
        let incoming = Fact::new(user.clone(), key, value, confidence);
        let map_key = (user.clone(), key.to_string());
        let merged = match self.facts.get(&map_key) {
            Some(existing) => Fact::merge_keeping_higher_confidence(Some(&existing), incoming),
            None => incoming,
        };
        self.facts.insert(map_key, merged.clone());
        Ok(merged)
    }

    async fn save_symptom(&self, record: SymptomRecord) -> Result<uuid::Uuid, PersistenceError> {
        let id = record.id;
        let slot = self
            .symptoms
            .entry(record.user.clone())
            .or_insert_with(|| Mutex::new(Vec::new()));
        slot.lock().expect("symptom list mutex poisoned").push(record);
        Ok(id)
    }

    async fn get_recent_symptoms(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<SymptomRecord>, PersistenceError> {
        let Some(slot) = self.symptoms.get(user) else {
            return Ok(Vec::new());
        };
        let records = slot.lock().expect("symptom list mutex poisoned");
        let mut out: Vec<SymptomRecord> = records.clone();
        out.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
        out.truncate(limit);
        Ok(out)
    }

    async fn get_system_setting(&self, key: &str) -> Result<Option<SystemSetting>, PersistenceError> {
        Ok(self.settings.get(key).map(|value| SystemSetting {
            key: key.to_string(),
            value: value.clone(),
        }))
    }

    async fn get_current_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<Subscription>, PersistenceError> {
        let now = Utc::now();
        Ok(self
            .subscriptions
            .get(user)
            .map(|s| s.clone())
            .filter(|s| s.is_current(now)))
    }

    async fn get_plan_feature(
        &self,
        plan: &str,
        feature: Feature,
    ) -> Result<Option<PlanFeature>, PersistenceError> {
        Ok(self
            .plan_features
            .get(&(plan.to_string(), feature))
            .map(|pf| *pf))
    }

    async fn get_usage_count(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<u32, PersistenceError> {
        Ok(self
            .usage
            .get(&(user.clone(), feature, period_start))
            .map(|v| *v)
            .unwrap_or(0))
    }

    async fn increment_usage(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        *self
            .usage
            .entry((user.clone(), feature, period_start))
            .or_insert(0) += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pregnancy_core::{QuotaLimit, QuotaPeriod};

    #[tokio::test]
    async fn fact_upsert_keeps_higher_confidence() {
        let repo = InMemoryRepository::new();
        repo.save_or_update_fact(&"u1".to_string(), "pregnancy_week", "10", 0.5)
            .await
            .unwrap();
        repo.save_or_update_fact(&"u1".to_string(), "pregnancy_week", "14", 0.3)
            .await
            .unwrap();
        let facts = repo.get_user_facts(&"u1".to_string()).await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "10", "lower confidence must not overwrite");
    }

    #[tokio::test]
    async fn usage_increments_and_reads_back() {
        let repo = InMemoryRepository::new();
        let user = "u1".to_string();
        let period_start = Utc::now();
        for _ in 0..3 {
            repo.increment_usage(&user, Feature::Chat, period_start)
                .await
                .unwrap();
        }
        let count = repo
            .get_usage_count(&user, Feature::Chat, period_start)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn no_subscription_is_none_not_error() {
        let repo = InMemoryRepository::new();
        let result = repo.get_current_subscription(&"ghost".to_string()).await;
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn seed_plan_feature_roundtrips_quota_shape() {
        let repo = InMemoryRepository::new();
        let pf = PlanFeature {
            feature: Feature::Chat,
            quota_limit: QuotaLimit::Limited(100),
            quota_period: QuotaPeriod::Monthly,
        };
        repo.seed_plan_feature(pf, "free");
        assert!(repo.plan_features.contains_key(&("free".to_string(), Feature::Chat)));
    }
}
