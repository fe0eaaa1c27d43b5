//! ScyllaDB-backed `Repository`, grounded on the teacher's
//! `appointments::ScyllaAppointmentStore` / `sms::SimulatedSmsService`
//! query style (parameterized `session.query_unpaged`, no string
//! interpolation of values per §5).

use crate::client::ScyllaClient;
use crate::error::PersistenceError;
use crate::repository::Repository;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use pregnancy_core::{
    Conversation, ConversationId, Fact, Feature, Frequency, PlanFeature, QuotaLimit, QuotaPeriod,
    Role, Severity, Subscription, SubscriptionStatus, SymptomKind, SymptomRecord, SystemSetting,
    Turn, UserId,
};
use scylla::frame::value::CqlTimestamp;
use uuid::Uuid;

pub struct ScyllaRepository {
    client: ScyllaClient,
}

impl ScyllaRepository {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    fn keyspace(&self) -> &str {
        self.client.keyspace()
    }
}

fn to_cql_ts(dt: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(dt.timestamp_millis())
}

fn from_cql_ts(ts: CqlTimestamp) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts.0).single().unwrap_or_else(Utc::now)
}

#[async_trait]
impl Repository for ScyllaRepository {
    async fn create_conversation(
        &self,
        owner: &UserId,
        title: Option<String>,
    ) -> Result<Conversation, PersistenceError> {
        let conversation = Conversation::new(owner.clone(), title);
        let query = format!(
            "INSERT INTO {}.conversations (conversation_id, owner_user_id, title, starred, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    conversation.id,
                    conversation.owner.clone(),
                    conversation.title.clone(),
                    conversation.starred,
                    to_cql_ts(conversation.created_at),
                    to_cql_ts(conversation.updated_at),
                ),
            )
            .await?;
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
        let role_str = match turn.role {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        };
        let query = format!(
            "INSERT INTO {}.turns (conversation_id, turn_id, role, content, created_at) VALUES (?, ?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    turn.conversation_id,
                    turn.id,
                    role_str,
                    turn.content.clone(),
                    to_cql_ts(turn.created_at),
                ),
            )
            .await?;
        Ok(turn)
    }

    async fn get_user_facts(&self, user: &UserId) -> Result<Vec<Fact>, PersistenceError> {
        let query = format!(
            "SELECT key, value, confidence, updated_at FROM {}.facts WHERE user_id = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (user.clone(),))
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let mut facts = Vec::new();
        for row in rows
            .rows::<(String, String, f32, CqlTimestamp)>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?
        {
            let (key, value, confidence, updated_at) =
                row.map_err(|e| PersistenceError::Query(e.to_string()))?;
            facts.push(Fact {
                user: user.clone(),
                key,
                value,
                confidence,
                updated_at: from_cql_ts(updated_at),
            });
        }
        Ok(facts)
    }

    async fn save_or_update_fact(
        &self,
        user: &UserId,
        key: &str,
        value: &str,
        confidence: f32,
    ) -> Result<Fact, PersistenceError> {
        // Compare-and-set upsert (§9): only overwrite when the incoming
        // confidence is strictly greater than the stored one.
        let select = format!(
            "SELECT value, confidence FROM {}.facts WHERE user_id = ? AND key = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(select, (user.clone(), key.to_string()))
            .await?;
        let existing = result
            .into_rows_result()
            .ok()
            .and_then(|rows| rows.rows::<(String, f32)>().ok())
            .and_then(|mut iter| iter.next())
            .and_then(|row| row.ok());

        let (final_value, final_confidence) = match existing {
            Some((existing_value, existing_confidence)) if existing_confidence >= confidence => {
                (existing_value, existing_confidence)
            }
            _ => (value.to_string(), confidence),
        };

        let now = Utc::now();
        let insert = format!(
            "INSERT INTO {}.facts (user_id, key, value, confidence, updated_at) VALUES (?, ?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                insert,
                (
                    user.clone(),
                    key.to_string(),
                    final_value.clone(),
                    final_confidence,
                    to_cql_ts(now),
                ),
            )
            .await?;

        Ok(Fact {
            user: user.clone(),
            key: key.to_string(),
            value: final_value,
            confidence: final_confidence,
            updated_at: now,
        })
    }

    async fn save_symptom(&self, record: SymptomRecord) -> Result<Uuid, PersistenceError> {
        let associated_json = serde_json::to_string(&record.associated)
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let query = format!(
            "INSERT INTO {}.symptom_records (user_id, record_id, kind, description, severity, frequency, onset, associated_json, resolved, reported_at, resolved_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    record.user.clone(),
                    record.id,
                    record.kind.as_str(),
                    record.description.clone(),
                    severity_str(record.severity),
                    frequency_str(record.frequency),
                    record.onset.clone(),
                    associated_json,
                    record.resolved,
                    to_cql_ts(record.reported_at),
                    record.resolved_at.map(to_cql_ts),
                ),
            )
            .await?;
        Ok(record.id)
    }

    async fn get_recent_symptoms(
        &self,
        user: &UserId,
        limit: usize,
    ) -> Result<Vec<SymptomRecord>, PersistenceError> {
        let query = format!(
            "SELECT record_id, kind, description, severity, frequency, onset, associated_json, resolved, reported_at, resolved_at FROM {}.symptom_records WHERE user_id = ? LIMIT ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (user.clone(), limit as i32))
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let mut out = Vec::new();
        for row in rows
            .rows::<(
                Uuid,
                String,
                String,
                String,
                String,
                String,
                String,
                bool,
                CqlTimestamp,
                Option<CqlTimestamp>,
            )>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?
        {
            let (
                id,
                kind,
                description,
                severity,
                frequency,
                onset,
                associated_json,
                resolved,
                reported_at,
                resolved_at,
            ) = row.map_err(|e| PersistenceError::Query(e.to_string()))?;
            let associated: Vec<SymptomKind> =
                serde_json::from_str(&associated_json).unwrap_or_default();
            out.push(SymptomRecord {
                id,
                user: user.clone(),
                kind: parse_symptom_kind(&kind),
                description,
                severity: parse_severity(&severity),
                frequency: parse_frequency(&frequency),
                onset,
                associated,
                resolved,
                reported_at: from_cql_ts(reported_at),
                resolved_at: resolved_at.map(from_cql_ts),
            });
        }
        Ok(out)
    }

    async fn get_system_setting(&self, key: &str) -> Result<Option<SystemSetting>, PersistenceError> {
        let query = format!(
            "SELECT value FROM {}.system_settings WHERE key = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (key.to_string(),))
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let mut iter = rows
            .rows::<(String,)>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        Ok(match iter.next() {
            Some(row) => {
                let (value,) = row.map_err(|e| PersistenceError::Query(e.to_string()))?;
                Some(SystemSetting {
                    key: key.to_string(),
                    value,
                })
            }
            None => None,
        })
    }

    async fn get_current_subscription(
        &self,
        user: &UserId,
    ) -> Result<Option<Subscription>, PersistenceError> {
        let query = format!(
            "SELECT subscription_id, plan, status, starts_at, ends_at FROM {}.subscriptions WHERE user_id = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (user.clone(),))
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let now = Utc::now();
        for row in rows
            .rows::<(String, String, String, CqlTimestamp, Option<CqlTimestamp>)>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?
        {
            let (id, plan, status, starts_at, ends_at) =
                row.map_err(|e| PersistenceError::Query(e.to_string()))?;
            let subscription = Subscription {
                id,
                user: user.clone(),
                plan,
                status: parse_status(&status),
                starts_at: from_cql_ts(starts_at),
                ends_at: ends_at.map(from_cql_ts),
            };
            if subscription.is_current(now) {
                return Ok(Some(subscription));
            }
        }
        Ok(None)
    }

    async fn get_plan_feature(
        &self,
        plan: &str,
        feature: Feature,
    ) -> Result<Option<PlanFeature>, PersistenceError> {
        let query = format!(
            "SELECT quota_limit, quota_unlimited, quota_period FROM {}.plan_features WHERE plan = ? AND feature = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(query, (plan.to_string(), feature.as_str().to_string()))
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let mut iter = rows
            .rows::<(Option<i32>, bool, String)>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        Ok(match iter.next() {
            Some(row) => {
                let (limit, unlimited, period) =
                    row.map_err(|e| PersistenceError::Query(e.to_string()))?;
                let quota_limit = if unlimited {
                    QuotaLimit::Unlimited
                } else {
                    QuotaLimit::Limited(limit.unwrap_or(0) as u32)
                };
                Some(PlanFeature {
                    feature,
                    quota_limit,
                    quota_period: parse_period(&period),
                })
            }
            None => None,
        })
    }

    async fn get_usage_count(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<u32, PersistenceError> {
        let query = format!(
            "SELECT count FROM {}.usage_counters WHERE user_id = ? AND feature = ? AND period_start = ?",
            self.keyspace()
        );
        let result = self
            .client
            .session()
            .query_unpaged(
                query,
                (
                    user.clone(),
                    feature.as_str().to_string(),
                    to_cql_ts(period_start),
                ),
            )
            .await?;
        let rows = result
            .into_rows_result()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        let mut iter = rows
            .rows::<(i64,)>()
            .map_err(|e| PersistenceError::Query(e.to_string()))?;
        Ok(match iter.next() {
            Some(row) => {
                let (count,) = row.map_err(|e| PersistenceError::Query(e.to_string()))?;
                count as u32
            }
            None => 0,
        })
    }

    async fn increment_usage(
        &self,
        user: &UserId,
        feature: Feature,
        period_start: DateTime<Utc>,
    ) -> Result<(), PersistenceError> {
        let query = format!(
            "UPDATE {}.usage_counters SET count = count + 1 WHERE user_id = ? AND feature = ? AND period_start = ?",
            self.keyspace()
        );
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    user.clone(),
                    feature.as_str().to_string(),
                    to_cql_ts(period_start),
                ),
            )
            .await?;
        Ok(())
    }
}

fn severity_str(s: Severity) -> &'static str {
    match s {
        Severity::Mild => "mild",
        Severity::Moderate => "moderate",
        Severity::Severe => "severe",
    }
}

fn parse_severity(s: &str) -> Severity {
    match s {
        "mild" => Severity::Mild,
        "severe" => Severity::Severe,
        _ => Severity::Moderate,
    }
}

fn frequency_str(f: Frequency) -> &'static str {
    match f {
        Frequency::Once => "once",
        Frequency::Occasional => "occasional",
        Frequency::Frequent => "frequent",
        Frequency::Daily => "daily",
        Frequency::Constant => "constant",
    }
}

fn parse_frequency(s: &str) -> Frequency {
    match s {
        "once" => Frequency::Once,
        "frequent" => Frequency::Frequent,
        "daily" => Frequency::Daily,
        "constant" => Frequency::Constant,
        _ => Frequency::Occasional,
    }
}

fn parse_symptom_kind(s: &str) -> SymptomKind {
    SymptomKind::ALL
        .iter()
        .copied()
        .find(|k| k.as_str() == s)
        .unwrap_or(SymptomKind::Fatigue)
}

fn parse_status(s: &str) -> SubscriptionStatus {
    match s {
        "active" => SubscriptionStatus::Active,
        "canceled" => SubscriptionStatus::Canceled,
        _ => SubscriptionStatus::Expired,
    }
}

fn parse_period(s: &str) -> QuotaPeriod {
    match s {
        "daily" => QuotaPeriod::Daily,
        "weekly" => QuotaPeriod::Weekly,
        "monthly" => QuotaPeriod::Monthly,
        _ => QuotaPeriod::Unlimited,
    }
}
