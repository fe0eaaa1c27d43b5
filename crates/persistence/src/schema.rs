//! ScyllaDB schema creation, grounded on the teacher's
//! `persistence::schema` (same `CREATE KEYSPACE IF NOT EXISTS` /
//! `CREATE TABLE IF NOT EXISTS` style), restyled to the data model of §3.

use crate::error::PersistenceError;
use scylla::Session;

pub async fn create_keyspace(
    session: &Session,
    keyspace: &str,
    replication_factor: u8,
) -> Result<(), PersistenceError> {
    let query = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': {}}}",
        keyspace, replication_factor
    );

    session
        .query_unpaged(query, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("failed to create keyspace: {}", e)))?;

    Ok(())
}

pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let conversations = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.conversations (
            conversation_id UUID,
            owner_user_id TEXT,
            title TEXT,
            starred BOOLEAN,
            created_at TIMESTAMP,
            updated_at TIMESTAMP,
            PRIMARY KEY (conversation_id)
        )
    "#,
        keyspace
    );
    session
        .query_unpaged(conversations, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("conversations table: {}", e)))?;

    let turns = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.turns (
            conversation_id UUID,
            turn_id TIMEUUID,
            role TEXT,
            content TEXT,
            created_at TIMESTAMP,
            PRIMARY KEY ((conversation_id), turn_id)
        ) WITH CLUSTERING ORDER BY (turn_id DESC)
    "#,
        keyspace
    );
    session
        .query_unpaged(turns, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("turns table: {}", e)))?;

    let facts = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.facts (
            user_id TEXT,
            key TEXT,
            value TEXT,
            confidence FLOAT,
            updated_at TIMESTAMP,
            PRIMARY KEY ((user_id), key)
        )
    "#,
        keyspace
    );
    session
        .query_unpaged(facts, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("facts table: {}", e)))?;

    let symptom_records = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.symptom_records (
            user_id TEXT,
            record_id TIMEUUID,
            kind TEXT,
            description TEXT,
            severity TEXT,
            frequency TEXT,
            onset TEXT,
            associated_json TEXT,
            resolved BOOLEAN,
            reported_at TIMESTAMP,
            resolved_at TIMESTAMP,
            PRIMARY KEY ((user_id), record_id)
        ) WITH CLUSTERING ORDER BY (record_id DESC)
    "#,
        keyspace
    );
    session
        .query_unpaged(symptom_records, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("symptom_records table: {}", e)))?;

    let subscriptions = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.subscriptions (
            user_id TEXT,
            subscription_id TEXT,
            plan TEXT,
            status TEXT,
            starts_at TIMESTAMP,
            ends_at TIMESTAMP,
            PRIMARY KEY ((user_id), subscription_id)
        )
    "#,
        keyspace
    );
    session
        .query_unpaged(subscriptions, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("subscriptions table: {}", e)))?;

    let plan_features = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.plan_features (
            plan TEXT,
            feature TEXT,
            quota_limit INT,
            quota_unlimited BOOLEAN,
            quota_period TEXT,
            PRIMARY KEY ((plan), feature)
        )
    "#,
        keyspace
    );
    session
        .query_unpaged(plan_features, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("plan_features table: {}", e)))?;

    // CQL counter tables may only contain counter columns besides the
    // primary key, so `period_end` is not stored here; it is recomputed
    // from `period_start` + the plan's `quota_period` on every read
    // (`calculate_period_bounds`, §4.5), which is pure and cheap.
    let usage_counters = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.usage_counters (
            user_id TEXT,
            feature TEXT,
            period_start TIMESTAMP,
            count COUNTER,
            PRIMARY KEY ((user_id, feature), period_start)
        ) WITH CLUSTERING ORDER BY (period_start DESC)
    "#,
        keyspace
    );
    session
        .query_unpaged(usage_counters, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("usage_counters table: {}", e)))?;

    let system_settings = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.system_settings (
            key TEXT PRIMARY KEY,
            value TEXT
        )
    "#,
        keyspace
    );
    session
        .query_unpaged(system_settings, &[])
        .await
        .map_err(|e| PersistenceError::Schema(format!("system_settings table: {}", e)))?;

    tracing::info!("all tables created successfully");
    Ok(())
}
