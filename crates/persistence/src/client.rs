//! ScyllaDB client and connection management, grounded on the teacher's
//! `persistence::client::ScyllaClient`.

use crate::error::PersistenceError;
use crate::schema;
use pregnancy_config::PersistenceConfig;
use scylla::{Session, SessionBuilder};
use std::sync::Arc;

/// ScyllaDB client wrapper. §5's pool sizing knobs
/// (`pool_total`/`pool_idle`/`pool_lifetime_secs`) live on
/// `PersistenceConfig` for the operator to tune; the driver itself manages
/// per-node connection pooling once built.
#[derive(Clone)]
pub struct ScyllaClient {
    session: Arc<Session>,
    keyspace: String,
}

impl ScyllaClient {
    pub async fn connect(config: &PersistenceConfig) -> Result<Self, PersistenceError> {
        tracing::info!(hosts = ?config.scylla_hosts, keyspace = %config.keyspace, "connecting to ScyllaDB");

        let session = SessionBuilder::new()
            .known_nodes(&config.scylla_hosts)
            .build()
            .await?;

        Ok(Self {
            session: Arc::new(session),
            keyspace: config.keyspace.clone(),
        })
    }

    pub async fn ensure_schema(&self, replication_factor: u8) -> Result<(), PersistenceError> {
        schema::create_keyspace(&self.session, &self.keyspace, replication_factor).await?;
        schema::create_tables(&self.session, &self.keyspace).await?;
        tracing::info!(keyspace = %self.keyspace, "schema ensured");
        Ok(())
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}
