//! Storage for the conversation engine (§3, §6): a `Repository` trait the
//! orchestrator is generic over, a ScyllaDB-backed implementation for
//! production, and an in-memory implementation for development and tests.

pub mod client;
pub mod error;
pub mod in_memory;
pub mod repository;
pub mod schema;
pub mod scylla_repository;

pub use client::ScyllaClient;
pub use error::PersistenceError;
pub use in_memory::InMemoryRepository;
pub use repository::Repository;
pub use scylla_repository::ScyllaRepository;

use pregnancy_config::PersistenceConfig;

/// Connect to ScyllaDB and ensure the schema exists, grounded on the
/// teacher's `persistence::init` bootstrap helper.
pub async fn connect(config: &PersistenceConfig) -> Result<ScyllaRepository, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema(1).await?;
    Ok(ScyllaRepository::new(client))
}
