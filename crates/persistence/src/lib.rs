//! Call log persistence
//!
//! Provides storage for call log records:
//! - In-memory store (default, single process)
//! - ScyllaDB store (`persistence.enabled = true`)

pub mod call_log;
pub mod client;
pub mod error;
pub mod schema;

pub use call_log::{
    CallLogRecord, CallLogStore, CallLogUpdate, HandledBy, InMemoryCallLogStore,
    ScyllaCallLogStore,
};
pub use client::{ScyllaClient, ScyllaConfig};
pub use error::PersistenceError;

/// Connect to ScyllaDB, ensure the schema and return the call log store
pub async fn init(config: ScyllaConfig) -> Result<ScyllaCallLogStore, PersistenceError> {
    let client = ScyllaClient::connect(config).await?;
    client.ensure_schema().await?;
    Ok(ScyllaCallLogStore::new(client))
}
