//! ScyllaDB schema creation

use crate::error::PersistenceError;
use scylla::Session;

/// Create the keyspace if it doesn't exist
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
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create keyspace: {}", e)))?;

    Ok(())
}

/// Create all required tables
pub async fn create_tables(session: &Session, keyspace: &str) -> Result<(), PersistenceError> {
    let call_logs_table = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {}.call_logs (
            call_id TEXT,
            id UUID,
            company_id TEXT,
            caller_number TEXT,
            receiver_number TEXT,
            bot_name TEXT,
            start_time TIMESTAMP,
            end_time TIMESTAMP,
            duration_secs INT,
            handled_by TEXT,
            escalation_reason TEXT,
            transcript TEXT,
            callback_details TEXT,
            abusive_detected BOOLEAN,
            status TEXT,
            updated_at TIMESTAMP,
            PRIMARY KEY (call_id)
        )
    "#,
        keyspace
    );

    session
        .query_unpaged(call_logs_table, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create call_logs table: {}", e)))?;

    let company_index = format!(
        "CREATE INDEX IF NOT EXISTS call_logs_company_idx ON {}.call_logs (company_id)",
        keyspace
    );

    session
        .query_unpaged(company_index, &[])
        .await
        .map_err(|e| PersistenceError::SchemaError(format!("Failed to create call_logs index: {}", e)))?;

    Ok(())
}
