//! Call log records
//!
//! One record per placed call, keyed by the provider's call id. The
//! orchestrator creates it, the conversation engine flags abuse and records
//! escalations, and the reconciler finalizes it on a terminal status.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::CqlTimestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{PersistenceError, ScyllaClient};

/// Party handling the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum HandledBy {
    #[default]
    #[serde(rename = "AI")]
    Ai,
    Human,
}

impl HandledBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::Human => "Human",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("human") {
            Self::Human
        } else {
            Self::Ai
        }
    }
}

/// Persisted call log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogRecord {
    pub id: Uuid,
    pub company_id: String,
    pub call_id: String,
    pub caller_number: String,
    pub receiver_number: String,
    /// Persona display name
    pub bot_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<u32>,
    pub handled_by: HandledBy,
    pub escalation_reason: Option<String>,
    pub transcript: Option<String>,
    pub callback_details: Option<String>,
    pub abusive_detected: bool,
    pub status: String,
}

impl CallLogRecord {
    /// New record for a just-placed call, handled by the AI
    pub fn started(
        company_id: impl Into<String>,
        call_id: impl Into<String>,
        caller_number: impl Into<String>,
        receiver_number: impl Into<String>,
        bot_name: impl Into<String>,
        status: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            company_id: company_id.into(),
            call_id: call_id.into(),
            caller_number: caller_number.into(),
            receiver_number: receiver_number.into(),
            bot_name: bot_name.into(),
            start_time: Utc::now(),
            end_time: None,
            duration_secs: None,
            handled_by: HandledBy::Ai,
            escalation_reason: None,
            transcript: None,
            callback_details: None,
            abusive_detected: false,
            status: status.into(),
        }
    }

    /// Apply the fields present in `update`
    pub fn apply(&mut self, update: CallLogUpdate) {
        if let Some(end_time) = update.end_time {
            self.end_time = Some(end_time);
        }
        if let Some(duration) = update.duration_secs {
            self.duration_secs = Some(duration);
        }
        if let Some(status) = update.status {
            self.status = status;
        }
        if let Some(transcript) = update.transcript {
            self.transcript = Some(transcript);
        }
        if let Some(handled_by) = update.handled_by {
            self.handled_by = handled_by;
        }
        if let Some(reason) = update.escalation_reason {
            self.escalation_reason = Some(reason);
        }
        if let Some(details) = update.callback_details {
            self.callback_details = Some(details);
        }
        if update.abusive_detected == Some(true) {
            self.abusive_detected = true;
        }
    }
}

/// Partial update; `None` fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallLogUpdate {
    pub end_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<u32>,
    pub status: Option<String>,
    pub transcript: Option<String>,
    pub handled_by: Option<HandledBy>,
    pub escalation_reason: Option<String>,
    pub callback_details: Option<String>,
    /// Only `Some(true)` has an effect; the flag is never cleared
    pub abusive_detected: Option<bool>,
}

impl CallLogUpdate {
    pub fn abuse() -> Self {
        Self {
            abusive_detected: Some(true),
            ..Self::default()
        }
    }

    pub fn escalated(reason: impl Into<String>) -> Self {
        Self {
            handled_by: Some(HandledBy::Human),
            escalation_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Columns this update writes, with the same rules as [`CallLogRecord::apply`].
    ///
    /// Concurrent updates touching different columns never overwrite each
    /// other; for the same column the last write wins.
    pub fn column_assignments(&self) -> Vec<(&'static str, CqlValue)> {
        let mut columns = Vec::new();
        if let Some(end_time) = self.end_time {
            columns.push(("end_time", CqlValue::Timestamp(to_timestamp(end_time))));
        }
        if let Some(duration) = self.duration_secs {
            columns.push(("duration_secs", CqlValue::Int(duration.min(i32::MAX as u32) as i32)));
        }
        if let Some(status) = &self.status {
            columns.push(("status", CqlValue::Text(status.clone())));
        }
        if let Some(transcript) = &self.transcript {
            columns.push(("transcript", CqlValue::Text(transcript.clone())));
        }
        if let Some(handled_by) = self.handled_by {
            columns.push(("handled_by", CqlValue::Text(handled_by.as_str().to_string())));
        }
        if let Some(reason) = &self.escalation_reason {
            columns.push(("escalation_reason", CqlValue::Text(reason.clone())));
        }
        if let Some(details) = &self.callback_details {
            columns.push(("callback_details", CqlValue::Text(details.clone())));
        }
        if self.abusive_detected == Some(true) {
            columns.push(("abusive_detected", CqlValue::Boolean(true)));
        }
        columns
    }
}

/// Call log store trait
#[async_trait]
pub trait CallLogStore: Send + Sync {
    /// Insert a record, replacing any existing record for the same call id
    async fn create(&self, record: CallLogRecord) -> Result<(), PersistenceError>;

    /// Apply a partial update; fails with `NotFound` for unknown calls
    async fn update(&self, call_id: &str, update: CallLogUpdate) -> Result<(), PersistenceError>;

    async fn get(&self, call_id: &str) -> Result<Option<CallLogRecord>, PersistenceError>;

    /// Mark the call as having abusive content
    async fn flag_abuse(&self, call_id: &str) -> Result<(), PersistenceError> {
        self.update(call_id, CallLogUpdate::abuse()).await
    }
}

/// Process-local call log store
#[derive(Default)]
pub struct InMemoryCallLogStore {
    records: RwLock<HashMap<String, CallLogRecord>>,
}

impl InMemoryCallLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl CallLogStore for InMemoryCallLogStore {
    async fn create(&self, record: CallLogRecord) -> Result<(), PersistenceError> {
        self.records.write().insert(record.call_id.clone(), record);
        Ok(())
    }

    async fn update(&self, call_id: &str, update: CallLogUpdate) -> Result<(), PersistenceError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(call_id)
            .ok_or_else(|| PersistenceError::NotFound(call_id.to_string()))?;
        record.apply(update);
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Result<Option<CallLogRecord>, PersistenceError> {
        Ok(self.records.read().get(call_id).cloned())
    }
}

/// Call log store backed by ScyllaDB
#[derive(Clone)]
pub struct ScyllaCallLogStore {
    client: ScyllaClient,
}

type CallLogRow = (
    String,
    Uuid,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    CqlTimestamp,
    Option<CqlTimestamp>,
    Option<i32>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<bool>,
    Option<String>,
);

fn to_timestamp(time: DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(time.timestamp_millis())
}

fn from_timestamp(ts: CqlTimestamp) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ts.0)
}

impl ScyllaCallLogStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn write(&self, record: &CallLogRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.call_logs (
                call_id, id, company_id, caller_number, receiver_number, bot_name,
                start_time, end_time, duration_secs, handled_by, escalation_reason,
                transcript, callback_details, abusive_detected, status, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace()
        );

        self.client
            .session()
            .query_unpaged(
                query,
                (
                    record.call_id.as_str(),
                    record.id,
                    record.company_id.as_str(),
                    record.caller_number.as_str(),
                    record.receiver_number.as_str(),
                    record.bot_name.as_str(),
                    to_timestamp(record.start_time),
                    record.end_time.map(to_timestamp),
                    record.duration_secs.map(|d| d.min(i32::MAX as u32) as i32),
                    record.handled_by.as_str(),
                    record.escalation_reason.as_deref(),
                    record.transcript.as_deref(),
                    record.callback_details.as_deref(),
                    record.abusive_detected,
                    record.status.as_str(),
                    to_timestamp(Utc::now()),
                ),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl CallLogStore for ScyllaCallLogStore {
    async fn create(&self, record: CallLogRecord) -> Result<(), PersistenceError> {
        self.write(&record).await?;
        tracing::debug!(call_id = %record.call_id, "Call log created");
        Ok(())
    }

    async fn update(&self, call_id: &str, update: CallLogUpdate) -> Result<(), PersistenceError> {
        if self.get(call_id).await?.is_none() {
            return Err(PersistenceError::NotFound(call_id.to_string()));
        }

        // Only the changed columns are written, so best-effort updates racing
        // the finalize on the same row do not drop each other's fields
        let assignments = update.column_assignments();
        if assignments.is_empty() {
            return Ok(());
        }

        let set_clause = assignments
            .iter()
            .map(|(column, _)| format!("{} = ?", column))
            .chain(std::iter::once("updated_at = ?".to_string()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "UPDATE {}.call_logs SET {} WHERE call_id = ?",
            self.client.keyspace(),
            set_clause
        );

        let mut values: Vec<CqlValue> = assignments.into_iter().map(|(_, value)| value).collect();
        values.push(CqlValue::Timestamp(to_timestamp(Utc::now())));
        values.push(CqlValue::Text(call_id.to_string()));

        self.client.session().query_unpaged(query, values).await?;
        tracing::debug!(call_id = %call_id, "Call log updated");
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Result<Option<CallLogRecord>, PersistenceError> {
        let query = format!(
            "SELECT call_id, id, company_id, caller_number, receiver_number, bot_name,
                    start_time, end_time, duration_secs, handled_by, escalation_reason,
                    transcript, callback_details, abusive_detected, status
             FROM {}.call_logs WHERE call_id = ?",
            self.client.keyspace()
        );

        let result = self.client.session().query_unpaged(query, (call_id,)).await?;

        let Some(row) = result.rows.and_then(|rows| rows.into_iter().next()) else {
            return Ok(None);
        };

        let (
            call_id,
            id,
            company_id,
            caller_number,
            receiver_number,
            bot_name,
            start_time,
            end_time,
            duration_secs,
            handled_by,
            escalation_reason,
            transcript,
            callback_details,
            abusive_detected,
            status,
        ): CallLogRow = row
            .into_typed()
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(Some(CallLogRecord {
            id,
            company_id,
            call_id,
            caller_number: caller_number.unwrap_or_default(),
            receiver_number: receiver_number.unwrap_or_default(),
            bot_name: bot_name.unwrap_or_default(),
            start_time: from_timestamp(start_time).unwrap_or_else(Utc::now),
            end_time: end_time.and_then(from_timestamp),
            duration_secs: duration_secs.map(|d| d.max(0) as u32),
            handled_by: handled_by.as_deref().map(HandledBy::parse).unwrap_or_default(),
            escalation_reason,
            transcript,
            callback_details,
            abusive_detected: abusive_detected.unwrap_or(false),
            status: status.unwrap_or_default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(call_id: &str) -> CallLogRecord {
        CallLogRecord::started("c-1", call_id, "+15550001111", "+919876543210", "Ekta", "queued")
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = InMemoryCallLogStore::new();
        store.create(record("CA1")).await.unwrap();

        let fetched = store.get("CA1").await.unwrap().unwrap();
        assert_eq!(fetched.handled_by, HandledBy::Ai);
        assert_eq!(fetched.bot_name, "Ekta");
        assert!(store.get("CA2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_applies_present_fields_only() {
        let store = InMemoryCallLogStore::new();
        store.create(record("CA1")).await.unwrap();

        store
            .update(
                "CA1",
                CallLogUpdate {
                    status: Some("completed".to_string()),
                    duration_secs: Some(95),
                    ..CallLogUpdate::default()
                },
            )
            .await
            .unwrap();

        let fetched = store.get("CA1").await.unwrap().unwrap();
        assert_eq!(fetched.status, "completed");
        assert_eq!(fetched.duration_secs, Some(95));
        assert_eq!(fetched.receiver_number, "+919876543210");
        assert!(fetched.end_time.is_none());
    }

    #[test]
    fn test_abuse_update_touches_only_its_column() {
        assert_eq!(
            CallLogUpdate::abuse().column_assignments(),
            vec![("abusive_detected", CqlValue::Boolean(true))]
        );
        let cleared = CallLogUpdate {
            abusive_detected: Some(false),
            ..CallLogUpdate::default()
        };
        assert!(cleared.column_assignments().is_empty());
    }

    #[test]
    fn test_escalation_and_finalize_write_disjoint_columns() {
        let escalation: Vec<_> = CallLogUpdate::escalated("caller requested transfer")
            .column_assignments()
            .into_iter()
            .map(|(column, _)| column)
            .collect();
        let finalize: Vec<_> = CallLogUpdate {
            end_time: Some(Utc::now()),
            duration_secs: Some(42),
            status: Some("completed".to_string()),
            transcript: Some("Asha: hi".to_string()),
            ..CallLogUpdate::default()
        }
        .column_assignments()
        .into_iter()
        .map(|(column, _)| column)
        .collect();

        assert_eq!(escalation, vec!["handled_by", "escalation_reason"]);
        assert_eq!(finalize, vec!["end_time", "duration_secs", "status", "transcript"]);
    }

    #[tokio::test]
    async fn test_flag_abuse_is_sticky() {
        let store = InMemoryCallLogStore::new();
        store.create(record("CA1")).await.unwrap();
        store.flag_abuse("CA1").await.unwrap();
        store
            .update(
                "CA1",
                CallLogUpdate {
                    abusive_detected: Some(false),
                    ..CallLogUpdate::default()
                },
            )
            .await
            .unwrap();
        assert!(store.get("CA1").await.unwrap().unwrap().abusive_detected);
    }

    #[tokio::test]
    async fn test_update_unknown_call() {
        let store = InMemoryCallLogStore::new();
        let err = store.update("missing", CallLogUpdate::abuse()).await.unwrap_err();
        assert!(matches!(err, PersistenceError::NotFound(_)));
    }

    #[test]
    fn test_escalation_update() {
        let mut rec = record("CA1");
        rec.apply(CallLogUpdate::escalated("caller requested transfer"));
        assert_eq!(rec.handled_by, HandledBy::Human);
        assert_eq!(rec.escalation_reason.as_deref(), Some("caller requested transfer"));
    }

    #[test]
    fn test_handled_by_serialization() {
        assert_eq!(serde_json::to_string(&HandledBy::Ai).ok(), Some("\"AI\"".to_string()));
        assert_eq!(HandledBy::parse("human"), HandledBy::Human);
    }
}
