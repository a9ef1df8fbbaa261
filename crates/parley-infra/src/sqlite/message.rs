//! SQLite message store implementation.
//!
//! Implements `MessageStore` from `parley-core` using sqlx with split
//! read/write pools. Raw queries, a private row struct for SQLite-to-domain
//! mapping.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use parley_core::repository::MessageStore;
use parley_types::envelope::{Envelope, MessageKind};
use parley_types::error::StoreError;

use super::pool::StorePool;

/// SQLite-backed implementation of `MessageStore`.
pub struct SqliteMessageStore {
    pool: StorePool,
}

impl SqliteMessageStore {
    pub fn new(pool: StorePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct EnvelopeRow {
    message_id: String,
    correlation_id: String,
    sender: String,
    recipient: String,
    kind: String,
    payload: String,
    created_at: String,
    reply_to: Option<String>,
}

impl EnvelopeRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            message_id: row.try_get("message_id")?,
            correlation_id: row.try_get("correlation_id")?,
            sender: row.try_get("sender")?,
            recipient: row.try_get("recipient")?,
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            reply_to: row.try_get("reply_to")?,
        })
    }

    fn into_envelope(self) -> Result<Envelope, StoreError> {
        let message_id = Uuid::parse_str(&self.message_id)
            .map_err(|e| StoreError::Query(format!("invalid message_id: {e}")))?;
        let correlation_id = Uuid::parse_str(&self.correlation_id)
            .map_err(|e| StoreError::Query(format!("invalid correlation_id: {e}")))?;
        let reply_to = self
            .reply_to
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| StoreError::Query(format!("invalid reply_to: {e}")))?;
        let kind = parse_kind(&self.kind)?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Envelope {
            message_id,
            correlation_id,
            sender: self.sender,
            recipient: self.recipient,
            kind,
            payload: self.payload,
            created_at,
            reply_to,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_kind(s: &str) -> Result<MessageKind, StoreError> {
    match s {
        "direct" => Ok(MessageKind::Direct),
        "broadcast" => Ok(MessageKind::Broadcast),
        "response" => Ok(MessageKind::Response),
        "error" => Ok(MessageKind::Error),
        other => Err(StoreError::Query(format!("unknown message kind: {other}"))),
    }
}

fn kind_tag(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Direct => "direct",
        MessageKind::Broadcast => "broadcast",
        MessageKind::Response => "response",
        MessageKind::Error => "error",
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// MessageStore implementation
// ---------------------------------------------------------------------------

impl MessageStore for SqliteMessageStore {
    async fn save(&self, envelope: &Envelope) -> Result<(), StoreError> {
        sqlx::query(
            r#"INSERT INTO envelopes (message_id, correlation_id, sender, recipient, kind, payload, created_at, reply_to)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(envelope.message_id.to_string())
        .bind(envelope.correlation_id.to_string())
        .bind(&envelope.sender)
        .bind(&envelope.recipient)
        .bind(kind_tag(envelope.kind))
        .bind(&envelope.payload)
        .bind(format_datetime(&envelope.created_at))
        .bind(envelope.reply_to.map(|id| id.to_string()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        Ok(())
    }

    async fn history_between(
        &self,
        agent_a: &str,
        agent_b: &str,
        limit: u32,
    ) -> Result<Vec<Envelope>, StoreError> {
        // Fetch the newest `limit` rows, then flip to chronological order.
        let rows = sqlx::query(
            r#"SELECT * FROM envelopes
               WHERE (sender = ?1 AND recipient = ?2) OR (sender = ?2 AND recipient = ?1)
               ORDER BY created_at DESC, message_id DESC
               LIMIT ?3"#,
        )
        .bind(agent_a)
        .bind(agent_b)
        .bind(limit as i64)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| StoreError::Query(e.to_string()))?;

        let mut envelopes = rows
            .iter()
            .map(|row| {
                EnvelopeRow::from_row(row)
                    .map_err(|e| StoreError::Query(e.to_string()))?
                    .into_envelope()
            })
            .collect::<Result<Vec<_>, _>>()?;
        envelopes.reverse();
        Ok(envelopes)
    }
}
