//! Database pool with split reader/writer connections in WAL mode.
//!
//! SQLite allows only one writer at a time. `StorePool` pairs a
//! multi-connection reader pool for concurrent history lookups with a
//! single-connection writer pool for serialized inserts. Both use WAL
//! journal mode.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS envelopes (
    message_id     TEXT PRIMARY KEY,
    correlation_id TEXT NOT NULL,
    sender         TEXT NOT NULL,
    recipient      TEXT NOT NULL,
    kind           TEXT NOT NULL,
    payload        TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    reply_to       TEXT
);

CREATE INDEX IF NOT EXISTS idx_envelopes_pair
    ON envelopes (sender, recipient, created_at);
"#;

/// Split read/write pool for SQLite with WAL mode.
///
/// - `reader`: multi-connection pool (up to 8) for concurrent SELECT queries.
/// - `writer`: single-connection pool for serialized inserts.
#[derive(Clone)]
pub struct StorePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl StorePool {
    /// Create a new `StorePool` with split reader/writer connections.
    ///
    /// Applies the envelope schema on the writer pool before opening the
    /// reader pool. Both pools use WAL journal mode and a 5-second busy
    /// timeout.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let base_opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Schema must exist before the read-only pool opens.
        sqlx::raw_sql(SCHEMA).execute(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }
}

/// Returns the default database URL based on `PARLEY_DATA_DIR` env var,
/// falling back to `~/.parley/parley.db`.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("PARLEY_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.parley")
    });
    format!("sqlite://{data_dir}/parley.db")
}
