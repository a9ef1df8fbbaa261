//! Message store trait definition.
//!
//! Defines the persistence interface the broker depends on. The
//! infrastructure layer implements it with SQLite (or, for tests and embedded
//! use, in memory). The loop detector calls `history_between` on every
//! message, so implementations must keep bounded lookups cheap.
//!
//! Uses native async fn in traits (Rust 2024 edition, no async_trait macro).

use parley_types::envelope::Envelope;
use parley_types::error::StoreError;

/// Repository trait for envelope persistence.
pub trait MessageStore: Send + Sync {
    /// Persist an envelope for audit trail and history lookups.
    fn save(
        &self,
        envelope: &Envelope,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// The most recent envelopes exchanged between two agents (in either
    /// direction), ordered oldest first, at most `limit` entries.
    fn history_between(
        &self,
        agent_a: &str,
        agent_b: &str,
        limit: u32,
    ) -> impl std::future::Future<Output = Result<Vec<Envelope>, StoreError>> + Send;
}
