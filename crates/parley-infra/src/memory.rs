//! In-memory message store.
//!
//! Keeps every saved envelope in an append-only `Vec`. Suitable for tests
//! and for embedded brokers that do not need persistence across restarts.

use std::sync::Mutex;

use parley_core::repository::MessageStore;
use parley_types::envelope::Envelope;
use parley_types::error::StoreError;

/// `MessageStore` backed by process memory.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<Envelope>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored envelopes, across all agent pairs.
    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .expect("message store lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MessageStore for InMemoryMessageStore {
    async fn save(&self, envelope: &Envelope) -> Result<(), StoreError> {
        self.messages
            .lock()
            .expect("message store lock poisoned")
            .push(envelope.clone());
        Ok(())
    }

    async fn history_between(
        &self,
        agent_a: &str,
        agent_b: &str,
        limit: u32,
    ) -> Result<Vec<Envelope>, StoreError> {
        let messages = self.messages.lock().expect("message store lock poisoned");
        let matching: Vec<Envelope> = messages
            .iter()
            .filter(|e| {
                (e.sender == agent_a && e.recipient == agent_b)
                    || (e.sender == agent_b && e.recipient == agent_a)
            })
            .cloned()
            .collect();
        // Insertion order is chronological; keep only the newest `limit`.
        let skip = matching.len().saturating_sub(limit as usize);
        Ok(matching.into_iter().skip(skip).collect())
    }
}
