//! Telemetry event types for the message path.
//!
//! Events are fire-and-forget: emitting one must never block or fail message
//! delivery. The broker publishes them on a broadcast bus (`parley-core`) and
//! mirrors them into `tracing` logs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened on the message path.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A validated envelope was appended to a recipient's pending queue.
    MessageDelivered,
    /// A message failed policy validation and a rejection notice was queued.
    MessageValidationFailed,
    /// A recipient drained its pending queue.
    QueueDrained,
    /// Something on the message path failed in a non-fatal way.
    Error,
}

/// One telemetry event with the identifiers needed to correlate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: EventType,
    pub occurred_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<Uuid>,
    /// Free-form key/value details (queue depths, violation reasons, ...).
    #[serde(default)]
    pub details: HashMap<String, String>,
}

impl TelemetryEvent {
    /// Build an event with no identifiers; chain the `with_*` builders to
    /// attach them.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            occurred_at: Utc::now(),
            correlation_id: None,
            agent_id: None,
            message_id: None,
            details: HashMap::new(),
        }
    }

    pub fn with_correlation_id(mut self, id: Uuid) -> Self {
        self.correlation_id = Some(id);
        self
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_message_id(mut self, id: Uuid) -> Self {
        self.message_id = Some(id);
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}
