//! Inter-agent message envelope types for Parley.
//!
//! Defines the immutable `Envelope` carried between agents, along with the
//! `MessageKind` tag distinguishing ordinary traffic from responses and
//! broker-synthesized rejection notices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved sender id used by the broker for synthesized messages
/// (rejection notices are sent by the broker, not by any agent).
pub const BROKER_AGENT_ID: &str = "broker";

/// What kind of traffic an envelope carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary one-to-one message between agents.
    Direct,
    /// One-to-many announcement.
    Broadcast,
    /// Reply to an earlier message (carries `reply_to`).
    Response,
    /// Broker-synthesized error or rejection notice.
    Error,
}

/// A single message between agents, plus its metadata.
///
/// Envelopes are immutable once constructed: every send creates a new
/// `Envelope`, and rejection notices are new envelopes rather than mutations
/// of the original.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// UUIDv7 message ID.
    pub message_id: Uuid,
    /// Groups the envelopes of one conversation turn.
    pub correlation_id: Uuid,
    /// Id of the sending agent.
    pub sender: String,
    /// Id of the receiving agent.
    pub recipient: String,
    /// What kind of traffic this envelope carries.
    pub kind: MessageKind,
    /// Message text.
    pub payload: String,
    /// When the envelope was created.
    pub created_at: DateTime<Utc>,
    /// Optional reference to an earlier message for threading.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
}

impl Envelope {
    /// Build a direct message from one agent to another, starting a new
    /// conversation turn (fresh correlation id).
    pub fn direct(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id: Uuid::now_v7(),
            sender: sender.into(),
            recipient: recipient.into(),
            kind: MessageKind::Direct,
            payload: payload.into(),
            created_at: Utc::now(),
            reply_to: None,
        }
    }

    /// Build a response to an earlier envelope, joining its conversation turn.
    pub fn response(original: &Envelope, payload: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id: original.correlation_id,
            sender: original.recipient.clone(),
            recipient: original.sender.clone(),
            kind: MessageKind::Response,
            payload: payload.into(),
            created_at: Utc::now(),
            reply_to: Some(original.message_id),
        }
    }

    /// Build a rejection notice addressed back to the sender of `original`.
    ///
    /// The notice is sent by [`BROKER_AGENT_ID`], joins the original
    /// conversation turn, and references the rejected message via `reply_to`.
    pub fn rejection(original: &Envelope, payload: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::now_v7(),
            correlation_id: original.correlation_id,
            sender: BROKER_AGENT_ID.to_string(),
            recipient: original.sender.clone(),
            kind: MessageKind::Error,
            payload: payload.into(),
            created_at: Utc::now(),
            reply_to: Some(original.message_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_builds_fresh_turn() {
        let msg = Envelope::direct("dispatcher", "medic", "status report please");

        assert_eq!(msg.sender, "dispatcher");
        assert_eq!(msg.recipient, "medic");
        assert_eq!(msg.kind, MessageKind::Direct);
        assert!(msg.reply_to.is_none());
    }

    #[test]
    fn response_joins_original_turn() {
        let original = Envelope::direct("dispatcher", "medic", "status report please");
        let resp = Envelope::response(&original, "en route, two minutes out");

        assert_eq!(resp.sender, "medic");
        assert_eq!(resp.recipient, "dispatcher");
        assert_eq!(resp.kind, MessageKind::Response);
        assert_eq!(resp.correlation_id, original.correlation_id);
        assert_eq!(resp.reply_to, Some(original.message_id));
    }

    #[test]
    fn rejection_addresses_original_sender() {
        let original = Envelope::direct("dispatcher", "medic", "x");
        let notice = Envelope::rejection(&original, "message rejected");

        assert_eq!(notice.sender, BROKER_AGENT_ID);
        assert_eq!(notice.recipient, "dispatcher");
        assert_eq!(notice.kind, MessageKind::Error);
        assert_eq!(notice.correlation_id, original.correlation_id);
        assert_eq!(notice.reply_to, Some(original.message_id));
    }

    #[test]
    fn envelope_json_roundtrip() {
        let msg = Envelope::direct("plumber", "mold_specialist", "leak under the sink");
        let json_str = serde_json::to_string(&msg).unwrap();

        assert!(json_str.contains("\"kind\":\"direct\""));
        // reply_to should be omitted when None
        assert!(!json_str.contains("reply_to"));

        let parsed: Envelope = serde_json::from_str(&json_str).unwrap();
        assert_eq!(parsed.message_id, msg.message_id);
        assert_eq!(parsed.sender, "plumber");
        assert_eq!(parsed.payload, "leak under the sink");
    }

    #[test]
    fn message_kind_serde_tags() {
        for (kind, tag) in [
            (MessageKind::Direct, "\"direct\""),
            (MessageKind::Broadcast, "\"broadcast\""),
            (MessageKind::Response, "\"response\""),
            (MessageKind::Error, "\"error\""),
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, tag);
            let parsed: MessageKind = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn message_ids_are_time_sortable() {
        let a = Envelope::direct("a", "b", "first");
        let b = Envelope::direct("a", "b", "second");
        // UUIDv7 sorts by creation time
        assert!(a.message_id < b.message_id);
    }
}
