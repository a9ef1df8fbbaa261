//! In-process message broker with inline policy validation.
//!
//! Every send runs through the validation pipeline before delivery. Rejected
//! messages never reach the recipient; the broker synthesizes a rejection
//! notice back to the sender instead, and that notice bypasses the pipeline
//! so a sender can never be cut off from its own rejection feedback.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use dashmap::DashMap;
use parley_types::envelope::Envelope;
use parley_types::event::{EventType, TelemetryEvent};
use parley_types::policy::PolicyViolation;

use crate::event::bus::EventBus;
use crate::policy::manager::PolicyManager;
use crate::repository::MessageStore;
use crate::validator::MessageValidator;

/// What happened to a sent envelope.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The envelope passed validation and sits in the recipient's queue.
    Delivered,
    /// Validation failed; a rejection notice was queued back to the sender.
    Rejected(Vec<PolicyViolation>),
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered)
    }
}

/// Routes envelopes between agents, validating each one inline.
///
/// Queues are per-recipient FIFO. The broker does not push: recipients drain
/// their own queue with [`MessageBroker::take_pending`].
pub struct MessageBroker<S: MessageStore> {
    queues: DashMap<String, VecDeque<Envelope>>,
    validator: MessageValidator<S>,
    policies: Arc<PolicyManager>,
    store: Arc<S>,
    events: EventBus,
}

impl<S: MessageStore> MessageBroker<S> {
    pub fn new(policies: Arc<PolicyManager>, store: Arc<S>, events: EventBus) -> Self {
        let history_window = policies.config().history_window;
        Self {
            queues: DashMap::new(),
            validator: MessageValidator::new(policies.clone(), store.clone(), history_window),
            policies,
            store,
            events,
        }
    }

    pub fn policies(&self) -> &Arc<PolicyManager> {
        &self.policies
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Validate and route one envelope.
    ///
    /// On success the envelope is appended to the recipient's queue and
    /// persisted. On rejection a notice enumerating every violated policy is
    /// queued to the sender instead; the original envelope is dropped and
    /// never persisted, so it cannot pollute future history lookups.
    pub async fn send(&self, envelope: Envelope) -> SendOutcome {
        self.send_with_metadata(envelope, HashMap::new()).await
    }

    /// [`MessageBroker::send`] with caller-supplied metadata forwarded to the
    /// policy pipeline.
    pub async fn send_with_metadata(
        &self,
        envelope: Envelope,
        metadata: HashMap<String, String>,
    ) -> SendOutcome {
        let validation = self.validator.validate(&envelope, metadata).await;
        if validation.valid {
            self.deliver(envelope).await;
            return SendOutcome::Delivered;
        }

        let violations = validation.violations;
        tracing::info!(
            sender = envelope.sender,
            recipient = envelope.recipient,
            message_id = %envelope.message_id,
            violations = violations.len(),
            "message rejected by policy"
        );

        let notice = Envelope::rejection(&envelope, self.rejection_payload(&violations));
        let reasons = violations
            .iter()
            .map(|v| v.policy_name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        self.events.publish(
            TelemetryEvent::new(EventType::MessageValidationFailed)
                .with_correlation_id(envelope.correlation_id)
                .with_agent_id(envelope.sender.clone())
                .with_message_id(envelope.message_id)
                .with_detail("recipient", envelope.recipient.clone())
                .with_detail("policies", reasons),
        );

        // Rejection notices skip the pipeline: feedback to the sender must
        // not itself be rejectable.
        self.deliver(notice).await;
        SendOutcome::Rejected(violations)
    }

    /// Drain and return the recipient's pending queue, oldest first.
    pub fn take_pending(&self, agent_id: &str) -> Vec<Envelope> {
        let drained: Vec<Envelope> = self
            .queues
            .get_mut(agent_id)
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default();

        if !drained.is_empty() {
            self.events.publish(
                TelemetryEvent::new(EventType::QueueDrained)
                    .with_agent_id(agent_id)
                    .with_detail("drained", drained.len().to_string()),
            );
        }
        drained
    }

    /// Number of envelopes waiting for an agent.
    pub fn queue_depth(&self, agent_id: &str) -> usize {
        self.queues.get(agent_id).map(|q| q.len()).unwrap_or(0)
    }

    async fn deliver(&self, envelope: Envelope) {
        let (before, after) = {
            let mut queue = self.queues.entry(envelope.recipient.clone()).or_default();
            let before = queue.len();
            queue.push_back(envelope.clone());
            (before, queue.len())
        };

        if let Err(err) = self.store.save(&envelope).await {
            // Delivery already happened; persistence failure only degrades
            // future history lookups.
            tracing::warn!(
                message_id = %envelope.message_id,
                error = %err,
                "failed to persist delivered envelope"
            );
            self.events.publish(
                TelemetryEvent::new(EventType::Error)
                    .with_message_id(envelope.message_id)
                    .with_detail("error", err.to_string()),
            );
        }

        self.events.publish(
            TelemetryEvent::new(EventType::MessageDelivered)
                .with_correlation_id(envelope.correlation_id)
                .with_agent_id(envelope.recipient.clone())
                .with_message_id(envelope.message_id)
                .with_detail("queue_depth_before", before.to_string())
                .with_detail("queue_depth_after", after.to_string()),
        );
    }

    /// Human-readable rejection text listing every violated policy with its
    /// reason and, where registered, remediation guidance.
    fn rejection_payload(&self, violations: &[PolicyViolation]) -> String {
        let mut lines = vec!["Your message was rejected by the following policies:".to_string()];
        for violation in violations {
            match self.policies.guidance_for(&violation.policy_name) {
                Some(guidance) => lines.push(format!(
                    "- {}: {} ({})",
                    violation.policy_name, violation.reason, guidance
                )),
                None => lines.push(format!("- {}: {}", violation.policy_name, violation.reason)),
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use parley_types::config::ValidatorConfig;
    use parley_types::envelope::{BROKER_AGENT_ID, MessageKind};
    use parley_types::error::StoreError;

    use crate::policy::policy::{Policy, Verdict};

    /// In-memory store that records every save for assertions.
    #[derive(Default)]
    struct RecordingStore {
        saved: Mutex<Vec<Envelope>>,
    }

    impl RecordingStore {
        fn saved_ids(&self) -> Vec<uuid::Uuid> {
            self.saved
                .lock()
                .expect("recording store lock poisoned")
                .iter()
                .map(|e| e.message_id)
                .collect()
        }
    }

    impl MessageStore for RecordingStore {
        async fn save(&self, envelope: &Envelope) -> Result<(), StoreError> {
            self.saved
                .lock()
                .expect("recording store lock poisoned")
                .push(envelope.clone());
            Ok(())
        }

        async fn history_between(
            &self,
            agent_a: &str,
            agent_b: &str,
            limit: u32,
        ) -> Result<Vec<Envelope>, StoreError> {
            let saved = self.saved.lock().expect("recording store lock poisoned");
            let matching: Vec<Envelope> = saved
                .iter()
                .filter(|e| {
                    (e.sender == agent_a && e.recipient == agent_b)
                        || (e.sender == agent_b && e.recipient == agent_a)
                })
                .cloned()
                .collect();
            let skip = matching.len().saturating_sub(limit as usize);
            Ok(matching.into_iter().skip(skip).collect())
        }
    }

    fn broker_with(policies: Vec<Policy>) -> MessageBroker<RecordingStore> {
        let manager = Arc::new(PolicyManager::new(ValidatorConfig::default()));
        for policy in policies {
            manager.add(policy).unwrap();
        }
        MessageBroker::new(manager, Arc::new(RecordingStore::default()), EventBus::default())
    }

    fn reject_all(name: &str, priority: i32) -> Policy {
        Policy::heuristic(name, "rejects everything", priority, |_, _| {
            Ok(Verdict::fail("always rejected"))
        })
    }

    #[tokio::test]
    async fn delivered_message_reaches_recipient_queue_and_store() {
        let broker = broker_with(Vec::new());
        let envelope = Envelope::direct("dispatcher", "medic", "status report please");
        let id = envelope.message_id;

        let outcome = broker.send(envelope).await;
        assert!(outcome.is_delivered());
        assert_eq!(broker.queue_depth("medic"), 1);
        assert_eq!(broker.store.saved_ids(), vec![id]);

        let pending = broker.take_pending("medic");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message_id, id);
        assert_eq!(broker.queue_depth("medic"), 0);
    }

    #[tokio::test]
    async fn take_pending_preserves_fifo_order() {
        let broker = broker_with(Vec::new());
        for payload in ["first message in order", "second message in order", "third one"] {
            broker.send(Envelope::direct("a", "b", payload)).await;
        }

        let pending = broker.take_pending("b");
        let payloads: Vec<&str> = pending.iter().map(|e| e.payload.as_str()).collect();
        assert_eq!(
            payloads,
            vec!["first message in order", "second message in order", "third one"]
        );
    }

    #[tokio::test]
    async fn rejected_message_never_reaches_recipient() {
        let broker = broker_with(vec![reject_all("blocker", 50)]);
        let envelope = Envelope::direct("dispatcher", "medic", "a message that will be blocked");
        let rejected_id = envelope.message_id;

        let outcome = broker.send(envelope).await;
        let SendOutcome::Rejected(violations) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].policy_name, "blocker");

        // Recipient queue untouched, rejected envelope never persisted.
        assert_eq!(broker.queue_depth("medic"), 0);
        assert!(!broker.store.saved_ids().contains(&rejected_id));

        // Sender gets exactly one broker-synthesized notice.
        let pending = broker.take_pending("dispatcher");
        assert_eq!(pending.len(), 1);
        let notice = &pending[0];
        assert_eq!(notice.sender, BROKER_AGENT_ID);
        assert_eq!(notice.kind, MessageKind::Error);
        assert_eq!(notice.reply_to, Some(rejected_id));
        assert!(notice.payload.contains("blocker"));
        assert!(notice.payload.contains("always rejected"));
    }

    #[tokio::test]
    async fn rejection_notice_lists_every_violated_policy_with_guidance() {
        let broker = broker_with(vec![
            reject_all("first_gate", 60),
            Policy::heuristic("second_gate", "also rejects", 40, |_, _| {
                Ok(Verdict::fail("second reason"))
            })
            .with_guidance("shorten the message and try again"),
        ]);

        let outcome = broker
            .send(Envelope::direct("a", "b", "blocked by two policies at once"))
            .await;
        let SendOutcome::Rejected(violations) = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(violations.len(), 2);

        let notice = broker.take_pending("a").remove(0);
        assert!(notice.payload.contains("first_gate"));
        assert!(notice.payload.contains("second_gate"));
        assert!(notice.payload.contains("shorten the message and try again"));
    }

    #[tokio::test]
    async fn rejection_notice_bypasses_the_pipeline() {
        // A critical reject-all policy would reject the notice itself if
        // notices went through validation.
        let broker = broker_with(vec![reject_all("blocker", 100)]);

        broker
            .send(Envelope::direct("a", "b", "a message that will be blocked"))
            .await;
        let pending = broker.take_pending("a");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].sender, BROKER_AGENT_ID);
    }

    #[tokio::test]
    async fn delivery_publishes_telemetry_with_queue_depths() {
        let broker = broker_with(Vec::new());
        let mut rx = broker.events().subscribe();

        broker.send(Envelope::direct("a", "b", "hello over there friend")).await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::MessageDelivered);
        assert_eq!(event.agent_id.as_deref(), Some("b"));
        assert_eq!(
            event.details.get("queue_depth_before").map(String::as_str),
            Some("0")
        );
        assert_eq!(
            event.details.get("queue_depth_after").map(String::as_str),
            Some("1")
        );
    }

    #[tokio::test]
    async fn rejection_publishes_validation_failed_event() {
        let broker = broker_with(vec![reject_all("blocker", 50)]);
        let mut rx = broker.events().subscribe();

        let envelope = Envelope::direct("a", "b", "a message that will be blocked");
        let id = envelope.message_id;
        broker.send(envelope).await;

        let event = rx.try_recv().unwrap();
        assert_eq!(event.event_type, EventType::MessageValidationFailed);
        assert_eq!(event.agent_id.as_deref(), Some("a"));
        assert_eq!(event.message_id, Some(id));
        assert_eq!(event.details.get("policies").map(String::as_str), Some("blocker"));
    }

    #[tokio::test]
    async fn take_pending_for_unknown_agent_is_empty() {
        let broker = broker_with(Vec::new());
        assert!(broker.take_pending("nobody").is_empty());
        assert_eq!(broker.queue_depth("nobody"), 0);
    }
}
