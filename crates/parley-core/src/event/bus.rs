//! Broadcast event bus for distributing `TelemetryEvent` to subscribers.
//!
//! Built on `tokio::sync::broadcast`. Telemetry is strictly fire-and-forget:
//! publishing never blocks, and publishing with no active subscribers drops
//! the event. Every event is additionally mirrored into `tracing` logs so
//! observability works even with no bus subscriber.

use parley_types::event::TelemetryEvent;
use tokio::sync::broadcast;

/// Multi-consumer bus for message-path telemetry.
///
/// Cloning the bus clones the sender, allowing multiple producers and
/// consumers.
pub struct EventBus {
    sender: broadcast::Sender<TelemetryEvent>,
}

impl EventBus {
    /// Create a new event bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new subscriber that will receive all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.sender.subscribe()
    }

    /// Publish an event to all current subscribers.
    ///
    /// Never blocks and never fails; with no subscribers the event is
    /// silently dropped (it is still logged).
    pub fn publish(&self, event: TelemetryEvent) {
        tracing::debug!(
            event_type = ?event.event_type,
            agent_id = event.agent_id.as_deref(),
            message_id = ?event.message_id,
            "telemetry event"
        );
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        // 1024 is plenty for a single broker's message path.
        Self::new(1024)
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("receiver_count", &self.sender.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_types::event::EventType;

    fn sample_event() -> TelemetryEvent {
        TelemetryEvent::new(EventType::MessageDelivered).with_agent_id("medic")
    }

    #[tokio::test]
    async fn publish_and_subscribe_delivers_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(sample_event());

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type, EventType::MessageDelivered);
        assert_eq!(received.agent_id.as_deref(), Some("medic"));
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_event() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(sample_event());

        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(sample_event());
        bus.publish(sample_event());
    }

    #[test]
    fn clone_shares_channel() {
        let bus = EventBus::new(16);
        let bus2 = bus.clone();
        let mut rx = bus.subscribe();

        bus2.publish(sample_event());

        assert!(rx.try_recv().is_ok());
    }
}
