//! Broadcast emitter for agent lifecycle events.

use tokio::sync::broadcast;
use tracing::trace;

use foreman_core::events::ForemanEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out emitter for [`ForemanEvent`]s.
///
/// Emission never blocks the orchestration loop: with no subscribers the
/// event is dropped, and a slow subscriber lags (loses old events) rather
/// than exerting backpressure.
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<ForemanEvent>,
}

impl EventEmitter {
    /// Create an emitter with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the event stream from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ForemanEvent> {
        self.sender.subscribe()
    }

    /// Emit an event. A send failure just means nobody is listening.
    pub fn emit(&self, event: ForemanEvent) {
        trace!(event_type = event.event_type(), "emit");
        let _ = self.sender.send(event);
    }

    /// Current subscriber count.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_core::events::BaseEvent;

    #[tokio::test]
    async fn delivers_to_subscribers() {
        let emitter = EventEmitter::new();
        let mut rx = emitter.subscribe();
        emitter.emit(ForemanEvent::AgentStart { base: BaseEvent::now("s1") });
        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "agent_start");
        assert_eq!(event.session_id(), "s1");
    }

    #[tokio::test]
    async fn emit_without_subscribers_is_a_noop() {
        let emitter = EventEmitter::new();
        emitter.emit(ForemanEvent::AgentStart { base: BaseEvent::now("s1") });
        assert_eq!(emitter.receiver_count(), 0);
    }
}
