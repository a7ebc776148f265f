//! Domain event publication
//!
//! Publication is fire-and-forget: a missing subscriber or a lagging one never
//! fails the request that produced the event.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

pub const TOPIC_LOGIN: &str = "auth.login";
pub const TOPIC_LOGOUT: &str = "auth.logout";
pub const TOPIC_SESSION_REVOKED: &str = "auth.session_revoked";

const CHANNEL_CAPACITY: usize = 256;

/// An event as delivered to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub topic: String,
    pub payload: Value,
    pub timestamp: String,
}

pub trait EventBus: Send + Sync {
    fn publish(&self, topic: &str, payload: Value);
}

/// In-process event bus over a broadcast channel
pub struct BroadcastEventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus for BroadcastEventBus {
    fn publish(&self, topic: &str, payload: Value) {
        let event = DomainEvent {
            topic: topic.to_string(),
            payload,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        // No receivers is not an error
        if self.tx.send(event).is_err() {
            debug!(topic = %topic, "Event published with no subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = BroadcastEventBus::new();
        let mut rx = bus.subscribe();

        bus.publish(TOPIC_LOGIN, json!({ "subjectId": 1 }));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.topic, TOPIC_LOGIN);
        assert_eq!(event.payload["subjectId"], 1);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = BroadcastEventBus::default();
        bus.publish(TOPIC_LOGOUT, json!({}));
    }
}
