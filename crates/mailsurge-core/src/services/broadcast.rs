/// Per-session fan-out of progress events to live observers
///
/// Delivery is fire-and-forget: events published while nobody is
/// subscribed are dropped, and observers that fall behind lose the
/// oldest events. Observers reconcile by fetching the session snapshot
/// on (re)connect. Within one session, a single observer sees events in
/// publish order; across sessions there is no ordering at all.
use crate::constants::EVENT_CHANNEL_CAPACITY;
use crate::models::events::SessionEvent;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};
use tokio::sync::broadcast;

pub struct EventBroadcaster {
    channels: RwLock<HashMap<String, broadcast::Sender<SessionEvent>>>,
    capacity: usize,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, broadcast::Sender<SessionEvent>>> {
        self.channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Subscribes to a session's event stream, creating the channel on
    /// first use
    pub fn subscribe(&self, session_id: &str) -> broadcast::Receiver<SessionEvent> {
        let mut channels = self.write();
        channels
            .entry(session_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publishes to whoever is currently listening; no observers, no
    /// delivery
    pub fn publish(&self, session_id: &str, event: SessionEvent) {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(sender) = channels.get(session_id) {
            // Err means no active receivers; fire-and-forget
            let _ = sender.send(event);
        }
    }

    /// Number of observers currently attached to the session
    pub fn subscriber_count(&self, session_id: &str) -> usize {
        let channels = self
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .get(session_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Drops the session's channel; outstanding receivers see the stream
    /// end
    pub fn remove(&self, session_id: &str) {
        self.write().remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::events::EventKind;

    #[test]
    fn test_subscriber_receives_events_in_publish_order() {
        let broadcaster = EventBroadcaster::new(16);
        let mut rx = broadcaster.subscribe("s1");

        broadcaster.publish("s1", SessionEvent::now("s1", EventKind::SessionStarted));
        broadcaster.publish(
            "s1",
            SessionEvent::now(
                "s1",
                EventKind::EmailSending {
                    recipient: "a@example.com".to_string(),
                },
            ),
        );

        tokio_test::block_on(async {
            let first = rx.recv().await.unwrap();
            assert_eq!(first.kind, EventKind::SessionStarted);
            let second = rx.recv().await.unwrap();
            assert!(matches!(second.kind, EventKind::EmailSending { .. }));
        });
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let broadcaster = EventBroadcaster::new(16);
        // No channel yet: nothing to deliver to, nothing panics
        broadcaster.publish("s1", SessionEvent::now("s1", EventKind::SessionStarted));

        // A later subscriber does not see the earlier event
        let mut rx = broadcaster.subscribe("s1");
        broadcaster.publish("s1", SessionEvent::now("s1", EventKind::SessionPaused));
        tokio_test::block_on(async {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.kind, EventKind::SessionPaused);
        });
    }

    #[test]
    fn test_events_are_isolated_per_session() {
        let broadcaster = EventBroadcaster::new(16);
        let mut rx1 = broadcaster.subscribe("s1");
        let _rx2 = broadcaster.subscribe("s2");

        broadcaster.publish("s2", SessionEvent::now("s2", EventKind::SessionStarted));
        broadcaster.publish("s1", SessionEvent::now("s1", EventKind::SessionCancelled));

        tokio_test::block_on(async {
            let event = rx1.recv().await.unwrap();
            assert_eq!(event.kind, EventKind::SessionCancelled);
        });
    }

    #[test]
    fn test_subscriber_count_and_remove() {
        let broadcaster = EventBroadcaster::new(16);
        assert_eq!(broadcaster.subscriber_count("s1"), 0);

        let rx = broadcaster.subscribe("s1");
        assert_eq!(broadcaster.subscriber_count("s1"), 1);

        drop(rx);
        broadcaster.remove("s1");
        assert_eq!(broadcaster.subscriber_count("s1"), 0);
    }
}
