//! Headless, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Telemetry`] | Temperature readings from the sensor channel |
//! | [`Topic::Commands`] | Toolbar toggles, list clicks, scene clicks |
//! | [`Topic::UiState`] | Full-replace [`FocusSnapshot`][spotlight_types::FocusSnapshot] publications |
//! | [`Topic::HotSpotEvents`] | Registry lifecycle notices for observers |
//! | [`Topic::SystemAlerts`] | Faults and shutdown requests |

use spotlight_types::Event;
use tokio::sync::broadcast;
use tracing::warn;

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Routing lanes of the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Telemetry,
    Commands,
    UiState,
    HotSpotEvents,
    SystemAlerts,
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    telemetry: broadcast::Sender<Event>,
    commands: broadcast::Sender<Event>,
    ui_state: broadcast::Sender<Event>,
    hotspot_events: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus; `capacity` applies to every topic independently.
    pub fn new(capacity: usize) -> Self {
        let (telemetry, _) = broadcast::channel(capacity);
        let (commands, _) = broadcast::channel(capacity);
        let (ui_state, _) = broadcast::channel(capacity);
        let (hotspot_events, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            telemetry,
            commands,
            ui_state,
            hotspot_events,
            system_alerts,
        }
    }

    /// Publish `event` to `topic`.
    ///
    /// Returns the number of receivers handed the event; `0` when nobody is
    /// listening, which is a normal condition (a snapshot published before
    /// any UI connects is simply superseded by the next one).
    pub fn publish_to(&self, topic: Topic, event: Event) -> usize {
        self.topic_sender(topic).send(event).unwrap_or(0)
    }

    /// Subscribe to a single topic.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic,
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.topic_sender(topic).receiver_count()
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Telemetry => &self.telemetry,
            Topic::Commands => &self.commands,
            Topic::UiState => &self.ui_state,
            Topic::HotSpotEvents => &self.hotspot_events,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// An async receiver bound to a single [`Topic`].
pub struct TopicReceiver {
    topic: Topic,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event on this topic.
    ///
    /// Lag is logged and skipped: a telemetry reading that fell out of the
    /// buffer is superseded by the next one anyway.  Returns `None` once the
    /// bus has shut down.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`recv`][Self::recv]; `None` when empty.
    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotlight_types::{EventPayload, TelemetryReading, ViewerCommand};

    fn reading_event(source: &str) -> Event {
        Event::new(
            source,
            EventPayload::Telemetry(TelemetryReading::new("pump", 21.0, 20.0)),
        )
    }

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::Telemetry);

        let event = reading_event("test");
        assert_eq!(bus.publish_to(Topic::Telemetry, event.clone()), 1);

        let received = rx.recv().await.expect("event");
        assert_eq!(received.id, event.id);
    }

    #[test]
    fn publish_without_subscribers_is_not_an_error() {
        let bus = EventBus::default();
        assert_eq!(bus.publish_to(Topic::UiState, reading_event("test")), 0);
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut a = bus.subscribe_to(Topic::Commands);
        let mut b = bus.subscribe_to(Topic::Commands);
        assert_eq!(bus.subscriber_count(Topic::Commands), 2);

        let event = Event::new("ui", EventPayload::Command(ViewerCommand::Toggle));
        bus.publish_to(Topic::Commands, event.clone());

        assert_eq!(a.recv().await.unwrap().id, event.id);
        assert_eq!(b.recv().await.unwrap().id, event.id);
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::default();
        let mut alerts = bus.subscribe_to(Topic::SystemAlerts);
        let _telemetry = bus.subscribe_to(Topic::Telemetry);

        bus.publish_to(Topic::Telemetry, reading_event("sensor"));

        let result =
            tokio::time::timeout(std::time::Duration::from_millis(50), alerts.recv()).await;
        assert!(result.is_err(), "SystemAlerts must not see Telemetry traffic");
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_to_newest() {
        let bus = EventBus::new(4);
        let mut slow = bus.subscribe_to(Topic::Telemetry);

        let mut last = None;
        for _ in 0..32 {
            let e = reading_event("flood");
            last = Some(e.id);
            bus.publish_to(Topic::Telemetry, e);
        }

        // The oldest events were dropped; recv keeps going instead of failing.
        let mut seen = Vec::new();
        while let Some(e) = slow.try_recv() {
            seen.push(e.id);
        }
        assert_eq!(seen.len(), 4);
        assert_eq!(seen.last().copied(), last);
    }

    #[test]
    fn try_recv_on_empty_topic_is_none() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe_to(Topic::HotSpotEvents);
        assert!(rx.try_recv().is_none());
        assert_eq!(rx.topic(), Topic::HotSpotEvents);
    }
}
