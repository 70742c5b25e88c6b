//! Headless, typed, topic-based publish/subscribe event bus.
//!
//! Uses [`tokio::sync::broadcast`] channels under the hood so that every
//! subscriber receives every message without any single subscriber blocking
//! the others.
//!
//! # Topics
//!
//! Traffic is partitioned into four [`Topic`] lanes so components only
//! receive the messages they care about:
//!
//! | Topic | Typical traffic |
//! |---|---|
//! | [`Topic::Navigation`] | Start/stop, announcements, step advances, reroute, arrival (~1 Hz) |
//! | [`Topic::Obstacles`] | Ordered warnings for each camera frame (~10 Hz) |
//! | [`Topic::Transit`] | Boarding, stop counting, alight prompts |
//! | [`Topic::SystemAlerts`] | Silent sensors, rejected input, faults |
//!
//! Every event is also mirrored onto a firehose channel
//! ([`EventBus::subscribe_all`]) for sinks that want the whole stream in
//! publication order.

use tokio::sync::broadcast;
use tracing::{debug, warn};
use wayguide_types::{Event, EventPayload, GuideError, NavEvent};

/// Default channel capacity (number of buffered events before old ones are
/// dropped for slow subscribers).
const DEFAULT_CAPACITY: usize = 256;

/// Enumeration of all first-class routing topics on the event bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Navigation,
    Obstacles,
    Transit,
    SystemAlerts,
}

impl Topic {
    /// The lane a payload belongs on.
    pub fn of(payload: &EventPayload) -> Self {
        match payload {
            EventPayload::Navigation(NavEvent::Transit { .. }) => Topic::Transit,
            EventPayload::Navigation(_) => Topic::Navigation,
            EventPayload::Obstacles(_) => Topic::Obstacles,
            EventPayload::SystemAlert { .. } => Topic::SystemAlerts,
        }
    }
}

/// Shared event bus. Clone it cheaply – all clones share the same underlying
/// broadcast channels.
#[derive(Clone, Debug)]
pub struct EventBus {
    all: broadcast::Sender<Event>,
    navigation: broadcast::Sender<Event>,
    obstacles: broadcast::Sender<Event>,
    transit: broadcast::Sender<Event>,
    system_alerts: broadcast::Sender<Event>,
}

impl EventBus {
    /// Create a new bus with the given channel capacity.
    ///
    /// The `capacity` is applied to every channel independently.
    pub fn new(capacity: usize) -> Self {
        let (all, _) = broadcast::channel(capacity);
        let (navigation, _) = broadcast::channel(capacity);
        let (obstacles, _) = broadcast::channel(capacity);
        let (transit, _) = broadcast::channel(capacity);
        let (system_alerts, _) = broadcast::channel(capacity);
        Self {
            all,
            navigation,
            obstacles,
            transit,
            system_alerts,
        }
    }

    /// Publish `event` on the lane its payload belongs to (see
    /// [`Topic::of`]) and on the firehose.
    ///
    /// Returns the number of receivers that were handed the event.
    ///
    /// # Errors
    ///
    /// [`GuideError::Channel`] when nobody at all is listening.
    pub fn publish(&self, event: Event) -> Result<usize, GuideError> {
        let topic = Topic::of(&event.payload);
        let on_topic = self.topic_sender(topic).send(event.clone()).unwrap_or(0);
        let on_all = self.all.send(event).unwrap_or(0);
        match on_topic + on_all {
            0 => Err(GuideError::Channel(format!(
                "No subscribers for topic {topic:?}"
            ))),
            n => {
                debug!(?topic, receivers = n, "event published");
                Ok(n)
            }
        }
    }

    /// Subscribe to a specific [`Topic`] channel.
    pub fn subscribe_to(&self, topic: Topic) -> TopicReceiver {
        TopicReceiver {
            topic: Some(topic),
            receiver: self.topic_sender(topic).subscribe(),
        }
    }

    /// Subscribe to every event regardless of topic.
    pub fn subscribe_all(&self) -> TopicReceiver {
        TopicReceiver {
            topic: None,
            receiver: self.all.subscribe(),
        }
    }

    fn topic_sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Navigation => &self.navigation,
            Topic::Obstacles => &self.obstacles,
            Topic::Transit => &self.transit,
            Topic::SystemAlerts => &self.system_alerts,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Receiver
// ---------------------------------------------------------------------------

/// An async receiver bound to one [`Topic`] channel, or to the firehose.
pub struct TopicReceiver {
    topic: Option<Topic>,
    receiver: broadcast::Receiver<Event>,
}

impl TopicReceiver {
    /// Wait for the next event.
    ///
    /// Returns:
    /// * `Ok(event)` – a successfully received event.
    /// * `Err(broadcast::error::RecvError::Lagged(n))` – the subscriber fell
    ///   behind and `n` messages were dropped.  The caller decides whether to
    ///   continue or abort.
    /// * `Err(broadcast::error::RecvError::Closed)` – the bus has shut down.
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }

    /// Drain whatever is already buffered without waiting.  Lagged gaps are
    /// logged and skipped.
    pub fn drain(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!(topic = ?self.topic, lagged_by = n, "receiver lagged");
                }
                Err(_) => return events,
            }
        }
    }

    /// The [`Topic`] this receiver is bound to; `None` for the firehose.
    pub fn topic(&self) -> Option<Topic> {
        self.topic
    }
}
