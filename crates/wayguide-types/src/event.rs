//! Navigation status, navigation events and the bus [`Event`] envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::obstacle::Warning;

/// Top-level state of a navigation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavStatus {
    #[default]
    Idle,
    Navigating,
    /// Deviated from the current leg.  Left only through a new
    /// `start_navigation`.
    OffRoute,
    /// Terminal.
    Arrived,
}

/// Phase of the rider on a transit leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitPhase {
    /// Waiting at the boarding stop.
    AtStop,
    /// On the vehicle, counting stops.
    Boarded,
    /// The next stop is the alighting stop; get off regardless of GPS.
    AlightReady,
}

/// Why the step index moved forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdvanceReason {
    /// The position fix came within the advance radius of the step end.
    Proximity,
    /// The transit sub-state reached alight-ready.
    TransitAlight,
    /// An external caller invoked `advance_step`.
    Manual,
}

/// Decisions emitted by the navigation state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavEvent {
    NavigationStarted {
        generation: u64,
        total_steps: usize,
    },
    Announce {
        step_index: usize,
        instruction: String,
    },
    StepAdvanced {
        from: usize,
        to: usize,
        reason: AdvanceReason,
    },
    RerouteNeeded {
        step_index: usize,
        deviation_m: f64,
        position: GeoPoint,
    },
    Arrived {
        step_index: usize,
    },
    Transit {
        step_index: usize,
        phase: TransitPhase,
        message: String,
    },
    NavigationStopped,
}

impl NavEvent {
    /// The sentence an audio sink should speak for this event, if any.
    pub fn spoken_text(&self) -> Option<String> {
        match self {
            NavEvent::Announce { instruction, .. } => Some(instruction.clone()),
            NavEvent::RerouteNeeded { .. } => {
                Some("You are off route. Recalculating.".to_string())
            }
            NavEvent::Arrived { .. } => Some("You have arrived at your destination".to_string()),
            NavEvent::Transit { message, .. } => Some(message.clone()),
            NavEvent::NavigationStopped => Some("Navigation stopped".to_string()),
            NavEvent::NavigationStarted { .. } | NavEvent::StepAdvanced { .. } => None,
        }
    }
}

/// Unified event wrapper for the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g. `"wayguide-runtime::guide_loop"`
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Stamp a payload with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Navigation(NavEvent),
    /// Ordered warnings for one camera frame.
    Obstacles(Vec<Warning>),
    SystemAlert {
        component: String,
        message: String,
    },
}
