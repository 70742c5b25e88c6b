//! Workspace-wide error type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::NavStatus;

/// Global error type spanning route validation, session misuse, sensor
/// faults and configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GuideError {
    #[error("Route has no steps")]
    EmptyRoute,

    #[error("Invalid coordinate: lat {lat}, lon {lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },

    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("Operation requires an active navigation, session is {0:?}")]
    NotNavigating(NavStatus),

    #[error("Step {step_index} is not a transit leg")]
    NoTransitLeg { step_index: usize },

    #[error("Stale session handle: held generation {held}, current generation {current}")]
    StaleSession { held: u64, current: u64 },

    #[error("Sensor fault on {component}: {details}")]
    SensorFault { component: String, details: String },

    #[error("Route unavailable: {0}")]
    RouteUnavailable(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event bus error: {0}")]
    Channel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_values() {
        let err = GuideError::InvalidCoordinate { lat: 91.0, lon: 0.0 };
        assert!(err.to_string().contains("91"));

        let err = GuideError::StaleSession { held: 1, current: 3 };
        let text = err.to_string();
        assert!(text.contains("held generation 1"));
        assert!(text.contains("current generation 3"));
    }

    #[test]
    fn not_navigating_names_status() {
        let err = GuideError::NotNavigating(NavStatus::Arrived);
        assert!(err.to_string().contains("Arrived"));
    }
}
