//! [`TransitState`] – boarding and stop counting on a transit leg.
//!
//! Lives inside the navigation session while the current step is a transit
//! leg.  Position fixes are unreliable aboard a vehicle (and useless
//! underground), so progress along the leg is tracked by counting stops:
//!
//! ```text
//! AtStop ──mark_boarded──▶ Boarded ──mark_stop_passed × total_stops──▶ AlightReady
//! ```
//!
//! Reaching [`TransitPhase::AlightReady`] is what advances the navigator past
//! a transit step; the session does that itself, see
//! [`NavigationSession::mark_stop_passed`][crate::session::NavigationSession::mark_stop_passed].
//!
//! When the leg carries stop locations, [`TransitState::check_at_stop`] turns
//! a position fix near the boarding stop (before boarding) or the alighting
//! stop (while aboard) into a one-off prompt.  The prompt never moves the
//! phase; only the stop count does.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wayguide_geo::haversine;
use wayguide_types::{GeoPoint, RouteStep, TransitInfo, TransitPhase};

// ────────────────────────────────────────────────────────────────────────────
// Exit warning
// ────────────────────────────────────────────────────────────────────────────

/// How soon the rider has to get off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitWarning {
    /// Two or more stops to go.
    StopsRemaining(u32),
    /// The next stop is the alighting stop.
    NextStop { alighting_stop: String },
    /// The vehicle is at (or past) the alighting stop.
    AlightNow { alighting_stop: String },
}

impl std::fmt::Display for ExitWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitWarning::StopsRemaining(n) => write!(f, "Get off in {n} stops"),
            ExitWarning::NextStop { alighting_stop } => {
                write!(f, "Next stop, prepare to exit at {alighting_stop}")
            }
            ExitWarning::AlightNow { alighting_stop } => {
                write!(f, "Get off now at {alighting_stop}")
            }
        }
    }
}

/// A position fix close to one of the leg's stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StopProximity {
    /// Near the boarding stop, not yet on the vehicle.
    Boarding { stop: String, distance_m: f64 },
    /// Aboard and near the alighting stop.
    Alighting { stop: String, distance_m: f64 },
}

impl StopProximity {
    /// Phase the prompt belongs to.
    pub fn phase(&self) -> TransitPhase {
        match self {
            StopProximity::Boarding { .. } => TransitPhase::AtStop,
            StopProximity::Alighting { .. } => TransitPhase::Boarded,
        }
    }
}

/// Snapshot for status queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitStatus {
    Waiting {
        line: String,
        boarding_stop: String,
        instruction: String,
    },
    OnVehicle {
        line: String,
        stops_passed: u32,
        stops_remaining: u32,
        alighting_stop: String,
        warning: ExitWarning,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// TransitState
// ────────────────────────────────────────────────────────────────────────────

/// Nested state machine of one transit leg.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitState {
    info: TransitInfo,
    phase: TransitPhase,
    stops_passed: u32,
    boarding_prompted: bool,
    alighting_prompted: bool,
}

impl TransitState {
    pub fn new(info: TransitInfo) -> Self {
        Self {
            info,
            phase: TransitPhase::AtStop,
            stops_passed: 0,
            boarding_prompted: false,
            alighting_prompted: false,
        }
    }

    /// Load the transit details of `step`.  `None` for walk/drive legs.
    pub fn start_transit_step(step: &RouteStep) -> Option<Self> {
        let info = step.mode.transit()?.clone();
        info!(
            line = %info.line,
            vehicle = %info.vehicle,
            total_stops = info.total_stops,
            "transit leg loaded"
        );
        Some(Self::new(info))
    }

    pub fn info(&self) -> &TransitInfo {
        &self.info
    }

    pub fn phase(&self) -> TransitPhase {
        self.phase
    }

    pub fn stops_passed(&self) -> u32 {
        self.stops_passed
    }

    pub fn stops_remaining(&self) -> u32 {
        self.info.total_stops.saturating_sub(self.stops_passed)
    }

    pub fn is_alight_ready(&self) -> bool {
        self.phase == TransitPhase::AlightReady
    }

    /// "Board <vehicle> <line> at <stop>[ towards <headsign>]".
    ///
    /// Only meaningful before boarding; `None` afterwards.
    pub fn get_boarding_instruction(&self) -> Option<String> {
        if self.phase != TransitPhase::AtStop {
            return None;
        }
        let mut text = format!(
            "Board {} {} at {}",
            self.info.vehicle, self.info.line, self.info.boarding_stop
        );
        if let Some(headsign) = &self.info.headsign {
            text.push_str(&format!(" towards {headsign}"));
        }
        Some(text)
    }

    /// `AtStop → Boarded`.  Returns `false` (and changes nothing) when the
    /// rider is already past the stop.
    pub fn mark_boarded(&mut self) -> bool {
        if self.phase != TransitPhase::AtStop {
            return false;
        }
        self.phase = TransitPhase::Boarded;
        info!(line = %self.info.line, "rider boarded");
        true
    }

    /// Count one stop.
    ///
    /// Clamped at `total_stops`; reaching it moves to
    /// [`TransitPhase::AlightReady`].  Extra calls once alight-ready are
    /// absorbed.  Returns the phase after the call, or `None` when the rider
    /// has not boarded yet (the call is ignored).
    pub fn mark_stop_passed(&mut self) -> Option<TransitPhase> {
        match self.phase {
            TransitPhase::AtStop => {
                warn!(line = %self.info.line, "stop passed before boarding, ignored");
                None
            }
            TransitPhase::AlightReady => Some(TransitPhase::AlightReady),
            TransitPhase::Boarded => {
                self.stops_passed = (self.stops_passed + 1).min(self.info.total_stops);
                info!(
                    stops_passed = self.stops_passed,
                    total_stops = self.info.total_stops,
                    "stop passed"
                );
                if self.stops_passed >= self.info.total_stops {
                    self.phase = TransitPhase::AlightReady;
                    info!(alighting_stop = %self.info.alighting_stop, "alight ready");
                }
                Some(self.phase)
            }
        }
    }

    /// Prompt once when `position` is within `radius_m` of the stop that
    /// matters in the current phase.
    ///
    /// Before boarding that is the boarding stop, aboard it is the alighting
    /// stop.  Legs without stop locations never prompt.
    pub fn check_at_stop(&mut self, position: GeoPoint, radius_m: f64) -> Option<StopProximity> {
        match self.phase {
            TransitPhase::AtStop if !self.boarding_prompted => {
                let distance_m = haversine(position, self.info.boarding_location?);
                if distance_m >= radius_m {
                    return None;
                }
                self.boarding_prompted = true;
                info!(stop = %self.info.boarding_stop, distance_m, "at boarding stop");
                Some(StopProximity::Boarding {
                    stop: self.info.boarding_stop.clone(),
                    distance_m,
                })
            }
            TransitPhase::Boarded if !self.alighting_prompted => {
                let distance_m = haversine(position, self.info.alighting_location?);
                if distance_m >= radius_m {
                    return None;
                }
                self.alighting_prompted = true;
                info!(stop = %self.info.alighting_stop, distance_m, "near alighting stop");
                Some(StopProximity::Alighting {
                    stop: self.info.alighting_stop.clone(),
                    distance_m,
                })
            }
            _ => None,
        }
    }

    /// Sentence for a [`StopProximity`] prompt.
    pub fn stop_prompt(&self, proximity: &StopProximity) -> String {
        match proximity {
            StopProximity::Boarding { stop, .. } => format!(
                "You are at {stop}. Wait for {} {}",
                self.info.vehicle, self.info.line
            ),
            StopProximity::Alighting { stop, .. } => {
                format!("Approaching {stop}, get ready to exit")
            }
        }
    }

    /// Exit warning for the remaining stop count.
    pub fn get_exit_warning(&self) -> ExitWarning {
        match self.stops_remaining() {
            0 => ExitWarning::AlightNow {
                alighting_stop: self.info.alighting_stop.clone(),
            },
            1 => ExitWarning::NextStop {
                alighting_stop: self.info.alighting_stop.clone(),
            },
            n => ExitWarning::StopsRemaining(n),
        }
    }

    pub fn status(&self) -> TransitStatus {
        match self.get_boarding_instruction() {
            Some(instruction) => TransitStatus::Waiting {
                line: self.info.line.clone(),
                boarding_stop: self.info.boarding_stop.clone(),
                instruction,
            },
            None => TransitStatus::OnVehicle {
                line: self.info.line.clone(),
                stops_passed: self.stops_passed,
                stops_remaining: self.stops_remaining(),
                alighting_stop: self.info.alighting_stop.clone(),
                warning: self.get_exit_warning(),
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
