//! [`NavigationSession`] – the turn-by-turn state machine.
//!
//! ```text
//! Idle ──start_navigation──▶ Navigating ──▶ Arrived   (terminal)
//!                              │
//!                              └──────────▶ OffRoute  (until the next start_navigation)
//! ```
//!
//! [`NavigationSession::update`] is the single per-tick decision point.  Each
//! call makes at most one decision, checked in this order:
//!
//! 1. **arrival** – last step and within [`NavThresholds::arrival_m`];
//! 2. **advance** – within [`NavThresholds::advance_m`] of the step end;
//! 3. **announce** – within [`NavThresholds::announce_m`], once per step;
//! 4. **off-route** – more than [`NavThresholds::off_route_m`] from the
//!    straight segment of the current step (walk/drive legs only).
//!
//! Transit legs advance through the nested [`TransitState`] instead: once
//! the stop counter reaches alight-ready the session advances on its own,
//! whatever the position fix says.  A fix within
//! [`NavThresholds::stop_arrival_m`] of a located stop adds a one-off
//! boarding or exit prompt ahead of that decision.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use wayguide_nav::NavigationSession;
//! use wayguide_types::{GeoPoint, NavStatus, Route, RouteStep, TravelMode};
//!
//! let step = RouteStep {
//!     mode: TravelMode::Walk,
//!     instruction: "Walk to the corner".to_string(),
//!     start: GeoPoint { lat: 0.0, lon: 0.0 },
//!     end: GeoPoint { lat: 0.0, lon: 0.001 },
//!     distance_m: 111.0,
//!     duration_s: 80.0,
//! };
//! let mut session = NavigationSession::default();
//! session.start_navigation(Route::new(vec![step])).unwrap();
//!
//! let outcome = session
//!     .update(Some(GeoPoint { lat: 0.0, lon: 0.001 }), Instant::now())
//!     .unwrap();
//! assert_eq!(outcome.status, NavStatus::Arrived);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use wayguide_geo::{TurnDirection, haversine, segment_deviation, turn_between};
use wayguide_types::{
    AdvanceReason, GeoPoint, GuideError, NavEvent, NavStatus, Route, RouteStep, TransitPhase,
};

use crate::transit::TransitState;

// ────────────────────────────────────────────────────────────────────────────
// Thresholds
// ────────────────────────────────────────────────────────────────────────────

/// Distance thresholds (metres) driving the per-tick decisions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavThresholds {
    pub announce_m: f64,
    pub advance_m: f64,
    pub arrival_m: f64,
    pub off_route_m: f64,
    /// Radius around a transit stop that counts as being at it.
    pub stop_arrival_m: f64,
}

impl Default for NavThresholds {
    fn default() -> Self {
        Self {
            announce_m: 50.0,
            advance_m: 10.0,
            arrival_m: 20.0,
            off_route_m: 30.0,
            stop_arrival_m: 50.0,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcomes
// ────────────────────────────────────────────────────────────────────────────

/// Result of one [`NavigationSession::update`] tick.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub status: NavStatus,
    pub step_index: usize,
    /// Instruction of the step that is current after the tick.
    pub instruction: Option<String>,
    /// `true` when this tick announced the current step.
    pub announce: bool,
    /// Live distance to the end of the current step, when known.
    pub distance_to_step_end_m: Option<f64>,
    pub distance_remaining_m: f64,
    pub duration_remaining_s: f64,
    /// No position fix was supplied; nothing was decided.
    pub stale: bool,
    /// Time since the last accepted fix, reported on stale ticks.
    pub fix_age: Option<Duration>,
    /// Turn onto the next step, if there is one.
    pub upcoming_turn: Option<TurnDirection>,
    pub events: Vec<NavEvent>,
}

/// Read-only progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub status: NavStatus,
    pub step_index: usize,
    pub total_steps: usize,
    pub distance_remaining_m: f64,
    pub duration_remaining_s: f64,
}

// ────────────────────────────────────────────────────────────────────────────
// NavigationSession
// ────────────────────────────────────────────────────────────────────────────

/// Owned navigation state.  Single writer: share it through
/// [`SharedSession`][crate::handle::SharedSession] when several tasks drive it.
#[derive(Debug, Clone, Default)]
pub struct NavigationSession {
    thresholds: NavThresholds,
    route: Option<Route>,
    step_index: usize,
    announced: Vec<bool>,
    status: NavStatus,
    transit: Option<TransitState>,
    generation: u64,
    live_distance_m: Option<f64>,
    last_fix_at: Option<Instant>,
    /// Transit step the rider just got off by stop count.  One more
    /// stop-passed press is absorbed until the step changes again.
    alighted_from: Option<usize>,
}

impl NavigationSession {
    pub fn new(thresholds: NavThresholds) -> Self {
        Self {
            thresholds,
            ..Self::default()
        }
    }

    pub fn thresholds(&self) -> &NavThresholds {
        &self.thresholds
    }

    pub fn status(&self) -> NavStatus {
        self.status
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// Bumped on every start and stop; used to detect superseded handles.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn current_step(&self) -> Option<&RouteStep> {
        self.route.as_ref()?.steps.get(self.step_index)
    }

    pub fn transit(&self) -> Option<&TransitState> {
        self.transit.as_ref()
    }

    /// Whether step `index` has been announced during its current occupancy.
    pub fn is_announced(&self, index: usize) -> bool {
        self.announced.get(index).copied().unwrap_or(false)
    }

    // ── lifecycle ────────────────────────────────────────────────────────

    /// Replace the session with a fresh one on `route`.
    ///
    /// Returns the events to publish: `NavigationStarted`, plus the boarding
    /// instruction when the first leg is a transit leg.
    ///
    /// # Errors
    ///
    /// [`GuideError::EmptyRoute`], [`GuideError::InvalidCoordinate`] or
    /// [`GuideError::InvalidRoute`]; the previous session is left untouched.
    pub fn start_navigation(&mut self, route: Route) -> Result<Vec<NavEvent>, GuideError> {
        if let Err(e) = route.validate() {
            warn!(error = %e, "route rejected");
            return Err(e);
        }

        self.generation += 1;
        self.step_index = 0;
        self.announced = vec![false; route.len()];
        self.status = NavStatus::Navigating;
        self.transit = route.steps.first().and_then(TransitState::start_transit_step);
        self.live_distance_m = None;
        self.last_fix_at = None;
        self.alighted_from = None;

        info!(
            generation = self.generation,
            total_steps = route.len(),
            total_distance_m = route.total_distance_m,
            "navigation started"
        );

        let mut events = vec![NavEvent::NavigationStarted {
            generation: self.generation,
            total_steps: route.len(),
        }];
        self.route = Some(route);
        events.extend(self.boarding_event());
        Ok(events)
    }

    /// Drop the route and return to `Idle`.
    pub fn stop_navigation(&mut self) -> Vec<NavEvent> {
        let was_active = self.route.is_some();
        self.generation += 1;
        self.route = None;
        self.step_index = 0;
        self.announced.clear();
        self.status = NavStatus::Idle;
        self.transit = None;
        self.live_distance_m = None;
        self.last_fix_at = None;
        self.alighted_from = None;
        if was_active {
            info!(generation = self.generation, "navigation stopped");
            vec![NavEvent::NavigationStopped]
        } else {
            Vec::new()
        }
    }

    // ── per-tick decision ────────────────────────────────────────────────

    /// Feed the latest position fix (or `None` when there is none).
    ///
    /// A missing fix never advances, reroutes or arrives: the last known
    /// status comes back with `stale = true`.  Outside `Navigating` the call
    /// is a no-op.
    ///
    /// # Errors
    ///
    /// [`GuideError::InvalidCoordinate`] for an out-of-range fix; nothing is
    /// mutated.
    pub fn update(
        &mut self,
        position: Option<GeoPoint>,
        now: Instant,
    ) -> Result<UpdateOutcome, GuideError> {
        if let Some(p) = position
            && let Err(e) = p.validate()
        {
            warn!(lat = p.lat, lon = p.lon, "position fix rejected");
            return Err(e);
        }

        let Some(position) = position else {
            debug!(step_index = self.step_index, "no position fix");
            let fix_age = self.last_fix_at.map(|t| now.saturating_duration_since(t));
            return Ok(self.outcome(false, true, fix_age, Vec::new()));
        };

        if self.status != NavStatus::Navigating {
            return Ok(self.outcome(false, false, None, Vec::new()));
        }
        let Some((start, end, is_transit, is_last)) = self.current_step().map(|s| {
            (
                s.start,
                s.end,
                s.is_transit(),
                self.step_index + 1 == self.announced.len(),
            )
        }) else {
            return Ok(self.outcome(false, false, None, Vec::new()));
        };

        self.last_fix_at = Some(now);
        let d = haversine(position, end);
        self.live_distance_m = Some(d);
        debug!(step_index = self.step_index, distance_m = d, "position update");

        let mut events = Vec::new();
        let mut announce = false;

        if let Some(transit) = self.transit.as_mut()
            && let Some(proximity) = transit.check_at_stop(position, self.thresholds.stop_arrival_m)
        {
            events.push(NavEvent::Transit {
                step_index: self.step_index,
                phase: proximity.phase(),
                message: transit.stop_prompt(&proximity),
            });
        }

        if is_last && d <= self.thresholds.arrival_m {
            events.extend(self.arrive());
        } else if d <= self.thresholds.advance_m {
            events.extend(self.advance(AdvanceReason::Proximity));
            if let Some(next) = self.current_step() {
                self.live_distance_m = Some(haversine(position, next.end));
            }
        } else if !self.is_announced(self.step_index) && d <= self.thresholds.announce_m {
            announce = true;
            self.announced[self.step_index] = true;
            let instruction = self
                .current_step()
                .map(|s| s.instruction.clone())
                .unwrap_or_default();
            info!(step_index = self.step_index, distance_m = d, "announcing step");
            events.push(NavEvent::Announce {
                step_index: self.step_index,
                instruction,
            });
        } else if !is_transit {
            let deviation_m = segment_deviation(position, start, end);
            if deviation_m > self.thresholds.off_route_m {
                self.status = NavStatus::OffRoute;
                warn!(
                    step_index = self.step_index,
                    deviation_m,
                    "off route, reroute needed"
                );
                events.push(NavEvent::RerouteNeeded {
                    step_index: self.step_index,
                    deviation_m,
                    position,
                });
            }
        }

        Ok(self.outcome(announce, false, None, events))
    }

    /// Advance to the next step without a distance check.
    ///
    /// On the last step this arrives.
    ///
    /// # Errors
    ///
    /// [`GuideError::NotNavigating`] outside `Navigating`.
    pub fn advance_step(&mut self) -> Result<Vec<NavEvent>, GuideError> {
        self.require_navigating()?;
        Ok(self.advance(AdvanceReason::Manual))
    }

    pub fn get_progress(&self) -> Progress {
        let (distance_remaining_m, duration_remaining_s) = self.remaining();
        Progress {
            status: self.status,
            step_index: self.step_index,
            total_steps: self.announced.len(),
            distance_remaining_m,
            duration_remaining_s,
        }
    }

    // ── transit delegation ───────────────────────────────────────────────

    /// The rider got on the vehicle of the current transit leg.
    ///
    /// # Errors
    ///
    /// [`GuideError::NotNavigating`] or [`GuideError::NoTransitLeg`].
    pub fn board(&mut self) -> Result<Vec<NavEvent>, GuideError> {
        self.require_navigating()?;
        let step_index = self.step_index;
        let transit = self
            .transit
            .as_mut()
            .ok_or(GuideError::NoTransitLeg { step_index })?;
        if !transit.mark_boarded() {
            return Ok(Vec::new());
        }
        Ok(vec![NavEvent::Transit {
            step_index,
            phase: TransitPhase::Boarded,
            message: transit.get_exit_warning().to_string(),
        }])
    }

    /// The vehicle passed a stop.  Reaching the alighting stop advances the
    /// route.
    ///
    /// Presses that arrive after the leg already advanced by stop count are
    /// absorbed until the step changes again, even once that advance has
    /// arrived.
    ///
    /// # Errors
    ///
    /// [`GuideError::NotNavigating`] or [`GuideError::NoTransitLeg`].
    pub fn mark_stop_passed(&mut self) -> Result<Vec<NavEvent>, GuideError> {
        if self.transit.is_none() && self.alighted_from.is_some() {
            debug!(step_index = self.step_index, "stop passed after alighting, ignored");
            return Ok(Vec::new());
        }
        self.require_navigating()?;
        let step_index = self.step_index;
        let transit = self
            .transit
            .as_mut()
            .ok_or(GuideError::NoTransitLeg { step_index })?;

        let Some(phase) = transit.mark_stop_passed() else {
            return Ok(Vec::new());
        };
        let mut events = vec![NavEvent::Transit {
            step_index,
            phase,
            message: transit.get_exit_warning().to_string(),
        }];
        if phase == TransitPhase::AlightReady {
            events.extend(self.advance(AdvanceReason::TransitAlight));
            self.alighted_from = Some(step_index);
        }
        Ok(events)
    }

    // ── internals ────────────────────────────────────────────────────────

    fn require_navigating(&self) -> Result<(), GuideError> {
        if self.status == NavStatus::Navigating {
            Ok(())
        } else {
            Err(GuideError::NotNavigating(self.status))
        }
    }

    fn arrive(&mut self) -> Vec<NavEvent> {
        self.status = NavStatus::Arrived;
        self.transit = None;
        self.live_distance_m = Some(0.0);
        info!(step_index = self.step_index, "arrived");
        vec![NavEvent::Arrived {
            step_index: self.step_index,
        }]
    }

    fn advance(&mut self, reason: AdvanceReason) -> Vec<NavEvent> {
        let from = self.step_index;
        self.alighted_from = None;
        if from + 1 >= self.announced.len() {
            return self.arrive();
        }

        self.step_index = from + 1;
        self.announced[self.step_index] = false;
        self.live_distance_m = None;
        self.transit = self
            .current_step()
            .and_then(TransitState::start_transit_step);
        info!(from, to = self.step_index, ?reason, "step advanced");

        let mut events = vec![NavEvent::StepAdvanced {
            from,
            to: self.step_index,
            reason,
        }];
        events.extend(self.boarding_event());
        events
    }

    fn boarding_event(&self) -> Option<NavEvent> {
        let message = self.transit.as_ref()?.get_boarding_instruction()?;
        Some(NavEvent::Transit {
            step_index: self.step_index,
            phase: TransitPhase::AtStop,
            message,
        })
    }

    /// Un-reached steps in full plus the live share of the current one.
    fn remaining(&self) -> (f64, f64) {
        let Some(route) = &self.route else {
            return (0.0, 0.0);
        };
        if self.status == NavStatus::Arrived {
            return (0.0, 0.0);
        }
        let Some(current) = route.steps.get(self.step_index) else {
            return (0.0, 0.0);
        };
        let later = &route.steps[self.step_index + 1..];
        let mut distance: f64 = later.iter().map(|s| s.distance_m).sum();
        let mut duration: f64 = later.iter().map(|s| s.duration_s).sum();

        match self.live_distance_m {
            Some(live) => {
                distance += live;
                let share = if current.distance_m > 0.0 {
                    (live / current.distance_m).min(1.0)
                } else {
                    0.0
                };
                duration += current.duration_s * share;
            }
            None => {
                distance += current.distance_m;
                duration += current.duration_s;
            }
        }
        (distance, duration)
    }

    fn upcoming_turn(&self) -> Option<TurnDirection> {
        let steps = &self.route.as_ref()?.steps;
        let next = steps.get(self.step_index + 1)?;
        Some(turn_between(&steps[self.step_index], next))
    }

    fn outcome(
        &self,
        announce: bool,
        stale: bool,
        fix_age: Option<Duration>,
        events: Vec<NavEvent>,
    ) -> UpdateOutcome {
        let (distance_remaining_m, duration_remaining_s) = self.remaining();
        UpdateOutcome {
            status: self.status,
            step_index: self.step_index,
            instruction: self.current_step().map(|s| s.instruction.clone()),
            announce,
            distance_to_step_end_m: self.live_distance_m,
            distance_remaining_m,
            duration_remaining_s,
            stale,
            fix_age,
            upcoming_turn: self.upcoming_turn(),
            events,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wayguide_types::{TransitInfo, TravelMode};

    const STEP0_END: GeoPoint = GeoPoint {
        lat: 12.9720,
        lon: 77.6400,
    };
    const STEP1_END: GeoPoint = GeoPoint {
        lat: 12.9767,
        lon: 77.5715,
    };

    fn walk(instruction: &str, start: GeoPoint, end: GeoPoint) -> RouteStep {
        let distance_m = haversine(start, end);
        RouteStep {
            mode: TravelMode::Walk,
            instruction: instruction.to_string(),
            start,
            end,
            distance_m,
            duration_s: distance_m / 1.4,
        }
    }

    fn bus(start: GeoPoint, end: GeoPoint, total_stops: u32) -> RouteStep {
        RouteStep {
            mode: TravelMode::Transit(TransitInfo {
                line: "201".to_string(),
                vehicle: "bus".to_string(),
                headsign: None,
                boarding_stop: "Indiranagar".to_string(),
                alighting_stop: "Majestic".to_string(),
                total_stops,
                boarding_location: None,
                alighting_location: None,
            }),
            instruction: "Bus 201 towards Majestic".to_string(),
            start,
            end,
            distance_m: haversine(start, end),
            duration_s: 1800.0,
        }
    }

    /// Step 0 runs ~500 m due west along the latitude of its end point.
    fn scenario_route() -> Route {
        let start = GeoPoint {
            lat: 12.9720,
            lon: 77.6446,
        };
        Route::new(vec![
            walk("Head west on 100 Feet Road", start, STEP0_END),
            walk("Continue to Majestic", STEP0_END, STEP1_END),
        ])
    }

    /// A point `metres` east of step 0's end, on the same latitude.
    fn east_of_step0_end(metres: f64) -> GeoPoint {
        let m_per_deg_lon = 111_194.93 * STEP0_END.lat.to_radians().cos();
        GeoPoint {
            lat: STEP0_END.lat,
            lon: STEP0_END.lon + metres / m_per_deg_lon,
        }
    }

    fn started(route: Route) -> NavigationSession {
        let mut s = NavigationSession::default();
        s.start_navigation(route).unwrap();
        s
    }

    #[test]
    fn starts_at_step_zero_navigating() {
        let mut s = NavigationSession::default();
        let events = s.start_navigation(scenario_route()).unwrap();
        assert_eq!(s.status(), NavStatus::Navigating);
        assert_eq!(s.step_index(), 0);
        assert!(!s.is_announced(0));
        assert!(s.transit().is_none());
        assert_eq!(
            events,
            vec![NavEvent::NavigationStarted {
                generation: 1,
                total_steps: 2
            }]
        );
    }

    #[test]
    fn far_position_does_not_announce() {
        let mut s = started(scenario_route());
        let out = s.update(Some(east_of_step0_end(200.0)), Instant::now()).unwrap();
        assert_eq!(out.status, NavStatus::Navigating);
        assert!(!out.announce);
        assert!(out.events.is_empty());
        let d = out.distance_to_step_end_m.unwrap();
        assert!((d - 200.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn within_announce_radius_announces_once() {
        let mut s = started(scenario_route());
        let now = Instant::now();
        let out = s.update(Some(east_of_step0_end(40.0)), now).unwrap();
        assert!(out.announce);
        assert_eq!(out.instruction.as_deref(), Some("Head west on 100 Feet Road"));
        assert!(s.is_announced(0));

        let again = s.update(Some(east_of_step0_end(35.0)), now).unwrap();
        assert!(!again.announce);
        assert!(again.events.is_empty());
    }

    #[test]
    fn within_advance_radius_moves_to_next_step() {
        let mut s = started(scenario_route());
        s.update(Some(east_of_step0_end(40.0)), Instant::now()).unwrap();
        let out = s.update(Some(east_of_step0_end(8.0)), Instant::now()).unwrap();
        assert_eq!(out.step_index, 1);
        assert_eq!(s.step_index(), 1);
        assert!(!s.is_announced(1));
        assert!(!out.announce);
        assert_eq!(out.instruction.as_deref(), Some("Continue to Majestic"));
        assert!(matches!(
            out.events[0],
            NavEvent::StepAdvanced {
                from: 0,
                to: 1,
                reason: AdvanceReason::Proximity
            }
        ));
    }

    #[test]
    fn exactly_at_step_end_advances() {
        let mut s = started(scenario_route());
        let out = s.update(Some(STEP0_END), Instant::now()).unwrap();
        assert_eq!(out.step_index, 1);
    }

    #[test]
    fn unmoving_position_never_changes_index() {
        let mut s = started(scenario_route());
        let p = east_of_step0_end(120.0);
        for _ in 0..10 {
            let out = s.update(Some(p), Instant::now()).unwrap();
            assert_eq!(out.step_index, 0);
            assert_eq!(out.status, NavStatus::Navigating);
        }
    }

    #[test]
    fn missing_fix_is_stale_noop() {
        let mut s = started(scenario_route());
        let t0 = Instant::now();
        s.update(Some(east_of_step0_end(200.0)), t0).unwrap();
        let out = s.update(None, t0 + Duration::from_secs(3)).unwrap();
        assert!(out.stale);
        assert_eq!(out.fix_age, Some(Duration::from_secs(3)));
        assert_eq!(out.status, NavStatus::Navigating);
        assert_eq!(out.step_index, 0);
        assert!(out.events.is_empty());
    }

    #[test]
    fn invalid_fix_is_rejected_without_mutation() {
        let mut s = started(scenario_route());
        let err = s
            .update(Some(GeoPoint { lat: 95.0, lon: 0.0 }), Instant::now())
            .unwrap_err();
        assert!(matches!(err, GuideError::InvalidCoordinate { .. }));
        assert_eq!(s.step_index(), 0);
        assert_eq!(s.get_progress().distance_remaining_m, s.route().unwrap().total_distance_m);
    }

    #[test]
    fn deviation_beyond_threshold_goes_off_route() {
        let mut s = started(scenario_route());
        // ~100 m north of the middle of step 0.
        let p = GeoPoint {
            lat: 12.9729,
            lon: 77.6423,
        };
        let out = s.update(Some(p), Instant::now()).unwrap();
        assert_eq!(out.status, NavStatus::OffRoute);
        assert!(matches!(out.events[0], NavEvent::RerouteNeeded { step_index: 0, .. }));

        // No implicit recovery, even back on the path.
        let back = s.update(Some(east_of_step0_end(100.0)), Instant::now()).unwrap();
        assert_eq!(back.status, NavStatus::OffRoute);
        assert!(matches!(s.advance_step(), Err(GuideError::NotNavigating(NavStatus::OffRoute))));

        s.start_navigation(scenario_route()).unwrap();
        assert_eq!(s.status(), NavStatus::Navigating);
    }

    #[test]
    fn arrival_on_last_step() {
        let mut s = started(scenario_route());
        s.advance_step().unwrap();
        let near_end = GeoPoint {
            lat: STEP1_END.lat + 0.00015,
            lon: STEP1_END.lon,
        };
        let out = s.update(Some(near_end), Instant::now()).unwrap();
        assert_eq!(out.status, NavStatus::Arrived);
        assert_eq!(out.events, vec![NavEvent::Arrived { step_index: 1 }]);
        assert_eq!(out.distance_remaining_m, 0.0);

        let after = s.update(Some(near_end), Instant::now()).unwrap();
        assert_eq!(after.status, NavStatus::Arrived);
        assert!(after.events.is_empty());
    }

    #[test]
    fn advance_step_on_last_step_arrives() {
        let mut s = started(scenario_route());
        s.advance_step().unwrap();
        let events = s.advance_step().unwrap();
        assert_eq!(events, vec![NavEvent::Arrived { step_index: 1 }]);
        assert_eq!(s.status(), NavStatus::Arrived);
        assert_eq!(s.step_index(), 1);
    }

    #[test]
    fn advance_step_while_idle_fails() {
        let mut s = NavigationSession::default();
        assert_eq!(
            s.advance_step(),
            Err(GuideError::NotNavigating(NavStatus::Idle))
        );
    }

    #[test]
    fn invalid_route_leaves_session_untouched() {
        let mut s = started(scenario_route());
        s.advance_step().unwrap();
        let generation = s.generation();

        assert_eq!(s.start_navigation(Route::new(vec![])), Err(GuideError::EmptyRoute));
        let bad = Route::new(vec![walk(
            "x",
            STEP0_END,
            GeoPoint {
                lat: 0.0,
                lon: 200.0,
            },
        )]);
        assert!(matches!(
            s.start_navigation(bad),
            Err(GuideError::InvalidCoordinate { .. })
        ));
        assert_eq!(s.step_index(), 1);
        assert_eq!(s.generation(), generation);
        assert_eq!(s.status(), NavStatus::Navigating);
    }

    #[test]
    fn restart_resets_index_and_announced() {
        let mut s = started(scenario_route());
        s.update(Some(east_of_step0_end(40.0)), Instant::now()).unwrap();
        s.advance_step().unwrap();
        s.start_navigation(scenario_route()).unwrap();
        assert_eq!(s.step_index(), 0);
        assert!(!s.is_announced(0));
        assert_eq!(s.generation(), 2);
    }

    #[test]
    fn progress_uses_live_distance() {
        let mut s = started(scenario_route());
        let route_total = s.route().unwrap().total_distance_m;
        let before = s.get_progress();
        assert_eq!(before.total_steps, 2);
        assert!((before.distance_remaining_m - route_total).abs() < 1e-9);

        s.update(Some(east_of_step0_end(200.0)), Instant::now()).unwrap();
        let step1 = s.route().unwrap().steps[1].clone();
        let progress = s.get_progress();
        assert!((progress.distance_remaining_m - (step1.distance_m + 200.0)).abs() < 1.0);
        assert!(progress.duration_remaining_s < before.duration_remaining_s);
        assert!(progress.duration_remaining_s > step1.duration_s);
    }

    #[test]
    fn upcoming_turn_is_reported() {
        let mut s = started(scenario_route());
        let out = s.update(Some(east_of_step0_end(200.0)), Instant::now()).unwrap();
        // West then slightly north of west.
        assert_eq!(out.upcoming_turn, Some(TurnDirection::Straight));
        s.advance_step().unwrap();
        let last = s.update(Some(east_of_step0_end(200.0)), Instant::now()).unwrap();
        assert_eq!(last.upcoming_turn, None);
    }

    #[test]
    fn stop_navigation_returns_to_idle() {
        let mut s = started(scenario_route());
        assert_eq!(s.stop_navigation(), vec![NavEvent::NavigationStopped]);
        assert_eq!(s.status(), NavStatus::Idle);
        assert!(s.route().is_none());
        assert_eq!(s.generation(), 2);
        assert!(s.stop_navigation().is_empty());
    }

    // ── transit legs ─────────────────────────────────────────────────────

    fn transit_route(total_stops: u32) -> Route {
        let stop = GeoPoint {
            lat: 12.9716,
            lon: 77.6412,
        };
        Route::new(vec![
            walk("Walk to Indiranagar bus stop", STEP0_END, stop),
            bus(stop, STEP1_END, total_stops),
            walk(
                "Walk to the station entrance",
                STEP1_END,
                GeoPoint {
                    lat: 12.9772,
                    lon: 77.5715,
                },
            ),
        ])
    }

    #[test]
    fn advancing_onto_transit_leg_emits_boarding_instruction() {
        let mut s = started(transit_route(3));
        let events = s.advance_step().unwrap();
        assert_eq!(s.transit().unwrap().phase(), TransitPhase::AtStop);
        assert_eq!(
            events[1],
            NavEvent::Transit {
                step_index: 1,
                phase: TransitPhase::AtStop,
                message: "Board bus 201 at Indiranagar".to_string(),
            }
        );
    }

    #[test]
    fn transit_first_step_initialises_sub_state() {
        let stop = GeoPoint {
            lat: 12.9716,
            lon: 77.6412,
        };
        let mut s = NavigationSession::default();
        let events = s
            .start_navigation(Route::new(vec![bus(stop, STEP1_END, 2)]))
            .unwrap();
        assert_eq!(events.len(), 2);
        let transit = s.transit().unwrap();
        assert_eq!(transit.phase(), TransitPhase::AtStop);
        assert_eq!(transit.stops_passed(), 0);
    }

    #[test]
    fn alight_ready_advances_without_position() {
        let mut s = started(transit_route(2));
        s.advance_step().unwrap();
        s.board().unwrap();
        let first = s.mark_stop_passed().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(s.step_index(), 1);

        let second = s.mark_stop_passed().unwrap();
        assert!(matches!(
            second[0],
            NavEvent::Transit {
                phase: TransitPhase::AlightReady,
                ..
            }
        ));
        assert!(second.contains(&NavEvent::StepAdvanced {
            from: 1,
            to: 2,
            reason: AdvanceReason::TransitAlight,
        }));
        assert_eq!(s.step_index(), 2);
        assert!(s.transit().is_none());
    }

    #[test]
    fn transit_leg_skips_off_route_check() {
        let mut s = started(transit_route(2));
        s.advance_step().unwrap();
        // Far off the straight segment between the two stops.
        let out = s
            .update(
                Some(GeoPoint {
                    lat: 13.01,
                    lon: 77.60,
                }),
                Instant::now(),
            )
            .unwrap();
        assert_eq!(out.status, NavStatus::Navigating);
    }

    #[test]
    fn transit_calls_on_walk_leg_fail() {
        let mut s = started(scenario_route());
        assert_eq!(s.board(), Err(GuideError::NoTransitLeg { step_index: 0 }));
        assert_eq!(
            s.mark_stop_passed(),
            Err(GuideError::NoTransitLeg { step_index: 0 })
        );
    }

    #[test]
    fn stop_before_boarding_is_ignored() {
        let mut s = started(transit_route(2));
        s.advance_step().unwrap();
        assert!(s.mark_stop_passed().unwrap().is_empty());
        assert_eq!(s.transit().unwrap().stops_passed(), 0);
    }

    #[test]
    fn extra_stop_after_alighting_is_absorbed() {
        let mut s = started(transit_route(2));
        s.advance_step().unwrap();
        s.board().unwrap();
        s.mark_stop_passed().unwrap();
        s.mark_stop_passed().unwrap();
        assert_eq!(s.step_index(), 2);

        assert_eq!(s.mark_stop_passed(), Ok(Vec::new()));
        assert_eq!(s.mark_stop_passed(), Ok(Vec::new()));
        assert_eq!(s.step_index(), 2);
        assert_eq!(s.status(), NavStatus::Navigating);

        s.advance_step().unwrap();
        s.start_navigation(transit_route(2)).unwrap();
        assert_eq!(
            s.mark_stop_passed(),
            Err(GuideError::NoTransitLeg { step_index: 0 })
        );
    }

    #[test]
    fn extra_stop_after_arriving_by_stop_count_is_absorbed() {
        let stop = GeoPoint {
            lat: 12.9716,
            lon: 77.6412,
        };
        let mut s = started(Route::new(vec![bus(stop, STEP1_END, 1)]));
        s.board().unwrap();
        let events = s.mark_stop_passed().unwrap();
        assert!(events.contains(&NavEvent::Arrived { step_index: 0 }));
        assert_eq!(s.status(), NavStatus::Arrived);

        assert_eq!(s.mark_stop_passed(), Ok(Vec::new()));
        assert_eq!(s.board(), Err(GuideError::NotNavigating(NavStatus::Arrived)));
    }

    fn located_bus_route(stop: GeoPoint) -> Route {
        let mut route = transit_route(3);
        if let TravelMode::Transit(info) = &mut route.steps[1].mode {
            info.boarding_location = Some(stop);
            info.alighting_location = Some(STEP1_END);
        }
        route
    }

    #[test]
    fn fix_at_located_stops_prompts_board_and_exit() {
        let stop = GeoPoint {
            lat: 12.9716,
            lon: 77.6412,
        };
        let mut s = started(located_bus_route(stop));
        s.advance_step().unwrap();

        let at_stop = s.update(Some(stop), Instant::now()).unwrap();
        assert_eq!(
            at_stop.events,
            vec![NavEvent::Transit {
                step_index: 1,
                phase: TransitPhase::AtStop,
                message: "You are at Indiranagar. Wait for bus 201".to_string(),
            }]
        );
        assert!(s.update(Some(stop), Instant::now()).unwrap().events.is_empty());

        s.board().unwrap();
        // ~33 m north of the alighting point: prompt, but no advance.
        let near_exit = GeoPoint {
            lat: STEP1_END.lat + 0.0003,
            lon: STEP1_END.lon,
        };
        let out = s.update(Some(near_exit), Instant::now()).unwrap();
        assert_eq!(
            out.events[0],
            NavEvent::Transit {
                step_index: 1,
                phase: TransitPhase::Boarded,
                message: "Approaching Majestic, get ready to exit".to_string(),
            }
        );
        assert_eq!(s.step_index(), 1);
        assert_eq!(s.transit().unwrap().phase(), TransitPhase::Boarded);
        assert_eq!(s.transit().unwrap().stops_passed(), 0);
    }
}
