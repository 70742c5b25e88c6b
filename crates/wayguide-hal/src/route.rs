//! [`RouteProvider`] – directions service seam, plus [`RouteBuilder`] for
//! assembling routes from waypoints.
//!
//! Geocoding and routing are external; a provider hands back a finished
//! [`Route`] once per `start_navigation`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use wayguide_geo::haversine;
use wayguide_types::{GeoPoint, GuideError, Route, RouteStep, TransitInfo, TravelMode};

/// Mode requested from the directions service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionsMode {
    Walking,
    Driving,
    Transit,
}

impl std::str::FromStr for DirectionsMode {
    type Err = GuideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walk" | "walking" => Ok(DirectionsMode::Walking),
            "drive" | "driving" => Ok(DirectionsMode::Driving),
            "transit" | "bus" | "metro" => Ok(DirectionsMode::Transit),
            other => Err(GuideError::RouteUnavailable(format!(
                "unknown travel mode '{other}'"
            ))),
        }
    }
}

pub trait RouteProvider: Send + Sync {
    /// Directions from `origin` to the place named `destination`.
    ///
    /// # Errors
    ///
    /// [`GuideError::RouteUnavailable`] when no route can be produced.
    fn get_directions(
        &self,
        origin: GeoPoint,
        destination: &str,
        mode: DirectionsMode,
    ) -> Result<Route, GuideError>;
}

// ────────────────────────────────────────────────────────────────────────────
// RouteBuilder
// ────────────────────────────────────────────────────────────────────────────

/// Average speeds (m/s) used to derive step durations.
const WALK_SPEED_MPS: f64 = 1.4;
const DRIVE_SPEED_MPS: f64 = 8.3;
const TRANSIT_SPEED_MPS: f64 = 5.5;

/// Chains legs end-to-start, deriving distance and duration per leg.
///
/// ```rust
/// use wayguide_hal::route::RouteBuilder;
/// use wayguide_types::GeoPoint;
///
/// let route = RouteBuilder::new(GeoPoint { lat: 0.0, lon: 0.0 })
///     .walk("Head north", GeoPoint { lat: 0.001, lon: 0.0 })
///     .walk("Turn right", GeoPoint { lat: 0.001, lon: 0.001 })
///     .build();
/// assert_eq!(route.len(), 2);
/// assert!(route.total_distance_m > 200.0);
/// ```
#[derive(Debug, Clone)]
pub struct RouteBuilder {
    cursor: GeoPoint,
    steps: Vec<RouteStep>,
    addresses: Option<(String, String)>,
}

impl RouteBuilder {
    pub fn new(origin: GeoPoint) -> Self {
        Self {
            cursor: origin,
            steps: Vec::new(),
            addresses: None,
        }
    }

    pub fn addresses(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.addresses = Some((start.into(), end.into()));
        self
    }

    fn leg(mut self, mode: TravelMode, instruction: &str, end: GeoPoint, speed: f64) -> Self {
        let distance_m = haversine(self.cursor, end);
        self.steps.push(RouteStep {
            mode,
            instruction: instruction.to_string(),
            start: self.cursor,
            end,
            distance_m,
            duration_s: distance_m / speed,
        });
        self.cursor = end;
        self
    }

    pub fn walk(self, instruction: &str, end: GeoPoint) -> Self {
        self.leg(TravelMode::Walk, instruction, end, WALK_SPEED_MPS)
    }

    pub fn drive(self, instruction: &str, end: GeoPoint) -> Self {
        self.leg(TravelMode::Drive, instruction, end, DRIVE_SPEED_MPS)
    }

    pub fn transit(self, instruction: &str, end: GeoPoint, info: TransitInfo) -> Self {
        self.leg(TravelMode::Transit(info), instruction, end, TRANSIT_SPEED_MPS)
    }

    pub fn build(self) -> Route {
        let route = Route::new(self.steps);
        match self.addresses {
            Some((start, end)) => route.with_addresses(start, end),
            None => route,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRouteProvider
// ────────────────────────────────────────────────────────────────────────────

/// Canned routes keyed by destination name (case-insensitive).
///
/// The origin is ignored; the stored route is returned as-is.
#[derive(Debug, Clone, Default)]
pub struct SimRouteProvider {
    routes: HashMap<(String, DirectionsMode), Route>,
}

impl SimRouteProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(mut self, destination: &str, mode: DirectionsMode, route: Route) -> Self {
        self.routes
            .insert((destination.trim().to_lowercase(), mode), route);
        self
    }

    pub fn destinations(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routes.keys().map(|(d, _)| d.clone()).collect();
        names.sort();
        names.dedup();
        names
    }
}

impl RouteProvider for SimRouteProvider {
    fn get_directions(
        &self,
        origin: GeoPoint,
        destination: &str,
        mode: DirectionsMode,
    ) -> Result<Route, GuideError> {
        origin.validate()?;
        let key = (destination.trim().to_lowercase(), mode);
        match self.routes.get(&key) {
            Some(route) => {
                info!(destination, ?mode, steps = route.len(), "route found");
                Ok(route.clone())
            }
            None => {
                warn!(destination, ?mode, "no route");
                Err(GuideError::RouteUnavailable(format!(
                    "no {mode:?} route to '{destination}'"
                )))
            }
        }
    }
}
