//! Route model produced by the external route provider.
//!
//! A [`Route`] is an immutable, non-empty sequence of [`RouteStep`]s.  The
//! travel mode of a step is a tagged variant, so transit-only details are
//! reachable only through [`TravelMode::Transit`].

use serde::{Deserialize, Serialize};

use crate::error::GuideError;
use crate::geo::GeoPoint;

/// Details of a public-transport leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitInfo {
    /// Line short name, e.g. `"201"`.
    pub line: String,
    /// Vehicle kind, e.g. `"bus"`, `"metro"`.
    pub vehicle: String,
    /// Direction shown on the vehicle, e.g. `"Majestic"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headsign: Option<String>,
    /// Name of the stop where the rider boards.
    pub boarding_stop: String,
    /// Name of the stop where the rider gets off.
    pub alighting_stop: String,
    /// Number of stops between boarding and alighting (≥ 1).
    pub total_stops: u32,
    /// Where the boarding stop is, when the directions service knows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boarding_location: Option<GeoPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alighting_location: Option<GeoPoint>,
}

/// Travel mode of a single leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TravelMode {
    Walk,
    Drive,
    Transit(TransitInfo),
}

impl TravelMode {
    /// Transit details, when this is a transit leg.
    pub fn transit(&self) -> Option<&TransitInfo> {
        match self {
            TravelMode::Transit(info) => Some(info),
            _ => None,
        }
    }
}

/// One leg of a route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub mode: TravelMode,
    /// Plain-text instruction, e.g. `"Turn left onto 100 Feet Road"`.
    pub instruction: String,
    pub start: GeoPoint,
    pub end: GeoPoint,
    /// Length of the leg in metres as reported by the provider.
    pub distance_m: f64,
    /// Expected travel time of the leg in seconds.
    pub duration_s: f64,
}

impl RouteStep {
    /// `true` for transit legs.
    pub fn is_transit(&self) -> bool {
        matches!(self.mode, TravelMode::Transit(_))
    }

    fn validate(&self, index: usize) -> Result<(), GuideError> {
        self.start.validate()?;
        self.end.validate()?;
        if !(self.distance_m.is_finite() && self.distance_m >= 0.0) {
            return Err(GuideError::InvalidRoute(format!(
                "step {index} has invalid distance {}",
                self.distance_m
            )));
        }
        if !(self.duration_s.is_finite() && self.duration_s >= 0.0) {
            return Err(GuideError::InvalidRoute(format!(
                "step {index} has invalid duration {}",
                self.duration_s
            )));
        }
        if let TravelMode::Transit(info) = &self.mode
            && info.total_stops == 0
        {
            return Err(GuideError::InvalidRoute(format!(
                "transit step {index} ({} {}) has zero stops",
                info.vehicle, info.line
            )));
        }
        Ok(())
    }
}

/// A complete route: ordered legs plus aggregate totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<RouteStep>,
    pub total_distance_m: f64,
    pub total_duration_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_address: Option<String>,
}

impl Route {
    /// Build a route from its legs, deriving the aggregate totals.
    pub fn new(steps: Vec<RouteStep>) -> Self {
        let total_distance_m = steps.iter().map(|s| s.distance_m).sum();
        let total_duration_s = steps.iter().map(|s| s.duration_s).sum();
        Self {
            steps,
            total_distance_m,
            total_duration_s,
            start_address: None,
            end_address: None,
        }
    }

    /// Attach human-readable origin/destination labels.
    pub fn with_addresses(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start_address = Some(start.into());
        self.end_address = Some(end.into());
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Check the route before a navigator accepts it.
    ///
    /// # Errors
    ///
    /// - [`GuideError::EmptyRoute`] – no steps.
    /// - [`GuideError::InvalidCoordinate`] – a step endpoint is out of range.
    /// - [`GuideError::InvalidRoute`] – negative/non-finite distance or
    ///   duration, or a transit leg with zero stops.
    pub fn validate(&self) -> Result<(), GuideError> {
        if self.steps.is_empty() {
            return Err(GuideError::EmptyRoute);
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }
        Ok(())
    }

    /// Numbered, human-readable list of every leg.
    pub fn overview(&self) -> Vec<String> {
        self.steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let mut line = format!(
                    "{}. {} ({})",
                    i + 1,
                    step.instruction,
                    format_distance(step.distance_m)
                );
                if let TravelMode::Transit(info) = &step.mode {
                    line.push_str(&format!(
                        "\n   {} {}: {} stops",
                        info.vehicle, info.line, info.total_stops
                    ));
                }
                line
            })
            .collect()
    }
}

/// Render metres the way a spoken prompt would: whole metres below 1 km,
/// one decimal of kilometres above.
pub fn format_distance(distance_m: f64) -> String {
    if distance_m < 1000.0 {
        format!("{distance_m:.0} m")
    } else {
        format!("{:.1} km", distance_m / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint { lat, lon }
    }

    fn walk(instruction: &str, distance_m: f64) -> RouteStep {
        RouteStep {
            mode: TravelMode::Walk,
            instruction: instruction.to_string(),
            start: point(12.9716, 77.6412),
            end: point(12.9720, 77.6400),
            distance_m,
            duration_s: distance_m / 1.4,
        }
    }

    fn bus(total_stops: u32) -> RouteStep {
        RouteStep {
            mode: TravelMode::Transit(TransitInfo {
                line: "201".to_string(),
                vehicle: "bus".to_string(),
                headsign: Some("Majestic".to_string()),
                boarding_stop: "Indiranagar".to_string(),
                alighting_stop: "Majestic".to_string(),
                total_stops,
                boarding_location: None,
                alighting_location: None,
            }),
            instruction: "Bus towards Majestic".to_string(),
            start: point(12.9720, 77.6400),
            end: point(12.9767, 77.5715),
            distance_m: 7500.0,
            duration_s: 1800.0,
        }
    }

    #[test]
    fn totals_are_summed() {
        let route = Route::new(vec![walk("Head west", 140.0), bus(8)]);
        assert!((route.total_distance_m - 7640.0).abs() < 1e-9);
        assert_eq!(route.len(), 2);
    }

    #[test]
    fn empty_route_is_rejected() {
        assert_eq!(Route::new(vec![]).validate(), Err(GuideError::EmptyRoute));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let mut step = walk("Head west", 10.0);
        step.end = point(12.0, 200.0);
        let err = Route::new(vec![step]).validate().unwrap_err();
        assert!(matches!(err, GuideError::InvalidCoordinate { .. }));
    }

    #[test]
    fn zero_stop_transit_is_rejected() {
        let err = Route::new(vec![bus(0)]).validate().unwrap_err();
        assert!(matches!(err, GuideError::InvalidRoute(_)));
    }

    #[test]
    fn transit_fields_only_reachable_on_transit_variant() {
        assert!(walk("Head west", 10.0).mode.transit().is_none());
        assert_eq!(bus(3).mode.transit().map(|t| t.total_stops), Some(3));
    }

    #[test]
    fn overview_lists_transit_stop_count() {
        let route = Route::new(vec![walk("Head west", 140.0), bus(8)]);
        let lines = route.overview();
        assert_eq!(lines[0], "1. Head west (140 m)");
        assert!(lines[1].starts_with("2. Bus towards Majestic (7.5 km)"));
        assert!(lines[1].contains("bus 201: 8 stops"));
    }

    #[test]
    fn travel_mode_serializes_with_kind_tag() {
        let json = serde_json::to_string(&bus(4).mode).unwrap();
        assert!(json.contains(r#""kind":"transit""#));
        let back: TravelMode = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transit().map(|t| t.total_stops), Some(4));
    }
}
