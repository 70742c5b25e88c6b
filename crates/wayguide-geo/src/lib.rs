//! `wayguide-geo` – great-circle math for the navigator.
//!
//! Pure functions over [`GeoPoint`]s; nothing here allocates or keeps state.
//!
//! - [`haversine`] – great-circle distance in metres.
//! - [`bearing`] – initial bearing from one point to another.
//! - [`turn_direction`] – classify the change between two bearings.
//! - [`turn_between`] – the same, for two consecutive route steps.
//! - [`segment_deviation`] – distance from a point to the straight segment
//!   between two points, used for off-route detection.
//!
//! Callers are expected to validate their inputs with
//! [`GeoPoint::validate`]; out-of-range coordinates produce meaningless (but
//! finite) results rather than panics.
//!
//! # Example
//!
//! ```rust
//! use wayguide_geo::{haversine, turn_direction, TurnDirection};
//! use wayguide_types::GeoPoint;
//!
//! let a = GeoPoint { lat: 12.9716, lon: 77.6412 };
//! let b = GeoPoint { lat: 12.9767, lon: 77.5715 };
//! let d = haversine(a, b);
//! assert!((d - haversine(b, a)).abs() < 1e-9);
//! assert_eq!(turn_direction(90.0, 95.0), TurnDirection::Straight);
//! ```

use serde::{Deserialize, Serialize};
use wayguide_types::{GeoPoint, RouteStep};

/// Mean Earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Bearing changes within this many degrees are announced as "straight".
pub const STRAIGHT_TOLERANCE_DEG: f64 = 20.0;

// ────────────────────────────────────────────────────────────────────────────
// Distance and bearing
// ────────────────────────────────────────────────────────────────────────────

/// Great-circle distance between `a` and `b` in metres.
///
/// Uses the `atan2` form of the haversine formula, which stays accurate for
/// both very short and near-antipodal separations.
pub fn haversine(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let sin_dlat = (d_lat / 2.0).sin();
    let sin_dlon = (d_lon / 2.0).sin();
    let h = (sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon).clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Initial bearing (forward azimuth) from `a` to `b`, degrees in `[0, 360)`.
///
/// Returns `0.0` when the points coincide.
pub fn bearing(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();
    if x == 0.0 && y == 0.0 {
        return 0.0;
    }
    y.atan2(x).to_degrees().rem_euclid(360.0)
}

/// Wrap an angle in degrees into `(-180, 180]`.
pub fn normalize_angle_deg(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

// ────────────────────────────────────────────────────────────────────────────
// Turn direction
// ────────────────────────────────────────────────────────────────────────────

/// Spoken direction of a change in heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnDirection {
    Straight,
    Left,
    Right,
}

impl std::fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnDirection::Straight => write!(f, "straight"),
            TurnDirection::Left => write!(f, "left"),
            TurnDirection::Right => write!(f, "right"),
        }
    }
}

/// Signed change from `incoming_deg` to `outgoing_deg`, in `(-180, 180]`.
/// Positive is clockwise.
pub fn bearing_delta(incoming_deg: f64, outgoing_deg: f64) -> f64 {
    normalize_angle_deg(outgoing_deg - incoming_deg)
}

/// Classify the turn between an incoming and an outgoing bearing.
///
/// `|delta| ≤ 20°` is straight, a negative delta is a left turn, a positive
/// delta a right turn.
pub fn turn_direction(incoming_deg: f64, outgoing_deg: f64) -> TurnDirection {
    let delta = bearing_delta(incoming_deg, outgoing_deg);
    if delta.abs() <= STRAIGHT_TOLERANCE_DEG {
        TurnDirection::Straight
    } else if delta < 0.0 {
        TurnDirection::Left
    } else {
        TurnDirection::Right
    }
}

/// Turn the user makes when moving from `prev` onto `next`, using the
/// straight-line bearing of each leg.
pub fn turn_between(prev: &RouteStep, next: &RouteStep) -> TurnDirection {
    turn_direction(bearing(prev.start, prev.end), bearing(next.start, next.end))
}

// ────────────────────────────────────────────────────────────────────────────
// Segment deviation
// ────────────────────────────────────────────────────────────────────────────

/// Distance in metres from `p` to the nearest point of the straight segment
/// `start → end`.
///
/// The three points are projected onto a local equirectangular plane
/// centred on `start`; the foot of the perpendicular is clamped to the
/// segment so positions beyond either endpoint measure to that endpoint.
/// This is the straight-leg approximation of the real path: a curved street
/// between the two endpoints is not modelled.
///
/// A degenerate segment (`start == end`) reduces to [`haversine`]`(p, start)`.
pub fn segment_deviation(p: GeoPoint, start: GeoPoint, end: GeoPoint) -> f64 {
    let ref_lat = ((start.lat + end.lat) / 2.0).to_radians();
    let project = |q: GeoPoint| -> (f64, f64) {
        let d_lon = normalize_angle_deg(q.lon - start.lon).to_radians();
        let d_lat = (q.lat - start.lat).to_radians();
        (EARTH_RADIUS_M * d_lon * ref_lat.cos(), EARTH_RADIUS_M * d_lat)
    };

    let (ex, ey) = project(end);
    let (px, py) = project(p);
    let len_sq = ex * ex + ey * ey;
    if len_sq <= f64::EPSILON {
        return haversine(p, start);
    }

    let t = ((px * ex + py * ey) / len_sq).clamp(0.0, 1.0);
    let (nx, ny) = (t * ex, t * ey);
    ((px - nx).powi(2) + (py - ny).powi(2)).sqrt()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
