//! [`GeoPoint`] – a WGS-84 latitude/longitude pair.

use serde::{Deserialize, Serialize};

use crate::error::GuideError;

/// A position on the Earth's surface in decimal degrees.
///
/// Fields are public so route providers can deserialize them directly;
/// boundary code (route loading, position ingestion) must call
/// [`GeoPoint::validate`] before feeding a point into any distance math.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees, `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting non-finite or out-of-range coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GuideError::InvalidCoordinate`] when either component is out
    /// of range or not a finite number.
    pub fn new(lat: f64, lon: f64) -> Result<Self, GuideError> {
        let point = Self { lat, lon };
        point.validate()?;
        Ok(point)
    }

    /// `true` when both components are finite and inside their ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    /// Fail fast on an invalid point.
    pub fn validate(&self) -> Result<(), GuideError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(GuideError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}
