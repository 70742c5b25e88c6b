//! Vision-only distance estimation.
//!
//! A single camera cannot measure range, so when the ranging sensor is
//! unusable the fusion engine falls back to a coarse guess derived from the
//! bounding box.  The guess is class-agnostic and must decrease
//! monotonically as the box grows.  No calibration data backs the default
//! constants; plug a calibrated [`DistanceEstimator`] in through
//! [`ObstacleFusion::with_estimator`][crate::fusion::ObstacleFusion::with_estimator]
//! once one exists.

use serde::{Deserialize, Serialize};
use wayguide_types::DetectedObject;

/// Estimates an object's distance in metres from its detection alone.
pub trait DistanceEstimator: Send + Sync {
    /// Distance estimate in metres, always finite and non-negative.
    fn estimate_m(&self, object: &DetectedObject) -> f32;
}

/// Inverse box-height heuristic.
///
/// ```text
/// distance = reference_distance_m / (bbox_height / frame_height)
/// ```
///
/// clamped to `[min_m, max_m]`.  An object whose box spans the full frame
/// height is placed at `reference_distance_m`; half the height doubles the
/// distance.  Boxes with no height (or frames with no height) are placed at
/// `max_m`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseHeightEstimator {
    pub reference_distance_m: f32,
    pub min_m: f32,
    pub max_m: f32,
}

impl Default for InverseHeightEstimator {
    fn default() -> Self {
        Self {
            reference_distance_m: 0.5,
            min_m: 0.1,
            max_m: 20.0,
        }
    }
}

impl DistanceEstimator for InverseHeightEstimator {
    fn estimate_m(&self, object: &DetectedObject) -> f32 {
        match object.height_ratio() {
            Some(ratio) if ratio > 0.0 && ratio.is_finite() => {
                (self.reference_distance_m / ratio).clamp(self.min_m, self.max_m)
            }
            _ => self.max_m,
        }
    }
}
