//! Obstacle Fusion Engine.
//!
//! Combines the vision detector's per-frame [`DetectedObject`]s with the most
//! recent [`RangingReading`] into distance-resolved [`FusedObject`]s and
//! prioritised [`Warning`]s.
//!
//! The ranging sensor points straight ahead with a narrow beam, the camera
//! sees a wide cone.  For every detection the engine converts the horizontal
//! offset of the box centre into a bearing:
//!
//! ```text
//! offset  = (bbox_center_x − frame_width / 2) / (frame_width / 2)   ∈ [-1, 1]
//! bearing = offset × camera_half_fov
//! ```
//!
//! and uses the ranging distance only when the bearing lies inside the
//! ranging beam **and** the sample is fresh **and** in the sensor's valid
//! range.  Every other detection gets a vision estimate from the configured
//! [`DistanceEstimator`].  The chosen source is always recorded on the result.
//!
//! The engine holds configuration only; every call is a pure function of its
//! arguments, so one instance can be shared across threads and frames.
//!
//! # Example
//!
//! ```rust
//! use std::time::Instant;
//! use wayguide_perception::fusion::{FusionConfig, ObstacleFusion};
//! use wayguide_types::{BoundingBox, DetectedObject, DistanceSource, RangingReading, WarningTier};
//!
//! let fusion = ObstacleFusion::new(FusionConfig::default());
//! let now = Instant::now();
//! let reading = RangingReading::new(45.0, now);
//! let person = DetectedObject {
//!     label: "person".into(),
//!     confidence: 0.9,
//!     bbox: BoundingBox::new(280.0, 100.0, 360.0, 400.0),
//!     frame_width: 640,
//!     frame_height: 480,
//! };
//!
//! let warnings = fusion.generate_obstacle_warnings(&[person], Some(&reading), now);
//! assert_eq!(warnings[0].tier, WarningTier::Warning);
//! assert_eq!(warnings[0].object.source, DistanceSource::Ultrasonic);
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::debug;
use wayguide_types::{
    DetectedObject, DistanceSource, FusedObject, RangingReading, Warning, WarningTier,
};

use crate::estimator::{DistanceEstimator, InverseHeightEstimator};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

/// Geometry, validity and tier thresholds for [`ObstacleFusion`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Half of the camera's horizontal field of view (degrees).
    pub camera_half_fov_deg: f32,
    /// Half of the ranging sensor's beam width (degrees).
    pub ranging_half_fov_deg: f32,
    /// Ranging samples older than this are treated as unavailable.
    pub ranging_max_age_ms: u64,
    /// Smallest distance the ranging sensor reports reliably (cm).
    pub ranging_min_cm: f32,
    /// Largest distance the ranging sensor reports reliably (cm).
    pub ranging_max_cm: f32,
    /// Objects closer than this are critical (metres).
    pub critical_distance_m: f32,
    /// Below this distance an object is [`WarningTier::Emergency`].
    pub emergency_below_m: f32,
    /// Below this distance an object is at least [`WarningTier::Warning`].
    pub warning_below_m: f32,
    /// Below this distance an object is at least [`WarningTier::Notice`].
    pub notice_below_m: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            camera_half_fov_deg: 30.0,
            ranging_half_fov_deg: 7.5,
            ranging_max_age_ms: 300,
            ranging_min_cm: 2.0,
            ranging_max_cm: 400.0,
            critical_distance_m: 1.5,
            emergency_below_m: 0.30,
            warning_below_m: 0.60,
            notice_below_m: 1.00,
        }
    }
}

impl FusionConfig {
    fn ranging_max_age(&self) -> Duration {
        Duration::from_millis(self.ranging_max_age_ms)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Ranging status
// ────────────────────────────────────────────────────────────────────────────

/// Condition of the bare ranging sample, independent of any detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangingStatus {
    /// No sample has been received.
    Unavailable,
    /// The latest sample is older than the staleness window.
    Stale { age: Duration },
    /// The latest sample lies outside the sensor's valid range.
    OutOfRange { distance_cm: f32 },
    /// Usable sample.
    Fresh { distance_m: f32, tier: WarningTier },
}

// ────────────────────────────────────────────────────────────────────────────
// ObstacleFusion
// ────────────────────────────────────────────────────────────────────────────

/// Per-frame obstacle fusion.
///
/// Construct with [`ObstacleFusion::new`] for the default
/// [`InverseHeightEstimator`] or [`ObstacleFusion::with_estimator`] to supply
/// another heuristic.
#[derive(Debug, Clone)]
pub struct ObstacleFusion<E = InverseHeightEstimator> {
    config: FusionConfig,
    estimator: E,
}

impl ObstacleFusion<InverseHeightEstimator> {
    pub fn new(config: FusionConfig) -> Self {
        Self::with_estimator(config, InverseHeightEstimator::default())
    }
}

impl<E: DistanceEstimator> ObstacleFusion<E> {
    pub fn with_estimator(config: FusionConfig, estimator: E) -> Self {
        Self { config, estimator }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Horizontal bearing of `object` from the camera axis (degrees,
    /// negative left).
    pub fn bearing_deg(&self, object: &DetectedObject) -> Option<f32> {
        object
            .offset_fraction()
            .map(|offset| offset * self.config.camera_half_fov_deg)
    }

    /// Classify the bare ranging sample.
    pub fn ranging_status(&self, reading: Option<&RangingReading>, now: Instant) -> RangingStatus {
        let Some(reading) = reading else {
            return RangingStatus::Unavailable;
        };
        let age = reading.age(now);
        if age > self.config.ranging_max_age() {
            return RangingStatus::Stale { age };
        }
        if !(self.config.ranging_min_cm..=self.config.ranging_max_cm).contains(&reading.distance_cm)
        {
            return RangingStatus::OutOfRange {
                distance_cm: reading.distance_cm,
            };
        }
        let distance_m = reading.distance_cm / 100.0;
        RangingStatus::Fresh {
            distance_m,
            tier: self.classify(distance_m),
        }
    }

    /// Resolve the distance of one detection.
    pub fn fuse_object(
        &self,
        object: &DetectedObject,
        reading: Option<&RangingReading>,
        now: Instant,
    ) -> FusedObject {
        let bearing_deg = self.bearing_deg(object);
        let in_beam = bearing_deg.is_some_and(|b| b.abs() <= self.config.ranging_half_fov_deg);

        let measured = if in_beam {
            match self.ranging_status(reading, now) {
                RangingStatus::Fresh { distance_m, .. } => Some(distance_m),
                other => {
                    debug!(label = %object.label, status = ?other, "ranging unusable, estimating from vision");
                    None
                }
            }
        } else {
            None
        };

        let (distance_m, source) = match measured {
            Some(d) => (d, DistanceSource::Ultrasonic),
            None => (self.estimator.estimate_m(object), DistanceSource::VisionEstimate),
        };

        FusedObject {
            object: object.clone(),
            distance_m,
            source,
            bearing_deg,
        }
    }

    /// Resolve the distance of every detection in the frame, in input order.
    pub fn fuse(
        &self,
        objects: &[DetectedObject],
        reading: Option<&RangingReading>,
        now: Instant,
    ) -> Vec<FusedObject> {
        objects
            .iter()
            .map(|object| self.fuse_object(object, reading, now))
            .collect()
    }

    /// Tier for a distance in metres.
    pub fn classify(&self, distance_m: f32) -> WarningTier {
        if distance_m < self.config.emergency_below_m {
            WarningTier::Emergency
        } else if distance_m < self.config.warning_below_m {
            WarningTier::Warning
        } else if distance_m < self.config.notice_below_m {
            WarningTier::Notice
        } else {
            WarningTier::Clear
        }
    }

    /// Detections closer than the critical distance, nearest first.
    pub fn get_critical_obstacles(
        &self,
        objects: &[DetectedObject],
        reading: Option<&RangingReading>,
        now: Instant,
    ) -> Vec<FusedObject> {
        let mut critical: Vec<FusedObject> = self
            .fuse(objects, reading, now)
            .into_iter()
            .filter(|f| f.distance_m < self.config.critical_distance_m)
            .collect();
        critical.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
        critical
    }

    /// One warning per detection, ordered by `(tier, distance)`.
    ///
    /// Tier dominates: an Emergency warning always precedes any Clear one,
    /// whatever their distances.
    pub fn generate_obstacle_warnings(
        &self,
        objects: &[DetectedObject],
        reading: Option<&RangingReading>,
        now: Instant,
    ) -> Vec<Warning> {
        let mut warnings: Vec<Warning> = self
            .fuse(objects, reading, now)
            .into_iter()
            .map(|fused| self.render(fused))
            .collect();
        warnings.sort_by(|a, b| {
            a.tier
                .cmp(&b.tier)
                .then_with(|| a.object.distance_m.total_cmp(&b.object.distance_m))
        });
        warnings
    }

    /// The `n` most urgent warnings.
    pub fn top_warnings(
        &self,
        n: usize,
        objects: &[DetectedObject],
        reading: Option<&RangingReading>,
        now: Instant,
    ) -> Vec<Warning> {
        let mut warnings = self.generate_obstacle_warnings(objects, reading, now);
        warnings.truncate(n);
        warnings
    }

    fn render(&self, fused: FusedObject) -> Warning {
        let tier = self.classify(fused.distance_m);
        let position = fused.object.frame_position();
        let prefix = match tier {
            WarningTier::Emergency => "Stop! ",
            WarningTier::Warning => "Caution: ",
            WarningTier::Notice | WarningTier::Clear => "",
        };
        let message = format!(
            "{prefix}{} {position} {} ahead",
            fused.object.label,
            format_meters(fused.distance_m)
        );
        Warning {
            object: fused,
            tier,
            position,
            message,
        }
    }
}

fn format_meters(distance_m: f32) -> String {
    if distance_m < 1.0 {
        format!("{distance_m:.2} meters")
    } else {
        format!("{distance_m:.1} meters")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
