//! Obstacle inputs (detector output, ranging samples) and fused outputs.
//!
//! All of these are ephemeral: they are produced every frame and never
//! cached between ticks.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Axis-aligned pixel bounding box, `(x1, y1)` top-left, `(x2, y2)`
/// bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn center_x(&self) -> f32 {
        (self.x1 + self.x2) / 2.0
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).abs()
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).abs()
    }
}

/// One object reported by the vision detector for the current frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label, e.g. `"person"`.
    pub label: String,
    /// Detector confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl DetectedObject {
    /// Horizontal offset of the box centre from the frame centre, normalised
    /// by the frame half-width and clamped to `[-1, 1]`.  Negative is left.
    ///
    /// `None` for a zero-width frame.
    pub fn offset_fraction(&self) -> Option<f32> {
        if self.frame_width == 0 {
            return None;
        }
        let half_width = self.frame_width as f32 / 2.0;
        Some(((self.bbox.center_x() - half_width) / half_width).clamp(-1.0, 1.0))
    }

    /// Box height as a fraction of the frame height.  `None` for a
    /// zero-height frame.
    pub fn height_ratio(&self) -> Option<f32> {
        if self.frame_height == 0 {
            return None;
        }
        Some(self.bbox.height() / self.frame_height as f32)
    }

    /// Which third of the frame the box centre falls in.
    pub fn frame_position(&self) -> FramePosition {
        let third = self.frame_width as f32 / 3.0;
        let cx = self.bbox.center_x();
        if cx < third {
            FramePosition::Left
        } else if cx > 2.0 * third {
            FramePosition::Right
        } else {
            FramePosition::Center
        }
    }
}

/// A single sample from the narrow-beam ranging sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingReading {
    /// Measured distance in centimetres.
    pub distance_cm: f32,
    /// Monotonic instant the sample was taken.
    pub taken_at: Instant,
}

impl RangingReading {
    pub fn new(distance_cm: f32, taken_at: Instant) -> Self {
        Self {
            distance_cm,
            taken_at,
        }
    }

    /// Age of the sample at `now`.  Samples stamped in the future have age
    /// zero.
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.taken_at)
    }
}

/// Which sensor a fused distance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DistanceSource {
    /// Measured by the ranging sensor.
    Ultrasonic,
    /// Estimated from the bounding box.
    VisionEstimate,
}

/// A detection with its resolved distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedObject {
    pub object: DetectedObject,
    pub distance_m: f32,
    pub source: DistanceSource,
    /// Horizontal angle from the camera axis in degrees, negative left.
    /// `None` when the frame geometry gives no bearing.
    pub bearing_deg: Option<f32>,
}

/// Severity levels, most urgent first.  The derived ordering is the sort
/// order of warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum WarningTier {
    Emergency,
    Warning,
    Notice,
    Clear,
}

/// Coarse horizontal position of an object in the camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FramePosition {
    Left,
    Center,
    Right,
}

impl std::fmt::Display for FramePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramePosition::Left => write!(f, "on your left"),
            FramePosition::Center => write!(f, "in the center"),
            FramePosition::Right => write!(f, "on your right"),
        }
    }
}

/// A rendered, prioritised obstacle warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub object: FusedObject,
    pub tier: WarningTier,
    pub position: FramePosition,
    pub message: String,
}

impl Warning {
    /// `true` when the distance was measured rather than estimated.
    pub fn is_measured(&self) -> bool {
        self.object.source == DistanceSource::Ultrasonic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(x1: f32, x2: f32, frame_width: u32) -> DetectedObject {
        DetectedObject {
            label: "person".to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(x1, 100.0, x2, 300.0),
            frame_width,
            frame_height: 480,
        }
    }

    #[test]
    fn centered_box_has_zero_offset() {
        assert_eq!(object(300.0, 340.0, 640).offset_fraction(), Some(0.0));
    }

    #[test]
    fn offset_is_clamped() {
        let mut far_right = object(600.0, 900.0, 640);
        far_right.bbox.x2 = 1200.0;
        assert_eq!(far_right.offset_fraction(), Some(1.0));
        assert_eq!(object(0.0, 0.0, 640).offset_fraction(), Some(-1.0));
    }

    #[test]
    fn zero_width_frame_has_no_offset() {
        assert_eq!(object(0.0, 10.0, 0).offset_fraction(), None);
    }

    #[test]
    fn frame_position_uses_thirds() {
        assert_eq!(object(50.0, 150.0, 640).frame_position(), FramePosition::Left);
        assert_eq!(object(280.0, 360.0, 640).frame_position(), FramePosition::Center);
        assert_eq!(object(500.0, 600.0, 640).frame_position(), FramePosition::Right);
    }

    #[test]
    fn tiers_order_most_urgent_first() {
        assert!(WarningTier::Emergency < WarningTier::Warning);
        assert!(WarningTier::Notice < WarningTier::Clear);
    }

    #[test]
    fn future_reading_has_zero_age() {
        let now = Instant::now();
        let reading = RangingReading::new(50.0, now + Duration::from_millis(5));
        assert_eq!(reading.age(now), Duration::ZERO);
    }
}
