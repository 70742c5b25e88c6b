//! [`SimRig`] – scripted sensors for tests, demos and CI.
//!
//! Builds a [`SensorRig`] whose every slot is a simulator:
//!
//! | Slot | Simulator |
//! |---|---|
//! | position | [`SimGps`] replaying a path, one point per poll when `auto_advance` |
//! | ranging | [`SimRanging`] replaying a distance script |
//! | camera | [`SimCamera`] returning blank frames of the configured size |
//! | detector | [`SimDetector`] cycling through scripted detections |
//!
//! # Example
//!
//! ```rust
//! use wayguide_hal::sim_rig::SimRig;
//! use wayguide_types::GeoPoint;
//!
//! let mut rig = SimRig::builder()
//!     .with_path(vec![GeoPoint { lat: 1.0, lon: 1.0 }, GeoPoint { lat: 1.0, lon: 1.001 }])
//!     .with_ranging(vec![Some(45.0)])
//!     .build();
//!
//! assert_eq!(rig.poll_position(), Some(GeoPoint { lat: 1.0, lon: 1.0 }));
//! assert_eq!(rig.poll_position(), Some(GeoPoint { lat: 1.0, lon: 1.001 }));
//! assert_eq!(rig.poll_ranging().map(|r| r.distance_cm), Some(45.0));
//! ```

use wayguide_types::{DetectedObject, GeoPoint};

use crate::camera::SimCamera;
use crate::position::SimGps;
use crate::ranging::SimRanging;
use crate::rig::SensorRig;
use crate::vision::SimDetector;

/// Builder for a fully simulated [`SensorRig`].
#[derive(Debug, Clone)]
pub struct SimRig {
    path: Vec<GeoPoint>,
    auto_advance: bool,
    ranging: Vec<Option<f32>>,
    detections: Vec<Vec<DetectedObject>>,
    frame_size: (u32, u32),
}

impl Default for SimRig {
    fn default() -> Self {
        Self {
            path: Vec::new(),
            auto_advance: true,
            ranging: Vec::new(),
            detections: Vec::new(),
            frame_size: (640, 480),
        }
    }
}

impl SimRig {
    pub fn builder() -> Self {
        Self::default()
    }

    pub fn with_path(mut self, path: Vec<GeoPoint>) -> Self {
        self.path = path;
        self
    }

    /// Hold each point until stepped instead of advancing per poll.
    pub fn auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    pub fn with_ranging(mut self, script: Vec<Option<f32>>) -> Self {
        self.ranging = script;
        self
    }

    pub fn with_detections(mut self, frames: Vec<Vec<DetectedObject>>) -> Self {
        self.detections = frames;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    pub fn build(self) -> SensorRig {
        let (width, height) = self.frame_size;
        SensorRig::new(
            Box::new(SimGps::new(self.path).auto_advance(self.auto_advance)),
            Box::new(SimRanging::new(self.ranging)),
            Box::new(SimCamera::new("sim_camera", width, height)),
            Box::new(SimDetector::new(self.detections)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayguide_types::BoundingBox;

    #[test]
    fn default_rig_has_no_inputs() {
        let mut rig = SimRig::builder().build();
        assert!(rig.poll_position().is_none());
        assert!(rig.poll_ranging().is_none());
        assert!(rig.poll_vision().unwrap().objects.is_empty());
    }

    #[test]
    fn detections_carry_configured_frame_size() {
        let mut rig = SimRig::builder()
            .with_frame_size(320, 240)
            .with_detections(vec![vec![DetectedObject {
                label: "car".to_string(),
                confidence: 0.7,
                bbox: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
                frame_width: 0,
                frame_height: 0,
            }]])
            .build();
        let objects = rig.poll_vision().unwrap().objects;
        assert_eq!((objects[0].frame_width, objects[0].frame_height), (320, 240));
    }

    #[test]
    fn manual_path_holds_first_point() {
        let p = GeoPoint { lat: 1.0, lon: 1.0 };
        let mut rig = SimRig::builder()
            .with_path(vec![p, GeoPoint { lat: 2.0, lon: 2.0 }])
            .auto_advance(false)
            .build();
        assert_eq!(rig.poll_position(), Some(p));
        assert_eq!(rig.poll_position(), Some(p));
    }
}
