//! [`SensorRig`] – the set of sensor drivers the guide loop polls.
//!
//! The rig owns one driver per input behind its trait object, so the loop
//! never knows whether it is talking to a simulator or a real device.  The
//! variant is chosen once, at construction: [`SimRig`][crate::sim_rig::SimRig]
//! for scripted sensors, [`SensorRig::feed`] for latest-value cells written
//! by external drivers.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use wayguide_hal::SensorRig;
//! use wayguide_types::GeoPoint;
//!
//! let (mut rig, writers) = SensorRig::feed(Duration::from_secs(5), Duration::from_secs(1));
//! assert!(rig.poll_position().is_none());
//!
//! writers.position.publish(GeoPoint { lat: 12.97, lon: 77.64 });
//! assert!(rig.poll_position().is_some());
//! ```

use std::time::Duration;

use tracing::debug;
use wayguide_types::{DetectedObject, GeoPoint, GuideError, RangingReading};

use crate::camera::{Camera, CameraFrame, FeedCamera};
use crate::feed::LatestValue;
use crate::position::{FeedPosition, PositionProvider};
use crate::ranging::{FeedRanging, RangingSensor};
use crate::vision::{Detections, FeedDetector, VisionDetector};

/// Writer halves of a feed-backed rig, handed to the external drivers.
#[derive(Clone, Default)]
pub struct FeedWriters {
    pub position: LatestValue<GeoPoint>,
    /// Raw distances in centimetres.
    pub ranging: LatestValue<f32>,
    pub frames: LatestValue<CameraFrame>,
    pub detections: LatestValue<Vec<DetectedObject>>,
}

/// Position, ranging, camera and detector drivers behind their traits.
pub struct SensorRig {
    position: Box<dyn PositionProvider>,
    ranging: Box<dyn RangingSensor>,
    camera: Box<dyn Camera>,
    detector: Box<dyn VisionDetector>,
}

impl SensorRig {
    pub fn new(
        position: Box<dyn PositionProvider>,
        ranging: Box<dyn RangingSensor>,
        camera: Box<dyn Camera>,
        detector: Box<dyn VisionDetector>,
    ) -> Self {
        Self {
            position,
            ranging,
            camera,
            detector,
        }
    }

    /// A rig whose every input is a [`LatestValue`] cell.  Position fixes
    /// older than `max_fix_age` read as no fix; detection batches older than
    /// `max_detection_age` are a detector fault.
    pub fn feed(max_fix_age: Duration, max_detection_age: Duration) -> (Self, FeedWriters) {
        let writers = FeedWriters::default();
        let rig = Self::new(
            Box::new(FeedPosition::new(writers.position.clone(), max_fix_age)),
            Box::new(FeedRanging::new(writers.ranging.clone())),
            Box::new(FeedCamera::new("feed_camera", writers.frames.clone())),
            Box::new(FeedDetector::new(
                writers.detections.clone(),
                max_detection_age,
            )),
        );
        (rig, writers)
    }

    pub fn poll_position(&mut self) -> Option<GeoPoint> {
        self.position.get_position()
    }

    pub fn poll_ranging(&mut self) -> Option<RangingReading> {
        self.ranging.get_distance()
    }

    /// Capture a frame and run the detector on it.
    ///
    /// # Errors
    ///
    /// [`GuideError::SensorFault`] from the camera or the detector.
    pub fn poll_vision(&mut self) -> Result<Detections, GuideError> {
        let frame = self.camera.capture()?;
        let detections = self.detector.detect(&frame)?;
        debug!(
            camera = self.camera.id(),
            count = detections.objects.len(),
            "frame processed"
        );
        Ok(detections)
    }

    /// Driver identifiers, for status output.
    pub fn describe(&self) -> Vec<String> {
        vec![
            format!("position: {}", self.position.id()),
            format!("ranging: {}", self.ranging.id()),
            format!("camera: {}", self.camera.id()),
            format!("detector: {}", self.detector.id()),
        ]
    }
}
