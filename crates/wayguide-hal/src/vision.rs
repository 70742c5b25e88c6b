//! [`VisionDetector`] – object detector run on camera frames (~30 Hz).
//!
//! The detection model itself lives outside this workspace; the trait is the
//! seam a model wrapper implements.

use std::time::{Duration, Instant};

use tracing::debug;
use wayguide_types::{DetectedObject, GuideError};

use crate::camera::CameraFrame;
use crate::feed::LatestValue;

/// One detector pass and when it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Detections {
    pub objects: Vec<DetectedObject>,
    pub taken_at: Instant,
}

pub trait VisionDetector: Send {
    fn id(&self) -> &str;

    /// Objects found in `frame`, with `frame_width`/`frame_height` set to the
    /// frame's dimensions.
    ///
    /// # Errors
    ///
    /// [`GuideError::SensorFault`] when the detector cannot run or has
    /// nothing current to report.
    fn detect(&mut self, frame: &CameraFrame) -> Result<Detections, GuideError>;
}

fn stamp(mut objects: Vec<DetectedObject>, frame: &CameraFrame) -> Vec<DetectedObject> {
    for obj in &mut objects {
        obj.frame_width = frame.width;
        obj.frame_height = frame.height;
    }
    objects
}

/// Cycles through scripted per-frame detections.
#[derive(Debug, Clone, Default)]
pub struct SimDetector {
    frames: Vec<Vec<DetectedObject>>,
    cursor: usize,
}

impl SimDetector {
    pub fn new(frames: Vec<Vec<DetectedObject>>) -> Self {
        Self { frames, cursor: 0 }
    }
}

impl VisionDetector for SimDetector {
    fn id(&self) -> &str {
        "sim_detector"
    }

    fn detect(&mut self, frame: &CameraFrame) -> Result<Detections, GuideError> {
        let taken_at = Instant::now();
        if self.frames.is_empty() {
            return Ok(Detections {
                objects: Vec::new(),
                taken_at,
            });
        }
        let objects = self.frames[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.frames.len();
        Ok(Detections {
            objects: stamp(objects, frame),
            taken_at,
        })
    }
}

/// Returns the batch an external detector process last published.
///
/// A batch older than `max_age` is reported as a fault instead of being
/// replayed.
pub struct FeedDetector {
    cell: LatestValue<Vec<DetectedObject>>,
    max_age: Duration,
}

impl FeedDetector {
    pub fn new(cell: LatestValue<Vec<DetectedObject>>, max_age: Duration) -> Self {
        Self { cell, max_age }
    }

    fn fault(&self, details: String) -> GuideError {
        GuideError::SensorFault {
            component: self.id().to_string(),
            details,
        }
    }
}

impl VisionDetector for FeedDetector {
    fn id(&self) -> &str {
        "feed_detector"
    }

    fn detect(&mut self, frame: &CameraFrame) -> Result<Detections, GuideError> {
        let (objects, taken_at) = self
            .cell
            .latest()
            .ok_or_else(|| self.fault("no detections published yet".to_string()))?;
        let age = taken_at.elapsed();
        if age > self.max_age {
            debug!(age_ms = age.as_millis() as u64, "detections too old");
            return Err(self.fault(format!("last detections are {} ms old", age.as_millis())));
        }
        Ok(Detections {
            objects: stamp(objects, frame),
            taken_at,
        })
    }
}
