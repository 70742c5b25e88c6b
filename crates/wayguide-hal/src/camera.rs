//! Generic `Camera` trait and supporting types for image-capture hardware.

use wayguide_types::GuideError;

use crate::feed::LatestValue;

/// A raw image frame returned by a camera driver.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraFrame {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Raw pixel data (e.g. RGB24 or greyscale).
    pub data: Vec<u8>,
}

impl CameraFrame {
    /// An all-black greyscale frame of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize],
        }
    }
}

/// A camera or image-capture device.
pub trait Camera: Send {
    /// Stable identifier for this camera, e.g. `"chest_cam"`.
    fn id(&self) -> &str;

    /// Capture and return the next available frame.
    ///
    /// # Errors
    ///
    /// Returns [`GuideError::SensorFault`] if no frame is available.
    fn capture(&mut self) -> Result<CameraFrame, GuideError>;
}

/// Returns a blank frame of fixed size on every capture.
pub struct SimCamera {
    id: String,
    width: u32,
    height: u32,
}

impl SimCamera {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            width,
            height,
        }
    }
}

impl Camera for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, GuideError> {
        Ok(CameraFrame::blank(self.width, self.height))
    }
}

/// Hands out the latest frame an external capture driver published.
pub struct FeedCamera {
    id: String,
    cell: LatestValue<CameraFrame>,
}

impl FeedCamera {
    pub fn new(id: impl Into<String>, cell: LatestValue<CameraFrame>) -> Self {
        Self {
            id: id.into(),
            cell,
        }
    }
}

impl Camera for FeedCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn capture(&mut self) -> Result<CameraFrame, GuideError> {
        self.cell
            .latest()
            .map(|(frame, _)| frame)
            .ok_or_else(|| GuideError::SensorFault {
                component: self.id.clone(),
                details: "no frame published yet".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_camera_capture() {
        let mut cam = SimCamera::new("chest_cam", 4, 3);
        assert_eq!(cam.id(), "chest_cam");
        let frame = cam.capture().unwrap();
        assert_eq!(frame.width, 4);
        assert_eq!(frame.height, 3);
        assert_eq!(frame.data.len(), 12);
    }

    #[test]
    fn feed_camera_faults_until_first_frame() {
        let cell = LatestValue::new();
        let mut cam = FeedCamera::new("chest_cam", cell.clone());
        assert!(matches!(cam.capture(), Err(GuideError::SensorFault { .. })));
        cell.publish(CameraFrame::blank(2, 2));
        assert_eq!(cam.capture().unwrap().width, 2);
    }
}
