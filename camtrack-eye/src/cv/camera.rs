//! USB camera capture

use super::mat_to_frame;
use crate::error::VisionError;
use crate::frame::{Frame, FrameSource};
use camtrack_core::CameraConfig;
use opencv::core::Mat;
use opencv::prelude::*;
use opencv::videoio::{VideoCapture, CAP_ANY, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH};
use tracing::{debug, info};

pub struct OpenCvCamera {
    config: CameraConfig,
    capture: Option<VideoCapture>,
    sequence: u64,
}

impl OpenCvCamera {
    /// Open the configured device and request its resolution
    pub fn open(config: CameraConfig) -> Result<Self, VisionError> {
        let mut capture = VideoCapture::new(config.camera_id as i32, CAP_ANY)
            .map_err(|e| VisionError::Camera(format!("Failed to open camera {}: {}", config.camera_id, e)))?;

        if !capture.is_opened()? {
            return Err(VisionError::Camera(format!("Camera {} failed to open", config.camera_id)));
        }

        let (width, height) = config.resolution;
        capture
            .set(CAP_PROP_FRAME_WIDTH, width as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set width: {}", e)))?;
        capture
            .set(CAP_PROP_FRAME_HEIGHT, height as f64)
            .map_err(|e| VisionError::Camera(format!("Failed to set height: {}", e)))?;

        info!("Camera {} opened at {}x{}", config.camera_id, width, height);

        Ok(Self {
            config,
            capture: Some(capture),
            sequence: 0,
        })
    }
}

impl FrameSource for OpenCvCamera {
    fn acquire(&mut self) -> Result<Frame, VisionError> {
        let capture = self
            .capture
            .as_mut()
            .ok_or_else(|| VisionError::Camera("Camera released".to_string()))?;

        let mut mat = Mat::default();
        if !capture.read(&mut mat)? {
            return Err(VisionError::Camera(format!("Camera {} returned no frame", self.config.camera_id)));
        }

        let frame = mat_to_frame(&mat, self.sequence)?;
        self.sequence += 1;
        Ok(frame)
    }

    fn release(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            if let Err(e) = capture.release() {
                debug!("Ignoring camera release error: {}", e);
            }
            info!("Camera {} released", self.config.camera_id);
        }
    }
}

impl Drop for OpenCvCamera {
    fn drop(&mut self) {
        self.release();
    }
}
