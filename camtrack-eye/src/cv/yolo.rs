//! YOLOv8-pose person detector on ONNX Runtime
//!
//! Frames are stretched to the square model input, so keypoints and boxes
//! scale back to the frame independently per axis.

use super::frame_to_mat;
use crate::detection::{Detection, Detector};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::pose::{PoseDecoder, POSE_INPUT_SIZE};
use opencv::core::{Mat, Size};
use opencv::imgproc;
use opencv::prelude::*;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;
use tracing::{debug, info};

pub struct YoloPoseDetector {
    session: Session,
    decoder: PoseDecoder,
    input_size: u32,
}

impl YoloPoseDetector {
    pub fn load(model_path: &Path) -> Result<Self, VisionError> {
        let session = Session::builder()
            .map_err(|e| VisionError::Model(format!("Failed to create ONNX session: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| VisionError::Model(format!("Failed to load pose model {:?}: {}", model_path, e)))?;

        info!("Pose model loaded from {:?}", model_path);
        Ok(Self {
            session,
            decoder: PoseDecoder::default(),
            input_size: POSE_INPUT_SIZE,
        })
    }

    /// Resize, reorder BGR to RGB planes and scale to [0, 1]
    fn preprocess(&self, frame: &Frame) -> Result<Vec<f32>, VisionError> {
        let mat = frame_to_mat(frame)?;
        let side = self.input_size as i32;
        let mut resized = Mat::default();
        imgproc::resize(&mat, &mut resized, Size::new(side, side), 0.0, 0.0, imgproc::INTER_LINEAR)?;

        let pixels = resized.data_bytes()?;
        let plane = (self.input_size * self.input_size) as usize;
        let mut chw = vec![0.0f32; plane * 3];
        for (i, bgr) in pixels.chunks_exact(3).enumerate() {
            chw[i] = bgr[2] as f32 / 255.0;
            chw[plane + i] = bgr[1] as f32 / 255.0;
            chw[2 * plane + i] = bgr[0] as f32 / 255.0;
        }
        Ok(chw)
    }
}

impl Detector for YoloPoseDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let side = self.input_size as usize;
        let input = Tensor::from_array(([1usize, 3, side, side], self.preprocess(frame)?))
            .map_err(|e| VisionError::Model(format!("Failed to build input tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| VisionError::Model(format!("Pose inference failed: {}", e)))?;
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Model(format!("Failed to read pose output: {}", e)))?;
        debug!("Pose output shape: {:?}", shape);

        let scale = (
            frame.width as f32 / self.input_size as f32,
            frame.height as f32 / self.input_size as f32,
        );
        self.decoder.decode(shape, data, scale)
    }

    fn name(&self) -> &str {
        "yolov8-pose"
    }
}
