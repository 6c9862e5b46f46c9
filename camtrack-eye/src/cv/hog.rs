//! Pedestrian detector using OpenCV's stock HOG + linear SVM model
//!
//! Produces boxes only, so it pairs with the box anchor mode.

use super::frame_to_mat;
use crate::detection::{Detection, Detector};
use crate::error::VisionError;
use crate::frame::Frame;
use opencv::core::{Rect, Size, Vector};
use opencv::objdetect::HOGDescriptor;
use opencv::prelude::*;

pub struct HogPersonDetector {
    hog: HOGDescriptor,
    scale: f64,
}

impl HogPersonDetector {
    pub fn new() -> Result<Self, VisionError> {
        let mut hog = HOGDescriptor::default()?;
        hog.set_svm_detector(&HOGDescriptor::get_default_people_detector()?)?;
        Ok(Self { hog, scale: 1.05 })
    }
}

impl Detector for HogPersonDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError> {
        let mat = frame_to_mat(frame)?;
        let mut found = Vector::<Rect>::new();
        let mut weights = Vector::<f64>::new();

        self.hog.detect_multi_scale_weights(
            &mat,
            &mut found,
            &mut weights,
            0.0,
            Size::new(8, 8),
            Size::new(0, 0),
            self.scale,
            2.0,
            false,
        )?;

        Ok(found
            .iter()
            .zip(weights.iter())
            .map(|(rect, weight)| Detection {
                class_id: 0,
                class_name: "person".to_string(),
                confidence: weight as f32,
                bbox: (rect.x as f32, rect.y as f32, rect.width as f32, rect.height as f32),
                keypoints: Vec::new(),
            })
            .collect())
    }

    fn name(&self) -> &str {
        "hog-person"
    }
}
