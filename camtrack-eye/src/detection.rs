//! Detection results and the detector interface

use crate::error::VisionError;
use crate::frame::Frame;
use serde::{Deserialize, Serialize};

/// A body landmark in pixel coordinates.
///
/// Detectors report landmarks they could not place as `(0, 0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Whether the landmark was placed inside the image
    pub fn is_located(&self) -> bool {
        self.x > 0.0 && self.y > 0.0
    }
}

/// One detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    /// Box score
    pub confidence: f32,
    /// (x, y, width, height) in pixels
    pub bbox: (f32, f32, f32, f32),
    /// Empty for box-only detectors
    pub keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn bbox_center(&self) -> (f32, f32) {
        let (x, y, w, h) = self.bbox;
        (x + w / 2.0, y + h / 2.0)
    }

    /// Mean keypoint confidence, `None` without keypoints
    pub fn mean_keypoint_confidence(&self) -> Option<f32> {
        if self.keypoints.is_empty() {
            return None;
        }
        let sum: f32 = self.keypoints.iter().map(|k| k.confidence).sum();
        Some(sum / self.keypoints.len() as f32)
    }
}

/// Object or pose detector run once per frame
pub trait Detector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, VisionError>;

    fn name(&self) -> &str {
        "detector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_center() {
        let det = Detection {
            class_id: 0,
            class_name: "person".to_string(),
            confidence: 0.9,
            bbox: (100.0, 50.0, 40.0, 80.0),
            keypoints: vec![],
        };
        assert_eq!(det.bbox_center(), (120.0, 90.0));
        assert_eq!(det.mean_keypoint_confidence(), None);
    }

    #[test]
    fn test_mean_keypoint_confidence() {
        let det = Detection {
            class_id: 0,
            class_name: "person".to_string(),
            confidence: 0.9,
            bbox: (0.0, 0.0, 10.0, 10.0),
            keypoints: vec![Keypoint::new(1.0, 1.0, 0.4), Keypoint::new(2.0, 2.0, 0.8)],
        };
        let mean = det.mean_keypoint_confidence().unwrap();
        assert!((mean - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_keypoint_located() {
        assert!(Keypoint::new(3.0, 4.0, 0.9).is_located());
        assert!(!Keypoint::new(0.0, 4.0, 0.9).is_located());
        assert!(!Keypoint::new(3.0, 0.0, 0.9).is_located());
    }
}
