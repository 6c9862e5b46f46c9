//! Picks the single observation the tracker follows from a frame's detections
//!
//! Candidates are scanned in detector order; the first one of the target
//! class that passes the confidence gate and yields a finite anchor wins.

use crate::detection::Detection;
use camtrack_core::{AnchorMode, DetectionConfig, Observation};
use tracing::trace;

pub struct ObservationSelector {
    config: DetectionConfig,
}

impl ObservationSelector {
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// First qualifying detection's anchor, or `None`
    pub fn select(&self, detections: &[Detection]) -> Option<Observation> {
        detections
            .iter()
            .filter(|d| d.class_name == self.config.target_class)
            .find_map(|d| self.anchor(d))
    }

    /// Anchor point of one detection, `None` when it does not qualify
    pub fn anchor(&self, detection: &Detection) -> Option<Observation> {
        let threshold = self.config.confidence_threshold;
        let (x, y) = match &self.config.anchor {
            AnchorMode::Pose { landmarks } => {
                let confidence = detection.mean_keypoint_confidence()?;
                if confidence <= threshold {
                    trace!("Skipping {} with keypoint confidence {:.2}", detection.class_name, confidence);
                    return None;
                }
                let mut sum_x = 0.0f64;
                let mut sum_y = 0.0f64;
                for &index in landmarks {
                    let keypoint = detection.keypoints.get(index).filter(|k| k.is_located())?;
                    sum_x += keypoint.x as f64;
                    sum_y += keypoint.y as f64;
                }
                let count = landmarks.len() as f64;
                if count == 0.0 {
                    return None;
                }
                (sum_x / count, sum_y / count)
            }
            AnchorMode::Box => {
                if detection.confidence <= threshold {
                    trace!("Skipping {} with score {:.2}", detection.class_name, detection.confidence);
                    return None;
                }
                let (cx, cy) = detection.bbox_center();
                (cx as f64, cy as f64)
            }
        };

        if x.is_finite() && y.is_finite() {
            Some(Observation::new(x, y))
        } else {
            None
        }
    }
}
