//! Decoding of YOLOv8-pose output tensors
//!
//! The model emits one `[1, 5 + 3K, N]` tensor: for each of the `N`
//! candidates, box centre and size, a person score, then `K` keypoints as
//! (x, y, confidence), all in model-input pixels. Values are stored row by
//! row, so attribute `c` of candidate `i` sits at `c * N + i`.

use crate::detection::{Detection, Keypoint};
use crate::error::VisionError;
use std::cmp::Ordering;
use tracing::debug;

/// Square input edge of the stock YOLOv8 exports
pub const POSE_INPUT_SIZE: u32 = 640;

/// Keypoints per person in the COCO pose layout
pub const COCO_KEYPOINTS: usize = 17;

const BOX_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct PoseDecoder {
    /// Candidates scoring below this are dropped before suppression
    pub score_threshold: f32,
    /// Overlap above which the weaker of two boxes is suppressed
    pub iou_threshold: f32,
    /// Keypoints below this confidence are reported as absent
    pub keypoint_threshold: f32,
    pub max_detections: usize,
}

impl Default for PoseDecoder {
    fn default() -> Self {
        Self {
            score_threshold: 0.25,
            iou_threshold: 0.7,
            keypoint_threshold: 0.5,
            max_detections: 300,
        }
    }
}

impl PoseDecoder {
    /// Turn a raw output tensor into person detections in frame pixels.
    ///
    /// `scale` maps model-input pixels to frame pixels per axis. Results
    /// are ordered by score, strongest first.
    pub fn decode(&self, shape: &[i64], data: &[f32], scale: (f32, f32)) -> Result<Vec<Detection>, VisionError> {
        let (rows, candidates) = match shape {
            [1, rows, candidates] if *rows >= 0 && *candidates >= 0 => (*rows as usize, *candidates as usize),
            _ => {
                return Err(VisionError::Model(format!("Unexpected pose output shape {:?}", shape)));
            }
        };
        if rows < BOX_ROWS || (rows - BOX_ROWS) % 3 != 0 {
            return Err(VisionError::Model(format!(
                "Pose output has {} rows, expected 5 + 3 per keypoint",
                rows
            )));
        }
        if data.len() != rows * candidates {
            return Err(VisionError::Model(format!(
                "Pose output holds {} values for shape {:?}",
                data.len(),
                shape
            )));
        }

        let keypoints = (rows - BOX_ROWS) / 3;
        let at = |row: usize, i: usize| data[row * candidates + i];
        let (sx, sy) = scale;

        let mut detections = Vec::new();
        for i in 0..candidates {
            let score = at(4, i);
            if !score.is_finite() || score < self.score_threshold {
                continue;
            }
            let (cx, cy, w, h) = (at(0, i), at(1, i), at(2, i), at(3, i));
            if ![cx, cy, w, h].iter().all(|v| v.is_finite()) || w <= 0.0 || h <= 0.0 {
                continue;
            }

            let landmarks = (0..keypoints)
                .map(|k| {
                    let row = BOX_ROWS + 3 * k;
                    let confidence = at(row + 2, i);
                    if confidence < self.keypoint_threshold {
                        Keypoint::new(0.0, 0.0, 0.0)
                    } else {
                        Keypoint::new(at(row, i) * sx, at(row + 1, i) * sy, confidence)
                    }
                })
                .collect();

            detections.push(Detection {
                class_id: 0,
                class_name: "person".to_string(),
                confidence: score,
                bbox: ((cx - w / 2.0) * sx, (cy - h / 2.0) * sy, w * sx, h * sy),
                keypoints: landmarks,
            });
        }

        let mut kept = non_max_suppression(detections, self.iou_threshold);
        kept.truncate(self.max_detections);
        debug!("Decoded {} pose detection(s) from {} candidates", kept.len(), candidates);
        Ok(kept)
    }
}

/// Keep the strongest of every group of boxes overlapping above `iou_threshold`
pub fn non_max_suppression(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(Ordering::Equal));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two (x, y, w, h) boxes
pub fn iou(a: &(f32, f32, f32, f32), b: &(f32, f32, f32, f32)) -> f32 {
    let (ax, ay, aw, ah) = *a;
    let (bx, by, bw, bh) = *b;

    let width = (ax + aw).min(bx + bw) - ax.max(bx);
    let height = (ay + ah).min(by + bh) - ay.max(by);
    if width <= 0.0 || height <= 0.0 {
        return 0.0;
    }

    let intersection = width * height;
    let union = aw * ah + bw * bh - intersection;
    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }
    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROWS: usize = BOX_ROWS + 3 * COCO_KEYPOINTS;

    /// Lay candidates out the way the model does: one row per attribute
    fn tensor(candidates: &[Vec<f32>]) -> (Vec<i64>, Vec<f32>) {
        let n = candidates.len();
        let mut data = vec![0.0f32; ROWS * n];
        for (i, candidate) in candidates.iter().enumerate() {
            for (row, value) in candidate.iter().enumerate() {
                data[row * n + i] = *value;
            }
        }
        (vec![1, ROWS as i64, n as i64], data)
    }

    /// Person box centred on (cx, cy), every keypoint at the centre
    fn candidate(cx: f32, cy: f32, score: f32, keypoint_confidence: f32) -> Vec<f32> {
        let mut values = vec![cx, cy, 100.0, 200.0, score];
        for _ in 0..COCO_KEYPOINTS {
            values.extend([cx, cy, keypoint_confidence]);
        }
        values
    }

    #[test]
    fn test_decode_scales_to_frame() {
        let mut person = candidate(320.0, 320.0, 0.9, 0.8);
        // Left eye
        person[BOX_ROWS + 3] = 300.0;
        person[BOX_ROWS + 4] = 200.0;
        let (shape, data) = tensor(&[person]);

        let detections = PoseDecoder::default().decode(&shape, &data, (1.0, 0.75)).unwrap();
        assert_eq!(detections.len(), 1);

        let person = &detections[0];
        assert_eq!(person.class_name, "person");
        assert_eq!(person.confidence, 0.9);
        assert_eq!(person.bbox, (270.0, 165.0, 100.0, 150.0));
        assert_eq!(person.bbox_center(), (320.0, 240.0));
        assert_eq!(person.keypoints.len(), COCO_KEYPOINTS);
        assert_eq!(person.keypoints[1], Keypoint::new(300.0, 150.0, 0.8));
    }

    #[test]
    fn test_decoded_pose_has_eye_anchor() {
        use crate::selector::ObservationSelector;
        use camtrack_core::{DetectionConfig, Observation};

        let (shape, data) = tensor(&[candidate(320.0, 320.0, 0.9, 0.8)]);
        let detections = PoseDecoder::default().decode(&shape, &data, (1.0, 0.75)).unwrap();

        let selector = ObservationSelector::new(DetectionConfig::default());
        assert_eq!(selector.select(&detections), Some(Observation::new(320.0, 240.0)));
    }

    #[test]
    fn test_decode_drops_low_scores() {
        let (shape, data) = tensor(&[candidate(100.0, 100.0, 0.1, 0.9), candidate(500.0, 100.0, 0.3, 0.9)]);
        let detections = PoseDecoder::default().decode(&shape, &data, (1.0, 1.0)).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bbox_center(), (500.0, 100.0));
    }

    #[test]
    fn test_uncertain_keypoints_read_as_absent() {
        let (shape, data) = tensor(&[candidate(320.0, 320.0, 0.9, 0.4)]);
        let detections = PoseDecoder::default().decode(&shape, &data, (1.0, 1.0)).unwrap();
        let person = &detections[0];
        assert!(person.keypoints.iter().all(|k| !k.is_located()));
        assert_eq!(person.mean_keypoint_confidence(), Some(0.0));
    }

    #[test]
    fn test_overlapping_candidates_are_suppressed() {
        let (shape, data) = tensor(&[
            candidate(320.0, 320.0, 0.6, 0.9),
            candidate(322.0, 320.0, 0.95, 0.9),
            candidate(100.0, 320.0, 0.7, 0.9),
        ]);
        let detections = PoseDecoder::default().decode(&shape, &data, (1.0, 1.0)).unwrap();
        let scores: Vec<f32> = detections.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.95, 0.7]);
    }

    #[test]
    fn test_decode_rejects_bad_shapes() {
        let decoder = PoseDecoder::default();
        assert!(decoder.decode(&[1, 84, 2], &[0.0; 168], (1.0, 1.0)).is_err());
        assert!(decoder.decode(&[56, 2], &[0.0; 112], (1.0, 1.0)).is_err());
        assert!(decoder.decode(&[1, 56, 2], &[0.0; 10], (1.0, 1.0)).is_err());
    }

    #[test]
    fn test_empty_output() {
        let detections = PoseDecoder::default().decode(&[1, 56, 0], &[], (1.0, 1.0)).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_iou() {
        let a = (0.0, 0.0, 10.0, 10.0);
        assert_eq!(iou(&a, &a), 1.0);
        assert_eq!(iou(&a, &(20.0, 0.0, 10.0, 10.0)), 0.0);
        assert!((iou(&a, &(5.0, 0.0, 10.0, 10.0)) - 1.0 / 3.0).abs() < 1e-6);
    }
}
