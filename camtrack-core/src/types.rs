//! Value types shared across the tracker

use serde::{Deserialize, Serialize};

/// Bound, in degrees, of both axes on the wire
pub const ANGLE_LIMIT: f64 = 90.0;

/// Image-space position of the subject for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
}

impl Observation {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Map an image-space position to [-1, 1] on each axis relative to the frame center.
    ///
    /// Returns `None` for degenerate frames.
    pub fn normalize(&self, observation: &Observation) -> Option<(f64, f64)> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let half_w = self.width as f64 / 2.0;
        let half_h = self.height as f64 / 2.0;
        Some(((observation.x - half_w) / half_w, (observation.y - half_h) / half_h))
    }
}

/// Pan/tilt command in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnglePair {
    pub pan: f64,
    pub tilt: f64,
}

impl AnglePair {
    pub fn new(pan: f64, tilt: f64) -> Self {
        Self { pan, tilt }
    }

    /// Clamp both axes into `[-ANGLE_LIMIT, ANGLE_LIMIT]`
    pub fn clamped(self) -> Self {
        Self {
            pan: clamp_axis(self.pan),
            tilt: clamp_axis(self.tilt),
        }
    }

    pub fn is_within_limits(&self) -> bool {
        self.pan.abs() <= ANGLE_LIMIT && self.tilt.abs() <= ANGLE_LIMIT
    }
}

fn clamp_axis(value: f64) -> f64 {
    // NaN would survive f64::clamp; park it at center
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-ANGLE_LIMIT, ANGLE_LIMIT)
    }
}
