//! Frames and the frame source interface

use crate::error::VisionError;
use bytes::Bytes;
use camtrack_core::FrameSize;
use chrono::{DateTime, Utc};

/// One captured image, packed BGR8
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Monotonic per source, starting at 0
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    pub data: Bytes,
}

impl Frame {
    pub fn new(width: u32, height: u32, sequence: u64, data: Bytes) -> Self {
        Self {
            width,
            height,
            sequence,
            captured_at: Utc::now(),
            data,
        }
    }

    /// Frame with no pixel payload, for sources that only report geometry
    pub fn blank(width: u32, height: u32, sequence: u64) -> Self {
        Self::new(width, height, sequence, Bytes::new())
    }

    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.width, self.height)
    }

    /// Whether `data` holds exactly `width * height` BGR pixels
    pub fn has_pixels(&self) -> bool {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|px| px.checked_mul(3));
        expected == Some(self.data.len()) && !self.data.is_empty()
    }
}

/// Source of frames, polled once per tick
pub trait FrameSource: Send {
    /// Grab the next frame. An error means no frame is available this tick.
    fn acquire(&mut self) -> Result<Frame, VisionError>;

    /// Release the underlying device
    fn release(&mut self) {}
}
