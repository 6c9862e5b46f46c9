//! Debug overlay interface
//!
//! The overlay only observes: it sees each frame and its detections after
//! the tick's decision has been made, and may ask the loop to exit.

use crate::detection::Detection;
use crate::frame::Frame;

pub trait Overlay: Send {
    fn render(&mut self, frame: &Frame, detections: &[Detection]);

    /// Polled between ticks; `true` asks the loop to shut down
    fn exit_requested(&mut self) -> bool {
        false
    }
}

/// Overlay that draws nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl Overlay for NoOverlay {
    fn render(&mut self, _frame: &Frame, _detections: &[Detection]) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_overlay_never_requests_exit() {
        let mut overlay = NoOverlay;
        overlay.render(&Frame::blank(4, 4, 0), &[]);
        assert!(!overlay.exit_requested());
    }
}
