//! Debug window: draws landmarks and boxes, watches for the quit key

use super::frame_to_mat;
use crate::detection::Detection;
use crate::error::VisionError;
use crate::frame::Frame;
use crate::overlay::Overlay;
use opencv::core::{Point, Rect, Scalar};
use opencv::{highgui, imgproc};
use tracing::debug;

const KEY_ESCAPE: i32 = 27;

pub struct HighGuiOverlay {
    window: String,
}

impl HighGuiOverlay {
    pub fn new(window: impl Into<String>) -> Result<Self, VisionError> {
        let window = window.into();
        highgui::named_window(&window, highgui::WINDOW_AUTOSIZE)?;
        Ok(Self { window })
    }

    fn draw(&self, frame: &Frame, detections: &[Detection]) -> Result<(), VisionError> {
        let mut mat = frame_to_mat(frame)?;
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
        let blue = Scalar::new(255.0, 0.0, 0.0, 0.0);

        for detection in detections {
            let (x, y, w, h) = detection.bbox;
            imgproc::rectangle(
                &mut mat,
                Rect::new(x as i32, y as i32, w as i32, h as i32),
                blue,
                2,
                imgproc::LINE_8,
                0,
            )?;
            for keypoint in detection.keypoints.iter().filter(|k| k.is_located()) {
                imgproc::circle(
                    &mut mat,
                    Point::new(keypoint.x as i32, keypoint.y as i32),
                    5,
                    green,
                    -1,
                    imgproc::LINE_8,
                    0,
                )?;
            }
        }

        highgui::imshow(&self.window, &mat)?;
        Ok(())
    }
}

impl Overlay for HighGuiOverlay {
    fn render(&mut self, frame: &Frame, detections: &[Detection]) {
        if let Err(e) = self.draw(frame, detections) {
            debug!("Overlay render failed: {}", e);
        }
    }

    fn exit_requested(&mut self) -> bool {
        match highgui::wait_key(1) {
            Ok(key) => {
                let key = key & 0xFF;
                key == 'q' as i32 || key == KEY_ESCAPE
            }
            Err(_) => false,
        }
    }
}

impl Drop for HighGuiOverlay {
    fn drop(&mut self) {
        let _ = highgui::destroy_window(&self.window);
    }
}
