//! OpenCV-backed camera, person detectors and debug window

mod camera;
mod highgui;
mod hog;
mod yolo;

pub use camera::OpenCvCamera;
pub use highgui::HighGuiOverlay;
pub use hog::HogPersonDetector;
pub use yolo::YoloPoseDetector;

use crate::error::VisionError;
use crate::frame::Frame;
use bytes::Bytes;
use opencv::core::{Mat, Scalar, CV_8U, CV_8UC3};
use opencv::prelude::*;

/// Copy a BGR8 `Mat` into a frame
pub(crate) fn mat_to_frame(mat: &Mat, sequence: u64) -> Result<Frame, VisionError> {
    let (width, height) = (mat.cols(), mat.rows());
    if width <= 0 || height <= 0 {
        return Err(VisionError::Frame("Empty image".to_string()));
    }
    if mat.depth() != CV_8U || mat.channels() != 3 {
        return Err(VisionError::Frame(format!(
            "Expected 8-bit BGR image, got depth {} with {} channels",
            mat.depth(),
            mat.channels()
        )));
    }

    let data = if mat.is_continuous() {
        Bytes::copy_from_slice(mat.data_bytes()?)
    } else {
        let packed = mat.try_clone()?;
        Bytes::copy_from_slice(packed.data_bytes()?)
    };

    Ok(Frame::new(width as u32, height as u32, sequence, data))
}

/// Rebuild a `Mat` from a frame's pixels
pub(crate) fn frame_to_mat(frame: &Frame) -> Result<Mat, VisionError> {
    if !frame.has_pixels() {
        return Err(VisionError::Frame(format!(
            "Frame {} has {} bytes for {}x{}",
            frame.sequence,
            frame.data.len(),
            frame.width,
            frame.height
        )));
    }
    let mut mat = Mat::new_rows_cols_with_default(
        frame.height as i32,
        frame.width as i32,
        CV_8UC3,
        Scalar::all(0.0),
    )?;
    mat.data_bytes_mut()?.copy_from_slice(&frame.data);
    Ok(mat)
}
