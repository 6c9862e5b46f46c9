//! Error types for camtrack-eye

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Detector error: {0}")]
    Detector(String),

    #[error("Overlay error: {0}")]
    Overlay(String),

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Model error: {0}")]
    Model(String),

    #[cfg(feature = "camera")]
    #[error("OpenCV error: {0}")]
    OpenCv(String),
}

#[cfg(feature = "camera")]
impl From<opencv::Error> for VisionError {
    fn from(err: opencv::Error) -> Self {
        VisionError::OpenCv(err.message)
    }
}
