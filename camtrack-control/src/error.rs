//! Error types for camtrack-control

use camtrack_core::CoreError;
use camtrack_eye::VisionError;
use camtrack_link::LinkError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}
