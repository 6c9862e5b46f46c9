//! camtrack-eye: vision boundary of the tracker
//!
//! Frame acquisition and detection are external collaborators; this crate
//! defines their interfaces, picks the one observation the control loop
//! tracks, and hosts the passive debug overlay. OpenCV and ONNX Runtime
//! backed implementations live behind the `camera` feature.

pub mod error;
pub mod frame;
pub mod detection;
pub mod selector;
pub mod overlay;
pub mod pose;
#[cfg(feature = "camera")]
pub mod cv;

pub use error::VisionError;
pub use frame::{Frame, FrameSource};
pub use detection::{Detection, Detector, Keypoint};
pub use selector::ObservationSelector;
pub use overlay::{NoOverlay, Overlay};
pub use pose::{PoseDecoder, COCO_KEYPOINTS, POSE_INPUT_SIZE};
