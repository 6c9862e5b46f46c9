//! camtrack-core: control primitives for the camtrack pan/tilt tracker
//!
//! Provides:
//! - Position filter (normalization, shaping, moving average, adaptive easing)
//! - Command encoding for the actuator wire format
//! - Tracker configuration with JSON/TOML/YAML loading
//! - Injectable clock for pacing and backoff

pub mod error;
pub mod types;
pub mod history;
pub mod shaping;
pub mod filter;
pub mod codec;
pub mod clock;
pub mod config;

pub use error::CoreError;
pub use types::{AnglePair, FrameSize, Observation, ANGLE_LIMIT};
pub use history::HistoryBuffer;
pub use shaping::ShapingCurve;
pub use filter::PositionFilter;
pub use codec::{decode_command, encode_command};
pub use clock::{Clock, SimulatedClock, TokioClock};
pub use config::{
    AnchorMode, CameraConfig, ControlConfig, DetectionConfig, FilterConfig, LinkConfig,
    TrackerConfig,
};
