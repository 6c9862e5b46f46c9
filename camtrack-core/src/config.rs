//! Configuration for camtrack
//!
//! Every tuning value is settable from a config file (JSON, TOML or YAML),
//! from `CAMTRACK_*` environment variables, or from the command line.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Advertised service of the reference actuator node
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x4fafc201_1fb5_459e_8fcc_c5c9c331914b);
/// Position characteristic the pan/tilt payload is written to
pub const DEFAULT_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0xbeb5483e_36e1_4688_b7f5_ea07361b26a8);
/// Status characteristic the actuator node notifies on
pub const DEFAULT_STATUS_UUID: Uuid = Uuid::from_u128(0x5b818d26_7c11_4f24_b87f_4f8a8cc974eb);

/// Wireless link configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    /// Exact advertised device name to connect to
    pub device_name: String,
    /// Restrict discovery to devices advertising this service, e.g.
    /// [`DEFAULT_SERVICE_UUID`]; by default only the name is matched
    pub service_uuid: Option<Uuid>,
    /// Characteristic the command payload is written to
    pub characteristic_uuid: Uuid,
    /// Characteristic to subscribe to for status notifications
    pub status_uuid: Option<Uuid>,
    /// Fixed delay between connection attempts
    pub reconnect_backoff_secs: u64,
    /// Upper bound on a single discovery scan
    pub scan_timeout_secs: u64,
    /// Upper bound on a single payload write
    pub write_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: "CameraRobot".to_string(),
            service_uuid: None,
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            status_uuid: Some(DEFAULT_STATUS_UUID),
            reconnect_backoff_secs: 5,
            scan_timeout_secs: 5,
            write_timeout_ms: 2000,
        }
    }
}

impl LinkConfig {
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_secs(self.reconnect_backoff_secs)
    }

    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if self.device_name.trim().is_empty() {
            return Err("link.device_name must not be empty".to_string());
        }
        if self.characteristic_uuid.is_nil() {
            return Err("link.characteristic_uuid must not be nil".to_string());
        }
        if self.reconnect_backoff_secs == 0 {
            return Err("link.reconnect_backoff_secs must be greater than 0".to_string());
        }
        if self.scan_timeout_secs == 0 {
            return Err("link.scan_timeout_secs must be greater than 0".to_string());
        }
        if self.write_timeout_ms == 0 {
            return Err("link.write_timeout_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Position filter tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Moving-average window per axis
    pub window_size: usize,
    /// Cubic coefficient of the shaping curve
    pub shaping_k: f64,
    /// Hold the shaping curve at its peak past the turning point
    pub saturate_shaping: bool,
    /// Degrees of pan at full shaped deflection
    pub pan_gain: f64,
    /// Degrees of tilt at full shaped deflection
    pub tilt_gain: f64,
    /// Flip the pan direction
    pub invert_pan: bool,
    /// Flip the tilt direction (box-anchored setups historically used a negative tilt)
    pub invert_tilt: bool,
    /// Fraction of the remaining distance applied per tick
    pub step_fraction: f64,
    /// Fraction used when the remaining distance is below `near_threshold_deg`
    pub near_step_fraction: f64,
    /// Distance, in degrees, under which `near_step_fraction` applies
    pub near_threshold_deg: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            shaping_k: 0.7,
            saturate_shaping: false,
            pan_gain: 45.0,
            tilt_gain: 30.0,
            invert_pan: false,
            invert_tilt: false,
            step_fraction: 0.25,
            near_step_fraction: 0.35,
            near_threshold_deg: 3.0,
        }
    }
}

impl FilterConfig {
    fn validate(&self) -> Result<(), String> {
        if self.window_size == 0 || self.window_size > 1000 {
            return Err("filter.window_size must be between 1 and 1000".to_string());
        }
        if !self.shaping_k.is_finite() || self.shaping_k < 0.0 {
            return Err("filter.shaping_k must be a finite, non-negative number".to_string());
        }
        // Past k = 1 the plain cubic reverses sign before the frame edge
        if self.shaping_k > 1.0 && !self.saturate_shaping {
            return Err("filter.shaping_k above 1 requires filter.saturate_shaping".to_string());
        }
        if !self.pan_gain.is_finite() || !self.tilt_gain.is_finite() {
            return Err("filter gains must be finite".to_string());
        }
        for (name, fraction) in [
            ("filter.step_fraction", self.step_fraction),
            ("filter.near_step_fraction", self.near_step_fraction),
        ] {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(format!("{} must be in (0, 1]", name));
            }
        }
        if !self.near_threshold_deg.is_finite() || self.near_threshold_deg < 0.0 {
            return Err("filter.near_threshold_deg must be a finite, non-negative number".to_string());
        }
        Ok(())
    }
}

/// Control loop pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Target ticks per second
    pub tick_rate_hz: f64,
    /// How often the exit signal is polled between ticks
    pub exit_poll_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_rate_hz: 5.0,
            exit_poll_interval_ms: 10,
        }
    }
}

impl ControlConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    pub fn exit_poll_interval(&self) -> Duration {
        Duration::from_millis(self.exit_poll_interval_ms)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 || self.tick_rate_hz > 120.0 {
            return Err("control.tick_rate_hz must be in (0, 120]".to_string());
        }
        if self.exit_poll_interval_ms == 0 {
            return Err("control.exit_poll_interval_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Where on a detection the tracked anchor point sits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AnchorMode {
    /// Mean of the listed keypoint indices; all must be present
    Pose { landmarks: Vec<usize> },
    /// Center of the bounding box
    Box,
}

impl Default for AnchorMode {
    fn default() -> Self {
        // COCO keypoints 1 and 2: left and right eye
        AnchorMode::Pose {
            landmarks: vec![1, 2],
        }
    }
}

/// Observation selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Only detections of this class are tracked
    pub target_class: String,
    /// Minimum confidence (mean keypoint confidence in pose mode)
    pub confidence_threshold: f32,
    pub anchor: AnchorMode,
    /// YOLOv8-pose ONNX model; without one only box detection is available
    pub model_path: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            target_class: "person".to_string(),
            confidence_threshold: 0.5,
            anchor: AnchorMode::default(),
            model_path: None,
        }
    }
}

impl DetectionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.target_class.trim().is_empty() {
            return Err("detection.target_class must not be empty".to_string());
        }
        if !self.confidence_threshold.is_finite() || self.confidence_threshold < 0.0 {
            return Err("detection.confidence_threshold must be a finite, non-negative number".to_string());
        }
        if let AnchorMode::Pose { landmarks } = &self.anchor {
            if landmarks.is_empty() {
                return Err("detection.anchor.landmarks must not be empty".to_string());
            }
        }
        Ok(())
    }
}

/// Frame source and overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// USB camera device index
    pub camera_id: u32,
    /// Requested resolution (width, height)
    pub resolution: (u32, u32),
    /// Show the debug window
    pub overlay: bool,
    pub window_title: String,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            camera_id: 0,
            resolution: (640, 480),
            overlay: true,
            window_title: "camtrack".to_string(),
        }
    }
}

impl CameraConfig {
    fn validate(&self) -> Result<(), String> {
        if self.resolution.0 == 0 || self.resolution.1 == 0 {
            return Err("camera.resolution must be non-zero".to_string());
        }
        if self.resolution.0 > 7680 || self.resolution.1 > 4320 {
            return Err("camera.resolution too large (max 8K)".to_string());
        }
        if self.camera_id > 100 {
            return Err("camera.camera_id too large (max 100)".to_string());
        }
        Ok(())
    }
}

/// Complete tracker configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub link: LinkConfig,
    pub filter: FilterConfig,
    pub control: ControlConfig,
    pub detection: DetectionConfig,
    pub camera: CameraConfig,
}

impl TrackerConfig {
    /// Load configuration from a file, picking the format from its extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e))),
            Some("toml") => toml::from_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e))),
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
                .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e))),
            _ => content.parse(),
        }
    }

    /// Apply overrides from `CAMTRACK_*` environment variables
    pub fn apply_env(&mut self) -> Result<(), CoreError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("CAMTRACK_DEVICE_NAME") {
            self.link.device_name = name;
        }
        if let Some(uuid) = lookup("CAMTRACK_CHARACTERISTIC_UUID") {
            self.link.characteristic_uuid = parse_override("CAMTRACK_CHARACTERISTIC_UUID", &uuid)?;
        }
        if let Some(secs) = lookup("CAMTRACK_RECONNECT_BACKOFF_SECS") {
            self.link.reconnect_backoff_secs = parse_override("CAMTRACK_RECONNECT_BACKOFF_SECS", &secs)?;
        }
        if let Some(rate) = lookup("CAMTRACK_TICK_RATE_HZ") {
            self.control.tick_rate_hz = parse_override("CAMTRACK_TICK_RATE_HZ", &rate)?;
        }
        if let Some(window) = lookup("CAMTRACK_WINDOW_SIZE") {
            self.filter.window_size = parse_override("CAMTRACK_WINDOW_SIZE", &window)?;
        }
        if let Some(threshold) = lookup("CAMTRACK_CONFIDENCE_THRESHOLD") {
            self.detection.confidence_threshold =
                parse_override("CAMTRACK_CONFIDENCE_THRESHOLD", &threshold)?;
        }
        if let Some(camera) = lookup("CAMTRACK_CAMERA_ID") {
            self.camera.camera_id = parse_override("CAMTRACK_CAMERA_ID", &camera)?;
        }
        if let Some(model) = lookup("CAMTRACK_MODEL_PATH") {
            self.detection.model_path = Some(PathBuf::from(model));
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), CoreError> {
        self.link
            .validate()
            .and_then(|_| self.filter.validate())
            .and_then(|_| self.control.validate())
            .and_then(|_| self.detection.validate())
            .and_then(|_| self.camera.validate())
            .map_err(CoreError::Config)
    }
}

impl FromStr for TrackerConfig {
    type Err = CoreError;

    /// Parse configuration, trying JSON, then TOML, then YAML
    fn from_str(content: &str) -> Result<Self, Self::Err> {
        if let Ok(config) = serde_json::from_str::<TrackerConfig>(content) {
            return Ok(config);
        }

        let toml_err = match toml::from_str::<TrackerConfig>(content) {
            Ok(config) => return Ok(config),
            Err(e) => e,
        };

        if let Ok(config) = serde_yaml::from_str::<TrackerConfig>(content) {
            return Ok(config);
        }

        Err(CoreError::Config(format!(
            "Unrecognized configuration format: {}",
            toml_err
        )))
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T, CoreError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CoreError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}
