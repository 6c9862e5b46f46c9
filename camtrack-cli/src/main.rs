// camtrack command line
// Follows a person with a pan/tilt head driven over Bluetooth LE

use anyhow::Context;
use camtrack_control::{shutdown_channel, ControlLoop, RunSummary};
use camtrack_core::{AnchorMode, Clock, TokioClock, TrackerConfig};
use camtrack_eye::{Detector, FrameSource, Overlay};
use camtrack_link::{LinkManager, LogTransport, Transport};
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "camtrack")]
#[command(about = "Track a person with a camera and steer a pan/tilt head over BLE", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Advertised name of the actuator node
    #[arg(long)]
    device_name: Option<String>,

    /// Control loop rate in Hz
    #[arg(long)]
    tick_rate: Option<f64>,

    /// Camera device index
    #[arg(long)]
    camera_id: Option<u32>,

    /// Moving-average window length
    #[arg(long)]
    window_size: Option<usize>,

    /// Detection confidence threshold
    #[arg(long)]
    confidence: Option<f32>,

    /// Anchor point taken from each detection
    #[arg(long, value_enum)]
    anchor: Option<AnchorArg>,

    /// YOLOv8-pose ONNX model used for detection
    #[arg(long)]
    model: Option<PathBuf>,

    /// Flip the tilt direction
    #[arg(long)]
    invert_tilt: bool,

    /// Log payloads instead of opening a Bluetooth session
    #[arg(long)]
    dry_run: bool,

    /// Do not open the debug window
    #[arg(long)]
    no_overlay: bool,

    /// Log filter (error, warn, info, debug, trace or a RUST_LOG directive)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum AnchorArg {
    /// Midpoint of the eyes
    Pose,
    /// Centre of the bounding box
    Box,
}

type Vision = (Box<dyn FrameSource>, Box<dyn Detector>, Box<dyn Overlay>);

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref(), cli.json_logs);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            return Err(e);
        }
    };

    let summary = run(&cli, config).await?;
    info!(
        "Stopped ({:?}): {} ticks, {} frames ({} missed), {} observations, {} commands sent, {} send failures, {} sessions",
        summary.reason,
        summary.stats.ticks,
        summary.stats.frames,
        summary.stats.frames_missed,
        summary.stats.observations,
        summary.stats.commands_sent,
        summary.stats.send_failures,
        summary.link.sessions_established
    );
    Ok(())
}

fn init_tracing(level: Option<&str>, json: bool) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// File (explicit or default location), then environment, then flags
fn load_config(cli: &Cli) -> anyhow::Result<TrackerConfig> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TrackerConfig::from_file(&path).with_context(|| format!("reading {}", path.display()))?
        }
        None => TrackerConfig::default(),
    };

    config.apply_env()?;
    apply_cli(cli, &mut config);
    config.validate()?;
    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("camtrack");
    ["config.toml", "config.yaml", "config.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| Path::exists(path))
}

/// Configured pose model, else the stock one if it was installed
#[cfg_attr(not(feature = "camera"), allow(dead_code))]
fn pose_model_path(config: &TrackerConfig) -> Option<PathBuf> {
    config.detection.model_path.clone().or_else(|| {
        let path = dirs::data_dir()?.join("camtrack").join("yolov8n-pose.onnx");
        path.exists().then_some(path)
    })
}

fn apply_cli(cli: &Cli, config: &mut TrackerConfig) {
    if let Some(name) = &cli.device_name {
        config.link.device_name = name.clone();
    }
    if let Some(rate) = cli.tick_rate {
        config.control.tick_rate_hz = rate;
    }
    if let Some(camera_id) = cli.camera_id {
        config.camera.camera_id = camera_id;
    }
    if let Some(window) = cli.window_size {
        config.filter.window_size = window;
    }
    if let Some(confidence) = cli.confidence {
        config.detection.confidence_threshold = confidence;
    }
    if let Some(model) = &cli.model {
        config.detection.model_path = Some(model.clone());
    }
    match cli.anchor {
        Some(AnchorArg::Box) => config.detection.anchor = AnchorMode::Box,
        Some(AnchorArg::Pose) if !matches!(config.detection.anchor, AnchorMode::Pose { .. }) => {
            config.detection.anchor = AnchorMode::default();
        }
        _ => {}
    }
    if cli.invert_tilt {
        config.filter.invert_tilt = true;
    }
    if cli.no_overlay {
        config.camera.overlay = false;
    }
}

async fn run(cli: &Cli, mut config: TrackerConfig) -> anyhow::Result<RunSummary> {
    let (trigger, signal) = shutdown_channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                trigger.trigger();
            }
            Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
        }
    });

    let (source, detector, overlay) = build_vision(&mut config)?;
    let transport = build_transport(cli.dry_run, &config)?;

    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let link = LinkManager::new(config.link.clone(), transport, clock.clone());
    let control = ControlLoop::new(&config, source, detector, link, overlay, clock, signal);

    info!("Tracking '{}' for device '{}'", config.detection.target_class, config.link.device_name);
    Ok(control.run().await)
}

fn build_transport(dry_run: bool, config: &TrackerConfig) -> anyhow::Result<Box<dyn Transport>> {
    if dry_run {
        info!("Dry run: payloads are logged, not sent");
        return Ok(Box::new(LogTransport::new()));
    }

    #[cfg(feature = "ble")]
    {
        Ok(Box::new(camtrack_link::BleTransport::new(config.link.clone())))
    }
    #[cfg(not(feature = "ble"))]
    {
        let _ = config;
        anyhow::bail!("camtrack was built without the `ble` feature; pass --dry-run")
    }
}

#[cfg(feature = "camera")]
fn build_vision(config: &mut TrackerConfig) -> anyhow::Result<Vision> {
    use camtrack_eye::cv::{HighGuiOverlay, HogPersonDetector, OpenCvCamera, YoloPoseDetector};
    use camtrack_eye::NoOverlay;

    let detector: Box<dyn Detector> = match pose_model_path(config) {
        Some(path) => Box::new(
            YoloPoseDetector::load(&path).with_context(|| format!("loading pose model {}", path.display()))?,
        ),
        None => {
            if matches!(config.detection.anchor, AnchorMode::Pose { .. }) {
                warn!("No pose model configured (--model or CAMTRACK_MODEL_PATH); using HOG boxes");
                config.detection.anchor = AnchorMode::Box;
            }
            Box::new(HogPersonDetector::new().context("loading person detector")?)
        }
    };
    info!("Detector: {}", detector.name());

    let source: Box<dyn FrameSource> =
        Box::new(OpenCvCamera::open(config.camera.clone()).context("opening camera")?);
    let overlay: Box<dyn Overlay> = if config.camera.overlay {
        Box::new(HighGuiOverlay::new(config.camera.window_title.clone()).context("opening debug window")?)
    } else {
        Box::new(NoOverlay)
    };

    Ok((source, detector, overlay))
}

#[cfg(not(feature = "camera"))]
fn build_vision(_config: &mut TrackerConfig) -> anyhow::Result<Vision> {
    anyhow::bail!("camtrack was built without the `camera` feature; no frame source available")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("camtrack").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = parse(&[
            "--device-name",
            "Gimbal",
            "--tick-rate",
            "10",
            "--anchor",
            "box",
            "--invert-tilt",
            "--no-overlay",
        ]);
        let mut config = TrackerConfig::default();
        apply_cli(&cli, &mut config);

        assert_eq!(config.link.device_name, "Gimbal");
        assert_eq!(config.control.tick_rate_hz, 10.0);
        assert_eq!(config.detection.anchor, AnchorMode::Box);
        assert!(config.filter.invert_tilt);
        assert!(!config.camera.overlay);
    }

    #[test]
    fn test_pose_flag_keeps_configured_landmarks() {
        let cli = parse(&["--anchor", "pose"]);
        let mut config = TrackerConfig::default();
        config.detection.anchor = AnchorMode::Pose { landmarks: vec![0] };
        apply_cli(&cli, &mut config);
        assert_eq!(config.detection.anchor, AnchorMode::Pose { landmarks: vec![0] });
    }

    #[test]
    fn test_no_flags_leave_defaults() {
        let cli = parse(&[]);
        let mut config = TrackerConfig::default();
        apply_cli(&cli, &mut config);
        assert_eq!(config.link.device_name, TrackerConfig::default().link.device_name);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_load_config_from_file_and_flags() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[link]\ndevice_name = \"FromFile\"\n\n[filter]\nwindow_size = 8").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cli = parse(&["--config", &path, "--window-size", "3"]);
        let config = load_config(&cli).unwrap();

        assert_eq!(config.filter.window_size, 3);
        if std::env::var("CAMTRACK_DEVICE_NAME").is_err() {
            assert_eq!(config.link.device_name, "FromFile");
        }
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = parse(&["--window-size", "0", "--config", "/nonexistent/camtrack.toml"]);
        assert!(load_config(&cli).is_err());

        let mut config = TrackerConfig::default();
        apply_cli(&parse(&["--window-size", "0"]), &mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_flag_selects_pose_model() {
        let cli = parse(&["--model", "/models/pose.onnx"]);
        let mut config = TrackerConfig::default();
        apply_cli(&cli, &mut config);
        assert_eq!(config.detection.model_path, Some(PathBuf::from("/models/pose.onnx")));
        assert_eq!(pose_model_path(&config), Some(PathBuf::from("/models/pose.onnx")));
    }

    #[test]
    fn test_dry_run_transport() {
        let transport = build_transport(true, &TrackerConfig::default()).unwrap();
        assert_eq!(transport.kind(), camtrack_link::TransportKind::Log);
    }
}
