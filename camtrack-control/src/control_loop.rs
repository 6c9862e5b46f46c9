//! Control loop: frame -> detector -> filter -> encoder -> link
//!
//! Ticks run at most once per tick interval, measured from the start of the
//! previous tick. Between ticks the loop sleeps in short slices and checks
//! for a user exit. While the link is down a tick does nothing but
//! reconnect; that wait ends early on the shutdown signal or when the
//! overlay, still polled every exit-poll interval, asks to exit.

use crate::shutdown::ShutdownSignal;
use camtrack_core::{encode_command, AnglePair, Clock, ControlConfig, PositionFilter, TrackerConfig};
use camtrack_eye::{Detector, FrameSource, ObservationSelector, Overlay};
use camtrack_link::{LinkManager, LinkStats};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Clamped pair written to the link
    Sent(AnglePair),
    /// Nothing to track; position held, nothing sent
    Held,
    /// No frame this tick
    NoFrame,
    /// Write failed; the link will reconnect next tick
    SendFailed,
    /// Shutdown arrived while waiting for the link
    Shutdown,
    /// Overlay asked to exit while waiting for the link
    UserExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Exit key in the overlay
    UserExit,
    /// Shutdown signal (Ctrl-C)
    Shutdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames: u64,
    pub frames_missed: u64,
    /// Ticks where a qualifying detection was selected
    pub observations: u64,
    pub detector_errors: u64,
    pub holds: u64,
    pub commands_sent: u64,
    pub send_failures: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reason: ExitReason,
    pub stats: LoopStats,
    pub link: LinkStats,
    pub last_sent: AnglePair,
}

pub struct ControlLoop {
    config: ControlConfig,
    source: Box<dyn FrameSource>,
    detector: Box<dyn Detector>,
    selector: ObservationSelector,
    filter: PositionFilter,
    link: LinkManager,
    overlay: Box<dyn Overlay>,
    clock: Arc<dyn Clock>,
    shutdown: ShutdownSignal,
    stats: LoopStats,
}

impl ControlLoop {
    pub fn new(
        config: &TrackerConfig,
        source: Box<dyn FrameSource>,
        detector: Box<dyn Detector>,
        link: LinkManager,
        overlay: Box<dyn Overlay>,
        clock: Arc<dyn Clock>,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            config: config.control.clone(),
            source,
            detector,
            selector: ObservationSelector::new(config.detection.clone()),
            filter: PositionFilter::new(config.filter.clone()),
            link,
            overlay,
            clock,
            shutdown,
            stats: LoopStats::default(),
        }
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn link(&self) -> &LinkManager {
        &self.link
    }

    pub fn filter(&self) -> &PositionFilter {
        &self.filter
    }

    /// Run one tick
    pub async fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        if !self.link.check_liveness().await {
            let shutdown = self.shutdown.clone();
            let clock = self.clock.clone();
            let poll = self.config.exit_poll_interval();
            let overlay = &mut self.overlay;
            let exit_key = async {
                loop {
                    clock.sleep(poll).await;
                    if overlay.exit_requested() {
                        break;
                    }
                }
            };
            tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    info!("Shutdown requested while connecting");
                    return TickOutcome::Shutdown;
                }
                _ = self.link.connect() => {}
                _ = exit_key => {
                    info!("Exit requested while connecting");
                    return TickOutcome::UserExit;
                }
            }
        }

        let frame = match self.source.acquire() {
            Ok(frame) => frame,
            Err(e) => {
                debug!("Skipping tick: {}", e);
                self.stats.frames_missed += 1;
                return TickOutcome::NoFrame;
            }
        };
        self.stats.frames += 1;

        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(e) => {
                warn!("{} failed on frame {}: {}", self.detector.name(), frame.sequence, e);
                self.stats.detector_errors += 1;
                Vec::new()
            }
        };

        let observation = self.selector.select(&detections);
        if observation.is_some() {
            self.stats.observations += 1;
        }
        let outcome = match self.filter.update(observation.as_ref(), frame.size()) {
            None => {
                self.stats.holds += 1;
                TickOutcome::Held
            }
            Some(target) => {
                let command = target.clamped();
                match self.link.send(&encode_command(command)).await {
                    Ok(()) => {
                        self.stats.commands_sent += 1;
                        TickOutcome::Sent(command)
                    }
                    Err(_) => {
                        // The link manager already logged and dropped the session
                        self.stats.send_failures += 1;
                        TickOutcome::SendFailed
                    }
                }
            }
        };

        self.overlay.render(&frame, &detections);
        outcome
    }

    /// Tick until the user exits, then release the camera and close the link
    pub async fn run(mut self) -> RunSummary {
        let interval = self.config.tick_interval();
        let poll = self.config.exit_poll_interval();
        info!("Control loop running every {:?}", interval);

        let mut last_tick: Option<Instant> = None;
        let reason = loop {
            if self.shutdown.is_triggered() {
                break ExitReason::Shutdown;
            }
            if self.overlay.exit_requested() {
                break ExitReason::UserExit;
            }

            let now = self.clock.now();
            let due = last_tick.map_or(true, |started| now.duration_since(started) >= interval);
            if due {
                last_tick = Some(now);
                match self.tick().await {
                    TickOutcome::Shutdown => break ExitReason::Shutdown,
                    TickOutcome::UserExit => break ExitReason::UserExit,
                    _ => continue,
                }
            }

            self.clock.sleep(poll).await;
        };

        info!("Stopping control loop ({:?})", reason);
        self.source.release();
        self.link.disconnect().await;

        RunSummary {
            reason,
            stats: self.stats,
            link: self.link.stats().clone(),
            last_sent: self.filter.last_sent(),
        }
    }
}
