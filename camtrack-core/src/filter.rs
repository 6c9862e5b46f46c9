//! Position filter: observed image position to smoothed pan/tilt target
//!
//! Per tick and per axis the filter normalizes the observation against the
//! frame center, shapes it, pushes it into a moving-average window and then
//! eases the last sent value a fraction of the way toward that average. The
//! fraction grows when the remaining distance is small.
//!
//! Clamping to the wire range is not done here; it happens at the encode
//! boundary so the filter state stays reproducible.

use crate::config::FilterConfig;
use crate::history::HistoryBuffer;
use crate::shaping::ShapingCurve;
use crate::types::{AnglePair, FrameSize, Observation};
use tracing::{debug, trace};

pub struct PositionFilter {
    config: FilterConfig,
    curve: ShapingCurve,
    pan_history: HistoryBuffer,
    tilt_history: HistoryBuffer,
    last_sent: AnglePair,
}

impl PositionFilter {
    pub fn new(config: FilterConfig) -> Self {
        let curve = if config.saturate_shaping {
            ShapingCurve::saturating(config.shaping_k)
        } else {
            ShapingCurve::new(config.shaping_k)
        };
        let pan_history = HistoryBuffer::new(config.window_size, 0.0);
        let tilt_history = HistoryBuffer::new(config.window_size, 0.0);
        Self {
            config,
            curve,
            pan_history,
            tilt_history,
            last_sent: AnglePair::default(),
        }
    }

    /// Feed one tick's observation.
    ///
    /// Returns the new pan/tilt target, or `None` when there was nothing to
    /// track. In the latter case the windows are re-seeded with the last sent
    /// values so tracking resumes from the held position.
    pub fn update(&mut self, observation: Option<&Observation>, frame: FrameSize) -> Option<AnglePair> {
        let normalized = observation.and_then(|obs| frame.normalize(obs));
        let Some((norm_x, norm_y)) = normalized else {
            self.hold();
            return None;
        };

        let target_pan = self.axis_sign(self.config.invert_pan) * self.curve.apply(norm_x) * self.config.pan_gain;
        let target_tilt = self.axis_sign(self.config.invert_tilt) * self.curve.apply(norm_y) * self.config.tilt_gain;

        self.pan_history.push(target_pan);
        self.tilt_history.push(target_tilt);

        let avg_pan = self.pan_history.mean();
        let avg_tilt = self.tilt_history.mean();

        let next = AnglePair::new(
            self.ease_toward(self.last_sent.pan, avg_pan),
            self.ease_toward(self.last_sent.tilt, avg_tilt),
        );

        trace!(
            "target=({:.3}, {:.3}) avg=({:.3}, {:.3}) next=({:.3}, {:.3})",
            target_pan, target_tilt, avg_pan, avg_tilt, next.pan, next.tilt
        );

        self.last_sent = next;
        Some(next)
    }

    /// Re-seed both windows with the last sent values
    pub fn hold(&mut self) {
        self.pan_history.refill(self.last_sent.pan);
        self.tilt_history.refill(self.last_sent.tilt);
    }

    /// One easing step from `last` toward `target`
    pub fn ease_toward(&self, last: f64, target: f64) -> f64 {
        let distance = target - last;
        last + distance * self.step_fraction(distance)
    }

    /// Step fraction for a given remaining distance
    pub fn step_fraction(&self, distance: f64) -> f64 {
        if distance.abs() < self.config.near_threshold_deg {
            self.config.near_step_fraction
        } else {
            self.config.step_fraction
        }
    }

    /// Restore the start-up state
    pub fn reset(&mut self) {
        self.last_sent = AnglePair::default();
        self.hold();
        debug!("Position filter reset");
    }

    pub fn last_sent(&self) -> AnglePair {
        self.last_sent
    }

    /// Current moving averages (pan, tilt)
    pub fn averages(&self) -> (f64, f64) {
        (self.pan_history.mean(), self.tilt_history.mean())
    }

    pub fn window_size(&self) -> usize {
        self.pan_history.capacity()
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn axis_sign(&self, inverted: bool) -> f64 {
        if inverted {
            -1.0
        } else {
            1.0
        }
    }
}

impl Default for PositionFilter {
    fn default() -> Self {
        Self::new(FilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: FrameSize = FrameSize {
        width: 640,
        height: 480,
    };

    fn linear_config(window_size: usize, pan_gain: f64) -> FilterConfig {
        FilterConfig {
            window_size,
            shaping_k: 0.0,
            pan_gain,
            tilt_gain: pan_gain,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_step_easing_far() {
        let filter = PositionFilter::default();
        assert_eq!(filter.step_fraction(10.0), 0.25);
        assert_eq!(filter.ease_toward(0.0, 10.0), 2.5);
    }

    #[test]
    fn test_step_easing_near() {
        let filter = PositionFilter::default();
        assert_eq!(filter.step_fraction(2.0), 0.35);
        assert!((filter.ease_toward(0.0, 2.0) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_step_easing_threshold_is_exclusive() {
        let filter = PositionFilter::default();
        assert_eq!(filter.step_fraction(3.0), 0.25);
        assert_eq!(filter.step_fraction(-2.999), 0.35);
    }

    #[test]
    fn test_update_step_through_window() {
        // Linear shaping, window 1: full right edge maps straight to a 10° average
        let mut filter = PositionFilter::new(linear_config(1, 10.0));
        let pair = filter
            .update(Some(&Observation::new(640.0, 240.0)), FRAME)
            .unwrap();
        assert_eq!(pair.pan, 2.5);
        assert_eq!(pair.tilt, 0.0);
        assert_eq!(filter.last_sent(), pair);
    }

    #[test]
    fn test_update_centered_subject_holds_zero() {
        let mut filter = PositionFilter::default();
        let pair = filter
            .update(Some(&Observation::new(320.0, 240.0)), FRAME)
            .unwrap();
        assert_eq!(pair, AnglePair::new(0.0, 0.0));
    }

    #[test]
    fn test_moving_average_includes_startup_zeros() {
        // Window 5 seeded with zeros: first average is a fifth of the target
        let mut filter = PositionFilter::new(linear_config(5, 50.0));
        filter.update(Some(&Observation::new(640.0, 240.0)), FRAME);
        let (avg_pan, _) = filter.averages();
        assert!((avg_pan - 10.0).abs() < 1e-12);
        assert!((filter.last_sent().pan - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_observation_returns_none_and_reseeds() {
        let mut filter = PositionFilter::new(linear_config(5, 40.0));
        for _ in 0..3 {
            filter.update(Some(&Observation::new(600.0, 100.0)), FRAME);
        }
        let held = filter.last_sent();
        assert!(filter.update(None, FRAME).is_none());
        assert_eq!(filter.averages(), (held.pan, held.tilt));
        assert_eq!(filter.last_sent(), held);
    }

    #[test]
    fn test_no_observation_after_window_leaves_no_bias() {
        let mut filter = PositionFilter::default();
        for i in 0..12 {
            filter.update(Some(&Observation::new(40.0 + i as f64 * 7.0, 400.0)), FRAME);
        }
        let window = filter.window_size();
        for _ in 0..window + 2 {
            assert!(filter.update(None, FRAME).is_none());
            let held = filter.last_sent();
            assert_eq!(filter.averages(), (held.pan, held.tilt));
        }
    }

    #[test]
    fn test_resume_after_hold_starts_from_held_position() {
        let mut filter = PositionFilter::new(linear_config(5, 40.0));
        for _ in 0..20 {
            filter.update(Some(&Observation::new(640.0, 240.0)), FRAME);
        }
        let held = filter.last_sent();
        filter.update(None, FRAME);

        // Subject reappears at the center: the average moves by one fifth only
        let pair = filter
            .update(Some(&Observation::new(320.0, 240.0)), FRAME)
            .unwrap();
        let (avg_pan, _) = filter.averages();
        assert!((avg_pan - held.pan * 4.0 / 5.0).abs() < 1e-9);
        assert!(pair.pan < held.pan);
        assert!(pair.pan > avg_pan);
    }

    #[test]
    fn test_degenerate_frame_is_treated_as_no_observation() {
        let mut filter = PositionFilter::default();
        let result = filter.update(Some(&Observation::new(10.0, 10.0)), FrameSize::new(0, 0));
        assert!(result.is_none());
    }

    #[test]
    fn test_invert_tilt_flips_sign() {
        let config = FilterConfig {
            invert_tilt: true,
            ..FilterConfig::default()
        };
        let mut inverted = PositionFilter::new(config);
        let mut plain = PositionFilter::default();
        let obs = Observation::new(320.0, 100.0);
        let a = plain.update(Some(&obs), FRAME).unwrap();
        let b = inverted.update(Some(&obs), FRAME).unwrap();
        assert!(a.tilt < 0.0);
        assert_eq!(a.tilt, -b.tilt);
        assert_eq!(a.pan, b.pan);
    }

    #[test]
    fn test_history_dependence() {
        let obs = Observation::new(500.0, 300.0);
        let mut fresh = PositionFilter::default();
        let mut warmed = PositionFilter::default();
        warmed.update(Some(&Observation::new(100.0, 100.0)), FRAME);
        let a = fresh.update(Some(&obs), FRAME).unwrap();
        let b = warmed.update(Some(&obs), FRAME).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_right_edge_target_follows_cubic() {
        // Window 1, full step: the sent value is the shaped target itself
        let config = FilterConfig {
            window_size: 1,
            step_fraction: 1.0,
            near_step_fraction: 1.0,
            ..FilterConfig::default()
        };
        let mut filter = PositionFilter::new(config);
        let pair = filter.update(Some(&Observation::new(640.0, 240.0)), FRAME).unwrap();
        assert!((pair.pan - 13.5).abs() < 1e-9);
        assert_eq!(pair.tilt, 0.0);
    }

    #[test]
    fn test_saturating_shaping_is_opt_in() {
        let config = FilterConfig {
            window_size: 1,
            step_fraction: 1.0,
            near_step_fraction: 1.0,
            saturate_shaping: true,
            ..FilterConfig::default()
        };
        let mut filter = PositionFilter::new(config);
        let pair = filter.update(Some(&Observation::new(640.0, 240.0)), FRAME).unwrap();
        let knee = ShapingCurve::saturating(0.7).knee();
        let peak = knee * (1.0 - 0.7 * knee * knee) * 45.0;
        assert!((pair.pan - peak).abs() < 1e-9);
        assert!(pair.pan > 13.5);
    }

    #[test]
    fn test_reset() {
        let mut filter = PositionFilter::default();
        filter.update(Some(&Observation::new(0.0, 0.0)), FRAME);
        assert_ne!(filter.last_sent(), AnglePair::default());
        filter.reset();
        assert_eq!(filter.last_sent(), AnglePair::default());
        assert_eq!(filter.averages(), (0.0, 0.0));
    }

    #[test]
    fn test_internal_value_may_exceed_wire_range() {
        let config = FilterConfig {
            shaping_k: 0.0,
            pan_gain: 400.0,
            window_size: 1,
            step_fraction: 1.0,
            ..FilterConfig::default()
        };
        let mut filter = PositionFilter::new(config);
        let pair = filter.update(Some(&Observation::new(640.0, 240.0)), FRAME).unwrap();
        assert_eq!(pair.pan, 400.0);
        assert_eq!(pair.clamped().pan, 90.0);
    }
}
