//! Nonlinear response curve applied to normalized offsets
//!
//! The curve is `f(x) = x * (1 - k*x²)`: steep near the center, compressed
//! toward the edges. For `k > 1/3` the cubic turns over before `|x| = 1`
//! (at `x* = 1/sqrt(3k)`) and, for `k > 1`, changes sign at the edges.
//! [`ShapingCurve::saturating`] holds the output at its peak past `x*`.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapingCurve {
    k: f64,
    knee: f64,
    peak: f64,
    saturate: bool,
}

impl ShapingCurve {
    /// Plain cubic
    pub fn new(k: f64) -> Self {
        let knee = if k > 0.0 {
            1.0 / (3.0 * k).sqrt()
        } else {
            f64::INFINITY
        };
        let peak = if knee.is_finite() {
            knee * (1.0 - k * knee * knee)
        } else {
            f64::INFINITY
        };
        Self {
            k,
            knee,
            peak,
            saturate: false,
        }
    }

    /// Cubic held flat beyond its turning point
    pub fn saturating(k: f64) -> Self {
        Self {
            saturate: true,
            ..Self::new(k)
        }
    }

    pub fn k(&self) -> f64 {
        self.k
    }

    /// Turning point of the cubic, infinite for `k <= 0`
    pub fn knee(&self) -> f64 {
        self.knee
    }

    pub fn is_saturating(&self) -> bool {
        self.saturate
    }

    /// Shaped response for a normalized offset
    pub fn apply(&self, x: f64) -> f64 {
        if !self.saturate {
            return x * (1.0 - self.k * x * x);
        }
        let x = x.clamp(-self.knee, self.knee);
        (x * (1.0 - self.k * x * x)).clamp(-self.peak, self.peak)
    }
}

impl Default for ShapingCurve {
    fn default() -> Self {
        Self::new(0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_default_curve_is_plain_cubic() {
        let curve = ShapingCurve::default();
        for x in [-1.0, -0.5, 0.0, 0.25, 0.9, 1.0] {
            let expected = x * (1.0 - 0.7 * x * x);
            assert!((curve.apply(x) - expected).abs() < 1e-12);
        }
        assert!((curve.apply(1.0) - 0.3).abs() < 1e-12);
        assert!((curve.apply(-1.0) + 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_default_curve_is_odd() {
        let curve = ShapingCurve::default();
        assert_eq!(curve.apply(0.0), 0.0);
        for x in [0.1, 0.5, 0.8] {
            assert!((curve.apply(-x) + curve.apply(x)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_saturating_curve_holds_peak_past_knee() {
        let curve = ShapingCurve::saturating(0.7);
        let peak = curve.apply(curve.knee());
        assert!(curve.knee() < 1.0);
        assert_eq!(curve.apply(1.0), peak);
        assert_eq!(curve.apply(-1.0), -peak);
        assert!(peak > ShapingCurve::new(0.7).apply(1.0));
    }

    #[test]
    fn test_saturating_matches_cubic_inside_knee() {
        let plain = ShapingCurve::new(0.7);
        let saturating = ShapingCurve::saturating(0.7);
        for x in [-0.6, -0.2, 0.0, 0.3, 0.65] {
            assert!((plain.apply(x) - saturating.apply(x)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_zero_k_is_identity() {
        let curve = ShapingCurve::new(0.0);
        assert_eq!(curve.apply(0.42), 0.42);
        assert_eq!(curve.apply(-1.0), -1.0);
        assert!(curve.knee().is_infinite());
    }

    #[test]
    fn test_default_curve_monotonic_up_to_knee() {
        let curve = ShapingCurve::default();
        let knee = curve.knee();
        let steps = 2000;
        let mut previous = curve.apply(-knee);
        for i in 1..=steps {
            let x = -knee + 2.0 * knee * i as f64 / steps as f64;
            let y = curve.apply(x);
            assert!(y >= previous - 1e-12, "f({}) = {} < {}", x, y, previous);
            previous = y;
        }
    }

    #[test]
    fn test_default_curve_keeps_sign_on_unit_interval() {
        let curve = ShapingCurve::default();
        for i in 0..=2000 {
            let x = -1.0 + i as f64 * 0.001;
            assert!(curve.apply(x) * x >= 0.0, "sign flipped at {}", x);
        }
    }

    proptest! {
        #[test]
        fn test_no_sign_reversal_up_to_unit_k(k in 0.0f64..=1.0, x in -1.0f64..=1.0) {
            let y = ShapingCurve::new(k).apply(x);
            prop_assert!(y * x >= 0.0);
        }

        #[test]
        fn test_monotonic_inside_knee(k in 0.0f64..3.0, a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
            let curve = ShapingCurve::new(k);
            let knee = curve.knee().min(1.0);
            let (lo, hi) = if a <= b { (a * knee, b * knee) } else { (b * knee, a * knee) };
            prop_assert!(curve.apply(lo) <= curve.apply(hi) + 1e-12);
        }

        #[test]
        fn test_saturating_monotonic_for_any_k(k in 0.0f64..3.0, a in -1.0f64..=1.0, b in -1.0f64..=1.0) {
            let curve = ShapingCurve::saturating(k);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(curve.apply(lo) <= curve.apply(hi) + 1e-12);
            prop_assert!(curve.apply(hi) * hi >= 0.0);
        }
    }
}
