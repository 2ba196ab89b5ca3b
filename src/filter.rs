// src/filter.rs - One-euro filtering for landmark streams
//
// Adaptive low-pass filter: the cutoff frequency rises with signal speed, so
// the output stays smooth while a landmark is near-static and tracks closely
// during fast gestures. Reference: https://cristal.univ-lille.fr/~casiez/1euro/

use std::collections::HashMap;
use std::f64::consts::PI;

use nalgebra::Vector3;

use crate::config::FilterConfig;
use crate::input::{Landmark, PoseFrame};

/// First-order low-pass filter component.
struct LowPassFilter {
    y: Option<f64>,
}

impl LowPassFilter {
    fn new() -> Self {
        Self { y: None }
    }

    fn filter(&mut self, value: f64, alpha: f64) -> f64 {
        let result = match self.y {
            Some(prev) => alpha * value + (1.0 - alpha) * prev,
            None => value,
        };
        self.y = Some(result);
        result
    }

    fn last(&self) -> Option<f64> {
        self.y
    }

    fn reset(&mut self) {
        self.y = None;
    }
}

/// alpha = 1 / (1 + tau/dt), tau = 1/(2*pi*cutoff)
fn smoothing_factor(dt: f64, cutoff: f64) -> f64 {
    let r = 2.0 * PI * cutoff * dt;
    r / (r + 1.0)
}

/// One-euro filter for a single scalar signal, driven by frame timestamps in
/// milliseconds.
pub struct OneEuroFilter {
    min_cutoff: f64,
    beta: f64,
    d_cutoff: f64,
    x_filter: LowPassFilter,
    dx_filter: LowPassFilter,
    last_time_ms: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(min_cutoff: f64, beta: f64, d_cutoff: f64) -> Self {
        Self {
            min_cutoff,
            beta,
            d_cutoff,
            x_filter: LowPassFilter::new(),
            dx_filter: LowPassFilter::new(),
            last_time_ms: None,
        }
    }

    pub fn from_config(config: &FilterConfig) -> Self {
        Self::new(config.min_cutoff, config.beta, config.d_cutoff)
    }

    /// Filter one sample. The first observation seeds the filter and passes
    /// through unchanged; a non-advancing timestamp falls back to dt = 1 s.
    pub fn filter(&mut self, value: f64, timestamp_ms: f64) -> f64 {
        let mut dt = 1.0;
        if let Some(last) = self.last_time_ms {
            if timestamp_ms > last {
                dt = (timestamp_ms - last) / 1000.0;
            }
        }
        self.last_time_ms = Some(timestamp_ms);

        let dx = match self.x_filter.last() {
            Some(prev) => (value - prev) / dt,
            None => 0.0,
        };
        let edx = self.dx_filter.filter(dx, smoothing_factor(dt, self.d_cutoff));

        let cutoff = self.min_cutoff + self.beta * edx.abs();
        self.x_filter.filter(value, smoothing_factor(dt, cutoff))
    }

    pub fn reset(&mut self) {
        self.x_filter.reset();
        self.dx_filter.reset();
        self.last_time_ms = None;
    }
}

/// One-euro filter for a 3D point, one scalar filter per axis.
pub struct OneEuroFilter3d {
    x: OneEuroFilter,
    y: OneEuroFilter,
    z: OneEuroFilter,
}

impl OneEuroFilter3d {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            x: OneEuroFilter::from_config(config),
            y: OneEuroFilter::from_config(config),
            z: OneEuroFilter::from_config(config),
        }
    }

    pub fn filter(&mut self, point: Vector3<f64>, timestamp_ms: f64) -> Vector3<f64> {
        Vector3::new(
            self.x.filter(point.x, timestamp_ms),
            self.y.filter(point.y, timestamp_ms),
            self.z.filter(point.z, timestamp_ms),
        )
    }

    pub fn reset(&mut self) {
        self.x.reset();
        self.y.reset();
        self.z.reset();
    }
}

/// One filter triple per landmark index, created lazily so each tracked point
/// is smoothed independently and consistently across frames.
pub struct LandmarkFilterBank {
    config: FilterConfig,
    filters: HashMap<usize, OneEuroFilter3d>,
}

impl LandmarkFilterBank {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            filters: HashMap::new(),
        }
    }

    pub fn filter_landmark(
        &mut self,
        index: usize,
        point: Vector3<f64>,
        timestamp_ms: f64,
    ) -> Vector3<f64> {
        let filter = self
            .filters
            .entry(index)
            .or_insert_with(|| OneEuroFilter3d::from_config(&self.config));
        filter.filter(point, timestamp_ms)
    }

    /// Smooth a whole pose frame, preserving per-landmark visibility scores.
    pub fn smooth_pose(&mut self, frame: &PoseFrame, timestamp_ms: f64) -> PoseFrame {
        let smoothed = frame
            .landmarks()
            .iter()
            .enumerate()
            .map(|(index, lm)| {
                let p = self.filter_landmark(index, lm.point(), timestamp_ms);
                Landmark {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    visibility: lm.visibility,
                }
            })
            .collect();
        PoseFrame::from_smoothed(smoothed)
    }

    /// Drop all filter state. Stale velocity estimates from a torn-down
    /// tracking session are invalid input for a future one.
    pub fn reset(&mut self) {
        self.filters.clear();
    }

    pub fn tracked_count(&self) -> usize {
        self.filters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn filter_with(beta: f64) -> OneEuroFilter {
        OneEuroFilter::new(1.0, beta, 1.0)
    }

    #[test]
    fn test_first_observation_passes_through() {
        let mut f = filter_with(0.007);
        assert_eq!(f.filter(0.42, 0.0), 0.42);
    }

    #[test]
    fn test_static_input_stays_stable() {
        // A constant signal must converge to itself with no oscillation.
        let mut f = filter_with(0.007);
        for i in 0..120 {
            let out = f.filter(0.5, i as f64 * 33.0);
            assert_relative_eq!(out, 0.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_step_converges_monotonically() {
        let mut f = filter_with(0.007);
        f.filter(0.0, 0.0);

        let mut prev_err = f64::INFINITY;
        for i in 1..60 {
            let out = f.filter(1.0, i as f64 * 33.0);
            let err = (1.0 - out).abs();
            assert!(err < prev_err, "error grew at sample {}: {} >= {}", i, err, prev_err);
            prev_err = err;
        }
        assert!(prev_err < 1e-3);
    }

    #[test]
    fn test_higher_beta_is_more_responsive() {
        // The adaptive cutoff, not just the smoothing, is the property under
        // test: a faster-moving signal must be tracked more closely when beta
        // is larger.
        let mut slow = filter_with(0.0);
        let mut fast = filter_with(1.0);

        slow.filter(0.0, 0.0);
        fast.filter(0.0, 0.0);

        let r_slow = slow.filter(10.0, 33.0);
        let r_fast = fast.filter(10.0, 33.0);
        assert!(
            r_fast > r_slow,
            "high beta ({}) should lag less than low beta ({})",
            r_fast,
            r_slow
        );
    }

    #[test]
    fn test_non_advancing_timestamp_uses_fallback_dt() {
        let mut f = filter_with(0.007);
        f.filter(0.0, 100.0);
        // Same timestamp again: the sample is still blended, with dt = 1 s.
        let out = f.filter(1.0, 100.0);
        assert!(out > 0.0 && out < 1.0);
    }

    #[test]
    fn test_reset_reseeds() {
        let mut f = filter_with(0.007);
        f.filter(0.0, 0.0);
        f.filter(0.0, 33.0);
        f.reset();
        assert_eq!(f.filter(7.0, 66.0), 7.0);
    }

    #[test]
    fn test_bank_filters_indices_independently() {
        let mut bank = LandmarkFilterBank::new(FilterConfig::default());
        let a = bank.filter_landmark(28, Vector3::new(0.4, 0.9, 0.0), 0.0);
        let b = bank.filter_landmark(27, Vector3::new(0.6, 0.9, 0.0), 0.0);
        assert_relative_eq!(a.x, 0.4);
        assert_relative_eq!(b.x, 0.6);
        assert_eq!(bank.tracked_count(), 2);

        bank.reset();
        assert_eq!(bank.tracked_count(), 0);
    }

    #[test]
    fn test_smooth_pose_keeps_visibility() {
        let mut bank = LandmarkFilterBank::new(FilterConfig::default());
        let landmarks = vec![Landmark::with_visibility(0.5, 0.5, 0.0, 0.8); 33];
        let frame = PoseFrame::new(landmarks).unwrap();
        let smoothed = bank.smooth_pose(&frame, 0.0);
        assert_eq!(smoothed.get(0).visibility, Some(0.8));
        assert_relative_eq!(smoothed.get(0).x, 0.5);
    }
}
