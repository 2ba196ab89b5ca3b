// src/config.rs - Centralized recognition thresholds
//
// Every tuning constant the recognizers consume lives here, with units, so a
// host application can override them from TOML without touching the logic.

use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default)]
    pub pedals: PedalConfig,
    #[serde(default)]
    pub steering: SteeringConfig,
    #[serde(default)]
    pub gaze: GazeConfig,
}

impl RecognitionConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: RecognitionConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

/// One-euro filter parameters. Beta is small because landmark coordinates are
/// normalized to [0, 1], so raw velocities are tiny.
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    /// Baseline cutoff frequency in Hz; lower means smoother at rest.
    #[serde(default = "default_min_cutoff")]
    pub min_cutoff: f64,
    /// Speed coefficient; higher means less lag during fast motion.
    #[serde(default = "default_beta")]
    pub beta: f64,
    /// Cutoff frequency applied to the derivative estimate itself, in Hz.
    #[serde(default = "default_d_cutoff")]
    pub d_cutoff: f64,
}

fn default_min_cutoff() -> f64 {
    1.0
}
fn default_beta() -> f64 {
    0.007
}
fn default_d_cutoff() -> f64 {
    1.0
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_cutoff: default_min_cutoff(),
            beta: default_beta(),
            d_cutoff: default_d_cutoff(),
        }
    }
}

/// Stability gate for the neutral-foot snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct CalibrationConfig {
    /// How long the ankle must hold still before calibration locks (ms).
    #[serde(default = "default_stability_duration_ms")]
    pub stability_duration_ms: f64,
    /// Ankle drift that restarts the gate (normalized landmark units).
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,
    /// Minimum visibility for the right-leg landmarks a snapshot relies on.
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f64,
}

fn default_stability_duration_ms() -> f64 {
    3000.0
}
fn default_stability_threshold() -> f64 {
    0.1
}
fn default_min_visibility() -> f64 {
    0.5
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            stability_duration_ms: default_stability_duration_ms(),
            stability_threshold: default_stability_threshold(),
            min_visibility: default_min_visibility(),
        }
    }
}

/// Pedal recognizer thresholds. Distances are in normalized landmark units,
/// angles in radians, durations in milliseconds.
#[derive(Debug, Clone, Deserialize)]
pub struct PedalConfig {
    /// Radius around the calibrated ankle that counts as the brake/neutral
    /// position while the accelerator is not engaged.
    #[serde(default = "default_neutral_radius")]
    pub neutral_radius: f64,
    /// Tighter radius used while the accelerator is engaged; the foot must
    /// come firmly back to neutral before the engagement releases.
    #[serde(default = "default_release_radius")]
    pub release_radius: f64,
    /// Ankle displacement in the accelerator direction that counts as a
    /// deliberate move off the brake.
    #[serde(default = "default_accel_move_threshold")]
    pub accel_move_threshold: f64,
    /// Hip-center-to-knee angle opening that also counts as accelerator
    /// engagement.
    #[serde(default = "default_knee_angle_threshold")]
    pub knee_angle_threshold: f64,
    /// Distance range mapped onto the initial engagement throttle.
    #[serde(default = "default_engage_ramp")]
    pub engage_ramp: f64,
    /// Cap on the initial engagement throttle.
    #[serde(default = "default_engage_cap")]
    pub engage_cap: f64,
    /// Throttle never drops below this while the accelerator is engaged.
    #[serde(default = "default_throttle_floor")]
    pub throttle_floor: f64,
    /// Base throttle while holding the recorded press position.
    #[serde(default = "default_throttle_base")]
    pub throttle_base: f64,
    /// Gain applied to the foot-tilt delta while holding; toes down = more
    /// throttle.
    #[serde(default = "default_throttle_angle_sensitivity")]
    pub throttle_angle_sensitivity: f64,
    /// Idle-creep throttle applied right after release, before the foot is
    /// back in the neutral zone.
    #[serde(default = "default_creep_throttle")]
    pub creep_throttle: f64,
    /// Foot-tilt increase past the calibrated angle that engages the brake.
    /// Wide enough to avoid competing with the accelerator tilt modulation.
    #[serde(default = "default_brake_threshold")]
    pub brake_threshold: f64,
    /// Tilt range past the threshold mapped onto full brake strength.
    #[serde(default = "default_max_brake_angle")]
    pub max_brake_angle: f64,
    /// Damping on the linear brake mapping.
    #[serde(default = "default_brake_damping")]
    pub brake_damping: f64,
    /// Presses shorter than this count as pumping-brake taps.
    #[serde(default = "default_pumping_press_ms")]
    pub pumping_press_ms: f64,
    /// Time-tiered brake strength (pumping taps weaker, long holds stronger).
    /// Off by default in favor of the flat damped mapping.
    #[serde(default)]
    pub progressive_brake: bool,
    /// Idle time after which the pumping-brake counter resets.
    #[serde(default = "default_brake_count_reset_ms")]
    pub brake_count_reset_ms: f64,
}

fn default_neutral_radius() -> f64 {
    0.03
}
fn default_release_radius() -> f64 {
    0.02
}
fn default_accel_move_threshold() -> f64 {
    0.01
}
fn default_knee_angle_threshold() -> f64 {
    0.10
}
fn default_engage_ramp() -> f64 {
    0.15
}
fn default_engage_cap() -> f64 {
    0.7
}
fn default_throttle_floor() -> f64 {
    0.15
}
fn default_throttle_base() -> f64 {
    0.5
}
fn default_throttle_angle_sensitivity() -> f64 {
    2.5
}
fn default_creep_throttle() -> f64 {
    0.05
}
fn default_brake_threshold() -> f64 {
    0.15
}
fn default_max_brake_angle() -> f64 {
    0.4
}
fn default_brake_damping() -> f64 {
    0.5
}
fn default_pumping_press_ms() -> f64 {
    300.0
}
fn default_brake_count_reset_ms() -> f64 {
    2000.0
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            neutral_radius: default_neutral_radius(),
            release_radius: default_release_radius(),
            accel_move_threshold: default_accel_move_threshold(),
            knee_angle_threshold: default_knee_angle_threshold(),
            engage_ramp: default_engage_ramp(),
            engage_cap: default_engage_cap(),
            throttle_floor: default_throttle_floor(),
            throttle_base: default_throttle_base(),
            throttle_angle_sensitivity: default_throttle_angle_sensitivity(),
            creep_throttle: default_creep_throttle(),
            brake_threshold: default_brake_threshold(),
            max_brake_angle: default_max_brake_angle(),
            brake_damping: default_brake_damping(),
            pumping_press_ms: default_pumping_press_ms(),
            progressive_brake: false,
            brake_count_reset_ms: default_brake_count_reset_ms(),
        }
    }
}

/// How the two-hand angle maps onto the steering scalar.
///
/// Sign convention for both modes: in unmirrored image coordinates a clockwise
/// wheel gesture (right knuckle below left) produces a negative output. Hosts
/// that mirror the camera preview flip the sign once at integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SteeringMode {
    /// Snap to -1/0/+1 past the deadzone.
    #[default]
    Digital,
    /// Angle times sensitivity, clamped to [-1, 1].
    Proportional,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteeringConfig {
    #[serde(default)]
    pub mode: SteeringMode,
    /// Hand angles within this band map to zero steering (radians).
    #[serde(default = "default_deadzone")]
    pub deadzone: f64,
    /// Gain for proportional mode.
    #[serde(default = "default_steering_sensitivity")]
    pub sensitivity: f64,
}

fn default_deadzone() -> f64 {
    0.1
}
fn default_steering_sensitivity() -> f64 {
    2.0
}

impl Default for SteeringConfig {
    fn default() -> Self {
        Self {
            mode: SteeringMode::default(),
            deadzone: default_deadzone(),
            sensitivity: default_steering_sensitivity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GazeConfig {
    /// Gain on the nose-vs-ear-midpoint offset; the result approximates yaw
    /// in radians.
    #[serde(default = "default_yaw_sensitivity")]
    pub yaw_sensitivity: f64,
    /// Gain on the recentered iris ratio.
    #[serde(default = "default_gaze_scale")]
    pub gaze_scale: f64,
}

fn default_yaw_sensitivity() -> f64 {
    20.0
}
fn default_gaze_scale() -> f64 {
    2.0
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            yaw_sensitivity: default_yaw_sensitivity(),
            gaze_scale: default_gaze_scale(),
        }
    }
}
