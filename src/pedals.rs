// src/pedals.rs - Accelerator and brake recognition from a calibrated pose
//
// The accelerator is a sideways slide of the right foot off the brake, with
// throttle fine-tuned by toe tilt while the press position is held. The brake
// is a toe-down tilt past the calibrated reference angle. When a noisy pose
// satisfies both at once, the accelerator wins and the brake is forced off.

use tracing::debug;

use crate::calibration::{foot_tilt_angle, point_angle, FootCalibration};
use crate::config::PedalConfig;
use crate::input::{pose, PoseFrame};

/// Current pedal outputs plus the press bookkeeping that spans frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PedalState {
    /// 0.0 - 1.0
    pub throttle: f64,
    /// 0.0 - 1.0
    pub brake: f64,
    pub is_accel_pressed: bool,
    pub is_brake_pressed: bool,
    /// Continuous time the brake has been held (ms); resets on release.
    pub brake_press_duration_ms: f64,
    /// Completed press/release cycles, for pumping-brake detection.
    pub brake_press_count: u32,
}

impl Default for PedalState {
    fn default() -> Self {
        Self {
            throttle: 0.0,
            brake: 0.0,
            is_accel_pressed: false,
            is_brake_pressed: false,
            brake_press_duration_ms: 0.0,
            brake_press_count: 0,
        }
    }
}

impl PedalState {
    /// The pumping counter resets after the brake has been idle long enough.
    pub fn should_reset_brake_count(&self, idle_ms: f64, config: &PedalConfig) -> bool {
        !self.is_brake_pressed && idle_ms > config.brake_count_reset_ms
    }

    pub fn reset_brake_count(&mut self) {
        self.brake_press_count = 0;
    }
}

/// Raw classifier inputs, surfaced for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PedalDiagnostics {
    /// Ankle displacement in the accelerator direction (normalized units).
    pub ankle_shift: f64,
    /// Hip-to-knee angle delta against the calibrated reference (radians).
    pub knee_angle_diff: f64,
    /// Foot-tilt delta against the calibrated reference (radians).
    pub foot_angle_diff: f64,
}

/// Classify the accelerator gesture and update the press memory held in the
/// calibration.
///
/// Returns `(throttle, is_pressed)`.
fn recognize_acceleration(
    frame: &PoseFrame,
    calibration: &mut FootCalibration,
    previous: &PedalState,
    config: &PedalConfig,
) -> (f64, bool) {
    if !calibration.is_calibrated {
        return (0.0, false);
    }

    let left_hip = frame.get(pose::LEFT_HIP).point();
    let right_hip = frame.get(pose::RIGHT_HIP).point();
    let right_knee = frame.get(pose::RIGHT_KNEE).point();
    let current_ankle = frame.get(pose::RIGHT_ANKLE).point();
    let right_foot_index = frame.get(pose::RIGHT_FOOT_INDEX).point();

    let current_angle = foot_tilt_angle(&current_ankle, &right_foot_index);
    let distance_from_brake = (current_ankle - calibration.right_ankle).norm();

    let current_hip_center = (left_hip + right_hip) / 2.0;
    let current_hip_to_knee = point_angle(&current_hip_center, &right_knee);
    let knee_angle_diff = current_hip_to_knee - calibration.hip_to_right_knee_angle;

    // The camera mirrors the scene: a real move to the right shows up as a
    // decreasing x, so positive shift means "toward the accelerator".
    let horizontal_movement = calibration.right_ankle.x - current_ankle.x;
    let is_moving_to_accel = horizontal_movement > config.accel_move_threshold;
    let is_knee_opening = knee_angle_diff > config.knee_angle_threshold;

    // Hysteresis: while engaged, the foot must come firmly back to neutral
    // (tighter radius) before the engagement releases.
    let neutral_radius = if previous.is_accel_pressed {
        config.release_radius
    } else {
        config.neutral_radius
    };
    let at_brake_position =
        distance_from_brake < neutral_radius && !is_moving_to_accel && !is_knee_opening;

    let (throttle, is_pressed) = if at_brake_position {
        calibration.accel_press_position = None;
        calibration.accel_press_angle = None;
        (0.0, false)
    } else if is_moving_to_accel || is_knee_opening {
        match calibration.accel_press_position {
            None => {
                // First frame off the brake: remember where the foot rests
                // when pressing the gas.
                calibration.accel_press_position = Some(current_ankle);
                calibration.accel_press_angle = Some(current_angle);
                debug!(
                    shift = horizontal_movement,
                    knee_angle_diff, "accelerator engaged"
                );

                let move_distance = horizontal_movement.abs();
                let base = ((move_distance - config.accel_move_threshold) / config.engage_ramp)
                    .min(config.engage_cap);
                (base.max(config.throttle_floor), true)
            }
            Some(press_position) => {
                let distance_from_press = (current_ankle - press_position).norm();
                let at_accel_position = distance_from_press < config.neutral_radius * 2.0;

                if at_accel_position && is_moving_to_accel {
                    // Holding the press position: modulate throttle with the
                    // tilt delta recorded at press time.
                    let throttle = match calibration.accel_press_angle {
                        Some(press_angle) => {
                            let adjustment = (current_angle - press_angle)
                                * config.throttle_angle_sensitivity;
                            (config.throttle_base + adjustment).clamp(config.throttle_floor, 1.0)
                        }
                        None => config.throttle_base,
                    };
                    (throttle, true)
                } else {
                    calibration.accel_press_position = None;
                    calibration.accel_press_angle = None;
                    debug!("accelerator released: foot left the press position");
                    (0.0, false)
                }
            }
        }
    } else {
        calibration.accel_press_position = None;
        calibration.accel_press_angle = None;
        (0.0, false)
    };

    // Idle creep: right after release, before the foot is back in the
    // neutral zone, the car keeps crawling forward.
    if !is_pressed && previous.is_accel_pressed && !at_brake_position {
        return (config.creep_throttle, false);
    }

    (throttle, is_pressed)
}

struct BrakeRead {
    brake: f64,
    is_pressed: bool,
    duration_ms: f64,
    press_count: u32,
}

fn recognize_braking(
    frame: &PoseFrame,
    calibration: &FootCalibration,
    previous: &PedalState,
    delta_ms: f64,
    config: &PedalConfig,
) -> BrakeRead {
    if !calibration.is_calibrated {
        return BrakeRead {
            brake: 0.0,
            is_pressed: false,
            duration_ms: 0.0,
            press_count: 0,
        };
    }

    let right_ankle = frame.get(pose::RIGHT_ANKLE).point();
    let right_foot_index = frame.get(pose::RIGHT_FOOT_INDEX).point();
    let current_angle = foot_tilt_angle(&right_ankle, &right_foot_index);
    let angle_diff = current_angle - calibration.right_foot_angle;

    if angle_diff > config.brake_threshold {
        let strength = ((angle_diff - config.brake_threshold) / config.max_brake_angle).min(1.0);
        let duration_ms = previous.brake_press_duration_ms + delta_ms;
        let brake = if config.progressive_brake {
            progressive_strength(strength, duration_ms, config)
        } else {
            strength * config.brake_damping
        };
        BrakeRead {
            brake,
            is_pressed: true,
            duration_ms,
            press_count: previous.brake_press_count,
        }
    } else {
        let mut press_count = previous.brake_press_count;
        if previous.is_brake_pressed {
            press_count += 1;
            if previous.brake_press_duration_ms < config.pumping_press_ms {
                debug!(
                    press_count,
                    duration_ms = previous.brake_press_duration_ms,
                    "pumping brake tap"
                );
            }
        }
        BrakeRead {
            brake: 0.0,
            is_pressed: false,
            duration_ms: 0.0,
            press_count,
        }
    }
}

/// Time-tiered brake strength: short taps brake gently, holds past a second
/// ramp up beyond the flat mapping.
fn progressive_strength(base: f64, duration_ms: f64, config: &PedalConfig) -> f64 {
    if duration_ms < config.pumping_press_ms {
        let time_factor = duration_ms / config.pumping_press_ms;
        base * time_factor * 0.4
    } else if duration_ms < 1000.0 {
        base * 0.7
    } else {
        let long_press_factor = (1.0 + (duration_ms - 1000.0) / 3000.0).min(1.5);
        (base * long_press_factor).min(1.0)
    }
}

/// Run both recognizers for one frame and resolve their conflict.
///
/// Returns the new pedal state and the raw classifier inputs for diagnostics.
/// The press memory inside `calibration` is updated as a side effect.
pub fn process_pedals(
    frame: &PoseFrame,
    calibration: &mut FootCalibration,
    previous: &PedalState,
    delta_ms: f64,
    config: &PedalConfig,
) -> (PedalState, PedalDiagnostics) {
    let (throttle, is_accel_pressed) =
        recognize_acceleration(frame, calibration, previous, config);
    let brake_read = recognize_braking(frame, calibration, previous, delta_ms, config);

    let mut brake = brake_read.brake;
    let mut is_brake_pressed = brake_read.is_pressed;
    if is_accel_pressed && brake_read.is_pressed {
        // Contradictory pose: the accelerator wins to avoid a phantom brake.
        brake = 0.0;
        is_brake_pressed = false;
    }

    let current_ankle = frame.get(pose::RIGHT_ANKLE).point();
    let right_foot_index = frame.get(pose::RIGHT_FOOT_INDEX).point();
    let hip_center =
        (frame.get(pose::LEFT_HIP).point() + frame.get(pose::RIGHT_HIP).point()) / 2.0;
    let diagnostics = PedalDiagnostics {
        ankle_shift: calibration.right_ankle.x - current_ankle.x,
        knee_angle_diff: point_angle(&hip_center, &frame.get(pose::RIGHT_KNEE).point())
            - calibration.hip_to_right_knee_angle,
        foot_angle_diff: foot_tilt_angle(&current_ankle, &right_foot_index)
            - calibration.right_foot_angle,
    };

    (
        PedalState {
            throttle,
            brake,
            is_accel_pressed,
            is_brake_pressed,
            brake_press_duration_ms: brake_read.duration_ms,
            brake_press_count: brake_read.press_count,
        },
        diagnostics,
    )
}
