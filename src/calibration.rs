// src/calibration.rs - Neutral foot pose capture and the stability gate
//
// Pedal recognition is meaningless without a trustworthy reference pose, so a
// snapshot is only accepted after the ankle has held still for the full gate
// duration. Any excursion, however brief, restarts the timer; partial credit
// for "mostly still" would let an unstable pose slip through.

use nalgebra::Vector3;
use tracing::{debug, info};

use crate::config::CalibrationConfig;
use crate::input::{pose, PoseFrame};

/// Angle of the ankle-to-toe vector against the horizontal (radians).
pub(crate) fn foot_tilt_angle(ankle: &Vector3<f64>, foot_index: &Vector3<f64>) -> f64 {
    (foot_index.y - ankle.y).atan2(foot_index.x - ankle.x)
}

/// Angle of the line from one point to another against the horizontal.
pub(crate) fn point_angle(from: &Vector3<f64>, to: &Vector3<f64>) -> f64 {
    (to.y - from.y).atan2(to.x - from.x)
}

/// Whether every right-leg landmark the pedal recognizer depends on is
/// tracked reliably enough to act on.
pub fn has_reliable_leg(frame: &PoseFrame, min_visibility: f64) -> bool {
    [
        pose::RIGHT_ANKLE,
        pose::RIGHT_FOOT_INDEX,
        pose::RIGHT_KNEE,
        pose::RIGHT_HIP,
    ]
    .iter()
    .all(|&index| frame.get(index).is_visible(min_visibility))
}

/// Snapshot of the driver's neutral pose, taken with the right foot resting
/// on the brake, plus the transient stability-gate bookkeeping and the
/// runtime accelerator press memory.
#[derive(Debug, Clone)]
pub struct FootCalibration {
    pub right_ankle: Vector3<f64>,
    pub right_heel: Vector3<f64>,
    pub right_foot_index: Vector3<f64>,
    pub right_knee: Vector3<f64>,

    pub left_ankle: Vector3<f64>,
    pub left_heel: Vector3<f64>,
    pub left_foot_index: Vector3<f64>,
    pub left_knee: Vector3<f64>,

    pub left_hip: Vector3<f64>,
    pub right_hip: Vector3<f64>,
    pub hip_center: Vector3<f64>,

    /// Reference ankle-to-toe tilt for each foot.
    pub right_foot_angle: f64,
    pub left_foot_angle: f64,
    /// Reference hip-center-to-right-knee angle at the brake position.
    pub hip_to_right_knee_angle: f64,

    /// Where and at what tilt the accelerator gesture was first engaged.
    /// Cleared whenever the foot leaves the press position.
    pub accel_press_position: Option<Vector3<f64>>,
    pub accel_press_angle: Option<f64>,

    pub is_calibrated: bool,

    /// Stability-gate bookkeeping: when the current still-window started and
    /// the ankle position it is anchored to.
    pub stability_check_start_ms: Option<f64>,
    pub stability_check_position: Option<Vector3<f64>>,
}

impl FootCalibration {
    /// Snapshot the current pose as a candidate neutral reference.
    ///
    /// Returns `None` when any right-leg landmark the recognizer depends on
    /// falls below the visibility threshold; the caller must treat that as
    /// "no pose detected" and not advance the gate.
    pub fn capture(frame: &PoseFrame, config: &CalibrationConfig) -> Option<Self> {
        if !has_reliable_leg(frame, config.min_visibility) {
            return None;
        }

        let right_ankle = frame.get(pose::RIGHT_ANKLE);
        let right_foot_index = frame.get(pose::RIGHT_FOOT_INDEX);
        let right_knee = frame.get(pose::RIGHT_KNEE);
        let right_hip = frame.get(pose::RIGHT_HIP);

        let left_hip = frame.get(pose::LEFT_HIP);
        let left_ankle = frame.get(pose::LEFT_ANKLE);
        let left_foot_index = frame.get(pose::LEFT_FOOT_INDEX);

        let hip_center = (left_hip.point() + right_hip.point()) / 2.0;
        let right_knee_p = right_knee.point();

        Some(Self {
            right_ankle: right_ankle.point(),
            right_heel: frame.get(pose::RIGHT_HEEL).point(),
            right_foot_index: right_foot_index.point(),
            right_knee: right_knee_p,
            left_ankle: left_ankle.point(),
            left_heel: frame.get(pose::LEFT_HEEL).point(),
            left_foot_index: left_foot_index.point(),
            left_knee: frame.get(pose::LEFT_KNEE).point(),
            left_hip: left_hip.point(),
            right_hip: right_hip.point(),
            hip_center,
            right_foot_angle: foot_tilt_angle(&right_ankle.point(), &right_foot_index.point()),
            left_foot_angle: foot_tilt_angle(&left_ankle.point(), &left_foot_index.point()),
            hip_to_right_knee_angle: point_angle(&hip_center, &right_knee_p),
            accel_press_position: None,
            accel_press_angle: None,
            is_calibrated: false,
            stability_check_start_ms: None,
            stability_check_position: None,
        })
    }
}

/// Result of one stability-gate step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilityCheck {
    pub is_stable: bool,
    /// Fraction of the required still-window elapsed so far.
    pub progress: f64,
}

impl StabilityCheck {
    fn restarted() -> Self {
        Self {
            is_stable: false,
            progress: 0.0,
        }
    }
}

/// Advance the stability gate by one frame.
///
/// While the ankle stays within `stability_threshold` of the anchored
/// position, progress accumulates against the frame-supplied clock; once the
/// full duration elapses the calibration locks (`is_calibrated = true`). Any
/// drift beyond the threshold re-snapshots the reference from the current
/// landmarks and restarts the timer.
pub fn check_stability(
    frame: &PoseFrame,
    previous: Option<FootCalibration>,
    now_ms: f64,
    config: &CalibrationConfig,
) -> (StabilityCheck, Option<FootCalibration>) {
    let current = frame.get(pose::RIGHT_ANKLE).point();

    if let Some(cal) = previous {
        if let (Some(anchor), Some(start_ms)) =
            (cal.stability_check_position, cal.stability_check_start_ms)
        {
            let drift = (current - anchor).norm();
            if drift <= config.stability_threshold {
                let elapsed = now_ms - start_ms;
                if elapsed >= config.stability_duration_ms {
                    let mut locked = cal;
                    locked.is_calibrated = true;
                    info!(elapsed_ms = elapsed, "foot calibration locked");
                    return (
                        StabilityCheck {
                            is_stable: true,
                            progress: 1.0,
                        },
                        Some(locked),
                    );
                }
                let progress = (elapsed / config.stability_duration_ms).min(1.0);
                return (
                    StabilityCheck {
                        is_stable: false,
                        progress,
                    },
                    Some(cal),
                );
            }
            debug!(drift, "ankle drifted, stability window restarted");
        }
    }

    // First frame, or the pose moved: anchor a fresh candidate snapshot.
    match FootCalibration::capture(frame, config) {
        Some(mut cal) => {
            cal.stability_check_start_ms = Some(now_ms);
            cal.stability_check_position = Some(current);
            (StabilityCheck::restarted(), Some(cal))
        }
        None => (StabilityCheck::restarted(), None),
    }
}
