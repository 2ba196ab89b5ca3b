// src/session.rs - Per-frame recognition session and calibration state machine
//
// One session owns every piece of cross-frame state: the filter bank, the
// foot calibration, the pedal state, and the calibration stage. All mutation
// happens on the single per-frame processing path; consumers read the latest
// published control tuple.

use serde::Serialize;
use tracing::{info, trace};

use crate::calibration::{check_stability, FootCalibration};
use crate::config::RecognitionConfig;
use crate::filter::LandmarkFilterBank;
use crate::gaze::{estimate_gaze, GazeRead};
use crate::input::FrameInput;
use crate::pedals::{process_pedals, PedalDiagnostics, PedalState};
use crate::steering::{classify_steering, SteeringRead};

/// Calibration lifecycle. `Calibrated` is terminal for the session; going
/// back requires an explicit `start_calibration` or `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStage {
    #[default]
    Idle,
    WaitingForBrake,
    Calibrated,
}

impl CalibrationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationStage::Idle => "idle",
            CalibrationStage::WaitingForBrake => "waiting_for_brake",
            CalibrationStage::Calibrated => "calibrated",
        }
    }
}

/// The control tuple handed to the vehicle simulation and UI, refreshed at
/// camera frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControlOutput {
    pub timestamp_ms: f64,
    /// -1.0 to 1.0; see `SteeringConfig` for the sign convention.
    pub steering_angle: f64,
    /// 0.0 - 1.0
    pub throttle: f64,
    /// 0.0 - 1.0
    pub brake: f64,
    pub is_accel_pressed: bool,
    pub is_brake_pressed: bool,
    /// Approximate head yaw in radians.
    pub head_yaw: f64,
    pub gaze_x: f64,
    pub gaze_y: f64,
    pub calibration_stage: CalibrationStage,
    /// Stability-gate progress while waiting; 1.0 once calibrated.
    pub calibration_progress: f64,
}

impl Default for ControlOutput {
    fn default() -> Self {
        Self {
            timestamp_ms: 0.0,
            steering_angle: 0.0,
            throttle: 0.0,
            brake: 0.0,
            is_accel_pressed: false,
            is_brake_pressed: false,
            head_yaw: 0.0,
            gaze_x: 0.0,
            gaze_y: 0.0,
            calibration_stage: CalibrationStage::Idle,
            calibration_progress: 0.0,
        }
    }
}

/// Structured per-frame classifier telemetry. The UI renders `summary()`;
/// tests and tooling read the fields directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    pub stage: CalibrationStage,
    pub progress: f64,
    pub pose_tracked: bool,
    pub pedals: PedalDiagnostics,
    pub steering: SteeringRead,
    pub face_tracked: bool,
    pub gaze: GazeRead,
}

impl Diagnostics {
    /// Human-readable one-liner for the on-screen debug panel.
    pub fn summary(&self) -> String {
        let mut out = match self.stage {
            CalibrationStage::Idle => "calibration idle".to_string(),
            CalibrationStage::WaitingForBrake => {
                if self.pose_tracked {
                    format!("hold foot still: {:.0}%", self.progress * 100.0)
                } else {
                    "no pose detected".to_string()
                }
            }
            CalibrationStage::Calibrated => format!(
                "shift {:+.3} | tilt {:+.2}",
                self.pedals.ankle_shift, self.pedals.foot_angle_diff
            ),
        };

        out.push_str(&format!(" | Hands: {}", self.steering.hand_count));
        match self.steering.angle {
            Some(angle) => {
                out.push_str(&format!(
                    " | Ang: {:.2} | Str: {:.2}",
                    angle, self.steering.steering
                ));
            }
            None => out.push_str(" | Need 2 hands"),
        }
        if !self.face_tracked {
            out.push_str(" | No face");
        }
        out
    }
}

/// Owns all recognition state for one tracking session and advances it one
/// video frame at a time. Not reentrant: callers must serialize
/// `process_frame` calls in frame-arrival order.
pub struct RecognitionSession {
    config: RecognitionConfig,
    filters: LandmarkFilterBank,
    calibration: Option<FootCalibration>,
    pedal_state: PedalState,
    stage: CalibrationStage,
    progress: f64,
    last_timestamp_ms: Option<f64>,
    output: ControlOutput,
    diagnostics: Diagnostics,
}

impl RecognitionSession {
    pub fn new(config: RecognitionConfig) -> Self {
        let filters = LandmarkFilterBank::new(config.filter.clone());
        Self {
            config,
            filters,
            calibration: None,
            pedal_state: PedalState::default(),
            stage: CalibrationStage::Idle,
            progress: 0.0,
            last_timestamp_ms: None,
            output: ControlOutput::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Begin (or restart) foot calibration. Any previous reference pose is
    /// discarded and pedal outputs stay neutral until the gate passes.
    pub fn start_calibration(&mut self) {
        info!("calibration started: waiting for a steady brake pose");
        self.stage = CalibrationStage::WaitingForBrake;
        self.calibration = None;
        self.progress = 0.0;
        self.pedal_state = PedalState::default();
    }

    /// Full teardown: back to idle with cleared filters. Stopping the camera
    /// without calling this leaves the last published state readable.
    pub fn reset(&mut self) {
        info!("recognition session reset");
        self.stage = CalibrationStage::Idle;
        self.calibration = None;
        self.progress = 0.0;
        self.pedal_state = PedalState::default();
        self.filters.reset();
        self.last_timestamp_ms = None;
        self.output = ControlOutput::default();
        self.diagnostics = Diagnostics::default();
    }

    pub fn stage(&self) -> CalibrationStage {
        self.stage
    }

    pub fn output(&self) -> &ControlOutput {
        &self.output
    }

    pub fn pedal_state(&self) -> &PedalState {
        &self.pedal_state
    }

    pub fn calibration(&self) -> Option<&FootCalibration> {
        self.calibration.as_ref()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run one recognition pass. Frames whose timestamp does not advance past
    /// the previously processed frame are skipped entirely, so press
    /// durations and hysteresis transitions are never double-counted.
    pub fn process_frame(&mut self, frame: &FrameInput) -> &ControlOutput {
        if let Some(last) = self.last_timestamp_ms {
            if frame.timestamp_ms <= last {
                trace!(
                    timestamp_ms = frame.timestamp_ms,
                    "stale frame skipped"
                );
                return &self.output;
            }
        }
        let delta_ms = self
            .last_timestamp_ms
            .map_or(0.0, |last| frame.timestamp_ms - last);
        self.last_timestamp_ms = Some(frame.timestamp_ms);

        let smoothed_pose = frame
            .pose
            .as_ref()
            .map(|p| self.filters.smooth_pose(p, frame.timestamp_ms));

        let mut pedal_diag = PedalDiagnostics::default();
        match self.stage {
            CalibrationStage::Idle => {
                self.pedal_state = PedalState::default();
            }
            CalibrationStage::WaitingForBrake => {
                self.pedal_state = PedalState::default();
                match &smoothed_pose {
                    Some(pose) => {
                        let (check, calibration) = check_stability(
                            pose,
                            self.calibration.take(),
                            frame.timestamp_ms,
                            &self.config.calibration,
                        );
                        self.calibration = calibration;
                        self.progress = check.progress;
                        if check.is_stable {
                            self.stage = CalibrationStage::Calibrated;
                            info!("calibration complete, pedal recognition active");
                        }
                    }
                    None => {
                        // No pose this frame: the gate cannot advance.
                        self.calibration = None;
                        self.progress = 0.0;
                    }
                }
            }
            CalibrationStage::Calibrated => {
                let leg_tracked = smoothed_pose.as_ref().map_or(false, |pose| {
                    crate::calibration::has_reliable_leg(
                        pose,
                        self.config.calibration.min_visibility,
                    )
                });
                match (&smoothed_pose, self.calibration.as_mut()) {
                    (Some(pose), Some(calibration)) if leg_tracked => {
                        let (state, diag) = process_pedals(
                            pose,
                            calibration,
                            &self.pedal_state,
                            delta_ms,
                            &self.config.pedals,
                        );
                        self.pedal_state = state;
                        pedal_diag = diag;
                    }
                    _ => {
                        // Missing detection degrades to neutral output rather
                        // than propagating stale pedal values.
                        self.pedal_state = PedalState::default();
                    }
                }
            }
        }

        let steering = classify_steering(&frame.hands, &self.config.steering);
        let gaze = frame
            .face
            .as_ref()
            .map(|f| estimate_gaze(f, &self.config.gaze))
            .unwrap_or_default();

        self.output = ControlOutput {
            timestamp_ms: frame.timestamp_ms,
            steering_angle: steering.steering,
            throttle: self.pedal_state.throttle,
            brake: self.pedal_state.brake,
            is_accel_pressed: self.pedal_state.is_accel_pressed,
            is_brake_pressed: self.pedal_state.is_brake_pressed,
            head_yaw: gaze.head_yaw,
            gaze_x: gaze.gaze_x,
            gaze_y: gaze.gaze_y,
            calibration_stage: self.stage,
            calibration_progress: match self.stage {
                CalibrationStage::Calibrated => 1.0,
                _ => self.progress,
            },
        };
        self.diagnostics = Diagnostics {
            stage: self.stage,
            progress: self.output.calibration_progress,
            pose_tracked: smoothed_pose.is_some(),
            pedals: pedal_diag,
            steering,
            face_tracked: frame.face.is_some(),
            gaze,
        };

        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate;

    fn frame(timestamp_ms: f64) -> FrameInput {
        FrameInput {
            timestamp_ms,
            pose: Some(simulate::seated_pose()),
            hands: simulate::steering_hands(0.0),
            face: Some(simulate::face_frame(0.0, 0.0)),
        }
    }

    #[test]
    fn test_idle_session_reports_neutral_pedals() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        let out = session.process_frame(&frame(0.0));
        assert_eq!(out.calibration_stage, CalibrationStage::Idle);
        assert_eq!(out.throttle, 0.0);
        assert_eq!(out.brake, 0.0);
    }

    #[test]
    fn test_stale_frame_returns_last_output_unchanged() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        session.process_frame(&frame(100.0));
        let first = *session.output();

        // Same timestamp and an older one: both skipped.
        let replayed = *session.process_frame(&frame(100.0));
        assert_eq!(replayed, first);
        let older = *session.process_frame(&frame(50.0));
        assert_eq!(older, first);
    }

    #[test]
    fn test_waiting_without_pose_reports_zero_progress() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        session.start_calibration();
        session.process_frame(&frame(0.0));
        session.process_frame(&frame(1000.0));
        assert!(session.output().calibration_progress > 0.0);

        let no_pose = FrameInput {
            timestamp_ms: 1033.0,
            pose: None,
            hands: vec![],
            face: None,
        };
        let out = session.process_frame(&no_pose);
        assert_eq!(out.calibration_stage, CalibrationStage::WaitingForBrake);
        assert_eq!(out.calibration_progress, 0.0);
    }

    #[test]
    fn test_restarting_calibration_discards_reference() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        session.start_calibration();
        for i in 0..120 {
            session.process_frame(&frame(i as f64 * 33.0));
        }
        assert_eq!(session.stage(), CalibrationStage::Calibrated);

        session.start_calibration();
        assert_eq!(session.stage(), CalibrationStage::WaitingForBrake);
        assert!(session.calibration().is_none());
        assert_eq!(*session.pedal_state(), PedalState::default());
    }

    #[test]
    fn test_reset_clears_filters_and_stage() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        session.start_calibration();
        session.process_frame(&frame(0.0));
        session.reset();
        assert_eq!(session.stage(), CalibrationStage::Idle);
        // After reset, an older timestamp is processable again.
        let out = session.process_frame(&frame(0.0));
        assert_eq!(out.timestamp_ms, 0.0);
    }

    #[test]
    fn test_summary_mentions_progress_while_waiting() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        session.start_calibration();
        session.process_frame(&frame(0.0));
        session.process_frame(&frame(1500.0));
        let summary = session.diagnostics().summary();
        assert!(summary.contains("hold foot still"), "got: {}", summary);
        assert!(summary.contains("Hands: 2"), "got: {}", summary);
    }

    #[test]
    fn test_summary_reports_missing_hands() {
        let mut session = RecognitionSession::new(RecognitionConfig::default());
        let mut input = frame(0.0);
        input.hands.clear();
        session.process_frame(&input);
        assert!(session.diagnostics().summary().contains("Need 2 hands"));
    }
}
