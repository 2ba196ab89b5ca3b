// src/input.rs - Landmark frame boundary between the external detectors and the recognizer
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// MediaPipe pose landmarker output size.
pub const POSE_LANDMARK_COUNT: usize = 33;
/// MediaPipe hand landmarker output size (per hand).
pub const HAND_LANDMARK_COUNT: usize = 21;
/// MediaPipe face mesh size without iris refinement.
pub const FACE_LANDMARK_COUNT: usize = 468;
/// Face mesh size with the 10 iris refinement points appended.
pub const FACE_LANDMARK_COUNT_WITH_IRIS: usize = 478;

/// Pose landmark indices used by the pedal recognizer.
/// https://developers.google.com/mediapipe/solutions/vision/pose_landmarker
pub mod pose {
    pub const LEFT_HIP: usize = 23;
    pub const RIGHT_HIP: usize = 24;
    pub const LEFT_KNEE: usize = 25;
    pub const RIGHT_KNEE: usize = 26;
    pub const LEFT_ANKLE: usize = 27;
    pub const RIGHT_ANKLE: usize = 28;
    pub const LEFT_HEEL: usize = 29;
    pub const RIGHT_HEEL: usize = 30;
    pub const LEFT_FOOT_INDEX: usize = 31;
    pub const RIGHT_FOOT_INDEX: usize = 32;
}

/// Hand landmark indices used by the steering classifier.
pub mod hand {
    /// Middle-finger knuckle: a stable joint, unlike the fingertips.
    pub const MIDDLE_MCP: usize = 9;
}

/// Face mesh indices used by the gaze estimator.
pub mod face {
    pub const NOSE: usize = 1;
    pub const LEFT_EAR: usize = 234;
    pub const RIGHT_EAR: usize = 454;

    pub const LEFT_EYE_OUTER: usize = 33;
    pub const LEFT_EYE_INNER: usize = 133;
    pub const LEFT_EYE_TOP: usize = 159;
    pub const LEFT_EYE_BOTTOM: usize = 145;
    pub const LEFT_IRIS: usize = 468;

    pub const RIGHT_EYE_INNER: usize = 362;
    pub const RIGHT_EYE_OUTER: usize = 263;
    pub const RIGHT_EYE_TOP: usize = 386;
    pub const RIGHT_EYE_BOTTOM: usize = 374;
    pub const RIGHT_IRIS: usize = 473;
}

/// A normalized 3D keypoint in camera-image space. `x` and `y` are roughly
/// [0, 1], `z` is relative depth, `visibility` is the detector's confidence
/// when it reports one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    pub fn with_visibility(x: f64, y: f64, z: f64, visibility: f64) -> Self {
        Self {
            x,
            y,
            z,
            visibility: Some(visibility),
        }
    }

    pub fn point(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// A landmark without a visibility score counts as visible, matching the
    /// detector convention of omitting the field when it is not computed.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility.map_or(true, |v| v >= threshold)
    }
}

/// Wrong-sized landmark arrays indicate an integration bug with the upstream
/// detector, not a runtime condition, so frame construction fails fast.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("pose frame has {0} landmarks, expected {POSE_LANDMARK_COUNT}")]
    PoseLength(usize),
    #[error("hand frame has {0} landmarks, expected {HAND_LANDMARK_COUNT}")]
    HandLength(usize),
    #[error("face frame has {0} landmarks, expected at least {FACE_LANDMARK_COUNT}")]
    FaceLength(usize),
}

/// A full 33-point body pose for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseFrameRaw")]
pub struct PoseFrame {
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize)]
struct PoseFrameRaw {
    landmarks: Vec<Landmark>,
}

impl PoseFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, FrameError> {
        if landmarks.len() != POSE_LANDMARK_COUNT {
            return Err(FrameError::PoseLength(landmarks.len()));
        }
        Ok(Self { landmarks })
    }

    /// Rebuild a frame from landmarks that are already known to be a valid
    /// pose set (e.g. the output of the filter bank).
    pub(crate) fn from_smoothed(landmarks: Vec<Landmark>) -> Self {
        debug_assert_eq!(landmarks.len(), POSE_LANDMARK_COUNT);
        Self { landmarks }
    }

    pub fn get(&self, index: usize) -> Landmark {
        self.landmarks[index]
    }

    pub fn landmarks(&self) -> &[Landmark] {
        &self.landmarks
    }
}

impl TryFrom<PoseFrameRaw> for PoseFrame {
    type Error = FrameError;

    fn try_from(raw: PoseFrameRaw) -> Result<Self, Self::Error> {
        Self::new(raw.landmarks)
    }
}

/// Which hand the detector believes this is, in the camera's mirrored view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

/// A 21-point hand for one frame, with the detector's handedness label when
/// it reported one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HandFrameRaw")]
pub struct HandFrame {
    landmarks: Vec<Landmark>,
    pub handedness: Option<Handedness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness_score: Option<f64>,
}

#[derive(Deserialize)]
struct HandFrameRaw {
    landmarks: Vec<Landmark>,
    handedness: Option<Handedness>,
    #[serde(default)]
    handedness_score: Option<f64>,
}

impl HandFrame {
    pub fn new(
        landmarks: Vec<Landmark>,
        handedness: Option<Handedness>,
    ) -> Result<Self, FrameError> {
        if landmarks.len() != HAND_LANDMARK_COUNT {
            return Err(FrameError::HandLength(landmarks.len()));
        }
        Ok(Self {
            landmarks,
            handedness,
            handedness_score: None,
        })
    }

    pub fn get(&self, index: usize) -> Landmark {
        self.landmarks[index]
    }
}

impl TryFrom<HandFrameRaw> for HandFrame {
    type Error = FrameError;

    fn try_from(raw: HandFrameRaw) -> Result<Self, Self::Error> {
        let mut frame = Self::new(raw.landmarks, raw.handedness)?;
        frame.handedness_score = raw.handedness_score;
        Ok(frame)
    }
}

/// A face mesh for one frame. Iris refinement points are optional; the gaze
/// estimator degrades to head yaw only when they are absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FaceFrameRaw")]
pub struct FaceFrame {
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize)]
struct FaceFrameRaw {
    landmarks: Vec<Landmark>,
}

impl FaceFrame {
    pub fn new(landmarks: Vec<Landmark>) -> Result<Self, FrameError> {
        if landmarks.len() < FACE_LANDMARK_COUNT {
            return Err(FrameError::FaceLength(landmarks.len()));
        }
        Ok(Self { landmarks })
    }

    pub fn get(&self, index: usize) -> Landmark {
        self.landmarks[index]
    }

    pub fn has_iris(&self) -> bool {
        self.landmarks.len() >= FACE_LANDMARK_COUNT_WITH_IRIS
    }
}

impl TryFrom<FaceFrameRaw> for FaceFrame {
    type Error = FrameError;

    fn try_from(raw: FaceFrameRaw) -> Result<Self, Self::Error> {
        Self::new(raw.landmarks)
    }
}

/// Everything the detectors produced for one video frame. Any entity may be
/// absent; the recognizer degrades per channel rather than failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameInput {
    pub timestamp_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose: Option<PoseFrame>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hands: Vec<HandFrame>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceFrame>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_frame_rejects_wrong_length() {
        let landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 32];
        assert_eq!(
            PoseFrame::new(landmarks).unwrap_err(),
            FrameError::PoseLength(32)
        );
    }

    #[test]
    fn test_hand_frame_rejects_wrong_length() {
        let landmarks = vec![Landmark::new(0.5, 0.5, 0.0); 20];
        assert_eq!(
            HandFrame::new(landmarks, None).unwrap_err(),
            FrameError::HandLength(20)
        );
    }

    #[test]
    fn test_face_frame_iris_detection() {
        let plain = FaceFrame::new(vec![Landmark::new(0.5, 0.5, 0.0); FACE_LANDMARK_COUNT]).unwrap();
        assert!(!plain.has_iris());

        let refined =
            FaceFrame::new(vec![Landmark::new(0.5, 0.5, 0.0); FACE_LANDMARK_COUNT_WITH_IRIS])
                .unwrap();
        assert!(refined.has_iris());
    }

    #[test]
    fn test_visibility_defaults_to_visible() {
        let lm = Landmark::new(0.5, 0.5, 0.0);
        assert!(lm.is_visible(0.9));

        let lm = Landmark::with_visibility(0.5, 0.5, 0.0, 0.3);
        assert!(!lm.is_visible(0.5));
        assert!(lm.is_visible(0.2));
    }

    #[test]
    fn test_frame_input_round_trip() {
        let frame = FrameInput {
            timestamp_ms: 33.0,
            pose: Some(PoseFrame::new(vec![Landmark::new(0.5, 0.5, 0.0); 33]).unwrap()),
            hands: vec![HandFrame::new(
                vec![Landmark::new(0.3, 0.5, 0.0); 21],
                Some(Handedness::Left),
            )
            .unwrap()],
            face: None,
        };

        let json = serde_json::to_string(&frame).unwrap();
        let back: FrameInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn test_frame_input_rejects_malformed_pose() {
        let json = r#"{"timestamp_ms":0.0,"pose":{"landmarks":[{"x":0.0,"y":0.0,"z":0.0}]}}"#;
        assert!(serde_json::from_str::<FrameInput>(json).is_err());
    }
}
