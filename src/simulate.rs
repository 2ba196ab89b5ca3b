// src/simulate.rs - Scripted landmark sequences for demo runs and tests
//
// Stands in for the camera + detector stack: a seated driver rig whose right
// foot, hands, and face can be posed frame by frame. Geometry uses the same
// mirrored-image convention as a real webcam, so sliding the foot toward the
// accelerator means decreasing x.

use crate::input::{
    face, pose, FaceFrame, FrameInput, HandFrame, Handedness, Landmark, FACE_LANDMARK_COUNT,
    FACE_LANDMARK_COUNT_WITH_IRIS, HAND_LANDMARK_COUNT, POSE_LANDMARK_COUNT,
};

/// Base seated pose: hips over knees over ankles, right foot resting flat on
/// the brake. All 33 landmarks carry a healthy visibility score.
pub fn seated_landmarks() -> Vec<Landmark> {
    let mut landmarks = vec![Landmark::with_visibility(0.5, 0.4, 0.0, 0.9); POSE_LANDMARK_COUNT];

    let mut set = |index: usize, x: f64, y: f64| {
        landmarks[index] = Landmark::with_visibility(x, y, 0.0, 0.9);
    };
    set(pose::LEFT_HIP, 0.58, 0.50);
    set(pose::RIGHT_HIP, 0.42, 0.50);
    set(pose::LEFT_KNEE, 0.60, 0.70);
    set(pose::RIGHT_KNEE, 0.42, 0.70);
    set(pose::LEFT_ANKLE, 0.62, 0.90);
    set(pose::RIGHT_ANKLE, 0.40, 0.90);
    set(pose::LEFT_HEEL, 0.63, 0.93);
    set(pose::RIGHT_HEEL, 0.38, 0.93);
    set(pose::LEFT_FOOT_INDEX, 0.56, 0.92);
    set(pose::RIGHT_FOOT_INDEX, 0.46, 0.92);

    landmarks
}

pub fn pose_frame(landmarks: Vec<Landmark>) -> crate::input::PoseFrame {
    crate::input::PoseFrame::new(landmarks).expect("rig produces a full 33-landmark pose")
}

pub fn seated_pose() -> crate::input::PoseFrame {
    pose_frame(seated_landmarks())
}

/// Right foot moved toward the accelerator by `shift` (whole foot, no tilt).
pub fn accel_pose(shift: f64) -> crate::input::PoseFrame {
    accel_pose_with_toe_drop(shift, 0.0)
}

/// Right foot shifted toward the accelerator with the toes tilted down by
/// `toe_drop`.
pub fn accel_pose_with_toe_drop(shift: f64, toe_drop: f64) -> crate::input::PoseFrame {
    let mut landmarks = seated_landmarks();
    for index in [pose::RIGHT_ANKLE, pose::RIGHT_HEEL, pose::RIGHT_FOOT_INDEX] {
        landmarks[index].x -= shift;
    }
    landmarks[pose::RIGHT_FOOT_INDEX].y += toe_drop;
    pose_frame(landmarks)
}

/// Right foot tilted toes-down at the neutral position (braking).
pub fn brake_pose(toe_drop: f64) -> crate::input::PoseFrame {
    let mut landmarks = seated_landmarks();
    landmarks[pose::RIGHT_FOOT_INDEX].y += toe_drop;
    pose_frame(landmarks)
}

/// Right foot lifted off the pedals: shifted slightly and raised, clear of
/// both the press position and the neutral zone.
pub fn lifted_pose(shift: f64, lift: f64) -> crate::input::PoseFrame {
    let mut landmarks = seated_landmarks();
    for index in [pose::RIGHT_ANKLE, pose::RIGHT_HEEL, pose::RIGHT_FOOT_INDEX] {
        landmarks[index].x -= shift;
        landmarks[index].y -= lift;
    }
    pose_frame(landmarks)
}

const WHEEL_SPAN: f64 = 0.3;

/// Two labeled hands on the wheel, the right knuckle rotated by `angle`
/// radians around the left one.
pub fn steering_hands(angle: f64) -> Vec<HandFrame> {
    let left_knuckle = Landmark::new(0.30, 0.50, 0.0);
    let right_knuckle = Landmark::new(
        left_knuckle.x + WHEEL_SPAN * angle.cos(),
        left_knuckle.y + WHEEL_SPAN * angle.sin(),
        0.0,
    );

    let hand_at = |knuckle: Landmark, handedness: Handedness| {
        let mut landmarks = vec![Landmark::new(knuckle.x, knuckle.y + 0.05, 0.0); HAND_LANDMARK_COUNT];
        landmarks[crate::input::hand::MIDDLE_MCP] = knuckle;
        HandFrame::new(landmarks, Some(handedness)).expect("rig produces a full 21-landmark hand")
    };

    vec![
        hand_at(left_knuckle, Handedness::Left),
        hand_at(right_knuckle, Handedness::Right),
    ]
}

const EYE_HALF_SPAN: f64 = 0.04;

fn face_landmarks(nose_offset_x: f64, iris_shift: f64, with_iris: bool) -> Vec<Landmark> {
    let count = if with_iris {
        FACE_LANDMARK_COUNT_WITH_IRIS
    } else {
        FACE_LANDMARK_COUNT
    };
    let mut landmarks = vec![Landmark::new(0.5, 0.5, 0.0); count];

    let mut set = |index: usize, x: f64, y: f64| {
        landmarks[index] = Landmark::new(x, y, 0.0);
    };
    set(face::NOSE, 0.5 + nose_offset_x, 0.55);
    set(face::LEFT_EAR, 0.30, 0.50);
    set(face::RIGHT_EAR, 0.70, 0.50);

    set(face::LEFT_EYE_OUTER, 0.36, 0.50);
    set(face::LEFT_EYE_INNER, 0.44, 0.50);
    set(face::LEFT_EYE_TOP, 0.40, 0.48);
    set(face::LEFT_EYE_BOTTOM, 0.40, 0.52);

    set(face::RIGHT_EYE_INNER, 0.56, 0.50);
    set(face::RIGHT_EYE_OUTER, 0.64, 0.50);
    set(face::RIGHT_EYE_TOP, 0.60, 0.48);
    set(face::RIGHT_EYE_BOTTOM, 0.60, 0.52);

    if with_iris {
        let dx = iris_shift * EYE_HALF_SPAN;
        set(face::LEFT_IRIS, 0.40 + dx, 0.50);
        set(face::RIGHT_IRIS, 0.60 + dx, 0.50);
    }

    landmarks
}

/// Face with the nose offset from the ear midpoint and both irises shifted by
/// `iris_shift` (fraction of the eye half-span, positive = image right).
pub fn face_frame(nose_offset_x: f64, iris_shift: f64) -> FaceFrame {
    FaceFrame::new(face_landmarks(nose_offset_x, iris_shift, true))
        .expect("rig produces a full face mesh")
}

/// Face mesh without the iris refinement points.
pub fn face_frame_without_iris(nose_offset_x: f64) -> FaceFrame {
    FaceFrame::new(face_landmarks(nose_offset_x, 0.0, false))
        .expect("rig produces a full face mesh")
}

/// A full scripted drive: hold still through calibration, pull away, adjust
/// throttle with the toes, lift off, brake, then make a left-right check with
/// the head while steering. Used by the demo binary and integration tests.
pub fn demo_drive(fps: f64) -> Vec<FrameInput> {
    let dt_ms = 1000.0 / fps;
    let total_frames = (8.0 * fps) as usize;
    let mut frames = Vec::with_capacity(total_frames);

    for i in 0..total_frames {
        let t = i as f64 / fps;
        let timestamp_ms = i as f64 * dt_ms;

        let pose_frame = if t < 3.4 {
            seated_pose()
        } else if t < 4.0 {
            // Pull away: slide toward the accelerator.
            accel_pose(0.05 * (t - 3.4) / 0.6)
        } else if t < 5.0 {
            // Hold the press position, easing the toes down for more power.
            accel_pose_with_toe_drop(0.05, 0.02 * (t - 4.0))
        } else if t < 5.2 {
            lifted_pose(0.005, 0.05)
        } else if t < 5.5 {
            seated_pose()
        } else if t < 6.5 {
            brake_pose(0.05)
        } else {
            seated_pose()
        };

        let wheel_angle = if (6.5..7.2).contains(&t) { -0.4 } else { 0.0 };
        let nose_offset = if (6.6..7.0).contains(&t) { 0.03 } else { 0.0 };

        frames.push(FrameInput {
            timestamp_ms,
            pose: Some(pose_frame),
            hands: steering_hands(wheel_angle),
            face: Some(face_frame(nose_offset, nose_offset * 10.0)),
        });
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rig_frames_are_well_formed() {
        assert_eq!(seated_landmarks().len(), POSE_LANDMARK_COUNT);
        assert_eq!(steering_hands(0.3).len(), 2);
        assert!(face_frame(0.0, 0.0).has_iris());
        assert!(!face_frame_without_iris(0.0).has_iris());
    }

    #[test]
    fn test_demo_drive_timestamps_advance() {
        let frames = demo_drive(30.0);
        assert!(frames.len() > 200);
        for pair in frames.windows(2) {
            assert!(pair[1].timestamp_ms > pair[0].timestamp_ms);
        }
    }
}
