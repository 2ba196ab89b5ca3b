// src/gaze.rs - Head yaw and gaze ratio from face mesh landmarks
//
// Yaw is the nose's horizontal offset from the ear midpoint. Gaze is the iris
// position inside each eye opening, averaged across both eyes and recentered,
// so it reads the eyes' direction within a roughly fixed head pose. Used for
// mirror-check objectives and distraction detection.

use crate::config::GazeConfig;
use crate::input::{face, FaceFrame};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GazeRead {
    /// Approximate head yaw in radians; positive = looking toward the
    /// camera's left in unmirrored image coordinates.
    pub head_yaw: f64,
    /// Horizontal gaze offset; 0 is straight ahead.
    pub gaze_x: f64,
    /// Vertical gaze offset; 0 is straight ahead.
    pub gaze_y: f64,
    /// False when the mesh lacks iris refinement; gaze stays at 0 then.
    pub iris_tracked: bool,
}

/// Iris position normalized into the span between two boundary landmarks.
/// 0.5 means centered; degenerate spans read as centered.
fn span_ratio(iris: f64, near: f64, far: f64) -> f64 {
    let span = far - near;
    if span.abs() < 1e-9 {
        return 0.5;
    }
    (iris - near) / span
}

pub fn estimate_gaze(frame: &FaceFrame, config: &GazeConfig) -> GazeRead {
    let nose = frame.get(face::NOSE);
    let left_ear = frame.get(face::LEFT_EAR);
    let right_ear = frame.get(face::RIGHT_EAR);

    let mid_ear_x = (left_ear.x + right_ear.x) / 2.0;
    let head_yaw = -(nose.x - mid_ear_x) * config.yaw_sensitivity;

    if !frame.has_iris() {
        return GazeRead {
            head_yaw,
            gaze_x: 0.0,
            gaze_y: 0.0,
            iris_tracked: false,
        };
    }

    let left_iris = frame.get(face::LEFT_IRIS);
    let right_iris = frame.get(face::RIGHT_IRIS);

    // Both ratios run left-to-right in image space; measuring each eye from
    // its nose-side corner would make the two eyes cancel when averaged.
    let left_x = span_ratio(
        left_iris.x,
        frame.get(face::LEFT_EYE_OUTER).x,
        frame.get(face::LEFT_EYE_INNER).x,
    );
    let right_x = span_ratio(
        right_iris.x,
        frame.get(face::RIGHT_EYE_INNER).x,
        frame.get(face::RIGHT_EYE_OUTER).x,
    );
    let gaze_x = ((left_x + right_x) / 2.0 - 0.5) * config.gaze_scale;

    let left_y = span_ratio(
        left_iris.y,
        frame.get(face::LEFT_EYE_TOP).y,
        frame.get(face::LEFT_EYE_BOTTOM).y,
    );
    let right_y = span_ratio(
        right_iris.y,
        frame.get(face::RIGHT_EYE_TOP).y,
        frame.get(face::RIGHT_EYE_BOTTOM).y,
    );
    let gaze_y = ((left_y + right_y) / 2.0 - 0.5) * config.gaze_scale;

    GazeRead {
        head_yaw,
        gaze_x,
        gaze_y,
        iris_tracked: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate;
    use approx::assert_relative_eq;

    fn config() -> GazeConfig {
        GazeConfig::default()
    }

    #[test]
    fn test_centered_face_reads_neutral() {
        let read = estimate_gaze(&simulate::face_frame(0.0, 0.0), &config());
        assert_relative_eq!(read.head_yaw, 0.0, epsilon = 1e-9);
        assert_relative_eq!(read.gaze_x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(read.gaze_y, 0.0, epsilon = 1e-9);
        assert!(read.iris_tracked);
    }

    #[test]
    fn test_yaw_follows_nose_offset() {
        let cfg = config();
        let read = estimate_gaze(&simulate::face_frame(0.02, 0.0), &cfg);
        assert_relative_eq!(read.head_yaw, -0.02 * cfg.yaw_sensitivity, epsilon = 1e-9);

        let opposite = estimate_gaze(&simulate::face_frame(-0.02, 0.0), &cfg);
        assert_relative_eq!(opposite.head_yaw, -read.head_yaw, epsilon = 1e-9);
    }

    #[test]
    fn test_gaze_follows_iris_shift() {
        let cfg = config();
        let left = estimate_gaze(&simulate::face_frame(0.0, 0.3), &cfg);
        let right = estimate_gaze(&simulate::face_frame(0.0, -0.3), &cfg);
        assert!(left.gaze_x != 0.0);
        assert_relative_eq!(left.gaze_x, -right.gaze_x, epsilon = 1e-9);
    }

    #[test]
    fn test_mesh_without_iris_degrades_to_yaw_only() {
        let cfg = config();
        let read = estimate_gaze(&simulate::face_frame_without_iris(0.02), &cfg);
        assert!(!read.iris_tracked);
        assert_eq!(read.gaze_x, 0.0);
        assert_eq!(read.gaze_y, 0.0);
        assert_relative_eq!(read.head_yaw, -0.02 * cfg.yaw_sensitivity, epsilon = 1e-9);
    }
}
