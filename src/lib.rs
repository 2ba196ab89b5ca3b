//! Webcam driving-control recognition.
//!
//! Turns per-frame pose/hand/face landmark streams into vehicle controls:
//! steering from the two-hand angle, throttle and brake from the right
//! foot's displacement and tilt against a calibrated neutral pose, and head
//! yaw/gaze for mirror-check objectives. The landmark detectors and the 3D
//! simulation sit on either side of this crate; its boundary is
//! [`input::FrameInput`] in and [`session::ControlOutput`] out.

pub mod calibration;
pub mod config;
pub mod filter;
pub mod gaze;
pub mod input;
pub mod pedals;
pub mod replay;
pub mod session;
pub mod simulate;
pub mod steering;
