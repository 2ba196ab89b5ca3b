// src/replay.rs - Session recording, export, and offline replay
//
// Records every published control tuple, writes a CSV plus a short plain-text
// report into a per-session directory, and loads recorded landmark frames
// back from JSON Lines so a drive can be re-run through the recognizer
// without a camera.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use tracing::info;

use crate::input::FrameInput;
use crate::session::{CalibrationStage, ControlOutput};

pub struct SessionRecorder {
    session_name: String,
    rows: Vec<ControlOutput>,
}

impl SessionRecorder {
    pub fn new(session_name: Option<String>) -> Self {
        let session_name = session_name
            .unwrap_or_else(|| format!("drive_{}", Local::now().format("%Y%m%d_%H%M%S")));
        Self {
            session_name,
            rows: Vec::new(),
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn record(&mut self, output: &ControlOutput) {
        self.rows.push(*output);
    }

    pub fn frame_count(&self) -> usize {
        self.rows.len()
    }

    pub fn export_csv(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let csv_path = output_dir
            .as_ref()
            .join(&self.session_name)
            .join("controls.csv");
        if let Some(parent) = csv_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = File::create(&csv_path)?;
        let mut writer = Writer::from_writer(file);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!(path = %csv_path.display(), frames = self.rows.len(), "controls exported");
        Ok(csv_path)
    }

    pub fn write_report(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let report_path = output_dir
            .as_ref()
            .join(&self.session_name)
            .join("report.txt");
        if let Some(parent) = report_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&report_path, self.build_report())?;
        Ok(report_path)
    }

    fn build_report(&self) -> String {
        let total = self.rows.len();
        let calibrated_at_ms = self
            .rows
            .iter()
            .find(|r| r.calibration_stage == CalibrationStage::Calibrated)
            .map(|r| r.timestamp_ms);
        let accel_engagements = rising_edges(&self.rows, |r| r.is_accel_pressed);
        let brake_engagements = rising_edges(&self.rows, |r| r.is_brake_pressed);
        let max_throttle = self.rows.iter().map(|r| r.throttle).fold(0.0, f64::max);
        let max_brake = self.rows.iter().map(|r| r.brake).fold(0.0, f64::max);
        let steered_frames = self
            .rows
            .iter()
            .filter(|r| r.steering_angle != 0.0)
            .count();

        let mut report = String::new();
        report.push_str(&format!("Drive Session Report - {}\n\n", self.session_name));
        report.push_str(&format!("Total frames: {}\n", total));
        match calibrated_at_ms {
            Some(ms) => report.push_str(&format!("Calibrated at: {:.0} ms\n", ms)),
            None => report.push_str("Calibrated at: never\n"),
        }
        report.push_str(&format!("Accelerator engagements: {}\n", accel_engagements));
        report.push_str(&format!("Brake engagements: {}\n", brake_engagements));
        report.push_str(&format!("Max throttle: {:.2}\n", max_throttle));
        report.push_str(&format!("Max brake: {:.2}\n", max_brake));
        report.push_str(&format!("Frames with steering input: {}\n", steered_frames));
        report
    }
}

fn rising_edges(rows: &[ControlOutput], pressed: impl Fn(&ControlOutput) -> bool) -> usize {
    let mut count = 0;
    let mut was_pressed = false;
    for row in rows {
        let is_pressed = pressed(row);
        if is_pressed && !was_pressed {
            count += 1;
        }
        was_pressed = is_pressed;
    }
    count
}

/// Load recorded landmark frames from a JSON Lines file, one `FrameInput`
/// per line. Blank lines are skipped; malformed lines abort with context.
pub fn load_frames(path: impl AsRef<Path>) -> Result<Vec<FrameInput>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut frames = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let frame: FrameInput = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", path.display(), line_no + 1))?;
        frames.push(frame);
    }
    Ok(frames)
}

/// Write frames as JSON Lines, the format `load_frames` reads back.
pub fn save_frames(path: impl AsRef<Path>, frames: &[FrameInput]) -> Result<()> {
    let mut out = String::new();
    for frame in frames {
        out.push_str(&serde_json::to_string(frame)?);
        out.push('\n');
    }
    fs::write(path.as_ref(), out)
        .with_context(|| format!("writing {}", path.as_ref().display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate;

    fn output_at(timestamp_ms: f64, accel: bool) -> ControlOutput {
        ControlOutput {
            timestamp_ms,
            throttle: if accel { 0.5 } else { 0.0 },
            is_accel_pressed: accel,
            calibration_stage: CalibrationStage::Calibrated,
            ..ControlOutput::default()
        }
    }

    #[test]
    fn test_report_counts_engagements() {
        let mut recorder = SessionRecorder::new(Some("test".into()));
        for (i, accel) in [false, true, true, false, true, false].iter().enumerate() {
            recorder.record(&output_at(i as f64 * 33.0, *accel));
        }

        let report = recorder.build_report();
        assert!(report.contains("Total frames: 6"), "got: {}", report);
        assert!(report.contains("Accelerator engagements: 2"), "got: {}", report);
        assert!(report.contains("Calibrated at: 0 ms"), "got: {}", report);
    }

    #[test]
    fn test_csv_and_report_round_trip_to_disk() {
        let dir = std::env::temp_dir().join("drive_tracker_replay_test");
        let _ = fs::remove_dir_all(&dir);

        let mut recorder = SessionRecorder::new(Some("unit".into()));
        recorder.record(&output_at(0.0, false));
        recorder.record(&output_at(33.0, true));

        let csv_path = recorder.export_csv(&dir).unwrap();
        let content = fs::read_to_string(&csv_path).unwrap();
        assert!(content.contains("timestamp_ms"));
        assert!(content.contains("calibrated"));

        let report_path = recorder.write_report(&dir).unwrap();
        assert!(fs::read_to_string(report_path)
            .unwrap()
            .contains("Total frames: 2"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_frames_round_trip_through_jsonl() {
        let path = std::env::temp_dir().join("drive_tracker_frames_test.jsonl");
        let frames = simulate::demo_drive(10.0);
        save_frames(&path, &frames[..20]).unwrap();

        let loaded = load_frames(&path).unwrap();
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded[5], frames[5]);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_load_rejects_malformed_lines() {
        let path = std::env::temp_dir().join("drive_tracker_bad_frames_test.jsonl");
        fs::write(&path, "{\"timestamp_ms\":0.0}\nnot json\n").unwrap();
        assert!(load_frames(&path).is_err());
        fs::remove_file(path).unwrap();
    }
}
