// src/main.rs
use std::path::PathBuf;

use anyhow::{bail, Result};

use drive_tracker::config::RecognitionConfig;
use drive_tracker::replay::{load_frames, SessionRecorder};
use drive_tracker::session::RecognitionSession;
use drive_tracker::simulate;

struct Args {
    config: Option<PathBuf>,
    replay: Option<PathBuf>,
    output_dir: PathBuf,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        replay: None,
        output_dir: PathBuf::from("sessions"),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => match iter.next() {
                Some(path) => args.config = Some(PathBuf::from(path)),
                None => bail!("--config needs a path"),
            },
            "--replay" => match iter.next() {
                Some(path) => args.replay = Some(PathBuf::from(path)),
                None => bail!("--replay needs a path"),
            },
            "--out" => match iter.next() {
                Some(path) => args.output_dir = PathBuf::from(path),
                None => bail!("--out needs a path"),
            },
            "--help" | "-h" => {
                println!(
                    "Usage: drive_tracker [--config <config.toml>] [--replay <frames.jsonl>] [--out <dir>]\n\n\
                     Replays a recorded landmark session through the recognizer, or runs the\n\
                     built-in scripted drive when no recording is given."
                );
                std::process::exit(0);
            }
            other => bail!("unknown argument: {other} (try --help)"),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => RecognitionConfig::load(path)?,
        None => RecognitionConfig::default(),
    };

    let frames = match &args.replay {
        Some(path) => {
            println!("Replaying recorded session: {}", path.display());
            load_frames(path)?
        }
        None => {
            println!("No recording given - running the built-in scripted drive (30 fps)");
            simulate::demo_drive(30.0)
        }
    };
    if frames.is_empty() {
        bail!("no frames to process");
    }

    let mut session = RecognitionSession::new(config);
    session.start_calibration();

    let mut recorder = SessionRecorder::new(None);
    let mut last_stage = session.stage();
    let mut last_summary = String::new();

    for frame in &frames {
        let output = *session.process_frame(frame);
        recorder.record(&output);

        if output.calibration_stage != last_stage {
            println!(
                "[{:7.0} ms] stage -> {}",
                output.timestamp_ms,
                output.calibration_stage.as_str()
            );
            last_stage = output.calibration_stage;
        }

        let summary = session.diagnostics().summary();
        if summary != last_summary {
            println!("[{:7.0} ms] {}", output.timestamp_ms, summary);
            last_summary = summary;
        }
    }

    let csv_path = recorder.export_csv(&args.output_dir)?;
    let report_path = recorder.write_report(&args.output_dir)?;

    println!("\nProcessed {} frames", recorder.frame_count());
    println!("Controls: {}", csv_path.display());
    println!("Report:   {}", report_path.display());

    Ok(())
}
