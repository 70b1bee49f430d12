//! Replays recorded detector output through the camera-to-keyboard pipeline.

use anyhow::{Context, Result};
use camera_to_keyboard::{
    config::Config,
    frame::FrameProcessor,
    replay::{replay, Recording, ReplayOptions},
    throttle::RepeatingKeysThrottler,
};
use clap::Parser;
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Recorded detections to replay (YAML)
    #[arg(short, long)]
    recording: PathBuf,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Frame rate of the recording
    #[arg(long, default_value = "30")]
    fps: f64,

    /// Do not start calibration automatically
    #[arg(long)]
    no_calibrate: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    // Load configuration if provided
    let config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path.display());
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config file {}", config_path.display()))?
    } else {
        Config::default()
    };

    let recording = Recording::from_file(&args.recording)
        .with_context(|| format!("Failed to load recording {}", args.recording.display()))?;
    info!("Replaying {} frames at {} fps", recording.frames.len(), args.fps);

    let mut processor = FrameProcessor::new(&config)?;
    let mut throttler = RepeatingKeysThrottler::new(config.input.repeating_keys_delay);
    let options = ReplayOptions {
        fps: args.fps,
        calibrate: !args.no_calibrate,
    };

    let summary = replay(&mut processor, &mut throttler, &recording, options)?;

    match summary.calibrated_at {
        Some(frame) => info!("Calibrated at frame {frame}"),
        None if processor.requires_calibration() => warn!(
            "Calibration incomplete ({:.0}%), no keys were detected",
            processor.calibration_progress() * 100.0
        ),
        None => {}
    }
    info!("Processed {} frames, final state: {}", summary.frames, processor.state());

    println!("{}", summary.text);

    Ok(())
}
