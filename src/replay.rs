//! Replay of recorded detector output.
//!
//! A recording is a YAML list of frames, each with its pixel size and
//! detections. Replaying drives a [`FrameProcessor`] frame by frame and types
//! the throttled down keys, using `frame_index / fps` as the clock.

use crate::{
    frame::FrameProcessor,
    throttle::RepeatingKeysThrottler,
    types::DetectionFrame,
    utils::safe_cast::usize_to_f64,
    Error, Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detector output of a sequence of frames
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Frames in capture order
    #[serde(default)]
    pub frames: Vec<DetectionFrame>,
}

impl Recording {
    /// Load a recording from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse a recording from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not describe a recording
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// Replay options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayOptions {
    /// Frame rate used to derive timestamps
    pub fps: f64,
    /// Start calibration whenever it is required
    pub calibrate: bool,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            fps: 30.0,
            calibrate: true,
        }
    }
}

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    /// Frames processed
    pub frames: usize,
    /// Index of the frame that completed calibration
    pub calibrated_at: Option<usize>,
    /// Characters typed after throttling
    pub text: String,
}

/// Feed every frame of `recording` through `processor`
///
/// # Errors
///
/// Returns an error if `fps` is not positive
pub fn replay(
    processor: &mut FrameProcessor,
    throttler: &mut RepeatingKeysThrottler,
    recording: &Recording,
    options: ReplayOptions,
) -> Result<ReplaySummary> {
    if options.fps.is_nan() || options.fps <= 0.0 {
        return Err(Error::InvalidInput(format!("FPS must be positive, got {}", options.fps)));
    }

    let mut summary = ReplaySummary::default();
    for (index, frame) in recording.frames.iter().enumerate() {
        if options.calibrate && processor.requires_calibration() {
            processor.start_calibration();
        }

        let outcome = processor.update(frame);
        if outcome.calibration_completed {
            info!("Calibration completed at frame {index}");
            summary.calibrated_at = Some(index);
        }

        let now = usize_to_f64(index) / options.fps;
        for key in processor.down_keys() {
            if throttler.key_press_allowed(key, now) {
                debug!("Frame {index}: typed {key:?}");
                summary.text.push_str(key);
            }
        }
        summary.frames += 1;
    }

    Ok(summary)
}
