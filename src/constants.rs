//! Constants used throughout the crate

/// Detector class id for finger boxes
pub const FINGER_CLASS_ID: u32 = 0;

/// Detector class id for thumb boxes
pub const THUMB_CLASS_ID: u32 = 1;

/// Detector class id for keyboard marker boxes
pub const MARKER_CLASS_ID: u32 = 2;

/// Number of tracked identities (8 fingers and 2 thumbs)
pub const FINGER_COUNT: usize = 10;

/// Number of non-thumb fingers required for a complete frame
pub const REQUIRED_FINGERS: usize = 8;

/// Number of thumbs required for a complete frame
pub const REQUIRED_THUMBS: usize = 2;

/// Number of markers required to resolve the keyboard corners
pub const REQUIRED_MARKERS: usize = 4;

/// Samples kept by a tracked point for velocity estimation
pub const DEFAULT_HISTORY_WINDOW: usize = 10;

/// Fingertip sits about a third of the box height below the box center
pub const FINGERTIP_OFFSET_FACTOR: f64 = 1.0 / 3.0;

/// Thumb tip sits at the bottom edge of the box
pub const THUMB_TIP_OFFSET_FACTOR: f64 = 0.5;

/// Marker boxes are taller than the printed marker by this factor
pub const MARKER_HEIGHT_FACTOR: f64 = 0.7;

/// Widening per radian of viewing angle in marker boxes
pub const PERSPECTIVE_WIDTH_FACTOR: f64 = 1.5;

/// Default detection confidence thresholds
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.3;

/// Default key-down sensitivity
pub const DEFAULT_SENSITIVITY: f64 = 0.75;

/// Frames used to estimate vertical velocity in the down detector
pub const DEFAULT_VELOCITY_WINDOW: usize = 3;

/// Downward velocity (pixels/frame) above which a finger is still settling
pub const DEFAULT_MAX_VELOCITY: f64 = 5.0;

/// More simultaneous down fingers than this is treated as noise
pub const DEFAULT_MAX_DOWN_FINGERS: usize = 4;

/// Valid frames collected before calibration baselines are computed
pub const DEFAULT_CALIBRATION_HISTORY: usize = 100;

/// Minimum delay between two emissions of the same key, in seconds
pub const DEFAULT_REPEATING_KEYS_DELAY: f64 = 0.5;

/// Key emitted by any thumb press
pub const SPACE_KEY: &str = " ";

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
