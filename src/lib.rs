//! Camera-to-keyboard library turning detector output into keystrokes.
//!
//! A camera looks at a printed keyboard with a fiducial marker at each corner.
//! An object detector (outside this crate) labels markers, fingers and thumbs
//! in every frame. This library turns those boxes into stable key-down events:
//! - Marker boxes are resolved into the four keyboard corners
//! - Fingertips are tracked per finger identity across frames
//! - A calibration phase learns each finger's resting offset
//! - Down fingers are detected against the calibrated offsets
//! - Fingertips are mapped through a perspective transform onto a keyboard layout
//!
//! # Examples
//!
//! ## Processing Frames
//!
//! ```no_run
//! use camera_to_keyboard::{config::Config, frame::FrameProcessor, types::DetectionFrame};
//!
//! # fn next_frame() -> Option<DetectionFrame> { None }
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut processor = FrameProcessor::new(&Config::default())?;
//!
//! while let Some(frame) = next_frame() {
//!     if processor.requires_calibration() {
//!         processor.start_calibration();
//!     }
//!
//!     let outcome = processor.update(&frame);
//!     if outcome.calibration_completed {
//!         println!("Calibrated");
//!     }
//!
//!     for key in processor.down_keys() {
//!         print!("{key}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Looking Up Keys
//!
//! ```
//! use camera_to_keyboard::keyboard_layout::KeyboardLayout;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let layout = KeyboardLayout::by_name("qwerty")?;
//!
//! let key = layout.convert_coordinates_to_key(0.459, 0.9);
//! assert_eq!(key, "space");
//! assert_eq!(layout.get_key_value(key), " ");
//! # Ok(())
//! # }
//! ```

/// Error types and result handling
pub mod error;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

/// Core value types: points, fingers, detections
pub mod types;

/// Perspective transform between image and keyboard
pub mod geometry;

/// Keyboard corner resolution from marker boxes
pub mod markers;

/// Finger and thumb identity tracking
pub mod tracking;

/// Per-finger resting offset calibration
pub mod calibration;

/// Key-down detection
pub mod down_detector;

/// Keyboard layouts and key lookup
pub mod keyboard_layout;

/// Per-frame orchestration
pub mod frame;

/// Rate limiting for held keys
pub mod throttle;

/// Replay of recorded detector output
pub mod replay;

/// Numeric helpers
pub mod utils;

pub use error::{Error, Result};
