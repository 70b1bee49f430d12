//! Configuration management for the camera-to-keyboard pipeline

use crate::{
    calibration::{create_calibration_strategy, CalibrationStrategy},
    constants::{
        DEFAULT_CALIBRATION_HISTORY, DEFAULT_HISTORY_WINDOW, DEFAULT_MAX_DOWN_FINGERS, DEFAULT_MAX_VELOCITY,
        DEFAULT_MIN_CONFIDENCE, DEFAULT_REPEATING_KEYS_DELAY, DEFAULT_SENSITIVITY, DEFAULT_VELOCITY_WINDOW,
    },
    keyboard_layout::KeyboardLayout,
    tracking::{create_tracking_strategy, TrackingStrategy},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detection filtering configuration
    pub detection: DetectionConfig,

    /// Key-down detection configuration
    pub key_down: KeyDownConfig,

    /// Calibration configuration
    pub calibration: CalibrationConfig,

    /// Finger tracking configuration
    pub tracking: TrackingConfig,

    /// Keyboard layout configuration
    pub keyboard: KeyboardConfig,

    /// Key output configuration
    pub input: InputConfig,
}

/// Per-class confidence thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Minimum confidence for marker boxes (0.0-1.0)
    pub markers_min_confidence: f32,

    /// Minimum confidence for finger boxes (0.0-1.0)
    pub fingers_min_confidence: f32,

    /// Minimum confidence for thumb boxes (0.0-1.0)
    pub thumbs_min_confidence: f32,
}

/// Key-down detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyDownConfig {
    /// Sensitivity (0.0-1.0], higher presses more easily
    pub sensitivity: f64,

    /// Frames used for the vertical velocity estimate
    pub velocity_window: usize,

    /// Downward velocity (pixels/frame) above which a finger is not down
    pub max_velocity: f64,

    /// More simultaneous down fingers than this is treated as noise
    pub max_down_fingers: usize,
}

/// Calibration parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Complete frames collected before baselines are computed
    pub history_size: usize,

    /// Calibration strategy: "adjacent_neighbor" or "hand_baseline"
    pub strategy: String,
}

/// Finger tracking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Identity assignment strategy
    pub strategy: String,

    /// Samples kept per tracked point
    pub history_window: usize,
}

/// Keyboard layout selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardConfig {
    /// Built-in layout name
    pub layout: String,

    /// Custom layout file, takes precedence over `layout`
    pub layout_file: Option<PathBuf>,
}

/// Key output parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Minimum seconds between two emissions of the same key
    pub repeating_keys_delay: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            markers_min_confidence: DEFAULT_MIN_CONFIDENCE,
            fingers_min_confidence: DEFAULT_MIN_CONFIDENCE,
            thumbs_min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl Default for KeyDownConfig {
    fn default() -> Self {
        Self {
            sensitivity: DEFAULT_SENSITIVITY,
            velocity_window: DEFAULT_VELOCITY_WINDOW,
            max_velocity: DEFAULT_MAX_VELOCITY,
            max_down_fingers: DEFAULT_MAX_DOWN_FINGERS,
        }
    }
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            history_size: DEFAULT_CALIBRATION_HISTORY,
            strategy: "adjacent_neighbor".to_string(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            strategy: "positional".to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            layout: "qwerty".to_string(),
            layout_file: None,
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            repeating_keys_delay: DEFAULT_REPEATING_KEYS_DELAY,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML does not describe a configuration
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Create the calibration strategy from configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown strategy name
    pub fn create_calibration_strategy(&self) -> Result<Box<dyn CalibrationStrategy>> {
        create_calibration_strategy(&self.calibration.strategy)
    }

    /// Create the tracking strategy from configuration
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown strategy name
    pub fn create_tracking_strategy(&self) -> Result<Box<dyn TrackingStrategy>> {
        create_tracking_strategy(&self.tracking.strategy)
    }

    /// Load the configured keyboard layout
    ///
    /// # Errors
    ///
    /// Returns an error if the layout is unknown, unreadable or invalid
    pub fn load_keyboard_layout(&self) -> Result<KeyboardLayout> {
        match &self.keyboard.layout_file {
            Some(path) => KeyboardLayout::from_file(path),
            None => KeyboardLayout::by_name(&self.keyboard.layout),
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value
    pub fn validate(&self) -> Result<()> {
        // Validate thresholds
        let thresholds = [
            ("Marker", self.detection.markers_min_confidence),
            ("Finger", self.detection.fingers_min_confidence),
            ("Thumb", self.detection.thumbs_min_confidence),
        ];
        for (class, threshold) in thresholds {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(Error::ConfigError(format!(
                    "{class} confidence threshold must be between 0.0 and 1.0"
                )));
            }
        }

        // Validate key-down parameters
        if !(self.key_down.sensitivity > 0.0 && self.key_down.sensitivity <= 1.0) {
            return Err(Error::ConfigError(
                "Sensitivity must be greater than 0.0 and at most 1.0".to_string(),
            ));
        }
        if self.key_down.velocity_window == 0 {
            return Err(Error::ConfigError(
                "Velocity window must be greater than 0".to_string(),
            ));
        }
        if self.key_down.max_down_fingers == 0 {
            return Err(Error::ConfigError(
                "Maximum down fingers must be greater than 0".to_string(),
            ));
        }

        // Validate history sizes
        if self.calibration.history_size == 0 {
            return Err(Error::ConfigError(
                "Calibration history size must be greater than 0".to_string(),
            ));
        }
        if self.tracking.history_window == 0 {
            return Err(Error::ConfigError(
                "Tracking history window must be greater than 0".to_string(),
            ));
        }

        if self.input.repeating_keys_delay.is_nan() || self.input.repeating_keys_delay < 0.0 {
            return Err(Error::ConfigError(
                "Repeating keys delay must not be negative".to_string(),
            ));
        }

        // Validate strategy names
        self.create_calibration_strategy()?;
        self.create_tracking_strategy()?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Camera-to-keyboard configuration

# Minimum detector confidence per class
detection:
  markers_min_confidence: 0.3
  fingers_min_confidence: 0.3
  thumbs_min_confidence: 0.3

# Key-down detection
key_down:
  sensitivity: 0.75        # (0.0-1.0], higher presses more easily
  velocity_window: 3       # frames
  max_velocity: 5.0        # pixels per frame
  max_down_fingers: 4

# Calibration
calibration:
  history_size: 100        # complete frames
  strategy: "adjacent_neighbor"   # or "hand_baseline" (deprecated)

# Finger tracking
tracking:
  strategy: "positional"
  history_window: 10

# Keyboard layout
keyboard:
  layout: "qwerty"
  layout_file: null        # path to a custom layout YAML

# Key output
input:
  repeating_keys_delay: 0.5   # seconds
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let config = Config::from_yaml_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let config = Config::from_yaml_str("key_down:\n  sensitivity: 0.5\n").unwrap();
        assert_eq!(config.key_down.sensitivity, 0.5);
        assert_eq!(config.key_down.velocity_window, DEFAULT_VELOCITY_WINDOW);
        assert_eq!(config.calibration.history_size, DEFAULT_CALIBRATION_HISTORY);
    }

    #[test]
    fn test_invalid_values() {
        let mut config = Config::default();
        config.detection.thumbs_min_confidence = 1.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = Config::default();
        config.key_down.sensitivity = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.calibration.history_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.input.repeating_keys_delay = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_strategy() {
        let mut config = Config::default();
        config.calibration.strategy = "median".to_string();
        assert!(matches!(config.validate(), Err(Error::UnknownStrategy(_))));
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            Config::from_yaml_str("key_down: [1, 2"),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_load_keyboard_layout() {
        let layout = Config::default().load_keyboard_layout().unwrap();
        assert_eq!(layout.name(), "qwerty");
    }
}
