//! Key-down detection against calibrated resting offsets.
//!
//! A finger is down when it has settled (no sharp downward motion), it is the
//! lowest digit in the image, and its offset to its reference has grown past
//! a threshold scaled by the finger box height. Only one finger can be the
//! lowest, so simultaneous presses by other fingers are not detected.

use crate::{
    calibration::Calibration,
    constants::{DEFAULT_MAX_VELOCITY, DEFAULT_SENSITIVITY, DEFAULT_VELOCITY_WINDOW},
    tracking::FingerSnapshot,
    types::Finger,
};
use log::debug;

/// Decides per finger whether it is pressing a key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FingerDownDetector {
    sensitivity: f64,
    velocity_window: usize,
    max_velocity: f64,
}

impl Default for FingerDownDetector {
    fn default() -> Self {
        Self::new(DEFAULT_SENSITIVITY)
    }
}

impl FingerDownDetector {
    /// Create a detector with the default velocity gate
    #[must_use]
    pub const fn new(sensitivity: f64) -> Self {
        Self {
            sensitivity,
            velocity_window: DEFAULT_VELOCITY_WINDOW,
            max_velocity: DEFAULT_MAX_VELOCITY,
        }
    }

    /// Override the velocity gate
    #[must_use]
    pub const fn with_velocity_gate(mut self, velocity_window: usize, max_velocity: f64) -> Self {
        self.velocity_window = velocity_window;
        self.max_velocity = max_velocity;
        self
    }

    /// Key-down sensitivity in (0, 1]
    #[must_use]
    pub const fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Offset growth needed for a press, in pixels
    #[must_use]
    pub fn threshold(&self, snapshot: &FingerSnapshot) -> f64 {
        snapshot.average_finger_height() * 2.0 * (1.0 - self.sensitivity)
    }

    /// Whether `finger` is down in `snapshot`
    #[must_use]
    pub fn is_finger_down(&self, snapshot: &FingerSnapshot, calibration: &Calibration, finger: Finger) -> bool {
        let Some(point) = snapshot.get(finger) else {
            return false;
        };

        let velocity = point.velocity_y(self.velocity_window);
        if velocity > self.max_velocity {
            debug!("{finger} still moving down ({velocity:.1} px/frame)");
            return false;
        }

        let Some(current) = calibration.calculate_calibration_value(snapshot, finger) else {
            return false;
        };
        let baseline = calibration.get_calibration_for(finger);
        let delta = current - baseline;

        let lowest = snapshot
            .detected()
            .filter(|(other, _)| *other != finger)
            .all(|(_, other)| other.y() < point.y());

        lowest && delta > self.threshold(snapshot)
    }

    /// All fingers that are down in `snapshot`, in ordinal order
    #[must_use]
    pub fn down_fingers(&self, snapshot: &FingerSnapshot, calibration: &Calibration) -> Vec<Finger> {
        Finger::ALL
            .into_iter()
            .filter(|&finger| self.is_finger_down(snapshot, calibration, finger))
            .collect()
    }
}
