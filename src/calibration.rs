//! Per-finger resting offset calibration.
//!
//! While the user rests all ten digits on the keyboard, every complete frame is
//! collected. Once `history_size` frames are held, each finger's mean signed
//! offset to its reference is stored as its baseline and the history is
//! cleared. Key-down detection measures deviation from that baseline.

use crate::{
    constants::{REQUIRED_FINGERS, REQUIRED_THUMBS},
    tracking::FingerSnapshot,
    types::Finger,
    utils::{mean, safe_cast::usize_to_f64},
    Error, Result,
};
use log::{debug, info};
use std::collections::{BTreeMap, VecDeque};

/// Trait for calibration value strategies
pub trait CalibrationStrategy: Send + Sync {
    /// Signed vertical offset of `finger` against its reference in `snapshot`.
    ///
    /// Returns `None` when the finger or its reference is not detected.
    fn calculate_calibration_value(&self, snapshot: &FingerSnapshot, finger: Finger) -> Option<f64>;

    /// Get strategy name
    fn name(&self) -> &str;
}

/// Offset of each finger to a fixed adjacent finger on the same hand
pub struct AdjacentNeighborStrategy;

impl AdjacentNeighborStrategy {
    /// Reference finger used for `finger`
    #[must_use]
    pub const fn neighbor_of(finger: Finger) -> Finger {
        match finger {
            Finger::LeftPinky => Finger::LeftRing,
            Finger::LeftRing | Finger::LeftIndex => Finger::LeftMiddle,
            Finger::LeftMiddle | Finger::LeftThumb => Finger::LeftIndex,
            Finger::RightThumb | Finger::RightMiddle => Finger::RightIndex,
            Finger::RightIndex | Finger::RightRing => Finger::RightMiddle,
            Finger::RightPinky => Finger::RightRing,
        }
    }
}

impl CalibrationStrategy for AdjacentNeighborStrategy {
    fn calculate_calibration_value(&self, snapshot: &FingerSnapshot, finger: Finger) -> Option<f64> {
        let point = snapshot.get(finger)?;
        let neighbor = snapshot.get(Self::neighbor_of(finger))?;
        Some(f64::from(point.y()) - f64::from(neighbor.y()))
    }

    fn name(&self) -> &str {
        "AdjacentNeighborStrategy"
    }
}

/// Offset of each finger to the mean height of every other detected digit.
///
/// Deprecated: a pressing finger drags the mean of its own hand, so offsets are
/// noisier than with [`AdjacentNeighborStrategy`].
pub struct HandBaselineStrategy;

impl CalibrationStrategy for HandBaselineStrategy {
    fn calculate_calibration_value(&self, snapshot: &FingerSnapshot, finger: Finger) -> Option<f64> {
        let point = snapshot.get(finger)?;
        let baseline = mean(
            snapshot
                .detected()
                .filter(|(other, _)| *other != finger)
                .map(|(_, p)| f64::from(p.y())),
        )?;
        Some(f64::from(point.y()) - baseline)
    }

    fn name(&self) -> &str {
        "HandBaselineStrategy"
    }
}

/// Create a calibration strategy by name
///
/// # Errors
///
/// Returns an error for an unknown strategy name
pub fn create_calibration_strategy(name: &str) -> Result<Box<dyn CalibrationStrategy>> {
    match name.to_lowercase().as_str() {
        "adjacent_neighbor" | "adjacent" => Ok(Box::new(AdjacentNeighborStrategy)),
        "hand_baseline" => Ok(Box::new(HandBaselineStrategy)),
        _ => Err(Error::UnknownStrategy(format!("Unknown calibration strategy: {name}"))),
    }
}

/// Learns per-finger baselines from a rolling history of complete snapshots
pub struct Calibration {
    strategy: Box<dyn CalibrationStrategy>,
    history: VecDeque<FingerSnapshot>,
    history_size: usize,
    baselines: BTreeMap<Finger, f64>,
}

impl Calibration {
    /// Create an uncalibrated engine collecting `history_size` snapshots
    #[must_use]
    pub fn new(strategy: Box<dyn CalibrationStrategy>, history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            strategy,
            history: VecDeque::with_capacity(history_size),
            history_size,
            baselines: BTreeMap::new(),
        }
    }

    /// Create an engine using the adjacent-neighbor strategy
    #[must_use]
    pub fn adjacent_neighbor(history_size: usize) -> Self {
        Self::new(Box::new(AdjacentNeighborStrategy), history_size)
    }

    /// Add a snapshot to the history.
    ///
    /// Snapshots missing any finger or thumb are ignored. Returns `true` when
    /// this snapshot filled the history and baselines were computed.
    pub fn append(&mut self, snapshot: &FingerSnapshot) -> bool {
        if snapshot.thumb_coordinates().len() < REQUIRED_THUMBS
            || snapshot.finger_coordinates().len() < REQUIRED_FINGERS
        {
            debug!("Calibration snapshot rejected: incomplete hands");
            return false;
        }

        self.history.push_back(snapshot.clone());
        while self.history.len() > self.history_size {
            self.history.pop_front();
        }
        self.baselines.clear();

        if self.history.len() < self.history_size {
            return false;
        }

        self.baselines = self.compute_baselines();
        self.history.clear();
        info!(
            "Calibration completed with {} baselines ({})",
            self.baselines.len(),
            self.strategy.name()
        );
        true
    }

    fn compute_baselines(&self) -> BTreeMap<Finger, f64> {
        Finger::ALL
            .iter()
            .filter_map(|&finger| {
                let values = self
                    .history
                    .iter()
                    .filter_map(|entry| self.strategy.calculate_calibration_value(entry, finger));
                mean(values).map(|value| (finger, value))
            })
            .collect()
    }

    /// Signed offset of `finger` in `snapshot` using this engine's strategy
    #[must_use]
    pub fn calculate_calibration_value(&self, snapshot: &FingerSnapshot, finger: Finger) -> Option<f64> {
        self.strategy.calculate_calibration_value(snapshot, finger)
    }

    /// Baseline for `finger`, 0 until calibrated
    #[must_use]
    pub fn get_calibration_for(&self, finger: Finger) -> f64 {
        if let Some(&value) = self.baselines.get(&finger) {
            return value;
        }
        if self.baselines.is_empty() && self.history.len() >= self.history_size {
            return self.compute_baselines().get(&finger).copied().unwrap_or(0.0);
        }
        0.0
    }

    /// Whether baselines have been computed
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        !self.baselines.is_empty()
    }

    /// Fraction of the history filled, 1.0 once calibrated
    #[must_use]
    pub fn calibration_progress(&self) -> f64 {
        if self.is_calibrated() {
            return 1.0;
        }
        (usize_to_f64(self.history.len()) / usize_to_f64(self.history_size)).min(1.0)
    }

    /// Computed baselines by finger
    #[must_use]
    pub const fn baselines(&self) -> &BTreeMap<Finger, f64> {
        &self.baselines
    }

    /// Number of snapshots currently collected
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Snapshots required to complete calibration
    #[must_use]
    pub const fn history_size(&self) -> usize {
        self.history_size
    }

    /// Name of the calibration strategy
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Drop collected history and baselines
    pub fn reset(&mut self) {
        self.history.clear();
        self.baselines.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackedPoint;

    fn snapshot_with(heights: &[(Finger, f64)]) -> FingerSnapshot {
        FingerSnapshot::from_points(
            heights
                .iter()
                .map(|&(finger, y)| (finger, TrackedPoint::new(f64::from(finger.index() as u8) * 50.0, y))),
            40.0,
            50.0,
        )
    }

    fn full_snapshot(offset: f64) -> FingerSnapshot {
        let heights: Vec<_> = Finger::ALL
            .iter()
            .map(|&finger| (finger, 400.0 + f64::from(finger.index() as u8) * 2.0 + offset))
            .collect();
        snapshot_with(&heights)
    }

    #[test]
    fn test_neighbors() {
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::LeftPinky), Finger::LeftRing);
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::LeftIndex), Finger::LeftMiddle);
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::LeftThumb), Finger::LeftIndex);
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::RightThumb), Finger::RightIndex);
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::RightMiddle), Finger::RightIndex);
        assert_eq!(AdjacentNeighborStrategy::neighbor_of(Finger::RightPinky), Finger::RightRing);
    }

    #[test]
    fn test_adjacent_value() {
        let snapshot = snapshot_with(&[(Finger::LeftPinky, 410.0), (Finger::LeftRing, 400.0)]);
        let value = AdjacentNeighborStrategy.calculate_calibration_value(&snapshot, Finger::LeftPinky);
        assert_eq!(value, Some(10.0));
    }

    #[test]
    fn test_value_absent_without_neighbor() {
        let snapshot = snapshot_with(&[(Finger::LeftPinky, 410.0)]);
        for finger in Finger::ALL {
            assert_eq!(AdjacentNeighborStrategy.calculate_calibration_value(&snapshot, finger), None);
        }
    }

    #[test]
    fn test_hand_baseline_value() {
        let snapshot = snapshot_with(&[
            (Finger::LeftPinky, 410.0),
            (Finger::LeftRing, 400.0),
            (Finger::LeftMiddle, 420.0),
        ]);
        let value = HandBaselineStrategy.calculate_calibration_value(&snapshot, Finger::LeftPinky);
        assert_eq!(value, Some(0.0));
        let value = HandBaselineStrategy.calculate_calibration_value(&snapshot, Finger::LeftRing);
        assert_eq!(value, Some(-15.0));

        let lonely = snapshot_with(&[(Finger::LeftPinky, 410.0)]);
        assert_eq!(HandBaselineStrategy.calculate_calibration_value(&lonely, Finger::LeftPinky), None);
    }

    #[test]
    fn test_incomplete_snapshot_rejected() {
        let mut calibration = Calibration::adjacent_neighbor(2);
        let snapshot = snapshot_with(&[(Finger::LeftPinky, 410.0), (Finger::LeftRing, 400.0)]);
        assert!(!calibration.append(&snapshot));
        assert_eq!(calibration.history_len(), 0);
        assert_eq!(calibration.calibration_progress(), 0.0);
    }

    #[test]
    fn test_calibration_lifecycle() {
        let mut calibration = Calibration::adjacent_neighbor(3);
        assert!(!calibration.is_calibrated());
        assert_eq!(calibration.get_calibration_for(Finger::LeftPinky), 0.0);

        assert!(!calibration.append(&full_snapshot(0.0)));
        assert!((calibration.calibration_progress() - 1.0 / 3.0).abs() < 1e-12);
        assert!(!calibration.append(&full_snapshot(1.0)));
        assert!(calibration.append(&full_snapshot(2.0)));

        assert!(calibration.is_calibrated());
        assert_eq!(calibration.history_len(), 0);
        assert_eq!(calibration.calibration_progress(), 1.0);
        assert_eq!(calibration.baselines().len(), 10);
        // Pinky sits 2px above the ring finger in every frame
        assert_eq!(calibration.get_calibration_for(Finger::LeftPinky), -2.0);
        assert_eq!(calibration.get_calibration_for(Finger::RightPinky), 2.0);
    }

    #[test]
    fn test_append_after_calibration_starts_over() {
        let mut calibration = Calibration::adjacent_neighbor(1);
        assert!(calibration.append(&full_snapshot(0.0)));
        assert!(calibration.is_calibrated());

        // With a history of one every complete snapshot recalibrates
        assert!(calibration.append(&full_snapshot(0.0)));
        assert!(calibration.is_calibrated());
    }

    #[test]
    fn test_reset() {
        let mut calibration = Calibration::adjacent_neighbor(1);
        calibration.append(&full_snapshot(0.0));
        calibration.reset();
        assert!(!calibration.is_calibrated());
        assert_eq!(calibration.calibration_progress(), 0.0);
    }

    #[test]
    fn test_create_calibration_strategy() {
        assert_eq!(
            create_calibration_strategy("adjacent_neighbor").unwrap().name(),
            "AdjacentNeighborStrategy"
        );
        assert_eq!(create_calibration_strategy("hand_baseline").unwrap().name(), "HandBaselineStrategy");
        assert!(matches!(
            create_calibration_strategy("median"),
            Err(Error::UnknownStrategy(_))
        ));
    }
}
