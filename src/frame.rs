//! Per-frame orchestration.
//!
//! [`FrameProcessor`] owns every piece of per-stream state: marker geometry,
//! finger tracks, calibration history and the locked-key map. Each call to
//! [`FrameProcessor::update`] runs one full cycle over a frame's detections:
//!
//! 1. Split detections into marker, finger and thumb boxes by class and
//!    confidence
//! 2. Update the marker geometry and finger tracker
//! 3. Classify frame completeness
//! 4. Feed complete frames to a running calibration
//! 5. Detect down fingers once calibrated
//! 6. Resolve down fingers to keys, keeping each press locked to its first key
//!
//! Frames must be fed in arrival order; velocity and calibration depend on it.

use crate::{
    calibration::Calibration,
    config::{Config, DetectionConfig},
    constants::{REQUIRED_FINGERS, REQUIRED_MARKERS, REQUIRED_THUMBS, SPACE_KEY},
    down_detector::FingerDownDetector,
    geometry::{camera_angle_from_markers, finger_to_keyboard_coordinates, EulerAngle},
    keyboard_layout::KeyboardLayout,
    markers::MarkerGeometry,
    tracking::{FingerSnapshot, FingerTracker},
    types::{BoundingBox, DetectionClass, DetectionFrame, Finger, FrameState, PixelPoint},
    Result,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::BTreeMap;

/// Events produced by processing one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[must_use]
pub struct FrameOutcome {
    /// This frame completed a running calibration
    pub calibration_completed: bool,
}

/// Read-only view of the latest processed frame for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameReport {
    /// Detection completeness
    pub state: FrameState,
    /// Known keyboard corners, bottom-left, top-left, top-right, bottom-right
    pub marker_coordinates: Vec<PixelPoint>,
    /// Detected non-thumb fingertips, left to right
    pub finger_coordinates: Vec<PixelPoint>,
    /// Detected thumb tips, left to right
    pub thumb_coordinates: Vec<PixelPoint>,
    /// Fingertips currently down
    pub down_finger_coordinates: Vec<PixelPoint>,
    /// Characters of the keys currently down
    pub down_keys: Vec<String>,
    /// Whether key-down detection is waiting for calibration
    pub requires_calibration: bool,
    /// Whether calibration frames are being collected
    pub calibration_in_progress: bool,
    /// Calibration progress (0.0-1.0)
    pub calibration_progress: f64,
}

/// Boxes of one frame split by class
#[derive(Debug, Default)]
struct ClassifiedBoxes {
    markers: Vec<BoundingBox>,
    fingers: Vec<BoundingBox>,
    thumbs: Vec<BoundingBox>,
}

/// Drives geometry, tracking, calibration and key-down detection frame by frame
pub struct FrameProcessor {
    thresholds: DetectionConfig,
    history_window: usize,
    max_down_fingers: usize,
    markers: Option<MarkerGeometry>,
    tracker: FingerTracker,
    calibration: Calibration,
    detector: FingerDownDetector,
    layout: KeyboardLayout,
    state: FrameState,
    is_calibrating: bool,
    frame_marker_count: usize,
    frame_size: (u32, u32),
    down_fingers: Vec<(Finger, PixelPoint)>,
    down_keys: Vec<String>,
    locked_keys: BTreeMap<Finger, String>,
}

impl FrameProcessor {
    /// Create a processor from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the keyboard layout
    /// cannot be loaded
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let tracker = FingerTracker::new(config.create_tracking_strategy()?, config.tracking.history_window);
        let calibration = Calibration::new(config.create_calibration_strategy()?, config.calibration.history_size);
        let detector = FingerDownDetector::new(config.key_down.sensitivity)
            .with_velocity_gate(config.key_down.velocity_window, config.key_down.max_velocity);
        let layout = config.load_keyboard_layout()?;

        info!(
            "Frame processor created: layout '{}', {} tracking, {} calibration over {} frames",
            layout.name(),
            tracker.strategy_name(),
            calibration.strategy_name(),
            calibration.history_size()
        );

        Ok(Self {
            thresholds: config.detection.clone(),
            history_window: config.tracking.history_window,
            max_down_fingers: config.key_down.max_down_fingers,
            markers: None,
            tracker,
            calibration,
            detector,
            layout,
            state: FrameState::Initializing,
            is_calibrating: false,
            frame_marker_count: 0,
            frame_size: (0, 0),
            down_fingers: Vec::new(),
            down_keys: Vec::new(),
            locked_keys: BTreeMap::new(),
        })
    }

    /// Process the detections of the next frame
    pub fn update(&mut self, frame: &DetectionFrame) -> FrameOutcome {
        self.frame_size = (frame.width, frame.height);

        let boxes = self.classify(frame);
        self.frame_marker_count = boxes.markers.len();
        match &mut self.markers {
            Some(markers) => markers.update(&boxes.markers),
            None => self.markers = Some(MarkerGeometry::new(&boxes.markers, self.history_window)),
        }
        self.tracker.update(&boxes.fingers, &boxes.thumbs);

        self.set_state();
        let outcome = self.handle_calibration();
        self.detect_down_fingers();
        self.map_down_fingers_to_keys();

        outcome
    }

    fn classify(&self, frame: &DetectionFrame) -> ClassifiedBoxes {
        let mut boxes = ClassifiedBoxes::default();
        for detection in &frame.detections {
            match detection.class() {
                Some(DetectionClass::Marker) if detection.confidence > self.thresholds.markers_min_confidence => {
                    boxes.markers.push(detection.bbox);
                }
                Some(DetectionClass::Finger) if detection.confidence > self.thresholds.fingers_min_confidence => {
                    boxes.fingers.push(detection.bbox);
                }
                Some(DetectionClass::Thumb) if detection.confidence > self.thresholds.thumbs_min_confidence => {
                    boxes.thumbs.push(detection.bbox);
                }
                Some(_) => {}
                None => warn!("Ignoring detection with unknown class id {}", detection.class_id),
            }
        }
        boxes
    }

    fn set_state(&mut self) {
        let snapshot = self.tracker.snapshot();
        let markers_present = self.frame_marker_count >= REQUIRED_MARKERS
            && self.markers.as_ref().is_some_and(MarkerGeometry::all_markers_present);

        let state = if !markers_present {
            FrameState::MissingMarkers
        } else if snapshot.finger_coordinates().len() < REQUIRED_FINGERS {
            FrameState::MissingFingers
        } else if snapshot.thumb_coordinates().len() < REQUIRED_THUMBS {
            FrameState::MissingThumbs
        } else {
            FrameState::Valid
        };

        if state != self.state {
            debug!("Frame state {} -> {}", self.state, state);
        }
        self.state = state;
    }

    fn handle_calibration(&mut self) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();
        if self.is_calibrating
            && self.state == FrameState::Valid
            && self.calibration.append(self.tracker.snapshot())
        {
            self.is_calibrating = false;
            outcome.calibration_completed = true;
            info!("Calibration complete");
        }
        outcome
    }

    fn detect_down_fingers(&mut self) {
        if self.requires_calibration() {
            self.down_fingers.clear();
            return;
        }

        let snapshot = self.tracker.snapshot();
        let down: Vec<_> = self
            .detector
            .down_fingers(snapshot, &self.calibration)
            .into_iter()
            .filter_map(|finger| snapshot.position(finger).map(|position| (finger, position)))
            .collect();

        self.down_fingers = cap_down_fingers(down, self.max_down_fingers);
        if !self.down_fingers.is_empty() {
            debug!(
                "Down fingers: {}",
                self.down_fingers
                    .iter()
                    .map(|(finger, _)| finger.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }

    fn map_down_fingers_to_keys(&mut self) {
        self.down_keys.clear();

        for &(finger, position) in &self.down_fingers {
            if let Some(key) = self.locked_keys.get(&finger) {
                self.down_keys.push(key.clone());
                continue;
            }

            if finger.is_thumb() {
                self.down_keys.push(SPACE_KEY.to_string());
                self.locked_keys.insert(finger, SPACE_KEY.to_string());
                continue;
            }

            let Some(markers) = &self.markers else {
                continue;
            };
            let (x, y) = match finger_to_keyboard_coordinates(markers.corners(), Some(position)) {
                Ok(coordinates) => coordinates,
                Err(e) => {
                    debug!("Cannot resolve key for {finger}: {e}");
                    continue;
                }
            };

            let key = self.layout.convert_coordinates_to_key(x, y);
            if key.is_empty() {
                debug!("{finger} at ({x:.3}, {y:.3}) is outside every key");
                continue;
            }
            if self.layout.is_modifier_key(key) {
                continue;
            }

            let value = self.layout.get_key_value(key).to_string();
            debug!("{finger} pressed {key}");
            self.down_keys.push(value.clone());
            self.locked_keys.insert(finger, value);
        }

        let down_fingers = &self.down_fingers;
        self.locked_keys
            .retain(|finger, _| down_fingers.iter().any(|(down, _)| down == finger));
    }

    /// Begin collecting calibration frames.
    ///
    /// Returns `false` without effect when already calibrated or already
    /// calibrating. Completion is reported by the [`FrameOutcome`] of the
    /// update that fills the history.
    pub fn start_calibration(&mut self) -> bool {
        if !self.requires_calibration() || self.is_calibrating {
            return false;
        }
        self.is_calibrating = true;
        info!(
            "Calibration started, collecting {} complete frames",
            self.calibration.history_size()
        );
        true
    }

    /// Detection completeness of the latest frame
    #[must_use]
    pub const fn state(&self) -> FrameState {
        self.state
    }

    /// Known keyboard corners, bottom-left, top-left, top-right, bottom-right
    #[must_use]
    pub fn marker_coordinates(&self) -> Vec<PixelPoint> {
        self.markers
            .as_ref()
            .map(|markers| markers.all_marker_coordinates().into_iter().flatten().collect())
            .unwrap_or_default()
    }

    /// Detected non-thumb fingertips, left to right
    #[must_use]
    pub fn finger_coordinates(&self) -> Vec<PixelPoint> {
        self.tracker.snapshot().finger_coordinates()
    }

    /// Detected thumb tips, left to right
    #[must_use]
    pub fn thumb_coordinates(&self) -> Vec<PixelPoint> {
        self.tracker.snapshot().thumb_coordinates()
    }

    /// Fingers currently down with their positions
    #[must_use]
    pub fn down_fingers(&self) -> &[(Finger, PixelPoint)] {
        &self.down_fingers
    }

    /// Positions of the fingers currently down
    #[must_use]
    pub fn down_finger_coordinates(&self) -> Vec<PixelPoint> {
        self.down_fingers.iter().map(|&(_, position)| position).collect()
    }

    /// Characters of the keys currently down, in finger order
    #[must_use]
    pub fn down_keys(&self) -> &[String] {
        &self.down_keys
    }

    /// Key a finger is locked to during its current press
    #[must_use]
    pub fn locked_key(&self, finger: Finger) -> Option<&str> {
        self.locked_keys.get(&finger).map(String::as_str)
    }

    /// Whether key-down detection is waiting for calibration
    #[must_use]
    pub fn requires_calibration(&self) -> bool {
        !self.calibration.is_calibrated()
    }

    /// Whether calibration frames are being collected
    #[must_use]
    pub const fn is_calibration_in_progress(&self) -> bool {
        self.is_calibrating
    }

    /// Calibration progress (0.0-1.0)
    #[must_use]
    pub fn calibration_progress(&self) -> f64 {
        self.calibration.calibration_progress()
    }

    /// Camera orientation estimated from the keyboard corners
    #[must_use]
    pub fn camera_angle(&self) -> EulerAngle {
        self.markers
            .as_ref()
            .map(|markers| camera_angle_from_markers(markers.corners(), self.frame_size))
            .unwrap_or_default()
    }

    /// Marker geometry, once a frame has been processed
    #[must_use]
    pub const fn markers(&self) -> Option<&MarkerGeometry> {
        self.markers.as_ref()
    }

    /// Finger positions of the latest frame
    #[must_use]
    pub const fn snapshot(&self) -> &FingerSnapshot {
        self.tracker.snapshot()
    }

    /// Calibration engine
    #[must_use]
    pub const fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Keyboard layout in use
    #[must_use]
    pub const fn layout(&self) -> &KeyboardLayout {
        &self.layout
    }

    /// Rendering view of the latest frame
    #[must_use]
    pub fn report(&self) -> FrameReport {
        FrameReport {
            state: self.state,
            marker_coordinates: self.marker_coordinates(),
            finger_coordinates: self.finger_coordinates(),
            thumb_coordinates: self.thumb_coordinates(),
            down_finger_coordinates: self.down_finger_coordinates(),
            down_keys: self.down_keys.clone(),
            requires_calibration: self.requires_calibration(),
            calibration_in_progress: self.is_calibrating,
            calibration_progress: self.calibration_progress(),
        }
    }
}

/// Drop the whole down set when it is larger than `max`
fn cap_down_fingers<T>(down: Vec<T>, max: usize) -> Vec<T> {
    if down.len() > max {
        warn!("{} fingers down at once, treating as noise", down.len());
        Vec::new()
    } else {
        down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Detection;

    fn marker_detections() -> Vec<Detection> {
        [
            [100.0, 300.0, 20.0, 20.0],
            [120.0, 100.0, 20.0, 20.0],
            [500.0, 100.0, 20.0, 20.0],
            [520.0, 300.0, 20.0, 20.0],
        ]
        .into_iter()
        .map(|bbox| Detection::new(DetectionClass::Marker, 0.9, bbox.into()))
        .collect()
    }

    fn hand_detections(fingers: usize, thumbs: usize) -> Vec<Detection> {
        let fingers = (0..fingers).map(|i| {
            let x = 150.0 + 40.0 * f64::from(u8::try_from(i).unwrap_or(0));
            Detection::new(DetectionClass::Finger, 0.8, BoundingBox::new(x, 200.0, 30.0, 45.0))
        });
        let thumbs = (0..thumbs).map(|i| {
            let x = 290.0 + 40.0 * f64::from(u8::try_from(i).unwrap_or(0));
            Detection::new(DetectionClass::Thumb, 0.8, BoundingBox::new(x, 200.0, 30.0, 60.0))
        });
        fingers.chain(thumbs).collect()
    }

    fn frame(markers: bool, fingers: usize, thumbs: usize) -> DetectionFrame {
        let mut detections = if markers { marker_detections() } else { Vec::new() };
        detections.extend(hand_detections(fingers, thumbs));
        DetectionFrame::new(640, 480, detections)
    }

    fn processor(history_size: usize) -> FrameProcessor {
        let mut config = Config::default();
        config.calibration.history_size = history_size;
        FrameProcessor::new(&config).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let processor = processor(5);
        assert_eq!(processor.state(), FrameState::Initializing);
        assert!(processor.marker_coordinates().is_empty());
        assert!(processor.requires_calibration());
        assert!(!processor.is_calibration_in_progress());
    }

    #[test]
    fn test_state_priority() {
        let mut processor = processor(5);

        let _ = processor.update(&frame(false, 8, 2));
        assert_eq!(processor.state(), FrameState::MissingMarkers);

        let _ = processor.update(&frame(true, 7, 2));
        assert_eq!(processor.state(), FrameState::MissingFingers);

        let _ = processor.update(&frame(true, 8, 1));
        assert_eq!(processor.state(), FrameState::MissingThumbs);

        let _ = processor.update(&frame(true, 8, 2));
        assert_eq!(processor.state(), FrameState::Valid);

        // Stale corners remain available but the frame still lacks markers
        let _ = processor.update(&frame(false, 8, 2));
        assert_eq!(processor.state(), FrameState::MissingMarkers);
        assert_eq!(processor.marker_coordinates().len(), 4);
    }

    #[test]
    fn test_confidence_threshold_is_strict() {
        let mut processor = processor(5);
        let mut detections = marker_detections();
        detections[0].confidence = 0.3;
        detections.extend(hand_detections(8, 2));

        let _ = processor.update(&DetectionFrame::new(640, 480, detections));
        assert_eq!(processor.state(), FrameState::MissingMarkers);
    }

    #[test]
    fn test_unknown_classes_are_ignored() {
        let mut processor = processor(5);
        let mut f = frame(true, 8, 2);
        f.detections.push(Detection {
            class_id: 7,
            confidence: 1.0,
            bbox: BoundingBox::new(1.0, 1.0, 1.0, 1.0),
        });
        let _ = processor.update(&f);
        assert_eq!(processor.state(), FrameState::Valid);
    }

    #[test]
    fn test_calibration_lifecycle() {
        let mut processor = processor(3);
        assert!(processor.start_calibration());
        assert!(!processor.start_calibration());
        assert!(processor.is_calibration_in_progress());

        assert!(!processor.update(&frame(true, 8, 2)).calibration_completed);
        // Incomplete frames are not collected
        assert!(!processor.update(&frame(true, 8, 1)).calibration_completed);
        assert!((processor.calibration_progress() - 1.0 / 3.0).abs() < 1e-12);
        assert!(!processor.update(&frame(true, 8, 2)).calibration_completed);
        assert!(processor.update(&frame(true, 8, 2)).calibration_completed);

        assert!(!processor.is_calibration_in_progress());
        assert!(!processor.requires_calibration());
        assert_eq!(processor.calibration_progress(), 1.0);
        assert!(!processor.start_calibration());

        // Completion is reported once
        assert!(!processor.update(&frame(true, 8, 2)).calibration_completed);
    }

    #[test]
    fn test_no_calibration_without_start() {
        let mut processor = processor(1);
        let _ = processor.update(&frame(true, 8, 2));
        assert!(processor.requires_calibration());
        assert_eq!(processor.calibration_progress(), 0.0);
    }

    #[test]
    fn test_report() {
        let mut processor = processor(5);
        let _ = processor.update(&frame(true, 8, 2));
        let report = processor.report();
        assert_eq!(report.state, FrameState::Valid);
        assert_eq!(report.marker_coordinates.len(), 4);
        assert_eq!(report.finger_coordinates.len(), 8);
        assert_eq!(report.thumb_coordinates.len(), 2);
        assert!(report.down_keys.is_empty());
        assert!(report.requires_calibration);
    }

    #[test]
    fn test_camera_angle_uses_frame_size() {
        let mut processor = processor(5);
        assert_eq!(processor.camera_angle(), EulerAngle::default());
        let _ = processor.update(&frame(true, 8, 2));
        let angle = processor.camera_angle();
        assert!(angle.yaw.abs() < 1.0);
        assert!(angle.pitch < 0.0);
    }

    #[test]
    fn test_cap_down_fingers() {
        assert_eq!(cap_down_fingers(vec![1, 2, 3, 4], 4), vec![1, 2, 3, 4]);
        assert!(cap_down_fingers(vec![1, 2, 3, 4, 5], 4).is_empty());
        assert!(cap_down_fingers(Vec::<u8>::new(), 4).is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.keyboard.layout = "dvorak".to_string();
        assert!(FrameProcessor::new(&config).is_err());
    }
}
