//! Core value types shared by the geometry, tracking and calibration modules.

use crate::{
    constants::{DEFAULT_HISTORY_WINDOW, FINGER_CLASS_ID, FINGER_COUNT, MARKER_CLASS_ID, THUMB_CLASS_ID},
    utils::safe_cast::{f64_to_pixel, usize_to_f64},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Integer pixel coordinate in image space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Horizontal pixel coordinate
    pub x: i32,
    /// Vertical pixel coordinate
    pub y: i32,
}

impl PixelPoint {
    /// Create a new pixel point
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Create a pixel point from detector coordinates, truncating toward zero
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(f64_to_pixel(x), f64_to_pixel(y))
    }

    /// Euclidean distance to another point
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A 2D pixel coordinate with a bounded history of past samples.
///
/// The newest sample is the current position. Samples beyond the window are
/// dropped oldest-first, so velocity is always estimated from recent motion.
#[derive(Debug, Clone)]
pub struct TrackedPoint {
    history: VecDeque<PixelPoint>,
    window: usize,
}

impl TrackedPoint {
    /// Create a tracked point with the default history window
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self::with_window(x, y, DEFAULT_HISTORY_WINDOW)
    }

    /// Create a tracked point keeping at most `window` samples (at least one)
    #[must_use]
    pub fn with_window(x: f64, y: f64, window: usize) -> Self {
        let window = window.max(1);
        let mut history = VecDeque::with_capacity(window);
        history.push_back(PixelPoint::from_f64(x, y));
        Self { history, window }
    }

    /// Current horizontal coordinate
    #[must_use]
    pub fn x(&self) -> i32 {
        self.position().x
    }

    /// Current vertical coordinate
    #[must_use]
    pub fn y(&self) -> i32 {
        self.position().y
    }

    /// Current position
    #[must_use]
    pub fn position(&self) -> PixelPoint {
        // history is never empty: constructed with one sample and trimmed to window >= 1
        self.history.back().copied().unwrap_or_default()
    }

    /// Number of samples currently held
    #[must_use]
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Always false; a tracked point holds at least its current sample
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Euclidean distance between the current positions
    #[must_use]
    pub fn distance(&self, other: &Self) -> f64 {
        self.position().distance(&other.position())
    }

    /// Append a new sample, dropping the oldest beyond the window
    pub fn observe(&mut self, x: f64, y: f64) -> &mut Self {
        if self.history.len() >= self.window {
            self.history.pop_front();
        }
        self.history.push_back(PixelPoint::from_f64(x, y));
        self
    }

    /// Vertical velocity over the last `window` samples, in pixels per frame.
    ///
    /// Positive values mean the point is moving down the image. Returns 0 until
    /// at least `window` samples exist.
    #[must_use]
    pub fn velocity_y(&self, window: usize) -> f64 {
        let len = self.history.len();
        if window == 0 || len < window {
            return 0.0;
        }

        let newest = f64::from(self.history[len - 1].y);
        let oldest = f64::from(self.history[len - window].y);
        (newest - oldest) / usize_to_f64(window)
    }
}

impl PartialEq for TrackedPoint {
    fn eq(&self, other: &Self) -> bool {
        self.position() == other.position()
    }
}

/// One of the ten tracked digits.
///
/// The ordinal runs left to right across both hands and is used for neighbor
/// lookups and for recovering an identity from a sorted position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finger {
    /// Left hand pinky
    LeftPinky,
    /// Left hand ring finger
    LeftRing,
    /// Left hand middle finger
    LeftMiddle,
    /// Left hand index finger
    LeftIndex,
    /// Left thumb
    LeftThumb,
    /// Right thumb
    RightThumb,
    /// Right hand index finger
    RightIndex,
    /// Right hand middle finger
    RightMiddle,
    /// Right hand ring finger
    RightRing,
    /// Right hand pinky
    RightPinky,
}

impl Finger {
    /// All identities in ordinal order
    pub const ALL: [Self; FINGER_COUNT] = [
        Self::LeftPinky,
        Self::LeftRing,
        Self::LeftMiddle,
        Self::LeftIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::RightIndex,
        Self::RightMiddle,
        Self::RightRing,
        Self::RightPinky,
    ];

    /// Non-thumb fingers in left-to-right order
    pub const FINGERS: [Self; 8] = [
        Self::LeftPinky,
        Self::LeftRing,
        Self::LeftMiddle,
        Self::LeftIndex,
        Self::RightIndex,
        Self::RightMiddle,
        Self::RightRing,
        Self::RightPinky,
    ];

    /// Thumbs in left-to-right order
    pub const THUMBS: [Self; 2] = [Self::LeftThumb, Self::RightThumb];

    /// Stable ordinal 0-9
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Identity for an ordinal, `None` outside 0-9
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Snake-case name, e.g. `left_pinky`
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LeftPinky => "left_pinky",
            Self::LeftRing => "left_ring",
            Self::LeftMiddle => "left_middle",
            Self::LeftIndex => "left_index",
            Self::LeftThumb => "left_thumb",
            Self::RightThumb => "right_thumb",
            Self::RightIndex => "right_index",
            Self::RightMiddle => "right_middle",
            Self::RightRing => "right_ring",
            Self::RightPinky => "right_pinky",
        }
    }

    /// Whether this identity is a thumb
    #[must_use]
    pub const fn is_thumb(self) -> bool {
        matches!(self, Self::LeftThumb | Self::RightThumb)
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detection completeness of a processed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameState {
    /// No frame processed yet
    Initializing,
    /// All markers, fingers and thumbs detected
    Valid,
    /// Fewer than 4 markers
    MissingMarkers,
    /// Fewer than 8 fingers
    MissingFingers,
    /// Fewer than 2 thumbs
    MissingThumbs,
}

impl FrameState {
    /// Snake-case name of the state
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initializing => "initializing",
            Self::Valid => "valid",
            Self::MissingMarkers => "missing_markers",
            Self::MissingFingers => "missing_fingers",
            Self::MissingThumbs => "missing_thumbs",
        }
    }
}

impl fmt::Display for FrameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector box in pixel units, given by its center and extent
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BoundingBox {
    /// Center x
    pub cx: f64,
    /// Center y
    pub cy: f64,
    /// Box width
    pub width: f64,
    /// Box height
    pub height: f64,
}

impl BoundingBox {
    /// Create a box from center and extent
    #[must_use]
    pub const fn new(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        Self {
            cx,
            cy,
            width,
            height,
        }
    }
}

impl From<[f64; 4]> for BoundingBox {
    fn from([cx, cy, width, height]: [f64; 4]) -> Self {
        Self::new(cx, cy, width, height)
    }
}

impl From<BoundingBox> for [f64; 4] {
    fn from(bbox: BoundingBox) -> Self {
        [bbox.cx, bbox.cy, bbox.width, bbox.height]
    }
}

/// Object classes produced by the detection model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetectionClass {
    /// Non-thumb finger
    Finger,
    /// Thumb
    Thumb,
    /// Keyboard corner marker
    Marker,
}

impl DetectionClass {
    /// Map a detector class id, `None` for ids this crate does not consume
    #[must_use]
    pub const fn from_class_id(class_id: u32) -> Option<Self> {
        match class_id {
            FINGER_CLASS_ID => Some(Self::Finger),
            THUMB_CLASS_ID => Some(Self::Thumb),
            MARKER_CLASS_ID => Some(Self::Marker),
            _ => None,
        }
    }

    /// Detector class id
    #[must_use]
    pub const fn class_id(self) -> u32 {
        match self {
            Self::Finger => FINGER_CLASS_ID,
            Self::Thumb => THUMB_CLASS_ID,
            Self::Marker => MARKER_CLASS_ID,
        }
    }
}

/// One labeled, confidence-scored box from the detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Detector class id
    pub class_id: u32,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    /// Box in pixel units
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a detection for a known class
    #[must_use]
    pub const fn new(class: DetectionClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id: class.class_id(),
            confidence,
            bbox,
        }
    }

    /// Class of the detection, if known
    #[must_use]
    pub const fn class(&self) -> Option<DetectionClass> {
        DetectionClass::from_class_id(self.class_id)
    }
}

/// All detections of one camera frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    /// Frame width in pixels
    #[serde(default)]
    pub width: u32,
    /// Frame height in pixels
    #[serde(default)]
    pub height: u32,
    /// Detected boxes
    #[serde(default)]
    pub detections: Vec<Detection>,
}

impl DetectionFrame {
    /// Create a frame with the given pixel dimensions
    #[must_use]
    pub const fn new(width: u32, height: u32, detections: Vec<Detection>) -> Self {
        Self {
            width,
            height,
            detections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_initialization() {
        let p = TrackedPoint::new(3.0, 4.0);
        assert_eq!(p.x(), 3);
        assert_eq!(p.y(), 4);
    }

    #[test]
    fn test_point_truncates_samples() {
        let p = TrackedPoint::new(3.9, -4.9);
        assert_eq!(p.position(), PixelPoint::new(3, -4));
    }

    #[test]
    fn test_point_equality() {
        let p1 = TrackedPoint::new(3.0, 4.0);
        let mut p2 = TrackedPoint::new(0.0, 0.0);
        p2.observe(3.0, 4.0);
        assert_eq!(p1, p2);
    }

    #[test]
    fn test_point_distance() {
        let p1 = TrackedPoint::new(1.0, 2.0);
        let p2 = TrackedPoint::new(4.0, 6.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_observe() {
        let mut p = TrackedPoint::new(1.0, 2.0);
        p.observe(3.0, 4.0);
        assert_eq!(p.x(), 3);
        assert_eq!(p.y(), 4);
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn test_point_window_is_bounded() {
        let mut p = TrackedPoint::with_window(0.0, 0.0, 3);
        for i in 1..10 {
            p.observe(0.0, f64::from(i));
        }
        assert_eq!(p.len(), 3);
        assert_eq!(p.y(), 9);
    }

    #[test]
    fn test_point_velocity_y() {
        let mut p = TrackedPoint::new(1.0, 2.0);
        p.observe(1.0, 4.0);
        p.observe(1.0, 6.0);
        p.observe(1.0, 8.0);
        assert!((p.velocity_y(3) - (8.0 - 4.0) / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_velocity_y_short_history() {
        let mut p = TrackedPoint::new(1.0, 2.0);
        p.observe(1.0, 40.0);
        assert_eq!(p.velocity_y(3), 0.0);
        assert_eq!(p.velocity_y(0), 0.0);
    }

    #[test]
    fn test_fingers_by_index() {
        for (index, finger) in Finger::ALL.iter().enumerate() {
            assert_eq!(finger.index(), index);
            assert_eq!(Finger::from_index(index), Some(*finger));
        }
        assert_eq!(Finger::from_index(4), Some(Finger::LeftThumb));
        assert_eq!(Finger::from_index(9), Some(Finger::RightPinky));
        assert_eq!(Finger::from_index(10), None);
        assert_eq!(Finger::from_index(100), None);
    }

    #[test]
    fn test_finger_groups() {
        assert_eq!(Finger::ALL.len(), 10);
        assert!(Finger::FINGERS.iter().all(|f| !f.is_thumb()));
        assert!(Finger::THUMBS.iter().all(|f| f.is_thumb()));
        assert_eq!(Finger::LeftPinky.to_string(), "left_pinky");
    }

    #[test]
    fn test_frame_state_names() {
        assert_eq!(FrameState::Initializing.as_str(), "initializing");
        assert_eq!(FrameState::Valid.as_str(), "valid");
        assert_eq!(FrameState::MissingMarkers.as_str(), "missing_markers");
        assert_eq!(FrameState::MissingFingers.as_str(), "missing_fingers");
        assert_eq!(FrameState::MissingThumbs.as_str(), "missing_thumbs");
    }

    #[test]
    fn test_detection_class_ids() {
        assert_eq!(DetectionClass::from_class_id(0), Some(DetectionClass::Finger));
        assert_eq!(DetectionClass::from_class_id(1), Some(DetectionClass::Thumb));
        assert_eq!(DetectionClass::from_class_id(2), Some(DetectionClass::Marker));
        assert_eq!(DetectionClass::from_class_id(7), None);
    }

    #[test]
    fn test_detection_deserializes_bbox_array() {
        let yaml = "class_id: 2\nconfidence: 0.9\nbbox: [10.0, 20.0, 30.0, 40.0]\n";
        let detection: Detection = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(detection.class(), Some(DetectionClass::Marker));
        assert_eq!(detection.bbox, BoundingBox::new(10.0, 20.0, 30.0, 40.0));
    }
}
