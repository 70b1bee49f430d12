//! Finger and thumb tracking.
//!
//! Raw finger and thumb boxes are assigned to the ten [`Finger`] identities by a
//! [`TrackingStrategy`], then folded into per-identity [`TrackedPoint`]s so
//! velocity history survives across frames. The default strategy assigns
//! identities purely by horizontal order every frame.

/// Positional (sorted-by-x) identity assignment
pub mod positional;

use crate::{
    constants::{FINGERTIP_OFFSET_FACTOR, FINGER_COUNT, THUMB_TIP_OFFSET_FACTOR},
    types::{BoundingBox, Finger, PixelPoint, TrackedPoint},
    utils::{mean, safe_cast::usize_to_f64},
    Error, Result,
};
use log::debug;

/// Trait for identity assignment strategies
pub trait TrackingStrategy: Send + Sync {
    /// Assign this frame's boxes to finger identities.
    ///
    /// Each identity appears at most once. `previous` is the snapshot of the
    /// prior frame for strategies that match against history.
    fn assign(
        &mut self,
        finger_boxes: &[BoundingBox],
        thumb_boxes: &[BoundingBox],
        previous: &FingerSnapshot,
    ) -> Vec<(Finger, BoundingBox)>;

    /// Reset any internal state
    fn reset(&mut self) {}

    /// Get strategy name
    fn name(&self) -> &str;
}

/// Create a tracking strategy by name
///
/// # Errors
///
/// Returns an error for an unknown strategy name
pub fn create_tracking_strategy(name: &str) -> Result<Box<dyn TrackingStrategy>> {
    match name.to_lowercase().as_str() {
        "positional" | "sorted_x" => Ok(Box::new(positional::PositionalTracking)),
        _ => Err(Error::UnknownStrategy(format!("Unknown tracking strategy: {name}"))),
    }
}

/// Fingertip pixel position for a box of the given identity
#[must_use]
pub fn tip_position(finger: Finger, bbox: &BoundingBox) -> (f64, f64) {
    let factor = if finger.is_thumb() {
        THUMB_TIP_OFFSET_FACTOR
    } else {
        FINGERTIP_OFFSET_FACTOR
    };
    (bbox.cx, bbox.cy + bbox.height * factor)
}

/// Finger and thumb positions detected in one frame
#[derive(Debug, Clone, Default)]
pub struct FingerSnapshot {
    points: [Option<TrackedPoint>; FINGER_COUNT],
    average_finger_width: f64,
    average_finger_height: f64,
}

impl FingerSnapshot {
    /// Build a snapshot from explicit points and finger box extents
    #[must_use]
    pub fn from_points<I>(points: I, average_finger_width: f64, average_finger_height: f64) -> Self
    where
        I: IntoIterator<Item = (Finger, TrackedPoint)>,
    {
        let mut snapshot = Self {
            average_finger_width,
            average_finger_height,
            ..Self::default()
        };
        for (finger, point) in points {
            snapshot.points[finger.index()] = Some(point);
        }
        snapshot
    }

    /// Tracked point of a finger detected in this frame
    #[must_use]
    pub fn get(&self, finger: Finger) -> Option<&TrackedPoint> {
        self.points[finger.index()].as_ref()
    }

    /// Current position of a finger detected in this frame
    #[must_use]
    pub fn position(&self, finger: Finger) -> Option<PixelPoint> {
        self.get(finger).map(TrackedPoint::position)
    }

    /// Detected identities with their points, in ordinal order
    pub fn detected(&self) -> impl Iterator<Item = (Finger, &TrackedPoint)> + '_ {
        Finger::ALL
            .into_iter()
            .filter_map(move |finger| self.get(finger).map(|point| (finger, point)))
    }

    /// Positions of the detected non-thumb fingers, left pinky to right pinky
    #[must_use]
    pub fn finger_coordinates(&self) -> Vec<PixelPoint> {
        Finger::FINGERS
            .iter()
            .filter_map(|&finger| self.position(finger))
            .collect()
    }

    /// Positions of the detected thumbs, left then right
    #[must_use]
    pub fn thumb_coordinates(&self) -> Vec<PixelPoint> {
        Finger::THUMBS
            .iter()
            .filter_map(|&finger| self.position(finger))
            .collect()
    }

    /// Average width of this frame's finger boxes, 0 if none
    #[must_use]
    pub const fn average_finger_width(&self) -> f64 {
        self.average_finger_width
    }

    /// Average height of this frame's finger boxes, 0 if none
    #[must_use]
    pub const fn average_finger_height(&self) -> f64 {
        self.average_finger_height
    }
}

/// Maintains smoothed per-identity positions across frames
pub struct FingerTracker {
    strategy: Box<dyn TrackingStrategy>,
    tracks: [Option<TrackedPoint>; FINGER_COUNT],
    snapshot: FingerSnapshot,
    raw_finger_boxes: Vec<BoundingBox>,
    raw_thumb_boxes: Vec<BoundingBox>,
    history_window: usize,
}

impl FingerTracker {
    /// Create a tracker using the given identity assignment strategy
    #[must_use]
    pub fn new(strategy: Box<dyn TrackingStrategy>, history_window: usize) -> Self {
        Self {
            strategy,
            tracks: Default::default(),
            snapshot: FingerSnapshot::default(),
            raw_finger_boxes: Vec::new(),
            raw_thumb_boxes: Vec::new(),
            history_window,
        }
    }

    /// Create a tracker with positional identity assignment
    #[must_use]
    pub fn positional(history_window: usize) -> Self {
        Self::new(Box::new(positional::PositionalTracking), history_window)
    }

    /// Ingest the finger and thumb boxes of a new frame
    pub fn update(&mut self, finger_boxes: &[BoundingBox], thumb_boxes: &[BoundingBox]) {
        self.raw_finger_boxes = finger_boxes.to_vec();
        self.raw_thumb_boxes = thumb_boxes.to_vec();

        let assignments = self
            .strategy
            .assign(finger_boxes, thumb_boxes, &self.snapshot);

        let mut detected = [false; FINGER_COUNT];
        for (finger, bbox) in assignments {
            let (x, y) = tip_position(finger, &bbox);
            let index = finger.index();
            match &mut self.tracks[index] {
                Some(track) => {
                    track.observe(x, y);
                }
                slot @ None => *slot = Some(TrackedPoint::with_window(x, y, self.history_window)),
            }
            detected[index] = true;
        }

        let average_finger_width = mean(finger_boxes.iter().map(|b| b.width)).unwrap_or(0.0);
        let average_finger_height = mean(finger_boxes.iter().map(|b| b.height)).unwrap_or(0.0);

        let points = Finger::ALL
            .iter()
            .filter(|finger| detected[finger.index()])
            .filter_map(|&finger| self.tracks[finger.index()].clone().map(|p| (finger, p)));
        self.snapshot = FingerSnapshot::from_points(points, average_finger_width, average_finger_height);

        debug!(
            "Tracked {} of {} identities ({} finger boxes, {} thumb boxes)",
            detected.iter().filter(|&&d| d).count(),
            FINGER_COUNT,
            finger_boxes.len(),
            thumb_boxes.len()
        );
    }

    /// Positions detected in the latest frame
    #[must_use]
    pub const fn snapshot(&self) -> &FingerSnapshot {
        &self.snapshot
    }

    /// Finger boxes of the latest frame
    #[must_use]
    pub fn raw_finger_boxes(&self) -> &[BoundingBox] {
        &self.raw_finger_boxes
    }

    /// Thumb boxes of the latest frame
    #[must_use]
    pub fn raw_thumb_boxes(&self) -> &[BoundingBox] {
        &self.raw_thumb_boxes
    }

    /// Name of the identity assignment strategy
    #[must_use]
    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Forget all tracks and strategy state
    pub fn reset(&mut self) {
        self.tracks = Default::default();
        self.snapshot = FingerSnapshot::default();
        self.raw_finger_boxes.clear();
        self.raw_thumb_boxes.clear();
        self.strategy.reset();
    }

    /// Number of samples held for an identity, including undetected ones
    #[must_use]
    pub fn track_len(&self, finger: Finger) -> usize {
        self.tracks[finger.index()].as_ref().map_or(0, TrackedPoint::len)
    }
}

/// Average of the detected fingers' y coordinates
#[must_use]
pub fn mean_y(points: &[PixelPoint]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }
    let sum: f64 = points.iter().map(|p| f64::from(p.y)).sum();
    Some(sum / usize_to_f64(points.len()))
}
