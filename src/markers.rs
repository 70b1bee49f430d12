//! Keyboard marker geometry.
//!
//! Four fiducial markers sit just outside the keyboard corners. Their boxes are
//! sorted left to right and taken as bottom-left, top-left, top-right and
//! bottom-right. This holds only while camera roll and yaw stay close to zero;
//! it is not validated.

use crate::{
    constants::{MARKER_HEIGHT_FACTOR, PERSPECTIVE_WIDTH_FACTOR, REQUIRED_MARKERS},
    geometry::KeyboardCorners,
    types::{BoundingBox, PixelPoint, TrackedPoint},
    utils::safe_cast::f64_to_pixel,
};
use log::debug;
use std::f64::consts::FRAC_PI_2;

/// Box width with the perspective widening removed.
///
/// Boxes seen at an angle look wider; the angle is taken from the offset to a
/// reference marker above or below, and the width is divided by
/// `1 + 1.5 * angle`.
#[must_use]
pub fn corrected_box_width(bbox: &BoundingBox, reference: PixelPoint) -> f64 {
    let dx = (bbox.cx - f64::from(reference.x)).abs();
    let dy = (bbox.cy - f64::from(reference.y)).abs();

    let angle = if dy > 0.0 {
        (dx / dy).atan()
    } else if dx > 0.0 {
        FRAC_PI_2
    } else {
        0.0
    };
    let angle = angle.clamp(0.0, FRAC_PI_2);

    bbox.width / (1.0 + angle * PERSPECTIVE_WIDTH_FACTOR)
}

/// Marker centers in corner order
#[derive(Debug, Clone)]
struct MarkerCenters {
    bottom_left: TrackedPoint,
    top_left: TrackedPoint,
    top_right: TrackedPoint,
    bottom_right: TrackedPoint,
}

/// Resolves the four outer keyboard corners from marker boxes.
///
/// Corners are recomputed together whenever at least four boxes are seen;
/// otherwise the previous corners are kept.
#[derive(Debug, Clone)]
pub struct MarkerGeometry {
    centers: Option<MarkerCenters>,
    corners: KeyboardCorners,
    raw_boxes: Vec<BoundingBox>,
    history_window: usize,
}

impl MarkerGeometry {
    /// Create the geometry and resolve the given boxes
    #[must_use]
    pub fn new(boxes: &[BoundingBox], history_window: usize) -> Self {
        let mut geometry = Self {
            centers: None,
            corners: KeyboardCorners::default(),
            raw_boxes: Vec::new(),
            history_window,
        };
        geometry.update(boxes);
        geometry
    }

    /// Ingest the marker boxes of a new frame
    pub fn update(&mut self, boxes: &[BoundingBox]) {
        let mut sorted = boxes.to_vec();
        sorted.sort_by(|a, b| a.cx.total_cmp(&b.cx));
        self.raw_boxes = sorted;
        self.identify_markers();
    }

    fn identify_markers(&mut self) {
        if self.raw_boxes.len() < REQUIRED_MARKERS {
            debug!(
                "Only {} marker boxes, keeping previous corners",
                self.raw_boxes.len()
            );
            return;
        }

        let [bl_box, tl_box, tr_box, br_box] = [
            self.raw_boxes[0],
            self.raw_boxes[1],
            self.raw_boxes[2],
            self.raw_boxes[3],
        ];
        let window = self.history_window;
        let observe = |point: Option<TrackedPoint>, bbox: &BoundingBox| match point {
            Some(mut point) => {
                point.observe(bbox.cx, bbox.cy);
                point
            }
            None => TrackedPoint::with_window(bbox.cx, bbox.cy, window),
        };

        let previous = self.centers.take();
        let centers = MarkerCenters {
            bottom_left: observe(previous.as_ref().map(|c| c.bottom_left.clone()), &bl_box),
            top_left: observe(previous.as_ref().map(|c| c.top_left.clone()), &tl_box),
            top_right: observe(previous.as_ref().map(|c| c.top_right.clone()), &tr_box),
            bottom_right: observe(previous.map(|c| c.bottom_right), &br_box),
        };

        let bl = centers.bottom_left.position();
        let tl = centers.top_left.position();
        let tr = centers.top_right.position();
        let br = centers.bottom_right.position();

        // Each corner is corrected against the marker on the same vertical edge
        let half_extent = |bbox: &BoundingBox, reference: PixelPoint| {
            (
                corrected_box_width(bbox, reference) / 2.0,
                bbox.height * MARKER_HEIGHT_FACTOR / 2.0,
            )
        };
        let corner = |center: PixelPoint, dx: f64, dy: f64| {
            PixelPoint::new(
                f64_to_pixel(f64::from(center.x) + dx),
                f64_to_pixel(f64::from(center.y) + dy),
            )
        };

        let (w, h) = half_extent(&bl_box, tl);
        let bottom_left = corner(bl, -w, -h);
        let (w, h) = half_extent(&tl_box, bl);
        let top_left = corner(tl, -w, h);
        let (w, h) = half_extent(&tr_box, br);
        let top_right = corner(tr, w, h);
        let (w, h) = half_extent(&br_box, tr);
        let bottom_right = corner(br, w, -h);

        self.corners = KeyboardCorners {
            bottom_left: Some(bottom_left),
            top_left: Some(top_left),
            top_right: Some(top_right),
            bottom_right: Some(bottom_right),
        };
        self.centers = Some(centers);
    }

    /// Bottom-left keyboard corner
    #[must_use]
    pub const fn bottom_left(&self) -> Option<PixelPoint> {
        self.corners.bottom_left
    }

    /// Top-left keyboard corner
    #[must_use]
    pub const fn top_left(&self) -> Option<PixelPoint> {
        self.corners.top_left
    }

    /// Top-right keyboard corner
    #[must_use]
    pub const fn top_right(&self) -> Option<PixelPoint> {
        self.corners.top_right
    }

    /// Bottom-right keyboard corner
    #[must_use]
    pub const fn bottom_right(&self) -> Option<PixelPoint> {
        self.corners.bottom_right
    }

    /// All four corners
    #[must_use]
    pub const fn corners(&self) -> &KeyboardCorners {
        &self.corners
    }

    /// Corners in bottom-left, top-left, top-right, bottom-right order
    #[must_use]
    pub const fn all_marker_coordinates(&self) -> [Option<PixelPoint>; 4] {
        self.corners.as_array()
    }

    /// Whether any corner is still unknown
    #[must_use]
    pub fn any_markers_missing(&self) -> bool {
        self.corners.known_count() < REQUIRED_MARKERS
    }

    /// Whether all four corners are known
    #[must_use]
    pub fn all_markers_present(&self) -> bool {
        !self.any_markers_missing()
    }

    /// Marker boxes of the latest frame, sorted by center x
    #[must_use]
    pub fn raw_boxes(&self) -> &[BoundingBox] {
        &self.raw_boxes
    }

    /// Number of marker boxes in the latest frame
    #[must_use]
    pub fn detected_count(&self) -> usize {
        self.raw_boxes.len()
    }

    /// Tracked center of the bottom-left marker
    #[must_use]
    pub fn bottom_left_center(&self) -> Option<&TrackedPoint> {
        self.centers.as_ref().map(|c| &c.bottom_left)
    }
}
