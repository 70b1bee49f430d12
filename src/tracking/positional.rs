use super::{FingerSnapshot, TrackingStrategy};
use crate::types::{BoundingBox, Finger};

/// Assigns identities by horizontal order, ignoring history.
///
/// The leftmost finger box becomes the left pinky and so on; the leftmost thumb
/// box becomes the left thumb. Surplus boxes are ignored and missing boxes
/// leave the rightmost identities unassigned.
pub struct PositionalTracking;

fn sorted_by_x(boxes: &[BoundingBox]) -> Vec<BoundingBox> {
    let mut sorted = boxes.to_vec();
    sorted.sort_by(|a, b| a.cx.total_cmp(&b.cx));
    sorted
}

impl TrackingStrategy for PositionalTracking {
    fn assign(
        &mut self,
        finger_boxes: &[BoundingBox],
        thumb_boxes: &[BoundingBox],
        _previous: &FingerSnapshot,
    ) -> Vec<(Finger, BoundingBox)> {
        let fingers = Finger::FINGERS.into_iter().zip(sorted_by_x(finger_boxes));
        let thumbs = Finger::THUMBS.into_iter().zip(sorted_by_x(thumb_boxes));
        fingers.chain(thumbs).collect()
    }

    fn name(&self) -> &str {
        "PositionalTracking"
    }
}
