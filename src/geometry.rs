//! Perspective geometry between image pixels and the keyboard surface.
//!
//! The keyboard is described by its four outer corners in pixel space. A
//! homography maps that quadrilateral onto the unit square with
//! bottom-left at `(0, 0)`, top-left at `(0, 1)`, bottom-right at `(1, 0)` and
//! top-right at `(1, 1)`; keyboard layouts are expressed in the same space.

use crate::{constants::EPSILON, types::PixelPoint, Error, Result};
use nalgebra::{Matrix3, SMatrix, SVector, Vector3};
use serde::{Deserialize, Serialize};

/// The four outer keyboard corners, any of which may be unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyboardCorners {
    /// Bottom-left corner
    pub bottom_left: Option<PixelPoint>,
    /// Top-left corner
    pub top_left: Option<PixelPoint>,
    /// Top-right corner
    pub top_right: Option<PixelPoint>,
    /// Bottom-right corner
    pub bottom_right: Option<PixelPoint>,
}

impl KeyboardCorners {
    /// Corners in bottom-left, top-left, top-right, bottom-right order
    #[must_use]
    pub const fn as_array(&self) -> [Option<PixelPoint>; 4] {
        [self.bottom_left, self.top_left, self.top_right, self.bottom_right]
    }

    /// Number of known corners
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.as_array().iter().flatten().count()
    }

    /// Fill in a single missing corner by completing the parallelogram.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than 3 corners are known
    pub fn completed(&self) -> Result<[(f64, f64); 4]> {
        let known = self.known_count();
        if known < 3 {
            return Err(Error::InvalidInput(format!(
                "At least 3 keyboard corners are required, got {known}"
            )));
        }

        let xy = |p: Option<PixelPoint>| p.map(|p| (f64::from(p.x), f64::from(p.y)));
        let opposite = |a: (f64, f64), b: (f64, f64), c: (f64, f64)| (a.0 + b.0 - c.0, a.1 + b.1 - c.1);

        // bl + tr == tl + br for a parallelogram
        let (bl, tl, tr, br) = match (
            xy(self.bottom_left),
            xy(self.top_left),
            xy(self.top_right),
            xy(self.bottom_right),
        ) {
            (Some(bl), Some(tl), Some(tr), Some(br)) => (bl, tl, tr, br),
            (None, Some(tl), Some(tr), Some(br)) => (opposite(tl, br, tr), tl, tr, br),
            (Some(bl), None, Some(tr), Some(br)) => (bl, opposite(bl, tr, br), tr, br),
            (Some(bl), Some(tl), None, Some(br)) => (bl, tl, opposite(tl, br, bl), br),
            (Some(bl), Some(tl), Some(tr), None) => (bl, tl, tr, opposite(bl, tr, tl)),
            _ => {
                return Err(Error::InvalidInput(
                    "At least 3 keyboard corners are required".to_string(),
                ))
            }
        };

        Ok([bl, tl, tr, br])
    }
}

/// Projective transform between two planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    matrix: Matrix3<f64>,
}

impl Homography {
    /// Solve the homography mapping each `source[i]` onto `target[i]`.
    ///
    /// Uses the exact four-point formulation with `H[2,2] = 1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the correspondences are degenerate (three or more
    /// collinear points)
    pub fn from_correspondences(source: &[(f64, f64); 4], target: &[(f64, f64); 4]) -> Result<Self> {
        let mut a = SMatrix::<f64, 8, 8>::zeros();
        let mut b = SVector::<f64, 8>::zeros();

        for (i, (&(x, y), &(u, v))) in source.iter().zip(target.iter()).enumerate() {
            let r0 = 2 * i;
            let r1 = 2 * i + 1;

            a[(r0, 0)] = x;
            a[(r0, 1)] = y;
            a[(r0, 2)] = 1.0;
            a[(r0, 6)] = -u * x;
            a[(r0, 7)] = -u * y;
            b[r0] = u;

            a[(r1, 3)] = x;
            a[(r1, 4)] = y;
            a[(r1, 5)] = 1.0;
            a[(r1, 6)] = -v * x;
            a[(r1, 7)] = -v * y;
            b[r1] = v;
        }

        let h = a
            .lu()
            .solve(&b)
            .ok_or_else(|| Error::Geometry("Degenerate corner configuration".to_string()))?;

        let matrix = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], 1.0);
        Ok(Self { matrix })
    }

    /// The 3x3 transform matrix
    #[must_use]
    pub const fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    /// Map a point, normalizing by the homogeneous coordinate.
    ///
    /// # Errors
    ///
    /// Returns an error if the point maps to infinity
    pub fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let mapped = self.matrix * Vector3::new(x, y, 1.0);
        let w = mapped[2];
        if w.abs() < EPSILON {
            return Err(Error::Geometry(format!("Point ({x}, {y}) maps to infinity")));
        }
        Ok((mapped[0] / w, mapped[1] / w))
    }
}

/// Homography from keyboard pixel corners onto the unit square.
///
/// # Errors
///
/// Returns an error if fewer than 3 corners are known or the corners are
/// degenerate
pub fn keyboard_homography(corners: &KeyboardCorners) -> Result<Homography> {
    let [bl, tl, tr, br] = corners.completed()?;
    Homography::from_correspondences(
        &[bl, tl, br, tr],
        &[(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)],
    )
}

/// Convert a finger pixel coordinate to keyboard-normalized coordinates.
///
/// # Errors
///
/// Returns an error if the finger coordinate is absent, fewer than 3 corners
/// are known, or the transform is degenerate
pub fn finger_to_keyboard_coordinates(
    corners: &KeyboardCorners,
    finger: Option<PixelPoint>,
) -> Result<(f64, f64)> {
    let finger = finger.ok_or_else(|| Error::InvalidInput("Invalid finger coordinates".to_string()))?;
    let homography = keyboard_homography(corners)?;
    homography.apply(f64::from(finger.x), f64::from(finger.y))
}

/// Camera orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EulerAngle {
    /// Rotation around the vertical axis
    pub yaw: f64,
    /// Tilt toward the keyboard
    pub pitch: f64,
    /// Rotation around the optical axis
    pub roll: f64,
}

/// Estimate the camera angle from the keyboard corners.
///
/// Yaw is the slope of the top edge; pitch is the angle of the top-left corner
/// below the optical center relative to the top edge length. Roll is not
/// observable from the markers and is always 0. Any missing corner yields all
/// zero angles.
#[must_use]
pub fn camera_angle_from_markers(corners: &KeyboardCorners, image_size: (u32, u32)) -> EulerAngle {
    let (Some(top_left), Some(top_right), Some(_), Some(_)) = (
        corners.top_left,
        corners.top_right,
        corners.bottom_right,
        corners.bottom_left,
    ) else {
        return EulerAngle::default();
    };

    let optical_center_y = f64::from(image_size.1) / 2.0;

    let dx = f64::from(top_right.x) - f64::from(top_left.x);
    let dy = f64::from(top_right.y) - f64::from(top_left.y);
    let yaw = dy.atan2(dx);

    let edge = dx.hypot(dy);
    let pitch = (f64::from(top_left.y) - optical_center_y).atan2(edge);

    EulerAngle {
        yaw: yaw.to_degrees(),
        pitch: pitch.to_degrees(),
        roll: 0.0,
    }
}
