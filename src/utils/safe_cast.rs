//! Safe casting utilities for pixel coordinates

use crate::{Error, Result};

/// Safely convert f64 to i32 with bounds checking
///
/// The fractional part is truncated toward zero.
///
/// # Errors
///
/// Returns an error if the value is not finite or outside i32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
pub fn f64_to_i32(value: f64) -> Result<i32> {
    if value.is_finite() && value >= f64::from(i32::MIN) && value <= f64::from(i32::MAX) {
        Ok(value as i32)
    } else {
        Err(Error::InvalidInput(format!(
            "Value {value} cannot be safely converted to i32"
        )))
    }
}

/// Clamp and convert f64 to i32
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
pub fn f64_to_i32_clamp(value: f64, min: i32, max: i32) -> i32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if value.is_nan() {
        return min;
    }

    let clamped = value.clamp(f64::from(min), f64::from(max));
    (clamped as i32).clamp(min, max)
}

/// Convert a detector coordinate to an integer pixel, truncating toward zero.
///
/// Non-finite values collapse to 0 and out-of-range values saturate.
#[must_use]
pub fn f64_to_pixel(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    f64_to_i32_clamp(value.trunc(), i32::MIN, i32::MAX)
}

/// Convert a count to f64 for averaging
#[must_use]
#[allow(clippy::cast_precision_loss)] // Counts here are tiny
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_f64_to_i32() {
        assert_eq!(f64_to_i32(42.9).unwrap(), 42);
        assert_eq!(f64_to_i32(-42.9).unwrap(), -42);
        assert_eq!(f64_to_i32(0.0).unwrap(), 0);

        assert!(f64_to_i32(f64::INFINITY).is_err());
        assert!(f64_to_i32(f64::NEG_INFINITY).is_err());
        assert!(f64_to_i32(f64::NAN).is_err());
        assert!(f64_to_i32(f64::from(i32::MAX) * 2.0).is_err());
    }

    #[test]
    fn test_f64_to_i32_clamp() {
        assert_eq!(f64_to_i32_clamp(50.0, 0, 100), 50);
        assert_eq!(f64_to_i32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f64_to_i32_clamp(150.0, 0, 100), 100);
        assert_eq!(f64_to_i32_clamp(f64::NAN, 0, 100), 0);
        assert_eq!(f64_to_i32_clamp(50.0, 100, 0), 50);
    }

    #[test]
    fn test_f64_to_pixel_truncates_toward_zero() {
        assert_eq!(f64_to_pixel(3.11), 3);
        assert_eq!(f64_to_pixel(33.93), 33);
        assert_eq!(f64_to_pixel(-0.5), 0);
        assert_eq!(f64_to_pixel(-7.9), -7);
        assert_eq!(f64_to_pixel(f64::NAN), 0);
        assert_eq!(f64_to_pixel(f64::INFINITY), i32::MAX);
        assert_eq!(f64_to_pixel(f64::NEG_INFINITY), i32::MIN);
    }

    proptest! {
        #[test]
        fn prop_f64_to_i32_finite_within_bounds(value in i32::MIN..=i32::MAX) {
            let result = f64_to_i32(f64::from(value));
            prop_assert!(result.is_ok());
            prop_assert_eq!(result.unwrap(), value);
        }

        #[test]
        fn prop_f64_to_i32_clamp_always_within_bounds(
            value in any::<f64>(),
            min in any::<i32>(),
            max in any::<i32>()
        ) {
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            let result = f64_to_i32_clamp(value, min, max);
            prop_assert!(result >= min);
            prop_assert!(result <= max);
        }

        #[test]
        fn prop_f64_to_pixel_never_moves_away_from_zero(value in -1.0e6f64..1.0e6) {
            let pixel = f64::from(f64_to_pixel(value));
            prop_assert!(pixel.abs() <= value.abs());
            prop_assert!((pixel - value).abs() < 1.0);
        }
    }
}
