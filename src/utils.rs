//! Small numeric helpers shared by the tracking and calibration code.

pub mod safe_cast;

use safe_cast::usize_to_f64;

/// Arithmetic mean of the values, or `None` when there are none
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        None
    } else {
        Some(sum / usize_to_f64(count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean() {
        assert_eq!(mean(vec![1.0, 2.0, 3.0, 4.0, 5.0]), Some(3.0));
        assert_eq!(mean(std::iter::once(-2.5)), Some(-2.5));
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(mean(Vec::<f64>::new()), None);
    }
}
