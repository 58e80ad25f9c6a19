/// Smallest magnitude treated as non-zero by the filters.
pub const EPSILON: f64 = 1.0e-12;

/// The reciprocal of `x`, saturating instead of dividing by zero.
///
/// Values with `|x| < EPSILON` map to `sign(x) / EPSILON`.
///
/// # Example
///
/// ```
/// use stipple_imgproc::core::{perceptible_reciprocal, EPSILON};
///
/// assert_eq!(perceptible_reciprocal(4.0), 0.25);
/// assert_eq!(perceptible_reciprocal(0.0), 1.0 / EPSILON);
/// assert_eq!(perceptible_reciprocal(-0.0), -1.0 / EPSILON);
/// ```
#[inline]
pub fn perceptible_reciprocal(x: f64) -> f64 {
    if x.abs() >= EPSILON {
        return 1.0 / x;
    }
    if x.is_sign_negative() {
        -1.0 / EPSILON
    } else {
        1.0 / EPSILON
    }
}

/// Whether a blur sigma is too small to spread any weight.
#[inline]
pub fn is_degenerate_sigma(sigma: f64) -> bool {
    sigma.abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reciprocal_saturates() {
        assert_eq!(perceptible_reciprocal(-2.0), -0.5);
        assert_eq!(perceptible_reciprocal(1e-13), 1.0 / EPSILON);
        assert_eq!(perceptible_reciprocal(-1e-13), -1.0 / EPSILON);
        assert!(perceptible_reciprocal(0.0).is_finite());
    }

    #[test]
    fn degenerate_sigma() {
        assert!(is_degenerate_sigma(0.0));
        assert!(is_degenerate_sigma(-1e-13));
        assert!(!is_degenerate_sigma(0.5));
    }
}
