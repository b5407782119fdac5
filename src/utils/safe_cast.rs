//! Safe numeric conversions for timestamps, counts and rounded scores

use crate::{Error, Result};

/// Convert a count to `f64`
///
/// Counts in this crate are histogram bins and buffer lengths, far below 2^52.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Counts stay well within the exact f64 range
pub fn usize_to_f64(value: usize) -> f64 {
    value as f64
}

/// Convert a millisecond timestamp or duration to `f64`
#[must_use]
#[allow(clippy::cast_precision_loss)] // Millisecond timestamps stay within the exact f64 range
pub fn u64_to_f64(value: u64) -> f64 {
    value as f64
}

/// Convert a histogram bin count to `f64`
#[must_use]
pub fn u32_to_f64(value: u32) -> f64 {
    f64::from(value)
}

/// Elapsed milliseconds between two monotonic timestamps, as seconds
///
/// Returns 0 when `now_ms` precedes `previous_ms`.
#[must_use]
pub fn elapsed_seconds(previous_ms: u64, now_ms: u64) -> f64 {
    u64_to_f64(now_ms.saturating_sub(previous_ms)) / 1000.0
}

/// Safely convert f64 to u32 with bounds checking
///
/// # Errors
///
/// Returns an error if the value is not finite or outside u32 range
#[allow(clippy::cast_possible_truncation)] // Truncation after bounds check is safe
#[allow(clippy::cast_sign_loss)] // Sign checked before the cast
pub fn f64_to_u32(value: f64) -> Result<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Ok(value as u32)
    } else {
        Err(Error::InvalidInput(format!("Value {value} cannot be safely converted to u32")))
    }
}

/// Round and clamp f64 to a u32 in `[min, max]`
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Clamping ensures safe truncation
#[allow(clippy::cast_sign_loss)] // Clamped to a non-negative range
pub fn f64_to_u32_clamp(value: f64, min: u32, max: u32) -> u32 {
    let (min, max) = if min <= max { (min, max) } else { (max, min) };

    if !value.is_finite() {
        return min;
    }

    let clamped = value.round().clamp(f64::from(min), f64::from(max));
    (clamped as u32).clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_elapsed_seconds() {
        assert_eq!(elapsed_seconds(1000, 1500), 0.5);
        assert_eq!(elapsed_seconds(1500, 1000), 0.0);
        assert_eq!(elapsed_seconds(0, 0), 0.0);
    }

    #[test]
    fn test_f64_to_u32() {
        assert_eq!(f64_to_u32(42.7).unwrap(), 42);
        assert_eq!(f64_to_u32(0.0).unwrap(), 0);

        assert!(f64_to_u32(-1.0).is_err());
        assert!(f64_to_u32(f64::NAN).is_err());
        assert!(f64_to_u32(f64::INFINITY).is_err());
        assert!(f64_to_u32(f64::from(u32::MAX) * 2.0).is_err());
    }

    #[test]
    fn test_f64_to_u32_clamp() {
        assert_eq!(f64_to_u32_clamp(50.4, 0, 100), 50);
        assert_eq!(f64_to_u32_clamp(50.5, 0, 100), 51);
        assert_eq!(f64_to_u32_clamp(-10.0, 0, 100), 0);
        assert_eq!(f64_to_u32_clamp(150.0, 0, 100), 100);
        assert_eq!(f64_to_u32_clamp(f64::NAN, 0, 100), 0);
        // Swapped bounds are tolerated
        assert_eq!(f64_to_u32_clamp(5.0, 10, 0), 5);
    }

    proptest! {
        #[test]
        fn prop_clamp_stays_in_range(value in any::<f64>(), min in 0u32..1000, span in 0u32..1000) {
            let max = min + span;
            let result = f64_to_u32_clamp(value, min, max);
            prop_assert!(result >= min && result <= max);
        }

        #[test]
        fn prop_elapsed_never_negative(a in any::<u64>(), b in any::<u64>()) {
            prop_assert!(elapsed_seconds(a, b) >= 0.0);
        }
    }
}
