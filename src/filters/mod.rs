//! Scalar smoothing filters for angle streams.
//!
//! Each filter smooths a single axis. Sensor fusion runs one filter per
//! phone axis and the pose stabilizer runs one per head axis.

/// Scalar Kalman filter with constant process and measurement noise
pub mod kalman;

/// Exponential moving average
pub mod exponential;

use crate::Result;

/// Trait for all single-axis angle filters
pub trait AngleFilter: Send + Sync {
    /// Feed a measurement and return the filtered value
    fn apply(&mut self, value: f64) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Reset filter state and seed it with a known value
    fn seed(&mut self, value: f64);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl AngleFilter for NoFilter {
    fn apply(&mut self, value: f64) -> f64 {
        value
    }

    fn reset(&mut self) {}

    fn seed(&mut self, _value: f64) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Create an angle filter by type name
///
/// Accepts `none`, `kalman`, `exponential` and `exponential:<alpha>`.
///
/// # Errors
///
/// Returns [`crate::Error::FilterError`] for unknown names or an alpha outside `(0, 1]`.
pub fn create_filter(filter_type: &str) -> Result<Box<dyn AngleFilter>> {
    let lower = filter_type.to_lowercase();
    let mut parts = lower.splitn(2, ':');
    let name = parts.next().unwrap_or_default();
    let param = parts.next();

    match (name, param) {
        ("none" | "nofilter", None) => Ok(Box::new(NoFilter)),
        ("kalman", None) => Ok(Box::new(kalman::KalmanFilter::default())),
        ("exponential" | "ema", None) => Ok(Box::new(exponential::ExponentialFilter::new(
            crate::constants::STABILIZER_SMOOTHING,
        ))),
        ("exponential" | "ema", Some(alpha)) => {
            let alpha: f64 = alpha
                .parse()
                .map_err(|_| crate::Error::FilterError(format!("Invalid alpha: {alpha}")))?;
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(crate::Error::FilterError(format!("Alpha must be in (0, 1], got {alpha}")));
            }
            Ok(Box::new(exponential::ExponentialFilter::new(alpha)))
        }
        _ => Err(crate::Error::FilterError(format!("Unknown filter type: {filter_type}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter() {
        let mut filter = NoFilter;
        assert_eq!(filter.apply(10.0), 10.0);
        filter.seed(3.0);
        assert_eq!(filter.apply(-4.0), -4.0);
    }

    #[test]
    fn test_create_filter() {
        assert!(create_filter("none").is_ok());
        assert!(create_filter("kalman").is_ok());
        assert!(create_filter("Exponential").is_ok());
        assert_eq!(create_filter("exponential:0.5").unwrap().name(), "ExponentialFilter");
        assert!(create_filter("exponential:0").is_err());
        assert!(create_filter("exponential:abc").is_err());
        assert!(create_filter("unknown").is_err());
    }
}
