use super::AngleFilter;
use crate::constants::{KALMAN_INITIAL_ERROR, KALMAN_MEASUREMENT_NOISE, KALMAN_PROCESS_NOISE};

/// Single-state Kalman filter for one orientation axis
///
/// The state is the angle itself with a constant-value motion model, so
/// prediction only grows the error covariance.
#[derive(Debug, Clone)]
pub struct KalmanFilter {
    // Estimated angle
    value: f64,
    // Error covariance
    error: f64,
    process_noise: f64,
    measurement_noise: f64,
}

impl KalmanFilter {
    /// Create a filter with explicit noise parameters
    ///
    /// # Panics
    ///
    /// Panics if either noise value is not strictly positive.
    #[must_use]
    pub fn new(process_noise: f64, measurement_noise: f64) -> Self {
        assert!(process_noise > 0.0, "Process noise must be positive");
        assert!(measurement_noise > 0.0, "Measurement noise must be positive");
        Self {
            value: 0.0,
            error: KALMAN_INITIAL_ERROR,
            process_noise,
            measurement_noise,
        }
    }

    fn predict(&mut self) {
        self.error += self.process_noise;
    }

    fn update(&mut self, measurement: f64) {
        let gain = self.error / (self.error + self.measurement_noise);
        self.value += gain * (measurement - self.value);
        self.error *= 1.0 - gain;
    }

    /// Current estimate
    #[must_use]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Current error covariance
    #[must_use]
    pub fn error_covariance(&self) -> f64 {
        self.error
    }
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new(KALMAN_PROCESS_NOISE, KALMAN_MEASUREMENT_NOISE)
    }
}

impl AngleFilter for KalmanFilter {
    fn apply(&mut self, value: f64) -> f64 {
        self.predict();
        self.update(value);
        self.value
    }

    fn reset(&mut self) {
        self.seed(0.0);
    }

    fn seed(&mut self, value: f64) {
        self.value = value;
        self.error = KALMAN_INITIAL_ERROR;
    }

    fn name(&self) -> &str {
        "KalmanFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kalman_filter() {
        let mut filter = KalmanFilter::default();

        // Large initial covariance lets the first measurement dominate
        let first = filter.apply(10.0);
        assert!((first - 10.0).abs() < 0.1);

        // Covariance shrinks, so later jumps are damped
        let second = filter.apply(20.0);
        assert!(second > first && second < 20.0);
    }

    #[test]
    fn test_kalman_gain_matches_closed_form() {
        let mut filter = KalmanFilter::default();
        filter.seed(0.0);
        let out = filter.apply(1.0);
        let p = KALMAN_INITIAL_ERROR + KALMAN_PROCESS_NOISE;
        let k = p / (p + KALMAN_MEASUREMENT_NOISE);
        assert!((out - k).abs() < 1e-12);
        assert!((filter.error_covariance() - (1.0 - k) * p).abs() < 1e-12);
    }

    #[test]
    fn test_seed_resets_covariance() {
        let mut filter = KalmanFilter::default();
        for _ in 0..50 {
            filter.apply(5.0);
        }
        assert!(filter.error_covariance() < KALMAN_INITIAL_ERROR);
        filter.seed(-3.0);
        assert_eq!(filter.value(), -3.0);
        assert_eq!(filter.error_covariance(), KALMAN_INITIAL_ERROR);
    }

    #[test]
    #[should_panic(expected = "Process noise must be positive")]
    fn test_invalid_noise() {
        let _ = KalmanFilter::new(0.0, 0.01);
    }
}
