use super::AngleFilter;

/// Exponential smoothing filter
#[derive(Debug, Clone)]
pub struct ExponentialFilter {
    alpha: f64,
    last: Option<f64>,
}

impl ExponentialFilter {
    /// # Panics
    ///
    /// Panics if `alpha` is outside `(0, 1]`.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!(alpha > 0.0 && alpha <= 1.0, "Alpha must be in (0, 1]");
        Self { alpha, last: None }
    }

    /// Last smoothed value, if any sample has been seen
    #[must_use]
    pub fn last(&self) -> Option<f64> {
        self.last
    }
}

impl AngleFilter for ExponentialFilter {
    fn apply(&mut self, value: f64) -> f64 {
        let filtered = match self.last {
            Some(last) => self.alpha * value + (1.0 - self.alpha) * last,
            None => value,
        };
        self.last = Some(filtered);
        filtered
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn seed(&mut self, value: f64) {
        self.last = Some(value);
    }

    fn name(&self) -> &str {
        "ExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_filter() {
        let mut filter = ExponentialFilter::new(0.3);

        // First value passes through
        assert_eq!(filter.apply(10.0), 10.0);

        // Second value is smoothed: 0.3 * 20 + 0.7 * 10
        assert!((filter.apply(20.0) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_reset_passes_next_value_through() {
        let mut filter = ExponentialFilter::new(0.5);
        filter.apply(10.0);
        filter.apply(30.0);
        filter.reset();
        assert_eq!(filter.last(), None);
        assert_eq!(filter.apply(-5.0), -5.0);
    }

    #[test]
    #[should_panic(expected = "Alpha must be in (0, 1]")]
    fn test_invalid_alpha() {
        let _ = ExponentialFilter::new(1.5);
    }
}
