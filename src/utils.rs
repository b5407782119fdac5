//! Numeric helpers shared by the analyzers: clamping, angle wrapping and
//! safe conversions.

pub mod safe_cast;

/// Clamp a value to `[0, 1]`, mapping non-finite input to 0
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Clamp a value to `[0, 100]`, mapping non-finite input to 0
#[must_use]
pub fn clamp_percent(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Replace NaN and infinities with zero
#[must_use]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Wrap an angle in degrees into `(-180, 180]`
#[must_use]
pub fn normalize_degrees(angle: f64) -> f64 {
    if !angle.is_finite() {
        return 0.0;
    }
    let mut wrapped = angle % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

/// Smallest absolute difference between two headings, in degrees (`0..=180`)
#[must_use]
pub fn circular_difference(a: f64, b: f64) -> f64 {
    normalize_degrees(a - b).abs()
}

/// Linear falloff: 100 at the target, 0 at `tolerance` away or further
#[must_use]
pub fn linear_falloff(value: f64, target: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 || !value.is_finite() {
        return 0.0;
    }
    let deviation = (value - target).abs();
    if deviation >= tolerance {
        0.0
    } else {
        (tolerance - deviation) / tolerance * 100.0
    }
}

/// Half-sine falloff across `[min, max]`: 100 at the midpoint, 0 at and outside the edges
#[must_use]
pub fn sine_window(value: f64, min: f64, max: f64) -> f64 {
    if max <= min || !value.is_finite() || value < min || value > max {
        return 0.0;
    }
    let norm = (value - min) / (max - min);
    (norm * std::f64::consts::PI).sin() * 100.0
}
