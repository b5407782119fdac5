//! Phone orientation from gyroscope and accelerometer samples.
//!
//! A complementary filter blends gyro integration (accurate short-term,
//! drifts) with accelerometer tilt (noisy, drift-free), and each axis is
//! then smoothed by its own scalar filter (Kalman by default).
//!
//! Yaw has no absolute reference. It is integrated from the gyro only and
//! drifts, so it is meaningful as a relative heading over short windows.

use crate::{
    config::SensorFusionConfig,
    constants::{
        ACCEL_DEVIATION_LARGE, ACCEL_DEVIATION_SMALL, ACCEL_PENALTY_LARGE, ACCEL_PENALTY_SMALL, GRAVITY,
        GYRO_MOTION_PENALTY, GYRO_MOTION_THRESHOLD, SPECIAL_ANGLE_MIN_CONFIDENCE, SPECIAL_ANGLE_ROLL_TOLERANCE,
    },
    filters::{create_filter, kalman::KalmanFilter, AngleFilter},
    utils::{clamp_unit, normalize_degrees, safe_cast::elapsed_seconds},
    Result,
};
use log::{debug, trace};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One raw IMU reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSensorSample {
    /// Angular rate in rad/s (x: pitch axis, y: roll axis, z: yaw axis)
    pub gyro: Vector3<f64>,
    /// Specific force in m/s²
    pub accel: Vector3<f64>,
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: u64,
}

impl RawSensorSample {
    #[must_use]
    pub fn new(gyro: Vector3<f64>, accel: Vector3<f64>, timestamp_ms: u64) -> Self {
        Self {
            gyro,
            accel,
            timestamp_ms,
        }
    }

    /// Device lying still, screen up
    #[must_use]
    pub fn at_rest(timestamp_ms: u64) -> Self {
        Self::new(Vector3::zeros(), Vector3::new(0.0, 0.0, GRAVITY), timestamp_ms)
    }
}

/// Fused phone orientation in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhoneOrientation {
    pub pitch: f64,
    pub roll: f64,
    /// Relative heading; drifts over time
    pub yaw: f64,
    /// 0..1
    pub confidence: f64,
}

/// Tilt derived from the gravity direction alone
///
/// Returns `None` for a zero-magnitude (or non-finite) accelerometer vector.
#[must_use]
pub fn accelerometer_tilt(accel: &Vector3<f64>) -> Option<(f64, f64)> {
    let magnitude = accel.norm();
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return None;
    }
    let a = accel / magnitude;
    let pitch = (-a.x).atan2((a.y * a.y + a.z * a.z).sqrt()).to_degrees();
    let roll = a.y.atan2(a.z).to_degrees();
    Some((pitch, roll))
}

/// Confidence that the device is being held steady
///
/// Drops when the measured acceleration departs from 1 g or the angular
/// rate is high.
#[must_use]
pub fn motion_confidence(sample: &RawSensorSample) -> f64 {
    let mut confidence: f64 = 1.0;

    let accel_deviation = (sample.accel.norm() - GRAVITY).abs();
    if !accel_deviation.is_finite() || accel_deviation > ACCEL_DEVIATION_LARGE {
        confidence -= ACCEL_PENALTY_LARGE;
    } else if accel_deviation > ACCEL_DEVIATION_SMALL {
        confidence -= ACCEL_PENALTY_SMALL;
    }

    let rate = sample.gyro.norm();
    if !rate.is_finite() || rate > GYRO_MOTION_THRESHOLD {
        confidence -= GYRO_MOTION_PENALTY;
    }

    clamp_unit(confidence)
}

/// Complementary + per-axis smoothing orientation filter
pub struct OrientationFilter {
    gyro_weight: f64,
    pitch_filter: Box<dyn AngleFilter>,
    roll_filter: Box<dyn AngleFilter>,
    yaw_filter: Box<dyn AngleFilter>,
    // Complementary-filter state before smoothing
    blended: Option<(f64, f64, f64)>,
    last_timestamp_ms: u64,
}

impl OrientationFilter {
    /// Create a filter from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configured smoothing filter is unknown.
    pub fn new(config: &SensorFusionConfig) -> Result<Self> {
        Ok(Self {
            gyro_weight: config.gyro_weight,
            pitch_filter: axis_filter(config)?,
            roll_filter: axis_filter(config)?,
            yaw_filter: axis_filter(config)?,
            blended: None,
            last_timestamp_ms: 0,
        })
    }

    /// Forget all history; the next sample re-seeds from the accelerometer
    pub fn reset(&mut self) {
        self.pitch_filter.reset();
        self.roll_filter.reset();
        self.yaw_filter.reset();
        self.blended = None;
        self.last_timestamp_ms = 0;
        debug!("Orientation filter reset");
    }

    /// True once at least one sample has been fused
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.blended.is_some()
    }

    /// Fuse one sample into the running orientation estimate
    pub fn fuse(&mut self, sample: &RawSensorSample) -> PhoneOrientation {
        let Some((accel_pitch, accel_roll)) = accelerometer_tilt(&sample.accel) else {
            trace!("Zero-magnitude accelerometer sample at {} ms", sample.timestamp_ms);
            return PhoneOrientation::default();
        };

        let Some((prev_pitch, prev_roll, prev_yaw)) = self.blended else {
            // First sample: no gyro history, seed from gravity
            self.blended = Some((accel_pitch, accel_roll, 0.0));
            self.last_timestamp_ms = sample.timestamp_ms;
            self.pitch_filter.seed(accel_pitch);
            self.roll_filter.seed(accel_roll);
            self.yaw_filter.seed(0.0);
            debug!("Orientation seeded from accelerometer: pitch={accel_pitch:.2} roll={accel_roll:.2}");
            return PhoneOrientation {
                pitch: normalize_degrees(accel_pitch),
                roll: normalize_degrees(accel_roll),
                yaw: 0.0,
                confidence: motion_confidence(sample),
            };
        };

        let dt = elapsed_seconds(self.last_timestamp_ms, sample.timestamp_ms);
        self.last_timestamp_ms = self.last_timestamp_ms.max(sample.timestamp_ms);

        let rate = sample.gyro.map(|r| if r.is_finite() { r.to_degrees() } else { 0.0 });
        let gyro_pitch = prev_pitch + rate.x * dt;
        let gyro_roll = prev_roll + rate.y * dt;
        let gyro_yaw = prev_yaw + rate.z * dt;

        // Past vertical the gravity roll sits near ±180°; unwrap it around the
        // previous estimate so both sides of the seam blend continuously
        let accel_roll = prev_roll + normalize_degrees(accel_roll - prev_roll);

        let accel_weight = 1.0 - self.gyro_weight;
        let pitch = self.gyro_weight * gyro_pitch + accel_weight * accel_pitch;
        let roll = self.gyro_weight * gyro_roll + accel_weight * accel_roll;
        let yaw = normalize_degrees(gyro_yaw);
        self.blended = Some((pitch, roll, yaw));

        PhoneOrientation {
            pitch: normalize_degrees(self.pitch_filter.apply(pitch)),
            roll: normalize_degrees(self.roll_filter.apply(roll)),
            yaw: normalize_degrees(self.yaw_filter.apply(yaw)),
            confidence: motion_confidence(sample),
        }
    }
}

impl Default for OrientationFilter {
    fn default() -> Self {
        let config = SensorFusionConfig::default();
        Self {
            gyro_weight: config.gyro_weight,
            pitch_filter: Box::new(KalmanFilter::new(config.kalman_process_noise, config.kalman_measurement_noise)),
            roll_filter: Box::new(KalmanFilter::new(config.kalman_process_noise, config.kalman_measurement_noise)),
            yaw_filter: Box::new(KalmanFilter::new(config.kalman_process_noise, config.kalman_measurement_noise)),
            blended: None,
            last_timestamp_ms: 0,
        }
    }
}

fn axis_filter(config: &SensorFusionConfig) -> Result<Box<dyn AngleFilter>> {
    if config.smoothing.eq_ignore_ascii_case("kalman") {
        Ok(Box::new(KalmanFilter::new(config.kalman_process_noise, config.kalman_measurement_noise)))
    } else {
        create_filter(&config.smoothing)
    }
}

/// Phone orientation compared against a fixed pitch/roll target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhoneAngleCheck {
    pub valid: bool,
    pub pitch_valid: bool,
    pub roll_valid: bool,
    pub pitch_error: f64,
    pub roll_error: f64,
    /// 0..100, average of the per-axis linear scores
    pub score: f64,
}

/// Compare an orientation against a pitch/roll target with a symmetric tolerance
#[must_use]
pub fn validate_phone_orientation(
    orientation: &PhoneOrientation,
    target_pitch: f64,
    target_roll: f64,
    tolerance: f64,
) -> PhoneAngleCheck {
    let pitch_error = (orientation.pitch - target_pitch).abs();
    let roll_error = (orientation.roll - target_roll).abs();
    let axis_score = |error: f64| {
        if tolerance > 0.0 {
            (100.0 - error / tolerance * 100.0).max(0.0)
        } else {
            0.0
        }
    };
    PhoneAngleCheck {
        valid: pitch_error <= tolerance && roll_error <= tolerance,
        pitch_valid: pitch_error <= tolerance,
        roll_valid: roll_error <= tolerance,
        pitch_error,
        roll_error,
        score: (axis_score(pitch_error) + axis_score(roll_error)) / 2.0,
    }
}

/// Result of checking a steep (top-down or behind-the-head) phone angle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialAngleCheck {
    pub valid: bool,
    pub pitch_in_range: bool,
    pub roll_acceptable: bool,
    pub confidence: f64,
}

/// Check a pitch window for steep angles where a symmetric tolerance is too coarse
///
/// `min_pitch` and `max_pitch` may be given in either order. `roll_tolerance`
/// defaults to 10°. The orientation must also be confidently measured.
#[must_use]
pub fn validate_special_angle(
    orientation: &PhoneOrientation,
    min_pitch: f64,
    max_pitch: f64,
    roll_tolerance: Option<f64>,
) -> SpecialAngleCheck {
    let (lo, hi) = if min_pitch <= max_pitch {
        (min_pitch, max_pitch)
    } else {
        (max_pitch, min_pitch)
    };
    let pitch_in_range = (lo..=hi).contains(&orientation.pitch);
    let roll_acceptable = orientation.roll.abs() <= roll_tolerance.unwrap_or(SPECIAL_ANGLE_ROLL_TOLERANCE);
    SpecialAngleCheck {
        valid: pitch_in_range && roll_acceptable && orientation.confidence > SPECIAL_ANGLE_MIN_CONFIDENCE,
        pitch_in_range,
        roll_acceptable,
        confidence: orientation.confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tilted(pitch_deg: f64, timestamp_ms: u64) -> RawSensorSample {
        // Gravity vector producing the requested pitch with zero roll
        let p = pitch_deg.to_radians();
        RawSensorSample::new(
            Vector3::zeros(),
            Vector3::new(-p.sin() * GRAVITY, 0.0, p.cos() * GRAVITY),
            timestamp_ms,
        )
    }

    #[test]
    fn test_accelerometer_tilt() {
        let (pitch, roll) = accelerometer_tilt(&Vector3::new(0.0, 0.0, GRAVITY)).unwrap();
        assert_relative_eq!(pitch, 0.0);
        assert_relative_eq!(roll, 0.0);

        let (pitch, _) = accelerometer_tilt(&Vector3::new(GRAVITY, 0.0, 0.0)).unwrap();
        assert_relative_eq!(pitch, -90.0, epsilon = 1e-9);

        let (_, roll) = accelerometer_tilt(&Vector3::new(0.0, GRAVITY, 0.0)).unwrap();
        assert_relative_eq!(roll, 90.0, epsilon = 1e-9);

        assert!(accelerometer_tilt(&Vector3::zeros()).is_none());
    }

    #[test]
    fn test_first_sample_seeds_from_accelerometer() {
        let mut filter = OrientationFilter::default();
        let orientation = filter.fuse(&tilted(30.0, 1_000));
        assert_relative_eq!(orientation.pitch, 30.0, epsilon = 1e-9);
        assert_relative_eq!(orientation.roll, 0.0, epsilon = 1e-9);
        assert_eq!(orientation.yaw, 0.0);
        assert_relative_eq!(orientation.confidence, 1.0);
        assert!(filter.is_initialized());
    }

    #[test]
    fn test_zero_accel_yields_zero_confidence() {
        let mut filter = OrientationFilter::default();
        let sample = RawSensorSample::new(Vector3::zeros(), Vector3::zeros(), 0);
        let orientation = filter.fuse(&sample);
        assert_eq!(orientation, PhoneOrientation::default());
        assert!(!filter.is_initialized());
    }

    #[test]
    fn test_gyro_integration_moves_yaw() {
        let mut filter = OrientationFilter::default();
        filter.fuse(&RawSensorSample::at_rest(0));
        // 0.5 rad/s about z for 1 s ≈ 28.6°
        let mut sample = RawSensorSample::at_rest(1_000);
        sample.gyro = Vector3::new(0.0, 0.0, 0.5);
        filter.fuse(&sample);
        let blended_yaw = filter.blended.map(|(_, _, yaw)| yaw).unwrap();
        assert_relative_eq!(blended_yaw, 0.5_f64.to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_motion_confidence_penalties() {
        let mut sample = RawSensorSample::at_rest(0);
        assert_relative_eq!(motion_confidence(&sample), 1.0);

        sample.accel = Vector3::new(0.0, 0.0, GRAVITY + 1.5);
        assert_relative_eq!(motion_confidence(&sample), 0.9);

        sample.accel = Vector3::new(0.0, 0.0, GRAVITY + 3.0);
        assert_relative_eq!(motion_confidence(&sample), 0.7);

        sample.gyro = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(motion_confidence(&sample), 0.5);
    }

    #[test]
    fn test_reset_reseeds() {
        let mut filter = OrientationFilter::default();
        for i in 0..20 {
            filter.fuse(&tilted(10.0, i * 16));
        }
        filter.reset();
        assert!(!filter.is_initialized());
        let orientation = filter.fuse(&tilted(-40.0, 2_000));
        assert_relative_eq!(orientation.pitch, -40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_validate_phone_orientation() {
        let orientation = PhoneOrientation {
            pitch: 2.5,
            roll: -1.0,
            yaw: 0.0,
            confidence: 1.0,
        };
        let check = validate_phone_orientation(&orientation, 0.0, 0.0, 5.0);
        assert!(check.valid);
        assert_relative_eq!(check.pitch_error, 2.5);
        assert_relative_eq!(check.score, (50.0 + 80.0) / 2.0);

        let check = validate_phone_orientation(&orientation, 10.0, 0.0, 5.0);
        assert!(!check.pitch_valid);
        assert!(check.roll_valid);
    }

    #[test]
    fn test_validate_special_angle() {
        let orientation = PhoneOrientation {
            pitch: -88.0,
            roll: 4.0,
            yaw: 0.0,
            confidence: 0.9,
        };
        assert!(validate_special_angle(&orientation, -85.0, -95.0, None).valid);
        assert!(!validate_special_angle(&orientation, -85.0, -95.0, Some(3.0)).valid);

        let shaky = PhoneOrientation {
            confidence: 0.7,
            ..orientation
        };
        let check = validate_special_angle(&shaky, -95.0, -85.0, None);
        assert!(check.pitch_in_range && check.roll_acceptable);
        assert!(!check.valid);
    }
}
