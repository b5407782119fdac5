//! Gyroscope zero-offset calibration.
//!
//! The device is held still while a fixed number of samples is collected;
//! their mean angular rate becomes the bias subtracted from every later
//! sample.

use crate::{
    constants::{CALIBRATION_MAX_GYRO_STD_DEV, GRAVITY},
    sensor_fusion::RawSensorSample,
    utils::safe_cast::usize_to_f64,
    Error, Result,
};
use log::{info, warn};
use nalgebra::Vector3;

/// Completed calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorCalibration {
    /// Mean gyro rate while stationary, rad/s
    pub gyro_bias: Vector3<f64>,
    /// Mean accelerometer magnitude while stationary, m/s²
    pub gravity_magnitude: f64,
    /// Samples used
    pub sample_count: usize,
}

enum CalibrationState {
    Collecting { samples: Vec<RawSensorSample>, target: usize },
    Calibrated(SensorCalibration),
}

/// Collects stationary samples and applies the resulting gyro bias
pub struct SensorCalibrator {
    state: CalibrationState,
}

impl SensorCalibrator {
    /// # Panics
    ///
    /// Panics if `samples` is zero.
    #[must_use]
    pub fn new(samples: usize) -> Self {
        assert!(samples > 0, "Calibration needs at least one sample");
        Self {
            state: CalibrationState::Collecting {
                samples: Vec::with_capacity(samples),
                target: samples,
            },
        }
    }

    /// Feed one stationary sample
    ///
    /// Returns `Ok(Some(_))` once enough samples have been collected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CalibrationError`] when the collected samples show the
    /// device was moving. Collection restarts in that case.
    pub fn add_sample(&mut self, sample: &RawSensorSample) -> Result<Option<SensorCalibration>> {
        if let CalibrationState::Calibrated(calibration) = &self.state {
            return Ok(Some(*calibration));
        }
        let CalibrationState::Collecting { samples, target } = &mut self.state else {
            return Ok(None);
        };

        samples.push(*sample);
        if samples.len() < *target {
            return Ok(None);
        }

        let n = usize_to_f64(samples.len());
        let bias: Vector3<f64> = samples.iter().map(|s| s.gyro).sum::<Vector3<f64>>() / n;
        let spread = (samples.iter().map(|s| (s.gyro - bias).norm_squared()).sum::<f64>() / n).sqrt();
        let gravity_magnitude = samples.iter().map(|s| s.accel.norm()).sum::<f64>() / n;

        if !spread.is_finite() || spread > CALIBRATION_MAX_GYRO_STD_DEV {
            let target = *target;
            samples.clear();
            warn!("Calibration rejected: gyro spread {spread:.4} rad/s, restarting");
            return Err(Error::CalibrationError(format!(
                "device moved during calibration (gyro spread {spread:.4} rad/s over {target} samples)"
            )));
        }

        let calibration = SensorCalibration {
            gyro_bias: bias,
            gravity_magnitude,
            sample_count: samples.len(),
        };
        info!(
            "Sensor calibration complete: bias=({:.4}, {:.4}, {:.4}) rad/s, |g|={:.3} m/s² (nominal {GRAVITY})",
            bias.x, bias.y, bias.z, gravity_magnitude
        );
        self.state = CalibrationState::Calibrated(calibration);
        Ok(Some(calibration))
    }

    /// Calibration result, if collection finished
    #[must_use]
    pub fn calibration(&self) -> Option<SensorCalibration> {
        match &self.state {
            CalibrationState::Calibrated(calibration) => Some(*calibration),
            CalibrationState::Collecting { .. } => None,
        }
    }

    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        matches!(self.state, CalibrationState::Calibrated(_))
    }

    /// Collection progress in percent
    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        match &self.state {
            CalibrationState::Calibrated(_) => 100.0,
            CalibrationState::Collecting { samples, target } => usize_to_f64(samples.len()) / usize_to_f64(*target) * 100.0,
        }
    }

    /// Subtract the gyro bias; uncalibrated samples pass through unchanged
    #[must_use]
    pub fn correct(&self, sample: &RawSensorSample) -> RawSensorSample {
        match &self.state {
            CalibrationState::Calibrated(calibration) => RawSensorSample {
                gyro: sample.gyro - calibration.gyro_bias,
                ..*sample
            },
            CalibrationState::Collecting { .. } => *sample,
        }
    }

    /// Discard any result and start collecting again
    pub fn recalibrate(&mut self, samples: usize) {
        let target = samples.max(1);
        self.state = CalibrationState::Collecting {
            samples: Vec::with_capacity(target),
            target,
        };
        info!("Recalibration started ({target} samples)");
    }
}
