//! Configuration management for the capture guidance engine

use crate::{constants, geometry::FrameGeometry, Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Camera frame geometry
    pub frame: FrameGeometry,

    /// Orientation filter configuration
    pub sensor_fusion: SensorFusionConfig,

    /// Head pose blending configuration
    pub head_pose: HeadPoseConfig,

    /// Pose stabilizer configuration
    pub optical_flow: OpticalFlowConfig,

    /// Distance estimator configuration
    pub distance: DistanceConfig,

    /// Silhouette matching thresholds
    pub iou: IouConfig,

    /// Lighting thresholds
    pub lighting: LightingConfig,

    /// Adaptive validator configuration
    pub validator: ValidatorConfig,

    /// Auto-shutter confidence configuration
    pub confidence: ConfidenceConfig,
}

/// Orientation filter parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorFusionConfig {
    /// Gyro share of the complementary blend (the accelerometer gets the rest)
    pub gyro_weight: f64,

    /// Per-axis smoothing filter (`kalman`, `exponential[:alpha]`, `none`)
    pub smoothing: String,

    /// Kalman process noise
    pub kalman_process_noise: f64,

    /// Kalman measurement noise
    pub kalman_measurement_noise: f64,

    /// Collect a gyro bias before fusing
    pub calibrate_on_start: bool,

    /// Stationary samples used for gyro bias calibration
    pub calibration_samples: usize,
}

/// Head pose blending parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseConfig {
    /// Weight of the detector-reported angles
    pub landmark_weight: f64,

    /// Weight of the surface-normal angles
    pub surface_normal_weight: f64,

    /// Depth given to the nose base when lifting landmarks to 3-D
    pub nose_depth: f64,
}

/// Pose stabilizer parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpticalFlowConfig {
    /// History window in milliseconds
    pub window_ms: u64,

    /// EMA smoothing factor (0-1]
    pub smoothing_factor: f64,

    /// Jitter threshold in degrees
    pub max_jitter_degrees: f64,

    /// Frames required before reporting stable
    pub min_stable_frames: usize,
}

/// Distance estimator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Real head width in centimetres
    pub head_width_cm: f64,

    /// Lens focal length in millimetres
    pub focal_length_mm: f64,

    /// Sensor width in millimetres
    pub sensor_width_mm: f64,

    /// Optical share of the fused estimate (the depth heuristic gets the rest)
    pub optical_weight: f64,
}

/// Silhouette matching thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IouConfig {
    pub perfect: f64,
    pub acceptable: f64,
    pub minimum: f64,

    /// Normalized centre offset tolerated before a direction hint
    pub dead_zone: f64,
}

/// Lighting thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Score (0-100) required for the lighting condition
    pub ok_score: f64,
}

/// Adaptive validator parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Rolling decision buffer length
    pub buffer_size: usize,

    /// Accuracy threshold (0-100)
    pub valid_threshold: f64,

    /// Hysteresis half-width around the threshold
    pub hysteresis_band: f64,

    /// Accuracy required before recommending a countdown
    pub countdown_accuracy: f64,

    /// Hold the shutter until the validator recommends a countdown.
    /// Disabling it leaves the validator advisory only.
    pub gate_capture: bool,
}

/// Auto-shutter confidence parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Overall confidence required for auto capture
    pub auto_capture_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame: FrameGeometry::default(),
            sensor_fusion: SensorFusionConfig::default(),
            head_pose: HeadPoseConfig::default(),
            optical_flow: OpticalFlowConfig::default(),
            distance: DistanceConfig::default(),
            iou: IouConfig::default(),
            lighting: LightingConfig::default(),
            validator: ValidatorConfig::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}

impl Default for SensorFusionConfig {
    fn default() -> Self {
        Self {
            gyro_weight: constants::GYRO_WEIGHT,
            smoothing: "kalman".to_string(),
            kalman_process_noise: constants::KALMAN_PROCESS_NOISE,
            kalman_measurement_noise: constants::KALMAN_MEASUREMENT_NOISE,
            calibrate_on_start: false,
            calibration_samples: constants::DEFAULT_CALIBRATION_SAMPLES,
        }
    }
}

impl Default for HeadPoseConfig {
    fn default() -> Self {
        Self {
            landmark_weight: constants::LANDMARK_METHOD_WEIGHT,
            surface_normal_weight: constants::SURFACE_NORMAL_METHOD_WEIGHT,
            nose_depth: constants::NOSE_DEPTH,
        }
    }
}

impl Default for OpticalFlowConfig {
    fn default() -> Self {
        Self {
            window_ms: constants::STABILIZER_WINDOW_MS,
            smoothing_factor: constants::STABILIZER_SMOOTHING,
            max_jitter_degrees: constants::MAX_JITTER_DEGREES,
            min_stable_frames: constants::MIN_STABLE_FRAMES,
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            head_width_cm: constants::AVERAGE_HEAD_WIDTH_CM,
            focal_length_mm: constants::FOCAL_LENGTH_MM,
            sensor_width_mm: constants::SENSOR_WIDTH_MM,
            optical_weight: constants::OPTICAL_FUSION_WEIGHT,
        }
    }
}

impl Default for IouConfig {
    fn default() -> Self {
        Self {
            perfect: constants::IOU_PERFECT,
            acceptable: constants::IOU_ACCEPTABLE,
            minimum: constants::IOU_MINIMUM,
            dead_zone: constants::ALIGNMENT_DEAD_ZONE,
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ok_score: constants::LIGHTING_OK_SCORE,
        }
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            buffer_size: constants::VALIDITY_BUFFER_SIZE,
            valid_threshold: constants::VALID_THRESHOLD,
            hysteresis_band: constants::HYSTERESIS_BAND,
            countdown_accuracy: constants::COUNTDOWN_ACCURACY,
            gate_capture: true,
        }
    }
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            auto_capture_threshold: constants::CONFIDENCE_AUTO_CAPTURE,
        }
    }
}

fn check_unit(value: f64, name: &str) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be between 0.0 and 1.0, got {value}")))
    }
}

fn check_positive(value: f64, name: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::ConfigError(format!("{name} must be greater than 0, got {value}")))
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid configuration.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content).map_err(|e| Error::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        check_positive(self.frame.width_px, "Frame width")?;
        check_positive(self.frame.height_px, "Frame height")?;

        // Sensor fusion
        check_unit(self.sensor_fusion.gyro_weight, "Gyro weight")?;
        check_positive(self.sensor_fusion.kalman_process_noise, "Kalman process noise")?;
        check_positive(self.sensor_fusion.kalman_measurement_noise, "Kalman measurement noise")?;
        crate::filters::create_filter(&self.sensor_fusion.smoothing)
            .map_err(|e| Error::ConfigError(format!("Invalid smoothing filter: {e}")))?;
        if self.sensor_fusion.calibrate_on_start && self.sensor_fusion.calibration_samples == 0 {
            return Err(Error::ConfigError(
                "Calibration samples must be greater than 0".to_string(),
            ));
        }

        // Head pose
        check_unit(self.head_pose.landmark_weight, "Landmark weight")?;
        check_unit(self.head_pose.surface_normal_weight, "Surface normal weight")?;
        if (self.head_pose.landmark_weight + self.head_pose.surface_normal_weight - 1.0).abs() > 1e-6 {
            return Err(Error::ConfigError("Head pose weights must sum to 1.0".to_string()));
        }
        check_positive(self.head_pose.nose_depth, "Nose depth")?;

        // Stabilizer
        if self.optical_flow.window_ms == 0 {
            return Err(Error::ConfigError("Stabilizer window must be greater than 0".to_string()));
        }
        if !(self.optical_flow.smoothing_factor > 0.0 && self.optical_flow.smoothing_factor <= 1.0) {
            return Err(Error::ConfigError("Smoothing factor must be in (0, 1]".to_string()));
        }
        check_positive(self.optical_flow.max_jitter_degrees, "Jitter threshold")?;

        // Distance
        check_positive(self.distance.head_width_cm, "Head width")?;
        check_positive(self.distance.focal_length_mm, "Focal length")?;
        check_positive(self.distance.sensor_width_mm, "Sensor width")?;
        check_unit(self.distance.optical_weight, "Optical weight")?;

        // IoU
        check_unit(self.iou.perfect, "IoU perfect threshold")?;
        check_unit(self.iou.acceptable, "IoU acceptable threshold")?;
        check_unit(self.iou.minimum, "IoU minimum threshold")?;
        if !(self.iou.minimum <= self.iou.acceptable && self.iou.acceptable <= self.iou.perfect) {
            return Err(Error::ConfigError(
                "IoU thresholds must satisfy minimum <= acceptable <= perfect".to_string(),
            ));
        }
        check_unit(self.iou.dead_zone, "Alignment dead zone")?;

        // Lighting
        if !(0.0..=100.0).contains(&self.lighting.ok_score) {
            return Err(Error::ConfigError("Lighting score must be between 0 and 100".to_string()));
        }

        // Validator
        if self.validator.buffer_size == 0 {
            return Err(Error::ConfigError("Validator buffer size must be greater than 0".to_string()));
        }
        if !(0.0..=100.0).contains(&self.validator.valid_threshold) {
            return Err(Error::ConfigError("Valid threshold must be between 0 and 100".to_string()));
        }
        if !(self.validator.hysteresis_band >= 0.0 && self.validator.hysteresis_band < 50.0) {
            return Err(Error::ConfigError("Hysteresis band must be in [0, 50)".to_string()));
        }

        check_unit(self.confidence.auto_capture_threshold, "Auto capture threshold")?;

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Capture Guidance Engine Configuration

# Camera preview size in pixels
frame:
  width_px: 1080.0
  height_px: 1920.0

# Orientation filter
sensor_fusion:
  gyro_weight: 0.7
  smoothing: "kalman"
  kalman_process_noise: 0.001
  kalman_measurement_noise: 0.01
  calibrate_on_start: false
  calibration_samples: 50

# Head pose blending
head_pose:
  landmark_weight: 0.4
  surface_normal_weight: 0.6
  nose_depth: 10.0

# Pose stabilizer
optical_flow:
  window_ms: 500
  smoothing_factor: 0.3
  max_jitter_degrees: 2.0
  min_stable_frames: 15

# Distance estimation
distance:
  head_width_cm: 16.5
  focal_length_mm: 4.0
  sensor_width_mm: 5.76
  optical_weight: 0.6

# Silhouette matching
iou:
  perfect: 0.70
  acceptable: 0.55
  minimum: 0.45
  dead_zone: 0.15

# Lighting
lighting:
  ok_score: 70.0

# Adaptive validator
validator:
  buffer_size: 30
  valid_threshold: 60.0
  hysteresis_band: 5.0
  countdown_accuracy: 75.0
  gate_capture: true

# Auto-shutter
confidence:
  auto_capture_threshold: 0.85
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config = EngineConfig::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.optical_flow.min_stable_frames, 15);
        assert_eq!(config.sensor_fusion.smoothing, "kalman");
        assert!((config.distance.head_width_cm - 16.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = EngineConfig::from_yaml("validator:\n  buffer_size: 10\n").unwrap();
        assert_eq!(config.validator.buffer_size, 10);
        assert!((config.validator.valid_threshold - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.optical_flow.window_ms, 500);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = EngineConfig::default();
        config.head_pose.landmark_weight = 0.5;
        assert!(matches!(config.validate(), Err(Error::ConfigError(_))));

        let mut config = EngineConfig::default();
        config.iou.minimum = 0.9;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.sensor_fusion.smoothing = "median".to_string();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.validator.buffer_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            EngineConfig::from_yaml("frame: [1, 2"),
            Err(Error::ConfigError(_))
        ));
    }
}
