//! Constants used throughout the engine

/// Standard gravity in m/s²
pub const GRAVITY: f64 = 9.81;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;

// Sensor fusion

/// Weight of the gyro-integrated estimate in the complementary filter
pub const GYRO_WEIGHT: f64 = 0.7;
/// Weight of the accelerometer tilt estimate in the complementary filter
pub const ACCEL_WEIGHT: f64 = 0.3;
/// Kalman process noise (Q)
pub const KALMAN_PROCESS_NOISE: f64 = 0.001;
/// Kalman measurement noise (R)
pub const KALMAN_MEASUREMENT_NOISE: f64 = 0.01;
/// Kalman error covariance after a reset
pub const KALMAN_INITIAL_ERROR: f64 = 1.0;
/// Deviation from 1 g (m/s²) above which orientation confidence drops by the large penalty
pub const ACCEL_DEVIATION_LARGE: f64 = 2.0;
/// Deviation from 1 g (m/s²) above which orientation confidence drops by the small penalty
pub const ACCEL_DEVIATION_SMALL: f64 = 1.0;
pub const ACCEL_PENALTY_LARGE: f64 = 0.3;
pub const ACCEL_PENALTY_SMALL: f64 = 0.1;
/// Angular rate (rad/s) above which the device counts as being moved
pub const GYRO_MOTION_THRESHOLD: f64 = 1.0;
pub const GYRO_MOTION_PENALTY: f64 = 0.2;
/// Minimum orientation confidence for special (vertex/donor) angles
pub const SPECIAL_ANGLE_MIN_CONFIDENCE: f64 = 0.7;
/// Default roll tolerance for special angles, in degrees
pub const SPECIAL_ANGLE_ROLL_TOLERANCE: f64 = 10.0;
/// Stationary samples collected for gyro bias calibration
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 50;
/// Maximum gyro standard deviation (rad/s) accepted during calibration
pub const CALIBRATION_MAX_GYRO_STD_DEV: f64 = 0.05;

// Head pose

/// Landmark count at which the landmark method reaches full confidence
pub const FULL_CONFIDENCE_LANDMARKS: usize = 10;
/// Base confidence of the landmark method
pub const LANDMARK_BASE_CONFIDENCE: f64 = 0.8;
/// Fixed confidence of the surface-normal method
pub const SURFACE_NORMAL_CONFIDENCE: f64 = 0.85;
/// Depth assigned to the nose base when lifting landmarks to 3-D
pub const NOSE_DEPTH: f64 = 10.0;
pub const LANDMARK_METHOD_WEIGHT: f64 = 0.4;
pub const SURFACE_NORMAL_METHOD_WEIGHT: f64 = 0.6;

// Optical flow stabilization

/// History window used for jitter, in milliseconds
pub const STABILIZER_WINDOW_MS: u64 = 500;
/// Jitter below this value (degrees) counts as steady
pub const MAX_JITTER_DEGREES: f64 = 2.0;
/// EMA smoothing factor
pub const STABILIZER_SMOOTHING: f64 = 0.3;
/// Frames required before a pose can be reported stable
pub const MIN_STABLE_FRAMES: usize = 15;
/// Confidence multiplier applied while jitter is low
pub const STEADY_CONFIDENCE_BOOST: f64 = 1.1;

// Distance estimation

/// Average human head width in centimetres
pub const AVERAGE_HEAD_WIDTH_CM: f64 = 16.5;
/// Average human head height in centimetres
pub const AVERAGE_HEAD_HEIGHT_CM: f64 = 22.0;
/// Typical phone camera focal length in millimetres
pub const FOCAL_LENGTH_MM: f64 = 4.0;
/// Typical phone sensor width in millimetres
pub const SENSOR_WIDTH_MM: f64 = 5.76;
pub const OPTICAL_BASE_CONFIDENCE: f64 = 0.9;
pub const DEPTH_CONFIDENCE: f64 = 0.75;
pub const OPTICAL_FUSION_WEIGHT: f64 = 0.6;
/// Plausible optical distance window in centimetres
pub const DISTANCE_SANITY_MIN_CM: f64 = 10.0;
pub const DISTANCE_SANITY_MAX_CM: f64 = 100.0;
/// Estimator disagreement (cm) that triggers the large consistency penalty
pub const DISAGREEMENT_LARGE_CM: f64 = 10.0;
/// Estimator disagreement (cm) that triggers the small consistency penalty
pub const DISAGREEMENT_SMALL_CM: f64 = 5.0;
/// Margin (cm) separating "slightly" from full distance corrections
pub const DISTANCE_SLIGHT_MARGIN_CM: f64 = 5.0;

// Silhouette matching

pub const IOU_PERFECT: f64 = 0.70;
pub const IOU_ACCEPTABLE: f64 = 0.55;
pub const IOU_MINIMUM: f64 = 0.45;
/// Normalized centre offset tolerated before a direction hint is emitted
pub const ALIGNMENT_DEAD_ZONE: f64 = 0.15;

// Lighting

pub const MIN_BRIGHTNESS: f64 = 0.3;
pub const MAX_BRIGHTNESS: f64 = 0.9;
pub const IDEAL_BRIGHTNESS: f64 = 0.6;
pub const IDEAL_BRIGHTNESS_BAND: f64 = 0.1;
pub const MAX_HIGHLIGHT_SATURATION: f64 = 0.10;
pub const MAX_SHADOW_SIZE: f64 = 0.40;
pub const MIN_CONTRAST: f64 = 0.15;
pub const MAX_CONTRAST: f64 = 0.5;
/// First luminance bin counted as a clipped highlight
pub const HIGHLIGHT_BIN: usize = 240;
/// Last luminance bin counted as shadow
pub const SHADOW_BIN: usize = 40;
/// BT.709 luma coefficients
pub const LUMA_RED: f64 = 0.2126;
pub const LUMA_GREEN: f64 = 0.7152;
pub const LUMA_BLUE: f64 = 0.0722;
/// Lighting score required by the auto-shutter
pub const LIGHTING_OK_SCORE: f64 = 70.0;

// Adaptive validator

pub const VALIDITY_BUFFER_SIZE: usize = 30;
pub const VALID_THRESHOLD: f64 = 60.0;
pub const HYSTERESIS_BAND: f64 = 5.0;
/// Fraction of buffered frames that must be valid for the baseline
pub const BASELINE_VALID_RATIO: f64 = 0.66;
/// Accuracy required before the validator recommends a countdown
pub const COUNTDOWN_ACCURACY: f64 = 75.0;
/// Partial score under which a failure reason is reported
pub const FAILURE_SCORE: f64 = 50.0;

// Auto-shutter

pub const POSE_WEIGHT: f64 = 0.35;
pub const PHONE_ANGLE_WEIGHT: f64 = 0.25;
pub const CENTERING_WEIGHT: f64 = 0.15;
pub const DISTANCE_WEIGHT: f64 = 0.10;
pub const REGION_MATCH_WEIGHT: f64 = 0.10;
pub const QUALITY_WEIGHT: f64 = 0.05;
pub const CONFIDENCE_PERFECT: f64 = 0.95;
pub const CONFIDENCE_AUTO_CAPTURE: f64 = 0.85;
pub const CONFIDENCE_USER_GUIDANCE: f64 = 0.70;
/// Centering component when the subject is off-centre
pub const OFF_CENTER_SCORE: f64 = 0.5;
/// Distance component when the subject is outside the distance window
pub const OUT_OF_RANGE_DISTANCE_SCORE: f64 = 0.3;
/// Region component when no IoU measurement exists
pub const MISSING_IOU_SCORE: f64 = 0.7;
/// Seconds counted down by the host once the shutter is ready
pub const COUNTDOWN_SECONDS: u32 = 3;
/// Stability duration used when an angle does not specify one
pub const DEFAULT_STABILITY_MS: u64 = 1000;
/// Centering tolerance (percent of frame) used when an angle does not specify one
pub const DEFAULT_CENTERING_TOLERANCE: f64 = 15.0;

// Region classification

/// Confidence at which a classified scalp region is accepted
pub const REGION_MIN_CONFIDENCE: f64 = 0.85;
