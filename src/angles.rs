//! Capture angle table.
//!
//! Every capture step has a phone orientation target, a distance window and
//! a validation strategy. Face angles are validated against head pose
//! ranges; the vertex and donor angles have no visible face and rely on the
//! phone sensors plus a region requirement.

use crate::{
    constants::{DEFAULT_CENTERING_TOLERANCE, DEFAULT_STABILITY_MS, IOU_ACCEPTABLE},
    region::ScalpRegion,
    sensor_fusion::PhoneOrientation,
    utils::{circular_difference, normalize_degrees},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaptureAngle {
    #[serde(rename = "FRONT")]
    Front,
    #[serde(rename = "RIGHT_45")]
    Right45,
    #[serde(rename = "LEFT_45")]
    Left45,
    #[serde(rename = "VERTEX")]
    Vertex,
    #[serde(rename = "BACK_DONOR")]
    BackDonor,
}

/// Order in which the angles are captured
pub const CAPTURE_SEQUENCE: [CaptureAngle; 5] = [
    CaptureAngle::Front,
    CaptureAngle::Right45,
    CaptureAngle::Left45,
    CaptureAngle::Vertex,
    CaptureAngle::BackDonor,
];

impl CaptureAngle {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Front => "FRONT",
            Self::Right45 => "RIGHT_45",
            Self::Left45 => "LEFT_45",
            Self::Vertex => "VERTEX",
            Self::BackDonor => "BACK_DONOR",
        }
    }

    /// Next angle in [`CAPTURE_SEQUENCE`], `None` after the last one
    #[must_use]
    pub fn next(&self) -> Option<Self> {
        let index = CAPTURE_SEQUENCE.iter().position(|a| a == self)?;
        CAPTURE_SEQUENCE.get(index + 1).copied()
    }
}

impl fmt::Display for CaptureAngle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureAngle {
    type Err = Error;

    /// Accepts the canonical names case-insensitively, with `-` or `_`
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        match normalized.as_str() {
            "FRONT" => Ok(Self::Front),
            "RIGHT_45" | "RIGHT45" => Ok(Self::Right45),
            "LEFT_45" | "LEFT45" => Ok(Self::Left45),
            "VERTEX" => Ok(Self::Vertex),
            "BACK_DONOR" | "BACKDONOR" | "DONOR" => Ok(Self::BackDonor),
            _ => Err(Error::InvalidInput(format!(
                "unknown capture angle '{s}', expected one of FRONT, RIGHT_45, LEFT_45, VERTEX, BACK_DONOR"
            ))),
        }
    }
}

/// Inclusive angle range in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    /// Range between two bounds given in either order
    #[must_use]
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    #[must_use]
    pub fn center(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    #[must_use]
    pub fn half_width(&self) -> f64 {
        (self.max - self.min) / 2.0
    }
}

/// Head pose windows for face angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRequirements {
    pub yaw: AngleRange,
    pub pitch: AngleRange,
    pub roll: AngleRange,
}

/// Phone orientation target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhoneTarget {
    pub pitch: f64,
    /// Far end of a pitch window starting at `pitch`
    pub pitch_max: Option<f64>,
    pub roll: f64,
    /// Relative only, never gated
    pub yaw: f64,
    pub tolerance: f64,
}

impl PhoneTarget {
    /// Pitch window when `pitch_max` is set
    #[must_use]
    pub fn pitch_window(&self) -> Option<AngleRange> {
        self.pitch_max.map(|max| AngleRange::new(self.pitch, max))
    }

    /// Pitch and roll of `orientation`, in whichever Euler form lies closer
    /// to the target.
    ///
    /// Gravity alone caps pitch at ±90°: a phone tipped past vertical reads
    /// as pitch folded back toward ±90° with roll flipped by 180°. The
    /// unfolded form extends pitch past ±90° and brings roll back near 0°.
    #[must_use]
    pub fn aligned_tilt(&self, orientation: &PhoneOrientation) -> (f64, f64) {
        let direct = (orientation.pitch, orientation.roll);
        let folded_pitch = (if orientation.pitch < 0.0 { -180.0 } else { 180.0 }) - orientation.pitch;
        let unfolded = (folded_pitch, normalize_degrees(orientation.roll + 180.0));
        if self.tilt_error(unfolded) < self.tilt_error(direct) {
            unfolded
        } else {
            direct
        }
    }

    /// Pitch and roll within the target; yaw is not checked
    #[must_use]
    pub fn is_satisfied_by(&self, orientation: &PhoneOrientation) -> bool {
        let (pitch, roll) = self.aligned_tilt(orientation);
        let roll_ok = circular_difference(roll, self.roll) <= self.tolerance;
        let pitch_ok = match self.pitch_window() {
            Some(window) => window.contains(pitch),
            None => (pitch - self.pitch).abs() <= self.tolerance,
        };
        pitch_ok && roll_ok
    }

    // Degrees outside the pitch window (or away from the pitch target) plus roll error
    fn tilt_error(&self, (pitch, roll): (f64, f64)) -> f64 {
        let pitch_error = match self.pitch_window() {
            Some(window) => (window.min - pitch).max(pitch - window.max).max(0.0),
            None => (pitch - self.pitch).abs(),
        };
        pitch_error + circular_difference(roll, self.roll)
    }
}

/// Distance window in centimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceRange {
    pub min_cm: f64,
    pub max_cm: f64,
}

impl DistanceRange {
    #[must_use]
    pub fn new(min_cm: f64, max_cm: f64) -> Self {
        Self {
            min_cm: min_cm.min(max_cm),
            max_cm: min_cm.max(max_cm),
        }
    }

    #[must_use]
    pub fn contains(&self, distance_cm: f64) -> bool {
        distance_cm >= self.min_cm && distance_cm <= self.max_cm
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min_cm + self.max_cm) / 2.0
    }
}

/// Region requirement for sensor-only angles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionDetection {
    pub required: bool,
    pub target_region: ScalpRegion,
    pub min_confidence: f64,
    /// Percentage of the frame around the centre the region must fall in
    pub center_area_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationStrategy {
    FaceDetection { face_requirements: FaceRequirements },
    SensorOnly { region_detection: RegionDetection },
}

/// Full configuration of one capture step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleConfig {
    pub angle: CaptureAngle,
    pub title: String,
    pub instructions: String,
    pub phone: PhoneTarget,
    pub distance: DistanceRange,
    #[serde(default)]
    pub iou_threshold: Option<f64>,
    #[serde(default)]
    pub stability_ms: Option<u64>,
    /// Allowed centre offset, percent of the frame
    #[serde(default)]
    pub centering_tolerance: Option<f64>,
    pub strategy: ValidationStrategy,
}

impl AngleConfig {
    /// Built-in configuration for `angle`
    #[must_use]
    pub fn for_angle(angle: CaptureAngle) -> Self {
        let level_phone = PhoneTarget {
            pitch: 0.0,
            pitch_max: None,
            roll: 0.0,
            yaw: 0.0,
            tolerance: 5.0,
        };
        let profile = |yaw: AngleRange| ValidationStrategy::FaceDetection {
            face_requirements: FaceRequirements {
                yaw,
                pitch: AngleRange::new(-5.0, 5.0),
                roll: AngleRange::new(-5.0, 5.0),
            },
        };

        match angle {
            CaptureAngle::Front => Self {
                angle,
                title: "Front face".to_string(),
                instructions: "Hold the phone level, look straight into the camera and keep the face centred."
                    .to_string(),
                phone: level_phone,
                distance: DistanceRange::new(25.0, 40.0),
                iou_threshold: Some(0.75),
                stability_ms: Some(1200),
                centering_tolerance: None,
                strategy: ValidationStrategy::FaceDetection {
                    face_requirements: FaceRequirements {
                        yaw: AngleRange::new(-4.0, 4.0),
                        pitch: AngleRange::new(-6.0, 6.0),
                        roll: AngleRange::new(-3.0, 3.0),
                    },
                },
            },
            CaptureAngle::Right45 => Self {
                angle,
                title: "45° right profile".to_string(),
                instructions: "Turn the head 45° to the right and keep the phone level.".to_string(),
                phone: level_phone,
                distance: DistanceRange::new(20.0, 35.0),
                iou_threshold: None,
                stability_ms: None,
                centering_tolerance: Some(15.0),
                strategy: profile(AngleRange::new(40.0, 50.0)),
            },
            CaptureAngle::Left45 => Self {
                angle,
                title: "45° left profile".to_string(),
                instructions: "Turn the head 45° to the left and keep the phone level.".to_string(),
                phone: level_phone,
                distance: DistanceRange::new(20.0, 35.0),
                iou_threshold: None,
                stability_ms: None,
                centering_tolerance: Some(15.0),
                strategy: profile(AngleRange::new(-50.0, -40.0)),
            },
            CaptureAngle::Vertex => Self {
                angle,
                title: "Vertex".to_string(),
                instructions: "Hold the phone above the head with the camera facing down and the crown centred."
                    .to_string(),
                phone: PhoneTarget {
                    pitch: -85.0,
                    pitch_max: Some(-95.0),
                    roll: 0.0,
                    yaw: 0.0,
                    tolerance: 5.0,
                },
                distance: DistanceRange::new(30.0, 50.0),
                iou_threshold: None,
                stability_ms: None,
                centering_tolerance: Some(10.0),
                strategy: ValidationStrategy::SensorOnly {
                    region_detection: RegionDetection {
                        required: true,
                        target_region: ScalpRegion::Vertex,
                        min_confidence: 0.85,
                        center_area_threshold: 40.0,
                    },
                },
            },
            CaptureAngle::BackDonor => Self {
                angle,
                title: "Back donor area".to_string(),
                instructions: "Move the phone behind the head with the camera facing the nape, centred.".to_string(),
                phone: PhoneTarget {
                    pitch: -85.0,
                    pitch_max: Some(-100.0),
                    roll: 0.0,
                    yaw: 180.0,
                    tolerance: 10.0,
                },
                distance: DistanceRange::new(30.0, 50.0),
                iou_threshold: None,
                stability_ms: Some(800),
                centering_tolerance: Some(20.0),
                strategy: ValidationStrategy::SensorOnly {
                    region_detection: RegionDetection {
                        required: true,
                        target_region: ScalpRegion::Occipital,
                        min_confidence: 0.85,
                        center_area_threshold: 20.0,
                    },
                },
            },
        }
    }

    /// Hold time before the shutter becomes ready
    #[must_use]
    pub fn stability_ms(&self) -> u64 {
        self.stability_ms.unwrap_or(DEFAULT_STABILITY_MS)
    }

    #[must_use]
    pub fn iou_threshold(&self) -> f64 {
        self.iou_threshold.unwrap_or(IOU_ACCEPTABLE)
    }

    /// Allowed centre offset as a fraction of the frame
    #[must_use]
    pub fn centering_tolerance(&self) -> f64 {
        self.centering_tolerance.unwrap_or(DEFAULT_CENTERING_TOLERANCE) / 100.0
    }

    #[must_use]
    pub fn face_requirements(&self) -> Option<&FaceRequirements> {
        match &self.strategy {
            ValidationStrategy::FaceDetection { face_requirements } => Some(face_requirements),
            ValidationStrategy::SensorOnly { .. } => None,
        }
    }

    #[must_use]
    pub fn region_detection(&self) -> Option<&RegionDetection> {
        match &self.strategy {
            ValidationStrategy::SensorOnly { region_detection } => Some(region_detection),
            ValidationStrategy::FaceDetection { .. } => None,
        }
    }

    #[must_use]
    pub fn is_sensor_only(&self) -> bool {
        matches!(self.strategy, ValidationStrategy::SensorOnly { .. })
    }

    /// Whether the region condition gates the shutter
    #[must_use]
    pub fn region_required(&self) -> bool {
        self.region_detection().is_some_and(|r| r.required)
    }

    /// Check internal consistency
    ///
    /// # Errors
    ///
    /// Returns [`Error::AngleConfigError`] for non-finite values, a
    /// non-positive tolerance, an empty distance window or out-of-range
    /// thresholds.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(Error::AngleConfigError(format!("{}: {msg}", self.angle)));

        let phone = &self.phone;
        let phone_values = [Some(phone.pitch), phone.pitch_max, Some(phone.roll), Some(phone.yaw)];
        if phone_values.iter().flatten().any(|v| !v.is_finite()) {
            return fail("phone target contains non-finite values".to_string());
        }
        if !(phone.tolerance.is_finite() && phone.tolerance > 0.0) {
            return fail(format!("phone tolerance must be positive, got {}", phone.tolerance));
        }
        if !(self.distance.min_cm > 0.0 && self.distance.max_cm > self.distance.min_cm) {
            return fail(format!(
                "distance window {}..{} cm is empty",
                self.distance.min_cm, self.distance.max_cm
            ));
        }
        if let Some(threshold) = self.iou_threshold {
            if !(threshold > 0.0 && threshold <= 1.0) {
                return fail(format!("IoU threshold must be in (0, 1], got {threshold}"));
            }
        }
        if let Some(tolerance) = self.centering_tolerance {
            if !(tolerance > 0.0 && tolerance <= 50.0) {
                return fail(format!("centering tolerance must be in (0, 50] percent, got {tolerance}"));
            }
        }
        if self.stability_ms == Some(0) {
            return fail("stability duration must be positive".to_string());
        }

        match &self.strategy {
            ValidationStrategy::FaceDetection { face_requirements } => {
                let ranges = [face_requirements.yaw, face_requirements.pitch, face_requirements.roll];
                if ranges.iter().any(|r| !(r.min.is_finite() && r.max.is_finite()) || r.min > r.max) {
                    return fail("head pose ranges must be finite and ordered".to_string());
                }
            }
            ValidationStrategy::SensorOnly { region_detection } => {
                if !(0.0..=1.0).contains(&region_detection.min_confidence) {
                    return fail(format!(
                        "region min confidence must be in [0, 1], got {}",
                        region_detection.min_confidence
                    ));
                }
            }
        }
        Ok(())
    }
}
