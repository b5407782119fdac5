//! Adaptive validity scoring with hysteresis.
//!
//! Each frame's criteria are scored per axis and combined into a weighted
//! accuracy (0..100). Validity only flips when the accuracy leaves a band
//! around the threshold, and a rolling buffer of decisions provides a
//! baseline so that a single good frame cannot start a countdown.

use crate::{
    angles::AngleConfig,
    config::ValidatorConfig,
    constants::{BASELINE_VALID_RATIO, FAILURE_SCORE},
    utils::{
        linear_falloff,
        safe_cast::{f64_to_u32_clamp, usize_to_f64},
        sine_window,
    },
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

/// Raw per-frame measurements scored by the validator
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationCriteria {
    /// Phone pitch, degrees
    pub pitch: f64,
    /// Phone roll, degrees
    pub roll: f64,
    /// Head yaw, degrees
    pub yaw: f64,
    /// Subject distance, cm
    pub distance: f64,
    /// Face width as a percentage of the frame width
    pub face_width_percent: f64,
    /// 0..100
    pub sharpness: f64,
    /// Mean luminance on the 0..255 scale
    pub brightness: f64,
    /// 0..100
    pub contrast: f64,
    /// 0..100
    pub eyes_open_percent: f64,
    /// Horizontal face-centre offset, percent of frame width
    pub face_centered_x: f64,
    /// Vertical face-centre offset, percent of frame height
    pub face_centered_y: f64,
}

/// Target with a symmetric linear tolerance
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisTarget {
    pub target: f64,
    pub tolerance: f64,
}

/// Inclusive window scored with a sine profile peaking at its centre
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowTarget {
    pub min: f64,
    pub max: f64,
}

impl WindowTarget {
    fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationTargets {
    pub pitch: AxisTarget,
    pub roll: AxisTarget,
    pub yaw: AxisTarget,
    pub distance: WindowTarget,
    pub face_width: WindowTarget,
    pub sharpness_min: f64,
    pub brightness: WindowTarget,
    pub contrast_min: f64,
    pub eyes_open_min: f64,
    pub face_center_tolerance: f64,
}

impl Default for ValidationTargets {
    fn default() -> Self {
        Self {
            pitch: AxisTarget {
                target: 90.0,
                tolerance: 5.0,
            },
            roll: AxisTarget {
                target: 0.0,
                tolerance: 5.0,
            },
            yaw: AxisTarget {
                target: 0.0,
                tolerance: 10.0,
            },
            distance: WindowTarget { min: 35.0, max: 45.0 },
            face_width: WindowTarget { min: 30.0, max: 50.0 },
            sharpness_min: 75.0,
            brightness: WindowTarget { min: 80.0, max: 150.0 },
            contrast_min: 40.0,
            eyes_open_min: 80.0,
            face_center_tolerance: 15.0,
        }
    }
}

impl ValidationTargets {
    /// Targets aligned with a capture angle's phone target and distance window
    #[must_use]
    pub fn for_angle(config: &AngleConfig) -> Self {
        let phone = &config.phone;
        let pitch_target = phone
            .pitch_max
            .map_or(phone.pitch, |max| (phone.pitch + max) / 2.0);
        let pitch_tolerance = phone
            .pitch_max
            .map_or(phone.tolerance, |max| ((max - phone.pitch).abs() / 2.0).max(phone.tolerance));
        let yaw = config
            .face_requirements()
            .map_or(Self::default().yaw, |face| AxisTarget {
                target: face.yaw.center(),
                tolerance: Self::default().yaw.tolerance,
            });

        Self {
            pitch: AxisTarget {
                target: pitch_target,
                tolerance: pitch_tolerance,
            },
            roll: AxisTarget {
                target: phone.roll,
                tolerance: phone.tolerance,
            },
            yaw,
            distance: WindowTarget {
                min: config.distance.min_cm,
                max: config.distance.max_cm,
            },
            ..Self::default()
        }
    }
}

/// Per-component scores, rounded to whole points
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub pitch_score: f64,
    pub roll_score: f64,
    pub yaw_score: f64,
    pub distance_score: f64,
    pub face_width_score: f64,
    pub image_quality_score: f64,
    pub face_centering_score: f64,
}

/// Why a frame failed, one per category at most
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    RaisePhone,
    LowerPhone,
    RotateLeft,
    RotateRight,
    LookStraight,
    MoveBack,
    MoveCloser,
    EnlargeFace,
    ShrinkFace,
    CenterFace,
    HoldSteady,
    FindBrighterPlace,
    MoveToShade,
    ImproveContrast,
    OpenEyes,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::RaisePhone => "Hold the phone more upright",
            Self::LowerPhone => "Tilt the phone slightly",
            Self::RotateLeft => "Rotate the phone to the left",
            Self::RotateRight => "Rotate the phone to the right",
            Self::LookStraight => "Look straight ahead",
            Self::MoveBack => "Too close, move back",
            Self::MoveCloser => "Too far, come closer",
            Self::EnlargeFace => "Bring the face closer to fill the frame",
            Self::ShrinkFace => "Face is too large in the frame",
            Self::CenterFace => "Center the face",
            Self::HoldSteady => "Hold the phone steady",
            Self::FindBrighterPlace => "Move to a brighter place",
            Self::MoveToShade => "Move into the shade",
            Self::ImproveContrast => "Find a spot with better contrast",
            Self::OpenEyes => "Open your eyes",
        };
        f.write_str(text)
    }
}

/// Result of one validation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidityStatus {
    pub is_valid: bool,
    /// Weighted accuracy, 0..100
    pub accuracy: f64,
    pub should_countdown: bool,
    /// Angle, position and quality reasons, in that order
    pub failure_reasons: Vec<FailureReason>,
    pub metrics: ValidationMetrics,
}

/// Validity buffer summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferStats {
    pub total_frames: usize,
    pub valid_frames: usize,
    pub invalid_frames: usize,
    /// Rounded percentage of valid frames
    pub validity_percentage: u32,
}

struct Scores {
    pitch: f64,
    roll: f64,
    yaw: f64,
    distance: f64,
    face_width: f64,
    sharpness: f64,
    brightness: f64,
    contrast: f64,
    eyes: f64,
    center_x: f64,
    center_y: f64,
}

/// Hysteresis validator with a rolling baseline
pub struct AdaptiveValidator {
    targets: ValidationTargets,
    buffer_size: usize,
    valid_threshold: f64,
    hysteresis_band: f64,
    countdown_accuracy: f64,
    is_valid: bool,
    buffer: VecDeque<bool>,
}

impl AdaptiveValidator {
    #[must_use]
    pub fn new(config: &ValidatorConfig, targets: ValidationTargets) -> Self {
        Self {
            targets,
            buffer_size: config.buffer_size.max(1),
            valid_threshold: config.valid_threshold,
            hysteresis_band: config.hysteresis_band,
            countdown_accuracy: config.countdown_accuracy,
            is_valid: false,
            buffer: VecDeque::with_capacity(config.buffer_size.max(1)),
        }
    }

    #[must_use]
    pub fn targets(&self) -> &ValidationTargets {
        &self.targets
    }

    pub fn set_targets(&mut self, targets: ValidationTargets) {
        self.targets = targets;
    }

    /// Override the validity threshold and/or hysteresis band
    pub fn set_thresholds(&mut self, valid_threshold: Option<f64>, hysteresis_band: Option<f64>) {
        if let Some(threshold) = valid_threshold {
            self.valid_threshold = threshold;
        }
        if let Some(band) = hysteresis_band {
            self.hysteresis_band = band.abs();
        }
    }

    /// Score one frame and update hysteresis and the validity buffer
    pub fn validate(&mut self, criteria: &ValidationCriteria) -> ValidityStatus {
        let scores = self.score(criteria);

        let image_quality = (scores.sharpness + scores.brightness + scores.contrast) / 3.0;
        let centering = (scores.center_x + scores.center_y) / 2.0;
        let accuracy = (scores.pitch * 0.2
            + scores.roll * 0.2
            + scores.yaw * 0.1
            + scores.distance * 0.15
            + scores.face_width * 0.1
            + image_quality * 0.1
            + centering * 0.05
            + scores.eyes * 0.1)
            .round();

        let failure_reasons = self.failure_reasons(criteria, &scores);
        let is_valid = self.apply_hysteresis(accuracy);

        self.buffer.push_back(is_valid);
        while self.buffer.len() > self.buffer_size {
            self.buffer.pop_front();
        }

        let baseline = self.has_baseline();
        let should_countdown = is_valid && baseline && accuracy >= self.countdown_accuracy;
        debug!("Validator accuracy={accuracy} valid={is_valid} baseline={baseline} countdown={should_countdown}");

        ValidityStatus {
            is_valid,
            accuracy,
            should_countdown,
            failure_reasons,
            metrics: ValidationMetrics {
                pitch_score: scores.pitch.round(),
                roll_score: scores.roll.round(),
                yaw_score: scores.yaw.round(),
                distance_score: scores.distance.round(),
                face_width_score: scores.face_width.round(),
                image_quality_score: image_quality.round(),
                face_centering_score: centering.round(),
            },
        }
    }

    /// Current hysteresis state
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// Enough buffered frames with a sufficient share of valid ones
    #[must_use]
    pub fn has_baseline(&self) -> bool {
        if self.buffer.len() < self.buffer_size / 2 {
            return false;
        }
        let required = (usize_to_f64(self.buffer_size) * BASELINE_VALID_RATIO).floor();
        usize_to_f64(self.valid_count()) >= required
    }

    #[must_use]
    pub fn buffer_stats(&self) -> BufferStats {
        let total = self.buffer.len();
        let valid = self.valid_count();
        let percentage = if total == 0 {
            0
        } else {
            f64_to_u32_clamp(usize_to_f64(valid) / usize_to_f64(total) * 100.0, 0, 100)
        };
        BufferStats {
            total_frames: total,
            valid_frames: valid,
            invalid_frames: total - valid,
            validity_percentage: percentage,
        }
    }

    /// Clear the buffer and return to the invalid state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.is_valid = false;
    }

    fn valid_count(&self) -> usize {
        self.buffer.iter().filter(|&&v| v).count()
    }

    fn apply_hysteresis(&mut self, accuracy: f64) -> bool {
        if self.is_valid {
            if accuracy < self.valid_threshold - self.hysteresis_band {
                self.is_valid = false;
            }
        } else if accuracy > self.valid_threshold + self.hysteresis_band {
            self.is_valid = true;
        }
        self.is_valid
    }

    fn score(&self, c: &ValidationCriteria) -> Scores {
        let t = &self.targets;
        let floor_score = |value: f64, min: f64| if value < min { 0.0 } else { value.min(100.0) };
        Scores {
            pitch: linear_falloff(c.pitch, t.pitch.target, t.pitch.tolerance),
            roll: linear_falloff(c.roll, t.roll.target, t.roll.tolerance),
            yaw: linear_falloff(c.yaw, t.yaw.target, t.yaw.tolerance),
            distance: sine_window(c.distance, t.distance.min, t.distance.max),
            face_width: sine_window(c.face_width_percent, t.face_width.min, t.face_width.max),
            sharpness: floor_score(c.sharpness, t.sharpness_min),
            brightness: sine_window(c.brightness, t.brightness.min, t.brightness.max),
            contrast: floor_score(c.contrast, t.contrast_min),
            eyes: floor_score(c.eyes_open_percent, t.eyes_open_min),
            center_x: linear_falloff(c.face_centered_x, 0.0, t.face_center_tolerance),
            center_y: linear_falloff(c.face_centered_y, 0.0, t.face_center_tolerance),
        }
    }

    fn failure_reasons(&self, c: &ValidationCriteria, s: &Scores) -> Vec<FailureReason> {
        let t = &self.targets;
        let fails = |score: f64| score < FAILURE_SCORE;

        let angle = if fails(s.pitch) {
            Some(if c.pitch < t.pitch.target {
                FailureReason::RaisePhone
            } else {
                FailureReason::LowerPhone
            })
        } else if fails(s.roll) {
            Some(if c.roll > t.roll.target {
                FailureReason::RotateLeft
            } else {
                FailureReason::RotateRight
            })
        } else if fails(s.yaw) {
            Some(FailureReason::LookStraight)
        } else {
            None
        };

        let position = if fails(s.distance) {
            Some(if c.distance < t.distance.midpoint() {
                FailureReason::MoveBack
            } else {
                FailureReason::MoveCloser
            })
        } else if fails(s.face_width) {
            Some(if c.face_width_percent < t.face_width.midpoint() {
                FailureReason::EnlargeFace
            } else {
                FailureReason::ShrinkFace
            })
        } else if fails(s.center_x) || fails(s.center_y) {
            Some(FailureReason::CenterFace)
        } else {
            None
        };

        let quality = if fails(s.sharpness) {
            Some(FailureReason::HoldSteady)
        } else if fails(s.brightness) {
            Some(if c.brightness < t.brightness.midpoint() {
                FailureReason::FindBrighterPlace
            } else {
                FailureReason::MoveToShade
            })
        } else if fails(s.contrast) {
            Some(FailureReason::ImproveContrast)
        } else if fails(s.eyes) {
            Some(FailureReason::OpenEyes)
        } else {
            None
        };

        [angle, position, quality].into_iter().flatten().collect()
    }
}

impl Default for AdaptiveValidator {
    fn default() -> Self {
        Self::new(&ValidatorConfig::default(), ValidationTargets::default())
    }
}
