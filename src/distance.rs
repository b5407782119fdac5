//! Camera-to-subject distance estimation.
//!
//! Two estimators are fused:
//! - an optical pinhole estimate from the apparent head width,
//! - a bucketed heuristic standing in for a monocular depth model.
//!
//! The depth heuristic is deterministic so that repeated frames of the
//! same box produce identical estimates.

use crate::{
    angles::DistanceRange,
    config::DistanceConfig,
    constants::{
        DEPTH_CONFIDENCE, DISAGREEMENT_LARGE_CM, DISAGREEMENT_SMALL_CM,
        DISTANCE_SANITY_MAX_CM, DISTANCE_SANITY_MIN_CM, DISTANCE_SLIGHT_MARGIN_CM, OPTICAL_BASE_CONFIDENCE,
    },
    geometry::{BoundingBox, FrameGeometry},
    utils::{clamp_unit, finite_or_zero},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Margin used by [`validate_distance`] between "slightly" and "very" feedback
const VALIDATION_MARGIN_CM: f64 = 10.0;

/// Lens and sensor parameters of the capturing camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub focal_length_mm: f64,
    pub sensor_width_mm: f64,
    pub image_width_px: f64,
    pub image_height_px: f64,
}

impl CameraIntrinsics {
    #[must_use]
    pub fn from_config(config: &DistanceConfig, frame: &FrameGeometry) -> Self {
        Self {
            focal_length_mm: config.focal_length_mm,
            sensor_width_mm: config.sensor_width_mm,
            image_width_px: frame.width_px,
            image_height_px: frame.height_px,
        }
    }

    /// Focal length expressed in pixels
    #[must_use]
    pub fn focal_length_px(&self) -> f64 {
        if self.sensor_width_mm <= 0.0 {
            return 0.0;
        }
        self.focal_length_mm * self.image_width_px / self.sensor_width_mm
    }
}

/// Observed subject box with the frame it was measured in
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceMetrics {
    pub bounds: BoundingBox,
    pub frame: FrameGeometry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceMethod {
    Optical,
    Depth,
    Fusion,
}

/// Which way the user should move the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistanceRecommendation {
    Farther,
    SlightlyFarther,
    Closer,
    SlightlyCloser,
    Perfect,
    NoSubject,
}

impl DistanceRecommendation {
    /// Recommendation for `distance_cm` against `range`, with `margin_cm`
    /// separating slight from full corrections
    #[must_use]
    pub fn for_distance(distance_cm: f64, range: &DistanceRange, margin_cm: f64) -> Self {
        if distance_cm < range.min_cm - margin_cm {
            Self::Farther
        } else if distance_cm < range.min_cm {
            Self::SlightlyFarther
        } else if distance_cm > range.max_cm + margin_cm {
            Self::Closer
        } else if distance_cm > range.max_cm {
            Self::SlightlyCloser
        } else {
            Self::Perfect
        }
    }
}

impl fmt::Display for DistanceRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Farther => "Too close, move the phone away",
            Self::SlightlyFarther => "Move the phone slightly away",
            Self::Closer => "Too far, bring the phone closer",
            Self::SlightlyCloser => "Bring the phone slightly closer",
            Self::Perfect => "Distance is perfect",
            Self::NoSubject => "No subject detected",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceEstimate {
    pub distance_cm: f64,
    /// 0..1
    pub confidence: f64,
    pub method: DistanceMethod,
    pub is_in_range: bool,
    pub recommendation: DistanceRecommendation,
}

impl DistanceEstimate {
    fn none(method: DistanceMethod) -> Self {
        Self {
            distance_cm: 0.0,
            confidence: 0.0,
            method,
            is_in_range: false,
            recommendation: DistanceRecommendation::NoSubject,
        }
    }

    fn with_range(distance_cm: f64, confidence: f64, method: DistanceMethod, range: &DistanceRange) -> Self {
        Self {
            distance_cm,
            confidence: clamp_unit(confidence),
            method,
            is_in_range: range.contains(distance_cm),
            recommendation: DistanceRecommendation::for_distance(distance_cm, range, DISTANCE_SLIGHT_MARGIN_CM),
        }
    }
}

/// Optical plus heuristic distance estimator
pub struct DistanceEstimator {
    intrinsics: CameraIntrinsics,
    head_width_cm: f64,
    optical_weight: f64,
}

impl DistanceEstimator {
    #[must_use]
    pub fn new(config: &DistanceConfig, frame: &FrameGeometry) -> Self {
        Self {
            intrinsics: CameraIntrinsics::from_config(config, frame),
            head_width_cm: config.head_width_cm,
            optical_weight: config.optical_weight,
        }
    }

    #[must_use]
    pub fn intrinsics(&self) -> &CameraIntrinsics {
        &self.intrinsics
    }

    /// Pinhole estimate: `head_width · f_px / box_width_px`
    #[must_use]
    pub fn estimate_optical(&self, metrics: &FaceMetrics, range: &DistanceRange) -> DistanceEstimate {
        let width_px = metrics.frame.width_px_of(&metrics.bounds);
        if metrics.bounds.is_degenerate() || width_px <= 0.0 {
            return DistanceEstimate::none(DistanceMethod::Optical);
        }

        let distance_cm = finite_or_zero(self.head_width_cm * self.intrinsics.focal_length_px() / width_px);

        let mut confidence = OPTICAL_BASE_CONFIDENCE;
        let area = metrics.bounds.area();
        if area < 0.05 {
            confidence *= 0.6;
        } else if area > 0.7 {
            confidence *= 0.7;
        }
        if !(DISTANCE_SANITY_MIN_CM..=DISTANCE_SANITY_MAX_CM).contains(&distance_cm) {
            confidence *= 0.5;
        }

        DistanceEstimate::with_range(distance_cm, confidence, DistanceMethod::Optical, range)
    }

    /// Width-ratio buckets in place of a depth map
    #[must_use]
    pub fn estimate_depth(&self, metrics: &FaceMetrics, range: &DistanceRange) -> DistanceEstimate {
        if metrics.bounds.is_degenerate() {
            return DistanceEstimate::none(DistanceMethod::Depth);
        }
        let ratio = metrics.bounds.width;
        let distance_cm = if ratio > 0.5 {
            25.0
        } else if ratio > 0.3 {
            40.0
        } else if ratio > 0.15 {
            60.0
        } else {
            80.0
        };
        DistanceEstimate::with_range(distance_cm, DEPTH_CONFIDENCE, DistanceMethod::Depth, range)
    }

    /// Weighted fusion of both estimators, penalized when they disagree
    #[must_use]
    pub fn estimate(&self, metrics: &FaceMetrics, range: &DistanceRange) -> DistanceEstimate {
        let optical = self.estimate_optical(metrics, range);
        if optical.distance_cm <= 0.0 {
            return DistanceEstimate::none(DistanceMethod::Fusion);
        }
        let depth = self.estimate_depth(metrics, range);
        fuse_estimates(&optical, &depth, self.optical_weight, range)
    }
}

impl Default for DistanceEstimator {
    fn default() -> Self {
        Self::new(&DistanceConfig::default(), &FrameGeometry::default())
    }
}

/// Combine an optical and a depth estimate
///
/// Confidence is the better of the two, scaled down by 0.8 when they differ
/// by more than 10 cm and by 0.9 when they differ by more than 5 cm.
#[must_use]
pub fn fuse_estimates(
    optical: &DistanceEstimate,
    depth: &DistanceEstimate,
    optical_weight: f64,
    range: &DistanceRange,
) -> DistanceEstimate {
    let distance_cm = optical.distance_cm * optical_weight + depth.distance_cm * (1.0 - optical_weight);

    let gap = (optical.distance_cm - depth.distance_cm).abs();
    let consistency = if gap > DISAGREEMENT_LARGE_CM {
        0.8
    } else if gap > DISAGREEMENT_SMALL_CM {
        0.9
    } else {
        1.0
    };
    let confidence = optical.confidence.max(depth.confidence) * consistency;

    DistanceEstimate::with_range(distance_cm, confidence, DistanceMethod::Fusion, range)
}

/// Distance compared against a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceCheck {
    pub valid: bool,
    /// 0..100, falling with the relative overshoot past the nearest bound
    pub score: f64,
    pub recommendation: DistanceRecommendation,
}

#[must_use]
pub fn validate_distance(distance_cm: f64, range: &DistanceRange) -> DistanceCheck {
    let score = if distance_cm < range.min_cm && range.min_cm > 0.0 {
        (100.0 - (range.min_cm - distance_cm) / range.min_cm * 100.0).max(0.0)
    } else if distance_cm > range.max_cm && range.max_cm > 0.0 {
        (100.0 - (distance_cm - range.max_cm) / range.max_cm * 100.0).max(0.0)
    } else {
        100.0
    };
    DistanceCheck {
        valid: range.contains(distance_cm),
        score,
        recommendation: DistanceRecommendation::for_distance(distance_cm, range, VALIDATION_MARGIN_CM),
    }
}

/// Coarse fallback from the face-to-frame width ratio alone
#[must_use]
pub fn estimate_distance_from_face_size(face_width_px: f64, frame_width_px: f64) -> f64 {
    if frame_width_px <= 0.0 {
        return 0.0;
    }
    let ratio = face_width_px / frame_width_px;
    if ratio > 0.6 {
        20.0
    } else if ratio > 0.4 {
        35.0
    } else if ratio > 0.25 {
        50.0
    } else if ratio > 0.15 {
        70.0
    } else {
        90.0
    }
}
