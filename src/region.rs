//! Rule-based scalp region classification.
//!
//! Phone orientation, optionally combined with the head pose, decides which
//! part of the scalp the camera is looking at. Rules are evaluated in order
//! and the first match wins.

use crate::{
    constants::REGION_MIN_CONFIDENCE,
    head_pose::HeadPoseEstimate,
    sensor_fusion::PhoneOrientation,
    utils::{circular_difference, clamp_unit},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScalpRegion {
    Vertex,
    Occipital,
    Parietal,
    Temporal,
    Frontal,
    Unknown,
}

impl fmt::Display for ScalpRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Vertex => "vertex",
            Self::Occipital => "occipital",
            Self::Parietal => "parietal",
            Self::Temporal => "temporal",
            Self::Frontal => "frontal",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionClassification {
    pub region: ScalpRegion,
    /// 0..1
    pub confidence: f64,
    /// Confidence reached the acceptance level
    pub is_acceptable: bool,
}

impl RegionClassification {
    fn new(region: ScalpRegion, confidence: f64) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            region,
            confidence,
            is_acceptable: confidence >= REGION_MIN_CONFIDENCE,
        }
    }

    #[must_use]
    pub fn unknown() -> Self {
        Self {
            region: ScalpRegion::Unknown,
            confidence: 0.0,
            is_acceptable: false,
        }
    }
}

/// `1 - deviation / span`, floored at zero
fn falloff(deviation: f64, span: f64) -> f64 {
    (1.0 - deviation / span).max(0.0)
}

#[must_use]
pub fn classify_scalp_region(orientation: &PhoneOrientation, head_pose: Option<&HeadPoseEstimate>) -> RegionClassification {
    let PhoneOrientation { pitch, roll, yaw, .. } = *orientation;

    if (-110.0..=-70.0).contains(&pitch) {
        let confidence = 0.7 * falloff((pitch + 90.0).abs(), 20.0) + 0.3 * falloff(roll.abs(), 15.0);
        return RegionClassification::new(ScalpRegion::Vertex, confidence);
    }

    if (60.0..=110.0).contains(&pitch) {
        let confidence = 0.5 * falloff((pitch - 85.0).abs(), 25.0)
            + 0.25 * falloff(roll.abs(), 15.0)
            + 0.25 * falloff(circular_difference(yaw, 180.0), 45.0);
        return RegionClassification::new(ScalpRegion::Occipital, confidence);
    }

    if let Some(face) = head_pose {
        if (-10.0..=10.0).contains(&pitch) {
            let phone = falloff(pitch.abs() + roll.abs(), 20.0);
            let straight = falloff(face.yaw.abs(), 15.0);
            return RegionClassification::new(ScalpRegion::Frontal, 0.5 * phone + 0.5 * straight);
        }
    }

    if roll.abs() > 30.0 && pitch.abs() < 45.0 {
        let tilt = roll.abs();
        let deviation = [45.0, 30.0, 60.0]
            .iter()
            .map(|ideal| (tilt - ideal).abs())
            .fold(f64::INFINITY, f64::min);
        let confidence = 0.7 * falloff(deviation, 20.0) + 0.3 * falloff(pitch.abs(), 30.0);
        return RegionClassification::new(ScalpRegion::Parietal, confidence);
    }

    if let Some(face) = head_pose {
        if face.yaw.abs() > 30.0 {
            let confidence = 0.7 * falloff((face.yaw.abs() - 45.0).abs(), 20.0) + 0.3 * falloff(face.pitch.abs(), 15.0);
            return RegionClassification::new(ScalpRegion::Temporal, confidence);
        }
    }

    RegionClassification::unknown()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{geometry::BoundingBox, head_pose::EstimationMethod};
    use approx::assert_relative_eq;

    fn phone(pitch: f64, roll: f64, yaw: f64) -> PhoneOrientation {
        PhoneOrientation {
            pitch,
            roll,
            yaw,
            confidence: 1.0,
        }
    }

    fn face(yaw: f64, pitch: f64) -> HeadPoseEstimate {
        HeadPoseEstimate {
            yaw,
            pitch,
            roll: 0.0,
            confidence: 0.9,
            method: EstimationMethod::Hybrid,
            bounds: BoundingBox::centered(0.5, 0.5, 0.3, 0.2),
        }
    }

    #[test]
    fn test_vertex() {
        let result = classify_scalp_region(&phone(-90.0, 0.0, 0.0), None);
        assert_eq!(result.region, ScalpRegion::Vertex);
        assert_relative_eq!(result.confidence, 1.0);
        assert!(result.is_acceptable);

        let result = classify_scalp_region(&phone(-80.0, 3.0, 0.0), None);
        // 0.7 * 0.5 + 0.3 * 0.8
        assert_relative_eq!(result.confidence, 0.59, epsilon = 1e-12);
        assert!(!result.is_acceptable);
    }

    #[test]
    fn test_occipital_uses_circular_yaw() {
        let result = classify_scalp_region(&phone(85.0, 0.0, -175.0), None);
        assert_eq!(result.region, ScalpRegion::Occipital);
        // Yaw is 5 degrees from 180 across the wrap
        assert_relative_eq!(result.confidence, 0.75 + 0.25 * (1.0 - 5.0 / 45.0), epsilon = 1e-12);
    }

    #[test]
    fn test_frontal_needs_face() {
        let level = phone(2.0, 1.0, 0.0);
        assert_eq!(classify_scalp_region(&level, None).region, ScalpRegion::Unknown);

        let result = classify_scalp_region(&level, Some(&face(0.0, 0.0)));
        assert_eq!(result.region, ScalpRegion::Frontal);
        assert_relative_eq!(result.confidence, 0.5 * 0.85 + 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_parietal() {
        let result = classify_scalp_region(&phone(0.0, -45.0, 0.0), None);
        assert_eq!(result.region, ScalpRegion::Parietal);
        assert_relative_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_temporal() {
        let result = classify_scalp_region(&phone(20.0, 0.0, 0.0), Some(&face(-45.0, 0.0)));
        assert_eq!(result.region, ScalpRegion::Temporal);
        assert_relative_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_unknown() {
        let result = classify_scalp_region(&phone(30.0, 0.0, 0.0), None);
        assert_eq!(result, RegionClassification::unknown());
    }
}
