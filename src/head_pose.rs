//! Hybrid head pose estimation.
//!
//! Two estimators run on every detected face:
//! - the landmark method reads the detector's own Euler angles,
//! - the surface-normal method lifts the eyes and nose base to 3-D and
//!   derives yaw and pitch from the face-plane normal.
//!
//! Their weighted blend is passed through a [`PoseStabilizer`] that smooths
//! the angles and tracks jitter.

use crate::{
    angles::FaceRequirements,
    config::{HeadPoseConfig, OpticalFlowConfig},
    constants::{FULL_CONFIDENCE_LANDMARKS, LANDMARK_BASE_CONFIDENCE, SURFACE_NORMAL_CONFIDENCE},
    geometry::{BoundingBox, Point2},
    optical_flow::{AngleTriple, PoseStabilizer},
    utils::{clamp_unit, finite_or_zero, safe_cast::usize_to_f64},
};
use log::trace;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Facial landmark identifiers reported by the upstream detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkKind {
    LeftEye,
    RightEye,
    NoseBase,
    LeftEar,
    RightEar,
    LeftCheek,
    RightCheek,
    MouthLeft,
    MouthRight,
    MouthBottom,
}

/// A single landmark position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub kind: LandmarkKind,
    pub position: Point2,
}

/// One face as reported by the external detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFace {
    /// Face box in normalized frame coordinates
    pub bounds: BoundingBox,
    /// Detector yaw in degrees (positive: subject turned to their right)
    #[serde(default)]
    pub yaw: f64,
    /// Detector pitch in degrees
    #[serde(default)]
    pub pitch: f64,
    /// Detector roll in degrees
    #[serde(default)]
    pub roll: f64,
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
    /// Mean eyes-open probability (0..1), when the detector classifies it
    #[serde(default)]
    pub eyes_open_probability: Option<f64>,
    #[serde(default)]
    pub smiling_probability: Option<f64>,
    /// Frame timestamp in milliseconds
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl DetectedFace {
    /// Position of a landmark, if the detector reported it
    #[must_use]
    pub fn landmark(&self, kind: LandmarkKind) -> Option<Point2> {
        self.landmarks.iter().find(|l| l.kind == kind).map(|l| l.position)
    }
}

/// Which estimator produced a pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMethod {
    Landmark,
    SurfaceNormal,
    Hybrid,
}

/// Head orientation in degrees with a confidence in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPoseEstimate {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub confidence: f64,
    pub method: EstimationMethod,
    pub bounds: BoundingBox,
}

impl HeadPoseEstimate {
    #[must_use]
    pub fn angles(&self) -> AngleTriple {
        AngleTriple::new(self.yaw, self.pitch, self.roll)
    }
}

/// Pose straight from the detector; confidence grows with the landmark count
#[must_use]
pub fn estimate_from_landmarks(face: &DetectedFace) -> HeadPoseEstimate {
    let coverage = (usize_to_f64(face.landmarks.len()) / usize_to_f64(FULL_CONFIDENCE_LANDMARKS)).min(1.0);
    HeadPoseEstimate {
        yaw: finite_or_zero(face.yaw),
        pitch: finite_or_zero(face.pitch),
        roll: finite_or_zero(face.roll),
        confidence: coverage * LANDMARK_BASE_CONFIDENCE,
        method: EstimationMethod::Landmark,
        bounds: face.bounds,
    }
}

/// Pose from the normal of the eyes/nose plane
///
/// Falls back to [`estimate_from_landmarks`] when either eye or the nose
/// base is missing. Roll cannot be recovered from the normal and is taken
/// from the detector.
#[must_use]
pub fn estimate_from_surface_normal(face: &DetectedFace, nose_depth: f64) -> HeadPoseEstimate {
    let (Some(left_eye), Some(right_eye), Some(nose)) = (
        face.landmark(LandmarkKind::LeftEye),
        face.landmark(LandmarkKind::RightEye),
        face.landmark(LandmarkKind::NoseBase),
    ) else {
        return estimate_from_landmarks(face);
    };

    let left = Vector3::new(left_eye.x, left_eye.y, 0.0);
    let right = Vector3::new(right_eye.x, right_eye.y, 0.0);
    let nose = Vector3::new(nose.x, nose.y, nose_depth);

    let normal = (right - left).cross(&(nose - left));
    let normal = normal.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::z);

    HeadPoseEstimate {
        yaw: finite_or_zero(normal.x.atan2(normal.z).to_degrees()),
        pitch: finite_or_zero((-normal.y).clamp(-1.0, 1.0).asin().to_degrees()),
        roll: finite_or_zero(face.roll),
        confidence: SURFACE_NORMAL_CONFIDENCE,
        method: EstimationMethod::SurfaceNormal,
        bounds: face.bounds,
    }
}

/// Weighted blend of the two estimators; confidence is the better of the two
#[must_use]
pub fn blend_estimates(
    landmark: &HeadPoseEstimate,
    surface: &HeadPoseEstimate,
    landmark_weight: f64,
    surface_weight: f64,
) -> HeadPoseEstimate {
    HeadPoseEstimate {
        yaw: landmark.yaw * landmark_weight + surface.yaw * surface_weight,
        pitch: landmark.pitch * landmark_weight + surface.pitch * surface_weight,
        roll: landmark.roll * landmark_weight + surface.roll * surface_weight,
        confidence: clamp_unit(landmark.confidence.max(surface.confidence)),
        method: EstimationMethod::Hybrid,
        bounds: landmark.bounds,
    }
}

/// Hybrid estimator with temporal stabilization
pub struct HeadPoseEstimator {
    config: HeadPoseConfig,
    stabilizer: PoseStabilizer,
}

impl HeadPoseEstimator {
    #[must_use]
    pub fn new(config: &HeadPoseConfig, optical_flow: &OpticalFlowConfig) -> Self {
        Self {
            config: config.clone(),
            stabilizer: PoseStabilizer::new(optical_flow),
        }
    }

    /// Blend both estimators for this frame and stabilize the result
    pub fn estimate(&mut self, face: &DetectedFace) -> HeadPoseEstimate {
        let landmark = estimate_from_landmarks(face);
        let surface = estimate_from_surface_normal(face, self.config.nose_depth);
        let blended = blend_estimates(
            &landmark,
            &surface,
            self.config.landmark_weight,
            self.config.surface_normal_weight,
        );

        let stabilized = self
            .stabilizer
            .update(blended.angles(), blended.confidence, face.timestamp_ms);
        trace!(
            "Head pose raw=({:.1}, {:.1}, {:.1}) stabilized=({:.1}, {:.1}, {:.1}) jitter={:.2}",
            blended.yaw,
            blended.pitch,
            blended.roll,
            stabilized.angles.yaw,
            stabilized.angles.pitch,
            stabilized.angles.roll,
            stabilized.jitter
        );

        HeadPoseEstimate {
            yaw: stabilized.angles.yaw,
            pitch: stabilized.angles.pitch,
            roll: stabilized.angles.roll,
            confidence: stabilized.confidence,
            ..blended
        }
    }

    /// Clear smoothing state and jitter history
    pub fn reset_stabilization(&mut self) {
        self.stabilizer.reset();
    }

    /// Enough recent frames with low jitter
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.stabilizer.is_stable()
    }

    /// Current jitter in degrees
    #[must_use]
    pub fn jitter(&self) -> f64 {
        self.stabilizer.jitter()
    }

    #[must_use]
    pub fn stabilizer(&self) -> &PoseStabilizer {
        &self.stabilizer
    }
}

impl Default for HeadPoseEstimator {
    fn default() -> Self {
        Self::new(&HeadPoseConfig::default(), &OpticalFlowConfig::default())
    }
}

/// Head pose compared against a capture angle's ranges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPoseCheck {
    pub valid: bool,
    pub yaw_valid: bool,
    pub pitch_valid: bool,
    pub roll_valid: bool,
    /// 0..100
    pub score: f64,
}

/// Inclusive range check with a per-axis score
///
/// Each axis scores 100 inside its range and loses one point per degree of
/// distance from the range centre otherwise.
#[must_use]
pub fn validate_head_pose(pose: &HeadPoseEstimate, requirements: &FaceRequirements) -> HeadPoseCheck {
    let axis = |value: f64, range: &crate::angles::AngleRange| {
        if range.contains(value) {
            (true, 100.0)
        } else {
            (false, (100.0 - (value - range.center()).abs()).max(0.0))
        }
    };
    let (yaw_valid, yaw_score) = axis(pose.yaw, &requirements.yaw);
    let (pitch_valid, pitch_score) = axis(pose.pitch, &requirements.pitch);
    let (roll_valid, roll_score) = axis(pose.roll, &requirements.roll);

    HeadPoseCheck {
        valid: yaw_valid && pitch_valid && roll_valid,
        yaw_valid,
        pitch_valid,
        roll_valid,
        score: (yaw_score + pitch_score + roll_score) / 3.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angles::AngleRange;
    use approx::assert_relative_eq;

    fn face_with_landmarks(count: usize) -> DetectedFace {
        let kinds = [
            LandmarkKind::LeftEye,
            LandmarkKind::RightEye,
            LandmarkKind::NoseBase,
            LandmarkKind::LeftEar,
            LandmarkKind::RightEar,
            LandmarkKind::LeftCheek,
            LandmarkKind::RightCheek,
            LandmarkKind::MouthLeft,
            LandmarkKind::MouthRight,
            LandmarkKind::MouthBottom,
        ];
        let positions = [
            Point2::new(400.0, 500.0),
            Point2::new(680.0, 500.0),
            Point2::new(540.0, 700.0),
        ];
        DetectedFace {
            bounds: BoundingBox::centered(0.5, 0.5, 0.35, 0.25),
            yaw: 3.0,
            pitch: -2.0,
            roll: 1.0,
            landmarks: kinds
                .iter()
                .take(count)
                .enumerate()
                .map(|(i, kind)| Landmark {
                    kind: *kind,
                    position: positions.get(i).copied().unwrap_or_default(),
                })
                .collect(),
            eyes_open_probability: Some(0.95),
            smiling_probability: None,
            timestamp_ms: 0,
        }
    }

    #[test]
    fn test_landmark_confidence_scales_with_count() {
        assert_relative_eq!(estimate_from_landmarks(&face_with_landmarks(10)).confidence, 0.8);
        assert_relative_eq!(estimate_from_landmarks(&face_with_landmarks(5)).confidence, 0.4);
        assert_eq!(estimate_from_landmarks(&face_with_landmarks(0)).confidence, 0.0);
    }

    #[test]
    fn test_surface_normal_frontal_face() {
        let pose = estimate_from_surface_normal(&face_with_landmarks(10), 10.0);
        assert_eq!(pose.method, EstimationMethod::SurfaceNormal);
        assert_relative_eq!(pose.yaw, 0.0, epsilon = 1e-9);
        // Normal is (0, -2800, 56000) normalized
        let expected_pitch = (2800.0_f64 / (2800.0_f64.powi(2) + 56000.0_f64.powi(2)).sqrt()).asin().to_degrees();
        assert_relative_eq!(pose.pitch, expected_pitch, epsilon = 1e-9);
        assert_relative_eq!(pose.roll, 1.0);
        assert_relative_eq!(pose.confidence, 0.85);
    }

    #[test]
    fn test_surface_normal_falls_back_without_nose() {
        let pose = estimate_from_surface_normal(&face_with_landmarks(2), 10.0);
        assert_eq!(pose.method, EstimationMethod::Landmark);
        assert_relative_eq!(pose.yaw, 3.0);
    }

    #[test]
    fn test_degenerate_landmarks_use_default_normal() {
        let mut face = face_with_landmarks(3);
        for landmark in &mut face.landmarks {
            landmark.position = Point2::new(100.0, 100.0);
        }
        // Coincident eyes give a zero normal, replaced by +z
        let pose = estimate_from_surface_normal(&face, 10.0);
        assert_eq!(pose.yaw, 0.0);
        assert_eq!(pose.pitch, 0.0);
    }

    #[test]
    fn test_blend_weights_and_confidence() {
        let face = face_with_landmarks(10);
        let landmark = estimate_from_landmarks(&face);
        let surface = estimate_from_surface_normal(&face, 10.0);
        let blended = blend_estimates(&landmark, &surface, 0.4, 0.6);
        assert_relative_eq!(blended.yaw, 0.4 * 3.0 + 0.6 * surface.yaw);
        assert_relative_eq!(blended.confidence, 0.85);
        assert_eq!(blended.method, EstimationMethod::Hybrid);
    }

    #[test]
    fn test_estimator_stabilizes_over_time() {
        let mut estimator = HeadPoseEstimator::default();
        let mut face = face_with_landmarks(10);
        for i in 0..20u64 {
            face.timestamp_ms = i * 33;
            estimator.estimate(&face);
        }
        assert!(estimator.is_stable());
        assert!(estimator.jitter() < 1e-9);

        estimator.reset_stabilization();
        assert!(!estimator.is_stable());
    }

    #[test]
    fn test_validate_head_pose() {
        let requirements = FaceRequirements {
            yaw: AngleRange::new(-4.0, 4.0),
            pitch: AngleRange::new(-6.0, 6.0),
            roll: AngleRange::new(-3.0, 3.0),
        };
        let mut pose = estimate_from_landmarks(&face_with_landmarks(10));
        pose.yaw = 4.0;
        pose.pitch = -6.0;
        pose.roll = 0.0;
        let check = validate_head_pose(&pose, &requirements);
        assert!(check.valid);
        assert_relative_eq!(check.score, 100.0);

        pose.yaw = 20.0;
        let check = validate_head_pose(&pose, &requirements);
        assert!(!check.yaw_valid);
        assert!(!check.valid);
        assert_relative_eq!(check.score, (80.0 + 100.0 + 100.0) / 3.0);
    }
}
