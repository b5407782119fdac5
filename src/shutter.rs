//! Auto-shutter decision engine.
//!
//! Seven boolean conditions and a weighted confidence score are computed
//! from the analyzer outputs on every tick. The shutter becomes ready once
//! all conditions hold with enough confidence for the angle's stability
//! duration; a capture lock then runs a tick-driven countdown that is
//! cancelled as soon as any condition drops.

use crate::{
    angles::AngleConfig,
    config::{ConfidenceConfig, LightingConfig},
    constants::{
        CENTERING_WEIGHT, CONFIDENCE_AUTO_CAPTURE, CONFIDENCE_PERFECT, CONFIDENCE_USER_GUIDANCE, COUNTDOWN_SECONDS,
        DISTANCE_WEIGHT, MISSING_IOU_SCORE, OFF_CENTER_SCORE, OUT_OF_RANGE_DISTANCE_SCORE, PHONE_ANGLE_WEIGHT,
        POSE_WEIGHT, QUALITY_WEIGHT, REGION_MATCH_WEIGHT,
    },
    distance::{DistanceEstimate, DistanceRecommendation},
    feedback::{centering_guidance, head_adjustment, phone_adjustment, Guidance, PhoneAdjustment},
    geometry::BoundingBox,
    head_pose::{validate_head_pose, HeadPoseEstimate},
    lighting::LightingAnalysis,
    region::RegionClassification,
    sensor_fusion::PhoneOrientation,
    silhouette::{AlignmentFeedback, IoUResult, IouQuality},
    utils::{
        clamp_unit,
        safe_cast::{f64_to_u32_clamp, u64_to_f64},
    },
};
use log::{debug, info};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// The seven gating conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CaptureConditions {
    pub head_angle_correct: bool,
    pub phone_angle_correct: bool,
    pub region_correct: bool,
    pub distance_correct: bool,
    pub lighting_ok: bool,
    pub mask_stable: bool,
    pub jitter_low: bool,
}

impl CaptureConditions {
    #[must_use]
    pub fn all_met(&self) -> bool {
        self.as_array().iter().all(|(_, met)| *met)
    }

    #[must_use]
    pub fn met_count(&self) -> usize {
        self.as_array().iter().filter(|(_, met)| *met).count()
    }

    /// Named conditions in reporting order
    #[must_use]
    pub fn as_array(&self) -> [(&'static str, bool); 7] {
        [
            ("head angle", self.head_angle_correct),
            ("phone angle", self.phone_angle_correct),
            ("region", self.region_correct),
            ("distance", self.distance_correct),
            ("lighting", self.lighting_ok),
            ("mask stable", self.mask_stable),
            ("jitter low", self.jitter_low),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ConfidenceLevel {
    Reject,
    UserGuidance,
    AutoCapture,
    Perfect,
}

impl ConfidenceLevel {
    #[must_use]
    pub fn from_score(overall: f64) -> Self {
        if overall >= CONFIDENCE_PERFECT {
            Self::Perfect
        } else if overall >= CONFIDENCE_AUTO_CAPTURE {
            Self::AutoCapture
        } else if overall >= CONFIDENCE_USER_GUIDANCE {
            Self::UserGuidance
        } else {
            Self::Reject
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Reject => "reject",
            Self::UserGuidance => "user guidance",
            Self::AutoCapture => "auto capture",
            Self::Perfect => "perfect",
        };
        f.write_str(text)
    }
}

/// Weighted confidence with its six components, all in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AngleConfidenceScore {
    pub overall: f64,
    pub pose: f64,
    pub phone_angle: f64,
    pub centering: f64,
    pub distance: f64,
    pub region_match: f64,
    pub quality: f64,
    pub level: ConfidenceLevel,
}

impl AngleConfidenceScore {
    /// Clamp the components and combine them with the fixed weights
    #[must_use]
    pub fn from_components(
        pose: f64,
        phone_angle: f64,
        centering: f64,
        distance: f64,
        region_match: f64,
        quality: f64,
    ) -> Self {
        let pose = clamp_unit(pose);
        let phone_angle = clamp_unit(phone_angle);
        let centering = clamp_unit(centering);
        let distance = clamp_unit(distance);
        let region_match = clamp_unit(region_match);
        let quality = clamp_unit(quality);

        let overall = clamp_unit(
            pose * POSE_WEIGHT
                + phone_angle * PHONE_ANGLE_WEIGHT
                + centering * CENTERING_WEIGHT
                + distance * DISTANCE_WEIGHT
                + region_match * REGION_MATCH_WEIGHT
                + quality * QUALITY_WEIGHT,
        );

        Self {
            overall,
            pose,
            phone_angle,
            centering,
            distance,
            region_match,
            quality,
            level: ConfidenceLevel::from_score(overall),
        }
    }
}

/// Per-tick measurements handed to the shutter
///
/// Missing measurements leave their conditions false and their score
/// components at zero.
#[derive(Debug, Clone, Default)]
pub struct ShutterInputs<'a> {
    pub timestamp_ms: u64,
    pub orientation: Option<&'a PhoneOrientation>,
    pub head_pose: Option<&'a HeadPoseEstimate>,
    /// Head pose confidence on face angles, stabilized phone confidence on
    /// sensor-only angles
    pub pose_confidence: f64,
    /// Stabilizer reports low jitter
    pub pose_stable: bool,
    /// Observed subject box used for centering
    pub subject: Option<BoundingBox>,
    pub distance: Option<&'a DistanceEstimate>,
    pub iou: Option<&'a IoUResult>,
    pub alignment: Option<AlignmentFeedback>,
    pub lighting: Option<&'a LightingAnalysis>,
    pub region: Option<RegionClassification>,
    /// Adaptive validator asks to hold the capture
    pub validator_hold: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShutterPhase {
    Idle,
    ConditionsPending,
    AllConditionsMet,
    Stabilizing,
    Ready,
    Captured,
}

impl fmt::Display for ShutterPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Idle => "idle",
            Self::ConditionsPending => "conditions pending",
            Self::AllConditionsMet => "all conditions met",
            Self::Stabilizing => "stabilizing",
            Self::Ready => "ready",
            Self::Captured => "captured",
        };
        f.write_str(text)
    }
}

/// Decision produced for one tick
#[derive(Debug, Clone)]
pub struct AutoShutterState {
    pub timestamp_ms: u64,
    pub phase: ShutterPhase,
    pub ready: bool,
    /// Seconds left before the photo is taken while the lock is engaged
    pub countdown: Option<u32>,
    /// The capture fired on this tick
    pub captured: bool,
    /// Time left in the stabilization hold
    pub hold_remaining_ms: Option<u64>,
    pub conditions: CaptureConditions,
    pub centered: bool,
    pub confidence_score: AngleConfidenceScore,
    /// Unmet requirements, highest priority first
    pub blockers: Vec<Guidance>,
    pub guidance: Guidance,
    pub feedback: String,
    /// Auxiliary scalp region classification
    pub region: Option<RegionClassification>,
}

impl AutoShutterState {
    /// Overall confidence as a whole percentage
    #[must_use]
    pub fn progress_percent(&self) -> u32 {
        f64_to_u32_clamp((self.confidence_score.overall * 100.0).round(), 0, 100)
    }

    /// Multi-line report of conditions, scores and recommendations
    #[must_use]
    pub fn detailed(&self) -> String {
        let score = &self.confidence_score;
        let mut report = String::new();
        let _ = writeln!(
            report,
            "Phase: {} | confidence {}% ({}) | {}/7 conditions",
            self.phase,
            self.progress_percent(),
            score.level,
            self.conditions.met_count()
        );
        let _ = writeln!(report, "Conditions:");
        for (name, met) in self.conditions.as_array() {
            let _ = writeln!(report, "  [{}] {name}", if met { "x" } else { " " });
        }
        let _ = writeln!(report, "  [{}] centered", if self.centered { "x" } else { " " });
        let _ = writeln!(
            report,
            "Scores: pose {:.2}, phone {:.2}, centering {:.2}, distance {:.2}, region {:.2}, quality {:.2}",
            score.pose, score.phone_angle, score.centering, score.distance, score.region_match, score.quality
        );
        if let Some(region) = &self.region {
            let _ = writeln!(report, "Region: {} ({:.0}%)", region.region, region.confidence * 100.0);
        }
        if self.blockers.is_empty() {
            let _ = writeln!(report, "Recommendations: none");
        } else {
            let _ = writeln!(report, "Recommendations:");
            for blocker in &self.blockers {
                let _ = writeln!(report, "  - {blocker}");
            }
        }
        let _ = write!(report, "Feedback: {}", self.feedback);
        report
    }
}

/// Tick-driven shutter for one capture angle
#[derive(Debug, Clone)]
pub struct AutoShutter {
    angle: AngleConfig,
    auto_capture_threshold: f64,
    lighting_ok_score: f64,
    phase: ShutterPhase,
    stable_since_ms: Option<u64>,
    locked_at_ms: Option<u64>,
}

impl AutoShutter {
    #[must_use]
    pub fn new(angle: AngleConfig, confidence: &ConfidenceConfig, lighting: &LightingConfig) -> Self {
        Self {
            angle,
            auto_capture_threshold: confidence.auto_capture_threshold,
            lighting_ok_score: lighting.ok_score,
            phase: ShutterPhase::Idle,
            stable_since_ms: None,
            locked_at_ms: None,
        }
    }

    #[must_use]
    pub fn angle_config(&self) -> &AngleConfig {
        &self.angle
    }

    /// Switch to another angle, starting from `Idle`
    pub fn set_angle(&mut self, angle: AngleConfig) {
        self.angle = angle;
        self.reset();
    }

    #[must_use]
    pub fn phase(&self) -> ShutterPhase {
        self.phase
    }

    /// The capture lock is engaged
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked_at_ms.is_some()
    }

    /// Release the lock and clear the stability timer
    pub fn reset(&mut self) {
        if self.phase != ShutterPhase::Idle {
            info!("Auto-shutter reset for {}", self.angle.angle);
        }
        self.phase = ShutterPhase::Idle;
        self.stable_since_ms = None;
        self.locked_at_ms = None;
    }

    /// Evaluate the seven conditions for this tick
    #[must_use]
    pub fn conditions(&self, inputs: &ShutterInputs<'_>) -> CaptureConditions {
        let head_angle_correct = match self.angle.face_requirements() {
            Some(requirements) => inputs
                .head_pose
                .is_some_and(|pose| validate_head_pose(pose, requirements).valid),
            None => true,
        };
        let region_correct = !self.angle.region_required() || inputs.iou.is_some_and(|r| r.aligned);

        CaptureConditions {
            head_angle_correct,
            phone_angle_correct: inputs
                .orientation
                .is_some_and(|o| self.angle.phone.is_satisfied_by(o)),
            region_correct,
            distance_correct: inputs.distance.is_some_and(|d| d.is_in_range),
            lighting_ok: inputs.lighting.is_some_and(|l| l.score >= self.lighting_ok_score),
            mask_stable: inputs.iou.is_some_and(|r| r.quality != IouQuality::Poor),
            jitter_low: inputs.pose_stable,
        }
    }

    /// Combine the measurements into the weighted confidence score
    #[must_use]
    pub fn calculate_confidence(&self, inputs: &ShutterInputs<'_>, centered: bool) -> AngleConfidenceScore {
        let distance = inputs.distance.map_or(0.0, |d| {
            if d.confidence <= 0.0 {
                0.0
            } else if d.is_in_range {
                d.confidence
            } else {
                OUT_OF_RANGE_DISTANCE_SCORE
            }
        });
        AngleConfidenceScore::from_components(
            inputs.pose_confidence,
            inputs.orientation.map_or(0.0, |o| o.confidence),
            if centered { 1.0 } else { OFF_CENTER_SCORE },
            distance,
            inputs.iou.map_or(MISSING_IOU_SCORE, |r| r.iou),
            inputs.lighting.map_or(0.0, |l| l.score / 100.0),
        )
    }

    /// Advance the state machine by one tick
    pub fn evaluate(&mut self, inputs: &ShutterInputs<'_>) -> AutoShutterState {
        let now = inputs.timestamp_ms;
        let conditions = self.conditions(inputs);
        let tolerance = self.angle.centering_tolerance();
        let centered = inputs
            .subject
            .is_some_and(|b| !b.is_degenerate() && centering_guidance(&b, tolerance).is_none());
        let confidence_score = self.calculate_confidence(inputs, centered);
        let confident = confidence_score.overall >= self.auto_capture_threshold;
        let mut blockers = self.blockers(inputs, &conditions);

        let previous = self.phase;
        let mut countdown = None;
        let mut captured = false;
        let mut hold_remaining_ms = None;

        if self.phase == ShutterPhase::Captured {
            // Stays captured until reset
        } else if !conditions.all_met() {
            self.cancel_lock(now);
            self.phase = ShutterPhase::ConditionsPending;
        } else if !confident || inputs.validator_hold {
            self.cancel_lock(now);
            self.phase = ShutterPhase::AllConditionsMet;
        } else {
            let since = *self.stable_since_ms.get_or_insert(now);
            let held_ms = now.saturating_sub(since);
            let stability_ms = self.angle.stability_ms();

            if self.locked_at_ms.is_none() && held_ms < stability_ms {
                self.phase = ShutterPhase::Stabilizing;
                hold_remaining_ms = Some(stability_ms - held_ms);
            } else {
                let locked_at = *self.locked_at_ms.get_or_insert_with(|| {
                    info!("Capture lock engaged for {} after {held_ms} ms", self.angle.angle);
                    now
                });
                let elapsed_s = now.saturating_sub(locked_at) / 1000;
                if elapsed_s >= u64::from(COUNTDOWN_SECONDS) {
                    info!("Capture fired for {}", self.angle.angle);
                    self.phase = ShutterPhase::Captured;
                    captured = true;
                } else {
                    self.phase = ShutterPhase::Ready;
                    let left = u64::from(COUNTDOWN_SECONDS) - elapsed_s;
                    countdown = Some(u32::try_from(left).unwrap_or(COUNTDOWN_SECONDS));
                }
            }
        }

        if previous != self.phase {
            debug!("Auto-shutter phase {previous} -> {}", self.phase);
        }

        let ready = self.phase == ShutterPhase::Ready || captured;
        if !ready && self.phase != ShutterPhase::Captured && blockers.is_empty() && !confident {
            blockers.push(Guidance::QualityInsufficient);
        }

        let guidance = match (self.phase, countdown) {
            (ShutterPhase::Captured, _) => Guidance::Captured,
            (ShutterPhase::Ready, Some(countdown)) => Guidance::Capturing { countdown },
            _ => {
                if let Some(first) = blockers.first() {
                    first.clone()
                } else if let Some(remaining_ms) = hold_remaining_ms {
                    Guidance::HoldSteady { remaining_ms }
                } else if inputs.validator_hold {
                    Guidance::Verifying
                } else {
                    Guidance::CheckingPosition
                }
            }
        };

        let mut feedback = guidance.to_string();
        if !ready && self.phase != ShutterPhase::Captured && confidence_score.overall < 0.5 {
            let _ = write!(
                feedback,
                " (quality {}%)",
                f64_to_u32_clamp((confidence_score.overall * 100.0).round(), 0, 100)
            );
        }

        debug!(
            "{} t={now} phase={} conditions={}/7 confidence={:.3} feedback={feedback}",
            self.angle.angle,
            self.phase,
            conditions.met_count(),
            confidence_score.overall
        );

        AutoShutterState {
            timestamp_ms: now,
            phase: self.phase,
            ready,
            countdown,
            captured,
            hold_remaining_ms,
            conditions,
            centered,
            confidence_score,
            blockers,
            guidance,
            feedback,
            region: inputs.region,
        }
    }

    fn cancel_lock(&mut self, now: u64) {
        if let Some(locked_at) = self.locked_at_ms.take() {
            info!(
                "Countdown cancelled for {} after {:.1}s",
                self.angle.angle,
                u64_to_f64(now.saturating_sub(locked_at)) / 1000.0
            );
        }
        self.stable_since_ms = None;
    }

    /// Unmet requirements in priority order: centering, head angle, phone
    /// angle, region, distance, lighting, mask stability, jitter
    fn blockers(&self, inputs: &ShutterInputs<'_>, conditions: &CaptureConditions) -> Vec<Guidance> {
        let mut blockers = Vec::new();
        let mut push = |guidance: Guidance| {
            if !blockers.contains(&guidance) {
                blockers.push(guidance);
            }
        };

        match inputs.subject.filter(|b| !b.is_degenerate()) {
            Some(subject) => {
                if let Some(guidance) = centering_guidance(&subject, self.angle.centering_tolerance()) {
                    push(guidance);
                }
            }
            None => push(Guidance::NoSubject),
        }

        if !conditions.head_angle_correct {
            let adjustment = inputs
                .head_pose
                .zip(self.angle.face_requirements())
                .and_then(|(pose, requirements)| head_adjustment(pose, requirements));
            push(adjustment.map_or(Guidance::NoSubject, Guidance::HeadAngle));
        }

        if !conditions.phone_angle_correct {
            let adjustment = inputs
                .orientation
                .and_then(|o| phone_adjustment(o, &self.angle.phone))
                .unwrap_or(PhoneAdjustment::Level);
            push(Guidance::PhoneAngle(adjustment));
        }

        if !conditions.region_correct {
            match inputs.alignment {
                Some(alignment @ AlignmentFeedback::Adjust { .. }) => push(Guidance::Alignment(alignment)),
                _ => {
                    if let Some(region) = self.angle.region_detection() {
                        push(Guidance::Region(region.target_region));
                    }
                }
            }
        }

        if !conditions.distance_correct {
            let recommendation = inputs
                .distance
                .map_or(DistanceRecommendation::NoSubject, |d| d.recommendation);
            if recommendation == DistanceRecommendation::NoSubject {
                push(Guidance::NoSubject);
            } else {
                push(Guidance::Distance(recommendation));
            }
        }

        if !conditions.lighting_ok {
            push(Guidance::Lighting(
                inputs.lighting.map_or("Waiting for the camera image", LightingAnalysis::recommendation),
            ));
        }

        if !conditions.mask_stable {
            push(inputs.alignment.map_or(Guidance::NoSubject, Guidance::Alignment));
        }

        if !conditions.jitter_low {
            push(Guidance::HoldStill);
        }

        blockers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        angles::CaptureAngle,
        distance::DistanceMethod,
        head_pose::EstimationMethod,
        lighting::{LightingQuality, LuminanceHistogram},
    };
    use approx::assert_relative_eq;

    struct Fixture {
        orientation: PhoneOrientation,
        pose: HeadPoseEstimate,
        distance: DistanceEstimate,
        iou: IoUResult,
        lighting: LightingAnalysis,
    }

    impl Fixture {
        fn front() -> Self {
            Self {
                orientation: PhoneOrientation {
                    pitch: 0.0,
                    roll: 0.0,
                    yaw: 0.0,
                    confidence: 1.0,
                },
                pose: HeadPoseEstimate {
                    yaw: 0.0,
                    pitch: 0.0,
                    roll: 0.0,
                    confidence: 0.95,
                    method: EstimationMethod::Hybrid,
                    bounds: BoundingBox::centered(0.5, 0.5, 0.33, 0.24),
                },
                distance: DistanceEstimate {
                    distance_cm: 33.0,
                    confidence: 0.9,
                    method: DistanceMethod::Fusion,
                    is_in_range: true,
                    recommendation: DistanceRecommendation::Perfect,
                },
                iou: IoUResult {
                    iou: 0.85,
                    quality: IouQuality::Perfect,
                    aligned: true,
                    offset_x: 0.0,
                    offset_y: 0.0,
                },
                lighting: LuminanceHistogram::uniform(60, 239, 10).analyze(),
            }
        }

        fn inputs(&self, timestamp_ms: u64) -> ShutterInputs<'_> {
            ShutterInputs {
                timestamp_ms,
                orientation: Some(&self.orientation),
                head_pose: Some(&self.pose),
                pose_confidence: self.pose.confidence,
                pose_stable: true,
                subject: Some(self.pose.bounds),
                distance: Some(&self.distance),
                iou: Some(&self.iou),
                alignment: Some(AlignmentFeedback::Perfect),
                lighting: Some(&self.lighting),
                region: None,
                validator_hold: false,
            }
        }
    }

    fn shutter(angle: CaptureAngle) -> AutoShutter {
        AutoShutter::new(
            AngleConfig::for_angle(angle),
            &ConfidenceConfig::default(),
            &LightingConfig::default(),
        )
    }

    #[test]
    fn test_weights_sum_to_one() {
        let sum = POSE_WEIGHT
            + PHONE_ANGLE_WEIGHT
            + CENTERING_WEIGHT
            + DISTANCE_WEIGHT
            + REGION_MATCH_WEIGHT
            + QUALITY_WEIGHT;
        assert_relative_eq!(sum, 1.0, epsilon = 1e-6);
        assert_relative_eq!(AngleConfidenceScore::from_components(1.0, 1.0, 1.0, 1.0, 1.0, 1.0).overall, 1.0);
    }

    #[test]
    fn test_levels() {
        assert_eq!(ConfidenceLevel::from_score(0.96), ConfidenceLevel::Perfect);
        assert_eq!(ConfidenceLevel::from_score(0.85), ConfidenceLevel::AutoCapture);
        assert_eq!(ConfidenceLevel::from_score(0.7), ConfidenceLevel::UserGuidance);
        assert_eq!(ConfidenceLevel::from_score(0.69), ConfidenceLevel::Reject);
    }

    #[test]
    fn test_phases_to_capture() {
        let fixture = Fixture::front();
        let mut shutter = shutter(CaptureAngle::Front);
        assert_eq!(shutter.phase(), ShutterPhase::Idle);

        let state = shutter.evaluate(&fixture.inputs(0));
        assert_eq!(state.phase, ShutterPhase::Stabilizing);
        assert_eq!(state.hold_remaining_ms, Some(1200));
        assert!(!state.ready);

        let state = shutter.evaluate(&fixture.inputs(1199));
        assert_eq!(state.phase, ShutterPhase::Stabilizing);

        let state = shutter.evaluate(&fixture.inputs(1200));
        assert_eq!(state.phase, ShutterPhase::Ready);
        assert!(state.ready);
        assert_eq!(state.countdown, Some(3));
        assert!(shutter.is_locked());
        assert!(state.confidence_score.level >= ConfidenceLevel::AutoCapture);

        let state = shutter.evaluate(&fixture.inputs(2300));
        assert_eq!(state.countdown, Some(2));

        let state = shutter.evaluate(&fixture.inputs(4200));
        assert_eq!(state.phase, ShutterPhase::Captured);
        assert!(state.captured);

        let state = shutter.evaluate(&fixture.inputs(4300));
        assert_eq!(state.phase, ShutterPhase::Captured);
        assert!(!state.captured);

        shutter.reset();
        assert_eq!(shutter.phase(), ShutterPhase::Idle);
        assert!(!shutter.is_locked());
    }

    #[test]
    fn test_countdown_cancelled_when_condition_drops() {
        let mut fixture = Fixture::front();
        let mut shutter = shutter(CaptureAngle::Front);
        shutter.evaluate(&fixture.inputs(0));
        assert!(shutter.evaluate(&fixture.inputs(1300)).ready);

        fixture.pose.yaw = 20.0;
        let state = shutter.evaluate(&fixture.inputs(1400));
        assert_eq!(state.phase, ShutterPhase::ConditionsPending);
        assert!(!state.ready);
        assert!(!shutter.is_locked());
        assert_eq!(state.guidance, Guidance::HeadAngle(crate::feedback::HeadAdjustment::TurnLeft));

        // The stability timer restarts
        fixture.pose.yaw = 0.0;
        assert_eq!(shutter.evaluate(&fixture.inputs(1500)).phase, ShutterPhase::Stabilizing);
    }

    #[test]
    fn test_low_confidence_holds_in_all_conditions_met() {
        let mut fixture = Fixture::front();
        fixture.orientation.confidence = 0.1;
        fixture.pose.confidence = 0.5;
        let mut shutter = shutter(CaptureAngle::Front);
        let state = shutter.evaluate(&fixture.inputs(0));
        assert!(state.conditions.all_met());
        assert_eq!(state.phase, ShutterPhase::AllConditionsMet);
        assert_eq!(state.blockers, vec![Guidance::QualityInsufficient]);
    }

    #[test]
    fn test_lighting_blocks() {
        let mut fixture = Fixture::front();
        fixture.lighting = LuminanceHistogram::uniform(0, 30, 10).analyze();
        assert_eq!(fixture.lighting.quality, LightingQuality::Poor);
        let mut shutter = shutter(CaptureAngle::Front);
        let state = shutter.evaluate(&fixture.inputs(0));
        assert!(!state.conditions.lighting_ok);
        assert!(!state.ready);
        assert_eq!(state.guidance, Guidance::Lighting("Move to a brighter place"));
    }

    #[test]
    fn test_missing_inputs() {
        let mut shutter = shutter(CaptureAngle::Front);
        let state = shutter.evaluate(&ShutterInputs::default());
        assert_eq!(state.conditions.met_count(), 1); // region not required on FRONT
        assert_eq!(state.guidance, Guidance::NoSubject);
        assert!(state.feedback.ends_with("%)"));
        assert_eq!(state.phase, ShutterPhase::ConditionsPending);
    }

    #[test]
    fn test_sensor_only_region_gate() {
        let mut fixture = Fixture::front();
        fixture.orientation.pitch = -90.0;
        fixture.iou.aligned = false;
        fixture.iou.quality = IouQuality::Acceptable;
        let mut shutter = shutter(CaptureAngle::Vertex);
        let mut inputs = fixture.inputs(0);
        inputs.head_pose = None;
        inputs.distance = None;
        let state = shutter.evaluate(&inputs);
        assert!(state.conditions.head_angle_correct);
        assert!(state.conditions.phone_angle_correct);
        assert!(!state.conditions.region_correct);
        assert!(state.blockers.contains(&Guidance::Region(crate::region::ScalpRegion::Vertex)));
    }

    #[test]
    fn test_detailed_report() {
        let fixture = Fixture::front();
        let mut shutter = shutter(CaptureAngle::Front);
        let state = shutter.evaluate(&fixture.inputs(0));
        let report = state.detailed();
        assert!(report.contains("7/7 conditions"));
        assert!(report.contains("[x] head angle"));
        assert!(report.contains("Recommendations: none"));
        assert!(state.progress_percent() >= 85);
    }
}
