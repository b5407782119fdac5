//! User guidance.
//!
//! Every tick produces at most one [`Guidance`] for the user. Hosts may match
//! on the enum to localize; the `Display` impl is the English sentence.

use crate::{
    angles::{FaceRequirements, PhoneTarget},
    distance::DistanceRecommendation,
    geometry::BoundingBox,
    head_pose::HeadPoseEstimate,
    region::ScalpRegion,
    sensor_fusion::PhoneOrientation,
    silhouette::{AlignmentFeedback, HorizontalShift, VerticalShift},
    utils::circular_difference,
};
use std::fmt;

/// Head correction, most significant axis first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadAdjustment {
    TurnLeft,
    TurnRight,
    ChinUp,
    ChinDown,
    Straighten,
}

/// Phone correction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhoneAdjustment {
    TiltUp,
    TiltDown,
    Level,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Guidance {
    NoSubject,
    Center {
        horizontal: Option<HorizontalShift>,
        vertical: Option<VerticalShift>,
    },
    HeadAngle(HeadAdjustment),
    PhoneAngle(PhoneAdjustment),
    Region(ScalpRegion),
    Distance(DistanceRecommendation),
    Lighting(&'static str),
    Alignment(AlignmentFeedback),
    HoldStill,
    Verifying,
    QualityInsufficient,
    CheckingPosition,
    HoldSteady { remaining_ms: u64 },
    Capturing { countdown: u32 },
    Captured,
}

impl fmt::Display for Guidance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSubject => f.write_str("Position your head inside the frame"),
            Self::Center { horizontal, vertical } => {
                let horizontal = horizontal.map(|h| match h {
                    HorizontalShift::Left => "left",
                    HorizontalShift::Right => "right",
                });
                let vertical = vertical.map(|v| match v {
                    VerticalShift::Up => "up",
                    VerticalShift::Down => "down",
                });
                match (horizontal, vertical) {
                    (Some(h), Some(v)) => write!(f, "Center your head: move the phone {h} and {v}"),
                    (Some(d), None) | (None, Some(d)) => write!(f, "Center your head: move the phone {d}"),
                    (None, None) => f.write_str("Center your head in the frame"),
                }
            }
            Self::HeadAngle(adjustment) => f.write_str(match adjustment {
                HeadAdjustment::TurnLeft => "Turn your head to the left",
                HeadAdjustment::TurnRight => "Turn your head to the right",
                HeadAdjustment::ChinUp => "Raise your chin slightly",
                HeadAdjustment::ChinDown => "Lower your chin slightly",
                HeadAdjustment::Straighten => "Keep your head straight",
            }),
            Self::PhoneAngle(adjustment) => f.write_str(match adjustment {
                PhoneAdjustment::TiltUp => "Tilt the phone up",
                PhoneAdjustment::TiltDown => "Tilt the phone down",
                PhoneAdjustment::Level => "Hold the phone level",
            }),
            Self::Region(region) => write!(f, "Aim the camera at the {region} area"),
            Self::Distance(recommendation) => write!(f, "{recommendation}"),
            Self::Lighting(advice) => f.write_str(advice),
            Self::Alignment(alignment) => write!(f, "{alignment}"),
            Self::HoldStill => f.write_str("Too much movement, hold still"),
            Self::Verifying => f.write_str("Hold on, verifying the position"),
            Self::QualityInsufficient => f.write_str("Position quality insufficient"),
            Self::CheckingPosition => f.write_str("Checking position..."),
            Self::HoldSteady { remaining_ms } => {
                write!(f, "Hold steady ({:.1}s)", crate::utils::safe_cast::u64_to_f64(*remaining_ms) / 1000.0)
            }
            Self::Capturing { countdown } => write!(f, "Perfect! Capturing in {countdown}"),
            Self::Captured => f.write_str("Photo captured"),
        }
    }
}

/// Where to move the phone so `bounds` lands in the middle of the frame
///
/// `tolerance` is a fraction of the frame. `None` when already centred.
#[must_use]
pub fn centering_guidance(bounds: &BoundingBox, tolerance: f64) -> Option<Guidance> {
    let (cx, cy) = bounds.center();
    let horizontal = if cx < 0.5 - tolerance {
        Some(HorizontalShift::Left)
    } else if cx > 0.5 + tolerance {
        Some(HorizontalShift::Right)
    } else {
        None
    };
    let vertical = if cy < 0.5 - tolerance {
        Some(VerticalShift::Up)
    } else if cy > 0.5 + tolerance {
        Some(VerticalShift::Down)
    } else {
        None
    };
    if horizontal.is_none() && vertical.is_none() {
        None
    } else {
        Some(Guidance::Center { horizontal, vertical })
    }
}

/// Correction for the first out-of-range head axis (yaw, pitch, roll)
#[must_use]
pub fn head_adjustment(pose: &HeadPoseEstimate, requirements: &FaceRequirements) -> Option<HeadAdjustment> {
    if pose.yaw < requirements.yaw.min {
        Some(HeadAdjustment::TurnRight)
    } else if pose.yaw > requirements.yaw.max {
        Some(HeadAdjustment::TurnLeft)
    } else if pose.pitch < requirements.pitch.min {
        Some(HeadAdjustment::ChinUp)
    } else if pose.pitch > requirements.pitch.max {
        Some(HeadAdjustment::ChinDown)
    } else if !requirements.roll.contains(pose.roll) {
        Some(HeadAdjustment::Straighten)
    } else {
        None
    }
}

/// Correction for the phone, pitch before roll
#[must_use]
pub fn phone_adjustment(orientation: &PhoneOrientation, target: &PhoneTarget) -> Option<PhoneAdjustment> {
    let (low, high) = match target.pitch_window() {
        Some(window) => (window.min, window.max),
        None => (target.pitch - target.tolerance, target.pitch + target.tolerance),
    };
    let (pitch, roll) = target.aligned_tilt(orientation);
    if pitch < low {
        Some(PhoneAdjustment::TiltUp)
    } else if pitch > high {
        Some(PhoneAdjustment::TiltDown)
    } else if circular_difference(roll, target.roll) > target.tolerance {
        Some(PhoneAdjustment::Level)
    } else {
        None
    }
}
