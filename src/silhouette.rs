//! Silhouette matching by intersection over union.
//!
//! The observed region (face box or host-supplied head mask box) is
//! compared to the ideal silhouette of the current capture angle. Besides
//! the IoU tier, the template-normalized centre offset drives directional
//! alignment hints.

use crate::{
    angles::CaptureAngle,
    config::IouConfig,
    geometry::{BoundingBox, FrameGeometry},
    utils::finite_or_zero,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// IoU tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IouQuality {
    Poor,
    Acceptable,
    Good,
    Perfect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IoUResult {
    pub iou: f64,
    pub quality: IouQuality,
    /// IoU reached the angle's threshold
    pub aligned: bool,
    /// Horizontal centre offset in template widths, clamped to [-1, 1]
    pub offset_x: f64,
    /// Vertical centre offset in template heights, clamped to [-1, 1]
    pub offset_y: f64,
}

/// Intersection over union of two boxes
///
/// Symmetric, exactly 1 for identical non-degenerate boxes and 0 when the
/// boxes are disjoint or the union is empty.
#[must_use]
pub fn calculate_iou(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let intersection = a.intersection_area(b);
    if intersection <= 0.0 {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let union = a.area() + b.area() - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    finite_or_zero(intersection / union).clamp(0.0, 1.0)
}

/// IoU matcher carrying the configured tier boundaries
#[derive(Debug, Clone)]
pub struct SilhouetteMatcher {
    config: IouConfig,
}

impl SilhouetteMatcher {
    #[must_use]
    pub fn new(config: &IouConfig) -> Self {
        Self { config: config.clone() }
    }

    /// Compare `observed` against `template` using the angle's IoU threshold
    #[must_use]
    pub fn match_iou(&self, observed: &BoundingBox, template: &BoundingBox, threshold: f64) -> IoUResult {
        let iou = calculate_iou(observed, template);
        let quality = if iou >= self.config.perfect {
            if iou >= threshold {
                IouQuality::Perfect
            } else {
                IouQuality::Good
            }
        } else if iou >= self.config.acceptable {
            IouQuality::Acceptable
        } else {
            IouQuality::Poor
        };

        let (observed_cx, observed_cy) = observed.center();
        let (template_cx, template_cy) = template.center();
        let offset = |delta: f64, extent: f64| {
            if extent > 0.0 {
                finite_or_zero(delta / extent).clamp(-1.0, 1.0)
            } else {
                0.0
            }
        };

        IoUResult {
            iou,
            quality,
            aligned: iou >= threshold,
            offset_x: offset(observed_cx - template_cx, template.width),
            offset_y: offset(observed_cy - template_cy, template.height),
        }
    }

    /// Directional guidance for a match result
    #[must_use]
    pub fn feedback(&self, result: &IoUResult) -> AlignmentFeedback {
        match result.quality {
            IouQuality::Perfect => AlignmentFeedback::Perfect,
            IouQuality::Good | IouQuality::Acceptable => AlignmentFeedback::Good,
            IouQuality::Poor => {
                let dead_zone = self.config.dead_zone;
                let horizontal = if result.offset_x < -dead_zone {
                    Some(HorizontalShift::Left)
                } else if result.offset_x > dead_zone {
                    Some(HorizontalShift::Right)
                } else {
                    None
                };
                let vertical = if result.offset_y < -dead_zone {
                    Some(VerticalShift::Up)
                } else if result.offset_y > dead_zone {
                    Some(VerticalShift::Down)
                } else {
                    None
                };
                let severity = if result.iou >= self.config.minimum {
                    AlignmentSeverity::NeedsImprovement
                } else {
                    AlignmentSeverity::Poor
                };
                AlignmentFeedback::Adjust {
                    severity,
                    horizontal,
                    vertical,
                }
            }
        }
    }
}

impl Default for SilhouetteMatcher {
    fn default() -> Self {
        Self::new(&IouConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalShift {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerticalShift {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentSeverity {
    /// Between the minimum and acceptable IoU
    NeedsImprovement,
    /// Below the minimum IoU
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentFeedback {
    Perfect,
    Good,
    Adjust {
        severity: AlignmentSeverity,
        horizontal: Option<HorizontalShift>,
        vertical: Option<VerticalShift>,
    },
}

impl fmt::Display for AlignmentFeedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Perfect => f.write_str("Perfect alignment"),
            Self::Good => f.write_str("Good alignment"),
            Self::Adjust {
                severity,
                horizontal,
                vertical,
            } => {
                let horizontal = horizontal.map(|h| match h {
                    HorizontalShift::Left => "shift left",
                    HorizontalShift::Right => "shift right",
                });
                let vertical = vertical.map(|v| match v {
                    VerticalShift::Up => "shift up",
                    VerticalShift::Down => "shift down",
                });
                match (horizontal, vertical) {
                    (Some(h), Some(v)) => write!(f, "{} and {v}", capitalize(h)),
                    (Some(one), None) | (None, Some(one)) => f.write_str(&capitalize(one)),
                    (None, None) => match severity {
                        AlignmentSeverity::NeedsImprovement => f.write_str("Almost aligned, adjust the framing"),
                        AlignmentSeverity::Poor => f.write_str("Align the head with the silhouette"),
                    },
                }
            }
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// Ideal silhouette for an angle, centred in the frame
///
/// Sizes are fractions of the frame width; heights are converted through
/// the frame aspect ratio so the template keeps its intended shape.
#[must_use]
pub fn template_for_angle(angle: CaptureAngle, frame: &FrameGeometry) -> BoundingBox {
    let (width, shape) = match angle {
        CaptureAngle::Front | CaptureAngle::Right45 | CaptureAngle::Left45 => (0.30, 1.3),
        CaptureAngle::Vertex => (0.35, 1.0),
        CaptureAngle::BackDonor => (0.40, 1.1),
    };
    let height = width * shape / frame.aspect_ratio();
    BoundingBox::centered(0.5, 0.5, width, height)
}
