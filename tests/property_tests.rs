//! Property checks for the scoring primitives

use capture_guidance::{
    angles::DistanceRange,
    config::IouConfig,
    distance::{fuse_estimates, DistanceEstimator, FaceMetrics},
    geometry::{BoundingBox, FrameGeometry},
    shutter::{AngleConfidenceScore, ConfidenceLevel},
    silhouette::{calculate_iou, IouQuality, SilhouetteMatcher},
};
use proptest::prelude::*;

fn bbox() -> impl Strategy<Value = BoundingBox> {
    (0.0..0.9f64, 0.0..0.9f64, 0.01..0.5f64, 0.01..0.5f64).prop_map(|(x, y, w, h)| BoundingBox::new(x, y, w, h))
}

proptest! {
    #[test]
    fn prop_iou_is_symmetric_and_bounded(a in bbox(), b in bbox()) {
        let ab = calculate_iou(&a, &b);
        let ba = calculate_iou(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-12);
        prop_assert!((0.0..=1.0).contains(&ab));
    }

    #[test]
    fn prop_iou_of_box_with_itself_is_one(a in bbox()) {
        prop_assert_eq!(calculate_iou(&a, &a), 1.0);
    }

    #[test]
    fn prop_iou_of_disjoint_boxes_is_zero(a in bbox(), gap in 0.0..0.5f64) {
        let b = BoundingBox::new(a.right() + gap, a.y, a.width, a.height);
        prop_assert_eq!(calculate_iou(&a, &b), 0.0);
    }

    #[test]
    fn prop_quality_follows_tiers(a in bbox(), b in bbox(), threshold in 0.5..0.95f64) {
        let config = IouConfig::default();
        let result = SilhouetteMatcher::new(&config).match_iou(&a, &b, threshold);
        prop_assert_eq!(result.aligned, result.iou >= threshold);
        let expected = if result.iou >= config.perfect {
            if result.iou >= threshold { IouQuality::Perfect } else { IouQuality::Good }
        } else if result.iou >= config.acceptable {
            IouQuality::Acceptable
        } else {
            IouQuality::Poor
        };
        prop_assert_eq!(result.quality, expected);
        prop_assert!(result.offset_x.abs() <= 1.0 && result.offset_y.abs() <= 1.0);
    }

    #[test]
    fn prop_confidence_stays_in_unit_range(
        pose in -1.0..2.0f64,
        phone in -1.0..2.0f64,
        centering in -1.0..2.0f64,
        distance in -1.0..2.0f64,
        region in -1.0..2.0f64,
        quality in -1.0..2.0f64,
    ) {
        let score = AngleConfidenceScore::from_components(pose, phone, centering, distance, region, quality);
        prop_assert!((0.0..=1.0).contains(&score.overall));
        prop_assert_eq!(score.level, ConfidenceLevel::from_score(score.overall));
    }

    #[test]
    fn prop_confidence_is_monotonic(base in 0.0..0.9f64, bump in 0.01..0.1f64) {
        let low = AngleConfidenceScore::from_components(base, base, base, base, base, base);
        let high = AngleConfidenceScore::from_components(base + bump, base, base, base, base, base);
        prop_assert!(high.overall > low.overall);
    }

    #[test]
    fn prop_fused_distance_lies_between_estimators(width in 0.05..0.9f64) {
        let estimator = DistanceEstimator::default();
        let range = DistanceRange::new(25.0, 40.0);
        let metrics = FaceMetrics {
            bounds: BoundingBox::centered(0.5, 0.5, width, 0.3),
            frame: FrameGeometry::default(),
        };
        let optical = estimator.estimate_optical(&metrics, &range);
        let depth = estimator.estimate_depth(&metrics, &range);
        let fused = fuse_estimates(&optical, &depth, 0.6, &range);

        let (lo, hi) = if optical.distance_cm < depth.distance_cm {
            (optical.distance_cm, depth.distance_cm)
        } else {
            (depth.distance_cm, optical.distance_cm)
        };
        prop_assert!(fused.distance_cm >= lo - 1e-9 && fused.distance_cm <= hi + 1e-9);
        prop_assert!(fused.confidence <= optical.confidence.max(depth.confidence) + 1e-12);
        prop_assert_eq!(fused.is_in_range, range.contains(fused.distance_cm));
    }
}

#[test]
fn test_all_equal_components_score_themselves() {
    let score = AngleConfidenceScore::from_components(0.8, 0.8, 0.8, 0.8, 0.8, 0.8);
    approx::assert_relative_eq!(score.overall, 0.8, epsilon = 1e-9);
    assert_eq!(score.level, ConfidenceLevel::UserGuidance);
}
