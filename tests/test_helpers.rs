//! Helper functions and fixtures for integration tests
#![allow(dead_code)]

use capture_guidance::{
    angles::CaptureAngle,
    config::EngineConfig,
    constants::GRAVITY,
    geometry::{BoundingBox, Point2},
    head_pose::{DetectedFace, Landmark, LandmarkKind},
    lighting::LuminanceHistogram,
    sensor_fusion::RawSensorSample,
    session::CaptureSession,
    shutter::AutoShutterState,
};
use nalgebra::Vector3;

/// Camera frame interval used by the scenarios
pub const FRAME_MS: u64 = 33;

/// Stationary sample whose gravity vector gives the requested tilt
pub fn tilted_sample(pitch_deg: f64, roll_deg: f64, timestamp_ms: u64) -> RawSensorSample {
    let (p, r) = (pitch_deg.to_radians(), roll_deg.to_radians());
    RawSensorSample::new(
        Vector3::zeros(),
        Vector3::new(-p.sin() * GRAVITY, p.cos() * r.sin() * GRAVITY, p.cos() * r.cos() * GRAVITY),
        timestamp_ms,
    )
}

/// Frontal face centred in a 1080x1920 frame with eyes and nose in pixels
pub fn face_with_pose(yaw: f64, pitch: f64, timestamp_ms: u64) -> DetectedFace {
    let landmark = |kind, x, y| Landmark {
        kind,
        position: Point2::new(x, y),
    };
    DetectedFace {
        bounds: BoundingBox::centered(0.5, 0.5, 0.33, 0.24),
        yaw,
        pitch,
        roll: 0.0,
        landmarks: vec![
            landmark(LandmarkKind::LeftEye, 400.0, 500.0),
            landmark(LandmarkKind::RightEye, 680.0, 500.0),
            landmark(LandmarkKind::NoseBase, 540.0, 700.0),
        ],
        eyes_open_probability: Some(0.95),
        smiling_probability: None,
        timestamp_ms,
    }
}

pub fn face_with_yaw(yaw: f64, timestamp_ms: u64) -> DetectedFace {
    face_with_pose(yaw, 0.0, timestamp_ms)
}

pub fn front_face(timestamp_ms: u64) -> DetectedFace {
    face_with_pose(0.0, 0.0, timestamp_ms)
}

/// Scalp box matching the back donor silhouette
pub fn donor_region() -> BoundingBox {
    BoundingBox::centered(0.5, 0.5, 0.40, 0.25)
}

pub fn good_lighting() -> LuminanceHistogram {
    LuminanceHistogram::uniform(60, 239, 10)
}

pub fn dark_lighting() -> LuminanceHistogram {
    LuminanceHistogram::uniform(0, 30, 10)
}

/// Scalp box matching the vertex silhouette
pub fn vertex_region() -> BoundingBox {
    BoundingBox::centered(0.5, 0.5, 0.35, 0.2)
}

pub fn session(angle: CaptureAngle) -> CaptureSession {
    CaptureSession::for_angle(EngineConfig::default(), angle).expect("default configuration is valid")
}

/// Feed a level phone and `face_at` every frame for `duration_ms`
pub fn run_face_angle<F>(session: &mut CaptureSession, duration_ms: u64, face_at: F) -> Vec<AutoShutterState>
where
    F: Fn(u64) -> Option<DetectedFace>,
{
    (0..duration_ms)
        .step_by(usize::try_from(FRAME_MS).expect("frame interval fits usize"))
        .map(|t| {
            session.ingest_sensor(&tilted_sample(0.0, 0.0, t)).expect("no calibration configured");
            session.ingest_face(face_at(t).as_ref());
            session.tick(t)
        })
        .collect()
}

/// Feed a fixed phone tilt and region box every frame for `duration_ms`
pub fn run_sensor_angle(
    session: &mut CaptureSession,
    duration_ms: u64,
    pitch_deg: f64,
    roll_deg: f64,
    region: Option<BoundingBox>,
) -> Vec<AutoShutterState> {
    (0..duration_ms)
        .step_by(usize::try_from(FRAME_MS).expect("frame interval fits usize"))
        .map(|t| {
            session
                .ingest_sensor(&tilted_sample(pitch_deg, roll_deg, t))
                .expect("no calibration configured");
            session.ingest_region(region);
            session.tick(t)
        })
        .collect()
}
