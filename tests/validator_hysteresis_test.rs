mod test_helpers;

use capture_guidance::{
    angles::{AngleConfig, CaptureAngle},
    config::EngineConfig,
    feedback::Guidance,
    session::CaptureSession,
    shutter::{AutoShutterState, ShutterPhase},
    validator::{AdaptiveValidator, FailureReason, ValidationCriteria},
};
use test_helpers::*;

fn ideal() -> ValidationCriteria {
    ValidationCriteria {
        pitch: 90.0,
        roll: 0.0,
        yaw: 0.0,
        distance: 40.0,
        face_width_percent: 40.0,
        sharpness: 100.0,
        brightness: 115.0,
        contrast: 100.0,
        eyes_open_percent: 100.0,
        face_centered_x: 0.0,
        face_centered_y: 0.0,
    }
}

/// Pitch and roll fully off: 60 points, inside the 55..65 band
fn borderline() -> ValidationCriteria {
    ValidationCriteria {
        pitch: 0.0,
        roll: 30.0,
        ..ideal()
    }
}

/// Yaw off as well: 50 points, below the band
fn poor() -> ValidationCriteria {
    ValidationCriteria { yaw: 10.0, ..borderline() }
}

#[test]
fn test_no_toggle_inside_band() {
    let mut validator = AdaptiveValidator::default();

    let status = validator.validate(&borderline());
    assert_eq!(status.accuracy, 60.0);
    assert!(!status.is_valid, "must rise above 65 to become valid");
    assert_eq!(status.failure_reasons[0], FailureReason::RaisePhone);

    assert!(validator.validate(&ideal()).is_valid);
    for _ in 0..10 {
        assert!(validator.validate(&borderline()).is_valid, "must fall below 55 to become invalid");
    }

    let status = validator.validate(&poor());
    assert_eq!(status.accuracy, 50.0);
    assert!(!status.is_valid);
    assert!(!validator.validate(&borderline()).is_valid);
}

#[test]
fn test_oscillation_around_threshold_never_toggles() {
    // Pitch 4.75° off adds one point; eyes at 90% drop one
    let above = ValidationCriteria { pitch: 85.25, ..borderline() };
    let below = ValidationCriteria {
        eyes_open_percent: 90.0,
        ..borderline()
    };

    let mut invalid = AdaptiveValidator::default();
    let mut valid = AdaptiveValidator::default();
    assert!(valid.validate(&ideal()).is_valid);

    for i in 0..40 {
        let criteria = if i % 2 == 0 { above } else { below };
        let expected = if i % 2 == 0 { 61.0 } else { 59.0 };

        let status = invalid.validate(&criteria);
        assert_eq!(status.accuracy, expected);
        assert!(!status.is_valid, "became valid at step {i}");

        let status = valid.validate(&criteria);
        assert_eq!(status.accuracy, expected);
        assert!(status.is_valid, "became invalid at step {i}");
    }
}

#[test]
fn test_baseline_needs_mostly_valid_frames() {
    let mut validator = AdaptiveValidator::default();
    for _ in 0..15 {
        validator.validate(&poor());
    }
    assert!(!validator.has_baseline());

    for _ in 0..30 {
        validator.validate(&ideal());
    }
    assert!(validator.has_baseline());
    assert!(validator.validate(&ideal()).should_countdown);

    let stats = validator.buffer_stats();
    assert_eq!(stats.total_frames, 30);
    assert_eq!(stats.validity_percentage, 100);
}

#[test]
fn test_missing_measurements_score_zero() {
    let mut validator = AdaptiveValidator::default();
    let status = validator.validate(&ValidationCriteria {
        pitch: f64::NAN,
        distance: f64::NAN,
        ..ideal()
    });
    assert_eq!(status.metrics.pitch_score, 0.0);
    assert_eq!(status.metrics.distance_score, 0.0);
    assert!(status.accuracy.is_finite());
}

/// Countdown start is gated on the rolling baseline
fn first_ready_ms(gate_capture: bool) -> Option<u64> {
    let mut config = EngineConfig::default();
    config.validator.gate_capture = gate_capture;
    let mut angle = AngleConfig::for_angle(CaptureAngle::Front);
    angle.stability_ms = Some(100);

    let mut session = CaptureSession::new(config, angle).unwrap();
    session.ingest_luminance(&good_lighting());
    let states = run_face_angle(&mut session, 2000, |t| Some(front_face(t)));
    states.iter().find(|s| s.ready).map(|s| s.timestamp_ms)
}

fn front_frame(session: &mut CaptureSession, timestamp_ms: u64) -> AutoShutterState {
    session.ingest_sensor(&tilted_sample(0.0, 0.0, timestamp_ms)).unwrap();
    session.ingest_face(Some(&front_face(timestamp_ms)));
    session.tick(timestamp_ms)
}

#[test]
fn test_single_good_frame_cannot_start_countdown() {
    let gated = first_ready_ms(true).expect("gated session still captures");
    let advisory = first_ready_ms(false).expect("advisory session captures");

    // 19 of 30 frames must be valid before the hold may even begin
    assert!(gated >= 18 * FRAME_MS + 100, "ready at {gated} ms before the baseline filled");
    assert!(gated > advisory);
}

#[test]
fn test_countdown_cancelled_below_band() {
    let mut session = session(CaptureAngle::Front);
    session.ingest_luminance(&good_lighting());

    let mut t = 0;
    let mut state = front_frame(&mut session, t);
    while !state.ready {
        t += FRAME_MS;
        assert!(t < 3000, "front face never became ready");
        state = front_frame(&mut session, t);
    }
    assert_eq!(state.countdown, Some(3));

    // Accuracy inside the band keeps a running countdown alive
    session.set_validator_thresholds(Some(85.0), Some(8.0));
    for _ in 0..10 {
        t += FRAME_MS;
        state = front_frame(&mut session, t);
        assert!(state.ready, "countdown dropped inside the band at {t} ms");
    }
    assert!(session.validity().is_some_and(|v| v.is_valid && v.accuracy <= 93.0));

    // Falling below threshold - band cancels it
    session.set_validator_thresholds(Some(100.0), Some(5.0));
    t += FRAME_MS;
    state = front_frame(&mut session, t);
    let validity = session.validity().unwrap();
    assert!(validity.accuracy < 95.0);
    assert!(!validity.is_valid);
    assert!(!state.ready);
    assert_eq!(state.countdown, None);
    assert_eq!(state.phase, ShutterPhase::AllConditionsMet);
    assert_eq!(state.guidance, Guidance::Verifying);
}

#[test]
fn test_validator_holds_shutter_by_default() {
    let mut config = EngineConfig::default();
    config.validator.valid_threshold = 100.0;
    let mut session = CaptureSession::for_angle(config, CaptureAngle::Front).unwrap();
    session.ingest_luminance(&good_lighting());
    let states = run_face_angle(&mut session, 2500, |t| Some(front_face(t)));

    assert!(states.iter().all(|s| !s.ready));
    let last = states.last().unwrap();
    assert!(last.conditions.all_met());
    assert_eq!(last.phase, ShutterPhase::AllConditionsMet);
    assert_eq!(last.guidance, Guidance::Verifying);
}

#[test]
fn test_advisory_when_gate_disabled() {
    let mut config = EngineConfig::default();
    config.validator.valid_threshold = 100.0;
    config.validator.gate_capture = false;
    let mut session = CaptureSession::for_angle(config, CaptureAngle::Front).unwrap();
    session.ingest_luminance(&good_lighting());
    let states = run_face_angle(&mut session, 2500, |t| Some(front_face(t)));

    assert!(session.validity().is_some_and(|v| !v.is_valid));
    assert!(states.iter().any(|s| s.ready));
}
