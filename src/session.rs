//! Capture session.
//!
//! A session owns every analyzer for one capture step. Sensor samples,
//! face detections, region boxes and luminance histograms are pushed in as
//! they arrive; [`CaptureSession::tick`] combines the latest of each into an
//! [`AutoShutterState`]. All filter state lives here, one session per user.

use crate::{
    angles::{AngleConfig, CaptureAngle},
    calibration::SensorCalibrator,
    config::EngineConfig,
    distance::{DistanceEstimate, DistanceEstimator, FaceMetrics},
    geometry::BoundingBox,
    head_pose::{DetectedFace, HeadPoseEstimate, HeadPoseEstimator},
    lighting::{LightingAnalysis, LuminanceHistogram},
    optical_flow::{AngleTriple, PoseStabilizer},
    region::classify_scalp_region,
    sensor_fusion::{OrientationFilter, PhoneOrientation, RawSensorSample},
    shutter::{AutoShutter, AutoShutterState, ShutterInputs, ShutterPhase},
    silhouette::{template_for_angle, SilhouetteMatcher},
    validator::{AdaptiveValidator, ValidationCriteria, ValidationTargets, ValidityStatus},
    Result,
};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard};

/// Single-writer evaluation state for one capture angle
pub struct CaptureSession {
    config: EngineConfig,
    calibrator: Option<SensorCalibrator>,
    orientation_filter: OrientationFilter,
    orientation: Option<PhoneOrientation>,
    // Phone orientation history for sensor-only angles
    orientation_stabilizer: PoseStabilizer,
    phone_pose_confidence: f64,
    head_pose: HeadPoseEstimator,
    latest_pose: Option<HeadPoseEstimate>,
    eyes_open_probability: Option<f64>,
    region_box: Option<BoundingBox>,
    distance: DistanceEstimator,
    matcher: SilhouetteMatcher,
    template: BoundingBox,
    lighting: Option<LightingAnalysis>,
    sharpness: Option<f64>,
    validator: AdaptiveValidator,
    validity: Option<ValidityStatus>,
    shutter: AutoShutter,
    last_state: Option<AutoShutterState>,
}

impl CaptureSession {
    /// Create a session for `angle`
    ///
    /// # Errors
    ///
    /// Returns an error if either configuration fails validation.
    pub fn new(config: EngineConfig, angle: AngleConfig) -> Result<Self> {
        config.validate()?;
        angle.validate()?;

        let calibrator = config
            .sensor_fusion
            .calibrate_on_start
            .then(|| SensorCalibrator::new(config.sensor_fusion.calibration_samples));

        info!(
            "Capture session for {} ({}){}",
            angle.angle,
            angle.title,
            if calibrator.is_some() { ", calibrating sensors" } else { "" }
        );

        Ok(Self {
            orientation_filter: OrientationFilter::new(&config.sensor_fusion)?,
            orientation: None,
            orientation_stabilizer: PoseStabilizer::new(&config.optical_flow),
            phone_pose_confidence: 0.0,
            head_pose: HeadPoseEstimator::new(&config.head_pose, &config.optical_flow),
            latest_pose: None,
            eyes_open_probability: None,
            region_box: None,
            distance: DistanceEstimator::new(&config.distance, &config.frame),
            matcher: SilhouetteMatcher::new(&config.iou),
            template: template_for_angle(angle.angle, &config.frame),
            lighting: None,
            sharpness: None,
            validator: AdaptiveValidator::new(&config.validator, ValidationTargets::for_angle(&angle)),
            validity: None,
            shutter: AutoShutter::new(angle, &config.confidence, &config.lighting),
            last_state: None,
            calibrator,
            config,
        })
    }

    /// Session for a built-in angle
    ///
    /// # Errors
    ///
    /// Returns an error if `config` fails validation.
    pub fn for_angle(config: EngineConfig, angle: CaptureAngle) -> Result<Self> {
        Self::new(config, AngleConfig::for_angle(angle))
    }

    #[must_use]
    pub fn angle(&self) -> &AngleConfig {
        self.shutter.angle_config()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Feed one gyro/accelerometer sample
    ///
    /// Returns `Ok(None)` while the startup calibration is still collecting.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::CalibrationError`] when the device moved
    /// during calibration; collection restarts automatically.
    pub fn ingest_sensor(&mut self, sample: &RawSensorSample) -> Result<Option<PhoneOrientation>> {
        let corrected = match &mut self.calibrator {
            Some(calibrator) if !calibrator.is_calibrated() => {
                calibrator.add_sample(sample)?;
                return Ok(None);
            }
            Some(calibrator) => calibrator.correct(sample),
            None => *sample,
        };

        let orientation = self.orientation_filter.fuse(&corrected);
        if self.angle().is_sensor_only() {
            let stabilized = self.orientation_stabilizer.update(
                AngleTriple {
                    yaw: orientation.yaw,
                    pitch: orientation.pitch,
                    roll: orientation.roll,
                },
                orientation.confidence,
                sample.timestamp_ms,
            );
            self.phone_pose_confidence = stabilized.confidence;
        }
        self.orientation = Some(orientation);
        Ok(Some(orientation))
    }

    /// Feed the detector output for the latest frame
    pub fn ingest_face(&mut self, face: Option<&DetectedFace>) -> Option<HeadPoseEstimate> {
        match face {
            Some(face) => {
                let pose = self.head_pose.estimate(face);
                self.latest_pose = Some(pose);
                self.eyes_open_probability = face.eyes_open_probability;
                Some(pose)
            }
            None => {
                if self.latest_pose.take().is_some() {
                    debug!("Face lost");
                }
                self.eyes_open_probability = None;
                None
            }
        }
    }

    /// Host-provided head or scalp box, used on sensor-only angles
    pub fn ingest_region(&mut self, bounds: Option<BoundingBox>) {
        self.region_box = bounds;
    }

    pub fn ingest_luminance(&mut self, histogram: &LuminanceHistogram) -> &LightingAnalysis {
        self.lighting.insert(histogram.analyze())
    }

    /// Host sharpness measurement (0-100), if it has one
    pub fn set_sharpness(&mut self, sharpness: Option<f64>) {
        self.sharpness = sharpness;
    }

    /// Override the adaptive validator's threshold and/or hysteresis band
    pub fn set_validator_thresholds(&mut self, valid_threshold: Option<f64>, hysteresis_band: Option<f64>) {
        self.validator.set_thresholds(valid_threshold, hysteresis_band);
    }

    /// Latest adaptive validator result
    #[must_use]
    pub fn validity(&self) -> Option<&ValidityStatus> {
        self.validity.as_ref()
    }

    #[must_use]
    pub fn last_state(&self) -> Option<&AutoShutterState> {
        self.last_state.as_ref()
    }

    #[must_use]
    pub fn orientation(&self) -> Option<&PhoneOrientation> {
        self.orientation.as_ref()
    }

    /// Calibration progress in percent, `None` when calibration is disabled
    #[must_use]
    pub fn calibration_progress(&self) -> Option<f64> {
        self.calibrator.as_ref().map(SensorCalibrator::progress_percent)
    }

    /// Box the angle is judged on: the face on face angles, the host region
    /// box on sensor-only angles
    fn subject(&self) -> Option<BoundingBox> {
        if self.angle().is_sensor_only() {
            self.region_box
        } else {
            self.latest_pose.map(|pose| pose.bounds)
        }
    }

    /// Evaluate everything received so far
    pub fn tick(&mut self, timestamp_ms: u64) -> AutoShutterState {
        let sensor_only = self.angle().is_sensor_only();
        let subject = self.subject();
        let range = self.angle().distance;

        let distance = subject.map(|bounds| {
            self.distance.estimate(
                &FaceMetrics {
                    bounds,
                    frame: self.config.frame,
                },
                &range,
            )
        });
        let iou = subject.map(|bounds| self.matcher.match_iou(&bounds, &self.template, self.angle().iou_threshold()));
        let alignment = iou.as_ref().map(|r| self.matcher.feedback(r));
        let region = self
            .orientation
            .as_ref()
            .map(|o| classify_scalp_region(o, self.latest_pose.as_ref()));

        let (pose_confidence, pose_stable) = if sensor_only {
            (self.phone_pose_confidence, self.orientation_stabilizer.is_stable())
        } else {
            (
                self.latest_pose.map_or(0.0, |p| p.confidence),
                self.latest_pose.is_some() && self.head_pose.is_stable(),
            )
        };

        let criteria = self.criteria(subject, distance.as_ref());
        let validity = self.validator.validate(&criteria);
        // A running countdown only stops when accuracy falls through the
        // hysteresis band; starting one needs the rolling baseline
        let validator_hold = self.config.validator.gate_capture
            && if self.shutter.is_locked() {
                !validity.is_valid
            } else {
                !validity.should_countdown
            };

        let inputs = ShutterInputs {
            timestamp_ms,
            orientation: self.orientation.as_ref(),
            head_pose: self.latest_pose.as_ref(),
            pose_confidence,
            pose_stable,
            subject,
            distance: distance.as_ref(),
            iou: iou.as_ref(),
            alignment,
            lighting: self.lighting.as_ref(),
            region,
            validator_hold,
        };
        let state = self.shutter.evaluate(&inputs);

        if state.captured {
            info!(
                "{} captured at {timestamp_ms} ms with confidence {}%",
                self.angle().angle,
                state.progress_percent()
            );
        }

        self.validity = Some(validity);
        self.last_state = Some(state.clone());
        state
    }

    /// Clear the capture lock, the timers and all smoothing history
    pub fn reset(&mut self) {
        self.shutter.reset();
        self.head_pose.reset_stabilization();
        self.orientation_stabilizer.reset();
        self.orientation_filter.reset();
        self.validator.reset();
        self.orientation = None;
        self.phone_pose_confidence = 0.0;
        self.latest_pose = None;
        self.eyes_open_probability = None;
        self.region_box = None;
        self.validity = None;
        self.last_state = None;
    }

    /// Move to another angle, keeping the sensor calibration
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::AngleConfigError`] if `angle` is invalid.
    pub fn set_angle(&mut self, angle: AngleConfig) -> Result<()> {
        angle.validate()?;
        info!("Switching capture angle {} -> {}", self.angle().angle, angle.angle);
        self.template = template_for_angle(angle.angle, &self.config.frame);
        self.validator.set_targets(ValidationTargets::for_angle(&angle));
        self.shutter.set_angle(angle);
        self.reset();
        Ok(())
    }

    /// Advance to the next angle of the capture sequence
    ///
    /// Returns the new angle, or `None` once the sequence is complete.
    ///
    /// # Errors
    ///
    /// Propagates [`CaptureSession::set_angle`] errors.
    pub fn advance(&mut self) -> Result<Option<CaptureAngle>> {
        if self.shutter.phase() != ShutterPhase::Captured {
            warn!("Advancing from {} before it was captured", self.angle().angle);
        }
        match self.angle().angle.next() {
            Some(next) => {
                self.set_angle(AngleConfig::for_angle(next))?;
                Ok(Some(next))
            }
            None => Ok(None),
        }
    }

    fn criteria(&self, subject: Option<BoundingBox>, distance: Option<&DistanceEstimate>) -> ValidationCriteria {
        let targets = self.validator.targets();
        let missing = f64::NAN;
        let orientation = self.orientation.as_ref();

        let yaw = if self.angle().is_sensor_only() {
            // Phone yaw is relative to the first sample and is not scored
            orientation.map_or(missing, |_| targets.yaw.target)
        } else {
            self.latest_pose.map_or(missing, |p| p.yaw)
        };
        let (center_x, center_y) = subject.map_or((missing, missing), |b| {
            let (cx, cy) = b.center();
            ((cx - 0.5) * 100.0, (cy - 0.5) * 100.0)
        });

        let (pitch, roll) = orientation.map_or((missing, missing), |o| self.angle().phone.aligned_tilt(o));

        ValidationCriteria {
            pitch,
            roll,
            yaw,
            distance: distance.filter(|d| d.distance_cm > 0.0).map_or(missing, |d| d.distance_cm),
            face_width_percent: subject.map_or(missing, |b| b.width * 100.0),
            sharpness: self.sharpness.unwrap_or(100.0),
            brightness: self.lighting.as_ref().map_or(missing, |l| l.brightness * 255.0),
            contrast: self.lighting.as_ref().map_or(missing, |l| l.contrast * 255.0),
            eyes_open_percent: self.eyes_open_probability.map_or(100.0, |p| p * 100.0),
            face_centered_x: center_x,
            face_centered_y: center_y,
        }
    }
}

/// Session shared between sensor, camera and timer callbacks
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<CaptureSession>>,
}

impl SharedSession {
    #[must_use]
    pub fn new(session: CaptureSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Lock the session, recovering from a poisoned mutex
    pub fn lock(&self) -> MutexGuard<'_, CaptureSession> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Capture session mutex was poisoned, continuing with the inner state");
            poisoned.into_inner()
        })
    }

    /// See [`CaptureSession::ingest_sensor`]
    ///
    /// # Errors
    ///
    /// Propagates calibration errors.
    pub fn ingest_sensor(&self, sample: &RawSensorSample) -> Result<Option<PhoneOrientation>> {
        self.lock().ingest_sensor(sample)
    }

    pub fn ingest_face(&self, face: Option<&DetectedFace>) -> Option<HeadPoseEstimate> {
        self.lock().ingest_face(face)
    }

    pub fn ingest_region(&self, bounds: Option<BoundingBox>) {
        self.lock().ingest_region(bounds);
    }

    pub fn ingest_luminance(&self, histogram: &LuminanceHistogram) -> LightingAnalysis {
        self.lock().ingest_luminance(histogram).clone()
    }

    pub fn tick(&self, timestamp_ms: u64) -> AutoShutterState {
        self.lock().tick(timestamp_ms)
    }

    pub fn reset(&self) {
        self.lock().reset();
    }
}
