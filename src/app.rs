//! Scenario replay application.
//!
//! A scenario is a YAML list of segments. Each segment repeats the same
//! measurements at a fixed interval for a fixed duration, so a recorded
//! capture attempt can be written down compactly and replayed through a
//! [`CaptureSession`] deterministically.

use crate::{
    angles::CaptureAngle,
    config::EngineConfig,
    geometry::BoundingBox,
    head_pose::DetectedFace,
    lighting::LuminanceHistogram,
    sensor_fusion::RawSensorSample,
    session::CaptureSession,
    shutter::{AutoShutterState, ShutterPhase},
    Error, Result,
};
use log::{info, warn};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::path::Path;

fn default_interval_ms() -> u64 {
    33
}

/// One gyro/accelerometer reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// rad/s
    #[serde(default)]
    pub gyro: [f64; 3],
    /// m/s²
    pub accel: [f64; 3],
}

/// Luminance histogram given either as a flat band or as raw bins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LuminanceSource {
    Uniform { low: u8, high: u8, per_bin: u32 },
    Bins(Vec<u32>),
}

impl LuminanceSource {
    /// # Errors
    ///
    /// Returns an error if raw bins do not contain exactly 256 counts.
    pub fn histogram(&self) -> Result<LuminanceHistogram> {
        match self {
            Self::Uniform { low, high, per_bin } => Ok(LuminanceHistogram::uniform(*low, *high, *per_bin)),
            Self::Bins(bins) => LuminanceHistogram::from_slice(bins),
        }
    }
}

/// Measurements repeated for `duration_ms`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub duration_ms: u64,
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub sensor: Option<SensorReading>,
    /// Absent means no face is detected during the segment
    #[serde(default)]
    pub face: Option<DetectedFace>,
    #[serde(default)]
    pub region: Option<BoundingBox>,
    /// Applied once at the start of the segment and kept afterwards.
    /// Written as `uniform: {...}` or `bins: [...]`
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub luminance: Option<LuminanceSource>,
    #[serde(default)]
    pub sharpness: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub angle: Option<CaptureAngle>,
    pub segments: Vec<Segment>,
}

impl Scenario {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid scenario.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// # Errors
    ///
    /// Returns an error if the text is not a valid scenario.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// # Errors
    ///
    /// Returns [`Error::ReplayError`] for empty scenarios, zero intervals or
    /// malformed histograms.
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(Error::ReplayError("scenario has no segments".to_string()));
        }
        for (index, segment) in self.segments.iter().enumerate() {
            if segment.interval_ms == 0 {
                return Err(Error::ReplayError(format!("segment {index}: interval_ms must be positive")));
            }
            if let Some(luminance) = &segment.luminance {
                luminance
                    .histogram()
                    .map_err(|e| Error::ReplayError(format!("segment {index}: {e}")))?;
            }
        }
        Ok(())
    }

    /// Total replay length
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }
}

/// Outcome of a replay
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySummary {
    pub angle: CaptureAngle,
    pub ticks: usize,
    pub first_ready_ms: Option<u64>,
    pub captured_at_ms: Option<u64>,
    pub final_phase: ShutterPhase,
    pub final_feedback: String,
}

/// Drives a [`CaptureSession`] through a [`Scenario`]
pub struct ReplayApp {
    session: CaptureSession,
    scenario: Scenario,
}

impl ReplayApp {
    /// Build the session for the scenario's angle, or `angle` when given
    ///
    /// # Errors
    ///
    /// Returns an error if no angle is known or the configuration is invalid.
    pub fn new(config: EngineConfig, scenario: Scenario, angle: Option<CaptureAngle>) -> Result<Self> {
        let angle = angle
            .or(scenario.angle)
            .ok_or_else(|| Error::ReplayError("no capture angle given on the command line or in the scenario".to_string()))?;
        if scenario.angle.is_some_and(|a| a != angle) {
            warn!("Scenario was recorded for {:?}, replaying as {angle}", scenario.angle);
        }
        Ok(Self {
            session: CaptureSession::for_angle(config, angle)?,
            scenario,
        })
    }

    #[must_use]
    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    /// Replay every segment, calling `on_tick` after each evaluation
    ///
    /// # Errors
    ///
    /// Returns an error if a histogram is malformed. Calibration failures are
    /// logged and the replay continues.
    pub fn run<F>(&mut self, mut on_tick: F) -> Result<ReplaySummary>
    where
        F: FnMut(&AutoShutterState),
    {
        info!(
            "Replaying {} segments ({} ms) for {}",
            self.scenario.segments.len(),
            self.scenario.duration_ms(),
            self.session.angle().angle
        );

        let mut now = 0;
        let mut ticks = 0;
        let mut first_ready_ms = None;
        let mut captured_at_ms = None;
        let mut last: Option<AutoShutterState> = None;

        for segment in &self.scenario.segments {
            if let Some(luminance) = &segment.luminance {
                self.session.ingest_luminance(&luminance.histogram()?);
            }
            if segment.sharpness.is_some() {
                self.session.set_sharpness(segment.sharpness);
            }

            let end = now + segment.duration_ms;
            while now < end {
                if let Some(reading) = segment.sensor {
                    let sample = RawSensorSample::new(Vector3::from(reading.gyro), Vector3::from(reading.accel), now);
                    if let Err(e) = self.session.ingest_sensor(&sample) {
                        warn!("{e}");
                    }
                }
                let face = segment.face.as_ref().map(|face| DetectedFace {
                    timestamp_ms: now,
                    ..face.clone()
                });
                self.session.ingest_face(face.as_ref());
                self.session.ingest_region(segment.region);

                let state = self.session.tick(now);
                ticks += 1;
                if state.ready && first_ready_ms.is_none() {
                    first_ready_ms = Some(now);
                }
                if state.captured {
                    captured_at_ms = Some(now);
                }
                on_tick(&state);
                last = Some(state);

                now += segment.interval_ms;
            }
            now = end;
        }

        let (final_phase, final_feedback) =
            last.map_or((ShutterPhase::Idle, String::new()), |state| (state.phase, state.feedback));
        Ok(ReplaySummary {
            angle: self.session.angle().angle,
            ticks,
            first_ready_ms,
            captured_at_ms,
            final_phase,
            final_feedback,
        })
    }
}
