//! Capture guidance and auto-shutter decision engine.
//!
//! The engine walks a handheld phone through five head and scalp photography
//! angles. On every tick it fuses:
//! - gyroscope and accelerometer samples into a phone orientation,
//! - detector landmarks into a stabilized head pose,
//! - the subject box into a distance estimate and a silhouette IoU,
//! - a luminance histogram into a lighting score,
//!
//! and turns them into seven capture conditions, a weighted confidence
//! score, a ready/countdown decision and one sentence of user guidance.
//!
//! Face and landmark detection are external: the host pushes detector
//! output in, the engine never touches pixels beyond a luminance histogram.
//!
//! # Examples
//!
//! ## Driving a session
//!
//! ```no_run
//! use capture_guidance::{
//!     angles::CaptureAngle,
//!     config::EngineConfig,
//!     geometry::BoundingBox,
//!     head_pose::DetectedFace,
//!     lighting::LuminanceHistogram,
//!     sensor_fusion::RawSensorSample,
//!     session::CaptureSession,
//! };
//!
//! # fn main() -> capture_guidance::Result<()> {
//! let mut session = CaptureSession::for_angle(EngineConfig::default(), CaptureAngle::Front)?;
//! session.ingest_luminance(&LuminanceHistogram::uniform(60, 239, 10));
//!
//! for frame in 0..200u64 {
//!     let t = frame * 33;
//!     session.ingest_sensor(&RawSensorSample::at_rest(t))?;
//!     session.ingest_face(Some(&DetectedFace {
//!         bounds: BoundingBox::centered(0.5, 0.5, 0.33, 0.24),
//!         yaw: 0.0,
//!         pitch: 0.0,
//!         roll: 0.0,
//!         landmarks: Vec::new(),
//!         eyes_open_probability: Some(0.9),
//!         smiling_probability: None,
//!         timestamp_ms: t,
//!     }));
//!
//!     let state = session.tick(t);
//!     println!("{} {}% {}", state.phase, state.progress_percent(), state.feedback);
//!     if state.captured {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Sharing a session between callbacks
//!
//! ```no_run
//! use capture_guidance::{
//!     angles::CaptureAngle, config::EngineConfig, sensor_fusion::RawSensorSample,
//!     session::{CaptureSession, SharedSession},
//! };
//!
//! # fn main() -> capture_guidance::Result<()> {
//! let shared = SharedSession::new(CaptureSession::for_angle(EngineConfig::default(), CaptureAngle::Vertex)?);
//! let sensors = shared.clone();
//! std::thread::spawn(move || {
//!     let _ = sensors.ingest_sensor(&RawSensorSample::at_rest(0));
//! });
//! let state = shared.tick(16);
//! println!("{}", state.detailed());
//! # Ok(())
//! # }
//! ```

/// Per-angle targets and the capture sequence
pub mod angles;

/// Gyro/accelerometer orientation fusion
pub mod sensor_fusion;

/// Stationary gyro bias calibration
pub mod calibration;

/// Single-axis smoothing filters
pub mod filters;

/// Temporal pose stabilization and jitter tracking
pub mod optical_flow;

/// Hybrid landmark / surface-normal head pose estimation
pub mod head_pose;

/// Optical and heuristic distance estimation
pub mod distance;

/// IoU silhouette matching and alignment hints
pub mod silhouette;

/// Luminance histogram analysis
pub mod lighting;

/// Hysteresis-based adaptive validator
pub mod validator;

/// Scalp region classification from phone orientation
pub mod region;

/// User guidance messages
pub mod feedback;

/// Auto-shutter conditions, confidence and state machine
pub mod shutter;

/// Capture session tying the analyzers together
pub mod session;

/// Normalized boxes and frame geometry
pub mod geometry;

/// Numeric helpers
pub mod utils;

/// Error types and result handling
pub mod error;

/// Scenario replay application
pub mod app;

/// Constants used throughout the engine
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
