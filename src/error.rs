//! Error types for the capture guidance engine.
//!
//! Per-frame evaluation never returns errors: missing or degenerate
//! measurements are absorbed as zero confidence. Errors are reserved for
//! configuration, calibration and the replay tooling.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization failed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Filter initialization or processing error
    #[error("Filter error: {0}")]
    FilterError(String),

    /// Sensor calibration could not be completed
    #[error("Calibration error: {0}")]
    CalibrationError(String),

    /// Per-angle capture configuration is inconsistent
    #[error("Angle configuration error: {0}")]
    AngleConfigError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Scenario replay failed
    #[error("Replay error: {0}")]
    ReplayError(String),

    /// Generic I/O error with description
    #[error("I/O error: {0}")]
    IoError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
