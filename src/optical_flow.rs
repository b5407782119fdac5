//! Temporal stabilization of angle estimates.
//!
//! Raw per-frame poses oscillate by several degrees even when the subject
//! is still. The stabilizer smooths each axis with an EMA and measures
//! jitter over a short time window of the raw input; low jitter boosts
//! confidence and, once enough frames are buffered, marks the pose stable.

use crate::{
    config::OpticalFlowConfig,
    constants::STEADY_CONFIDENCE_BOOST,
    filters::{exponential::ExponentialFilter, AngleFilter},
    utils::{clamp_unit, safe_cast::usize_to_f64},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Yaw, pitch and roll in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleTriple {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

impl AngleTriple {
    #[must_use]
    pub const fn new(yaw: f64, pitch: f64, roll: f64) -> Self {
        Self { yaw, pitch, roll }
    }

    /// Mean absolute per-axis difference
    #[must_use]
    pub fn mean_abs_delta(&self, other: &Self) -> f64 {
        ((self.yaw - other.yaw).abs() + (self.pitch - other.pitch).abs() + (self.roll - other.roll).abs()) / 3.0
    }
}

/// Output of one stabilizer step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizedAngles {
    pub angles: AngleTriple,
    /// Input confidence, boosted while jitter is low
    pub confidence: f64,
    /// Mean per-axis frame-to-frame delta over the window, degrees
    pub jitter: f64,
}

/// EMA smoother with a time-bounded jitter window
pub struct PoseStabilizer {
    window_ms: u64,
    max_jitter: f64,
    min_stable_frames: usize,
    yaw: ExponentialFilter,
    pitch: ExponentialFilter,
    roll: ExponentialFilter,
    history: VecDeque<(u64, AngleTriple)>,
}

impl PoseStabilizer {
    #[must_use]
    pub fn new(config: &OpticalFlowConfig) -> Self {
        Self {
            window_ms: config.window_ms,
            max_jitter: config.max_jitter_degrees,
            min_stable_frames: config.min_stable_frames,
            yaw: ExponentialFilter::new(config.smoothing_factor),
            pitch: ExponentialFilter::new(config.smoothing_factor),
            roll: ExponentialFilter::new(config.smoothing_factor),
            history: VecDeque::new(),
        }
    }

    /// Add a raw estimate and return the smoothed one
    pub fn update(&mut self, raw: AngleTriple, confidence: f64, timestamp_ms: u64) -> StabilizedAngles {
        let first = self.history.is_empty();

        self.history.push_back((timestamp_ms, raw));
        let window_start = timestamp_ms.saturating_sub(self.window_ms);
        while let Some(&(ts, _)) = self.history.front() {
            if ts < window_start {
                self.history.pop_front();
            } else {
                break;
            }
        }

        let angles = AngleTriple {
            yaw: self.yaw.apply(raw.yaw),
            pitch: self.pitch.apply(raw.pitch),
            roll: self.roll.apply(raw.roll),
        };

        let jitter = self.jitter();
        let confidence = if !first && jitter < self.max_jitter {
            (confidence * STEADY_CONFIDENCE_BOOST).min(1.0)
        } else {
            confidence
        };

        StabilizedAngles {
            angles,
            confidence: clamp_unit(confidence),
            jitter,
        }
    }

    /// Mean per-axis frame-to-frame delta over the current window
    #[must_use]
    pub fn jitter(&self) -> f64 {
        if self.history.len() < 2 {
            return 0.0;
        }
        let total: f64 = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|((_, a), (_, b))| b.mean_abs_delta(a))
            .sum();
        total / usize_to_f64(self.history.len() - 1)
    }

    /// Enough frames buffered and jitter under the threshold
    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.history.len() >= self.min_stable_frames && self.jitter() < self.max_jitter
    }

    /// Frames currently inside the window
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.history.len()
    }

    /// Per-axis statistics over the window, once at least two frames exist
    #[must_use]
    pub fn get_stats(&self) -> Option<WindowStats> {
        if self.history.len() < 2 {
            return None;
        }
        Some(WindowStats {
            yaw: Self::calculate_stats(self.history.iter().map(|(_, a)| a.yaw)),
            pitch: Self::calculate_stats(self.history.iter().map(|(_, a)| a.pitch)),
            roll: Self::calculate_stats(self.history.iter().map(|(_, a)| a.roll)),
        })
    }

    /// Clear history and smoothing state
    pub fn reset(&mut self) {
        self.history.clear();
        self.yaw.reset();
        self.pitch.reset();
        self.roll.reset();
    }

    fn calculate_stats(data: impl Iterator<Item = f64> + Clone) -> Statistics {
        let n = usize_to_f64(data.clone().count());
        let mean = data.clone().sum::<f64>() / n;
        let variance = data.clone().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let min = data.clone().fold(f64::INFINITY, f64::min);
        let max = data.fold(f64::NEG_INFINITY, f64::max);

        Statistics {
            mean,
            std_dev: variance.sqrt(),
            min,
            max,
            range: max - min,
        }
    }
}

impl Default for PoseStabilizer {
    fn default() -> Self {
        Self::new(&OpticalFlowConfig::default())
    }
}

/// Statistical summary of one axis over the window
#[derive(Debug, Clone, Copy)]
pub struct Statistics {
    /// Mean value of the data
    pub mean: f64,
    /// Standard deviation of the data
    pub std_dev: f64,
    /// Minimum value in the window
    pub min: f64,
    /// Maximum value in the window
    pub max: f64,
    /// Range (max - min) of the data
    pub range: f64,
}

/// Window statistics for all three axes
#[derive(Debug, Clone, Copy)]
pub struct WindowStats {
    pub yaw: Statistics,
    pub pitch: Statistics,
    pub roll: Statistics,
}
