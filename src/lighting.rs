//! Lighting quality from a luminance histogram.
//!
//! Frames are reduced by the host (or by [`LuminanceHistogram::from_rgba`])
//! to a 256-bin luminance histogram. The analyzer derives brightness,
//! clipping, shadow coverage and contrast from it and deducts points from a
//! perfect score for every problem found.

use crate::{
    constants::{
        HIGHLIGHT_BIN, IDEAL_BRIGHTNESS, IDEAL_BRIGHTNESS_BAND, LIGHTING_OK_SCORE, LUMA_BLUE, LUMA_GREEN, LUMA_RED,
        MAX_BRIGHTNESS, MAX_CONTRAST, MAX_HIGHLIGHT_SATURATION, MAX_SHADOW_SIZE, MIN_BRIGHTNESS, MIN_CONTRAST,
        SHADOW_BIN,
    },
    utils::safe_cast::{u32_to_f64, u64_to_f64, usize_to_f64},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::fmt;

const BINS: usize = 256;

/// 256-bin luminance histogram
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LuminanceHistogram {
    bins: [u32; BINS],
}

impl LuminanceHistogram {
    #[must_use]
    pub const fn from_bins(bins: [u32; BINS]) -> Self {
        Self { bins }
    }

    /// Build from a slice of bin counts
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless exactly 256 counts are given.
    pub fn from_slice(counts: &[u32]) -> Result<Self> {
        let bins: [u32; BINS] = counts
            .try_into()
            .map_err(|_| Error::InvalidInput(format!("histogram needs {BINS} bins, got {}", counts.len())))?;
        Ok(Self { bins })
    }

    /// Histogram of an RGBA8 frame using BT.709 luma
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when `data` is shorter than
    /// `width * height * 4` bytes.
    pub fn from_rgba(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        let pixels = width
            .checked_mul(height)
            .ok_or_else(|| Error::InvalidInput(format!("frame {width}x{height} is too large")))?;
        let needed = pixels.saturating_mul(4);
        if data.len() < needed {
            return Err(Error::InvalidInput(format!(
                "RGBA buffer has {} bytes, expected {needed} for {width}x{height}",
                data.len()
            )));
        }

        let mut bins = [0u32; BINS];
        for px in data[..needed].chunks_exact(4) {
            let luma = LUMA_RED * f64::from(px[0]) + LUMA_GREEN * f64::from(px[1]) + LUMA_BLUE * f64::from(px[2]);
            let bin = luma_bin(luma);
            bins[bin] = bins[bin].saturating_add(1);
        }
        Ok(Self { bins })
    }

    /// `per_bin` pixels in every bin of the inclusive range `low..=high`
    #[must_use]
    pub fn uniform(low: u8, high: u8, per_bin: u32) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        let mut bins = [0u32; BINS];
        for bin in &mut bins[usize::from(low)..=usize::from(high)] {
            *bin = per_bin;
        }
        Self { bins }
    }

    #[must_use]
    pub fn bins(&self) -> &[u32; BINS] {
        &self.bins
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&c| u64::from(c)).sum()
    }

    /// Run the lighting analysis on this histogram
    #[must_use]
    pub fn analyze(&self) -> LightingAnalysis {
        analyze(&self.bins)
    }
}

fn luma_bin(luma: f64) -> usize {
    // Luma of u8 channels is within 0..=255
    let rounded = luma.round().clamp(0.0, 255.0);
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let bin = rounded as usize;
    bin.min(BINS - 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LightingQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl LightingQuality {
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 70.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Lighting problems, in reporting priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightingIssue {
    NoData,
    TooDark,
    TooBright,
    Overexposed,
    HeavyShadows,
    LowContrast,
    HighContrast,
}

impl fmt::Display for LightingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoData => "no luminance data",
            Self::TooDark => "too dark",
            Self::TooBright => "too bright",
            Self::Overexposed => "overexposed highlights",
            Self::HeavyShadows => "too much shadow",
            Self::LowContrast => "low contrast",
            Self::HighContrast => "high contrast",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightingAnalysis {
    /// Mean luminance, 0..1
    pub brightness: f64,
    /// Median luminance, 0..1
    pub median_brightness: f64,
    /// Fraction of pixels at or above the highlight bin
    pub highlight_saturation: f64,
    /// Fraction of pixels at or below the shadow bin
    pub shadow_size: f64,
    /// Standard deviation of normalized luminance
    pub contrast: f64,
    /// 0..100
    pub score: f64,
    pub quality: LightingQuality,
    pub issues: Vec<LightingIssue>,
}

impl LightingAnalysis {
    fn no_data() -> Self {
        Self {
            brightness: 0.0,
            median_brightness: 0.0,
            highlight_saturation: 0.0,
            shadow_size: 0.0,
            contrast: 0.0,
            score: 0.0,
            quality: LightingQuality::Poor,
            issues: vec![LightingIssue::NoData],
        }
    }

    /// Score meets the auto-shutter requirement
    #[must_use]
    pub fn meets_score(&self) -> bool {
        self.score >= LIGHTING_OK_SCORE
    }

    /// One actionable sentence for the most important issue
    #[must_use]
    pub fn recommendation(&self) -> &'static str {
        let has = |issue| self.issues.contains(&issue);
        if self.issues.is_empty() {
            "Lighting is perfect"
        } else if has(LightingIssue::NoData) {
            "Waiting for the camera image"
        } else if has(LightingIssue::TooDark) {
            "Move to a brighter place"
        } else if has(LightingIssue::TooBright) || has(LightingIssue::Overexposed) {
            "Too much light, move away from direct light"
        } else if has(LightingIssue::HeavyShadows) {
            "Too much shadow, change your position"
        } else if has(LightingIssue::LowContrast) {
            "Low contrast, adjust the light sources"
        } else {
            "Improve the lighting"
        }
    }
}

/// Score ≥ 70 and no issue reported
#[must_use]
pub fn is_lighting_acceptable(analysis: &LightingAnalysis) -> bool {
    analysis.meets_score() && analysis.issues.is_empty()
}

/// Analyze a raw 256-bin histogram
#[must_use]
pub fn analyze(bins: &[u32; BINS]) -> LightingAnalysis {
    let total: u64 = bins.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return LightingAnalysis::no_data();
    }
    let n = u64_to_f64(total);

    let level = |i: usize| usize_to_f64(i) / 255.0;
    let brightness = bins.iter().enumerate().map(|(i, &c)| level(i) * u32_to_f64(c)).sum::<f64>() / n;

    let half = n / 2.0;
    let mut cumulative = 0.0;
    let mut median_brightness = 0.5;
    for (i, &c) in bins.iter().enumerate() {
        cumulative += u32_to_f64(c);
        if cumulative >= half {
            median_brightness = level(i);
            break;
        }
    }

    let highlight_saturation = bins[HIGHLIGHT_BIN..].iter().map(|&c| u32_to_f64(c)).sum::<f64>() / n;
    let shadow_size = bins[..=SHADOW_BIN].iter().map(|&c| u32_to_f64(c)).sum::<f64>() / n;
    let variance = bins
        .iter()
        .enumerate()
        .map(|(i, &c)| (level(i) - brightness).powi(2) * u32_to_f64(c))
        .sum::<f64>()
        / n;
    let contrast = variance.sqrt();

    let mut issues = Vec::new();
    let mut score = 100.0;

    if brightness < MIN_BRIGHTNESS {
        issues.push(LightingIssue::TooDark);
        score -= 30.0;
    } else if brightness > MAX_BRIGHTNESS {
        issues.push(LightingIssue::TooBright);
        score -= 25.0;
    } else if (brightness - IDEAL_BRIGHTNESS).abs() > IDEAL_BRIGHTNESS_BAND {
        score -= 10.0;
    }

    if highlight_saturation > MAX_HIGHLIGHT_SATURATION {
        issues.push(LightingIssue::Overexposed);
        score -= 25.0;
    }
    if shadow_size > MAX_SHADOW_SIZE {
        issues.push(LightingIssue::HeavyShadows);
        score -= 20.0;
    }
    if contrast < MIN_CONTRAST {
        issues.push(LightingIssue::LowContrast);
        score -= 15.0;
    } else if contrast > MAX_CONTRAST {
        issues.push(LightingIssue::HighContrast);
        score -= 10.0;
    }

    let score = f64::max(score, 0.0);
    LightingAnalysis {
        brightness,
        median_brightness,
        highlight_saturation,
        shadow_size,
        contrast,
        score,
        quality: LightingQuality::from_score(score),
        issues,
    }
}

/// Higher moments of the luminance distribution
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramShape {
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
    /// |skewness| < 0.5 and |kurtosis| < 1
    pub balanced: bool,
}

/// Skewness and excess kurtosis; `None` for empty or flat histograms
#[must_use]
pub fn histogram_shape(bins: &[u32; BINS]) -> Option<HistogramShape> {
    let total: u64 = bins.iter().map(|&c| u64::from(c)).sum();
    if total == 0 {
        return None;
    }
    let n = u64_to_f64(total);
    let level = |i: usize| usize_to_f64(i) / 255.0;
    let mean = bins.iter().enumerate().map(|(i, &c)| level(i) * u32_to_f64(c)).sum::<f64>() / n;

    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for (i, &c) in bins.iter().enumerate() {
        let diff = level(i) - mean;
        let count = u32_to_f64(c);
        m2 += diff.powi(2) * count;
        m3 += diff.powi(3) * count;
        m4 += diff.powi(4) * count;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2 <= f64::EPSILON {
        return None;
    }

    let skewness = m3 / m2.powf(1.5);
    let kurtosis = m4 / m2.powi(2) - 3.0;
    Some(HistogramShape {
        skewness,
        kurtosis,
        balanced: skewness.abs() < 0.5 && kurtosis.abs() < 1.0,
    })
}
